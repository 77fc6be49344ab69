use anyhow::{Context, Result};
use branch_analytics::config::{
    DataPaths, JoinKey, ReportConfig, DEFAULT_DATA_DIR, DEFAULT_DB_PATH, DEFAULT_OUTPUT_DIR, DEFAULT_SEED,
};
use branch_analytics::queries::{run_all, ReportKind};
use branch_analytics::snapshot::Snapshot;
use branch_analytics::{db, export, generate, repair};
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// End-to-end batch: raw data -> store -> reports -> processed files
#[derive(Parser, Debug)]
#[command(name = "branch_analytics")]
struct Args {
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_DB_PATH)]
    db_path: String,

    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Seed used when the raw data has to be generated or repaired
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    #[arg(long, value_enum, default_value_t = JoinKey::Province)]
    join_key: JoinKey,

    #[arg(long)]
    trend_cutoff: Option<NaiveDate>,

    /// Run against a throwaway in-memory store
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = ReportConfig {
        join_key: args.join_key,
        ..ReportConfig::default()
    };
    if let Some(cutoff) = args.trend_cutoff {
        config.trend_cutoff = cutoff;
    }

    let paths = DataPaths::new(&args.data_dir);
    let mut raw = if paths.all_present() {
        Snapshot::from_csv(&paths)?
    } else {
        info!("No raw data under {}; generating (seed {})", paths.raw_dir.display(), args.seed);
        generate::generate(args.seed)?
    };

    if raw.branches.iter().any(|b| b.region_id.is_none()) {
        repair::assign_regions(&mut raw.branches, &raw.regions, args.seed);
        raw.write_csv(&paths)?;
    }
    raw.validate().context("raw data failed validation")?;

    let conn = if args.in_memory {
        db::connect_in_memory().await?
    } else {
        info!("Connecting to SurrealDB at {}", args.db_path);
        db::connect(&args.db_path).await?
    };
    db::init_schema(&conn).await?;
    info!("Loading tables...");
    db::load_snapshot(&conn, &raw).await?;

    let snapshot = db::read_snapshot(&conn).await?;
    snapshot.validate().context("stored data failed validation")?;

    info!("Running reports (join key {:?})", config.join_key);
    let reports = run_all(&snapshot, &config);
    for kind in ReportKind::ALL {
        info!("  {:<45} {:>5} rows", kind.title(), reports.row_count(kind));
    }

    info!("Exporting to {}", args.output_dir.display());
    let manifest = export::export_all(&snapshot, &reports, &config, &args.output_dir)?;
    info!("Batch complete: {} files written", manifest.files.len() + 1);

    Ok(())
}
