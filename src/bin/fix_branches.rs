//! Assign every branch to a region of its province
//!
//! Sampling is weighted by regional demand score. Rewrites `branches.csv`
//! with `region_id` and `region_name` filled in, and optionally reloads the
//! store.

use anyhow::Result;
use branch_analytics::config::{DataPaths, DEFAULT_DATA_DIR, DEFAULT_DB_PATH, DEFAULT_SEED};
use branch_analytics::dataset::{read_branches, read_regions, write_csv};
use branch_analytics::repair::{assign_regions, distribution};
use branch_analytics::snapshot::Snapshot;
use branch_analytics::{dataset, db};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fix_branches")]
#[command(about = "Assign branches to regions weighted by demand")]
struct Args {
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Reload the store after rewriting the CSV
    #[arg(long)]
    update_db: bool,

    #[arg(long, default_value = DEFAULT_DB_PATH)]
    db_path: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let paths = DataPaths::new(&args.data_dir);

    info!("Fixing branch-to-region assignments...");
    let regions = read_regions(&paths)?;
    let mut branches = read_branches(&paths)?;
    let summary = assign_regions(&mut branches, &regions, args.seed);

    let transactions = dataset::read_transactions(&paths)?;
    let snapshot = Snapshot::new(regions, branches, transactions);
    snapshot.validate()?;
    write_csv(&paths.branches(), &snapshot.branches)?;
    info!("  ✓ Updated {} branch assignments", summary.assigned);

    println!("\nBranches per region (top 10):");
    println!("{}", "─".repeat(40));
    for (region, count) in distribution(&snapshot.branches).into_iter().take(10) {
        println!("  {:<25} {:>5} branches", region, count);
    }

    if args.update_db {
        info!("Updating database at {}", args.db_path);
        let conn = db::connect(&args.db_path).await?;
        db::init_schema(&conn).await?;
        db::load_snapshot(&conn, &snapshot).await?;
    }

    Ok(())
}
