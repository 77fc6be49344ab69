//! Load the raw CSV files into the embedded store
//!
//! Run: ./target/release/setup_database [--data-dir data] [--db-path data/banking.db]

use anyhow::{Context, Result};
use branch_analytics::config::{DataPaths, DEFAULT_DATA_DIR, DEFAULT_DB_PATH};
use branch_analytics::db;
use branch_analytics::snapshot::Snapshot;
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "setup_database")]
#[command(about = "Create the schema and load the raw tables")]
struct Args {
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_DB_PATH)]
    db_path: String,
}

#[derive(Debug, Deserialize)]
struct ProvinceCount {
    province: String,
    branches: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let paths = DataPaths::new(&args.data_dir);

    let snapshot = Snapshot::from_csv(&paths).context("reading raw tables")?;
    snapshot.validate()?;

    info!("Connecting to SurrealDB at {}", args.db_path);
    let conn = db::connect(&args.db_path).await?;

    info!("Initializing schema...");
    db::init_schema(&conn).await?;

    info!("Loading tables...");
    db::load_snapshot(&conn, &snapshot).await?;

    let by_province: Vec<ProvinceCount> = conn
        .query("SELECT province, count() AS branches FROM branches GROUP BY province ORDER BY province")
        .await?
        .take(0)?;

    println!("\n{}", "═".repeat(40));
    println!("  DATABASE LOADED");
    println!("{}", "═".repeat(40));
    for row in &by_province {
        println!("  {:<6} {:>6} branches", row.province, row.branches);
    }
    println!("\nDatabase ready at {}", args.db_path);

    Ok(())
}
