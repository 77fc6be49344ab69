//! Synthetic data generator for the branch network
//!
//! Writes `branches.csv`, `regional_demand.csv` and
//! `transactions_timeseries.csv` under `<data-dir>/raw/`.
//!
//! Usage:
//!   cargo run --release --bin generate_data -- [OPTIONS]
//!
//! Options:
//!   --data-dir <PATH>  Data directory (default: data)
//!   --seed <N>         Random seed (default: 42)
//!   --force            Overwrite existing files

use anyhow::{bail, Result};
use branch_analytics::config::{DataPaths, DEFAULT_DATA_DIR, DEFAULT_SEED};
use branch_analytics::generate::Generator;
use branch_analytics::models::Province;
use branch_analytics::numeric::mean;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "generate_data")]
#[command(about = "Generate the synthetic banking dataset")]
struct Args {
    /// Data directory; files go to its raw/ subdirectory
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Random seed for reproducibility
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Overwrite files that already exist
    #[arg(long)]
    force: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let paths = DataPaths::new(&args.data_dir);
    if paths.all_present() && !args.force {
        bail!("{} already holds a dataset; pass --force to regenerate", paths.raw_dir.display());
    }

    info!("Generating banking data (seed {})", args.seed);
    let snapshot = Generator::new(args.seed).snapshot()?;
    snapshot.validate()?;
    snapshot.write_csv(&paths)?;

    info!("  ✓ {} branches", snapshot.branches.len());
    info!("  ✓ {} regions", snapshot.regions.len());
    info!("  ✓ {} monthly records", snapshot.transactions.len());

    println!("\n{}", "═".repeat(60));
    println!("  DATASET SUMMARY");
    println!("{}", "═".repeat(60));
    println!("{:<20} {:>10} {:>10} {:>15}", "Province", "Branches", "Regions", "Avg Txn/Staff");
    println!("{}", "─".repeat(60));
    for province in Province::ALL {
        let branches: Vec<_> = snapshot.branches.iter().filter(|b| b.province == province).collect();
        let regions = snapshot.regions.iter().filter(|r| r.province == province).count();
        let per_staff = mean(branches.iter().map(|b| b.transactions_per_staff)).unwrap_or_default();
        println!(
            "{:<20} {:>10} {:>10} {:>15.0}",
            province.name(),
            branches.len(),
            regions,
            per_staff
        );
    }
    println!("\nFiles written to {}", paths.raw_dir.display());

    Ok(())
}
