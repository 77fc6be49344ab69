//! Demand forecasting - What will happen?
//! Province growth, seasonal baseline, and 6-month capacity gaps for
//! expansion targets. Writes `province_forecasts.csv` and
//! `regional_forecasts.csv` to the output directory.
//!
//! Run: ./target/release/forecast [--months 6] [--output-dir data/processed] [--output forecast.json]

use anyhow::{Context, Result};
use branch_analytics::config::{JoinKey, ReportConfig, DEFAULT_DB_PATH, DEFAULT_OUTPUT_DIR};
use branch_analytics::forecast::{
    province_forecasts, regional_forecasts, ProvinceForecast, RegionalForecast, DEFAULT_HORIZON,
};
use branch_analytics::queries::{deviation_from_baseline, expansion_targets, seasonal_pattern};
use branch_analytics::{db, export};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "forecast")]
#[command(about = "Forecast demand and size capacity gaps")]
struct Args {
    #[arg(long, default_value = DEFAULT_DB_PATH)]
    db_path: String,

    /// Months to project past the last observation
    #[arg(long, default_value_t = DEFAULT_HORIZON)]
    months: u32,

    #[arg(long, value_enum, default_value_t = JoinKey::Province)]
    join_key: JoinKey,

    /// Directory for the forecast CSVs
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Also write the forecasts as JSON
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct ForecastFile<'a> {
    months_ahead: u32,
    provinces: &'a [ProvinceForecast],
    regions: &'a [RegionalForecast],
}

fn print_section_header(title: &str) {
    println!("\n{}", "═".repeat(70));
    println!("  {}", title);
    println!("{}\n", "═".repeat(70));
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = ReportConfig {
        join_key: args.join_key,
        forecast_horizon: args.months,
        ..ReportConfig::default()
    };

    let conn = db::connect(&args.db_path).await?;
    let snapshot = db::read_snapshot(&conn).await?;
    snapshot.validate()?;

    print_section_header("HISTORICAL TREND ANALYSIS");
    let provinces = province_forecasts(&snapshot, config.forecast_horizon);
    for p in &provinces {
        let growth = p
            .annual_growth_pct
            .map(|g| format!("{:+.2}% annually", g))
            .unwrap_or_else(|| "n/a".to_string());
        let monthly = p
            .growth_rate_pct
            .map(|g| format!("{:+.2}%/month", g))
            .unwrap_or_else(|| "n/a".to_string());
        println!("{:<20} | Growth Rate: {} ({})", p.province.name(), growth, monthly);
    }

    print_section_header("SEASONAL PATTERNS");
    let seasonal = seasonal_pattern(&snapshot);
    for (s, deviation) in seasonal.iter().zip(deviation_from_baseline(&seasonal)) {
        let vs_baseline = deviation.unwrap_or_default();
        let indicator = if vs_baseline > 5.0 {
            "▲"
        } else if vs_baseline < -5.0 {
            "▼"
        } else {
            " "
        };
        println!(
            "{} {:<4} | {:>10.0} ({:+.1}% vs baseline)",
            indicator, s.month_name, s.avg_transactions, vs_baseline
        );
    }

    print_section_header(&format!("FORECASTING FUTURE DEMAND (Next {} Months)", args.months));
    for p in &provinces {
        println!(
            "{} (trend {:+.0} transactions/month, {} in {} months)",
            p.province.name(),
            p.monthly_growth,
            p.forecast_demand,
            p.months_ahead
        );
        for point in &p.points {
            println!("    {}  {:>12.0}", point.date, point.forecast);
        }
    }

    let targets = expansion_targets(&snapshot, &config);
    let regional = regional_forecasts(&snapshot, &config, &targets, config.forecast_horizon);

    print_section_header("CAPACITY PLANNING RECOMMENDATIONS");
    if regional.is_empty() {
        println!("No expansion targets with enough history to forecast.");
    }
    for r in &regional {
        println!("\n{}, {}", r.region_name, r.province.name());
        println!("   Current Demand:   {:>10}", r.current_demand);
        println!("   Current Capacity: {:>10}", r.current_capacity);
        println!("   {}-Month Forecast: {:>10}", args.months, r.forecast_demand);
        println!("   Projected Gap:    {:>10}", r.projected_gap);
        println!("   Recommended Actions:");
        println!("   • {}", r.action);
        println!("   • Hire approximately {} additional staff", r.staff_needed);
        println!("   • Projected demand changing by {:+.0}/month", r.monthly_growth);
        if r.high_growth {
            println!("   ⚠ High growth area - prioritize expansion");
        }
    }

    let written = export::write_forecasts(&provinces, &regional, &args.output_dir)?;
    info!("{} forecast files written to {}", written.len(), args.output_dir.display());

    if let Some(path) = &args.output {
        let body = ForecastFile {
            months_ahead: args.months,
            provinces: &provinces,
            regions: &regional,
        };
        std::fs::write(path, serde_json::to_string_pretty(&body)?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Forecasts written to {}", path.display());
    }

    Ok(())
}
