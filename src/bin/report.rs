//! Branch network reports
//! Transaction volume, coverage, capacity, seasonality, digital adoption,
//! province summary, expansion targets, recent trend, per-region capacity
//! and expansion recommendations.
//!
//! Run: ./target/release/report [section]
//! Sections: all, regional, performance, underserved, capacity, monthly,
//!           seasonal, digital, summary, expansion, trend, supply,
//!           recommendations

use anyhow::Result;
use branch_analytics::config::{JoinKey, ReportConfig, DEFAULT_DB_PATH};
use branch_analytics::db;
use branch_analytics::queries::{run_all, ReportKind, ReportSet};
use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "report")]
#[command(about = "Print the branch network reports")]
struct Args {
    /// Section to print
    #[arg(default_value = "all")]
    section: String,

    #[arg(long, default_value = DEFAULT_DB_PATH)]
    db_path: String,

    /// How branches are matched to regions
    #[arg(long, value_enum, default_value_t = JoinKey::Province)]
    join_key: JoinKey,

    /// First month of the recent-trend window
    #[arg(long)]
    trend_cutoff: Option<NaiveDate>,
}

const SECTIONS: [(&str, ReportKind); 12] = [
    ("regional", ReportKind::RegionalTransactions),
    ("performance", ReportKind::BranchPerformance),
    ("underserved", ReportKind::UnderservedRegions),
    ("capacity", ReportKind::BranchCapacity),
    ("monthly", ReportKind::ProvinceMonthly),
    ("seasonal", ReportKind::SeasonalPattern),
    ("digital", ReportKind::DigitalAdoption),
    ("summary", ReportKind::ProvinceSummary),
    ("expansion", ReportKind::ExpansionTargets),
    ("trend", ReportKind::RecentTrend),
    ("supply", ReportKind::RegionCapacity),
    ("recommendations", ReportKind::ExpansionRecommendations),
];

fn print_section_header(title: &str) {
    println!("\n{}", "═".repeat(85));
    println!("  {}", title);
    println!("{}\n", "═".repeat(85));
}

fn print_subsection(title: &str) {
    println!("\n{}", title);
    println!("{}", "─".repeat(75));
}

fn opt(value: Option<f64>, places: usize) -> String {
    value
        .map(|v| format!("{:.*}", places, v))
        .unwrap_or_else(|| "-".to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let mut config = ReportConfig {
        join_key: args.join_key,
        ..ReportConfig::default()
    };
    if let Some(cutoff) = args.trend_cutoff {
        config.trend_cutoff = cutoff;
    }

    let kinds: Vec<ReportKind> = match args.section.as_str() {
        "all" => ReportKind::ALL.to_vec(),
        name => match SECTIONS.iter().find(|(s, _)| *s == name) {
            Some((_, kind)) => vec![*kind],
            None => {
                println!("Unknown section: {}", name);
                let names: Vec<&str> = SECTIONS.iter().map(|(s, _)| *s).collect();
                println!("Available: all, {}", names.join(", "));
                return Ok(());
            }
        },
    };

    let conn = db::connect(&args.db_path).await?;
    let snapshot = db::read_snapshot(&conn).await?;
    snapshot.validate()?;
    let reports = run_all(&snapshot, &config);

    println!("\n{}", "█".repeat(85));
    println!("{}  BRANCH NETWORK REPORTS  {}", "█".repeat(29), "█".repeat(30));
    println!("{}\n", "█".repeat(85));

    for (i, kind) in kinds.into_iter().enumerate() {
        print_section_header(&format!("{}. {}", i + 1, kind.title().to_uppercase()));
        print_report(&reports, kind);
    }

    println!("\n{}", "█".repeat(85));
    Ok(())
}

fn print_report(reports: &ReportSet, kind: ReportKind) {
    match kind {
        ReportKind::RegionalTransactions => {
            println!(
                "{:<6} {:<22} {:>15} {:>12} {:>14}",
                "Prov", "Region", "Transactions", "Digital", "Population"
            );
            println!("{}", "─".repeat(75));
            for r in &reports.regional_transactions {
                println!(
                    "{:<6} {:<22} {:>15} {:>12.3} {:>14}",
                    r.province, r.region_name, r.total_transactions, r.avg_digital_adoption, r.total_population
                );
            }
        }
        ReportKind::BranchPerformance => {
            println!(
                "{:<6} {:>9} {:>10} {:>15} {:>12} {:>14}",
                "Prov", "Branches", "Avg Staff", "Transactions", "Txn/Staff", "Txn/Branch"
            );
            println!("{}", "─".repeat(75));
            for r in &reports.branch_performance {
                println!(
                    "{:<6} {:>9} {:>10.1} {:>15} {:>12.1} {:>14}",
                    r.province,
                    r.branch_count,
                    r.avg_staff,
                    r.total_transactions,
                    r.avg_transactions_per_staff,
                    r.avg_transactions_per_branch
                );
            }
        }
        ReportKind::UnderservedRegions => {
            println!(
                "{:<22} {:<6} {:>7} {:>12} {:>9} {:>12}  {}",
                "Region", "Prov", "Score", "Monthly Txn", "Branches", "Txn/Branch", "Status"
            );
            println!("{}", "─".repeat(85));
            for r in &reports.underserved_regions {
                println!(
                    "{:<22} {:<6} {:>7.2} {:>12} {:>9} {:>12}  {}",
                    r.region_name,
                    r.province,
                    r.demand_score,
                    r.avg_monthly_transactions,
                    r.branch_count,
                    opt(r.transactions_per_branch, 0),
                    r.coverage_status
                );
            }
        }
        ReportKind::BranchCapacity => {
            println!(
                "{:<8} {:<13} {:<6} {:<20} {:>6} {:>9} {:>9}  {}",
                "Branch", "Type", "Prov", "Region", "Staff", "Monthly", "Txn/Staff", "Status"
            );
            println!("{}", "─".repeat(85));
            for r in &reports.branch_capacity {
                println!(
                    "{:<8} {:<13} {:<6} {:<20} {:>6} {:>9} {:>9.0}  {}",
                    r.branch_id,
                    r.branch_type,
                    r.province,
                    r.region_name,
                    r.staff_count,
                    r.monthly_transactions,
                    r.transactions_per_staff,
                    r.capacity_status
                );
            }
        }
        ReportKind::ProvinceMonthly => {
            let mut current = None;
            for r in &reports.province_monthly {
                if current != Some(r.province) {
                    print_subsection(&format!("{}", r.province.name()));
                    println!(
                        "{:<9} {:>14} {:>14} {:>14} {:>9}",
                        "Month", "Total", "In-Branch", "Digital", "Digital%"
                    );
                    current = Some(r.province);
                }
                println!(
                    "{}-{:02}   {:>14} {:>14} {:>14} {:>9}",
                    r.year,
                    r.month,
                    r.total_transactions,
                    r.in_branch_transactions,
                    r.digital_transactions,
                    opt(r.digital_pct, 2)
                );
            }
        }
        ReportKind::SeasonalPattern => {
            println!("{:<6} {:>14} {:>12} {:>12}", "Month", "Average", "Min", "Max");
            println!("{}", "─".repeat(50));
            for r in &reports.seasonal_pattern {
                println!(
                    "{:<6} {:>14.2} {:>12} {:>12}",
                    r.month_name, r.avg_transactions, r.min_transactions, r.max_transactions
                );
            }
        }
        ReportKind::DigitalAdoption => {
            println!(
                "{:<22} {:<6} {:>14} {:>14} {:>10}",
                "Region", "Prov", "Avg Digital", "Avg Branch", "Digital%"
            );
            println!("{}", "─".repeat(75));
            for r in &reports.digital_adoption {
                println!(
                    "{:<22} {:<6} {:>14.0} {:>14.0} {:>10}",
                    r.region_name,
                    r.province,
                    r.avg_digital_transactions,
                    r.avg_in_branch_transactions,
                    opt(r.digital_share_pct, 2)
                );
            }
        }
        ReportKind::ProvinceSummary => {
            println!(
                "{:<6} {:>8} {:>9} {:>12} {:>10} {:>11} {:>11} {:>11} {:>9}",
                "Prov", "Regions", "Branches", "Population", "Income", "Capacity", "Demand", "Gap", "Digital%"
            );
            println!("{}", "─".repeat(95));
            for r in &reports.province_summary {
                println!(
                    "{:<6} {:>8} {:>9} {:>12} {:>10} {:>11} {:>11} {:>11} {:>9.1}",
                    r.province,
                    r.region_count,
                    r.branch_count,
                    r.total_population,
                    r.avg_median_income,
                    r.branch_capacity,
                    r.regional_demand,
                    r.demand_gap,
                    r.avg_digital_adoption_pct
                );
            }
        }
        ReportKind::ExpansionTargets => {
            println!(
                "{:<22} {:<6} {:>7} {:>12} {:>9} {:>12}  {}",
                "Region", "Prov", "Score", "Population", "Branches", "Txn/Branch", "Priority"
            );
            println!("{}", "─".repeat(85));
            for r in &reports.expansion_targets {
                println!(
                    "{:<22} {:<6} {:>7.2} {:>12} {:>9} {:>12}  {}",
                    r.region_name,
                    r.province,
                    r.demand_score,
                    r.population,
                    r.current_branches,
                    r.demand_per_branch.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
                    r.expansion_priority
                );
            }
        }
        ReportKind::RecentTrend => {
            println!(
                "{:<22} {:<6} {:<12} {:>12} {:>12} {:>9}",
                "Region", "Prov", "Date", "Transactions", "Previous", "MoM%"
            );
            println!("{}", "─".repeat(80));
            for r in &reports.recent_trend {
                println!(
                    "{:<22} {:<6} {:<12} {:>12} {:>12} {:>9}",
                    r.region_name,
                    r.province,
                    r.date.to_string(),
                    r.transactions,
                    r.prev_month_transactions.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
                    opt(r.mom_growth_pct, 2)
                );
            }
        }
        ReportKind::RegionCapacity => {
            println!(
                "{:<22} {:<6} {:>9} {:>11} {:>11} {:>11} {:>7}  {}",
                "Region", "Prov", "Branches", "Demand", "Capacity", "Gap", "Ratio", "Status"
            );
            println!("{}", "─".repeat(95));
            for r in &reports.region_capacity {
                println!(
                    "{:<22} {:<6} {:>9} {:>11} {:>11} {:>11} {:>7}  {}",
                    r.region_name,
                    r.province,
                    r.branch_count,
                    r.regional_demand,
                    r.total_branch_capacity,
                    r.capacity_gap,
                    opt(r.demand_to_capacity, 2),
                    r.balance_status
                );
            }
        }
        ReportKind::ExpansionRecommendations => {
            println!(
                "{:>4} {:<22} {:<6} {:>7} {:>11} {:>9} {:>7}  {:<16} {}",
                "Rank", "Region", "Prov", "Score", "Gap", "Branches", "Staff", "Priority", "Recommendation"
            );
            println!("{}", "─".repeat(110));
            for r in &reports.expansion_recommendations {
                println!(
                    "{:>4} {:<22} {:<6} {:>7.2} {:>11} {:>9} {:>7}  {:<16} {}",
                    r.priority_rank,
                    r.region_name,
                    r.province,
                    r.demand_score,
                    r.capacity_gap,
                    r.branches_needed,
                    r.staff_needed,
                    r.priority_level,
                    r.recommendation
                );
            }
        }
    }
    println!("\n({} rows)", reports.row_count(kind));
}
