//! Processed outputs: one CSV per report, a KPI sheet, the forecast
//! sheets and a manifest.

use crate::config::{JoinKey, ReportConfig};
use crate::dataset::{write_csv, CsvRecord};
use crate::forecast::{province_forecasts, regional_forecasts, ProvinceForecast, ProvinceForecastRow, RegionalForecast};
use crate::numeric::{mean, percentage, round_to};
use crate::queries::{ReportKind, ReportSet};
use crate::snapshot::Snapshot;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

pub const KPI_FILE: &str = "kpis.csv";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const PROVINCE_FORECAST_FILE: &str = "province_forecasts.csv";
pub const REGIONAL_FORECAST_FILE: &str = "regional_forecasts.csv";

/// Load above which a branch counts as overloaded in the KPI sheet.
const OVERLOAD_THRESHOLD: f64 = 700.0;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Kpi {
    pub metric: &'static str,
    pub value: String,
    pub category: &'static str,
}

impl CsvRecord for Kpi {
    const HEADERS: &'static [&'static str] = &[
        "metric",
        "value",
        "category",
    ];
}

impl Kpi {
    fn new(metric: &'static str, value: impl ToString, category: &'static str) -> Self {
        Self {
            metric,
            value: value.to_string(),
            category,
        }
    }
}

/// Headline figures for the dashboard.
pub fn kpis(snapshot: &Snapshot, reports: &ReportSet) -> Vec<Kpi> {
    let total_regions = snapshot.regions.len();
    let needing_coverage = reports.underserved_regions.len();
    let coverage_rate = percentage((total_regions - needing_coverage.min(total_regions)) as f64, total_regions as f64, 1);
    let overloaded = snapshot
        .branches
        .iter()
        .filter(|b| b.transactions_per_staff > OVERLOAD_THRESHOLD)
        .count();
    let capacity: u64 = snapshot.branches.iter().map(|b| b.monthly_transactions).sum();
    let demand: u64 = snapshot.regions.iter().map(|r| r.avg_monthly_transactions).sum();
    let avg_per_staff = mean(snapshot.branches.iter().map(|b| b.transactions_per_staff)).map(|v| round_to(v, 0));

    vec![
        Kpi::new("Total Branches", snapshot.branches.len(), "Branch Metrics"),
        Kpi::new("Total Regions", total_regions, "Regional Metrics"),
        Kpi::new("Regions Needing Coverage", needing_coverage, "Regional Metrics"),
        Kpi::new("Coverage Rate (%)", display_opt(coverage_rate), "Regional Metrics"),
        Kpi::new("Overloaded Branches", overloaded, "Branch Metrics"),
        Kpi::new("Total Monthly Capacity", capacity, "Capacity Metrics"),
        Kpi::new("Total Monthly Demand", demand, "Capacity Metrics"),
        Kpi::new("Capacity Gap", demand as i64 - capacity as i64, "Capacity Metrics"),
        Kpi::new("Avg Transactions per Staff", display_opt(avg_per_staff), "Efficiency Metrics"),
    ]
}

fn display_opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
    pub file: String,
    pub title: String,
    pub rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub generated_at: DateTime<Utc>,
    pub join_key: JoinKey,
    pub trend_cutoff: NaiveDate,
    pub forecast_horizon: u32,
    pub files: Vec<ManifestEntry>,
}

/// Write every report, the KPI sheet, both forecast sheets and
/// `manifest.json` into `output_dir`.
pub fn export_all(
    snapshot: &Snapshot,
    reports: &ReportSet,
    config: &ReportConfig,
    output_dir: &Path,
) -> Result<Manifest> {
    fs::create_dir_all(output_dir).with_context(|| format!("creating {}", output_dir.display()))?;

    let mut files = Vec::with_capacity(ReportKind::ALL.len() + 3);
    for kind in ReportKind::ALL {
        let file = format!("{}.csv", kind.file_stem());
        let rows = write_report(reports, kind, &output_dir.join(&file))?;
        info!("  ✓ {} ({} rows)", file, rows);
        files.push(ManifestEntry {
            file,
            title: kind.title().to_string(),
            rows,
        });
    }

    let kpi_rows = write_csv(&output_dir.join(KPI_FILE), &kpis(snapshot, reports))?;
    info!("  ✓ {} ({} rows)", KPI_FILE, kpi_rows);
    files.push(ManifestEntry {
        file: KPI_FILE.to_string(),
        title: "Key Performance Indicators".to_string(),
        rows: kpi_rows,
    });

    let provinces = province_forecasts(snapshot, config.forecast_horizon);
    let regions = regional_forecasts(snapshot, config, &reports.expansion_targets, config.forecast_horizon);
    files.extend(write_forecasts(&provinces, &regions, output_dir)?);

    let manifest = Manifest {
        generated_at: Utc::now(),
        join_key: config.join_key,
        trend_cutoff: config.trend_cutoff,
        forecast_horizon: config.forecast_horizon,
        files,
    };
    let path = output_dir.join(MANIFEST_FILE);
    fs::write(&path, serde_json::to_string_pretty(&manifest)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(manifest)
}

/// Write `province_forecasts.csv` and `regional_forecasts.csv`.
pub fn write_forecasts(
    provinces: &[ProvinceForecast],
    regions: &[RegionalForecast],
    output_dir: &Path,
) -> Result<Vec<ManifestEntry>> {
    let rows: Vec<ProvinceForecastRow> = provinces.iter().map(ProvinceForecastRow::from).collect();
    let province_rows = write_csv(&output_dir.join(PROVINCE_FORECAST_FILE), &rows)?;
    info!("  ✓ {} ({} rows)", PROVINCE_FORECAST_FILE, province_rows);

    let region_rows = write_csv(&output_dir.join(REGIONAL_FORECAST_FILE), regions)?;
    info!("  ✓ {} ({} rows)", REGIONAL_FORECAST_FILE, region_rows);

    Ok(vec![
        ManifestEntry {
            file: PROVINCE_FORECAST_FILE.to_string(),
            title: "Province Demand Forecast".to_string(),
            rows: province_rows,
        },
        ManifestEntry {
            file: REGIONAL_FORECAST_FILE.to_string(),
            title: "Regional Capacity Forecast".to_string(),
            rows: region_rows,
        },
    ])
}

fn write_report(reports: &ReportSet, kind: ReportKind, path: &Path) -> Result<usize> {
    match kind {
        ReportKind::RegionalTransactions => write_csv(path, &reports.regional_transactions),
        ReportKind::BranchPerformance => write_csv(path, &reports.branch_performance),
        ReportKind::UnderservedRegions => write_csv(path, &reports.underserved_regions),
        ReportKind::BranchCapacity => write_csv(path, &reports.branch_capacity),
        ReportKind::ProvinceMonthly => write_csv(path, &reports.province_monthly),
        ReportKind::SeasonalPattern => write_csv(path, &reports.seasonal_pattern),
        ReportKind::DigitalAdoption => write_csv(path, &reports.digital_adoption),
        ReportKind::ProvinceSummary => write_csv(path, &reports.province_summary),
        ReportKind::ExpansionTargets => write_csv(path, &reports.expansion_targets),
        ReportKind::RecentTrend => write_csv(path, &reports.recent_trend),
        ReportKind::RegionCapacity => write_csv(path, &reports.region_capacity),
        ReportKind::ExpansionRecommendations => write_csv(path, &reports.expansion_recommendations),
    }
}
