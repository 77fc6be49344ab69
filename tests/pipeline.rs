use branch_analytics::config::{DataPaths, JoinKey, ReportConfig};
use branch_analytics::export::{export_all, MANIFEST_FILE, PROVINCE_FORECAST_FILE, REGIONAL_FORECAST_FILE};
use branch_analytics::queries::{run_all, ReportKind};
use branch_analytics::rules::{CoverageStatus, SupplyBalance};
use branch_analytics::snapshot::Snapshot;
use branch_analytics::{db, generate, repair};
use std::fs;

fn repaired_dataset() -> Snapshot {
    let mut snapshot = generate::generate(42).unwrap();
    let summary = repair::assign_regions(&mut snapshot.branches, &snapshot.regions, 42);
    assert_eq!(summary.assigned, 150);
    snapshot
}

#[test]
fn test_generated_batch_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    repaired_dataset().write_csv(&paths).unwrap();

    let snapshot = Snapshot::from_csv(&paths).unwrap();
    snapshot.validate().unwrap();

    let config = ReportConfig::default();
    let reports = run_all(&snapshot, &config);

    assert_eq!(reports.regional_transactions.len(), 10);
    assert_eq!(reports.branch_performance.len(), 4);
    assert_eq!(reports.province_monthly.len(), 4 * 36);
    assert_eq!(reports.seasonal_pattern.len(), 12);
    assert_eq!(reports.digital_adoption.len(), 15);
    assert_eq!(reports.province_summary.len(), 4);
    assert_eq!(reports.recent_trend.len(), 50);
    assert_eq!(reports.region_capacity.len(), 24);

    // Every province has branches, so nothing is without coverage under the province join.
    assert!(reports
        .underserved_regions
        .iter()
        .all(|r| r.coverage_status != CoverageStatus::NoCoverage));

    let branch_total: u64 = snapshot.branches.iter().map(|b| b.monthly_transactions).sum();
    let reported: u64 = reports.branch_performance.iter().map(|r| r.total_transactions).sum();
    assert_eq!(reported, branch_total);

    let out = dir.path().join("processed");
    let manifest = export_all(&snapshot, &reports, &config, &out).unwrap();
    // Reports, KPIs and the two forecast sheets.
    assert_eq!(manifest.files.len(), ReportKind::ALL.len() + 3);
    assert!(out.join(MANIFEST_FILE).is_file());
    for kind in ReportKind::ALL {
        let rows = reports.row_count(kind);
        let csv = fs::read_to_string(out.join(format!("{}.csv", kind.file_stem()))).unwrap();
        assert_eq!(csv.lines().count(), rows + 1, "{}", kind.file_stem());
    }
    for entry in &manifest.files {
        let csv = out.join(&entry.file);
        let lines = fs::read_to_string(&csv).unwrap().lines().count();
        assert_eq!(lines, entry.rows + 1, "{}", entry.file);
    }
    let provinces = manifest.files.iter().find(|e| e.file == PROVINCE_FORECAST_FILE).unwrap();
    assert_eq!(provinces.rows, 4);
    assert!(out.join(REGIONAL_FORECAST_FILE).is_file());
}

#[test]
fn test_capacity_summary_uses_assigned_regions() {
    let snapshot = repaired_dataset();
    let reports = run_all(&snapshot, &ReportConfig::default());

    let assigned: usize = reports.region_capacity.iter().map(|r| r.branch_count).sum();
    assert_eq!(assigned, 150);
    let capacity: u64 = reports.region_capacity.iter().map(|r| r.total_branch_capacity).sum();
    let branch_total: u64 = snapshot.branches.iter().map(|b| b.monthly_transactions).sum();
    assert_eq!(capacity, branch_total);

    let recommendations = &reports.expansion_recommendations;
    let underserved = reports
        .region_capacity
        .iter()
        .filter(|r| r.balance_status == SupplyBalance::Underserved)
        .count();
    assert_eq!(recommendations.len(), underserved);
    for (i, row) in recommendations.iter().enumerate() {
        assert_eq!(row.priority_rank, i + 1);
        assert!(row.branch_count > 0);
        assert!(row.latitude.is_some());
    }
    assert!(recommendations
        .windows(2)
        .all(|w| w[0].demand_score >= w[1].demand_score));
}

#[test]
fn test_region_join_changes_coverage() {
    let snapshot = repaired_dataset();
    let by_region = ReportConfig {
        join_key: JoinKey::Region,
        ..ReportConfig::default()
    };
    let reports = run_all(&snapshot, &by_region);

    let assigned: usize = reports.province_summary.iter().map(|r| r.branch_count).sum();
    assert_eq!(assigned, 150);
    for row in &reports.underserved_regions {
        let count = snapshot
            .branches
            .iter()
            .filter(|b| b.region_id.as_deref() == Some(row.region_id.as_str()))
            .count();
        assert_eq!(row.branch_count, count);
    }
}

#[tokio::test]
async fn test_store_round_trip_matches_source() {
    let snapshot = repaired_dataset();
    let conn = db::connect_in_memory().await.unwrap();
    db::init_schema(&conn).await.unwrap();
    db::load_snapshot(&conn, &snapshot).await.unwrap();

    let stored = db::read_snapshot(&conn).await.unwrap();
    stored.validate().unwrap();
    assert_eq!(stored.branches.len(), 150);
    assert_eq!(stored.regions.len(), 24);
    assert_eq!(stored.transactions.len(), 24 * 36);

    let config = ReportConfig::default();
    let from_source = run_all(&snapshot, &config);
    let from_store = run_all(&stored, &config);
    assert_eq!(from_source.province_summary, from_store.province_summary);
    assert_eq!(from_source.recent_trend, from_store.recent_trend);
}
