use super::Association;
use crate::config::ReportConfig;
use crate::dataset::CsvRecord;
use crate::models::{Province, Region};
use crate::numeric::{mean, round_int, round_to, safe_div};
use crate::rules::{CoverageInput, CoverageStatus, ExpansionInput, ExpansionPriority};
use crate::snapshot::Snapshot;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RegionalTransactionRow {
    pub province: Province,
    pub region_name: String,
    pub total_transactions: u64,
    pub avg_digital_adoption: f64,
    pub total_population: u64,
}

impl CsvRecord for RegionalTransactionRow {
    const HEADERS: &'static [&'static str] = &[
        "province",
        "region_name",
        "total_transactions",
        "avg_digital_adoption",
        "total_population",
    ];
}

/// Regions ranked by transaction volume, grouped by (province, region name).
pub fn regional_transactions(snapshot: &Snapshot, config: &ReportConfig) -> Vec<RegionalTransactionRow> {
    let mut groups: BTreeMap<(Province, &str), Vec<&Region>> = BTreeMap::new();
    for region in &snapshot.regions {
        groups
            .entry((region.province, region.region_name.as_str()))
            .or_default()
            .push(region);
    }

    let mut rows: Vec<RegionalTransactionRow> = groups
        .into_iter()
        .map(|((province, region_name), members)| RegionalTransactionRow {
            province,
            region_name: region_name.to_string(),
            total_transactions: members.iter().map(|r| r.avg_monthly_transactions).sum(),
            avg_digital_adoption: mean(members.iter().map(|r| r.digital_adoption_rate))
                .map(|v| round_to(v, 3))
                .unwrap_or_default(),
            total_population: members.iter().map(|r| r.population).sum(),
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_transactions
            .cmp(&a.total_transactions)
            .then_with(|| a.region_name.cmp(&b.region_name))
            .then_with(|| a.province.cmp(&b.province))
    });
    rows.truncate(config.top_regions_limit);
    rows
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UnderservedRegionRow {
    pub region_id: String,
    pub region_name: String,
    pub province: Province,
    pub demand_score: f64,
    pub avg_monthly_transactions: u64,
    pub branch_count: usize,
    pub transactions_per_branch: Option<f64>,
    pub coverage_status: CoverageStatus,
}

impl CsvRecord for UnderservedRegionRow {
    const HEADERS: &'static [&'static str] = &[
        "region_id",
        "region_name",
        "province",
        "demand_score",
        "avg_monthly_transactions",
        "branch_count",
        "transactions_per_branch",
        "coverage_status",
    ];
}

/// Every region whose coverage is below adequate, highest demand first.
pub fn underserved_regions(snapshot: &Snapshot, config: &ReportConfig) -> Vec<UnderservedRegionRow> {
    let association = Association::new(&snapshot.branches, config.join_key);

    let mut rows: Vec<UnderservedRegionRow> = snapshot
        .regions
        .iter()
        .filter_map(|region| {
            let branch_count = association.branches_of(region).len();
            let per_branch = safe_div(region.avg_monthly_transactions as f64, branch_count as f64);
            let status = CoverageStatus::classify(CoverageInput {
                branch_count,
                transactions_per_branch: per_branch,
            });
            status.needs_attention().then(|| UnderservedRegionRow {
                region_id: region.region_id.clone(),
                region_name: region.region_name.clone(),
                province: region.province,
                demand_score: region.demand_score,
                avg_monthly_transactions: region.avg_monthly_transactions,
                branch_count,
                transactions_per_branch: per_branch.map(|v| round_to(v, 2)),
                coverage_status: status,
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        b.demand_score
            .total_cmp(&a.demand_score)
            .then_with(|| a.region_name.cmp(&b.region_name))
    });
    rows
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProvinceSummaryRow {
    pub province: Province,
    pub region_count: usize,
    pub branch_count: usize,
    pub total_population: u64,
    pub avg_median_income: i64,
    pub branch_capacity: u64,
    pub regional_demand: u64,
    pub demand_gap: i64,
    pub avg_digital_adoption_pct: f64,
}

impl CsvRecord for ProvinceSummaryRow {
    const HEADERS: &'static [&'static str] = &[
        "province",
        "region_count",
        "branch_count",
        "total_population",
        "avg_median_income",
        "branch_capacity",
        "regional_demand",
        "demand_gap",
        "avg_digital_adoption_pct",
    ];
}

/// Demand against branch capacity per province.
///
/// Sums run over distinct regions and distinct branches, so a branch joined
/// to several regions of its province is counted once.
pub fn province_summary(snapshot: &Snapshot, config: &ReportConfig) -> Vec<ProvinceSummaryRow> {
    let association = Association::new(&snapshot.branches, config.join_key);

    let mut by_province: BTreeMap<Province, Vec<&Region>> = BTreeMap::new();
    for region in &snapshot.regions {
        by_province.entry(region.province).or_default().push(region);
    }

    let mut rows: Vec<ProvinceSummaryRow> = by_province
        .into_iter()
        .map(|(province, regions)| {
            let mut seen: HashSet<&str> = HashSet::new();
            let mut branch_capacity = 0u64;
            for region in &regions {
                for branch in association.branches_of(region) {
                    if seen.insert(branch.branch_id.as_str()) {
                        branch_capacity += branch.monthly_transactions;
                    }
                }
            }
            let regional_demand: u64 = regions.iter().map(|r| r.avg_monthly_transactions).sum();

            ProvinceSummaryRow {
                province,
                region_count: regions.iter().map(|r| r.region_id.as_str()).collect::<HashSet<_>>().len(),
                branch_count: seen.len(),
                total_population: regions.iter().map(|r| r.population).sum(),
                avg_median_income: mean(regions.iter().map(|r| r.median_income as f64))
                    .map(round_int)
                    .unwrap_or_default(),
                branch_capacity,
                regional_demand,
                demand_gap: regional_demand as i64 - branch_capacity as i64,
                avg_digital_adoption_pct: mean(regions.iter().map(|r| r.digital_adoption_rate))
                    .map(|v| round_to(v * 100.0, 1))
                    .unwrap_or_default(),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.regional_demand
            .cmp(&a.regional_demand)
            .then_with(|| a.province.cmp(&b.province))
    });
    rows
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExpansionTargetRow {
    pub region_id: String,
    pub region_name: String,
    pub province: Province,
    pub demand_score: f64,
    pub population: u64,
    pub avg_monthly_transactions: u64,
    pub current_branches: usize,
    pub demand_per_branch: Option<i64>,
    pub expansion_priority: ExpansionPriority,
}

impl CsvRecord for ExpansionTargetRow {
    const HEADERS: &'static [&'static str] = &[
        "region_id",
        "region_name",
        "province",
        "demand_score",
        "population",
        "avg_monthly_transactions",
        "current_branches",
        "demand_per_branch",
        "expansion_priority",
    ];
}

/// Regions recommended for new branches.
pub fn expansion_targets(snapshot: &Snapshot, config: &ReportConfig) -> Vec<ExpansionTargetRow> {
    let association = Association::new(&snapshot.branches, config.join_key);

    let mut rows: Vec<ExpansionTargetRow> = snapshot
        .regions
        .iter()
        .filter_map(|region| {
            let current_branches = association.branches_of(region).len();
            let priority = ExpansionPriority::classify(ExpansionInput {
                demand_score: region.demand_score,
                branch_count: current_branches,
            });
            priority.is_target().then(|| ExpansionTargetRow {
                region_id: region.region_id.clone(),
                region_name: region.region_name.clone(),
                province: region.province,
                demand_score: region.demand_score,
                population: region.population,
                avg_monthly_transactions: region.avg_monthly_transactions,
                current_branches,
                demand_per_branch: safe_div(region.avg_monthly_transactions as f64, current_branches as f64)
                    .map(round_int),
                expansion_priority: priority,
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        b.demand_score
            .total_cmp(&a.demand_score)
            .then_with(|| a.current_branches.cmp(&b.current_branches))
            .then_with(|| a.region_name.cmp(&b.region_name))
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JoinKey;
    use crate::snapshot::fixtures::{branch, region};

    fn bc_branches(n: usize) -> Vec<crate::models::Branch> {
        (0..n)
            .map(|i| branch(&format!("BR{:04}", i + 1), Province::BritishColumbia, 10, 6_000))
            .collect()
    }

    #[test]
    fn test_regional_transactions_top_ten_with_stable_ties() {
        let regions: Vec<Region> = (0..12)
            .map(|i| {
                let volume = if i < 2 { 500_000 } else { 100_000 + i as u64 };
                region(&format!("RG{:03}", i), &format!("Region {:02}", 11 - i), Province::Ontario, volume, 1.0)
            })
            .collect();
        let snapshot = Snapshot::new(regions, vec![], vec![]);
        let rows = regional_transactions(&snapshot, &ReportConfig::default());

        assert_eq!(rows.len(), 10);
        // Equal totals fall back to region name ascending.
        assert_eq!(rows[0].region_name, "Region 10");
        assert_eq!(rows[1].region_name, "Region 11");
        assert_eq!(rows[2].total_transactions, 100_011);
        assert_eq!(rows[0].total_population, 100_000);
    }

    #[test]
    fn test_regions_without_branches_are_no_coverage() {
        let snapshot = Snapshot::new(
            vec![region("RG001", "Surrey", Province::BritishColumbia, 999_999, 2.0)],
            vec![branch("BR0001", Province::Ontario, 10, 6_000)],
            vec![],
        );
        let rows = underserved_regions(&snapshot, &ReportConfig::default());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].branch_count, 0);
        assert_eq!(rows[0].transactions_per_branch, None);
        assert_eq!(rows[0].coverage_status, CoverageStatus::NoCoverage);
    }

    #[test]
    fn test_coverage_threshold_boundary() {
        let snapshot = Snapshot::new(
            vec![
                region("RG001", "Burnaby", Province::BritishColumbia, 100_001, 3.0),
                region("RG002", "Surrey", Province::BritishColumbia, 100_000, 2.0),
            ],
            bc_branches(1),
            vec![],
        );
        let rows = underserved_regions(&snapshot, &ReportConfig::default());
        assert_eq!(rows[0].region_name, "Burnaby");
        assert_eq!(rows[0].coverage_status, CoverageStatus::SeverelyUnderserved);
        assert_eq!(rows[1].coverage_status, CoverageStatus::Underserved);
    }

    #[test]
    fn test_adequate_regions_are_dropped() {
        let snapshot = Snapshot::new(
            vec![region("RG001", "Burnaby", Province::BritishColumbia, 40_000, 3.0)],
            bc_branches(1),
            vec![],
        );
        assert!(underserved_regions(&snapshot, &ReportConfig::default()).is_empty());
    }

    #[test]
    fn test_richmond_expansion_priority() {
        let richmond = region("RG001", "Richmond", Province::BritishColumbia, 200_000, 4.0);

        let two = Snapshot::new(vec![richmond.clone()], bc_branches(2), vec![]);
        let rows = expansion_targets(&two, &ReportConfig::default());
        assert_eq!(rows[0].expansion_priority, ExpansionPriority::High);
        assert_eq!(rows[0].demand_per_branch, Some(100_000));

        let three = Snapshot::new(vec![richmond], bc_branches(3), vec![]);
        let rows = expansion_targets(&three, &ReportConfig::default());
        assert_eq!(rows[0].expansion_priority, ExpansionPriority::Medium);
        assert_eq!(rows[0].demand_per_branch, Some(66_667));
    }

    #[test]
    fn test_expansion_null_safe_and_ordering() {
        let snapshot = Snapshot::new(
            vec![
                region("RG001", "Laval", Province::Quebec, 80_000, 3.5),
                region("RG002", "Surrey", Province::BritishColumbia, 80_000, 3.5),
                region("RG003", "Ottawa", Province::Ontario, 80_000, 1.0),
            ],
            bc_branches(1),
            vec![],
        );
        let rows = expansion_targets(&snapshot, &ReportConfig::default());
        assert_eq!(rows.len(), 2);
        // Same score: fewer branches first.
        assert_eq!(rows[0].region_name, "Laval");
        assert_eq!(rows[0].demand_per_branch, None);
        assert_eq!(rows[1].region_name, "Surrey");
        assert_eq!(rows[1].demand_per_branch, Some(80_000));
    }

    #[test]
    fn test_province_summary_counts_distinct_branches() {
        let snapshot = Snapshot::new(
            vec![
                region("RG001", "Burnaby", Province::BritishColumbia, 100_000, 3.0),
                region("RG002", "Surrey", Province::BritishColumbia, 50_000, 2.0),
                region("RG003", "Laval", Province::Quebec, 10_000, 1.0),
            ],
            bc_branches(2),
            vec![],
        );
        let rows = province_summary(&snapshot, &ReportConfig::default());
        assert_eq!(rows.len(), 2);

        let bc = &rows[0];
        assert_eq!(bc.province, Province::BritishColumbia);
        assert_eq!(bc.region_count, 2);
        assert_eq!(bc.branch_count, 2);
        assert_eq!(bc.branch_capacity, 12_000);
        assert_eq!(bc.regional_demand, 150_000);
        assert_eq!(bc.demand_gap, 138_000);
        assert_eq!(bc.avg_digital_adoption_pct, 60.0);

        let qc = &rows[1];
        assert_eq!(qc.branch_count, 0);
        assert_eq!(qc.branch_capacity, 0);
        assert_eq!(qc.demand_gap, 10_000);
    }

    #[test]
    fn test_province_summary_gap_goes_negative_when_capacity_exceeds_demand() {
        // Three branches of 6_000 against 10_000 of demand.
        let snapshot = Snapshot::new(
            vec![region("RG001", "Kelowna", Province::BritishColumbia, 10_000, 1.5)],
            bc_branches(3),
            vec![],
        );
        let rows = province_summary(&snapshot, &ReportConfig::default());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].branch_capacity, 18_000);
        assert_eq!(rows[0].regional_demand, 10_000);
        assert_eq!(rows[0].demand_gap, -8_000);
    }

    #[test]
    fn test_region_join_key_uses_assignment() {
        let mut branches = bc_branches(2);
        branches[0].region_id = Some("RG001".to_string());
        branches[1].region_id = Some("RG002".to_string());
        let snapshot = Snapshot::new(
            vec![
                region("RG001", "Burnaby", Province::BritishColumbia, 100_001, 3.0),
                region("RG002", "Surrey", Province::BritishColumbia, 40_000, 2.0),
            ],
            branches,
            vec![],
        );
        let config = ReportConfig {
            join_key: JoinKey::Region,
            ..ReportConfig::default()
        };
        let rows = underserved_regions(&snapshot, &config);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].branch_count, 1);
        assert_eq!(rows[0].coverage_status, CoverageStatus::SeverelyUnderserved);
    }
}
