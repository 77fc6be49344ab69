//! The batch reports.
//!
//! Every report is a pure function of a [`Snapshot`] and a [`ReportConfig`];
//! none reads another report's output.

mod branches;
mod capacity;
mod regions;
mod trends;

pub use branches::{branch_capacity, province_branch_performance, BranchCapacityRow, ProvinceBranchPerformanceRow};
pub use capacity::{
    expansion_recommendations, region_capacity, ExpansionRecommendationRow, RegionCapacityRow,
    TRANSACTIONS_PER_NEW_BRANCH, TRANSACTIONS_PER_NEW_STAFF,
};
pub use regions::{
    expansion_targets, province_summary, regional_transactions, underserved_regions, ExpansionTargetRow,
    ProvinceSummaryRow, RegionalTransactionRow, UnderservedRegionRow,
};
pub use trends::{
    deviation_from_baseline, digital_adoption, month_name, province_monthly, recent_trend, seasonal_pattern,
    DigitalAdoptionRow, ProvinceMonthlyRow, RecentTrendRow, SeasonalRow,
};

use crate::config::{JoinKey, ReportConfig};
use crate::models::{Branch, Province, Region};
use crate::snapshot::Snapshot;
use std::collections::HashMap;
use tracing::debug;

/// Branch lookup for a region under the chosen join key.
pub struct Association<'a> {
    key: JoinKey,
    by_province: HashMap<Province, Vec<&'a Branch>>,
    by_region: HashMap<&'a str, Vec<&'a Branch>>,
}

impl<'a> Association<'a> {
    pub fn new(branches: &'a [Branch], key: JoinKey) -> Self {
        let mut by_province: HashMap<Province, Vec<&'a Branch>> = HashMap::new();
        let mut by_region: HashMap<&'a str, Vec<&'a Branch>> = HashMap::new();
        for branch in branches {
            by_province.entry(branch.province).or_default().push(branch);
            if let Some(region_id) = branch.region_id.as_deref() {
                by_region.entry(region_id).or_default().push(branch);
            }
        }
        Self { key, by_province, by_region }
    }

    /// Branches joined to `region`; empty when the region has none.
    pub fn branches_of(&self, region: &Region) -> &[&'a Branch] {
        let found = match self.key {
            JoinKey::Province => self.by_province.get(&region.province),
            JoinKey::Region => self.by_region.get(region.region_id.as_str()),
        };
        found.map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Identifies one report for printing and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    RegionalTransactions,
    BranchPerformance,
    UnderservedRegions,
    BranchCapacity,
    ProvinceMonthly,
    SeasonalPattern,
    DigitalAdoption,
    ProvinceSummary,
    ExpansionTargets,
    RecentTrend,
    RegionCapacity,
    ExpansionRecommendations,
}

impl ReportKind {
    pub const ALL: [ReportKind; 12] = [
        ReportKind::RegionalTransactions,
        ReportKind::BranchPerformance,
        ReportKind::UnderservedRegions,
        ReportKind::BranchCapacity,
        ReportKind::ProvinceMonthly,
        ReportKind::SeasonalPattern,
        ReportKind::DigitalAdoption,
        ReportKind::ProvinceSummary,
        ReportKind::ExpansionTargets,
        ReportKind::RecentTrend,
        ReportKind::RegionCapacity,
        ReportKind::ExpansionRecommendations,
    ];

    /// File name of the exported CSV, without extension.
    pub fn file_stem(self) -> &'static str {
        match self {
            ReportKind::RegionalTransactions => "regional_transactions",
            ReportKind::BranchPerformance => "branch_performance_by_province",
            ReportKind::UnderservedRegions => "underserved_regions",
            ReportKind::BranchCapacity => "branch_capacity",
            ReportKind::ProvinceMonthly => "province_monthly_transactions",
            ReportKind::SeasonalPattern => "seasonal_pattern",
            ReportKind::DigitalAdoption => "digital_adoption",
            ReportKind::ProvinceSummary => "province_summary",
            ReportKind::ExpansionTargets => "expansion_targets",
            ReportKind::RecentTrend => "recent_trend",
            ReportKind::RegionCapacity => "regional_summary",
            ReportKind::ExpansionRecommendations => "expansion_recommendations",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ReportKind::RegionalTransactions => "Top Regions by Transaction Volume",
            ReportKind::BranchPerformance => "Branch Performance by Province",
            ReportKind::UnderservedRegions => "Underserved Regions",
            ReportKind::BranchCapacity => "Branch Capacity vs Demand",
            ReportKind::ProvinceMonthly => "Monthly Transactions by Province",
            ReportKind::SeasonalPattern => "Seasonal Pattern",
            ReportKind::DigitalAdoption => "Digital Adoption by Region",
            ReportKind::ProvinceSummary => "Province Summary",
            ReportKind::ExpansionTargets => "Expansion Targets",
            ReportKind::RecentTrend => "Recent Trend with Month-over-Month Growth",
            ReportKind::RegionCapacity => "Regional Capacity Summary",
            ReportKind::ExpansionRecommendations => "Expansion Recommendations",
        }
    }
}

/// Output of one full batch.
#[derive(Debug, Clone, Default)]
pub struct ReportSet {
    pub regional_transactions: Vec<RegionalTransactionRow>,
    pub branch_performance: Vec<ProvinceBranchPerformanceRow>,
    pub underserved_regions: Vec<UnderservedRegionRow>,
    pub branch_capacity: Vec<BranchCapacityRow>,
    pub province_monthly: Vec<ProvinceMonthlyRow>,
    pub seasonal_pattern: Vec<SeasonalRow>,
    pub digital_adoption: Vec<DigitalAdoptionRow>,
    pub province_summary: Vec<ProvinceSummaryRow>,
    pub expansion_targets: Vec<ExpansionTargetRow>,
    pub recent_trend: Vec<RecentTrendRow>,
    pub region_capacity: Vec<RegionCapacityRow>,
    pub expansion_recommendations: Vec<ExpansionRecommendationRow>,
}

impl ReportSet {
    pub fn row_count(&self, kind: ReportKind) -> usize {
        match kind {
            ReportKind::RegionalTransactions => self.regional_transactions.len(),
            ReportKind::BranchPerformance => self.branch_performance.len(),
            ReportKind::UnderservedRegions => self.underserved_regions.len(),
            ReportKind::BranchCapacity => self.branch_capacity.len(),
            ReportKind::ProvinceMonthly => self.province_monthly.len(),
            ReportKind::SeasonalPattern => self.seasonal_pattern.len(),
            ReportKind::DigitalAdoption => self.digital_adoption.len(),
            ReportKind::ProvinceSummary => self.province_summary.len(),
            ReportKind::ExpansionTargets => self.expansion_targets.len(),
            ReportKind::RecentTrend => self.recent_trend.len(),
            ReportKind::RegionCapacity => self.region_capacity.len(),
            ReportKind::ExpansionRecommendations => self.expansion_recommendations.len(),
        }
    }
}

/// Run every report against one snapshot.
pub fn run_all(snapshot: &Snapshot, config: &ReportConfig) -> ReportSet {
    let set = ReportSet {
        regional_transactions: regional_transactions(snapshot, config),
        branch_performance: province_branch_performance(snapshot),
        underserved_regions: underserved_regions(snapshot, config),
        branch_capacity: branch_capacity(snapshot, config),
        province_monthly: province_monthly(snapshot),
        seasonal_pattern: seasonal_pattern(snapshot),
        digital_adoption: digital_adoption(snapshot, config),
        province_summary: province_summary(snapshot, config),
        expansion_targets: expansion_targets(snapshot, config),
        recent_trend: recent_trend(snapshot, config),
        region_capacity: region_capacity(snapshot),
        expansion_recommendations: expansion_recommendations(snapshot),
    };
    for kind in ReportKind::ALL {
        debug!("{}: {} rows", kind.file_stem(), set.row_count(kind));
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::fixtures::{branch, region};

    #[test]
    fn test_association_by_key() {
        let richmond = region("RG001", "Richmond", Province::BritishColumbia, 200_000, 4.0);
        let mut assigned = branch("BR0001", Province::BritishColumbia, 10, 7_000);
        assigned.region_id = Some("RG002".to_string());
        let branches = vec![assigned, branch("BR0002", Province::BritishColumbia, 10, 7_000)];

        let by_province = Association::new(&branches, JoinKey::Province);
        assert_eq!(by_province.branches_of(&richmond).len(), 2);

        let by_region = Association::new(&branches, JoinKey::Region);
        assert!(by_region.branches_of(&richmond).is_empty());
    }

    #[test]
    fn test_file_stems_are_unique() {
        let mut stems: Vec<&str> = ReportKind::ALL.iter().map(|k| k.file_stem()).collect();
        stems.sort();
        stems.dedup();
        assert_eq!(stems.len(), ReportKind::ALL.len());
    }
}
