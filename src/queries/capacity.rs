//! Per-region supply: demand against the capacity of the branches assigned
//! to each region, and the expansion recommendations sized from that gap.
//!
//! Both reports join on the branch's assigned `region_id` whatever join key
//! the run uses, so a branch only counts toward its own region.

use super::Association;
use crate::config::JoinKey;
use crate::dataset::CsvRecord;
use crate::models::Province;
use crate::numeric::{mean, round_int, round_to, safe_div};
use crate::rules::{ExpansionPriority, SupplyBalance, SupplyInput};
use crate::snapshot::Snapshot;
use serde::Serialize;

/// Monthly transactions one new branch absorbs.
pub const TRANSACTIONS_PER_NEW_BRANCH: f64 = 10_000.0;
/// Monthly transactions one additional staff member absorbs.
pub const TRANSACTIONS_PER_NEW_STAFF: f64 = 600.0;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RegionCapacityRow {
    pub region_id: String,
    pub region_name: String,
    pub province: Province,
    pub population: u64,
    pub demand_score: f64,
    pub regional_demand: u64,
    pub branch_count: usize,
    pub total_branch_capacity: u64,
    pub capacity_gap: i64,
    pub demand_to_capacity: Option<f64>,
    pub balance_status: SupplyBalance,
}

impl CsvRecord for RegionCapacityRow {
    const HEADERS: &'static [&'static str] = &[
        "region_id",
        "region_name",
        "province",
        "population",
        "demand_score",
        "regional_demand",
        "branch_count",
        "total_branch_capacity",
        "capacity_gap",
        "demand_to_capacity",
        "balance_status",
    ];
}

/// Every region with its assigned branches' capacity, largest gap first.
pub fn region_capacity(snapshot: &Snapshot) -> Vec<RegionCapacityRow> {
    let association = Association::new(&snapshot.branches, JoinKey::Region);

    let mut rows: Vec<RegionCapacityRow> = snapshot
        .regions
        .iter()
        .map(|region| {
            let branches = association.branches_of(region);
            let capacity: u64 = branches.iter().map(|b| b.monthly_transactions).sum();
            let ratio = safe_div(region.avg_monthly_transactions as f64, capacity as f64);
            RegionCapacityRow {
                region_id: region.region_id.clone(),
                region_name: region.region_name.clone(),
                province: region.province,
                population: region.population,
                demand_score: region.demand_score,
                regional_demand: region.avg_monthly_transactions,
                branch_count: branches.len(),
                total_branch_capacity: capacity,
                capacity_gap: region.avg_monthly_transactions as i64 - capacity as i64,
                demand_to_capacity: ratio.map(|v| round_to(v, 2)),
                balance_status: SupplyBalance::classify(SupplyInput {
                    branch_count: branches.len(),
                    demand_to_capacity: ratio,
                }),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.capacity_gap
            .cmp(&a.capacity_gap)
            .then_with(|| a.region_name.cmp(&b.region_name))
            .then_with(|| a.region_id.cmp(&b.region_id))
    });
    rows
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExpansionRecommendationRow {
    pub priority_rank: usize,
    pub region_id: String,
    pub region_name: String,
    pub province: Province,
    pub population: u64,
    pub demand_score: f64,
    pub regional_demand: u64,
    pub total_branch_capacity: u64,
    pub capacity_gap: i64,
    pub branch_count: usize,
    pub branches_needed: i64,
    pub staff_needed: i64,
    pub priority_level: ExpansionPriority,
    pub recommendation: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl CsvRecord for ExpansionRecommendationRow {
    const HEADERS: &'static [&'static str] = &[
        "priority_rank",
        "region_id",
        "region_name",
        "province",
        "population",
        "demand_score",
        "regional_demand",
        "total_branch_capacity",
        "capacity_gap",
        "branch_count",
        "branches_needed",
        "staff_needed",
        "priority_level",
        "recommendation",
        "latitude",
        "longitude",
    ];
}

fn recommendation(branches_needed: i64, staff_needed: i64) -> String {
    if branches_needed > 0 {
        format!("Open {} new branches, hire {} staff", branches_needed, staff_needed)
    } else {
        format!("Increase staffing by {}", staff_needed)
    }
}

/// Underserved regions ranked by demand score, with the branches and staff
/// needed to close today's gap. Coordinates are the centre of the region's
/// current branches.
pub fn expansion_recommendations(snapshot: &Snapshot) -> Vec<ExpansionRecommendationRow> {
    let association = Association::new(&snapshot.branches, JoinKey::Region);

    let mut underserved: Vec<RegionCapacityRow> = region_capacity(snapshot)
        .into_iter()
        .filter(|row| row.balance_status == SupplyBalance::Underserved)
        .collect();
    underserved.sort_by(|a, b| {
        b.demand_score
            .total_cmp(&a.demand_score)
            .then_with(|| a.region_name.cmp(&b.region_name))
    });

    underserved
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let branches = snapshot
                .region(&row.region_id)
                .map(|region| association.branches_of(region))
                .unwrap_or(&[]);
            let gap = row.capacity_gap as f64;
            let branches_needed = round_int(gap / TRANSACTIONS_PER_NEW_BRANCH);
            let staff_needed = round_int(gap / TRANSACTIONS_PER_NEW_STAFF);
            ExpansionRecommendationRow {
                priority_rank: i + 1,
                priority_level: ExpansionPriority::from_demand_score(row.demand_score),
                recommendation: recommendation(branches_needed, staff_needed),
                latitude: mean(branches.iter().map(|b| b.latitude)).map(|v| round_to(v, 6)),
                longitude: mean(branches.iter().map(|b| b.longitude)).map(|v| round_to(v, 6)),
                region_id: row.region_id,
                region_name: row.region_name,
                province: row.province,
                population: row.population,
                demand_score: row.demand_score,
                regional_demand: row.regional_demand,
                total_branch_capacity: row.total_branch_capacity,
                capacity_gap: row.capacity_gap,
                branch_count: row.branch_count,
                branches_needed,
                staff_needed,
            }
        })
        .collect()
}
