use super::Association;
use crate::config::ReportConfig;
use crate::dataset::CsvRecord;
use crate::models::{Branch, BranchType, Province};
use crate::numeric::{mean, round_int, round_to, safe_div};
use crate::rules::CapacityStatus;
use crate::snapshot::Snapshot;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProvinceBranchPerformanceRow {
    pub province: Province,
    pub branch_count: usize,
    pub avg_staff: f64,
    pub total_transactions: u64,
    pub avg_transactions_per_staff: f64,
    pub avg_transactions_per_branch: i64,
}

impl CsvRecord for ProvinceBranchPerformanceRow {
    const HEADERS: &'static [&'static str] = &[
        "province",
        "branch_count",
        "avg_staff",
        "total_transactions",
        "avg_transactions_per_staff",
        "avg_transactions_per_branch",
    ];
}

/// Branch network size and throughput per province, busiest first.
pub fn province_branch_performance(snapshot: &Snapshot) -> Vec<ProvinceBranchPerformanceRow> {
    let mut groups: BTreeMap<Province, Vec<&Branch>> = BTreeMap::new();
    for branch in &snapshot.branches {
        groups.entry(branch.province).or_default().push(branch);
    }

    let mut rows: Vec<ProvinceBranchPerformanceRow> = groups
        .into_iter()
        .map(|(province, branches)| {
            let total_transactions: u64 = branches.iter().map(|b| b.monthly_transactions).sum();
            ProvinceBranchPerformanceRow {
                province,
                branch_count: branches.len(),
                avg_staff: mean(branches.iter().map(|b| b.staff_count as f64))
                    .map(|v| round_to(v, 1))
                    .unwrap_or_default(),
                total_transactions,
                avg_transactions_per_staff: mean(branches.iter().map(|b| b.transactions_per_staff))
                    .map(|v| round_to(v, 1))
                    .unwrap_or_default(),
                avg_transactions_per_branch: safe_div(total_transactions as f64, branches.len() as f64)
                    .map(round_int)
                    .unwrap_or_default(),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_transactions
            .cmp(&a.total_transactions)
            .then_with(|| a.province.cmp(&b.province))
    });
    rows
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BranchCapacityRow {
    pub branch_id: String,
    pub branch_type: BranchType,
    pub province: Province,
    pub region_name: String,
    pub staff_count: u32,
    pub monthly_transactions: u64,
    pub transactions_per_staff: f64,
    pub capacity_status: CapacityStatus,
}

impl CsvRecord for BranchCapacityRow {
    const HEADERS: &'static [&'static str] = &[
        "branch_id",
        "branch_type",
        "province",
        "region_name",
        "staff_count",
        "monthly_transactions",
        "transactions_per_staff",
        "capacity_status",
    ];
}

/// Heavily loaded branches joined to the regions they serve.
///
/// The join is inner: a branch with no region under the join key is absent.
/// Joined by province, a branch appears once per region of its province.
pub fn branch_capacity(snapshot: &Snapshot, config: &ReportConfig) -> Vec<BranchCapacityRow> {
    let association = Association::new(&snapshot.branches, config.join_key);
    let association = &association;
    let floor = config.capacity_floor;

    let mut rows: Vec<BranchCapacityRow> = snapshot
        .regions
        .iter()
        .flat_map(move |region| {
            association
                .branches_of(region)
                .iter()
                .filter(move |b| b.transactions_per_staff > floor)
                .map(move |b| BranchCapacityRow {
                    branch_id: b.branch_id.clone(),
                    branch_type: b.branch_type,
                    province: b.province,
                    region_name: region.region_name.clone(),
                    staff_count: b.staff_count,
                    monthly_transactions: b.monthly_transactions,
                    transactions_per_staff: b.transactions_per_staff,
                    capacity_status: CapacityStatus::classify(b.transactions_per_staff),
                })
        })
        .collect();

    rows.sort_by(|a, b| {
        b.transactions_per_staff
            .total_cmp(&a.transactions_per_staff)
            .then_with(|| a.branch_id.cmp(&b.branch_id))
            .then_with(|| a.region_name.cmp(&b.region_name))
    });
    rows.truncate(config.capacity_limit);
    rows
}
