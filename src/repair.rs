//! Branch to region assignment
//!
//! Raw branches only know their province. Each one is placed in a region of
//! that province, sampled with probability proportional to the region's
//! demand score, so busier markets end up with more branches.

use crate::models::{Branch, Province, Region};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RepairSummary {
    pub assigned: usize,
    pub unassigned: usize,
    /// Provinces with branches but no region to place them in.
    pub provinces_without_regions: Vec<Province>,
}

/// Assign `region_id` and `region_name` on every branch whose province has
/// at least one region. Existing assignments are overwritten.
pub fn assign_regions(branches: &mut [Branch], regions: &[Region], seed: u64) -> RepairSummary {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut by_province: BTreeMap<Province, Vec<&Region>> = BTreeMap::new();
    for region in regions {
        by_province.entry(region.province).or_default().push(region);
    }

    let mut summary = RepairSummary::default();
    for province in Province::ALL {
        let members: Vec<&mut Branch> = branches.iter_mut().filter(|b| b.province == province).collect();
        if members.is_empty() {
            continue;
        }

        let candidates = by_province.get(&province).map(Vec::as_slice).unwrap_or(&[]);
        let weights = match demand_weights(candidates) {
            Some(weights) => weights,
            None => {
                warn!("No regions found for {}; {} branches left unassigned", province.name(), members.len());
                summary.unassigned += members.len();
                summary.provinces_without_regions.push(province);
                continue;
            }
        };

        for branch in members {
            let region = candidates[weights.sample(&mut rng)];
            branch.region_id = Some(region.region_id.clone());
            branch.region_name = Some(region.region_name.clone());
            summary.assigned += 1;
        }
    }

    info!(
        "Assigned {} branches to regions ({} unassigned)",
        summary.assigned, summary.unassigned
    );
    summary
}

/// Sampling weights from demand scores. With no positive score every region
/// is equally likely; `None` when there is no region at all.
fn demand_weights(regions: &[&Region]) -> Option<WeightedIndex<f64>> {
    if regions.is_empty() {
        return None;
    }
    let scores: Vec<f64> = regions.iter().map(|r| r.demand_score.max(0.0)).collect();
    WeightedIndex::new(&scores)
        .or_else(|_| WeightedIndex::new(vec![1.0; regions.len()]))
        .ok()
}

/// Branch count per region name, largest first.
pub fn distribution(branches: &[Branch]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for name in branches.iter().filter_map(|b| b.region_name.as_deref()) {
        *counts.entry(name).or_default() += 1;
    }
    let mut rows: Vec<(String, usize)> = counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows
}
