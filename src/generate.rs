//! Seeded synthetic dataset
//!
//! Produces the three raw tables with the same shape every run for a given
//! seed: branches scattered inside per-province boxes, regional demographics
//! with a composite demand score, and 36 months of seasonal, slowly growing
//! transaction volume per region.

use crate::models::{Branch, BranchType, Province, Region, TransactionRecord};
use crate::numeric::round_to;
use crate::snapshot::Snapshot;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;

/// Where a province's branches are placed and which regions it has.
struct ProvincePlan {
    province: Province,
    latitude: (f64, f64),
    longitude: (f64, f64),
    branches: usize,
    regions: &'static [&'static str],
}

// Ordered as the ids are assigned.
const PLANS: [ProvincePlan; 4] = [
    ProvincePlan {
        province: Province::Ontario,
        latitude: (43.0, 45.5),
        longitude: (-79.5, -75.5),
        branches: 60,
        regions: &[
            "Toronto Central",
            "Toronto North",
            "Toronto East",
            "Toronto West",
            "Mississauga",
            "Brampton",
            "Hamilton",
            "Ottawa",
        ],
    },
    ProvincePlan {
        province: Province::BritishColumbia,
        latitude: (49.0, 49.3),
        longitude: (-123.2, -122.8),
        branches: 35,
        regions: &[
            "Vancouver Downtown",
            "Vancouver East",
            "Vancouver West",
            "Burnaby",
            "Surrey",
            "Richmond",
        ],
    },
    ProvincePlan {
        province: Province::Alberta,
        latitude: (51.0, 51.1),
        longitude: (-114.2, -113.9),
        branches: 30,
        regions: &[
            "Calgary Downtown",
            "Calgary North",
            "Calgary South",
            "Edmonton Central",
            "Edmonton West",
        ],
    },
    ProvincePlan {
        province: Province::Quebec,
        latitude: (45.4, 45.6),
        longitude: (-73.8, -73.5),
        branches: 25,
        regions: &["Montreal Central", "Montreal East", "Montreal West", "Laval", "Quebec City"],
    },
];

const BRANCH_TYPES: [BranchType; 3] = [BranchType::FullService, BranchType::Express, BranchType::Flagship];
const BRANCH_TYPE_WEIGHTS: [f64; 3] = [0.7, 0.2, 0.1];

pub const HISTORY_MONTHS: u32 = 36;
const HISTORY_GROWTH: f64 = 0.06;

/// Volume multiplier for a calendar month.
pub fn seasonal_factor(month: u32) -> f64 {
    match month {
        11 | 12 => 1.15,
        1 | 2 => 0.90,
        6..=8 => 1.05,
        _ => 1.0,
    }
}

/// Composite demand metric from population, volume and business density.
pub fn demand_score(population: u64, avg_monthly_transactions: u64, small_business_density: u32) -> f64 {
    let score = population as f64 / 100_000.0 * 0.4
        + avg_monthly_transactions as f64 / 100_000.0 * 0.3
        + small_business_density as f64 / 500.0 * 0.3;
    round_to(score, 2)
}

pub struct Generator {
    rng: StdRng,
    start: NaiveDate,
}

impl Generator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            start: NaiveDate::from_ymd_opt(2021, 1, 1).expect("valid constant date"),
        }
    }

    pub fn branches(&mut self) -> Result<Vec<Branch>> {
        let type_index = WeightedIndex::new(BRANCH_TYPE_WEIGHTS).context("branch type weights")?;
        let mut branches = Vec::new();
        for plan in &PLANS {
            for _ in 0..plan.branches {
                let staff_count: u32 = self.rng.gen_range(8..25);
                let monthly_transactions: u64 = self.rng.gen_range(3_000..15_000);
                let latitude = round_to(self.rng.gen_range(plan.latitude.0..plan.latitude.1), 6);
                let longitude = round_to(self.rng.gen_range(plan.longitude.0..plan.longitude.1), 6);
                branches.push(Branch {
                    branch_id: format!("BR{:04}", branches.len() + 1),
                    province: plan.province,
                    latitude,
                    longitude,
                    staff_count,
                    branch_type: BRANCH_TYPES[type_index.sample(&mut self.rng)],
                    opening_year: self.rng.gen_range(1995..2020),
                    monthly_transactions,
                    transactions_per_staff: Branch::derive_transactions_per_staff(monthly_transactions, staff_count)
                        .unwrap_or_default(),
                    region_id: None,
                    region_name: None,
                });
            }
        }
        Ok(branches)
    }

    pub fn regions(&mut self) -> Vec<Region> {
        let mut regions = Vec::new();
        for plan in &PLANS {
            for name in plan.regions {
                let population: u64 = self.rng.gen_range(50_000..500_000);
                let median_income: u64 = self.rng.gen_range(45_000..95_000);
                let digital = (median_income as f64 / 100_000.0 * 0.7 + self.rng.gen_range(0.15..0.25)).min(0.85);
                let avg_monthly_transactions = (population as f64 * self.rng.gen_range(0.4..0.8)) as u64;
                let small_business_density: u32 = self.rng.gen_range(100..2_000);
                regions.push(Region {
                    region_id: format!("RG{:03}", regions.len() + 1),
                    region_name: name.to_string(),
                    province: plan.province,
                    population,
                    median_income,
                    digital_adoption_rate: round_to(digital, 3),
                    avg_monthly_transactions,
                    in_branch_preference: round_to(1.0 - digital, 3),
                    small_business_density,
                    demand_score: demand_score(population, avg_monthly_transactions, small_business_density),
                });
            }
        }
        regions
    }

    pub fn transactions(&mut self, regions: &[Region]) -> Result<Vec<TransactionRecord>> {
        let mut records = Vec::with_capacity(regions.len() * HISTORY_MONTHS as usize);
        for region in regions {
            for offset in 0..HISTORY_MONTHS {
                let date = self
                    .start
                    .checked_add_months(chrono::Months::new(offset))
                    .context("history runs past the calendar")?;
                let month = chrono::Datelike::month(&date);
                let growth = 1.0 + offset as f64 / HISTORY_MONTHS as f64 * HISTORY_GROWTH;
                let noise = self.rng.gen_range(0.95..1.05);
                let total = (region.avg_monthly_transactions as f64 * seasonal_factor(month) * growth * noise) as u64;
                records.push(TransactionRecord::for_month(
                    region,
                    date,
                    total,
                    (total as f64 * region.in_branch_preference) as u64,
                    (total as f64 * region.digital_adoption_rate) as u64,
                ));
            }
        }
        Ok(records)
    }

    /// All three tables. Branches carry no region until the repair pass.
    pub fn snapshot(&mut self) -> Result<Snapshot> {
        let branches = self.branches()?;
        let regions = self.regions();
        let transactions = self.transactions(&regions)?;
        Ok(Snapshot::new(regions, branches, transactions))
    }
}

pub fn generate(seed: u64) -> Result<Snapshot> {
    Generator::new(seed).snapshot()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_shape_and_validity() {
        let snapshot = generate(42).unwrap();
        assert_eq!(snapshot.branches.len(), 150);
        assert_eq!(snapshot.regions.len(), 24);
        assert_eq!(snapshot.transactions.len(), 24 * 36);
        assert_eq!(snapshot.validate(), Ok(()));

        let ontario = snapshot.branches.iter().filter(|b| b.province == Province::Ontario).count();
        assert_eq!(ontario, 60);
        assert_eq!(snapshot.branches[0].branch_id, "BR0001");
        assert_eq!(snapshot.regions[23].region_id, "RG024");
        assert_eq!(snapshot.regions[23].region_name, "Quebec City");
    }

    #[test]
    fn test_same_seed_same_data() {
        let a = generate(7).unwrap();
        let b = generate(7).unwrap();
        assert_eq!(a.branches, b.branches);
        assert_eq!(a.transactions, b.transactions);
        assert_ne!(generate(8).unwrap().branches, a.branches);
    }

    #[test]
    fn test_value_ranges() {
        let snapshot = generate(42).unwrap();
        for b in &snapshot.branches {
            assert!((8..25).contains(&b.staff_count));
            assert!((3_000..15_000).contains(&b.monthly_transactions));
            assert!((1995..2020).contains(&b.opening_year));
            assert!(b.region_id.is_none());
        }
        for r in &snapshot.regions {
            assert!(r.digital_adoption_rate <= 0.85);
            assert!((r.digital_adoption_rate + r.in_branch_preference - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_history_starts_january_2021() {
        let generator = Generator::new(42);
        assert_eq!(generator.start, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
        assert_ne!(generator.start, NaiveDate::default());
    }

    #[test]
    fn test_history_is_first_of_month() {
        let snapshot = generate(42).unwrap();
        let first: Vec<_> = snapshot
            .transactions
            .iter()
            .filter(|t| t.region_id == "RG001")
            .collect();
        assert_eq!(first.len(), 36);
        assert_eq!(first[0].date.to_string(), "2021-01-01");
        assert_eq!(first[35].date.to_string(), "2023-12-01");
        assert!(first.iter().all(|t| t.date.day() == 1));
    }

    #[test]
    fn test_demand_score_formula() {
        // 0.4 * 2 + 0.3 * 1 + 0.3 * 2
        assert_eq!(demand_score(200_000, 100_000, 1_000), 1.7);
    }

    #[test]
    fn test_seasonal_factors() {
        assert_eq!(seasonal_factor(12), 1.15);
        assert_eq!(seasonal_factor(2), 0.90);
        assert_eq!(seasonal_factor(7), 1.05);
        assert_eq!(seasonal_factor(4), 1.0);
    }
}
