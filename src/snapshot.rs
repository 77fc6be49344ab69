//! Immutable point-in-time view of the three tables.

use crate::error::ValidationError;
use crate::models::{Branch, Region, TransactionRecord};
use chrono::Datelike;
use std::collections::{HashMap, HashSet};

const LATITUDE_RANGE: (f64, f64) = (41.0, 60.0);
const LONGITUDE_RANGE: (f64, f64) = (-141.0, -52.0);

/// Everything the reports read. Built once per run, never mutated.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub regions: Vec<Region>,
    pub branches: Vec<Branch>,
    pub transactions: Vec<TransactionRecord>,
}

impl Snapshot {
    pub fn new(regions: Vec<Region>, branches: Vec<Branch>, transactions: Vec<TransactionRecord>) -> Self {
        Self { regions, branches, transactions }
    }

    pub fn region(&self, region_id: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.region_id == region_id)
    }

    /// Check every table constraint, stopping at the first violation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut region_ids: HashMap<&str, &Region> = HashMap::new();
        for region in &self.regions {
            if region_ids.insert(region.region_id.as_str(), region).is_some() {
                return Err(ValidationError::DuplicateRegion(region.region_id.clone()));
            }
            validate_region(region)?;
        }

        let mut branch_ids: HashSet<&str> = HashSet::new();
        for branch in &self.branches {
            if !branch_ids.insert(branch.branch_id.as_str()) {
                return Err(ValidationError::DuplicateBranch(branch.branch_id.clone()));
            }
            validate_branch(branch)?;
            if let Some(region_id) = &branch.region_id {
                match region_ids.get(region_id.as_str()) {
                    None => return Err(ValidationError::UnknownRegion(region_id.clone())),
                    Some(region) if region.province != branch.province => {
                        return Err(ValidationError::MisassignedBranch {
                            branch_id: branch.branch_id.clone(),
                            region_id: region_id.clone(),
                            province: branch.province.to_string(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        let mut observations: HashSet<(&str, i32, u32)> = HashSet::new();
        for record in &self.transactions {
            if !(1..=12).contains(&record.month) {
                return Err(ValidationError::InvalidMonth {
                    region_id: record.region_id.clone(),
                    month: record.month,
                });
            }
            if record.date.year() != record.year
                || record.date.month() != record.month
                || record.date.day() != 1
            {
                return Err(ValidationError::DateMismatch {
                    region_id: record.region_id.clone(),
                    date: record.date.to_string(),
                    year: record.year,
                    month: record.month,
                });
            }
            if !region_ids.contains_key(record.region_id.as_str()) {
                return Err(ValidationError::UnknownRegion(record.region_id.clone()));
            }
            if !observations.insert((record.region_id.as_str(), record.year, record.month)) {
                return Err(ValidationError::DuplicateObservation {
                    region_id: record.region_id.clone(),
                    year: record.year,
                    month: record.month,
                });
            }
        }

        Ok(())
    }
}

fn validate_region(region: &Region) -> Result<(), ValidationError> {
    if region.population == 0 {
        return Err(ValidationError::NonPositive {
            region_id: region.region_id.clone(),
            field: "population",
        });
    }
    if region.median_income == 0 {
        return Err(ValidationError::NonPositive {
            region_id: region.region_id.clone(),
            field: "median_income",
        });
    }
    for (field, value) in [
        ("digital_adoption_rate", region.digital_adoption_rate),
        ("in_branch_preference", region.in_branch_preference),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(ValidationError::RateOutOfRange {
                region_id: region.region_id.clone(),
                field,
                value,
            });
        }
    }
    Ok(())
}

fn validate_branch(branch: &Branch) -> Result<(), ValidationError> {
    let exact = crate::numeric::safe_div(branch.monthly_transactions as f64, branch.staff_count as f64)
        .ok_or_else(|| ValidationError::NoStaff(branch.branch_id.clone()))?;
    // Stored values are rounded to a whole transaction.
    if (branch.transactions_per_staff - exact).abs() > 0.5 + 1e-9 {
        return Err(ValidationError::InconsistentLoad {
            branch_id: branch.branch_id.clone(),
            expected: exact.round(),
            actual: branch.transactions_per_staff,
        });
    }
    let lat_ok = (LATITUDE_RANGE.0..=LATITUDE_RANGE.1).contains(&branch.latitude);
    let lon_ok = (LONGITUDE_RANGE.0..=LONGITUDE_RANGE.1).contains(&branch.longitude);
    if !lat_ok || !lon_ok {
        return Err(ValidationError::OutOfBounds {
            branch_id: branch.branch_id.clone(),
            latitude: branch.latitude,
            longitude: branch.longitude,
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::models::{Branch, BranchType, Province, Region, TransactionRecord};
    use chrono::NaiveDate;

    pub fn region(id: &str, name: &str, province: Province, avg_monthly: u64, demand_score: f64) -> Region {
        Region {
            region_id: id.to_string(),
            region_name: name.to_string(),
            province,
            population: 100_000,
            median_income: 60_000,
            digital_adoption_rate: 0.6,
            avg_monthly_transactions: avg_monthly,
            in_branch_preference: 0.4,
            small_business_density: 500,
            demand_score,
        }
    }

    pub fn branch(id: &str, province: Province, staff: u32, monthly: u64) -> Branch {
        Branch {
            branch_id: id.to_string(),
            province,
            latitude: 49.1,
            longitude: -123.0,
            staff_count: staff,
            branch_type: BranchType::FullService,
            opening_year: 2005,
            monthly_transactions: monthly,
            transactions_per_staff: Branch::derive_transactions_per_staff(monthly, staff).unwrap_or(0.0),
            region_id: None,
            region_name: None,
        }
    }

    pub fn record(region: &Region, year: i32, month: u32, total: u64, in_branch: u64, digital: u64) -> TransactionRecord {
        let date = NaiveDate::from_ymd_opt(year, month, 1).expect("valid month");
        TransactionRecord::for_month(region, date, total, in_branch, digital)
    }
}
