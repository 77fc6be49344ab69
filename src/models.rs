use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Province codes covered by the dataset.
///
/// Declaration order is alphabetical by code so the derived `Ord` matches
/// string ordering of the exported column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Province {
    #[serde(rename = "AB", alias = "Alberta")]
    Alberta,
    #[serde(rename = "BC", alias = "British Columbia")]
    BritishColumbia,
    #[serde(rename = "ON", alias = "Ontario")]
    Ontario,
    #[serde(rename = "QC", alias = "Quebec")]
    Quebec,
}

impl Province {
    pub const ALL: [Province; 4] = [
        Province::Alberta,
        Province::BritishColumbia,
        Province::Ontario,
        Province::Quebec,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Province::Alberta => "AB",
            Province::BritishColumbia => "BC",
            Province::Ontario => "ON",
            Province::Quebec => "QC",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Province::Alberta => "Alberta",
            Province::BritishColumbia => "British Columbia",
            Province::Ontario => "Ontario",
            Province::Quebec => "Quebec",
        }
    }
}

impl fmt::Display for Province {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.code())
    }
}

/// Branch format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BranchType {
    #[serde(rename = "Full Service")]
    FullService,
    Express,
    Flagship,
}

impl BranchType {
    pub fn as_str(self) -> &'static str {
        match self {
            BranchType::FullService => "Full Service",
            BranchType::Express => "Express",
            BranchType::Flagship => "Flagship",
        }
    }
}

impl fmt::Display for BranchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Regional market row (`regional_demand`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Region {
    pub region_id: String,
    pub region_name: String,
    pub province: Province,
    pub population: u64,
    pub median_income: u64,
    pub digital_adoption_rate: f64,
    pub avg_monthly_transactions: u64,
    pub in_branch_preference: f64,
    pub small_business_density: u32,
    pub demand_score: f64,
}

/// Physical branch location (`branches`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Branch {
    pub branch_id: String,
    pub province: Province,
    pub latitude: f64,
    pub longitude: f64,
    pub staff_count: u32,
    pub branch_type: BranchType,
    pub opening_year: i32,
    pub monthly_transactions: u64,
    pub transactions_per_staff: f64,
    /// Set by the repair pass; absent on freshly generated data.
    #[serde(default)]
    pub region_id: Option<String>,
    #[serde(default)]
    pub region_name: Option<String>,
}

impl Branch {
    /// Monthly load per staff member, rounded to a whole transaction.
    pub fn derive_transactions_per_staff(monthly_transactions: u64, staff_count: u32) -> Option<f64> {
        crate::numeric::safe_div(monthly_transactions as f64, staff_count as f64).map(f64::round)
    }
}

/// One (region, month) observation (`transactions_timeseries`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    pub region_id: String,
    pub region_name: String,
    pub province: Province,
    pub date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub transactions: u64,
    pub in_branch_transactions: u64,
    pub digital_transactions: u64,
}

impl TransactionRecord {
    /// Build a record for the month starting at `date`, filling year and month from it.
    pub fn for_month(
        region: &Region,
        date: NaiveDate,
        transactions: u64,
        in_branch_transactions: u64,
        digital_transactions: u64,
    ) -> Self {
        Self {
            region_id: region.region_id.clone(),
            region_name: region.region_name.clone(),
            province: region.province,
            date,
            year: date.year(),
            month: date.month(),
            transactions,
            in_branch_transactions,
            digital_transactions,
        }
    }
}
