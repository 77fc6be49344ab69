//! Run configuration shared by the binaries.

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_DB_PATH: &str = "data/banking.db";
pub const DEFAULT_OUTPUT_DIR: &str = "data/processed";
pub const DEFAULT_SEED: u64 = 42;

/// How branches are matched to regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKey {
    /// Every branch in a region's province counts toward that region.
    #[default]
    Province,
    /// Only branches whose `region_id` names the region (after the repair pass).
    Region,
}

/// Parameters of the report layer.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub join_key: JoinKey,
    /// First month included in the recent-trend report.
    pub trend_cutoff: NaiveDate,
    pub top_regions_limit: usize,
    pub capacity_limit: usize,
    pub capacity_floor: f64,
    pub digital_limit: usize,
    pub trend_limit: usize,
    /// Months projected past the last observation by the forecast outputs.
    pub forecast_horizon: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            join_key: JoinKey::Province,
            trend_cutoff: default_trend_cutoff(),
            top_regions_limit: 10,
            capacity_limit: 20,
            capacity_floor: 700.0,
            digital_limit: 15,
            trend_limit: 50,
            forecast_horizon: crate::forecast::DEFAULT_HORIZON,
        }
    }
}

pub fn default_trend_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 7, 1).expect("valid constant date")
}

/// Locations of the raw CSV inputs under a data directory.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub raw_dir: PathBuf,
}

impl DataPaths {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            raw_dir: data_dir.as_ref().join("raw"),
        }
    }

    pub fn branches(&self) -> PathBuf {
        self.raw_dir.join("branches.csv")
    }

    pub fn regions(&self) -> PathBuf {
        self.raw_dir.join("regional_demand.csv")
    }

    pub fn transactions(&self) -> PathBuf {
        self.raw_dir.join("transactions_timeseries.csv")
    }

    pub fn all_present(&self) -> bool {
        [self.branches(), self.regions(), self.transactions()]
            .iter()
            .all(|p| p.is_file())
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}
