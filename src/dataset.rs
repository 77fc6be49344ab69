//! CSV files under `data/raw/` and the processed outputs.

use crate::config::DataPaths;
use crate::models::{Branch, Region, TransactionRecord};
use crate::snapshot::Snapshot;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// Read every row of a headed CSV file, failing on the first malformed one.
pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut rows = Vec::new();
    for (i, row) in reader.deserialize().enumerate() {
        // Line 1 is the header.
        let row: T = row.with_context(|| format!("{}: malformed row at line {}", path.display(), i + 2))?;
        rows.push(row);
    }
    Ok(rows)
}

/// A row type with a fixed column order.
///
/// `HEADERS` must list the serialized field names in declaration order; it
/// is written even when there are no rows.
pub trait CsvRecord: Serialize {
    const HEADERS: &'static [&'static str];
}

/// Write the header line and then `rows`, creating parent directories as
/// needed. Returns the number of data rows written.
pub fn write_csv<T: CsvRecord>(path: &Path, rows: &[T]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(T::HEADERS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(rows.len())
}

impl CsvRecord for Region {
    const HEADERS: &'static [&'static str] = &[
        "region_id",
        "region_name",
        "province",
        "population",
        "median_income",
        "digital_adoption_rate",
        "avg_monthly_transactions",
        "in_branch_preference",
        "small_business_density",
        "demand_score",
    ];
}

impl CsvRecord for Branch {
    const HEADERS: &'static [&'static str] = &[
        "branch_id",
        "province",
        "latitude",
        "longitude",
        "staff_count",
        "branch_type",
        "opening_year",
        "monthly_transactions",
        "transactions_per_staff",
        "region_id",
        "region_name",
    ];
}

impl CsvRecord for TransactionRecord {
    const HEADERS: &'static [&'static str] = &[
        "region_id",
        "region_name",
        "province",
        "date",
        "year",
        "month",
        "transactions",
        "in_branch_transactions",
        "digital_transactions",
    ];
}

pub fn read_regions(paths: &DataPaths) -> Result<Vec<Region>> {
    read_csv(&paths.regions())
}

pub fn read_branches(paths: &DataPaths) -> Result<Vec<Branch>> {
    read_csv(&paths.branches())
}

pub fn read_transactions(paths: &DataPaths) -> Result<Vec<TransactionRecord>> {
    read_csv(&paths.transactions())
}

impl Snapshot {
    /// Load the three raw tables.
    pub fn from_csv(paths: &DataPaths) -> Result<Self> {
        let regions = read_regions(paths)?;
        let branches = read_branches(paths)?;
        let transactions = read_transactions(paths)?;
        info!(
            "Read {} regions, {} branches, {} monthly records from {}",
            regions.len(),
            branches.len(),
            transactions.len(),
            paths.raw_dir.display()
        );
        Ok(Self::new(regions, branches, transactions))
    }

    /// Write the three raw tables, replacing existing files.
    pub fn write_csv(&self, paths: &DataPaths) -> Result<()> {
        write_csv(&paths.regions(), &self.regions)?;
        write_csv(&paths.branches(), &self.branches)?;
        write_csv(&paths.transactions(), &self.transactions)?;
        Ok(())
    }
}
