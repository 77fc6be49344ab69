//! Demand forecasting
//!
//! A least-squares linear trend over the monthly series, adjusted by the mean
//! ratio of actual to trend for each calendar month. Months with no history
//! get a neutral factor of 1.0.

use crate::config::ReportConfig;
use crate::dataset::CsvRecord;
use crate::models::Province;
use crate::numeric::{mean, percentage, round_int, round_to, safe_div};
use crate::queries::{Association, ExpansionTargetRow, TRANSACTIONS_PER_NEW_BRANCH, TRANSACTIONS_PER_NEW_STAFF};
use crate::snapshot::Snapshot;
use chrono::{Datelike, Months, NaiveDate};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_HORIZON: u32 = 6;
/// Months of history a region needs before it is forecast.
pub const MIN_HISTORY: usize = 12;
const HIGH_GROWTH_SLOPE: f64 = 1_000.0;

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub trend: f64,
    pub forecast: f64,
}

/// Fitted trend and seasonal factors for one monthly series.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendModel {
    pub slope: f64,
    pub intercept: f64,
    seasonal: BTreeMap<u32, f64>,
    last_index: usize,
    last_date: NaiveDate,
}

impl TrendModel {
    /// Fit a series of first-of-month observations. `None` with fewer than
    /// two points.
    pub fn fit(series: &[(NaiveDate, f64)]) -> Option<Self> {
        let mut sorted = series.to_vec();
        sorted.sort_by_key(|(date, _)| *date);
        let (last_date, _) = *sorted.last()?;

        let x_mean = mean((0..sorted.len()).map(|x| x as f64))?;
        let y_mean = mean(sorted.iter().map(|(_, y)| *y))?;
        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (x, (_, y)) in sorted.iter().enumerate() {
            let dx = x as f64 - x_mean;
            sxy += dx * (y - y_mean);
            sxx += dx * dx;
        }
        let slope = safe_div(sxy, sxx)?;
        let intercept = y_mean - slope * x_mean;

        let mut ratios: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for (x, (date, y)) in sorted.iter().enumerate() {
            if let Some(ratio) = safe_div(*y, slope * x as f64 + intercept) {
                ratios.entry(date.month()).or_default().push(ratio);
            }
        }
        let seasonal = ratios
            .into_iter()
            .filter_map(|(month, values)| Some((month, mean(values)?)))
            .collect();

        Some(Self {
            slope,
            intercept,
            seasonal,
            last_index: sorted.len() - 1,
            last_date,
        })
    }

    pub fn seasonal_factor(&self, month: u32) -> f64 {
        self.seasonal.get(&month).copied().unwrap_or(1.0)
    }

    /// Project `months_ahead` months past the last observation.
    pub fn project(&self, months_ahead: u32) -> Vec<ForecastPoint> {
        (1..=months_ahead)
            .filter_map(|step| {
                let date = self.last_date.checked_add_months(Months::new(step))?;
                let trend = self.slope * (self.last_index + step as usize) as f64 + self.intercept;
                Some(ForecastPoint {
                    date,
                    trend,
                    forecast: trend * self.seasonal_factor(date.month()),
                })
            })
            .collect()
    }
}

/// Annualised growth between the first and last observation, in percent.
pub fn annualised_growth(series: &[(NaiveDate, f64)]) -> Option<f64> {
    let first = series.iter().min_by_key(|(date, _)| *date)?.1;
    let last = series.iter().max_by_key(|(date, _)| *date)?.1;
    let ratio = safe_div(last, first)?;
    if ratio <= 0.0 {
        return None;
    }
    let growth = (ratio.powf(12.0 / series.len() as f64) - 1.0) * 100.0;
    Some(round_to(growth, 2))
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvinceForecast {
    pub province: Province,
    pub months_observed: usize,
    /// Volume of the last observed month.
    pub current_monthly: u64,
    pub months_ahead: u32,
    /// Straight-line extension of the last month: `current + slope * months_ahead`.
    pub forecast_demand: i64,
    /// Fitted slope in transactions per month.
    pub monthly_growth: f64,
    /// Slope as a percentage of the last observed month.
    pub growth_rate_pct: Option<f64>,
    pub annual_growth_pct: Option<f64>,
    pub points: Vec<ForecastPoint>,
}

/// Flat export row of a [`ProvinceForecast`], without the monthly points.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProvinceForecastRow {
    pub province: Province,
    pub months_observed: usize,
    pub current_monthly: u64,
    pub months_ahead: u32,
    pub forecast_demand: i64,
    pub monthly_growth: f64,
    pub growth_rate_pct: Option<f64>,
    pub annual_growth_pct: Option<f64>,
}

impl CsvRecord for ProvinceForecastRow {
    const HEADERS: &'static [&'static str] = &[
        "province",
        "months_observed",
        "current_monthly",
        "months_ahead",
        "forecast_demand",
        "monthly_growth",
        "growth_rate_pct",
        "annual_growth_pct",
    ];
}

impl From<&ProvinceForecast> for ProvinceForecastRow {
    fn from(f: &ProvinceForecast) -> Self {
        Self {
            province: f.province,
            months_observed: f.months_observed,
            current_monthly: f.current_monthly,
            months_ahead: f.months_ahead,
            forecast_demand: f.forecast_demand,
            monthly_growth: f.monthly_growth,
            growth_rate_pct: f.growth_rate_pct,
            annual_growth_pct: f.annual_growth_pct,
        }
    }
}

/// Aggregate monthly series per province.
pub fn province_series(snapshot: &Snapshot) -> BTreeMap<Province, Vec<(NaiveDate, f64)>> {
    let mut totals: BTreeMap<Province, BTreeMap<NaiveDate, u64>> = BTreeMap::new();
    for record in &snapshot.transactions {
        *totals
            .entry(record.province)
            .or_default()
            .entry(record.date)
            .or_default() += record.transactions;
    }
    totals
        .into_iter()
        .map(|(province, by_date)| {
            let series = by_date.into_iter().map(|(d, v)| (d, v as f64)).collect();
            (province, series)
        })
        .collect()
}

/// One forecast per province, highest projected demand first.
pub fn province_forecasts(snapshot: &Snapshot, months_ahead: u32) -> Vec<ProvinceForecast> {
    let mut forecasts: Vec<ProvinceForecast> = province_series(snapshot)
        .into_iter()
        .filter_map(|(province, series)| {
            let model = TrendModel::fit(&series)?;
            let current = series.last().map(|(_, v)| *v)?;
            Some(ProvinceForecast {
                province,
                months_observed: series.len(),
                current_monthly: current as u64,
                months_ahead,
                forecast_demand: round_int(current + model.slope * months_ahead as f64),
                monthly_growth: round_to(model.slope, 2),
                growth_rate_pct: percentage(model.slope, current, 2),
                annual_growth_pct: annualised_growth(&series),
                points: model.project(months_ahead),
            })
        })
        .collect();

    forecasts.sort_by(|a, b| {
        b.forecast_demand
            .cmp(&a.forecast_demand)
            .then_with(|| a.province.cmp(&b.province))
    });
    forecasts
}

/// Recommended response to a projected capacity gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    OpenBranchesNow,
    OpenBranches(i64),
    IncreaseStaffing,
}

impl Action {
    pub fn for_branches_needed(branches_needed: i64) -> Self {
        match branches_needed {
            n if n > 3 => Action::OpenBranchesNow,
            n if n > 1 => Action::OpenBranches(n),
            _ => Action::IncreaseStaffing,
        }
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::OpenBranchesNow => f.write_str("Open 3-4 new branches immediately"),
            Action::OpenBranches(n) => write!(f, "Open {} new branches", n),
            Action::IncreaseStaffing => f.write_str("Increase staffing in existing branches"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionalForecast {
    pub region_id: String,
    pub region_name: String,
    pub province: Province,
    pub demand_score: f64,
    pub current_demand: u64,
    pub current_capacity: u64,
    pub forecast_demand: i64,
    pub projected_gap: i64,
    pub monthly_growth: f64,
    pub branches_needed: i64,
    pub staff_needed: i64,
    pub action: Action,
    pub high_growth: bool,
}

impl CsvRecord for RegionalForecast {
    const HEADERS: &'static [&'static str] = &[
        "region_id",
        "region_name",
        "province",
        "demand_score",
        "current_demand",
        "current_capacity",
        "forecast_demand",
        "projected_gap",
        "monthly_growth",
        "branches_needed",
        "staff_needed",
        "action",
        "high_growth",
    ];
}

/// Forecast each expansion target and size the gap against the capacity of
/// the branches currently serving it.
pub fn regional_forecasts(
    snapshot: &Snapshot,
    config: &ReportConfig,
    targets: &[ExpansionTargetRow],
    months_ahead: u32,
) -> Vec<RegionalForecast> {
    let association = Association::new(&snapshot.branches, config.join_key);

    targets
        .iter()
        .filter_map(|target| {
            let region = snapshot.region(&target.region_id)?;
            let series: Vec<(NaiveDate, f64)> = snapshot
                .transactions
                .iter()
                .filter(|r| r.region_id == region.region_id)
                .map(|r| (r.date, r.transactions as f64))
                .collect();
            if series.len() < MIN_HISTORY {
                return None;
            }
            let model = TrendModel::fit(&series)?;
            let horizon = model.project(months_ahead).last()?.forecast;
            let capacity: u64 = association
                .branches_of(region)
                .iter()
                .map(|b| b.monthly_transactions)
                .sum();
            let gap = horizon - capacity as f64;
            let branches_needed = round_int(gap / TRANSACTIONS_PER_NEW_BRANCH);

            Some(RegionalForecast {
                region_id: region.region_id.clone(),
                region_name: region.region_name.clone(),
                province: region.province,
                demand_score: region.demand_score,
                current_demand: region.avg_monthly_transactions,
                current_capacity: capacity,
                forecast_demand: horizon as i64,
                projected_gap: gap as i64,
                monthly_growth: round_to(model.slope, 2),
                branches_needed,
                staff_needed: round_int(gap / TRANSACTIONS_PER_NEW_STAFF),
                action: Action::for_branches_needed(branches_needed),
                high_growth: model.slope > HIGH_GROWTH_SLOPE,
            })
        })
        .collect()
}
