use crate::config::ReportConfig;
use crate::dataset::CsvRecord;
use crate::models::{Province, TransactionRecord};
use crate::numeric::{mean, percentage, round_to, safe_div_opt};
use crate::snapshot::Snapshot;
use crate::window::{lag, partition_sorted};
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Short name of a calendar month (1-12).
pub fn month_name(month: u32) -> Option<&'static str> {
    let index = usize::try_from(month).ok()?.checked_sub(1)?;
    MONTH_NAMES.get(index).copied()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProvinceMonthlyRow {
    pub province: Province,
    pub year: i32,
    pub month: u32,
    pub total_transactions: u64,
    pub in_branch_transactions: u64,
    pub digital_transactions: u64,
    pub digital_pct: Option<f64>,
}

impl CsvRecord for ProvinceMonthlyRow {
    const HEADERS: &'static [&'static str] = &[
        "province",
        "year",
        "month",
        "total_transactions",
        "in_branch_transactions",
        "digital_transactions",
        "digital_pct",
    ];
}

/// Monthly totals per province in chronological order.
pub fn province_monthly(snapshot: &Snapshot) -> Vec<ProvinceMonthlyRow> {
    let mut groups: BTreeMap<(Province, i32, u32), (u64, u64, u64)> = BTreeMap::new();
    for record in &snapshot.transactions {
        let totals = groups.entry((record.province, record.year, record.month)).or_default();
        totals.0 += record.transactions;
        totals.1 += record.in_branch_transactions;
        totals.2 += record.digital_transactions;
    }

    // BTreeMap iteration already yields province, then year, then month.
    groups
        .into_iter()
        .map(|((province, year, month), (total, in_branch, digital))| ProvinceMonthlyRow {
            province,
            year,
            month,
            total_transactions: total,
            in_branch_transactions: in_branch,
            digital_transactions: digital,
            digital_pct: percentage(digital as f64, total as f64, 2),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SeasonalRow {
    pub month: u32,
    pub month_name: &'static str,
    pub avg_transactions: f64,
    pub min_transactions: u64,
    pub max_transactions: u64,
}

impl CsvRecord for SeasonalRow {
    const HEADERS: &'static [&'static str] = &[
        "month",
        "month_name",
        "avg_transactions",
        "min_transactions",
        "max_transactions",
    ];
}

/// Transaction volume by calendar month across every year and region.
pub fn seasonal_pattern(snapshot: &Snapshot) -> Vec<SeasonalRow> {
    let mut groups: BTreeMap<u32, Vec<u64>> = BTreeMap::new();
    for record in &snapshot.transactions {
        groups.entry(record.month).or_default().push(record.transactions);
    }

    groups
        .into_iter()
        .filter_map(|(month, values)| {
            let name = month_name(month)?;
            Some(SeasonalRow {
                month,
                month_name: name,
                avg_transactions: round_to(mean(values.iter().map(|v| *v as f64))?, 2),
                min_transactions: values.iter().copied().min()?,
                max_transactions: values.iter().copied().max()?,
            })
        })
        .collect()
}

/// Percent by which each month's average sits above (or below) the mean of
/// all monthly averages. `None` when the baseline is zero or there are no rows.
pub fn deviation_from_baseline(rows: &[SeasonalRow]) -> Vec<Option<f64>> {
    let baseline = mean(rows.iter().map(|r| r.avg_transactions));
    rows.iter()
        .map(|r| safe_div_opt(Some(r.avg_transactions), baseline).map(|ratio| (ratio - 1.0) * 100.0))
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DigitalAdoptionRow {
    pub region_id: String,
    pub region_name: String,
    pub province: Province,
    pub avg_digital_transactions: f64,
    pub avg_in_branch_transactions: f64,
    pub digital_share_pct: Option<f64>,
}

impl CsvRecord for DigitalAdoptionRow {
    const HEADERS: &'static [&'static str] = &[
        "region_id",
        "region_name",
        "province",
        "avg_digital_transactions",
        "avg_in_branch_transactions",
        "digital_share_pct",
    ];
}

/// Regions ranked by the digital share of their observed transactions.
pub fn digital_adoption(snapshot: &Snapshot, config: &ReportConfig) -> Vec<DigitalAdoptionRow> {
    let mut by_region: HashMap<&str, Vec<&TransactionRecord>> = HashMap::new();
    for record in &snapshot.transactions {
        by_region.entry(record.region_id.as_str()).or_default().push(record);
    }

    let mut rows: Vec<DigitalAdoptionRow> = snapshot
        .regions
        .iter()
        .filter_map(|region| {
            let records = by_region.get(region.region_id.as_str())?;
            let digital = mean(records.iter().map(|r| r.digital_transactions as f64))?;
            let in_branch = mean(records.iter().map(|r| r.in_branch_transactions as f64))?;
            Some(DigitalAdoptionRow {
                region_id: region.region_id.clone(),
                region_name: region.region_name.clone(),
                province: region.province,
                avg_digital_transactions: round_to(digital, 2),
                avg_in_branch_transactions: round_to(in_branch, 2),
                digital_share_pct: percentage(digital, digital + in_branch, 2),
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        descending_nulls_last(a.digital_share_pct, b.digital_share_pct)
            .then_with(|| a.region_name.cmp(&b.region_name))
    });
    rows.truncate(config.digital_limit);
    rows
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecentTrendRow {
    pub region_name: String,
    pub province: Province,
    pub date: NaiveDate,
    pub transactions: u64,
    pub prev_month_transactions: Option<u64>,
    pub mom_growth_pct: Option<f64>,
}

impl CsvRecord for RecentTrendRow {
    const HEADERS: &'static [&'static str] = &[
        "region_name",
        "province",
        "date",
        "transactions",
        "prev_month_transactions",
        "mom_growth_pct",
    ];
}

/// Month-over-month growth per region since the configured cutoff.
///
/// The cutoff is applied before the window, so the first month on or after
/// it has no previous value.
pub fn recent_trend(snapshot: &Snapshot, config: &ReportConfig) -> Vec<RecentTrendRow> {
    let recent = snapshot
        .transactions
        .iter()
        .filter(|r| r.date >= config.trend_cutoff);
    let partitions = partition_sorted(recent, |r| r.region_name.clone(), |r| r.date);

    let mut rows: Vec<RecentTrendRow> = Vec::new();
    for partition in partitions.values() {
        for (current, previous) in lag(partition) {
            let prev = previous.map(|p| p.transactions);
            rows.push(RecentTrendRow {
                region_name: current.region_name.clone(),
                province: current.province,
                date: current.date,
                transactions: current.transactions,
                prev_month_transactions: prev,
                mom_growth_pct: prev.and_then(|p| {
                    percentage(current.transactions as f64 - p as f64, p as f64, 2)
                }),
            });
        }
    }

    rows.sort_by(|a, b| a.region_name.cmp(&b.region_name).then_with(|| b.date.cmp(&a.date)));
    rows.truncate(config.trend_limit);
    rows
}

fn descending_nulls_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Region;
    use crate::snapshot::fixtures::{record, region};

    fn richmond() -> Region {
        region("RG001", "Richmond", Province::BritishColumbia, 200_000, 4.0)
    }

    #[test]
    fn test_month_names() {
        assert_eq!(month_name(1), Some("Jan"));
        assert_eq!(month_name(12), Some("Dec"));
        assert_eq!(month_name(0), None);
        assert_eq!(month_name(13), None);
    }

    #[test]
    fn test_province_monthly_ordering_and_zero_totals() {
        let bc = richmond();
        let on = region("RG002", "Ottawa", Province::Ontario, 90_000, 2.0);
        let snapshot = Snapshot::new(
            vec![bc.clone(), on.clone()],
            vec![],
            vec![
                record(&on, 2021, 2, 0, 0, 0),
                record(&bc, 2021, 2, 300, 100, 200),
                record(&bc, 2021, 1, 400, 100, 300),
                record(&on, 2021, 1, 1_000, 500, 500),
            ],
        );
        let rows = province_monthly(&snapshot);
        let keys: Vec<(Province, u32)> = rows.iter().map(|r| (r.province, r.month)).collect();
        assert_eq!(
            keys,
            vec![
                (Province::BritishColumbia, 1),
                (Province::BritishColumbia, 2),
                (Province::Ontario, 1),
                (Province::Ontario, 2),
            ]
        );
        assert_eq!(rows[0].digital_pct, Some(75.0));
        assert_eq!(rows[1].digital_pct, Some(66.67));
        assert_eq!(rows[3].digital_pct, None);
    }

    #[test]
    fn test_seasonal_pattern_ignores_year() {
        let r = richmond();
        let mut records = Vec::new();
        for (offset, year) in [2021, 2022, 2023].into_iter().enumerate() {
            for month in 1..=12 {
                let total = 1_000 * month as u64 + 10 * offset as u64;
                records.push(record(&r, year, month, total, 0, 0));
            }
        }
        let snapshot = Snapshot::new(vec![r], vec![], records);
        let rows = seasonal_pattern(&snapshot);

        assert_eq!(rows.len(), 12);
        for (i, row) in rows.iter().enumerate() {
            let month = i as u32 + 1;
            assert_eq!(row.month, month);
            assert_eq!(Some(row.month_name), month_name(month));
            assert_eq!(row.avg_transactions, 1_000.0 * month as f64 + 10.0);
            assert_eq!(row.min_transactions, 1_000 * month as u64);
            assert_eq!(row.max_transactions, 1_000 * month as u64 + 20);
        }
    }

    #[test]
    fn test_digital_adoption_share_and_limit() {
        let regions: Vec<Region> = (0..20)
            .map(|i| region(&format!("RG{:03}", i), &format!("Region {:02}", i), Province::Quebec, 50_000, 1.0))
            .collect();
        let mut records: Vec<TransactionRecord> = regions
            .iter()
            .enumerate()
            .map(|(i, r)| record(r, 2022, 3, 100, 100 - i as u64, i as u64))
            .collect();
        // A region whose only month has no split at all.
        records[0] = record(&regions[0], 2022, 3, 0, 0, 0);
        let snapshot = Snapshot::new(regions, vec![], records);
        let rows = digital_adoption(&snapshot, &ReportConfig::default());

        assert_eq!(rows.len(), 15);
        assert_eq!(rows[0].region_name, "Region 19");
        assert_eq!(rows[0].digital_share_pct, Some(19.0));
        assert!(rows.iter().all(|r| r.digital_share_pct.is_some()));
    }

    #[test]
    fn test_digital_adoption_null_share_sorts_last() {
        let a = region("RG001", "Laval", Province::Quebec, 50_000, 1.0);
        let b = region("RG002", "Montreal East", Province::Quebec, 50_000, 1.0);
        let snapshot = Snapshot::new(
            vec![a.clone(), b.clone()],
            vec![],
            vec![record(&a, 2022, 1, 0, 0, 0), record(&b, 2022, 1, 10, 5, 5)],
        );
        let rows = digital_adoption(&snapshot, &ReportConfig::default());
        assert_eq!(rows[0].region_name, "Montreal East");
        assert_eq!(rows[0].digital_share_pct, Some(50.0));
        assert_eq!(rows[1].digital_share_pct, None);
    }

    #[test]
    fn test_recent_trend_window() {
        let r = richmond();
        let snapshot = Snapshot::new(
            vec![r.clone()],
            vec![],
            vec![
                record(&r, 2023, 9, 90, 0, 0),
                record(&r, 2023, 6, 500, 0, 0),
                record(&r, 2023, 7, 100, 0, 0),
                record(&r, 2023, 8, 120, 0, 0),
            ],
        );
        let rows = recent_trend(&snapshot, &ReportConfig::default());

        // Newest first; June is before the cutoff and never becomes a previous value.
        let months: Vec<String> = rows.iter().map(|r| r.date.format("%Y-%m").to_string()).collect();
        assert_eq!(months, vec!["2023-09", "2023-08", "2023-07"]);
        assert_eq!(rows[0].prev_month_transactions, Some(120));
        assert_eq!(rows[0].mom_growth_pct, Some(-25.0));
        assert_eq!(rows[1].prev_month_transactions, Some(100));
        assert_eq!(rows[1].mom_growth_pct, Some(20.0));
        assert_eq!(rows[2].prev_month_transactions, None);
        assert_eq!(rows[2].mom_growth_pct, None);
    }

    #[test]
    fn test_recent_trend_zero_previous_is_null() {
        let r = richmond();
        let snapshot = Snapshot::new(
            vec![r.clone()],
            vec![],
            vec![record(&r, 2023, 7, 0, 0, 0), record(&r, 2023, 8, 50, 0, 0)],
        );
        let rows = recent_trend(&snapshot, &ReportConfig::default());
        assert_eq!(rows[0].prev_month_transactions, Some(0));
        assert_eq!(rows[0].mom_growth_pct, None);
    }

    #[test]
    fn test_recent_trend_partitions_by_region_and_caps() {
        let regions: Vec<Region> = ["Surrey", "Burnaby", "Laval"]
            .iter()
            .enumerate()
            .map(|(i, name)| region(&format!("RG{:03}", i), name, Province::BritishColumbia, 50_000, 1.0))
            .collect();
        let mut records = Vec::new();
        for r in &regions {
            for (year, month) in (7..=12).map(|m| (2023, m)).chain((1..=12).map(|m| (2024, m))) {
                records.push(record(r, year, month, 1_000, 0, 0));
            }
        }
        let snapshot = Snapshot::new(regions, vec![], records);
        let rows = recent_trend(&snapshot, &ReportConfig::default());

        assert_eq!(rows.len(), 50);
        assert_eq!(rows[0].region_name, "Burnaby");
        assert_eq!(rows[0].date.to_string(), "2024-12-01");
        assert_eq!(rows[17].region_name, "Burnaby");
        assert_eq!(rows[17].prev_month_transactions, None);
        assert_eq!(rows[18].region_name, "Laval");
        assert_eq!(rows[1].mom_growth_pct, Some(0.0));
    }

    fn seasonal_row(month: u32, avg: f64) -> SeasonalRow {
        SeasonalRow {
            month,
            month_name: month_name(month).unwrap(),
            avg_transactions: avg,
            min_transactions: 0,
            max_transactions: 0,
        }
    }

    #[test]
    fn test_deviation_from_baseline() {
        let rows = vec![seasonal_row(1, 90.0), seasonal_row(2, 110.0), seasonal_row(3, 100.0)];
        let deviations = deviation_from_baseline(&rows);
        assert_eq!(deviations.len(), 3);
        assert!((deviations[0].unwrap() + 10.0).abs() < 1e-9);
        assert!((deviations[1].unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(deviations[2], Some(0.0));

        let flat = vec![seasonal_row(1, 0.0), seasonal_row(2, 0.0)];
        assert_eq!(deviation_from_baseline(&flat), vec![None, None]);
        assert!(deviation_from_baseline(&[]).is_empty());
    }
}
