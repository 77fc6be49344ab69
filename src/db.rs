use crate::models::{Branch, Region, TransactionRecord};
use crate::snapshot::Snapshot;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use surrealdb::engine::local::{Db, Mem, RocksDb};
use surrealdb::Surreal;
use tracing::{debug, info};

pub type DbConn = Surreal<Db>;

const NAMESPACE: &str = "banking";
const DATABASE: &str = "analytics";
const INSERT_BATCH: usize = 500;

/// Initialize database connection with RocksDB backend
pub async fn connect(path: &str) -> Result<DbConn> {
    let db = Surreal::new::<RocksDb>(path)
        .await
        .with_context(|| format!("opening store at {}", path))?;
    db.use_ns(NAMESPACE).use_db(DATABASE).await?;
    Ok(db)
}

/// Throwaway store for tests and dry runs
pub async fn connect_in_memory() -> Result<DbConn> {
    let db = Surreal::new::<Mem>(()).await?;
    db.use_ns(NAMESPACE).use_db(DATABASE).await?;
    Ok(db)
}

/// Initialize database schema
pub async fn init_schema(db: &DbConn) -> Result<()> {
    db.query(
        r#"
        -- Regional market rows
        DEFINE TABLE IF NOT EXISTS regional_demand SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_region_id ON regional_demand FIELDS region_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_region_province ON regional_demand FIELDS province;
        DEFINE FIELD IF NOT EXISTS population ON regional_demand ASSERT $value > 0;
        DEFINE FIELD IF NOT EXISTS median_income ON regional_demand ASSERT $value > 0;
        DEFINE FIELD IF NOT EXISTS digital_adoption_rate ON regional_demand ASSERT $value >= 0 AND $value <= 1;
        DEFINE FIELD IF NOT EXISTS in_branch_preference ON regional_demand ASSERT $value >= 0 AND $value <= 1;

        -- Branch locations
        DEFINE TABLE IF NOT EXISTS branches SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_branch_id ON branches FIELDS branch_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_branch_province ON branches FIELDS province;
        DEFINE INDEX IF NOT EXISTS idx_branch_region ON branches FIELDS region_id;
        DEFINE FIELD IF NOT EXISTS staff_count ON branches ASSERT $value > 0;

        -- Monthly observations, one per (region, year, month)
        DEFINE TABLE IF NOT EXISTS transactions_timeseries SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_observation ON transactions_timeseries FIELDS region_id, year, month UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_ts_date ON transactions_timeseries FIELDS date;
        DEFINE FIELD IF NOT EXISTS month ON transactions_timeseries ASSERT $value >= 1 AND $value <= 12;
        "#,
    )
    .await?
    .check()
    .context("defining schema")?;

    Ok(())
}

/// Replace the contents of all three tables with `snapshot`.
pub async fn load_snapshot(db: &DbConn, snapshot: &Snapshot) -> Result<()> {
    db.query("DELETE transactions_timeseries; DELETE branches; DELETE regional_demand;")
        .await?
        .check()
        .context("clearing tables")?;

    insert_batches(db, "regional_demand", &snapshot.regions).await?;
    insert_batches(db, "branches", &snapshot.branches).await?;
    insert_batches(db, "transactions_timeseries", &snapshot.transactions).await?;

    for (table, expected) in [
        ("regional_demand", snapshot.regions.len()),
        ("branches", snapshot.branches.len()),
        ("transactions_timeseries", snapshot.transactions.len()),
    ] {
        let actual = count(db, table).await?;
        if actual != expected {
            bail!("{} holds {} rows after load, expected {}", table, actual, expected);
        }
        info!("  {}: {} rows", table, actual);
    }
    Ok(())
}

async fn insert_batches<T>(db: &DbConn, table: &'static str, rows: &[T]) -> Result<()>
where
    T: Serialize + Clone + 'static,
{
    let batches = rows.chunks(INSERT_BATCH).count();
    for (i, chunk) in rows.chunks(INSERT_BATCH).enumerate() {
        db.query(format!("INSERT INTO {} $rows", table))
            .bind(("rows", chunk.to_vec()))
            .await?
            .check()
            .with_context(|| format!("inserting batch {} into {}", i + 1, table))?;
        debug!("{}: batch {}/{}", table, i + 1, batches);
    }
    Ok(())
}

/// Row count of one table
pub async fn count(db: &DbConn, table: &str) -> Result<usize> {
    let total: Option<i64> = db
        .query(format!("SELECT count() FROM {} GROUP ALL", table))
        .await?
        .take("count")?;
    Ok(total.unwrap_or(0).max(0) as usize)
}

/// Read the three tables back into an immutable snapshot.
pub async fn read_snapshot(db: &DbConn) -> Result<Snapshot> {
    let regions: Vec<Region> = db
        .query("SELECT * OMIT id FROM regional_demand ORDER BY region_id")
        .await?
        .take(0)
        .context("reading regional_demand")?;
    let branches: Vec<Branch> = db
        .query("SELECT * OMIT id FROM branches ORDER BY branch_id")
        .await?
        .take(0)
        .context("reading branches")?;
    let transactions: Vec<TransactionRecord> = db
        .query("SELECT * OMIT id FROM transactions_timeseries ORDER BY region_id, date")
        .await?
        .take(0)
        .context("reading transactions_timeseries")?;

    Ok(Snapshot::new(regions, branches, transactions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Province;
    use crate::snapshot::fixtures::{branch, record, region};

    fn sample() -> Snapshot {
        let richmond = region("RG001", "Richmond", Province::BritishColumbia, 200_000, 4.0);
        let ottawa = region("RG002", "Ottawa", Province::Ontario, 90_000, 2.5);
        let mut assigned = branch("BR0001", Province::BritishColumbia, 10, 7_000);
        assigned.region_id = Some("RG001".to_string());
        assigned.region_name = Some("Richmond".to_string());
        Snapshot::new(
            vec![richmond.clone(), ottawa.clone()],
            vec![assigned, branch("BR0002", Province::Ontario, 12, 9_000)],
            vec![
                record(&richmond, 2023, 7, 100, 40, 60),
                record(&richmond, 2023, 8, 120, 50, 70),
                record(&ottawa, 2023, 7, 80, 30, 50),
            ],
        )
    }

    #[tokio::test]
    async fn test_load_and_read_back() {
        let db = connect_in_memory().await.unwrap();
        init_schema(&db).await.unwrap();
        let snapshot = sample();
        load_snapshot(&db, &snapshot).await.unwrap();

        let read = read_snapshot(&db).await.unwrap();
        assert_eq!(read.regions, snapshot.regions);
        assert_eq!(read.branches, snapshot.branches);
        assert_eq!(read.transactions.len(), 3);
        assert!(read.validate().is_ok());
    }

    #[tokio::test]
    async fn test_reload_replaces_rows() {
        let db = connect_in_memory().await.unwrap();
        init_schema(&db).await.unwrap();
        let snapshot = sample();
        load_snapshot(&db, &snapshot).await.unwrap();
        load_snapshot(&db, &snapshot).await.unwrap();
        assert_eq!(count(&db, "branches").await.unwrap(), 2);
        assert_eq!(count(&db, "transactions_timeseries").await.unwrap(), 3);
    }
}
