use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use thiserror::Error;

use divvy_core::{Bill, BillId, Diner, DinerId, Item, Money, SplitError};

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt bill record: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Split(#[from] SplitError),
}

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    // Pragmas go through the connect options so every pooled connection
    // gets them, not just the first.
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(5));
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bills (
            id TEXT PRIMARY KEY,
            date TEXT NOT NULL,
            tip_percentage TEXT NOT NULL,
            total_cents INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bill_diners (
            bill_id TEXT NOT NULL,
            diner_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            tip_percentage TEXT NOT NULL,
            PRIMARY KEY (bill_id, diner_id),
            FOREIGN KEY (bill_id) REFERENCES bills(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bill_items (
            bill_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            description TEXT NOT NULL,
            price TEXT NOT NULL,
            diner_id TEXT,
            PRIMARY KEY (bill_id, position),
            FOREIGN KEY (bill_id) REFERENCES bills(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// One row of the saved-bill listing, newest first.
#[derive(Debug, Clone)]
pub struct BillSummaryRow {
    pub id: BillId,
    pub date: DateTime<Utc>,
    pub total: Money,
    pub diner_count: i64,
    pub item_count: i64,
}

/// Persist a bill, replacing any previous version under the same id.
pub async fn save_bill(pool: &DbPool, bill: &Bill) -> Result<(), StorageError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT OR REPLACE INTO bills (id, date, tip_percentage, total_cents) VALUES (?, ?, ?, ?)",
    )
    .bind(bill.id.to_string())
    .bind(bill.date.to_rfc3339())
    .bind(bill.tip_percentage.to_string())
    .bind(bill.total_amount().to_cents())
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM bill_diners WHERE bill_id = ?")
        .bind(bill.id.to_string())
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM bill_items WHERE bill_id = ?")
        .bind(bill.id.to_string())
        .execute(&mut *tx)
        .await?;

    for (position, diner) in bill.diners().iter().enumerate() {
        sqlx::query(
            "INSERT INTO bill_diners (bill_id, diner_id, position, name, tip_percentage) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(bill.id.to_string())
        .bind(diner.id.to_string())
        .bind(position as i64)
        .bind(&diner.name)
        .bind(diner.tip_percentage.to_string())
        .execute(&mut *tx)
        .await?;
    }

    for (position, item) in bill.items().iter().enumerate() {
        sqlx::query(
            "INSERT INTO bill_items (bill_id, position, description, price, diner_id) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(bill.id.to_string())
        .bind(position as i64)
        .bind(&item.description)
        .bind(item.price.as_decimal().to_string())
        .bind(item.assigned_to.map(|d| d.to_string()))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::debug!(bill = %bill.id, "bill saved");
    Ok(())
}

/// Load a bill by id, rebuilding the in-memory model and re-checking its
/// assignment invariant.
pub async fn get_bill(pool: &DbPool, id: BillId) -> Result<Option<Bill>, StorageError> {
    let row = sqlx::query_as::<_, (String, String, String)>(
        "SELECT id, date, tip_percentage FROM bills WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    let Some((_, date_raw, tip_raw)) = row else {
        return Ok(None);
    };
    let date = parse_date(&date_raw)?;
    let tip_percentage = parse_decimal(&tip_raw)?;

    let diner_rows = sqlx::query_as::<_, (String, String, String)>(
        "SELECT diner_id, name, tip_percentage FROM bill_diners WHERE bill_id = ? ORDER BY position",
    )
    .bind(id.to_string())
    .fetch_all(pool)
    .await?;

    let mut diners = Vec::with_capacity(diner_rows.len());
    for (diner_id, name, tip) in diner_rows {
        diners.push(Diner {
            id: parse_diner_id(&diner_id)?,
            name,
            tip_percentage: parse_decimal(&tip)?,
        });
    }

    let item_rows = sqlx::query_as::<_, (String, String, Option<String>)>(
        "SELECT description, price, diner_id FROM bill_items WHERE bill_id = ? ORDER BY position",
    )
    .bind(id.to_string())
    .fetch_all(pool)
    .await?;

    let mut items = Vec::with_capacity(item_rows.len());
    for (description, price, diner_id) in item_rows {
        let mut item = Item::new(description, Money::from_decimal(parse_decimal(&price)?));
        item.assigned_to = diner_id.as_deref().map(parse_diner_id).transpose()?;
        items.push(item);
    }

    Ok(Some(Bill::restore(id, date, items, diners, tip_percentage)?))
}

/// List saved bills, newest first.
pub async fn list_bills(pool: &DbPool) -> Result<Vec<BillSummaryRow>, StorageError> {
    let rows = sqlx::query_as::<_, (String, String, i64, i64, i64)>(
        r#"
        SELECT b.id, b.date, b.total_cents,
            (SELECT COUNT(*) FROM bill_diners d WHERE d.bill_id = b.id),
            (SELECT COUNT(*) FROM bill_items i WHERE i.bill_id = b.id)
        FROM bills b
        ORDER BY b.date DESC, b.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut summaries = Vec::with_capacity(rows.len());
    for (id, date, total_cents, diner_count, item_count) in rows {
        summaries.push(BillSummaryRow {
            id: parse_bill_id(&id)?,
            date: parse_date(&date)?,
            total: Money::from_cents(total_cents),
            diner_count,
            item_count,
        });
    }
    Ok(summaries)
}

/// Delete a bill. Returns whether a row existed.
pub async fn delete_bill(pool: &DbPool, id: BillId) -> Result<bool, StorageError> {
    let result = sqlx::query("DELETE FROM bills WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Remove every saved bill.
pub async fn clear_bills(pool: &DbPool) -> Result<(), StorageError> {
    sqlx::query("DELETE FROM bills").execute(pool).await?;
    Ok(())
}

// ── Row parsing ──────────────────────────────────────────────────────────────

fn parse_date(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("bad date '{raw}': {e}")))
}

fn parse_decimal(raw: &str) -> Result<Decimal, StorageError> {
    Decimal::from_str(raw).map_err(|e| StorageError::Corrupt(format!("bad decimal '{raw}': {e}")))
}

fn parse_bill_id(raw: &str) -> Result<BillId, StorageError> {
    BillId::from_str(raw).map_err(|e| StorageError::Corrupt(format!("bad bill id '{raw}': {e}")))
}

fn parse_diner_id(raw: &str) -> Result<DinerId, StorageError> {
    DinerId::from_str(raw).map_err(|e| StorageError::Corrupt(format!("bad diner id '{raw}': {e}")))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn price(s: &str) -> Money {
        Money::from_decimal(dec(s))
    }

    fn sample_bill() -> Bill {
        let date = Utc.with_ymd_and_hms(2024, 6, 1, 21, 30, 0).unwrap();
        let items = vec![
            Item::new("Hamburguesa", price("10.99")),
            Item::new("Refresco", price("2.50")),
            Item::new("Papas fritas", price("3.99")),
        ];
        let mut bill = Bill::new(date, items, vec![], dec("15"));
        let juan = bill.add_diner("Juan", dec("15"));
        let maria = bill.add_diner("María", dec("15"));
        bill.assign_item(0, juan).unwrap();
        bill.assign_item(1, juan).unwrap();
        bill.assign_item(2, maria).unwrap();
        bill
    }

    async fn test_pool(dir: &tempfile::TempDir) -> DbPool {
        create_db(&dir.path().join("bills.db")).await.unwrap()
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir).await;
        let bill = sample_bill();

        save_bill(&pool, &bill).await.unwrap();
        let loaded = get_bill(&pool, bill.id).await.unwrap().unwrap();

        assert_eq!(loaded.id, bill.id);
        assert_eq!(loaded.date, bill.date);
        assert_eq!(loaded.tip_percentage, dec("15"));
        assert_eq!(loaded.items(), bill.items());
        assert_eq!(loaded.diners(), bill.diners());
        assert_eq!(loaded.subtotal(), price("17.48"));
    }

    #[tokio::test]
    async fn get_missing_bill_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir).await;
        assert!(get_bill(&pool, BillId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn saving_twice_replaces_not_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir).await;
        let mut bill = sample_bill();

        save_bill(&pool, &bill).await.unwrap();
        bill.unassign_item(0).unwrap();
        save_bill(&pool, &bill).await.unwrap();

        let loaded = get_bill(&pool, bill.id).await.unwrap().unwrap();
        assert!(loaded.items()[0].assigned_to.is_none());
        assert_eq!(list_bills(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir).await;

        let old = Bill::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            vec![Item::new("Cafe", price("3.20"))],
            vec![],
            dec("0"),
        );
        let recent = Bill::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            vec![Item::new("Menu", price("12.00"))],
            vec![],
            dec("0"),
        );
        save_bill(&pool, &old).await.unwrap();
        save_bill(&pool, &recent).await.unwrap();

        let rows = list_bills(&pool).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, recent.id);
        assert_eq!(rows[1].id, old.id);
        assert_eq!(rows[0].total, price("12.00"));
        assert_eq!(rows[0].item_count, 1);
        assert_eq!(rows[0].diner_count, 0);
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir).await;
        let bill = sample_bill();
        save_bill(&pool, &bill).await.unwrap();

        assert!(delete_bill(&pool, bill.id).await.unwrap());
        assert!(!delete_bill(&pool, bill.id).await.unwrap());
        assert!(get_bill(&pool, bill.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_cascades_to_items_and_diners() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir).await;
        let bill = sample_bill();
        save_bill(&pool, &bill).await.unwrap();
        delete_bill(&pool, bill.id).await.unwrap();

        let (items,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bill_items")
            .fetch_one(&pool)
            .await
            .unwrap();
        let (diners,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bill_diners")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(items, 0);
        assert_eq!(diners, 0);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir).await;
        save_bill(&pool, &sample_bill()).await.unwrap();
        save_bill(&pool, &sample_bill()).await.unwrap();

        clear_bills(&pool).await.unwrap();
        assert!(list_bills(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn exact_price_scale_survives_storage() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir).await;
        let bill = Bill::new(
            Utc.with_ymd_and_hms(2024, 3, 3, 14, 0, 0).unwrap(),
            vec![Item::new("Granel", price("3.999"))],
            vec![],
            dec("10"),
        );
        save_bill(&pool, &bill).await.unwrap();

        let loaded = get_bill(&pool, bill.id).await.unwrap().unwrap();
        assert_eq!(loaded.items()[0].price.as_decimal(), dec("3.999"));
    }
}
