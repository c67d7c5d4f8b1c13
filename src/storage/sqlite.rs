use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::domain::{Category, Coordinates, ExpenseEntry, ExpenseId, ExpenseRecord};

use super::{MIGRATION_001_EXPENSES, RecordStore};

const SELECT_COLUMNS: &str = "SELECT id, date, trip_name, category, amount_cents, location, latitude, longitude, emoji, description, photo_path FROM expenses";

/// Record store backed by a local SQLite database.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .with_context(|| format!("Failed to connect to database {}", database_url))?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_EXPENSES)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let store = Self::connect(database_url).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Open (creating if needed) the database file at `path` and migrate it.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory {}", parent.display())
            })?;
        }
        let url = format!("sqlite:{}?mode=rwc", path.display());
        debug!(path = %path.display(), "opening sqlite store");
        Self::init(&url).await
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<ExpenseRecord> {
        let id: ExpenseId = row.get("id");
        let date_str: String = row.get("date");
        let category_str: String = row.get("category");
        let amount_cents: i64 = row.get("amount_cents");
        let latitude: Option<f64> = row.get("latitude");
        let longitude: Option<f64> = row.get("longitude");

        let category = Category::from_str(&category_str).ok_or_else(|| {
            anyhow::anyhow!("Invalid category in expense {}: {}", id, category_str)
        })?;
        if amount_cents < 0 {
            anyhow::bail!("Negative amount in expense {}: {}", id, amount_cents);
        }

        Ok(ExpenseRecord {
            id,
            date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
                .with_context(|| format!("Invalid date in expense {}: {}", id, date_str))?,
            trip_name: row.get("trip_name"),
            category,
            amount_cents,
            location: row.get("location"),
            coordinates: Coordinates::from_columns(latitude, longitude)
                .map_err(|e| anyhow::anyhow!("Invalid coordinates in expense {}: {}", id, e))?,
            emoji: row.get("emoji"),
            description: row.get("description"),
            photo_path: row.get("photo_path"),
        })
    }
}

impl RecordStore for SqliteStore {
    async fn create(&self, entry: &ExpenseEntry) -> Result<ExpenseId> {
        let result = sqlx::query(
            r#"
            INSERT INTO expenses (date, trip_name, category, amount_cents, location, latitude, longitude, emoji, description, photo_path)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.date.format("%Y-%m-%d").to_string())
        .bind(&entry.trip_name)
        .bind(entry.category.as_str())
        .bind(entry.amount_cents)
        .bind(&entry.location)
        .bind(entry.coordinates.map(|c| c.latitude))
        .bind(entry.coordinates.map(|c| c.longitude))
        .bind(&entry.emoji)
        .bind(&entry.description)
        .bind(&entry.photo_path)
        .execute(&self.pool)
        .await
        .context("Failed to save expense")?;

        let id = result.last_insert_rowid();
        debug!(id, "inserted expense row");
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<ExpenseRecord>> {
        let rows = sqlx::query(&format!("{} ORDER BY id", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .context("Failed to list expenses")?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn get(&self, id: ExpenseId) -> Result<Option<ExpenseRecord>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch expense")?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn update(&self, id: ExpenseId, entry: &ExpenseEntry) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE expenses
            SET date = ?, trip_name = ?, category = ?, amount_cents = ?, location = ?,
                latitude = ?, longitude = ?, emoji = ?, description = ?, photo_path = ?
            WHERE id = ?
            "#,
        )
        .bind(entry.date.format("%Y-%m-%d").to_string())
        .bind(&entry.trip_name)
        .bind(entry.category.as_str())
        .bind(entry.amount_cents)
        .bind(&entry.location)
        .bind(entry.coordinates.map(|c| c.latitude))
        .bind(entry.coordinates.map(|c| c.longitude))
        .bind(&entry.emoji)
        .bind(&entry.description)
        .bind(&entry.photo_path)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to update expense")?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: ExpenseId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete expense")?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) as total FROM expenses")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count expenses")?;

        let total: i64 = row.get("total");
        Ok(total as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(day: u32, amount_cents: i64) -> ExpenseEntry {
        ExpenseEntry {
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            trip_name: Some("Goa".to_string()),
            category: Category::Food,
            amount_cents,
            location: "Panaji".to_string(),
            coordinates: Coordinates::new(15.49, 73.82),
            emoji: None,
            description: Some("Prawn thali".to_string()),
            photo_path: None,
        }
    }

    #[tokio::test]
    async fn test_crud_cycle() -> Result<()> {
        let temp = TempDir::new()?;
        let store = SqliteStore::open(&temp.path().join("expenses.db")).await?;

        let first = store.create(&entry(1, 1000)).await?;
        let second = store.create(&entry(2, 2000)).await?;
        assert!(second > first);
        assert_eq!(store.count().await?, 2);

        let fetched = store.get(first).await?.unwrap();
        assert_eq!(fetched.to_entry(), entry(1, 1000));

        let mut changed = entry(3, 3000);
        changed.coordinates = None;
        assert!(store.update(first, &changed).await?);
        assert_eq!(store.get(first).await?.unwrap().to_entry(), changed);
        assert!(!store.update(999, &changed).await?);

        assert!(store.delete(first).await?);
        assert!(!store.delete(first).await?);
        assert!(store.get(first).await?.is_none());

        let ids: Vec<_> = store.list().await?.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second]);
        Ok(())
    }

    #[tokio::test]
    async fn test_ids_are_not_reused() -> Result<()> {
        let temp = TempDir::new()?;
        let store = SqliteStore::open(&temp.path().join("expenses.db")).await?;

        let first = store.create(&entry(1, 1000)).await?;
        store.delete(first).await?;
        let second = store.create(&entry(1, 1000)).await?;
        assert_ne!(first, second);
        Ok(())
    }

    #[tokio::test]
    async fn test_records_survive_reconnect() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("nested").join("expenses.db");
        let id = {
            let store = SqliteStore::open(&path).await?;
            store.create(&entry(4, 4200)).await?
        };

        let store = SqliteStore::open(&path).await?;
        let record = store.get(id).await?.unwrap();
        assert_eq!(record.amount_cents, 4200);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_category_fails_the_read() -> Result<()> {
        let temp = TempDir::new()?;
        let store = SqliteStore::open(&temp.path().join("expenses.db")).await?;
        let id = store.create(&entry(1, 1000)).await?;

        sqlx::query("UPDATE expenses SET category = 'Spaceship' WHERE id = ?")
            .bind(id)
            .execute(&store.pool)
            .await?;

        let err = store.list().await.unwrap_err();
        assert!(err.to_string().contains("Invalid category"));
        Ok(())
    }
}
