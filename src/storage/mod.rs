mod sheet;
mod sqlite;

use anyhow::Result;

use crate::domain::{ExpenseEntry, ExpenseId, ExpenseRecord};

pub use sheet::*;
pub use sqlite::*;

/// SQL migration for the expenses table
pub const MIGRATION_001_EXPENSES: &str = include_str!("migrations/001_expenses.sql");

/// Persistence contract shared by every backend.
///
/// A successful `create` is durable before the id is returned, and `list`
/// reflects every mutation that returned `Ok` before it.
#[allow(async_fn_in_trait)]
pub trait RecordStore {
    /// Persist a new record and return its assigned id.
    async fn create(&self, entry: &ExpenseEntry) -> Result<ExpenseId>;

    /// All records in ascending id order.
    async fn list(&self) -> Result<Vec<ExpenseRecord>>;

    async fn get(&self, id: ExpenseId) -> Result<Option<ExpenseRecord>>;

    /// Replace every field of an existing record. `Ok(false)` if there is no such id.
    async fn update(&self, id: ExpenseId, entry: &ExpenseEntry) -> Result<bool>;

    /// `Ok(false)` if there is no such id.
    async fn delete(&self, id: ExpenseId) -> Result<bool>;

    async fn count(&self) -> Result<usize> {
        Ok(self.list().await?.len())
    }
}

/// Which backend to use, as named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Sqlite,
    Sheet,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Sqlite => "sqlite",
            BackendKind::Sheet => "sheet",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Some(BackendKind::Sqlite),
            "sheet" | "csv" => Some(BackendKind::Sheet),
            _ => None,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A store selected at runtime from configuration.
pub enum StoreBackend {
    Sqlite(SqliteStore),
    Sheet(SheetStore),
}

impl StoreBackend {
    pub fn kind(&self) -> BackendKind {
        match self {
            StoreBackend::Sqlite(_) => BackendKind::Sqlite,
            StoreBackend::Sheet(_) => BackendKind::Sheet,
        }
    }
}

impl RecordStore for StoreBackend {
    async fn create(&self, entry: &ExpenseEntry) -> Result<ExpenseId> {
        match self {
            StoreBackend::Sqlite(store) => store.create(entry).await,
            StoreBackend::Sheet(store) => store.create(entry).await,
        }
    }

    async fn list(&self) -> Result<Vec<ExpenseRecord>> {
        match self {
            StoreBackend::Sqlite(store) => store.list().await,
            StoreBackend::Sheet(store) => store.list().await,
        }
    }

    async fn get(&self, id: ExpenseId) -> Result<Option<ExpenseRecord>> {
        match self {
            StoreBackend::Sqlite(store) => store.get(id).await,
            StoreBackend::Sheet(store) => store.get(id).await,
        }
    }

    async fn update(&self, id: ExpenseId, entry: &ExpenseEntry) -> Result<bool> {
        match self {
            StoreBackend::Sqlite(store) => store.update(id, entry).await,
            StoreBackend::Sheet(store) => store.update(id, entry).await,
        }
    }

    async fn delete(&self, id: ExpenseId) -> Result<bool> {
        match self {
            StoreBackend::Sqlite(store) => store.delete(id).await,
            StoreBackend::Sheet(store) => store.delete(id).await,
        }
    }

    async fn count(&self) -> Result<usize> {
        match self {
            StoreBackend::Sqlite(store) => store.count().await,
            StoreBackend::Sheet(store) => store.count().await,
        }
    }
}
