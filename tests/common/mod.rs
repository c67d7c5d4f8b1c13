// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use chrono::NaiveDate;
use tempfile::TempDir;
use wanderlog::application::ExpenseService;
use wanderlog::domain::{Coordinates, ExpenseForm};
use wanderlog::geocode::Geocoder;
use wanderlog::photos::{PhotoStore, PhotoUpload};
use wanderlog::storage::{SheetStore, SqliteStore, StoreBackend};

pub type TestService = ExpenseService<StoreBackend, StaticGeocoder>;

/// Geocoder answering from a fixed table and remembering every lookup.
#[derive(Default)]
pub struct StaticGeocoder {
    places: HashMap<String, Coordinates>,
    lookups: Mutex<Vec<String>>,
}

impl StaticGeocoder {
    /// A handful of known places; anything else resolves to nothing.
    pub fn with_places() -> Self {
        let places = [
            ("Goa", 15.2993, 74.1240),
            ("Mumbai", 19.0760, 72.8777),
            ("Jaipur", 26.9124, 75.7873),
            ("Munnar", 10.0889, 77.0595),
        ]
        .into_iter()
        .filter_map(|(name, lat, lon)| Coordinates::new(lat, lon).map(|c| (name.to_string(), c)))
        .collect();

        Self {
            places,
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

impl Geocoder for StaticGeocoder {
    async fn resolve(&self, location: &str) -> Option<Coordinates> {
        self.lookups.lock().unwrap().push(location.to_string());
        self.places.get(location.trim()).copied()
    }
}

/// Helper to create a test service over a temporary SQLite database
pub async fn test_service() -> Result<(TestService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let store = SqliteStore::open(&temp_dir.path().join("test.db")).await?;
    let service = ExpenseService::new(
        StoreBackend::Sqlite(store),
        StaticGeocoder::with_places(),
        PhotoStore::new(temp_dir.path().join("uploads")),
    );
    Ok((service, temp_dir))
}

/// Helper to create a test service over a temporary sheet file
pub async fn test_sheet_service() -> Result<(TestService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let store = SheetStore::open(temp_dir.path().join("expenses.csv"))?;
    let service = ExpenseService::new(
        StoreBackend::Sheet(store),
        StaticGeocoder::with_places(),
        PhotoStore::new(temp_dir.path().join("uploads")),
    );
    Ok((service, temp_dir))
}

/// Helper to parse a date string into NaiveDate
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// A valid form with only the required fields filled in
pub fn form(date: &str, category: &str, amount: &str, location: &str) -> ExpenseForm {
    ExpenseForm {
        date: parse_date(date),
        trip_name: None,
        category: category.to_string(),
        amount: amount.to_string(),
        location: location.to_string(),
        description: None,
        emoji: None,
    }
}

pub fn photo(name: &str, bytes: &[u8]) -> PhotoUpload {
    PhotoUpload::new(name, bytes.to_vec())
}

/// Files currently present in the service's photo directory
pub fn photo_files(service: &TestService) -> Vec<std::path::PathBuf> {
    match std::fs::read_dir(service.photos().dir()) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    }
}

/// Make every insert and update on the service's SQLite database fail
pub async fn reject_sqlite_writes(temp_dir: &TempDir) -> Result<()> {
    let url = format!("sqlite:{}", temp_dir.path().join("test.db").display());
    let pool = sqlx::SqlitePool::connect(&url).await?;
    for event in ["INSERT", "UPDATE"] {
        let sql = format!(
            "CREATE TRIGGER reject_{} BEFORE {} ON expenses \
             BEGIN SELECT RAISE(ABORT, 'writes rejected'); END",
            event.to_lowercase(),
            event
        );
        sqlx::query(&sql).execute(&pool).await?;
    }
    pool.close().await;
    Ok(())
}
