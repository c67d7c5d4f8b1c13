use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::{
    Category, Coordinates, ExpenseEntry, ExpenseId, ExpenseRecord, format_cents, parse_cents,
};

use super::RecordStore;

/// Header row of the sheet. Column order matches the record's field order.
pub const SHEET_HEADER: [&str; 11] = [
    "id",
    "date",
    "trip_name",
    "category",
    "amount",
    "location",
    "latitude",
    "longitude",
    "emoji",
    "description",
    "photo_path",
];

/// One sheet row as it appears on disk. Empty cells mean "absent".
#[derive(Debug, Serialize, Deserialize)]
pub struct SheetRow {
    pub id: ExpenseId,
    pub date: String,
    pub trip_name: String,
    pub category: String,
    pub amount: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub emoji: String,
    pub description: String,
    pub photo_path: String,
}

fn optional(cell: String) -> Option<String> {
    if cell.is_empty() { None } else { Some(cell) }
}

impl SheetRow {
    pub fn from_record(record: &ExpenseRecord) -> Self {
        Self {
            id: record.id,
            date: record.date.format("%Y-%m-%d").to_string(),
            trip_name: record.trip_name.clone().unwrap_or_default(),
            category: record.category.as_str().to_string(),
            amount: format_cents(record.amount_cents),
            location: record.location.clone(),
            latitude: record.coordinates.map(|c| c.latitude),
            longitude: record.coordinates.map(|c| c.longitude),
            emoji: record.emoji.clone().unwrap_or_default(),
            description: record.description.clone().unwrap_or_default(),
            photo_path: record.photo_path.clone().unwrap_or_default(),
        }
    }

    /// Map the loosely-typed cells onto a record, rejecting anything malformed.
    pub fn into_record(self) -> Result<ExpenseRecord, String> {
        if self.id <= 0 {
            return Err(format!("id must be positive, got {}", self.id));
        }
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .map_err(|_| format!("invalid date '{}'", self.date))?;
        let category = Category::from_str(&self.category)
            .ok_or_else(|| format!("unknown category '{}'", self.category))?;
        let amount_cents =
            parse_cents(&self.amount).map_err(|e| format!("amount '{}': {}", self.amount, e))?;
        if amount_cents < 0 {
            return Err(format!("negative amount '{}'", self.amount));
        }
        if self.location.trim().is_empty() {
            return Err("location is empty".to_string());
        }
        let coordinates = Coordinates::from_columns(self.latitude, self.longitude)?;

        Ok(ExpenseRecord {
            id: self.id,
            date,
            trip_name: optional(self.trip_name),
            category,
            amount_cents,
            location: self.location,
            coordinates,
            emoji: optional(self.emoji),
            description: optional(self.description),
            photo_path: optional(self.photo_path),
        })
    }
}

/// Read and validate every row of a sheet. Any malformed row fails the whole read.
pub fn read_sheet(path: &Path) -> Result<Vec<ExpenseRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open sheet {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of sheet {}", path.display()))?;
    if headers.iter().ne(SHEET_HEADER.iter().copied()) {
        anyhow::bail!(
            "Unexpected header in sheet {}: expected '{}', found '{}'",
            path.display(),
            SHEET_HEADER.join(","),
            headers.iter().collect::<Vec<_>>().join(",")
        );
    }

    let mut records = Vec::new();
    let mut seen = HashSet::new();
    for (index, result) in reader.deserialize::<SheetRow>().enumerate() {
        // Row 1 is the header
        let row_number = index + 2;
        let row = result.with_context(|| {
            format!("Malformed row {} in sheet {}", row_number, path.display())
        })?;
        let record = row.into_record().map_err(|reason| {
            anyhow::anyhow!(
                "Malformed row {} in sheet {}: {}",
                row_number,
                path.display(),
                reason
            )
        })?;
        if !seen.insert(record.id) {
            anyhow::bail!(
                "Malformed row {} in sheet {}: duplicate id {}",
                row_number,
                path.display(),
                record.id
            );
        }
        records.push(record);
    }

    records.sort_by_key(|r| r.id);
    Ok(records)
}

/// Replace the sheet with `records`, via a synced temp file renamed into place.
pub fn write_sheet(path: &Path, records: &[ExpenseRecord]) -> Result<()> {
    let tmp_path = temp_path(path);
    let file = File::create(&tmp_path)
        .with_context(|| format!("Failed to create {}", tmp_path.display()))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer.write_record(SHEET_HEADER)?;
    for record in records {
        writer.serialize(SheetRow::from_record(record))?;
    }
    let file = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush sheet: {}", e.error()))?;
    file.sync_all()
        .with_context(|| format!("Failed to sync {}", tmp_path.display()))?;
    drop(file);

    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to replace sheet {}", path.display()))?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "sheet.csv".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Record store backed by a single sheet file: a header row followed by one row per record.
pub struct SheetStore {
    path: PathBuf,
    /// Next id to hand out; never moves backwards while the store is open.
    next_id: Mutex<ExpenseId>,
}

impl SheetStore {
    /// Open the sheet at `path`, creating it with just a header if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create sheet directory {}", parent.display())
                })?;
            }
            write_sheet(&path, &[])?;
            debug!(path = %path.display(), "created empty sheet");
        }

        let records = read_sheet(&path)?;
        let next_id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        debug!(path = %path.display(), rows = records.len(), next_id, "opened sheet store");

        Ok(Self {
            path,
            next_id: Mutex::new(next_id),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for SheetStore {
    async fn create(&self, entry: &ExpenseEntry) -> Result<ExpenseId> {
        let mut next_id = self.next_id.lock().await;
        let mut records = read_sheet(&self.path)?;

        let max_existing = records.iter().map(|r| r.id).max().unwrap_or(0);
        let id = (*next_id).max(max_existing + 1);
        records.push(entry.clone().into_record(id));
        write_sheet(&self.path, &records)?;

        *next_id = id + 1;
        debug!(id, "appended sheet row");
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<ExpenseRecord>> {
        let _guard = self.next_id.lock().await;
        read_sheet(&self.path)
    }

    async fn get(&self, id: ExpenseId) -> Result<Option<ExpenseRecord>> {
        Ok(self.list().await?.into_iter().find(|r| r.id == id))
    }

    async fn update(&self, id: ExpenseId, entry: &ExpenseEntry) -> Result<bool> {
        let _guard = self.next_id.lock().await;
        let mut records = read_sheet(&self.path)?;

        let Some(slot) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        *slot = entry.clone().into_record(id);
        write_sheet(&self.path, &records)?;
        Ok(true)
    }

    async fn delete(&self, id: ExpenseId) -> Result<bool> {
        let _guard = self.next_id.lock().await;
        let mut records = read_sheet(&self.path)?;

        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Ok(false);
        }
        write_sheet(&self.path, &records)?;
        Ok(true)
    }
}
