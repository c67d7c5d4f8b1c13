use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::ExpenseService;
use crate::domain::ExpenseRecord;
use crate::geocode::Geocoder;
use crate::storage::{RecordStore, SHEET_HEADER, SheetRow};

/// Full snapshot of the expense log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub expenses: Vec<ExpenseRecord>,
}

/// Exporter for converting expense data to CSV or JSON
pub struct Exporter<'a, S, G> {
    service: &'a ExpenseService<S, G>,
}

impl<'a, S: RecordStore, G: Geocoder> Exporter<'a, S, G> {
    pub fn new(service: &'a ExpenseService<S, G>) -> Self {
        Self { service }
    }

    /// Export expenses as CSV, using the same columns as the sheet backend
    pub async fn export_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let expenses = self.service.list().await?;
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        csv_writer.write_record(SHEET_HEADER)?;
        for expense in &expenses {
            csv_writer.serialize(SheetRow::from_record(expense))?;
        }

        csv_writer.flush()?;
        Ok(expenses.len())
    }

    /// Export every expense as a JSON snapshot
    pub async fn export_json<W: Write>(&self, mut writer: W) -> Result<ExpenseSnapshot> {
        let snapshot = ExpenseSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            expenses: self.service.list().await?,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
