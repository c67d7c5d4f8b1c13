use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Category, Cents};

/// Store-assigned record identifier. Never reused.
pub type ExpenseId = i64;

/// A resolved geographic position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Build coordinates, rejecting values outside the WGS84 range or non-finite values.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }

    /// Pair up two optional columns. Exactly one present is an error.
    pub fn from_columns(
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Option<Self>, String> {
        match (latitude, longitude) {
            (None, None) => Ok(None),
            (Some(lat), Some(lon)) => Self::new(lat, lon)
                .map(Some)
                .ok_or_else(|| format!("coordinates out of range: {}, {}", lat, lon)),
            _ => Err("latitude and longitude must be both present or both absent".to_string()),
        }
    }
}

/// The data of an expense, without its identifier.
/// This is what the service hands to a store on create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseEntry {
    pub date: NaiveDate,
    pub trip_name: Option<String>,
    pub category: Category,
    pub amount_cents: Cents,
    pub location: String,
    pub coordinates: Option<Coordinates>,
    pub emoji: Option<String>,
    pub description: Option<String>,
    pub photo_path: Option<String>,
}

impl ExpenseEntry {
    pub fn into_record(self, id: ExpenseId) -> ExpenseRecord {
        ExpenseRecord {
            id,
            date: self.date,
            trip_name: self.trip_name,
            category: self.category,
            amount_cents: self.amount_cents,
            location: self.location,
            coordinates: self.coordinates,
            emoji: self.emoji,
            description: self.description,
            photo_path: self.photo_path,
        }
    }
}

/// One logged expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: ExpenseId,
    pub date: NaiveDate,
    /// Free-text label grouping expenses of one journey
    pub trip_name: Option<String>,
    pub category: Category,
    /// Amount in cents (never negative)
    pub amount_cents: Cents,
    pub location: String,
    /// Resolved from `location`; absent if the lookup failed
    pub coordinates: Option<Coordinates>,
    pub emoji: Option<String>,
    /// Short memory note
    pub description: Option<String>,
    /// Image owned by this record, inside the photo directory
    pub photo_path: Option<String>,
}

impl ExpenseRecord {
    /// Strip the identifier, e.g. to feed a modified copy back to a store.
    pub fn to_entry(&self) -> ExpenseEntry {
        ExpenseEntry {
            date: self.date,
            trip_name: self.trip_name.clone(),
            category: self.category,
            amount_cents: self.amount_cents,
            location: self.location.clone(),
            coordinates: self.coordinates,
            emoji: self.emoji.clone(),
            description: self.description.clone(),
            photo_path: self.photo_path.clone(),
        }
    }

    /// The photo path, only if the file is still there.
    pub fn existing_photo(&self) -> Option<&Path> {
        self.photo_path
            .as_deref()
            .map(Path::new)
            .filter(|path| path.is_file())
    }

    /// Trip name when set, otherwise the location.
    pub fn title(&self) -> &str {
        self.trip_name.as_deref().unwrap_or(&self.location)
    }

    pub fn has_coordinates(&self) -> bool {
        self.coordinates.is_some()
    }
}
