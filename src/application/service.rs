use std::path::Path;

use tracing::{debug, info, instrument, warn};

use crate::config::Settings;
use crate::domain::{
    ExpenseEntry, ExpenseForm, ExpenseId, ExpenseRecord, ValidatedForm, ValidationErrors,
};
use crate::geocode::{Geocoder, GeocoderBackend};
use crate::photos::{PhotoStore, PhotoUpload};
use crate::storage::{BackendKind, RecordStore, SheetStore, SqliteStore, StoreBackend};

use super::AppError;

/// Application service owning the expense lifecycle.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
pub struct ExpenseService<S = StoreBackend, G = GeocoderBackend> {
    store: S,
    geocoder: G,
    photos: PhotoStore,
}

impl ExpenseService {
    /// Build the service with the backends named in `settings`.
    pub async fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        let store = match settings.storage.backend {
            BackendKind::Sqlite => {
                StoreBackend::Sqlite(SqliteStore::open(&settings.storage.database).await?)
            }
            BackendKind::Sheet => StoreBackend::Sheet(SheetStore::open(&settings.storage.sheet)?),
        };
        let geocoder = GeocoderBackend::from_settings(&settings.geocoder)
            .map_err(|e| AppError::Geocoder(format!("{:#}", e)))?;
        let photos = PhotoStore::new(&settings.storage.uploads);

        debug!(
            backend = %store.kind(),
            geocoding = settings.geocoder.enabled,
            uploads = %settings.storage.uploads.display(),
            "expense service ready"
        );
        Ok(Self::new(store, geocoder, photos))
    }
}

impl<S: RecordStore, G: Geocoder> ExpenseService<S, G> {
    pub fn new(store: S, geocoder: G, photos: PhotoStore) -> Self {
        Self {
            store,
            geocoder,
            photos,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn geocoder(&self) -> &G {
        &self.geocoder
    }

    pub fn photos(&self) -> &PhotoStore {
        &self.photos
    }

    /// Validate the form and the optional photo together, so every message is reported at once.
    fn validate(
        form: &ExpenseForm,
        photo: Option<&PhotoUpload>,
    ) -> Result<ValidatedForm, AppError> {
        let photo_error = photo.and_then(PhotoUpload::validation_error);
        match (form.validate(), photo_error) {
            (Ok(validated), None) => Ok(validated),
            (Ok(_), Some(message)) => {
                let mut errors = ValidationErrors::new();
                errors.push(message);
                Err(AppError::Validation(errors))
            }
            (Err(mut errors), photo_error) => {
                if let Some(message) = photo_error {
                    errors.push(message);
                }
                Err(AppError::Validation(errors))
            }
        }
    }

    fn save_photo(&self, photo: &PhotoUpload) -> Result<String, AppError> {
        self.photos
            .save(photo)
            .map(|path| path.to_string_lossy().into_owned())
            .map_err(|e| AppError::PhotoIo(format!("{:#}", e)))
    }

    // ========================
    // Mutations
    // ========================

    /// Record a new expense.
    ///
    /// Nothing is written unless validation passes. A failed lookup leaves the
    /// coordinates empty; a failed photo write aborts before the record is created.
    #[instrument(skip_all, fields(location = %form.location))]
    pub async fn add(
        &self,
        form: &ExpenseForm,
        photo: Option<&PhotoUpload>,
    ) -> Result<ExpenseRecord, AppError> {
        let validated = Self::validate(form, photo)?;

        let coordinates = self.geocoder.resolve(&validated.location).await;
        if coordinates.is_none() {
            debug!("no coordinates for location");
        }

        let photo_path = photo.map(|p| self.save_photo(p)).transpose()?;

        let entry = ExpenseEntry {
            date: validated.date,
            trip_name: validated.trip_name,
            category: validated.category,
            amount_cents: validated.amount_cents,
            location: validated.location,
            coordinates,
            emoji: validated.emoji,
            description: validated.description,
            photo_path,
        };

        let id = match self.store.create(&entry).await {
            Ok(id) => id,
            Err(e) => {
                if let Some(path) = &entry.photo_path {
                    self.photos.discard(Path::new(path));
                }
                return Err(AppError::Storage(e));
            }
        };

        info!(id, amount_cents = entry.amount_cents, "expense added");
        Ok(entry.into_record(id))
    }

    /// Replace the fields of an existing expense.
    ///
    /// Without `new_photo` the stored photo is kept. With one, the new file is
    /// written first and the previous file is removed only after the record
    /// points at the new one.
    #[instrument(skip(self, form, new_photo))]
    pub async fn update(
        &self,
        id: ExpenseId,
        form: &ExpenseForm,
        new_photo: Option<&PhotoUpload>,
    ) -> Result<ExpenseRecord, AppError> {
        let current = self.get(id).await?;
        let validated = Self::validate(form, new_photo)?;

        let coordinates =
            if validated.location != current.location || current.coordinates.is_none() {
                self.geocoder.resolve(&validated.location).await
            } else {
                current.coordinates
            };

        let replacement = new_photo.map(|p| self.save_photo(p)).transpose()?;
        let photo_path = replacement
            .clone()
            .or_else(|| current.photo_path.clone());

        let entry = ExpenseEntry {
            date: validated.date,
            trip_name: validated.trip_name,
            category: validated.category,
            amount_cents: validated.amount_cents,
            location: validated.location,
            coordinates,
            emoji: validated.emoji,
            description: validated.description,
            photo_path,
        };

        let updated = self.store.update(id, &entry).await;
        if !matches!(updated, Ok(true)) {
            if let Some(path) = &replacement {
                self.photos.discard(Path::new(path));
            }
        }
        match updated {
            Ok(true) => {}
            Ok(false) => return Err(AppError::NotFound(id)),
            Err(e) => return Err(AppError::Storage(e)),
        }

        if replacement.is_some() {
            if let Some(old) = &current.photo_path {
                self.photos.discard(Path::new(old));
            }
        }

        info!(id, "expense updated");
        Ok(entry.into_record(id))
    }

    /// Remove an expense and its photo. Deleting an unknown (or already deleted) id fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ExpenseId) -> Result<ExpenseRecord, AppError> {
        let record = self.get(id).await?;

        if !self.store.delete(id).await? {
            return Err(AppError::NotFound(id));
        }

        if let Some(path) = &record.photo_path {
            self.photos.discard(Path::new(path));
        }

        info!(id, "expense deleted");
        Ok(record)
    }

    // ========================
    // Queries
    // ========================

    /// Get an expense by id.
    pub async fn get(&self, id: ExpenseId) -> Result<ExpenseRecord, AppError> {
        self.store.get(id).await?.ok_or(AppError::NotFound(id))
    }

    /// All expenses in id order.
    pub async fn list(&self) -> Result<Vec<ExpenseRecord>, AppError> {
        let records = self.store.list().await?;
        let stale_photos = records
            .iter()
            .filter(|r| r.photo_path.is_some() && r.existing_photo().is_none())
            .count();
        if stale_photos > 0 {
            warn!(stale_photos, "some photo files are missing");
        }
        Ok(records)
    }

    pub async fn count(&self) -> Result<usize, AppError> {
        Ok(self.store.count().await?)
    }
}
