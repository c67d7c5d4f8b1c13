use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};
use uuid::Uuid;

/// Image extensions accepted for photo memories.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// An uploaded image waiting to be persisted.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read an image from disk, keeping its file name for the extension check.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read photo {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { file_name, bytes })
    }

    /// Lower-cased extension, if it is one of [`ALLOWED_EXTENSIONS`].
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Validation message when the upload is not an accepted image type.
    pub fn validation_error(&self) -> Option<String> {
        if self.extension().is_none() {
            Some(format!(
                "Photo must be one of: {}.",
                ALLOWED_EXTENSIONS.join(", ")
            ))
        } else {
            None
        }
    }
}

/// Directory receiving uploaded photos.
#[derive(Debug, Clone)]
pub struct PhotoStore {
    dir: PathBuf,
}

impl PhotoStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create photo directory {}", self.dir.display()))
    }

    /// Write the upload under a fresh unique name and return its path.
    /// The file is synced before returning.
    pub fn save(&self, upload: &PhotoUpload) -> Result<PathBuf> {
        let extension = upload
            .extension()
            .ok_or_else(|| anyhow::anyhow!("Unsupported photo type: {}", upload.file_name))?;

        self.ensure_dir()?;

        let path = self.dir.join(format!("{}.{}", Uuid::new_v4(), extension));
        let mut file = fs::File::create_new(&path)
            .with_context(|| format!("Failed to create photo {}", path.display()))?;
        let written = file
            .write_all(&upload.bytes)
            .and_then(|_| file.sync_all())
            .with_context(|| format!("Failed to write photo {}", path.display()));
        if let Err(e) = written {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(e);
        }

        debug!(path = %path.display(), bytes = upload.bytes.len(), "saved photo");
        Ok(path)
    }

    /// Delete a photo. A file that is already gone counts as removed.
    pub fn remove(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed photo");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "photo already absent");
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to remove photo {}", path.display())),
        }
    }

    /// Delete a photo during cleanup; failures are logged and swallowed.
    pub fn discard(&self, path: &Path) {
        if let Err(e) = self.remove(path) {
            warn!(path = %path.display(), error = %format!("{:#}", e), "photo cleanup failed");
        }
    }
}
