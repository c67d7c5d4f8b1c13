use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::Cents;
use crate::storage::BackendKind;

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "wanderlog.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: BackendKind,
    /// SQLite database file
    pub database: PathBuf,
    /// Sheet file for the `sheet` backend
    pub sheet: PathBuf,
    /// Directory receiving photo uploads
    pub uploads: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Sqlite,
            database: PathBuf::from("wanderlog.db"),
            sheet: PathBuf::from("wanderlog.csv"),
            uploads: PathBuf::from("uploads"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderSettings {
    pub enabled: bool,
    /// Nominatim-compatible search endpoint
    pub endpoint: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://nominatim.openstreetmap.org/search".to_string(),
            user_agent: format!("wanderlog/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub currency_symbol: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            currency_symbol: "₹".to_string(),
        }
    }
}

/// Effective application settings: file, then environment, then CLI flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Trip budget in whole currency units
    pub budget: Option<f64>,
    pub storage: StorageSettings,
    pub geocoder: GeocoderSettings,
    pub display: DisplaySettings,
}

impl Settings {
    /// Load settings from `path`, or from [`DEFAULT_CONFIG_FILE`] if it exists.
    /// An explicitly named file must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !path.exists() {
            if required {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        debug!(path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply `WANDERLOG_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(backend) = lookup("WANDERLOG_BACKEND") {
            self.storage.backend = BackendKind::from_str(&backend)
                .ok_or_else(|| anyhow::anyhow!("Invalid WANDERLOG_BACKEND: {}", backend))?;
        }
        if let Some(database) = lookup("WANDERLOG_DATABASE") {
            self.storage.database = PathBuf::from(database);
        }
        if let Some(sheet) = lookup("WANDERLOG_SHEET") {
            self.storage.sheet = PathBuf::from(sheet);
        }
        if let Some(uploads) = lookup("WANDERLOG_UPLOADS") {
            self.storage.uploads = PathBuf::from(uploads);
        }
        if let Some(enabled) = lookup("WANDERLOG_GEOCODER_ENABLED") {
            self.geocoder.enabled = match enabled.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => anyhow::bail!("Invalid WANDERLOG_GEOCODER_ENABLED: {}", enabled),
            };
        }
        Ok(())
    }

    /// Budget converted to cents.
    pub fn budget_cents(&self) -> Option<Cents> {
        self.budget.map(|units| (units * 100.0).round() as Cents)
    }
}
