//! # Configuration
//!
//! `talkstart.toml` plus environment overrides.
//!
//! ```toml
//! catalog = "groups.json"      # optional custom catalog
//!
//! [analytics]
//! enabled = true
//! measurement_id = "G-XXXXXXX"
//! api_secret = "..."
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! ```
//!
//! ## Environment Overrides
//!
//! - `TALKSTART_MEASUREMENT_ID`: analytics measurement id
//! - `TALKSTART_API_SECRET`: analytics API secret
//! - `TALKSTART_ANALYTICS`: "on"/"off" master switch
//!
//! Server security knobs (`TALKSTART_API_KEY`, `TALKSTART_RATE_LIMIT`,
//! `TALKSTART_CORS_ORIGINS`) are read by the API module directly.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use talkstart_core::{AgeGroup, AnalyticsConfig, Catalog};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "talkstart.toml";

/// Maximum size of a custom catalog file (1 MB).
const MAX_CATALOG_FILE_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// JSON file with a custom list of age groups.
    pub catalog: Option<PathBuf>,
    pub analytics: AnalyticsConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `talkstart.toml` is used if
    /// present and defaults otherwise. Environment overrides apply last.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)?
                } else {
                    tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, AppError> {
        tracing::debug!("Loading config from {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        let mut config = Self::from_toml_str(&content)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;

        // A relative catalog path is relative to the config file, not the cwd
        let base = path.parent().filter(|p| !p.as_os_str().is_empty());
        if let (Some(catalog), Some(base)) = (config.catalog.as_mut(), base) {
            if catalog.is_relative() {
                *catalog = base.join(&*catalog);
            }
        }
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, AppError> {
        toml::from_str(content).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Apply overrides from a key lookup (the process environment in practice).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup("TALKSTART_MEASUREMENT_ID").filter(|v| !v.is_empty()) {
            self.analytics.measurement_id = id;
        }
        if let Some(secret) = lookup("TALKSTART_API_SECRET").filter(|v| !v.is_empty()) {
            self.analytics.api_secret = Some(secret);
        }
        match lookup("TALKSTART_ANALYTICS").as_deref() {
            Some("on" | "true" | "1") => self.analytics.enabled = true,
            Some("off" | "false" | "0") => self.analytics.enabled = false,
            Some(other) => tracing::warn!("Ignoring TALKSTART_ANALYTICS={:?}", other),
            None => {}
        }
    }

    /// Build the catalog: `override_path`, then the configured file, then the
    /// compiled-in standard catalog.
    pub fn load_catalog(&self, override_path: Option<&Path>) -> Result<Catalog, AppError> {
        match override_path.or(self.catalog.as_deref()) {
            Some(path) => load_catalog_file(path),
            None => Ok(Catalog::standard()),
        }
    }
}

/// Read and validate a JSON catalog file (an array of age groups).
pub fn load_catalog_file(path: &Path) -> Result<Catalog, AppError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        AppError::Io(format!("Cannot read catalog '{}': {}", path.display(), e))
    })?;
    if metadata.len() > MAX_CATALOG_FILE_SIZE {
        return Err(AppError::InvalidInput(format!(
            "Catalog size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_CATALOG_FILE_SIZE
        )));
    }

    let data = std::fs::read_to_string(path)?;
    let groups: Vec<AgeGroup> = serde_json::from_str(&data)
        .map_err(|e| talkstart_core::CatalogError::ParseError(e.to_string()))?;
    let catalog = Catalog::from_groups(groups)?;
    tracing::info!(
        "Loaded catalog from {:?} ({} age groups)",
        path,
        catalog.len()
    );
    Ok(catalog)
}

// =============================================================================
// TESTS
// =============================================================================
