//! Persistent settings
//!
//! Compressor settings live in a small JSON file:
//!
//! ```json
//! { "compressor": { "target": 0.5, "strength": 0.5 } }
//! ```
//!
//! A missing file or missing keys fall back to defaults, so a fresh
//! install needs no setup. Values read from disk are clamped into range.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::dsp::CompressorParams;
use crate::error::{DynacompError, Result};

/// Settings file used when nothing else is given
pub const DEFAULT_CONFIG_FILE: &str = "dynacomp.json";

/// Environment variable naming the settings file
pub const CONFIG_ENV_VAR: &str = "DYNACOMP_CONFIG";

/// All persisted settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub compressor: CompressorParams,
}

impl Settings {
    /// Pick the settings file: explicit path, then `DYNACOMP_CONFIG`, then
    /// `dynacomp.json` in the working directory.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        match env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => PathBuf::from(DEFAULT_CONFIG_FILE),
        }
    }

    /// Load settings, returning defaults if the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("no settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let mut settings: Settings =
            serde_json::from_str(&content).map_err(|e| DynacompError::Config {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if settings.compressor.validate().is_err() {
            warn!(
                "compressor settings in {} out of range, clamping",
                path.display()
            );
        }
        settings.compressor.clamp();

        Ok(settings)
    }

    /// Write settings as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        debug!("saved settings to {}", path.display());

        Ok(())
    }
}
