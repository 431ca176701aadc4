// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration system for keyrec.
//!
//! This module provides data structures for loading and saving the
//! application configuration: capture cadence, record store location,
//! provenance settings, WAV export format, log level and an optional key
//! map override.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::location::{FileLocator, LocationInfo, Locator, StaticLocator};
use crate::music::{Key, KeyMap};
use crate::recording::ExportSettings;
use crate::timing::DEFAULT_CADENCE_MS;

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PianoConfig {
    /// Capture settings
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Record store settings
    #[serde(default)]
    pub store: StoreConfig,
    /// WAV export settings
    #[serde(default)]
    pub export: ExportSettings,
    /// Fixed provenance for new recordings
    #[serde(default)]
    pub location: Option<LocationInfo>,
    /// Cached location lookup document (ipapi JSON)
    #[serde(default)]
    pub location_file: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Key map override; the C major row is used when empty
    #[serde(default)]
    pub keys: Vec<Key>,
}

impl PianoConfig {
    /// Load a configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate a configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = self.to_yaml()?;
        fs::write(path.as_ref(), yaml)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))
    }

    /// Check values serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.capture.cadence_ms == 0 {
            bail!("capture.cadence_ms must be greater than zero");
        }
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            bail!("unknown log level: {}", self.log_level);
        }
        self.export.validate().context("Invalid export settings")?;
        self.key_map()?;
        Ok(())
    }

    /// The configured key map
    pub fn key_map(&self) -> Result<KeyMap> {
        if self.keys.is_empty() {
            return Ok(KeyMap::c_major());
        }
        KeyMap::new(self.keys.clone()).context("Invalid key map")
    }

    /// Locator for stamping provenance.
    ///
    /// A static location wins over a lookup file.
    pub fn locator(&self) -> Box<dyn Locator> {
        match (&self.location, &self.location_file) {
            (Some(info), _) => Box::new(StaticLocator::new(Some(info.clone()))),
            (None, Some(path)) => Box::new(FileLocator::new(path)),
            (None, None) => Box::new(StaticLocator::unknown()),
        }
    }

    /// Log level as a `tracing` level
    pub fn tracing_level(&self) -> tracing::Level {
        match self.log_level.to_ascii_lowercase().as_str() {
            "error" => tracing::Level::ERROR,
            "warn" => tracing::Level::WARN,
            "debug" => tracing::Level::DEBUG,
            "trace" => tracing::Level::TRACE,
            _ => tracing::Level::INFO,
        }
    }
}

impl Default for PianoConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            store: StoreConfig::default(),
            export: ExportSettings::default(),
            location: None,
            location_file: None,
            log_level: default_log_level(),
            keys: Vec::new(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

fn default_log_level() -> String {
    "info".to_string()
}

/// Capture settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptureConfig {
    /// Sampling interval in milliseconds
    #[serde(default = "default_cadence")]
    pub cadence_ms: u64,
}

fn default_cadence() -> u64 {
    DEFAULT_CADENCE_MS
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            cadence_ms: default_cadence(),
        }
    }
}

/// Record store settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// JSON file holding saved recordings
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("recordings.json")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}
