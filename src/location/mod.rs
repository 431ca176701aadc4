// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Best-effort provenance lookup.
//!
//! A lookup never fails a save: any error collapses to `None`, which
//! renders as the literal "Unknown".

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::recording::UNKNOWN_LOCATION;

/// Where a recording was made
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationInfo {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Shape of an ipapi-style lookup response
#[derive(Debug, Deserialize)]
struct LookupDocument {
    #[serde(default)]
    ip: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    country_name: Option<String>,
}

impl LocationInfo {
    /// Parse an ipapi-style JSON document, preferring `country_name`
    pub fn from_json(json: &str) -> Option<Self> {
        match serde_json::from_str::<LookupDocument>(json) {
            Ok(doc) => Some(Self {
                ip: doc.ip,
                city: doc.city,
                region: doc.region,
                country: doc.country_name.or(doc.country),
            }),
            Err(e) => {
                debug!(error = %e, "unreadable location document");
                None
            }
        }
    }

    /// "City, Region, Country" from whichever parts are known
    pub fn describe(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.city, &self.region, &self.country]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Provenance string for an optional lookup result
pub fn provenance(info: Option<&LocationInfo>) -> String {
    info.and_then(LocationInfo::describe)
        .unwrap_or_else(|| UNKNOWN_LOCATION.to_string())
}

/// Source of location data
pub trait Locator {
    /// Look up the current location; `None` on any failure
    fn locate(&self) -> Option<LocationInfo>;
}

/// Locator that always answers with a fixed value
#[derive(Debug, Clone, Default)]
pub struct StaticLocator {
    info: Option<LocationInfo>,
}

impl StaticLocator {
    /// Locator returning `info`
    pub fn new(info: Option<LocationInfo>) -> Self {
        Self { info }
    }

    /// Locator that never knows
    pub fn unknown() -> Self {
        Self { info: None }
    }
}

impl Locator for StaticLocator {
    fn locate(&self) -> Option<LocationInfo> {
        self.info.clone()
    }
}

/// Locator reading a cached lookup document from disk
#[derive(Debug, Clone)]
pub struct FileLocator {
    path: PathBuf,
}

impl FileLocator {
    /// Locator reading `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Locator for FileLocator {
    fn locate(&self) -> Option<LocationInfo> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => LocationInfo::from_json(&contents),
            Err(e) => {
                debug!(path = ?self.path, error = %e, "location lookup failed");
                None
            }
        }
    }
}
