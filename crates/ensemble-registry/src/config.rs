//! Library configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::RegistryError;

/// Settings for a [`Library`](crate::library::Library).
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// File extension (without the dot) picked up by directory loads.
    pub package_extension: String,
    /// Retry failed assignments with degendered actors.
    pub degender_fallback: bool,
    /// Refuse a package whose bytes match one already loaded.
    pub reject_duplicate_content: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            package_extension: "slr".to_string(),
            degender_fallback: true,
            reject_duplicate_content: true,
        }
    }
}

impl RegistryConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, RegistryError> {
        let text = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text).map_err(|source| RegistryError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
