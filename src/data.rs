//! Auxiliary force-scale table loaded from TOML.
//!
//! ```toml
//! [[scale]]
//! name = "Planck length"
//! log10_l = -34.79
//! domain = "gravity"
//! ```
//!
//! The analysis core only ever sees the extracted `Vec<f64>`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scale table: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedScale {
    pub name: String,
    pub log10_l: f64,
    #[serde(default)]
    pub domain: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForceScaleTable {
    #[serde(default, rename = "scale")]
    pub scales: Vec<NamedScale>,
}

impl ForceScaleTable {
    pub fn from_toml_str(text: &str) -> Result<Self, DataError> {
        let mut table: Self = toml::from_str(text)?;
        table.scales.retain(|s| {
            let ok = s.log10_l.is_finite();
            if !ok {
                warn!("skipping scale {:?}: log10_l is not finite", s.name);
            }
            ok
        });
        Ok(table)
    }

    /// Load a table; a missing file yields an empty table.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("no force scales found at {}", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn values(&self) -> Vec<f64> {
        self.scales.iter().map(|s| s.log10_l).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.scales.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.scales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }
}
