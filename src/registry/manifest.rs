//! Local dependency manifest (`registry.json`).
//!
//! ```json
//! {
//!   "url": "https://packages.acme.io/",
//!   "dependencies": { "active_kafka": "1.2.0", "cityhash": "0.9.0" }
//! }
//! ```
//!
//! `dependencies` may also be a plain array of names. `url` is only needed by
//! `analyze`.

use crate::types::{LockscoutError, Result};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Dependency names owned by the private registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    /// Private registry URL.
    #[serde(default, alias = "Url")]
    pub url: Option<String>,
    /// Dependency names in manifest order, without duplicates.
    #[serde(alias = "Dependencies", deserialize_with = "deserialize_dependencies")]
    pub dependencies: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DependencyList {
    Names(Vec<String>),
    Table(serde_json::Map<String, serde_json::Value>),
}

fn deserialize_dependencies<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let names = match DependencyList::deserialize(deserializer)? {
        DependencyList::Names(names) => names,
        DependencyList::Table(table) => table.into_iter().map(|(name, _)| name).collect(),
    };

    let mut seen = HashSet::new();
    Ok(names
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect())
}

impl Manifest {
    /// Parse a manifest from JSON text.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| LockscoutError::ManifestError(e.to_string()))
    }

    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            LockscoutError::ManifestError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content).map_err(|e| match e {
            LockscoutError::ManifestError(msg) => {
                LockscoutError::ManifestError(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// The private registry URL, required for mismatch analysis.
    pub fn registry_url(&self) -> Result<&str> {
        self.url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| LockscoutError::ManifestError("manifest has no `url`".to_string()))
    }
}
