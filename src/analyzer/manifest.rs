use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// License reported for packages that declare none.
pub const DEFAULT_LICENSE: &str = "UNLICENSED";

/// The parts of a `package.json` this tool reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub dependencies: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub dev_dependencies: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub peer_dependencies: Option<BTreeMap<String, String>>,
}

impl Manifest {
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let invalid = |reason: String| Error::ManifestParse {
            path: path.to_path_buf(),
            reason,
        };
        let value: serde_json::Value =
            serde_json::from_str(content).map_err(|e| invalid(e.to_string()))?;
        // Derived struct visitors also accept sequences and fill fields by position.
        if !value.is_object() {
            return Err(invalid("expected a JSON object".to_string()));
        }
        Manifest::deserialize(value).map_err(|e| invalid(e.to_string()))
    }

    /// The declared `license` field, or `UNLICENSED`.
    pub fn license(&self) -> &str {
        self.license.as_deref().unwrap_or(DEFAULT_LICENSE)
    }

    /// Declared name → version range across all dependency sections.
    pub fn all_dependencies(&self) -> BTreeMap<&str, &str> {
        [
            &self.dependencies,
            &self.dev_dependencies,
            &self.peer_dependencies,
        ]
        .into_iter()
        .flatten()
        .flat_map(|section| section.iter())
        .map(|(name, range)| (name.as_str(), range.as_str()))
        .collect()
    }
}

/// Read and validate a `package.json`.
pub async fn read_manifest(path: &Path) -> Result<Manifest> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| Error::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
    Manifest::parse(&content, path)
}
