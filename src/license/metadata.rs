//! SPDX license metadata: data sources and the memoizing lookup cache.
//!
//! Records follow the SPDX `license-list-data` `json/details/<id>.json`
//! shape. Only `licenseId`, `name` and `crossRef[].url` are read; everything
//! else is kept in the raw record for `pnpm-cdx info`.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::LicenseMetadataEntry;

/// Where raw license records come from.
pub trait LicenseDataSource: Send + Sync {
    /// Return the raw JSON record for `id`, or `None` when there is none.
    fn read(&self, id: &str) -> Result<Option<String>>;
}

/// Records compiled into the binary, sorted by id. Generated by `build.rs`
/// from `data/licenses/*.json`.
const BUNDLED: &[(&str, &str)] = include!(concat!(env!("OUT_DIR"), "/bundled_licenses.rs"));

/// The dataset shipped inside the binary: the SPDX licenses seen on npm plus
/// `UNLICENSED`, the id reported for packages that declare no license. Point
/// `license_data` at a `license-list-data` checkout for the full list.
#[derive(Debug, Default, Clone, Copy)]
pub struct BundledSource;

impl LicenseDataSource for BundledSource {
    fn read(&self, id: &str) -> Result<Option<String>> {
        Ok(BUNDLED
            .binary_search_by(|(known, _)| (*known).cmp(id))
            .ok()
            .map(|i| BUNDLED[i].1.to_string()))
    }
}

/// A directory of `<id>.json` files, e.g. `license-list-data/json/details`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl LicenseDataSource for DirectorySource {
    fn read(&self, id: &str) -> Result<Option<String>> {
        // Identifiers never contain path separators; anything that does cannot have a record.
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Ok(None);
        }
        let path = self.root.join(format!("{}.json", id));
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::LicenseData {
                id: id.to_string(),
                reason: format!("{}: {}", path.display(), e),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LicenseRecord {
    name: String,
    #[serde(default)]
    cross_ref: Vec<CrossRef>,
}

#[derive(Debug, Deserialize)]
struct CrossRef {
    url: String,
}

/// Canonical SPDX page for an identifier.
pub fn spdx_url(id: &str) -> String {
    format!("https://spdx.org/licenses/{}.html", id)
}

/// Memoizing license metadata lookup.
///
/// Entries are loaded on first use and never evicted; the dataset is static.
/// Lookups take `&mut self`, so a cache shared between tasks must be wrapped
/// in a lock by the caller.
pub struct LicenseCache {
    source: Box<dyn LicenseDataSource>,
    entries: HashMap<String, LicenseMetadataEntry>,
}

impl LicenseCache {
    pub fn new(source: impl LicenseDataSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            entries: HashMap::new(),
        }
    }

    /// Cache backed by [`BundledSource`].
    pub fn bundled() -> Self {
        Self::new(BundledSource)
    }

    /// Resolve `id` to its display name and reference URL.
    ///
    /// Fails with [`Error::UnknownLicenseId`] when the dataset has no record.
    pub fn lookup(&mut self, id: &str) -> Result<&LicenseMetadataEntry> {
        match self.entries.entry(id.to_string()) {
            Entry::Occupied(slot) => Ok(slot.into_mut()),
            Entry::Vacant(slot) => {
                let raw = self
                    .source
                    .read(id)?
                    .ok_or_else(|| Error::UnknownLicenseId(id.to_string()))?;
                let entry = parse_entry(id, &raw)?;
                debug!(license = id, name = %entry.name, "loaded license metadata");
                Ok(slot.insert(entry))
            }
        }
    }

    /// The raw dataset record for `id`, bypassing the cache.
    pub fn record(&self, id: &str) -> Result<serde_json::Value> {
        let raw = self
            .source
            .read(id)?
            .ok_or_else(|| Error::UnknownLicenseId(id.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| Error::LicenseData {
            id: id.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn parse_entry(id: &str, raw: &str) -> Result<LicenseMetadataEntry> {
    let record: LicenseRecord = serde_json::from_str(raw).map_err(|e| Error::LicenseData {
        id: id.to_string(),
        reason: e.to_string(),
    })?;
    let url = record
        .cross_ref
        .into_iter()
        .map(|r| r.url)
        .find(|u| !u.is_empty())
        .unwrap_or_else(|| spdx_url(id));
    Ok(LicenseMetadataEntry {
        id: id.to_string(),
        name: record.name,
        url,
    })
}
