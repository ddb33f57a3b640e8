//! `pnpm-lock.yaml` reader and package key handling.
//!
//! Package keys name a package inside the virtual store:
//!
//! ```text
//! lockfile v5:  /left-pad/1.3.0          /@babel/core/7.20.0
//! lockfile v6+: /left-pad@1.3.0          /@babel/core@7.20.0(supports-color@9.0.0)
//! ```
//!
//! Each key maps to `node_modules/.pnpm/<store dir>/node_modules/<name>/package.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lockfile {
    #[serde(deserialize_with = "lockfile_version")]
    pub lockfile_version: f64,
    // Validated but not otherwise used.
    #[serde(default, rename = "specifiers")]
    _specifiers: Option<BTreeMap<String, String>>,
    #[serde(default, rename = "dependencies")]
    _dependencies: Option<BTreeMap<String, serde_yaml::Value>>,
    #[serde(default, rename = "devDependencies")]
    _dev_dependencies: Option<BTreeMap<String, serde_yaml::Value>>,
    #[serde(default, rename = "peerDependencies")]
    _peer_dependencies: Option<BTreeMap<String, serde_yaml::Value>>,
    pub packages: BTreeMap<String, LockedPackage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LockedPackage {
    pub resolution: Resolution,
    #[serde(default)]
    pub dependencies: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub dev: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Resolution {
    /// Subresource integrity hash; pnpm may write an empty one for local tarballs.
    pub integrity: String,
}

/// pnpm writes `5.4` in v5 lockfiles and `'6.0'` from v6 on.
fn lockfile_version<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Version {
        Number(f64),
        Text(String),
    }

    match Version::deserialize(deserializer)? {
        Version::Number(n) => Ok(n),
        Version::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid lockfileVersion '{}'", s))),
    }
}

impl Lockfile {
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let invalid = |reason: String| Error::LockfileParse {
            path: path.to_path_buf(),
            reason,
        };
        let value: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|e| invalid(e.to_string()))?;
        if !value.is_mapping() {
            return Err(invalid("expected a YAML mapping".to_string()));
        }
        Lockfile::deserialize(value).map_err(|e| invalid(e.to_string()))
    }

    /// Keys of the `packages` map that name a package and version.
    pub fn package_keys(&self) -> Vec<PackageKey> {
        self.packages
            .keys()
            .filter_map(|key| PackageKey::parse(key, self.lockfile_version))
            .collect()
    }

    /// Keys of packages whose resolution carries no integrity hash.
    pub fn unverified_packages(&self) -> Vec<&str> {
        self.packages
            .iter()
            .filter(|(_, pkg)| pkg.resolution.integrity.trim().is_empty())
            .map(|(key, _)| key.as_str())
            .collect()
    }
}

/// Read and validate `pnpm-lock.yaml`.
pub async fn read_lockfile(path: &Path) -> Result<Lockfile> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| Error::LockfileRead {
            path: path.to_path_buf(),
            source,
        })?;
    Lockfile::parse(&content, path)
}

/// A lockfile package key split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageKey {
    /// The key as written in the lockfile.
    pub qualified_name: String,
    /// e.g. `@babel/core`
    pub name: String,
    /// Version as reported, peer suffix included for v5 keys.
    pub version: String,
    /// Directory under `node_modules/.pnpm`.
    pub store_dir: String,
}

impl PackageKey {
    /// Split a `packages` key. Returns `None` when the key has no version.
    pub fn parse(qualified_name: &str, lockfile_version: f64) -> Option<Self> {
        let path = qualified_name.strip_prefix('/').unwrap_or(qualified_name);
        let (name, version, store_dir) = if lockfile_version < 6.0 {
            let (name, version) = path.rsplit_once('/')?;
            let store_dir = format!("{}@{}", name.replace('/', "+"), version);
            (name.to_string(), version.to_string(), store_dir)
        } else {
            // Skip the leading '@' of a scope when looking for the separator.
            let at = path.get(1..)?.find('@')? + 1;
            let (name, full_version) = (&path[..at], &path[at + 1..]);
            let version = full_version
                .split_once('(')
                .map_or(full_version, |(v, _)| v)
                .to_string();
            let store_dir = format!(
                "{}@{}",
                name.replace('/', "+"),
                full_version.replace(")(", "_").replace('(', "_").replace(')', "")
            );
            (name.to_string(), version, store_dir)
        };
        if name.is_empty() || version.is_empty() {
            return None;
        }
        Some(PackageKey {
            qualified_name: qualified_name.to_string(),
            name,
            version,
            store_dir,
        })
    }

    /// `package.json` of this package inside the project's virtual store.
    pub fn manifest_path(&self, project_root: &Path) -> PathBuf {
        let mut path = project_root
            .join("node_modules")
            .join(".pnpm")
            .join(&self.store_dir)
            .join("node_modules");
        for segment in self.name.split('/') {
            path.push(segment);
        }
        path.join("package.json")
    }
}
