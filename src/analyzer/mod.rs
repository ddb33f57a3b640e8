//! Readers for the project's `package.json` and `pnpm-lock.yaml`.
//!
//! - [`manifest`]: `package.json` schema and reader.
//! - [`pnpm`]: lockfile schema, package keys and virtual store paths.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

pub mod manifest;
pub mod pnpm;

use manifest::{read_manifest, Manifest};
use pnpm::{read_lockfile, Lockfile, PackageKey};

pub const MANIFEST_FILE: &str = "package.json";
pub const LOCKFILE_FILE: &str = "pnpm-lock.yaml";

/// A pnpm project whose manifest and lockfile have been read and validated.
#[derive(Debug, Clone)]
pub struct Project {
    /// Directory containing `package.json` and `node_modules`.
    pub root: PathBuf,
    pub manifest: Manifest,
    pub lockfile: Lockfile,
}

impl Project {
    /// Open a project from a `package.json` path or the directory holding it.
    ///
    /// A missing or invalid manifest or lockfile is fatal.
    pub async fn open(path: &Path) -> Result<Self> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|source| Error::ManifestRead {
                path: path.to_path_buf(),
                source,
            })?;
        let manifest_path = if meta.is_dir() {
            path.join(MANIFEST_FILE)
        } else {
            path.to_path_buf()
        };
        let root = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let lockfile_path = root.join(LOCKFILE_FILE);

        let manifest = read_manifest(&manifest_path).await?;
        let lockfile = read_lockfile(&lockfile_path).await?;

        let dev_packages = lockfile
            .packages
            .values()
            .filter(|p| p.dev == Some(true))
            .count();
        let edges: usize = lockfile
            .packages
            .values()
            .filter_map(|p| p.dependencies.as_ref())
            .map(|deps| deps.len())
            .sum();
        for key in lockfile.unverified_packages() {
            debug!(package = key, "locked package has no integrity hash");
        }
        debug!(
            manifest = %manifest_path.display(),
            name = manifest.name.as_deref().unwrap_or("<unnamed>"),
            lockfile_version = lockfile.lockfile_version,
            packages = lockfile.packages.len(),
            dev_packages,
            edges,
            declared = manifest.all_dependencies().len(),
            "opened project"
        );

        Ok(Project {
            root,
            manifest,
            lockfile,
        })
    }

    pub fn package_keys(&self) -> Vec<PackageKey> {
        self.lockfile.package_keys()
    }
}
