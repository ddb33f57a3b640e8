//! GitLab license report (schema 2.1) aggregation.
//!
//! [`aggregate`] resolves the license of every lockfile package concurrently;
//! [`build`] turns the result into a [`GitlabReport`], looking up display data
//! for each license identifier in the [`LicenseCache`].

use std::path::Path;

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use tracing::{debug, warn};

use crate::analyzer::manifest::read_manifest;
use crate::analyzer::pnpm::PackageKey;
use crate::analyzer::Project;
use crate::error::Result;
use crate::license::expression::license_ids;
use crate::license::metadata::LicenseCache;
use crate::models::{GitlabReport, LicenseUsage, ResolvedPackage, SkippedPackage, GITLAB_FORMAT};

/// Outcome of resolving every package in a lockfile.
#[derive(Debug, Default)]
pub struct Aggregation {
    /// Sorted by name, then version.
    pub packages: Vec<ResolvedPackage>,
    /// Sorted by qualified name.
    pub skipped: Vec<SkippedPackage>,
    pub usage: LicenseUsage,
}

impl Aggregation {
    fn record(&mut self, key: PackageKey, result: Result<ResolvedPackage>) {
        match result {
            Ok(pkg) => {
                // One count per identifier in the flattened list; a license
                // repeated inside one expression is counted twice.
                for id in &pkg.licenses {
                    *self.usage.entry(id.clone()).or_insert(0) += 1;
                }
                self.packages.push(pkg);
            }
            Err(e) => {
                let skipped = SkippedPackage {
                    qualified_name: key.qualified_name,
                    reason: e.to_string(),
                };
                warn!(
                    "No license information for {} because the package doesn't exist or contains an invalid SPDX expression: {}",
                    skipped.qualified_name,
                    skipped.reason
                );
                self.skipped.push(skipped);
            }
        }
    }
}

/// Read one package's manifest from the virtual store and flatten its license.
pub async fn resolve_package(project_root: &Path, key: &PackageKey) -> Result<ResolvedPackage> {
    let path = key.manifest_path(project_root);
    let manifest = read_manifest(&path).await?;
    let licenses = license_ids(manifest.license())?;
    debug!(package = %key.qualified_name, ?licenses, "resolved license");
    Ok(ResolvedPackage {
        qualified_name: key.qualified_name.clone(),
        name: key.name.clone(),
        version: key.version.clone(),
        licenses,
    })
}

/// Resolve every lockfile package with at most `concurrency` reads in flight.
///
/// Packages that cannot be resolved are logged and skipped; this never fails.
pub async fn aggregate(
    project: &Project,
    concurrency: usize,
    progress: Option<&ProgressBar>,
) -> Aggregation {
    let root = project.root.as_path();
    let mut results = stream::iter(project.package_keys())
        .map(|key| async move {
            let result = resolve_package(root, &key).await;
            (key, result)
        })
        .buffer_unordered(concurrency.max(1));

    let mut aggregation = Aggregation::default();
    while let Some((key, result)) = results.next().await {
        aggregation.record(key, result);
        if let Some(pb) = progress {
            pb.inc(1);
        }
    }

    aggregation
        .packages
        .sort_by(|a, b| {
            (&a.name, &a.version, &a.qualified_name).cmp(&(&b.name, &b.version, &b.qualified_name))
        });
    aggregation
        .skipped
        .sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
    aggregation
}

/// Assemble the report. Fails if any license identifier is missing from the dataset.
pub fn build(aggregation: Aggregation, cache: &mut LicenseCache) -> Result<GitlabReport> {
    let mut licenses = Vec::with_capacity(aggregation.usage.len());
    for (id, count) in &aggregation.usage {
        debug!(license = %id, count, "license usage");
        licenses.push(cache.lookup(id)?.clone());
    }

    Ok(GitlabReport {
        format: GITLAB_FORMAT.to_string(),
        version: "2.1".to_string(),
        licenses,
        dependencies: aggregation.packages.into_iter().map(Into::into).collect(),
    })
}
