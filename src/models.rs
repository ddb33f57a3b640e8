use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Format tag written into every report.
pub const GITLAB_FORMAT: &str = "gitlab-license-report-2.1";

/// A lockfile package whose license was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    /// e.g. `/@babel/core/7.20.0`
    pub qualified_name: String,
    pub name: String,
    pub version: String,
    /// Flattened identifiers in expression order, duplicates kept.
    pub licenses: Vec<String>,
}

/// Display data for one SPDX identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseMetadataEntry {
    pub id: String,
    pub name: String,
    pub url: String,
}

/// A lockfile package left out of the report, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPackage {
    pub qualified_name: String,
    pub reason: String,
}

/// Number of resolved packages listing each license identifier.
pub type LicenseUsage = BTreeMap<String, usize>;

/// `dependencies[]` record of a GitLab license report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitlabDependency {
    pub name: String,
    pub version: String,
    pub package_manager: String,
    pub path: String,
    pub licenses: Vec<String>,
}

impl From<ResolvedPackage> for GitlabDependency {
    fn from(pkg: ResolvedPackage) -> Self {
        GitlabDependency {
            name: pkg.name,
            version: pkg.version,
            package_manager: "pnpm".to_string(),
            path: "package.json".to_string(),
            licenses: pkg.licenses,
        }
    }
}

/// GitLab license scanning report, schema version 2.1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitlabReport {
    #[serde(rename = "pnpm-cdx-meta-format")]
    pub format: String,
    pub version: String,
    pub licenses: Vec<LicenseMetadataEntry>,
    pub dependencies: Vec<GitlabDependency>,
}

/// A finished report document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Report {
    Gitlab(GitlabReport),
}

impl Report {
    pub fn format_tag(&self) -> &str {
        match self {
            Report::Gitlab(r) => &r.format,
        }
    }
}
