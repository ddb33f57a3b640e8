//! Report generation and output.
//!
//! - [`gitlab`]: aggregation and assembly of the GitLab license report 2.1.

use std::path::Path;

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use tracing::{debug, info};

use crate::analyzer::Project;
use crate::cli::ReportFormat;
use crate::error::Error;
use crate::license::metadata::LicenseCache;
use crate::models::Report;

pub mod gitlab;

/// Build a report in the requested format.
pub async fn generate(
    project: &Project,
    format: &ReportFormat,
    cache: &mut LicenseCache,
    concurrency: usize,
    progress: Option<&ProgressBar>,
) -> Result<Report> {
    match format {
        ReportFormat::Gitlab => {
            let aggregation = gitlab::aggregate(project, concurrency, progress).await;
            info!(
                project = project.manifest.name.as_deref().unwrap_or("<unnamed>"),
                license = project.manifest.license(),
                resolved = aggregation.packages.len(),
                skipped = aggregation.skipped.len(),
                licenses = aggregation.usage.len(),
                "resolved dependency licenses"
            );
            let report = gitlab::build(aggregation, cache)?;
            debug!(cached_licenses = cache.len(), "license metadata resolved");
            Ok(Report::Gitlab(report))
        }
        ReportFormat::Cyclonedx => Err(Error::UnsupportedFormat("cyclonedx".to_string()).into()),
    }
}

/// Pretty-printed JSON with a trailing newline.
pub fn to_json(report: &Report) -> Result<String> {
    let mut json = serde_json::to_string_pretty(report)?;
    json.push('\n');
    Ok(json)
}

/// Write the report to `output`, or stdout when `None`.
pub fn write(report: &Report, output: Option<&Path>) -> Result<()> {
    let json = to_json(report)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            info!(path = %path.display(), format = report.format_tag(), "wrote report");
        }
        None => print!("{}", json),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GitlabReport, GITLAB_FORMAT};

    fn empty_report() -> Report {
        Report::Gitlab(GitlabReport {
            format: GITLAB_FORMAT.to_string(),
            version: "2.1".to_string(),
            licenses: Vec::new(),
            dependencies: Vec::new(),
        })
    }

    #[test]
    fn test_json_shape() {
        let json = to_json(&empty_report()).unwrap();
        assert_eq!(
            json,
            "{\n  \"pnpm-cdx-meta-format\": \"gitlab-license-report-2.1\",\n  \"version\": \"2.1\",\n  \"licenses\": [],\n  \"dependencies\": []\n}\n"
        );
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write(&empty_report(), Some(&path)).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["pnpm-cdx-meta-format"], "gitlab-license-report-2.1");
    }

    #[tokio::test]
    async fn test_cyclonedx_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        std::fs::write(
            dir.path().join("pnpm-lock.yaml"),
            "lockfileVersion: 5.4\npackages: {}\n",
        )
        .unwrap();
        let project = Project::open(dir.path()).await.unwrap();
        let err = generate(
            &project,
            &ReportFormat::Cyclonedx,
            &mut LicenseCache::bundled(),
            4,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::UnsupportedFormat(_))
        ));
    }
}
