//! `pnpm-cdx`: resolve the licenses of a pnpm project's dependencies and emit
//! a compliance report.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]).
//! 2. Load config ([`config::load_config`]) and set up logging.
//! 3. Read `package.json` and `pnpm-lock.yaml` ([`analyzer::Project`]).
//! 4. Resolve each locked package's license expression ([`report::gitlab::aggregate`],
//!    [`license::expression`]).
//! 5. Look up display data per license ([`license::metadata::LicenseCache`]).
//! 6. Write the report as JSON to stdout or `--output` ([`report`]).
//!
//! Fatal errors exit with code `1`; unresolvable dependencies are logged and skipped.

mod analyzer;
mod cli;
mod config;
mod error;
mod license;
mod models;
mod report;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use analyzer::Project;
use cli::{Cli, Command};
use config::{load_config, Config};
use license::metadata::{DirectorySource, LicenseCache};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let project_dir = project_dir(&cli.path);
    let config = load_config(&project_dir, cli.config.as_deref())?;

    // Without --output the report owns stdout, so diagnostics go to the log file.
    let log_file = match (&cli.command, &cli.output) {
        (None, None) => Some(config.log_file.as_path()),
        _ => None,
    };
    init_logging(cli.verbose, log_file)?;

    let mut cache = license_cache(cli.license_data.as_deref(), &config);

    if let Some(Command::Info { spdx }) = &cli.command {
        let record = cache.record(spdx)?;
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let format = cli
        .format
        .context("an output format is required (gitlab or cyclonedx)")?;
    let concurrency = cli
        .concurrency
        .map(|n| n as usize)
        .unwrap_or(config.concurrency);

    let project = Project::open(&cli.path).await?;

    let pb = if !cli.quiet && cli.output.is_some() {
        let pb = ProgressBar::new(project.package_keys().len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let report = report::generate(&project, &format, &mut cache, concurrency, pb.as_ref()).await?;

    if let Some(pb) = pb {
        pb.finish_with_message("Done");
    }

    report::write(&report, cli.output.as_deref())
}

/// The directory holding `package.json`; `path` may name the file itself.
fn project_dir(path: &Path) -> PathBuf {
    if path.is_dir() {
        return path.to_path_buf();
    }
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn license_cache(cli_override: Option<&Path>, config: &Config) -> LicenseCache {
    match cli_override.or(config.license_data.as_deref()) {
        Some(dir) => {
            let source = DirectorySource::new(dir);
            debug!(dir = %source.root().display(), "using license dataset directory");
            LicenseCache::new(source)
        }
        None => LicenseCache::bundled(),
    }
}

/// Console logging to stderr, or append-only logging to `log_file`.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<()> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(project_dir(dir.path()), dir.path());
        assert_eq!(
            project_dir(&dir.path().join("package.json")),
            dir.path().to_path_buf()
        );
        assert_eq!(project_dir(Path::new("package.json")), PathBuf::from("."));
    }

    #[test]
    fn test_license_cache_prefers_cli_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Custom-1.0.json"),
            r#"{"licenseId":"Custom-1.0","name":"Custom License"}"#,
        )
        .unwrap();
        let config = Config::default();

        let mut cache = license_cache(Some(dir.path()), &config);
        assert_eq!(cache.lookup("Custom-1.0").unwrap().name, "Custom License");

        let mut bundled = license_cache(None, &config);
        assert!(bundled.lookup("Custom-1.0").is_err());
        assert!(bundled.lookup("MIT").is_ok());
    }
}
