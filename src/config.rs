use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

pub const DEFAULT_LOG_FILE: &str = "pnpm-cdx.log";
pub const DEFAULT_CONCURRENCY: usize = 64;

/// Settings read from `.pnpm-cdx/config.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory of SPDX `json/details` records. Unset means the bundled dataset.
    #[serde(default)]
    pub license_data: Option<PathBuf>,
    /// Where diagnostics go when the report is written to stdout.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    /// Maximum number of package manifests read at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl Default for Config {
    fn default() -> Self {
        Config {
            license_data: None,
            log_file: default_log_file(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl Config {
    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let mut config: Config = toml::from_str(&content).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if config.concurrency == 0 {
            return Err(Error::Config {
                path: path.to_path_buf(),
                reason: "concurrency must be at least 1".to_string(),
            });
        }
        // Relative dataset paths are taken from the config file's directory.
        if let (Some(data), Some(base)) = (config.license_data.as_mut(), path.parent()) {
            if data.is_relative() {
                *data = base.join(&*data);
            }
        }
        Ok(config)
    }
}

/// Load the configuration, searching in order:
///
/// 1. `config_override`: path passed via `--config`
/// 2. `<project_dir>/.pnpm-cdx/config.toml`
/// 3. `~/.config/pnpm-cdx/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(project_dir: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return Config::from_file(path);
    }

    let project_config = project_dir.join(".pnpm-cdx").join("config.toml");
    if project_config.exists() {
        return Config::from_file(&project_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".config").join("pnpm-cdx").join("config.toml");
        if home_config.exists() {
            return Config::from_file(&home_config);
        }
    }

    Ok(Config::default())
}
