//! Error types shared by the analyzer, license and report modules.
//!
//! Errors fall into two groups:
//!
//! - **Fatal**: the project manifest or lockfile is missing or invalid, a
//!   license identifier has no dataset record, or the config is broken.
//!   These propagate to `main` and end the run with a non-zero exit code.
//! - **Per-package**: a dependency's own `package.json` is unreadable or its
//!   `license` field is not a valid SPDX expression. The aggregator turns
//!   these into a warning and skips the package.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The string is not a well-formed SPDX license expression.
    #[error("malformed SPDX expression '{expression}': {reason}")]
    MalformedExpression { expression: String, reason: String },

    /// No dataset record exists for the identifier.
    #[error("unknown license id '{0}': no record in the license dataset")]
    UnknownLicenseId(String),

    /// A dataset record exists but could not be decoded.
    #[error("license data error: {id}: {reason}")]
    LicenseData { id: String, reason: String },

    #[error("failed to read manifest {}: {source}", path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest {}: {reason}", path.display())]
    ManifestParse { path: PathBuf, reason: String },

    #[error("failed to read lockfile {}: {source}", path.display())]
    LockfileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid lockfile {}: {reason}", path.display())]
    LockfileParse { path: PathBuf, reason: String },

    #[error("config error: {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    /// The requested output format is recognised but not produced.
    #[error("unsupported report format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn malformed(expression: &str, reason: impl Into<String>) -> Self {
        Error::MalformedExpression {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}
