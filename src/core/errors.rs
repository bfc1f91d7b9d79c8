//! MVT-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, MvtError>;

/// Top-level error type for the mount visibility tester.
///
/// Timeouts are deliberately absent: a sample that times out is an expected,
/// countable outcome carried by [`crate::probe::poller::PollOutcome`], not a
/// failure of the system under test.
#[derive(Debug, Error)]
pub enum MvtError {
    #[error("[MVT-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[MVT-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[MVT-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[MVT-2001] environment provisioning failure: {details}")]
    Provisioning { details: String },

    #[error("[MVT-2101] host mutation failure at {path}: {source}")]
    Mutation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[MVT-2102] container observation failure: {details}")]
    Observation { details: String },

    #[error("[MVT-3001] report IO failure at {path}: {source}")]
    ReportIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[MVT-3002] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[MVT-3003] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[MVT-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl MvtError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "MVT-1001",
            Self::MissingConfig { .. } => "MVT-1002",
            Self::ConfigParse { .. } => "MVT-1003",
            Self::Provisioning { .. } => "MVT-2001",
            Self::Mutation { .. } => "MVT-2101",
            Self::Observation { .. } => "MVT-2102",
            Self::ReportIo { .. } => "MVT-3001",
            Self::Serialization { .. } => "MVT-3002",
            Self::Io { .. } => "MVT-3003",
            Self::Runtime { .. } => "MVT-3900",
        }
    }

    /// Whether this failure aborts an entire run.
    ///
    /// Non-fatal variants are recorded as the outcome of the sample that hit
    /// them and the loop continues.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::MissingConfig { .. }
                | Self::ConfigParse { .. }
                | Self::Provisioning { .. }
                | Self::ReportIo { .. }
                | Self::Serialization { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for mutation errors with a known path.
    #[must_use]
    pub fn mutation(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Mutation {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for MvtError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for MvtError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
