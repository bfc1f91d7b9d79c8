//! Report data model: samples, metadata, and the persisted report shape.
//!
//! Field names here are the wire format; a report written by one version
//! must load in the next, so changes are additive only.

#![allow(missing_docs)]

use std::fs;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::core::config::Config;
use crate::report::stats::{self, Summary};
use crate::runtime::RuntimeInfo;

/// Kind of host-side mutation a sample measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    File,
    Directory,
}

impl TestType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
        }
    }
}

impl std::fmt::Display for TestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a sample ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Mutation observed inside the container.
    Ok,
    /// Target never became visible within the per-sample timeout.
    Timeout,
    /// Host write or container-side check failed.
    Error,
}

/// One measured (or timed-out/errored) mutation-to-visibility attempt.
///
/// Immutable once appended. `latency_ms` and `observed_time` are present
/// exactly when `outcome` is [`Outcome::Ok`]; `host_commit_time` is absent
/// only when the host mutation itself never committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub sample_id: u64,
    pub test_type: TestType,
    pub environment_id: usize,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_commit_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl Sample {
    /// Whether the mutation was observed.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.outcome, Outcome::Ok)
    }
}

/// Host system description recorded in report headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub family: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel: Option<String>,
}

impl SystemInfo {
    /// Describe the machine running the orchestrator.
    #[must_use]
    pub fn collect() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            family: std::env::consts::FAMILY.to_string(),
            kernel: fs::read_to_string("/proc/version")
                .ok()
                .map(|s| s.trim().to_string()),
        }
    }
}

/// Run header: when and where the experiment ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub timestamp: String,
    pub system: SystemInfo,
    pub runtime: RuntimeInfo,
}

impl Metadata {
    #[must_use]
    pub fn new(started_at: DateTime<Utc>, system: SystemInfo, runtime: RuntimeInfo) -> Self {
        Self {
            timestamp: format_timestamp(started_at),
            system,
            runtime,
        }
    }
}

/// The experiment parameters a report was produced under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestConfigSection {
    pub num_samples: u64,
    /// Stored as seconds to match the CLI flag; fractional values allowed.
    pub timeout_seconds: f64,
    pub poll_interval_ms: u64,
    pub num_environments: usize,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl TestConfigSection {
    /// Capture the effective configuration of a run.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            num_samples: config.sampling.num_samples,
            timeout_seconds: config.sampling.timeout_seconds,
            poll_interval_ms: config.sampling.poll_interval_ms,
            num_environments: config.sampling.num_environments,
            image: config.runtime.image.clone(),
            seed: config.sampling.seed,
        }
    }
}

/// The persisted experiment result.
///
/// `samples` is append-only and `summary` is always a pure function of it:
/// loading a saved report and recomputing the summary from `samples` alone
/// reproduces the stored summary exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub metadata: Metadata,
    pub test_config: TestConfigSection,
    pub samples: Vec<Sample>,
    pub summary: Summary,
}

impl Report {
    /// Assemble a report, deriving `summary` from `samples`.
    #[must_use]
    pub fn new(metadata: Metadata, test_config: TestConfigSection, samples: Vec<Sample>) -> Self {
        let summary = stats::summarize(&samples);
        Self {
            metadata,
            test_config,
            samples,
            summary,
        }
    }
}

/// Canonical timestamp encoding for all report fields (RFC 3339, UTC,
/// microsecond precision — millisecond buckets are too coarse for the
/// latencies this tool reports).
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
