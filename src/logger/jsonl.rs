//! JSONL run log: append-only line-delimited JSON covering one experiment.
//!
//! Each line is a self-contained JSON object, assembled in memory and
//! written atomically via `write_all` so lines never interleave when the
//! file is tailed by another process. Degradation chain: primary file →
//! stderr with `[MVT-LOG]` prefix → silent discard. A measurement run must
//! never fail because its log could not be written.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::report::model::{Outcome, Sample, TestType};

/// Run log event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    RunStart,
    EnvironmentProvision,
    SampleOk,
    SampleTimeout,
    SampleError,
    RunComplete,
    RunAborted,
    Teardown,
}

/// A single run log entry — all fields optional except `ts` and `event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    /// Event type identifier.
    pub event: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_type: Option<TestType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    #[must_use]
    pub fn new(event: EventType) -> Self {
        Self {
            ts: crate::report::model::format_timestamp(chrono::Utc::now()),
            event,
            sample_id: None,
            test_type: None,
            environment_id: None,
            latency_ms: None,
            error_detail: None,
            details: None,
        }
    }

    /// Entry describing a finished sample.
    #[must_use]
    pub fn for_sample(sample: &Sample) -> Self {
        let event = match sample.outcome {
            Outcome::Ok => EventType::SampleOk,
            Outcome::Timeout => EventType::SampleTimeout,
            Outcome::Error => EventType::SampleError,
        };
        let mut entry = Self::new(event);
        entry.sample_id = Some(sample.sample_id);
        entry.test_type = Some(sample.test_type);
        entry.environment_id = Some(sample.environment_id);
        entry.latency_ms = sample.latency_ms;
        entry.error_detail = sample.error_detail.clone();
        entry
    }

    /// Attach freeform details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Degradation state of the JSONL writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Stderr,
    Discard,
}

/// Append-only JSONL run log writer with graceful degradation.
pub struct JsonlWriter {
    writer: Option<BufWriter<File>>,
    state: WriterState,
}

impl JsonlWriter {
    /// Open the run log for appending, creating parent directories.
    /// Falls through the degradation chain on failure.
    #[must_use]
    pub fn open(path: &Path) -> Self {
        match open_append(path) {
            Ok(file) => Self {
                writer: Some(BufWriter::with_capacity(16 * 1024, file)),
                state: WriterState::Normal,
            },
            Err(e) => {
                let _ = writeln!(
                    io::stderr(),
                    "[MVT-LOG] cannot open {}: {e}; logging to stderr",
                    path.display()
                );
                Self {
                    writer: None,
                    state: WriterState::Stderr,
                }
            }
        }
    }

    /// A writer that drops everything, for callers that opt out of logging.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            writer: None,
            state: WriterState::Discard,
        }
    }

    /// Write a single entry as one atomic JSONL line.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[MVT-LOG] serialize error: {e}");
                return;
            }
        };

        match self.state {
            WriterState::Normal => {
                if let Some(w) = self.writer.as_mut() {
                    if w.write_all(line.as_bytes()).is_ok() {
                        return;
                    }
                }
                self.writer = None;
                self.state = WriterState::Stderr;
                let _ = write!(io::stderr(), "[MVT-LOG] {line}");
            }
            WriterState::Stderr => {
                let _ = write!(io::stderr(), "[MVT-LOG] {line}");
            }
            WriterState::Discard => {}
        }
    }

    /// Flush buffers.
    pub fn flush(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
    }

    /// Current degradation state, for diagnostics.
    #[must_use]
    pub const fn state(&self) -> &'static str {
        match self.state {
            WriterState::Normal => "normal",
            WriterState::Stderr => "stderr",
            WriterState::Discard => "discard",
        }
    }
}

impl Drop for JsonlWriter {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Open or create a file for appending, creating parent directories.
fn open_append(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}
