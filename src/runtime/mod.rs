//! Container runtime abstraction.
//!
//! The measurement core never talks to Docker directly; it goes through the
//! [`ContainerRuntime`] trait so the whole pipeline can run against an
//! in-memory fake in tests. The [`docker`] module provides the shipped
//! implementation driving the `docker` CLI.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::Result;

pub mod docker;

/// Captured output of one in-container command.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Process exit code; nonzero exits are data (e.g. `test -f` misses),
    /// not errors.
    pub exit_code: i32,
    /// Captured stdout, lossily decoded.
    pub stdout: String,
}

impl ExecOutput {
    /// Whether the command exited 0.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Best-effort runtime metadata recorded in report headers.
///
/// Fields degrade to `"unknown"` rather than failing the run; metadata must
/// never block a measurement.
#[allow(missing_docs)]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuntimeInfo {
    pub name: String,
    pub version: String,
    pub api_version: String,
    pub storage_driver: String,
    pub operating_system: String,
}

#[allow(missing_docs)]
impl RuntimeInfo {
    #[must_use]
    pub fn unknown(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: "unknown".to_string(),
            api_version: "unknown".to_string(),
            storage_driver: "unknown".to_string(),
            operating_system: "unknown".to_string(),
        }
    }
}

/// Operations the measurement core needs from a container runtime.
///
/// Handles returned by [`create_container`](Self::create_container) are owned
/// exclusively by the environment pool; no other component may create or
/// destroy one.
pub trait ContainerRuntime {
    /// Verify the runtime daemon is reachable.
    fn ping(&self) -> Result<()>;

    /// Start a long-lived container with `host_dir` bind-mounted read-write
    /// at `container_path`. Returns the runtime's container handle.
    fn create_container(
        &self,
        image: &str,
        host_dir: &Path,
        container_path: &str,
    ) -> Result<String>;

    /// Run a command inside the container and capture its exit code and
    /// stdout. A nonzero exit is a successful observation; only a broken
    /// exec channel is an `Err`.
    fn exec(&self, handle: &str, argv: &[&str]) -> Result<ExecOutput>;

    /// Stop and remove the container.
    fn stop_and_remove(&self, handle: &str) -> Result<()>;

    /// Best-effort runtime metadata for report headers.
    fn info(&self) -> RuntimeInfo;
}
