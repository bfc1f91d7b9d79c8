//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use mount_visibility_tester::prelude::*;
//! ```

// Core
pub use crate::core::config::{Config, SamplingConfig};
pub use crate::core::errors::{MvtError, Result};

// Runtime
pub use crate::runtime::{ContainerRuntime, ExecOutput, RuntimeInfo};
pub use crate::runtime::docker::DockerCli;

// Pool
pub use crate::pool::{Environment, EnvironmentPool};

// Probe
pub use crate::probe::mutation::CommittedMutation;
pub use crate::probe::poller::{PollOutcome, VisibilityPoller};

// Sampler
pub use crate::sampler::{RunResult, RunState, Sampler};

// Report
pub use crate::report::model::{Outcome, Report, Sample, TestType};
pub use crate::report::stats::{Summary, summarize};
