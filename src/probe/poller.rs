//! Visibility poller: watches the container until a committed mutation
//! becomes observable, bounded by the per-sample timeout.
//!
//! The polling interval must stay small relative to expected latency, yet
//! each check costs a full exec round-trip into the container — that
//! round-trip is the dominant source of instrumentation-induced inflation
//! in reported numbers and is called out in rendered output.

use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::core::errors::Result;
use crate::pool::Environment;
use crate::probe::mutation::CommittedMutation;
use crate::report::model::TestType;
use crate::runtime::ContainerRuntime;

/// Result of one poll cycle.
///
/// `TimedOut` is an expected, countable outcome — the caller records
/// outcome=timeout, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The mutation became visible; carries the first observation time.
    Observed(DateTime<Utc>),
    /// The timeout elapsed without an observation.
    TimedOut,
}

/// Fixed-interval visibility poller.
#[derive(Debug, Clone, Copy)]
pub struct VisibilityPoller {
    interval: Duration,
    timeout: Duration,
}

impl VisibilityPoller {
    /// Create a poller checking every `interval`, giving up after `timeout`.
    #[must_use]
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Poll until the mutation is observed or the timeout elapses.
    ///
    /// `TimedOut` is returned only once at least `timeout` has passed since
    /// polling began. An exec channel failure propagates immediately
    /// without retry.
    pub fn poll<R: ContainerRuntime>(
        &self,
        runtime: &R,
        env: &Environment,
        mutation: &CommittedMutation,
    ) -> Result<PollOutcome> {
        let started = Instant::now();
        loop {
            if self.check(runtime, env, mutation)? {
                return Ok(PollOutcome::Observed(Utc::now()));
            }
            let elapsed = started.elapsed();
            if elapsed >= self.timeout {
                return Ok(PollOutcome::TimedOut);
            }
            thread::sleep(self.interval.min(self.timeout - elapsed));
        }
    }

    /// One lightweight in-container check. For files, existence alone is
    /// not enough: the content must match what the host committed.
    fn check<R: ContainerRuntime>(
        &self,
        runtime: &R,
        env: &Environment,
        mutation: &CommittedMutation,
    ) -> Result<bool> {
        let exists_flag = match mutation.test_type {
            TestType::File => "-f",
            TestType::Directory => "-d",
        };
        let exists = runtime.exec(
            &env.container,
            &["test", exists_flag, &mutation.container_path],
        )?;
        if !exists.success() {
            return Ok(false);
        }

        match &mutation.expected_content {
            Some(expected) => {
                let cat = runtime.exec(&env.container, &["cat", &mutation.container_path])?;
                Ok(cat.success() && cat.stdout.trim() == expected.as_str())
            }
            None => Ok(true),
        }
    }
}
