//! Sampler: the sequential experiment loop.
//!
//! One sample at a time — concurrent mutations would share container
//! runtime resources unpredictably and confound per-sample timing with
//! scheduling contention. Per-sample failures become that sample's
//! outcome; only a dead pool or an operator abort ends the run early, and
//! even then the samples collected so far are kept.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::config::SamplingConfig;
use crate::pool::{Environment, EnvironmentPool};
use crate::probe::mutation::{self, CommittedMutation};
use crate::probe::poller::{PollOutcome, VisibilityPoller};
use crate::report::model::{Outcome, Sample, TestType, format_timestamp};
use crate::runtime::ContainerRuntime;

/// Samples between progress callbacks.
const PROGRESS_EVERY: u64 = 10;

/// Lifecycle of one experiment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Not started.
    Idle,
    /// Loop in progress.
    Running,
    /// All requested iterations finished, whatever their outcomes.
    Complete,
    /// Ended early on operator abort or a dead pool; partial samples kept.
    Aborted,
}

/// Outcome of a run: the ordered sample sequence and the terminal state.
#[derive(Debug)]
pub struct RunResult {
    /// Samples in append order; `sample_id` is dense `0..len`.
    pub samples: Vec<Sample>,
    /// Terminal state, [`RunState::Complete`] or [`RunState::Aborted`].
    pub state: RunState,
}

/// Drives the experiment loop against a provisioned pool.
pub struct Sampler<'a, R: ContainerRuntime> {
    runtime: &'a R,
    pool: &'a EnvironmentPool<'a, R>,
    container_mount_path: String,
    num_samples: u64,
    poller: VisibilityPoller,
    rng: StdRng,
    state: RunState,
}

impl<'a, R: ContainerRuntime> Sampler<'a, R> {
    /// Create a sampler for one run.
    ///
    /// A configured seed makes type/environment selection (and generated
    /// names) reproducible; otherwise the RNG seeds from OS entropy.
    #[must_use]
    pub fn new(
        runtime: &'a R,
        pool: &'a EnvironmentPool<'a, R>,
        sampling: &SamplingConfig,
        container_mount_path: &str,
    ) -> Self {
        let rng = sampling
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            runtime,
            pool,
            container_mount_path: container_mount_path.to_string(),
            num_samples: sampling.num_samples,
            poller: VisibilityPoller::new(sampling.poll_interval(), sampling.timeout()),
            rng,
            state: RunState::Idle,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Run the experiment loop.
    ///
    /// `abort` is observed between samples; `progress` is invoked every
    /// [`PROGRESS_EVERY`] samples with (done, total).
    pub fn run(
        &mut self,
        abort: &AtomicBool,
        mut progress: impl FnMut(u64, u64),
    ) -> RunResult {
        self.state = RunState::Running;
        let mut samples = Vec::with_capacity(usize::try_from(self.num_samples).unwrap_or(0));

        for sample_id in 0..self.num_samples {
            if abort.load(Ordering::Relaxed) {
                self.state = RunState::Aborted;
                break;
            }
            if sample_id % PROGRESS_EVERY == 0 {
                progress(sample_id, self.num_samples);
            }

            // Selection order (type, then environment) is part of the
            // seeded-reproducibility contract.
            let test_type = if self.rng.random_bool(0.5) {
                TestType::File
            } else {
                TestType::Directory
            };
            let pool = self.pool;
            if pool.is_empty() {
                self.state = RunState::Aborted;
                break;
            }
            let env_index = self.rng.random_range(0..pool.len());
            let Some(env) = pool.acquire(env_index) else {
                self.state = RunState::Aborted;
                break;
            };

            samples.push(self.take_sample(sample_id, test_type, env));
        }

        if self.state == RunState::Running {
            self.state = RunState::Complete;
            progress(self.num_samples, self.num_samples);
        }
        RunResult {
            samples,
            state: self.state,
        }
    }

    /// One probe-then-poll measurement. Every failure path yields a sample;
    /// nothing escapes to abort the loop.
    fn take_sample(&mut self, sample_id: u64, test_type: TestType, env: &Environment) -> Sample {
        let committed = match self.mutate(test_type, env) {
            Ok(m) => m,
            Err(e) => {
                // The mutation never committed, so there is no commit time.
                return error_sample(sample_id, test_type, env.id, None, e.to_string());
            }
        };

        let sample = match self.poller.poll(self.runtime, env, &committed) {
            Ok(PollOutcome::Observed(observed_at)) => {
                let latency_ms = latency_ms_between(committed.committed_at, observed_at);
                if latency_ms < 0.0 {
                    // Host clock went backwards between fsync and
                    // observation; report a fault, not a negative latency.
                    error_sample(
                        sample_id,
                        test_type,
                        env.id,
                        Some(committed.committed_at),
                        format!("negative latency {latency_ms} ms indicates clock skew"),
                    )
                } else {
                    Sample {
                        sample_id,
                        test_type,
                        environment_id: env.id,
                        outcome: Outcome::Ok,
                        latency_ms: Some(latency_ms),
                        host_commit_time: Some(format_timestamp(committed.committed_at)),
                        observed_time: Some(format_timestamp(observed_at)),
                        error_detail: None,
                    }
                }
            }
            Ok(PollOutcome::TimedOut) => Sample {
                sample_id,
                test_type,
                environment_id: env.id,
                outcome: Outcome::Timeout,
                latency_ms: None,
                host_commit_time: Some(format_timestamp(committed.committed_at)),
                observed_time: None,
                error_detail: None,
            },
            Err(e) => error_sample(
                sample_id,
                test_type,
                env.id,
                Some(committed.committed_at),
                e.to_string(),
            ),
        };

        mutation::remove(&committed);
        sample
    }

    fn mutate(
        &mut self,
        test_type: TestType,
        env: &Environment,
    ) -> crate::core::errors::Result<CommittedMutation> {
        match test_type {
            TestType::File => mutation::write_file(env, &self.container_mount_path, &mut self.rng),
            TestType::Directory => {
                mutation::make_directory(env, &self.container_mount_path, &mut self.rng)
            }
        }
    }
}

fn error_sample(
    sample_id: u64,
    test_type: TestType,
    environment_id: usize,
    committed_at: Option<DateTime<Utc>>,
    detail: String,
) -> Sample {
    Sample {
        sample_id,
        test_type,
        environment_id,
        outcome: Outcome::Error,
        latency_ms: None,
        host_commit_time: committed_at.map(format_timestamp),
        observed_time: None,
        error_detail: Some(detail),
    }
}

/// Signed elapsed milliseconds between commit and observation.
#[allow(clippy::cast_precision_loss)]
fn latency_ms_between(committed_at: DateTime<Utc>, observed_at: DateTime<Utc>) -> f64 {
    let delta = observed_at - committed_at;
    delta.num_microseconds().map_or_else(
        || delta.num_milliseconds() as f64,
        |micros| micros as f64 / 1000.0,
    )
}
