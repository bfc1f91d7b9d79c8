//! Mutation probe: performs one host-side filesystem mutation and records
//! the instant the host filesystem guarantees its persistence.
//!
//! `committed_at` is captured after an explicit fsync, not after the write
//! call returns — write calls can return before data reaches disk, which
//! would bias measured latency low or even negative.

use std::fs::{self, File};
use std::io::Write as _;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;

use crate::core::errors::{MvtError, Result};
use crate::pool::Environment;
use crate::report::model::TestType;

/// Length of generated file/directory names.
const NAME_LEN: usize = 10;
/// Length of generated file content.
const CONTENT_LEN: usize = 100;

/// A durably committed host-side mutation awaiting container observation.
#[derive(Debug, Clone)]
pub struct CommittedMutation {
    /// What kind of mutation was performed.
    pub test_type: TestType,
    /// Path of the mutation on the host.
    pub host_path: PathBuf,
    /// The same path as seen from inside the container.
    pub container_path: String,
    /// Expected file content; `None` for directories. Observation requires
    /// matching content, not mere existence.
    pub expected_content: Option<String>,
    /// Host commit time: when the mutation was durably flushed.
    pub committed_at: DateTime<Utc>,
}

/// Write a fresh random file into the environment and flush it to disk.
///
/// Names and content are unpredictable per invocation so a sample never
/// collides with a prior one still being polled for in the same
/// environment. Failures are never retried — a retry would corrupt the
/// timing baseline.
pub fn write_file<R: Rng + ?Sized>(
    env: &Environment,
    container_mount_path: &str,
    rng: &mut R,
) -> Result<CommittedMutation> {
    let name = random_token(rng, NAME_LEN);
    let content = random_token(rng, CONTENT_LEN);
    let host_path = env.host_dir.join(&name);

    let mut file = File::create(&host_path).map_err(|e| MvtError::mutation(&host_path, e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| MvtError::mutation(&host_path, e))?;
    file.sync_all()
        .map_err(|e| MvtError::mutation(&host_path, e))?;

    Ok(CommittedMutation {
        test_type: TestType::File,
        container_path: join_container_path(container_mount_path, &name),
        host_path,
        expected_content: Some(content),
        committed_at: Utc::now(),
    })
}

/// Create a fresh random directory in the environment and flush the parent
/// directory entry to disk.
pub fn make_directory<R: Rng + ?Sized>(
    env: &Environment,
    container_mount_path: &str,
    rng: &mut R,
) -> Result<CommittedMutation> {
    let name = random_token(rng, NAME_LEN);
    let host_path = env.host_dir.join(&name);

    fs::create_dir(&host_path).map_err(|e| MvtError::mutation(&host_path, e))?;
    // Directory creation is durable once the parent's entry is synced.
    let parent = File::open(&env.host_dir).map_err(|e| MvtError::mutation(&env.host_dir, e))?;
    parent
        .sync_all()
        .map_err(|e| MvtError::mutation(&env.host_dir, e))?;

    Ok(CommittedMutation {
        test_type: TestType::Directory,
        container_path: join_container_path(container_mount_path, &name),
        host_path,
        expected_content: None,
        committed_at: Utc::now(),
    })
}

/// Remove the mutated path, best-effort. Called after a sample completes so
/// long runs do not accrete thousands of entries per environment.
pub fn remove(mutation: &CommittedMutation) {
    match mutation.test_type {
        TestType::File => {
            let _ = fs::remove_file(&mutation.host_path);
        }
        TestType::Directory => {
            let _ = fs::remove_dir_all(&mutation.host_path);
        }
    }
}

fn join_container_path(container_mount_path: &str, name: &str) -> String {
    format!(
        "{}/{name}",
        container_mount_path.trim_end_matches('/')
    )
}

fn random_token<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len).map(|_| rng.sample(Alphanumeric) as char).collect()
}
