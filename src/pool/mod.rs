//! Environment pool: fixed set of (host temp dir, running container) pairs.
//!
//! All environments are provisioned up front so sample timing is never
//! confounded by provisioning cost, and torn down together on every exit
//! path. The pool is the sole owner of container handles and host dirs.

use std::path::PathBuf;

use tempfile::TempDir;

use crate::core::errors::{MvtError, Result};
use crate::runtime::ContainerRuntime;

/// One isolated test channel: a host directory bind-mounted into a running
/// container.
///
/// Invariant: the container's mount always reflects the current state of
/// `host_dir` with no manual refresh step — that propagation delay is
/// exactly what the tool measures.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Dense index within the pool, recorded in samples.
    pub id: usize,
    /// Host-side directory the container sees through its bind mount.
    pub host_dir: PathBuf,
    /// Runtime-assigned container handle.
    pub container: String,
}

/// Fixed pool of provisioned environments with guaranteed teardown.
#[derive(Debug)]
pub struct EnvironmentPool<'r, R: ContainerRuntime> {
    runtime: &'r R,
    environments: Vec<Environment>,
    temp_dirs: Vec<TempDir>,
    torn_down: bool,
}

impl<'r, R: ContainerRuntime> EnvironmentPool<'r, R> {
    /// Provision `count` environments against `runtime`.
    ///
    /// Any failure is fatal: no sample can be trusted without a fully
    /// functional pool. Environments already created are rolled back before
    /// the error is returned.
    pub fn provision(
        runtime: &'r R,
        image: &str,
        container_mount_path: &str,
        count: usize,
    ) -> Result<Self> {
        let mut pool = Self {
            runtime,
            environments: Vec::with_capacity(count),
            temp_dirs: Vec::with_capacity(count),
            torn_down: false,
        };

        for id in 0..count {
            match pool.provision_one(id, image, container_mount_path) {
                Ok(()) => {}
                Err(e) => {
                    pool.teardown();
                    return Err(e);
                }
            }
        }
        Ok(pool)
    }

    fn provision_one(&mut self, id: usize, image: &str, container_mount_path: &str) -> Result<()> {
        let temp_dir = tempfile::Builder::new()
            .prefix(&format!("mvt_env_{id}_"))
            .tempdir()
            .map_err(|source| MvtError::Provisioning {
                details: format!("failed to create host dir for environment {id}: {source}"),
            })?;

        let container =
            self.runtime
                .create_container(image, temp_dir.path(), container_mount_path)?;

        self.environments.push(Environment {
            id,
            host_dir: temp_dir.path().to_path_buf(),
            container,
        });
        self.temp_dirs.push(temp_dir);
        Ok(())
    }

    /// Look up a previously-provisioned environment.
    ///
    /// Returns `None` once the pool is torn down or when `index` is out of
    /// range — the caller treats that as the pool being dead.
    #[must_use]
    pub fn acquire(&self, index: usize) -> Option<&Environment> {
        if self.torn_down {
            return None;
        }
        self.environments.get(index)
    }

    /// Number of provisioned environments.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.torn_down {
            0
        } else {
            self.environments.len()
        }
    }

    /// Whether the pool has no usable environments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop and remove every container and delete every host dir.
    ///
    /// Best-effort per environment: one stuck container must not leak the
    /// others. Idempotent; also invoked from `Drop` so cleanup runs on every
    /// exit path.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        for env in self.environments.drain(..) {
            let _ = self.runtime.stop_and_remove(&env.container);
        }
        // TempDir drop removes the host dirs.
        self.temp_dirs.clear();
    }
}

impl<R: ContainerRuntime> Drop for EnvironmentPool<'_, R> {
    fn drop(&mut self) {
        self.teardown();
    }
}
