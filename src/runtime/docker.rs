//! Docker CLI runtime: drives the `docker` binary over `std::process::Command`.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::core::errors::{MvtError, Result};

use super::{ContainerRuntime, ExecOutput, RuntimeInfo};

/// Command the test containers idle on so they stay alive between exec calls.
const IDLE_COMMAND: [&str; 3] = ["tail", "-f", "/dev/null"];

/// [`ContainerRuntime`] implementation shelling out to the Docker CLI.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: PathBuf,
}

impl DockerCli {
    /// Create a client driving the given `docker` binary.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run a docker subcommand, requiring exit 0.
    fn run_docker(&self, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|source| MvtError::io(&self.binary, source))?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if output.status.success() {
            Ok(stdout.trim().to_string())
        } else {
            Err(MvtError::Runtime {
                details: format!(
                    "docker {} failed (exit {}): {}",
                    args.join(" "),
                    output.status.code().unwrap_or(-1),
                    stderr.trim()
                ),
            })
        }
    }

    /// Run a docker subcommand where a nonzero exit is data, not a failure.
    fn run_docker_lenient(&self, args: &[&str]) -> Option<String> {
        let output = Command::new(&self.binary).args(args).output().ok()?;
        if output.status.success() {
            Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            None
        }
    }
}

impl ContainerRuntime for DockerCli {
    fn ping(&self) -> Result<()> {
        self.run_docker(&["info", "--format", "{{.ID}}"])
            .map(|_| ())
            .map_err(|e| MvtError::Provisioning {
                details: format!("container runtime unreachable: {e}"),
            })
    }

    fn create_container(
        &self,
        image: &str,
        host_dir: &Path,
        container_path: &str,
    ) -> Result<String> {
        let volume = format!("{}:{container_path}:rw", host_dir.display());
        let mut args = vec!["run", "-d", "-v", volume.as_str(), image];
        args.extend_from_slice(&IDLE_COMMAND);

        let container_id = self
            .run_docker(&args)
            .map_err(|e| MvtError::Provisioning {
                details: format!("failed to start container from {image}: {e}"),
            })?;
        if container_id.is_empty() {
            return Err(MvtError::Provisioning {
                details: format!("docker run for {image} returned no container id"),
            });
        }
        Ok(container_id)
    }

    fn exec(&self, handle: &str, argv: &[&str]) -> Result<ExecOutput> {
        let mut args = vec!["exec", handle];
        args.extend_from_slice(argv);

        let output = Command::new(&self.binary)
            .args(&args)
            .output()
            .map_err(|source| MvtError::Observation {
                details: format!("exec channel failure for {handle}: {source}"),
            })?;
        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        })
    }

    fn stop_and_remove(&self, handle: &str) -> Result<()> {
        // `rm -f` stops and removes in one call; SIGKILL is fine for a
        // container idling on `tail`.
        self.run_docker(&["rm", "-f", handle]).map(|_| ())
    }

    fn info(&self) -> RuntimeInfo {
        let mut info = RuntimeInfo::unknown("docker");
        let field = |template: &str| -> Option<String> {
            self.run_docker_lenient(&["version", "--format", template])
                .filter(|s| !s.is_empty())
        };
        if let Some(version) = field("{{.Server.Version}}") {
            info.version = version;
        }
        if let Some(api) = field("{{.Server.APIVersion}}") {
            info.api_version = api;
        }
        let daemon_field = |template: &str| -> Option<String> {
            self.run_docker_lenient(&["info", "--format", template])
                .filter(|s| !s.is_empty())
        };
        if let Some(driver) = daemon_field("{{.Driver}}") {
            info.storage_driver = driver;
        }
        if let Some(os) = daemon_field("{{.OperatingSystem}}") {
            info.operating_system = os;
        }
        info
    }
}
