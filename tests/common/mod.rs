//! Shared integration-test plumbing: CLI harness and a docker-free
//! container runtime.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

use mount_visibility_tester::core::errors::{MvtError, Result};
use mount_visibility_tester::runtime::{ContainerRuntime, ExecOutput, RuntimeInfo};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_mvt") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "mvt.exe" } else { "mvt" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve mvt binary path for integration test"),
    }
}

pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    run_cli_case_with(case_name, args, &[], None)
}

/// Run the mvt binary with extra env vars and an optional working dir,
/// capturing output to a per-case log file for post-mortem inspection.
pub fn run_cli_case_with(
    case_name: &str,
    args: &[&str],
    envs: &[(&str, &str)],
    cwd: Option<&Path>,
) -> CmdResult {
    let root = std::env::temp_dir().join("mvt-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let mut command = Command::new(&bin_path);
    command.args(args).env("RUST_BACKTRACE", "1");
    for (key, value) in envs {
        command.env(key, value);
    }
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    let output = command.output().expect("execute mvt command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let log_content = format!(
        "case: {case_name}\nargs: {args:?}\nstatus: {:?}\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}\n",
        output.status
    );
    let _ = fs::write(&log_path, log_content);

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

// ──────────────────── docker-free runtime ────────────────────

#[derive(Debug, Clone)]
struct FakeContainer {
    host_dir: PathBuf,
    mount_path: String,
}

/// In-memory [`ContainerRuntime`]: each container is a direct view of its
/// bind-mounted host dir, so probe-then-poll pipelines observe real files
/// with near-zero latency and no docker daemon.
#[derive(Debug, Default)]
pub struct FakeRuntime {
    containers: RefCell<HashMap<String, FakeContainer>>,
    removed: RefCell<Vec<String>>,
    next_id: Cell<u32>,
    /// When true, `ping` and `create_container` fail.
    pub unreachable: Cell<bool>,
    /// When true, targets are never reported visible.
    pub never_visible: Cell<bool>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_containers(&self) -> usize {
        self.containers.borrow().len()
    }

    pub fn removed_handles(&self) -> Vec<String> {
        self.removed.borrow().clone()
    }

    fn translate(&self, handle: &str, container_path: &str) -> Option<PathBuf> {
        let containers = self.containers.borrow();
        let container = containers.get(handle)?;
        let rel = container_path
            .strip_prefix(&container.mount_path)?
            .trim_start_matches('/');
        Some(container.host_dir.join(rel))
    }
}

impl ContainerRuntime for FakeRuntime {
    fn ping(&self) -> Result<()> {
        if self.unreachable.get() {
            return Err(MvtError::Provisioning {
                details: "fake runtime marked unreachable".to_string(),
            });
        }
        Ok(())
    }

    fn create_container(
        &self,
        _image: &str,
        host_dir: &Path,
        container_path: &str,
    ) -> Result<String> {
        self.ping()?;
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let handle = format!("fake-{id:04}");
        self.containers.borrow_mut().insert(
            handle.clone(),
            FakeContainer {
                host_dir: host_dir.to_path_buf(),
                mount_path: container_path.to_string(),
            },
        );
        Ok(handle)
    }

    fn exec(&self, handle: &str, argv: &[&str]) -> Result<ExecOutput> {
        let miss = ExecOutput {
            exit_code: 1,
            stdout: String::new(),
        };

        match argv {
            ["test", flag @ ("-f" | "-d"), path] => {
                if self.never_visible.get() {
                    return Ok(miss);
                }
                let Some(host_path) = self.translate(handle, path) else {
                    return Ok(miss);
                };
                let exists = if *flag == "-f" {
                    host_path.is_file()
                } else {
                    host_path.is_dir()
                };
                Ok(ExecOutput {
                    exit_code: i32::from(!exists),
                    stdout: String::new(),
                })
            }
            ["cat", path] => {
                let Some(host_path) = self.translate(handle, path) else {
                    return Ok(miss);
                };
                match fs::read_to_string(&host_path) {
                    Ok(content) => Ok(ExecOutput {
                        exit_code: 0,
                        stdout: content,
                    }),
                    Err(_) => Ok(miss),
                }
            }
            other => Err(MvtError::Observation {
                details: format!("fake runtime: unsupported command {other:?}"),
            }),
        }
    }

    fn stop_and_remove(&self, handle: &str) -> Result<()> {
        self.containers.borrow_mut().remove(handle);
        self.removed.borrow_mut().push(handle.to_string());
        Ok(())
    }

    fn info(&self) -> RuntimeInfo {
        RuntimeInfo::unknown("fake")
    }
}
