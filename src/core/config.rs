//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{MvtError, Result};

/// Full MVT configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub sampling: SamplingConfig,
    pub runtime: RuntimeConfig,
    pub logging: LoggingConfig,
}

/// Experiment loop knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SamplingConfig {
    /// Number of samples to collect.
    pub num_samples: u64,
    /// Per-sample visibility timeout in seconds. Resets each iteration.
    pub timeout_seconds: f64,
    /// Fixed interval between container-side visibility checks.
    ///
    /// Must stay small relative to expected latency; the per-check exec
    /// round-trip is the dominant source of instrumentation-induced
    /// inflation in reported numbers.
    pub poll_interval_ms: u64,
    /// Number of isolated (host dir, container) test environments.
    pub num_environments: usize,
    /// Fixed RNG seed for reproducible type/environment selection.
    pub seed: Option<u64>,
}

/// Container runtime knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Image used for test containers. Anything with a POSIX shell works.
    pub image: String,
    /// Path inside the container where each host dir is bind-mounted.
    pub container_mount_path: String,
    /// Docker CLI binary to drive.
    pub docker_binary: PathBuf,
}

/// Run log destination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Append-only JSONL run log path.
    pub jsonl_log: PathBuf,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            num_samples: 100,
            timeout_seconds: 30.0,
            poll_interval_ms: 1,
            num_environments: 3,
            seed: None,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            image: "alpine:latest".to_string(),
            container_mount_path: "/probe_mount".to_string(),
            docker_binary: PathBuf::from("docker"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!("[MVT-CONFIG] WARNING: HOME not set, falling back to /tmp for log path");
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        Self {
            jsonl_log: home_dir
                .join(".local")
                .join("share")
                .join("mvt")
                .join("runs.jsonl"),
        }
    }
}

impl SamplingConfig {
    /// Per-sample timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }

    /// Polling interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    /// Default configuration path (`~/.config/mvt/config.toml`).
    #[must_use]
    pub fn default_path() -> PathBuf {
        let home_dir = env::var_os("HOME").map_or_else(|| PathBuf::from("/tmp"), PathBuf::from);
        home_dir.join(".config").join("mvt").join("config.toml")
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from the default
    /// path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw =
                fs::read_to_string(&path_buf).map_err(|source| MvtError::io(&path_buf, source))?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(MvtError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        set_env_u64("MVT_SAMPLING_NUM_SAMPLES", &mut self.sampling.num_samples)?;
        set_env_f64(
            "MVT_SAMPLING_TIMEOUT_SECONDS",
            &mut self.sampling.timeout_seconds,
        )?;
        set_env_u64(
            "MVT_SAMPLING_POLL_INTERVAL_MS",
            &mut self.sampling.poll_interval_ms,
        )?;
        set_env_usize(
            "MVT_SAMPLING_NUM_ENVIRONMENTS",
            &mut self.sampling.num_environments,
        )?;
        if let Ok(raw) = env::var("MVT_SAMPLING_SEED") {
            self.sampling.seed = Some(parse_env_u64("MVT_SAMPLING_SEED", &raw)?);
        }

        if let Ok(raw) = env::var("MVT_RUNTIME_IMAGE") {
            self.runtime.image = raw;
        }
        if let Ok(raw) = env::var("MVT_RUNTIME_MOUNT_PATH") {
            self.runtime.container_mount_path = raw;
        }
        if let Ok(raw) = env::var("MVT_RUNTIME_DOCKER_BINARY") {
            self.runtime.docker_binary = PathBuf::from(raw);
        }

        if let Ok(raw) = env::var("MVT_LOG_JSONL_PATH") {
            self.logging.jsonl_log = PathBuf::from(raw);
        }

        Ok(())
    }

    /// Reject configurations that would produce a meaningless experiment.
    pub fn validate(&self) -> Result<()> {
        if self.sampling.num_samples == 0 {
            return Err(invalid("sampling.num_samples must be at least 1"));
        }
        if !self.sampling.timeout_seconds.is_finite() || self.sampling.timeout_seconds <= 0.0 {
            return Err(invalid("sampling.timeout_seconds must be positive"));
        }
        if self.sampling.poll_interval_ms == 0 {
            return Err(invalid("sampling.poll_interval_ms must be at least 1"));
        }
        if self.sampling.num_environments == 0 {
            return Err(invalid("sampling.num_environments must be at least 1"));
        }
        if self.runtime.image.trim().is_empty() {
            return Err(invalid("runtime.image must not be empty"));
        }
        if !self.runtime.container_mount_path.starts_with('/') {
            return Err(invalid(
                "runtime.container_mount_path must be an absolute path",
            ));
        }
        Ok(())
    }
}

fn invalid(details: &str) -> MvtError {
    MvtError::InvalidConfig {
        details: details.to_string(),
    }
}

// ──────────────────── env override helpers ────────────────────

fn set_env_u64(key: &str, target: &mut u64) -> Result<()> {
    if let Ok(raw) = env::var(key) {
        *target = parse_env_u64(key, &raw)?;
    }
    Ok(())
}

fn set_env_usize(key: &str, target: &mut usize) -> Result<()> {
    if let Ok(raw) = env::var(key) {
        *target = raw.parse().map_err(|_| MvtError::InvalidConfig {
            details: format!("{key}: expected unsigned integer, got {raw:?}"),
        })?;
    }
    Ok(())
}

fn set_env_f64(key: &str, target: &mut f64) -> Result<()> {
    if let Ok(raw) = env::var(key) {
        *target = raw.parse().map_err(|_| MvtError::InvalidConfig {
            details: format!("{key}: expected number, got {raw:?}"),
        })?;
    }
    Ok(())
}

fn parse_env_u64(key: &str, raw: &str) -> Result<u64> {
    raw.parse().map_err(|_| MvtError::InvalidConfig {
        details: format!("{key}: expected unsigned integer, got {raw:?}"),
    })
}

// ──────────────────── tests ────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.sampling.num_samples, 100);
        assert!((cfg.sampling.timeout_seconds - 30.0).abs() < f64::EPSILON);
        assert_eq!(cfg.sampling.poll_interval_ms, 1);
        assert_eq!(cfg.sampling.num_environments, 3);
        assert_eq!(cfg.runtime.image, "alpine:latest");
        assert_eq!(cfg.runtime.container_mount_path, "/probe_mount");
    }

    #[test]
    fn duration_accessors() {
        let cfg = SamplingConfig {
            timeout_seconds: 2.5,
            poll_interval_ms: 5,
            ..SamplingConfig::default()
        };
        assert_eq!(cfg.timeout(), Duration::from_millis(2_500));
        assert_eq!(cfg.poll_interval(), Duration::from_millis(5));
    }

    #[test]
    fn toml_round_trip_preserves_values() {
        let mut cfg = Config::default();
        cfg.sampling.num_samples = 42;
        cfg.sampling.seed = Some(7);
        cfg.runtime.image = "busybox:latest".to_string();

        let raw = toml::to_string(&cfg).unwrap();
        let parsed: Config = toml::from_str(&raw).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [sampling]
            num_samples = 25
            timeout_seconds = 15.0
            "#,
        )
        .unwrap();
        assert_eq!(parsed.sampling.num_samples, 25);
        assert!((parsed.sampling.timeout_seconds - 15.0).abs() < f64::EPSILON);
        // Untouched sections keep defaults.
        assert_eq!(parsed.sampling.num_environments, 3);
        assert_eq!(parsed.runtime.image, "alpine:latest");
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent_mvt_cfg_9f3/config.toml")))
            .expect_err("explicit missing config must fail");
        assert_eq!(err.code(), "MVT-1002");
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [sampling]
            num_samples = 10
            num_environments = 2

            [runtime]
            image = "busybox:stable"
            "#,
        )
        .unwrap();

        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.sampling.num_samples, 10);
        assert_eq!(cfg.sampling.num_environments, 2);
        assert_eq!(cfg.runtime.image, "busybox:stable");
    }

    #[test]
    fn validation_rejects_zero_samples() {
        let cfg = Config {
            sampling: SamplingConfig {
                num_samples: 0,
                ..SamplingConfig::default()
            },
            ..Config::default()
        };
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.code(), "MVT-1001");
    }

    #[test]
    fn validation_rejects_nonpositive_timeout() {
        for bad in [0.0, -1.0, f64::NAN] {
            let cfg = Config {
                sampling: SamplingConfig {
                    timeout_seconds: bad,
                    ..SamplingConfig::default()
                },
                ..Config::default()
            };
            assert!(cfg.validate().is_err(), "timeout {bad} should be rejected");
        }
    }

    #[test]
    fn validation_rejects_relative_mount_path() {
        let cfg = Config {
            runtime: RuntimeConfig {
                container_mount_path: "probe_mount".to_string(),
                ..RuntimeConfig::default()
            },
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validation_rejects_zero_environments() {
        let cfg = Config {
            sampling: SamplingConfig {
                num_environments: 0,
                ..SamplingConfig::default()
            },
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }
}
