//! Report persistence: pretty-printed JSON, load for re-analysis.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::core::errors::{MvtError, Result};
use crate::report::model::Report;

/// Save a report as pretty-printed JSON, creating parent directories.
pub fn save_report(report: &Report, path: &Path) -> Result<()> {
    let raw = serde_json::to_string_pretty(report)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| MvtError::ReportIo {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    fs::write(path, raw).map_err(|source| MvtError::ReportIo {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a previously saved report.
pub fn load_report(path: &Path) -> Result<Report> {
    let raw = fs::read_to_string(path).map_err(|source| MvtError::ReportIo {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}

/// Default report filename for a run started at `at`:
/// `mount_visibility_YYYYMMDD_HHMMSS.json`.
#[must_use]
pub fn default_report_filename(at: DateTime<Utc>) -> String {
    format!("mount_visibility_{}.json", at.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::report::model::{Metadata, SystemInfo, TestConfigSection};
    use crate::report::stats::summarize;
    use crate::runtime::RuntimeInfo;
    use chrono::TimeZone;

    fn fixture_report() -> Report {
        Report::new(
            Metadata::new(
                Utc.with_ymd_and_hms(2026, 8, 5, 10, 0, 0).unwrap(),
                SystemInfo::collect(),
                RuntimeInfo::unknown("docker"),
            ),
            TestConfigSection::from_config(&Config::default()),
            Vec::new(),
        )
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = fixture_report();

        save_report(&report, &path).unwrap();
        let loaded = load_report(&path).unwrap();

        assert_eq!(loaded, report);
        assert_eq!(loaded.summary, summarize(&loaded.samples));
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("report.json");
        save_report(&fixture_report(), &path).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn load_missing_file_is_report_io_error() {
        let err = load_report(Path::new("/nonexistent_mvt_report_4c1.json")).unwrap_err();
        assert_eq!(err.code(), "MVT-3001");
        assert!(err.is_fatal());
    }

    #[test]
    fn load_malformed_json_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();
        let err = load_report(&path).unwrap_err();
        assert_eq!(err.code(), "MVT-3002");
    }

    #[test]
    fn default_filename_embeds_run_start() {
        let at = Utc.with_ymd_and_hms(2026, 8, 5, 9, 30, 15).unwrap();
        assert_eq!(
            default_report_filename(at),
            "mount_visibility_20260805_093015.json"
        );
    }
}
