//! JSON run reports.
//!
//! Reports are grouped by UTC date, one file per invocation:
//! ```text
//! report_dir/
//! └── 2026-02-22/
//!     ├── run_060005.json
//!     ├── run_140012.json
//!     └── run_220003.json
//! ```

use crate::coordinator::RunReport;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Path of the report file for a run that started at `report.started_at`.
pub fn report_path(report: &RunReport, report_dir: &str) -> PathBuf {
    Path::new(report_dir)
        .join(report.started_at.format("%Y-%m-%d").to_string())
        .join(format!("run_{}.json", report.started_at.format("%H%M%S")))
}

/// Write a [`RunReport`] as pretty-printed JSON.
///
/// # Arguments
///
/// * `report` - The finished invocation
/// * `report_dir` - Base directory; a per-date subdirectory is created
///
/// # Returns
///
/// The path written, or an error if directory creation or file writing fails.
#[instrument(level = "info", skip_all, fields(report_dir = %report_dir))]
pub async fn write_run_report(
    report: &RunReport,
    report_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;
    let path = report_path(report, report_dir);

    if let Some(dir) = path.parent() {
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create report dir");
            return Err(e.into());
        }
    }

    fs::write(&path, json).await?;
    info!(path = %path.display(), sources = report.sources.len(), "Wrote run report");
    Ok(path)
}
