//! Report export.
//!
//! The report is written byte-for-byte as the model returned it. Writes are
//! atomic (temp file + rename) so a reader never sees a partial file.

use crate::error::FacilitatorError;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name used when exporting into a directory.
pub const REPORT_FILE_NAME: &str = "medical-facilitator-report.md";

/// Media type of the exported report.
pub const REPORT_CONTENT_TYPE: &str = "text/markdown;charset=utf-8";

/// Where a report exported to `target` ends up: `target` itself, or
/// `target/medical-facilitator-report.md` when `target` is a directory.
pub async fn resolve_export_path(target: impl AsRef<Path>) -> PathBuf {
    let target = target.as_ref();
    let is_dir = tokio::fs::metadata(target)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if is_dir || target.as_os_str().is_empty() {
        target.join(REPORT_FILE_NAME)
    } else {
        target.to_path_buf()
    }
}

/// Write `report` to `target` and return the final path.
pub async fn write_report(
    target: impl AsRef<Path>,
    report: &str,
) -> Result<PathBuf, FacilitatorError> {
    let path = resolve_export_path(target).await;
    let write_err = |source| FacilitatorError::ExportFailed {
        path: path.clone(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, report.as_bytes())
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, &path).await.map_err(write_err)?;

    info!("Report saved to {} ({} bytes)", path.display(), report.len());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn directory_target_gets_default_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_report(dir.path(), "## Final Integrated Report\n")
            .await
            .unwrap();
        assert_eq!(path, dir.path().join(REPORT_FILE_NAME));
        assert!(!dir.path().join("medical-facilitator-report.md.tmp").exists());
    }

    #[tokio::test]
    async fn bytes_are_identical() {
        let dir = tempfile::tempdir().unwrap();
        let report = "## Final Integrated Report\r\n\n  trailing spaces  \n\u{00e9}";
        let path = write_report(dir.path().join("nested/out.md"), report)
            .await
            .unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), report.as_bytes());
    }

    #[tokio::test]
    async fn overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("r.md");
        write_report(&target, "old").await.unwrap();
        write_report(&target, "new").await.unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
    }
}
