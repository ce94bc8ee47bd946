// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Local result archive.
//!
//! Layout under the archive root:
//!
//! - `raw/<run_id>.json` - the record exactly as submitted
//! - `summary.md` - markdown report of the latest run

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Raw records directory, relative to the archive root.
pub const RAW_DIR: &str = "raw";

/// Summary file, relative to the archive root.
pub const SUMMARY_FILE: &str = "summary.md";

/// Paths written by [`write_archive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePaths {
    /// The raw JSON record.
    pub raw: PathBuf,
    /// The markdown summary.
    pub summary: PathBuf,
}

/// Ensure the archive directories exist.
pub fn ensure_output_dirs(root: &Path) -> io::Result<()> {
    fs::create_dir_all(root.join(RAW_DIR))
}

/// Write one record to `raw/<run_id>.json`.
pub fn write_raw_record<T: Serialize>(root: &Path, run_id: &str, record: &T) -> io::Result<PathBuf> {
    ensure_output_dirs(root)?;
    let path = root.join(RAW_DIR).join(format!("{}.json", run_id));
    let json = serde_json::to_string_pretty(record).map_err(io::Error::other)?;
    fs::write(&path, json)?;
    Ok(path)
}

/// Write the markdown summary, replacing any previous one.
pub fn write_summary(root: &Path, summary: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(root)?;
    let path = root.join(SUMMARY_FILE);
    fs::write(&path, summary)?;
    Ok(path)
}

/// Write the raw record and the summary.
pub fn write_archive<T: Serialize>(
    root: &Path,
    run_id: &str,
    record: &T,
    summary: &str,
) -> io::Result<ArchivePaths> {
    let raw = write_raw_record(root, run_id, record)?;
    let summary = write_summary(root, summary)?;
    Ok(ArchivePaths { raw, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_archive_layout() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("out");
        let record = serde_json::json!({"instance_id": "i-123", "loss": null});

        let paths = write_archive(&root, "run-1", &record, "# Benchmark Summary\n").unwrap();

        assert_eq!(paths.raw, root.join("raw").join("run-1.json"));
        assert_eq!(paths.summary, root.join("summary.md"));

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&paths.raw).unwrap()).unwrap();
        assert_eq!(written, record);
        assert_eq!(
            fs::read_to_string(&paths.summary).unwrap(),
            "# Benchmark Summary\n"
        );
    }

    #[test]
    fn test_summary_is_replaced() {
        let dir = TempDir::new().unwrap();
        write_summary(dir.path(), "first").unwrap();
        write_summary(dir.path(), "second").unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap(),
            "second"
        );
    }

    #[test]
    fn test_unwritable_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, "x").unwrap();

        assert!(write_raw_record(&file, "run", &serde_json::json!({})).is_err());
    }
}
