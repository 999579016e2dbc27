//! JSON output for `--json` mode.
//!
//! One-shot commands print a single pretty-printed document; the watch
//! commands print one [`crate::messages::Message`] per line instead.

use std::path::PathBuf;

use humansize::{DECIMAL, format_size};
use serde::Serialize;

use crate::cleaner::{CleanAllReport, CleanReport};
use crate::packager::Package;

/// Result of `clean` and `clean-all`.
#[derive(Serialize, Debug)]
pub struct CleanOutput {
    /// Removed files and directories
    pub removed: Vec<PathBuf>,

    /// Bytes freed
    pub freed_bytes: u64,

    /// Bytes freed, human-readable
    pub freed_formatted: String,

    /// Failures, empty on success
    pub errors: Vec<String>,
}

impl From<CleanReport> for CleanOutput {
    fn from(report: CleanReport) -> Self {
        Self {
            freed_formatted: format_size(report.freed, DECIMAL),
            freed_bytes: report.freed,
            removed: report.removed,
            errors: Vec::new(),
        }
    }
}

impl From<CleanAllReport> for CleanOutput {
    fn from(all: CleanAllReport) -> Self {
        Self {
            errors: all.errors,
            ..Self::from(all.report)
        }
    }
}

/// Result of `build`.
#[derive(Serialize, Debug)]
pub struct BuildOutput {
    /// Archive path, `null` when no release file existed
    pub archive: Option<PathBuf>,

    /// Files added to the archive
    pub files: Vec<String>,
}

impl From<Package> for BuildOutput {
    fn from(package: Package) -> Self {
        Self {
            archive: package.archive,
            files: package.files,
        }
    }
}

/// Result of `deploy`.
#[derive(Serialize, Debug)]
pub struct DeployOutput {
    /// Destination paths of the copied release files
    pub copied: Vec<PathBuf>,
}
