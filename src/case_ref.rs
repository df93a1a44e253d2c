//! Alarm-to-case lookup on the local filesystem.
//!
//! The SmartResponse that opens a LogRhythm case for an alarm records the new
//! case id in `<output_root>/<alarm_id>/case.txt`. This module only reads
//! that layout; creating and cleaning it up belongs to that other process.

use std::path::{Path, PathBuf};

use crate::error::{Result, SrpError};

/// Name of the file holding the case id inside an alarm directory.
pub const CASE_FILE: &str = "case.txt";

/// Reads case references under a fixed output root.
#[derive(Debug, Clone)]
pub struct CaseLookup {
    root: PathBuf,
}

impl CaseLookup {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CaseLookup { root: root.into() }
    }

    /// Directory expected to hold the case reference for `alarm_id`.
    pub fn alarm_dir(&self, alarm_id: &str) -> PathBuf {
        self.root.join(alarm_id)
    }

    /// Returns the case id recorded for `alarm_id`, or `None` when no alarm
    /// directory exists.
    ///
    /// The file contents are returned exactly as stored. An alarm directory
    /// without a readable `case.txt` is an error, not a miss.
    pub fn find_case(&self, alarm_id: &str) -> Result<Option<String>> {
        let dir = self.alarm_dir(alarm_id);
        if !dir.is_dir() {
            tracing::debug!(path = %dir.display(), "no alarm directory");
            return Ok(None);
        }
        read_case_file(&dir.join(CASE_FILE)).map(Some)
    }
}

fn read_case_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| SrpError::Io {
        path: path.to_path_buf(),
        source,
    })
}
