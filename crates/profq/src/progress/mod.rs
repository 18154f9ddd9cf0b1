//! The progress file a running worker keeps per job.
//!
//! The file holds two integers, items processed and total items, separated by
//! whitespace. It is overwritten on every update and deleted on normal
//! completion. Readers race with the writer, so anything that does not parse
//! is reported as "unknown" rather than as an error.

pub mod reporter;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use reporter::{FileProgress, NoopProgress, ProgressEvent, ProgressReporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub processed: u64,
    pub total: u64,
}

impl Progress {
    pub fn new(processed: u64, total: u64) -> Self {
        Self { processed, total }
    }

    /// Whole percent done, `None` when the total is zero.
    pub fn percent(&self) -> Option<u8> {
        if self.total == 0 {
            return None;
        }
        let pct = self.processed.min(self.total) * 100 / self.total;
        Some(pct as u8)
    }

    /// The exact text a worker writes for this progress.
    pub fn to_line(&self) -> String {
        format!("{} {}\n", self.processed, self.total)
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.processed, self.total)
    }
}

/// Parses `"<processed> <total>"`. Extra trailing fields are ignored; a
/// missing or non-numeric field yields `None`.
pub fn parse_progress(text: &str) -> Option<Progress> {
    let mut fields = text.split_whitespace();
    let processed = fields.next()?.parse().ok()?;
    let total = fields.next()?.parse().ok()?;
    Some(Progress { processed, total })
}

/// Reads and parses a progress file; absent or unreadable files yield `None`.
pub fn read_progress(path: &Path) -> Option<Progress> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let progress = parse_progress(&text);
            if progress.is_none() {
                log::debug!(
                    "Ignoring malformed progress in {}",
                    crate::sanitize::redact_path(path)
                );
            }
            progress
        }
        Err(_) => None,
    }
}
