use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::artifact::{ArtifactKind, RESULT_KINDS};
use crate::scheduler::Ticket;
use crate::store::{Principal, StoreEntry};

/// Lifecycle state of a job. Never stored; derived from which artifacts exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    /// Left behind by a worker that died; only `reconcile` tells it apart
    /// from `Running`.
    Orphaned,
    Deleted,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Queued => write!(f, "Queued"),
            JobState::Running => write!(f, "Running"),
            JobState::Completed => write!(f, "Completed"),
            JobState::Orphaned => write!(f, "Orphaned"),
            JobState::Deleted => write!(f, "Deleted"),
        }
    }
}

/// What the worker is asked to do with the input list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum JobKind {
    /// Full SMTP profile of every domain or address.
    Profile,
    /// Blocklist "ping" with per-domain retries and a pause between domains.
    Ping { retry_count: u32, pause_millis: u64 },
}

impl JobKind {
    /// Prefix of generated input names.
    pub fn name_prefix(&self) -> &'static str {
        match self {
            JobKind::Profile => "job_",
            JobKind::Ping { .. } => "ping_",
        }
    }
}

/// A job as created by a submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// The shared stem of every artifact of this job.
    pub id: String,
    pub principal: Principal,
    pub input_path: PathBuf,
    pub kind: JobKind,
    pub state: JobState,
    /// Valid only while the job waits in the scheduler.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduler_ticket: Option<Ticket>,
    pub submitted_at: DateTime<Utc>,
}

/// All artifacts sharing one stem.
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    stem: String,
    entries: Vec<StoreEntry>,
}

impl ArtifactSet {
    pub fn new(stem: impl Into<String>) -> Self {
        Self {
            stem: stem.into(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: StoreEntry) {
        self.entries.push(entry);
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn entries(&self) -> &[StoreEntry] {
        &self.entries
    }

    pub fn entry(&self, kind: ArtifactKind) -> Option<&StoreEntry> {
        self.entries
            .iter()
            .find(|e| ArtifactKind::from_extension(e.extension.as_deref()) == kind)
    }

    pub fn has(&self, kind: ArtifactKind) -> bool {
        self.entry(kind).is_some()
    }

    pub fn has_all_results(&self) -> bool {
        RESULT_KINDS.iter().all(|kind| self.has(*kind))
    }

    pub fn has_any_result(&self) -> bool {
        RESULT_KINDS.iter().any(|kind| self.has(*kind))
    }

    pub fn has_reserved_marker(&self) -> bool {
        self.entries.iter().any(|e| {
            ArtifactKind::from_extension(e.extension.as_deref()).is_reserved_marker()
        })
    }

    /// The single classification rule.
    ///
    /// A progress file means running, even if results are already appearing.
    /// Results only count as complete once every result artifact is present;
    /// a partial set is a worker mid-write and still running. A lone input is
    /// waiting in the scheduler. Anything else is not a job.
    pub fn classify(&self) -> Option<JobState> {
        if self.has(ArtifactKind::Progress) {
            Some(JobState::Running)
        } else if self.has_all_results() {
            Some(JobState::Completed)
        } else if self.has_any_result() {
            Some(JobState::Running)
        } else if self.has(ArtifactKind::Input) {
            Some(JobState::Queued)
        } else {
            None
        }
    }

    /// True when the progress file exists but has not been touched within
    /// `stale_after`. A missing timestamp counts as stale.
    pub fn progress_is_stale(&self, now: SystemTime, stale_after: Duration) -> bool {
        match self.entry(ArtifactKind::Progress) {
            Some(entry) => match entry.modified {
                Some(modified) => now
                    .duration_since(modified)
                    .map(|age| age > stale_after)
                    .unwrap_or(false),
                None => true,
            },
            None => false,
        }
    }
}

/// Groups store entries by stem.
pub fn group_by_stem(entries: Vec<StoreEntry>) -> BTreeMap<String, ArtifactSet> {
    let mut sets: BTreeMap<String, ArtifactSet> = BTreeMap::new();
    for entry in entries {
        sets.entry(entry.stem.clone())
            .or_insert_with(|| ArtifactSet::new(entry.stem.clone()))
            .push(entry);
    }
    sets
}
