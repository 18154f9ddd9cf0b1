//! Sweep policy for `reconcile`.
//!
//! After a host restart the directory may hold inputs whose tickets died with
//! the scheduler, progress files of workers that were killed, and scratch
//! files of unknown origin. The sweep keeps anything that may still belong to
//! live work and removes the rest.

use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::job::{ArtifactKind, ArtifactSet, JobState};
use crate::store::{RemovalFailure, RemovalReport, StoreEntry};

/// A job found orphaned by a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanedJob {
    pub stem: String,
    /// `Deleted` when nothing of the job is left, `Completed` when its full
    /// result set survived, `Orphaned` when partial results remain.
    pub state_after: JobState,
}

/// Outcome of one sweep, by file name.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub removed: Vec<String>,
    pub kept: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub orphaned: Vec<OrphanedJob>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<RemovalFailure>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn absorb(&mut self, removal: RemovalReport) {
        self.removed.extend(removal.removed);
        self.failures.extend(removal.failures);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SweepPolicy {
    pub now: SystemTime,
    /// A progress file untouched for longer than this belongs to a dead worker.
    pub stale_after: Duration,
    /// Keep bare inputs; set while the scheduler still holds tickets or
    /// cannot be asked.
    pub keep_inputs: bool,
}

impl SweepPolicy {
    /// State of a set as seen by the sweep. A stale progress file, or a bare
    /// input the scheduler no longer holds, makes the job `Orphaned`.
    pub fn classify(&self, set: &ArtifactSet) -> Option<JobState> {
        match set.classify() {
            Some(JobState::Running)
                if set.has(ArtifactKind::Progress)
                    && set.progress_is_stale(self.now, self.stale_after) =>
            {
                Some(JobState::Orphaned)
            }
            Some(JobState::Queued) if !self.keep_inputs => Some(JobState::Orphaned),
            other => other,
        }
    }

    /// Splits one artifact set into entries to keep and entries to remove.
    pub fn partition<'a>(
        &self,
        set: &'a ArtifactSet,
    ) -> (Vec<&'a StoreEntry>, Vec<&'a StoreEntry>) {
        let live = set.has(ArtifactKind::Progress)
            && !set.progress_is_stale(self.now, self.stale_after);
        if live {
            return (set.entries().iter().collect(), Vec::new());
        }

        set.entries()
            .iter()
            .partition(|entry| self.keeps(ArtifactKind::from_extension(entry.extension.as_deref())))
    }

    fn keeps(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::Csv | ArtifactKind::Log | ArtifactKind::JobCopy => true,
            ArtifactKind::Busy | ArtifactKind::Lock | ArtifactKind::Mx => true,
            ArtifactKind::Input => self.keep_inputs,
            ArtifactKind::Progress | ArtifactKind::Unrecognized => false,
        }
    }
}

/// State of an orphaned job once the sweep has removed `removed`.
pub fn state_after_sweep(set: &ArtifactSet, removed: &[String]) -> JobState {
    let mut left = ArtifactSet::new(set.stem());
    for entry in set.entries() {
        if !removed.contains(&entry.file_name()) {
            left.push(entry.clone());
        }
    }

    match left.classify() {
        None => JobState::Deleted,
        Some(JobState::Completed) => JobState::Completed,
        Some(_) => JobState::Orphaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::group_by_stem;
    use std::path::PathBuf;

    fn entry(name: &str, modified: SystemTime) -> StoreEntry {
        let (stem, extension) = crate::store::directory::split_file_name(name);
        StoreEntry {
            stem,
            extension,
            path: PathBuf::from("/jobs/alice").join(name),
            modified: Some(modified),
        }
    }

    fn names(entries: &[&StoreEntry]) -> Vec<String> {
        let mut names: Vec<String> = entries.iter().map(|e| e.file_name()).collect();
        names.sort();
        names
    }

    fn policy(keep_inputs: bool) -> SweepPolicy {
        SweepPolicy {
            now: SystemTime::now(),
            stale_after: Duration::from_secs(900),
            keep_inputs,
        }
    }

    #[test]
    fn test_unrecognized_removed_marker_kept() {
        let now = SystemTime::now();
        let sets = group_by_stem(vec![entry("orphan.tmp", now), entry("job3.lock", now)]);
        let policy = policy(false);

        let (keep, remove) = policy.partition(&sets["orphan"]);
        assert!(keep.is_empty());
        assert_eq!(names(&remove), vec!["orphan.tmp"]);

        let (keep, remove) = policy.partition(&sets["job3"]);
        assert_eq!(names(&keep), vec!["job3.lock"]);
        assert!(remove.is_empty());
    }

    #[test]
    fn test_stale_progress_removed_results_kept() {
        let old = SystemTime::now() - Duration::from_secs(3600);
        let sets = group_by_stem(vec![
            entry("job4.count", old),
            entry("job4.csv", old),
            entry("job4.tmp", old),
        ]);

        let (keep, remove) = policy(false).partition(&sets["job4"]);
        assert_eq!(names(&keep), vec!["job4.csv"]);
        assert_eq!(names(&remove), vec!["job4.count", "job4.tmp"]);
    }

    #[test]
    fn test_live_worker_keeps_everything() {
        let now = SystemTime::now();
        let sets = group_by_stem(vec![
            entry("job5.count", now),
            entry("job5.tmp", now),
            entry("job5", now),
        ]);

        let (keep, remove) = policy(false).partition(&sets["job5"]);
        assert_eq!(keep.len(), 3);
        assert!(remove.is_empty());
    }

    #[test]
    fn test_inputs_follow_scheduler_state() {
        let now = SystemTime::now();
        let sets = group_by_stem(vec![entry("job_6", now)]);

        let (keep, _) = policy(true).partition(&sets["job_6"]);
        assert_eq!(names(&keep), vec!["job_6"]);

        let (_, remove) = policy(false).partition(&sets["job_6"]);
        assert_eq!(names(&remove), vec!["job_6"]);
    }

    #[test]
    fn test_orphan_classification() {
        let old = SystemTime::now() - Duration::from_secs(3600);
        let now = SystemTime::now();
        let sets = group_by_stem(vec![
            entry("job8.count", old),
            entry("job9.count", now),
            entry("job_6", now),
            entry("job7.csv", now),
            entry("job7.log", now),
            entry("job7.job", now),
        ]);

        assert_eq!(policy(false).classify(&sets["job8"]), Some(JobState::Orphaned));
        assert_eq!(policy(false).classify(&sets["job9"]), Some(JobState::Running));
        assert_eq!(policy(false).classify(&sets["job_6"]), Some(JobState::Orphaned));
        assert_eq!(policy(true).classify(&sets["job_6"]), Some(JobState::Queued));
        assert_eq!(policy(false).classify(&sets["job7"]), Some(JobState::Completed));
    }

    #[test]
    fn test_state_after_sweep() {
        let old = SystemTime::now() - Duration::from_secs(3600);
        let sets = group_by_stem(vec![
            entry("job8.count", old),
            entry("job4.count", old),
            entry("job4.csv", old),
            entry("job4.log", old),
            entry("job4.job", old),
            entry("job3.count", old),
            entry("job3.csv", old),
        ]);

        let removed = |name: &str| vec![name.to_string()];
        assert_eq!(
            state_after_sweep(&sets["job8"], &removed("job8.count")),
            JobState::Deleted
        );
        assert_eq!(
            state_after_sweep(&sets["job4"], &removed("job4.count")),
            JobState::Completed
        );
        assert_eq!(
            state_after_sweep(&sets["job3"], &removed("job3.count")),
            JobState::Orphaned
        );
    }
}
