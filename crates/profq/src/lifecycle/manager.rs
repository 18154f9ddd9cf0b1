use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::Utc;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::Config;
use crate::error::{ProfqError, Result, StorageError, SubmissionError};
use crate::job::{
    group_by_stem, sort_natural_desc, ArtifactKind, ArtifactLink, Job, JobKind, JobListing,
    JobState, JobSummary,
};
use crate::lifecycle::command::WorkerCommand;
use crate::lifecycle::reconcile::{state_after_sweep, OrphanedJob, ReconcileReport, SweepPolicy};
use crate::progress::{read_progress, Progress};
use crate::sanitize;
use crate::scheduler::{AtScheduler, ExecutionScheduler, PendingQueue, Ticket};
use crate::store::{JobDirectoryStore, Principal, RemovalFailure, RemovalReport, StoreEntry};

/// A file handed over by an upload handler.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Where the upload handler left the content.
    pub temp_path: PathBuf,
    /// The name the user gave the file; its stem names the job.
    pub original_name: String,
}

impl UploadedFile {
    pub fn new(temp_path: impl Into<PathBuf>, original_name: impl Into<String>) -> Self {
        Self {
            temp_path: temp_path.into(),
            original_name: original_name.into(),
        }
    }
}

/// Orchestrates submission, listing, cancellation, deletion and cleanup of
/// jobs on top of the job store and a scheduler.
///
/// Holds no per-job state. Everything is re-derived from the principal's
/// directory on each call, so several managers (or processes) can share a
/// job root.
pub struct JobLifecycleManager {
    store: JobDirectoryStore,
    scheduler: Arc<dyn ExecutionScheduler>,
    config: Config,
}

impl JobLifecycleManager {
    pub fn new(config: Config, scheduler: Arc<dyn ExecutionScheduler>) -> Self {
        Self {
            store: JobDirectoryStore::new(&config.job_root_directory),
            scheduler,
            config,
        }
    }

    /// A manager driving the system `at` facility.
    pub fn with_at_scheduler(config: Config) -> Self {
        let scheduler = Arc::new(AtScheduler::new(config.scheduler.clone()));
        Self::new(config, scheduler)
    }

    pub fn store(&self) -> &JobDirectoryStore {
        &self.store
    }

    pub fn scheduler(&self) -> &Arc<dyn ExecutionScheduler> {
        &self.scheduler
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Stores pasted text as a new job and schedules the worker on it.
    pub async fn submit_text(&self, principal: &Principal, content: &str) -> Result<Job> {
        let span = info_span!("submit_text", principal = %principal, bytes = content.len());
        async move {
            if content.trim().is_empty() {
                return Err(SubmissionError::EmptyInput.into());
            }

            let kind = JobKind::Profile;
            let dir = self.store.ensure_root(principal)?;
            let input = self.store.create_unique_file(&dir, kind.name_prefix())?;
            self.fill_input(&input, |store, path| {
                store.write_input(path, with_trailing_newline(content).as_bytes())
            })?;

            self.schedule(principal, &dir, input, kind).await
        }
        .instrument(span)
        .await
    }

    /// Moves an uploaded list into the principal's directory and schedules it.
    ///
    /// The job is named after the upload; a `_N` suffix is added when that
    /// stem is already in use.
    pub async fn submit_file(&self, principal: &Principal, upload: &UploadedFile) -> Result<Job> {
        let span = info_span!(
            "submit_file",
            principal = %principal,
            upload = %sanitize::redact_path(&upload.temp_path)
        );
        async move {
            let metadata = match std::fs::metadata(&upload.temp_path) {
                Ok(metadata) if metadata.is_file() => metadata,
                _ => return Err(SubmissionError::MissingUpload.into()),
            };
            if metadata.len() == 0 {
                return Err(SubmissionError::EmptyInput.into());
            }

            let base = sanitize::upload_stem(&upload.original_name)
                .ok_or(SubmissionError::InvalidUploadName)?;

            let dir = self.store.ensure_root(principal)?;
            let hit_list = &self.config.hit_list;
            let reserved = [hit_list.file_name.as_str(), hit_list.derived_csv.as_str()];
            let input = self.store.create_named_file(&dir, &base, &reserved)?;
            self.fill_input(&input, |store, path| {
                store.copy_input(&upload.temp_path, path)
            })?;

            self.schedule(principal, &dir, input, JobKind::Profile).await
        }
        .instrument(span)
        .await
    }

    /// Stores a domain list for a blocklist ping and schedules it. Retry count
    /// and pause fall back to the configured defaults.
    pub async fn submit_ping(
        &self,
        principal: &Principal,
        domains: &[String],
        retry_count: Option<u32>,
        pause_millis: Option<u64>,
    ) -> Result<Job> {
        let span = info_span!("submit_ping", principal = %principal, domains = domains.len());
        async move {
            let lines: Vec<&str> = domains
                .iter()
                .map(|d| d.trim())
                .filter(|d| !d.is_empty())
                .collect();
            if lines.is_empty() {
                return Err(SubmissionError::EmptyInput.into());
            }

            let kind = JobKind::Ping {
                retry_count: retry_count.unwrap_or(self.config.ping.retry_count),
                pause_millis: pause_millis.unwrap_or(self.config.ping.pause_millis),
            };

            let dir = self.store.ensure_root(principal)?;
            let input = self.store.create_unique_file(&dir, kind.name_prefix())?;
            let content = format!("{}\n", lines.join("\n"));
            self.fill_input(&input, |store, path| store.write_input(path, content.as_bytes()))?;

            self.schedule(principal, &dir, input, kind).await
        }
        .instrument(span)
        .await
    }

    /// Runs `write` on a freshly allocated input; drops the allocation if the
    /// write fails so no empty input is left for the worker.
    fn fill_input<F>(&self, input: &Path, write: F) -> Result<()>
    where
        F: FnOnce(&JobDirectoryStore, &Path) -> std::result::Result<(), StorageError>,
    {
        if let Err(e) = write(&self.store, input) {
            if let Err(cleanup) = self.store.remove(input) {
                warn!("Failed to drop unwritten input: {}", cleanup);
            }
            return Err(e.into());
        }
        Ok(())
    }

    async fn schedule(
        &self,
        principal: &Principal,
        dir: &Path,
        input: PathBuf,
        kind: JobKind,
    ) -> Result<Job> {
        let id = sanitize::redact_path(&input);
        let command = WorkerCommand::build(&self.config.worker, &kind, dir, &input);
        debug!(job = %id, "Worker command built");

        match self.scheduler.submit(command.as_str()).await {
            Ok(ticket) => {
                info!(job = %id, ticket = %ticket, "Job queued");
                Ok(Job {
                    id,
                    principal: principal.clone(),
                    input_path: input,
                    kind,
                    state: JobState::Queued,
                    scheduler_ticket: Some(ticket),
                    submitted_at: Utc::now(),
                })
            }
            Err(source) => {
                // The input stays; the user can resubmit or delete it.
                warn!(job = %id, error = %source, "Scheduler refused job");
                Err(ProfqError::NotScheduled { job_id: id, source })
            }
        }
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Classifies every stem in the principal's directory.
    ///
    /// Each sequence is sorted in descending natural order of the stem. A
    /// principal without a directory simply has no jobs.
    pub fn list_jobs(&self, principal: &Principal) -> Result<JobListing> {
        let _span = info_span!("list_jobs", principal = %principal).entered();

        let dir = self.store.principal_dir(principal);
        if !dir.is_dir() {
            return Ok(JobListing::default());
        }

        let (hit_list, entries): (Vec<StoreEntry>, Vec<StoreEntry>) = self
            .store
            .list(&dir)?
            .into_iter()
            .partition(|e| self.is_hit_list_file(&e.file_name()));

        let mut listing = JobListing::default();
        for set in group_by_stem(entries).values() {
            match set.classify() {
                Some(JobState::Running) => {
                    let progress = set
                        .entry(ArtifactKind::Progress)
                        .and_then(|e| read_progress(&e.path));
                    listing.running.push(JobSummary::from_set(
                        principal,
                        set,
                        JobState::Running,
                        progress,
                    ));
                }
                Some(JobState::Completed) => listing.completed.push(JobSummary::from_set(
                    principal,
                    set,
                    JobState::Completed,
                    None,
                )),
                Some(JobState::Queued) => listing.queued.push(JobSummary::from_set(
                    principal,
                    set,
                    JobState::Queued,
                    None,
                )),
                _ => {}
            }
        }

        sort_natural_desc(&mut listing.queued, |s| s.stem.as_str());
        sort_natural_desc(&mut listing.running, |s| s.stem.as_str());
        sort_natural_desc(&mut listing.completed, |s| s.stem.as_str());
        listing.hit_list = self.hit_list_summary(principal, &hit_list);

        debug!(
            queued = listing.queued.len(),
            running = listing.running.len(),
            completed = listing.completed.len(),
            "Jobs listed"
        );
        Ok(listing)
    }

    fn hit_list_summary(&self, principal: &Principal, files: &[StoreEntry]) -> Option<JobSummary> {
        let hit_list = &self.config.hit_list;
        let has = |name: &str| files.iter().any(|e| e.file_name() == name);
        if !has(&hit_list.file_name) {
            return None;
        }

        let mut artifact_links = vec![ArtifactLink::new(
            principal,
            ArtifactKind::Input,
            hit_list.file_name.clone(),
        )];
        if has(&hit_list.derived_csv) {
            artifact_links.push(ArtifactLink::new(
                principal,
                ArtifactKind::Csv,
                hit_list.derived_csv.clone(),
            ));
        }

        Some(JobSummary {
            stem: hit_list.file_name.clone(),
            state: JobState::Completed,
            progress: None,
            artifact_links,
        })
    }

    fn is_hit_list_file(&self, file_name: &str) -> bool {
        file_name == self.config.hit_list.file_name || file_name == self.config.hit_list.derived_csv
    }

    /// Current progress of a running job. Absent, unreadable or half-written
    /// progress files all read as `None`.
    pub fn progress_of(&self, principal: &Principal, stem: &str) -> Option<Progress> {
        if !sanitize::is_plain_component(stem) {
            return None;
        }
        let path = self
            .store
            .principal_dir(principal)
            .join(ArtifactKind::Progress.file_name(stem));
        read_progress(&path)
    }

    /// Lines of the hit-list file, trimmed, blanks dropped.
    pub fn hit_list_domains(&self, principal: &Principal) -> Result<Vec<String>> {
        let path = self
            .store
            .principal_dir(principal)
            .join(&self.config.hit_list.file_name);

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::ReadFile { path, source: e }.into()),
        };

        Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Removes every artifact of `stem`. Deleting the hit-list file also
    /// removes the CSV derived from it.
    ///
    /// Deleting a stem that no longer exists is not an error. Individual
    /// removal failures are reported, not raised.
    pub fn delete_job(&self, principal: &Principal, stem: &str) -> Result<RemovalReport> {
        let _span = info_span!("delete_job", principal = %principal, stem = %stem).entered();

        if !sanitize::is_plain_component(stem) {
            return Err(StorageError::InvalidName(stem.to_string()).into());
        }

        let dir = self.store.principal_dir(principal);
        if !dir.is_dir() {
            return Ok(RemovalReport::default());
        }

        let hit_list = &self.config.hit_list;
        let report = if stem == hit_list.file_name {
            let entries: Vec<StoreEntry> = self
                .store
                .list(&dir)?
                .into_iter()
                .filter(|e| self.is_hit_list_file(&e.file_name()))
                .collect();
            self.store.remove_entries(&entries)
        } else {
            let entries: Vec<StoreEntry> = self
                .store
                .list(&dir)?
                .into_iter()
                .filter(|e| e.stem == stem && !self.is_hit_list_file(&e.file_name()))
                .collect();
            self.store.remove_entries(&entries)
        };

        info!(
            removed = report.removed.len(),
            failed = report.failures.len(),
            "Job deleted"
        );
        Ok(report)
    }

    /// Deletes several stems; keeps going past failures.
    ///
    /// A stem that cannot be deleted at all, such as one that is not a plain
    /// file name, is recorded as a failure under its own name.
    pub fn delete_jobs(&self, principal: &Principal, stems: &[String]) -> RemovalReport {
        let mut report = RemovalReport::default();
        for stem in stems {
            match self.delete_job(principal, stem) {
                Ok(removed) => report.merge(removed),
                Err(e) => {
                    warn!(stem = %stem, error = %e, "Job not deleted");
                    report.failures.push(RemovalFailure {
                        file_name: stem.clone(),
                        reason: e.user_message(),
                    });
                }
            }
        }
        report
    }

    // ========================================================================
    // Scheduler pass-through
    // ========================================================================

    /// Drops tickets that have not started yet. Facility complaints are
    /// surfaced verbatim and never retried.
    pub async fn cancel_pending(&self, tickets: &[Ticket]) -> Result<()> {
        let span = info_span!("cancel_pending", tickets = tickets.len());
        async move {
            if tickets.is_empty() {
                return Ok(());
            }
            self.scheduler.cancel_many(tickets).await?;
            info!("Pending tickets cancelled");
            Ok(())
        }
        .instrument(span)
        .await
    }

    pub async fn pending_queue(&self) -> Result<PendingQueue> {
        let span = info_span!("pending_queue");
        async move { Ok(self.scheduler.list_pending().await?) }
            .instrument(span)
            .await
    }

    // ========================================================================
    // Cleanup
    // ========================================================================

    /// Sweeps stray state out of the principal's directory.
    ///
    /// Meant to be run by hand after a host restart. Results, reserved
    /// markers, the hit list, and everything belonging to a worker that
    /// updated its progress recently are kept. Bare inputs are kept while the
    /// scheduler still holds tickets or cannot be asked. All else goes.
    pub async fn reconcile(&self, principal: &Principal) -> Result<ReconcileReport> {
        let span = info_span!("reconcile", principal = %principal);
        async move {
            let dir = self.store.principal_dir(principal);
            if !dir.is_dir() {
                return Ok(ReconcileReport::default());
            }
            debug!(dir = %sanitize::hash_path(&dir), "Sweeping job directory");

            let keep_inputs = match self.scheduler.list_pending().await {
                Ok(queue) => !queue.is_empty(),
                Err(e) => {
                    warn!(error = %e, "Scheduler not reachable, keeping queued inputs");
                    true
                }
            };

            let policy = SweepPolicy {
                now: SystemTime::now(),
                stale_after: self.config.reconcile.stale_after(),
                keep_inputs,
            };

            let (hit_list, entries): (Vec<StoreEntry>, Vec<StoreEntry>) = self
                .store
                .list(&dir)?
                .into_iter()
                .partition(|e| self.is_hit_list_file(&e.file_name()));

            let mut report = ReconcileReport {
                kept: hit_list.iter().map(StoreEntry::file_name).collect(),
                ..Default::default()
            };

            for set in group_by_stem(entries).values() {
                let state = policy.classify(set);
                let (keep, remove) = policy.partition(set);
                report.kept.extend(keep.iter().map(|e| e.file_name()));
                let removal = self.store.remove_entries(remove);

                if state == Some(JobState::Orphaned) {
                    let state_after = state_after_sweep(set, &removal.removed);
                    debug!(stem = %set.stem(), state = %state_after, "Orphaned job swept");
                    report.orphaned.push(OrphanedJob {
                        stem: set.stem().to_string(),
                        state_after,
                    });
                }
                report.absorb(removal);
            }

            report.kept.sort();
            report.removed.sort();
            sort_natural_desc(&mut report.orphaned, |o| o.stem.as_str());
            info!(
                removed = report.removed.len(),
                kept = report.kept.len(),
                orphaned = report.orphaned.len(),
                failed = report.failures.len(),
                "Reconcile finished"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }
}

/// At most one trailing newline is added; content already ending in one is
/// stored as is.
fn with_trailing_newline(content: &str) -> String {
    if content.ends_with('\n') {
        content.to_string()
    } else {
        format!("{}\n", content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchedulerError;
    use crate::scheduler::InMemoryScheduler;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<InMemoryScheduler>, JobLifecycleManager) {
        let temp_dir = TempDir::new().unwrap();
        let scheduler = Arc::new(InMemoryScheduler::new());
        let manager = JobLifecycleManager::new(
            Config::with_job_root(temp_dir.path().join("jobs")),
            scheduler.clone(),
        );
        (temp_dir, scheduler, manager)
    }

    fn alice() -> Principal {
        Principal::new("alice").unwrap()
    }

    #[test]
    fn test_with_trailing_newline() {
        assert_eq!(with_trailing_newline("a.com"), "a.com\n");
        assert_eq!(with_trailing_newline("a.com\n"), "a.com\n");
        assert_eq!(with_trailing_newline("a.com\n\n"), "a.com\n\n");
    }

    #[tokio::test]
    async fn test_submit_text_writes_input_and_schedules() {
        let (_temp, scheduler, manager) = setup();

        let job = manager.submit_text(&alice(), "example.com").await.unwrap();
        assert_eq!(job.state, JobState::Queued);
        assert!(job.id.starts_with("job_"));
        assert_eq!(
            std::fs::read_to_string(&job.input_path).unwrap(),
            "example.com\n"
        );

        let submitted = scheduler.submitted();
        assert_eq!(submitted.len(), 1);
        assert!(submitted[0].contains(" -j "));
        assert!(submitted[0].ends_with(&format!("rm -f {}", job.input_path.display())));
    }

    #[tokio::test]
    async fn test_blank_text_rejected_before_storage() {
        let (temp, scheduler, manager) = setup();

        let result = manager.submit_text(&alice(), "  \n\t").await;
        assert!(matches!(
            result,
            Err(ProfqError::Submission(SubmissionError::EmptyInput))
        ));
        assert!(!temp.path().join("jobs").exists());
        assert!(scheduler.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_submit_ping_uses_defaults() {
        let (_temp, scheduler, manager) = setup();
        let domains = vec!["a.com".to_string(), " ".to_string(), "b.com ".to_string()];

        let job = manager
            .submit_ping(&alice(), &domains, None, Some(250))
            .await
            .unwrap();
        assert!(job.id.starts_with("ping_"));
        assert_eq!(
            job.kind,
            JobKind::Ping {
                retry_count: 2,
                pause_millis: 250
            }
        );
        assert_eq!(
            std::fs::read_to_string(&job.input_path).unwrap(),
            "a.com\nb.com\n"
        );
        assert!(scheduler.submitted()[0].contains("-r2 -p250"));
    }

    #[tokio::test]
    async fn test_scheduler_failure_keeps_input() {
        let (_temp, scheduler, manager) = setup();
        scheduler.set_available(false);

        let err = manager
            .submit_text(&alice(), "example.com\n")
            .await
            .unwrap_err();
        let ProfqError::NotScheduled { job_id, source } = &err else {
            panic!("expected NotScheduled, got {:?}", err);
        };
        assert!(matches!(source, SchedulerError::Unavailable(_)));

        let input = manager.store().principal_dir(&alice()).join(job_id);
        assert!(input.exists());

        let listing = manager.list_jobs(&alice()).unwrap();
        assert_eq!(listing.queued.len(), 1);
    }

    #[test]
    fn test_list_jobs_without_directory() {
        let (_temp, _scheduler, manager) = setup();
        let listing = manager.list_jobs(&alice()).unwrap();
        assert!(listing.is_empty());
    }

    #[test]
    fn test_progress_of_rejects_traversal() {
        let (_temp, _scheduler, manager) = setup();
        assert_eq!(manager.progress_of(&alice(), "../bob/job"), None);
    }

    #[test]
    fn test_delete_rejects_invalid_stem() {
        let (_temp, _scheduler, manager) = setup();
        let result = manager.delete_job(&alice(), "../bob");
        assert!(matches!(
            result,
            Err(ProfqError::Storage(StorageError::InvalidName(_)))
        ));
    }

    #[test]
    fn test_hit_list_domains() {
        let (_temp, _scheduler, manager) = setup();
        assert!(manager.hit_list_domains(&alice()).unwrap().is_empty());

        let dir = manager.store().ensure_root(&alice()).unwrap();
        std::fs::write(dir.join("spamhaus.txt"), "a.com\n\n  b.com \n").unwrap();
        assert_eq!(
            manager.hit_list_domains(&alice()).unwrap(),
            vec!["a.com".to_string(), "b.com".to_string()]
        );
    }

    #[tokio::test]
    async fn test_cancel_pending_surfaces_scheduler_error() {
        let (_temp, _scheduler, manager) = setup();
        let err = manager
            .cancel_pending(&[Ticket::new("77")])
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Unknown ticket: 77");

        assert!(manager.cancel_pending(&[]).await.is_ok());
    }
}
