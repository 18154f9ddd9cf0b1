//! Test harness for isolated lifecycle tests.
//!
//! The `TestHarness` owns a temporary job root, an `InMemoryScheduler` and a
//! `JobLifecycleManager` wired to both. Helpers play the part of the external
//! worker by writing the artifacts it would leave behind.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use profq::config::Config;
use profq::job::ArtifactKind;
use profq::progress::{FileProgress, ProgressEvent, ProgressReporter};
use profq::{InMemoryScheduler, JobLifecycleManager, Principal, Ticket};

use super::builders::ConfigBuilder;

pub struct TestHarness {
    temp_dir: TempDir,
    /// Root handed to the manager; principal directories live below it.
    pub job_root: PathBuf,
    pub scheduler: Arc<InMemoryScheduler>,
    pub manager: JobLifecycleManager,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(|builder| builder)
    }

    /// Builds the harness after letting the caller adjust the config.
    pub fn with_config<F>(configure: F) -> Self
    where
        F: FnOnce(ConfigBuilder) -> ConfigBuilder,
    {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let job_root = temp_dir.path().join("jobs");
        let config: Config = configure(ConfigBuilder::new(&job_root)).build();

        let scheduler = Arc::new(InMemoryScheduler::new());
        let manager = JobLifecycleManager::new(config, scheduler.clone());

        Self {
            temp_dir,
            job_root,
            scheduler,
            manager,
        }
    }

    pub fn principal(name: &str) -> Principal {
        Principal::new(name).expect("valid principal")
    }

    pub fn dir_of(&self, principal: &Principal) -> PathBuf {
        self.job_root.join(principal.as_str())
    }

    /// A scratch directory outside the job root, e.g. for uploads.
    pub fn scratch_dir(&self) -> PathBuf {
        let dir = self.temp_dir.path().join("scratch");
        std::fs::create_dir_all(&dir).expect("Failed to create scratch dir");
        dir
    }

    /// Writes a file straight into a principal's directory.
    pub fn put(&self, principal: &Principal, name: &str, content: &str) -> PathBuf {
        let dir = self.dir_of(principal);
        std::fs::create_dir_all(&dir).expect("Failed to create principal dir");
        let path = dir.join(name);
        std::fs::write(&path, content).expect("Failed to write artifact");
        path
    }

    pub fn exists(&self, principal: &Principal, name: &str) -> bool {
        self.dir_of(principal).join(name).exists()
    }

    /// Backdates a file's modification time.
    pub fn age(&self, path: &Path, by: Duration) {
        let file = std::fs::File::options()
            .write(true)
            .open(path)
            .expect("Failed to open for touch");
        file.set_modified(SystemTime::now() - by)
            .expect("Failed to set mtime");
    }

    /// Fires a ticket: the scheduler marks it executing and the worker
    /// consumes the input, as the real command's trailing `rm` would.
    pub fn start_worker(&self, principal: &Principal, ticket: &Ticket, stem: &str) {
        self.scheduler
            .start(ticket)
            .expect("ticket should be pending");
        std::fs::remove_file(self.dir_of(principal).join(stem)).ok();
    }

    /// Reports progress the way the worker does.
    pub fn report_progress(&self, principal: &Principal, stem: &str, processed: u64, total: u64) {
        FileProgress::new(&self.dir_of(principal), stem)
            .report(ProgressEvent::Advanced { processed, total });
    }

    /// Writes the result set, removes the progress file and retires the ticket.
    pub fn finish_worker(&self, principal: &Principal, ticket: &Ticket, stem: &str) {
        for kind in [ArtifactKind::Csv, ArtifactKind::Log, ArtifactKind::JobCopy] {
            self.put(principal, &kind.file_name(stem), "result\n");
        }
        FileProgress::new(&self.dir_of(principal), stem).report(ProgressEvent::Completed);
        self.scheduler.finish(ticket);
    }

    /// Result set only, for jobs that never went through the scheduler.
    pub fn completed_job(&self, principal: &Principal, stem: &str) {
        for kind in [ArtifactKind::Csv, ArtifactKind::Log, ArtifactKind::JobCopy] {
            self.put(principal, &kind.file_name(stem), "result\n");
        }
    }
}
