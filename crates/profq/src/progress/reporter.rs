use std::path::{Path, PathBuf};

use crate::job::artifact::ArtifactKind;
use crate::progress::Progress;

/// Events a worker emits while working through a job's input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Advanced { processed: u64, total: u64 },
    Completed,
    Failed { error: String },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Maintains `<stem>.count` in a job directory.
///
/// `Completed` removes the file. `Failed` leaves the last numbers behind,
/// exactly as a crashed worker would, so the job stays visible as running
/// until reconciled.
pub struct FileProgress {
    path: PathBuf,
}

impl FileProgress {
    pub fn new(job_dir: &Path, stem: &str) -> Self {
        Self {
            path: job_dir.join(ArtifactKind::Progress.file_name(stem)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProgressReporter for FileProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Advanced { processed, total } => {
                let line = Progress::new(processed, total).to_line();
                if let Err(e) = std::fs::write(&self.path, line) {
                    log::warn!("Failed to update progress file: {}", e);
                }
            }
            ProgressEvent::Completed => match std::fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Failed to remove progress file: {}", e),
            },
            ProgressEvent::Failed { error } => {
                log::error!("Worker failed, leaving progress marker: {}", error);
            }
        }
    }
}
