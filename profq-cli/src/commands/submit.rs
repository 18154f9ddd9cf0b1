//! Submission commands.

use std::io::Read;
use std::path::PathBuf;

use log::warn;

use profq::{Job, JobLifecycleManager, Principal, ProfqError, UploadedFile};

use super::Render;

impl Render for Job {
    fn render(&self) -> String {
        match &self.scheduler_ticket {
            Some(ticket) => format!("Queued {} as ticket {}", self.id, ticket),
            None => format!("Stored {}", self.id),
        }
    }
}

/// Submits a file, the given words (one per line), or stdin, in that order of
/// preference.
pub async fn submit(
    manager: &JobLifecycleManager,
    principal: &Principal,
    file: Option<PathBuf>,
    text: Vec<String>,
) -> Result<Job, ProfqError> {
    if let Some(path) = file {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        return manager
            .submit_file(principal, &UploadedFile::new(path, name))
            .await;
    }

    let content = if text.is_empty() {
        read_stdin()
    } else {
        text.join("\n")
    };
    manager.submit_text(principal, &content).await
}

pub async fn ping(
    manager: &JobLifecycleManager,
    principal: &Principal,
    domains: Vec<String>,
    retry: Option<u32>,
    pause: Option<u64>,
) -> Result<Job, ProfqError> {
    manager.submit_ping(principal, &domains, retry, pause).await
}

/// Unreadable stdin counts as empty input.
fn read_stdin() -> String {
    let mut content = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut content) {
        warn!("Failed to read stdin: {}", e);
        content.clear();
    }
    content
}
