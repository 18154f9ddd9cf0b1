//! Job listing and maintenance commands.

use serde::Serialize;

use profq::job::JobSummary;
use profq::{
    JobLifecycleManager, JobListing, Principal, ProfqError, Progress, ReconcileReport,
    RemovalReport,
};

use super::Render;

fn render_summary(summary: &JobSummary) -> String {
    let mut line = format!("  {}", summary.stem);
    if let Some(progress) = &summary.progress {
        line.push_str(&format!("  {}", render_progress(progress)));
    }
    for link in &summary.artifact_links {
        line.push_str(&format!("  {}", link.href));
    }
    line
}

fn render_progress(progress: &Progress) -> String {
    match progress.percent() {
        Some(pct) => format!("{} ({}%)", progress, pct),
        None => progress.to_string(),
    }
}

impl Render for JobListing {
    fn render(&self) -> String {
        if self.is_empty() {
            return "No jobs.".to_string();
        }

        let mut sections = Vec::new();
        for (title, jobs) in [
            ("Queued", &self.queued),
            ("Running", &self.running),
            ("Completed", &self.completed),
        ] {
            if jobs.is_empty() {
                continue;
            }
            let mut lines = vec![format!("{}:", title)];
            lines.extend(jobs.iter().map(render_summary));
            sections.push(lines.join("\n"));
        }
        if let Some(hit_list) = &self.hit_list {
            sections.push(format!("Hit list:\n{}", render_summary(hit_list)));
        }
        sections.join("\n\n")
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub stem: String,
    pub progress: Option<Progress>,
}

impl Render for ProgressResponse {
    fn render(&self) -> String {
        match &self.progress {
            Some(progress) => format!("{}: {}", self.stem, render_progress(progress)),
            None => format!("{}: progress unknown", self.stem),
        }
    }
}

impl Render for RemovalReport {
    fn render(&self) -> String {
        let mut lines = vec![format!("Removed {} file(s)", self.removed.len())];
        lines.extend(
            self.failures
                .iter()
                .map(|f| format!("  could not remove {}: {}", f.file_name, f.reason)),
        );
        lines.join("\n")
    }
}

impl Render for ReconcileReport {
    fn render(&self) -> String {
        let mut lines = vec![format!(
            "Removed {} file(s), kept {}",
            self.removed.len(),
            self.kept.len()
        )];
        lines.extend(self.removed.iter().map(|name| format!("  removed {}", name)));
        lines.extend(
            self.orphaned
                .iter()
                .map(|o| format!("  orphaned {} ({})", o.stem, o.state_after)),
        );
        lines.extend(
            self.failures
                .iter()
                .map(|f| format!("  could not remove {}: {}", f.file_name, f.reason)),
        );
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct HitListResponse {
    pub domains: Vec<String>,
}

impl Render for HitListResponse {
    fn render(&self) -> String {
        self.domains.join("\n")
    }
}

pub fn list(manager: &JobLifecycleManager, principal: &Principal) -> Result<JobListing, ProfqError> {
    manager.list_jobs(principal)
}

pub fn progress(
    manager: &JobLifecycleManager,
    principal: &Principal,
    stem: String,
) -> Result<ProgressResponse, ProfqError> {
    let progress = manager.progress_of(principal, &stem);
    Ok(ProgressResponse { stem, progress })
}

pub fn delete(
    manager: &JobLifecycleManager,
    principal: &Principal,
    stems: &[String],
) -> Result<RemovalReport, ProfqError> {
    Ok(manager.delete_jobs(principal, stems))
}

pub async fn reconcile(
    manager: &JobLifecycleManager,
    principal: &Principal,
) -> Result<ReconcileReport, ProfqError> {
    manager.reconcile(principal).await
}

pub fn hit_list(
    manager: &JobLifecycleManager,
    principal: &Principal,
) -> Result<HitListResponse, ProfqError> {
    Ok(HitListResponse {
        domains: manager.hit_list_domains(principal)?,
    })
}
