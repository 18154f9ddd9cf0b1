use serde::Serialize;

use crate::job::artifact::{ArtifactKind, RESULT_KINDS};
use crate::job::record::{ArtifactSet, JobState};
use crate::progress::Progress;
use crate::store::Principal;

/// A downloadable artifact, addressed relative to the job root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactLink {
    pub kind: ArtifactKind,
    pub file_name: String,
    /// `<principal>/<file name>`
    pub href: String,
}

impl ArtifactLink {
    pub fn new(principal: &Principal, kind: ArtifactKind, file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        Self {
            kind,
            href: format!("{}/{}", principal.as_str(), file_name),
            file_name,
        }
    }
}

/// What a rendering layer needs to show one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub stem: String,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    pub artifact_links: Vec<ArtifactLink>,
}

impl JobSummary {
    /// Builds a summary with links to whichever result artifacts exist.
    pub fn from_set(
        principal: &Principal,
        set: &ArtifactSet,
        state: JobState,
        progress: Option<Progress>,
    ) -> Self {
        let artifact_links = RESULT_KINDS
            .iter()
            .filter_map(|kind| set.entry(*kind).map(|e| (*kind, e.file_name())))
            .map(|(kind, name)| ArtifactLink::new(principal, kind, name))
            .collect();

        Self {
            stem: set.stem().to_string(),
            state,
            progress,
            artifact_links,
        }
    }
}

/// The result of `list_jobs`. Each sequence is in descending natural order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListing {
    pub queued: Vec<JobSummary>,
    pub running: Vec<JobSummary>,
    pub completed: Vec<JobSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_list: Option<JobSummary>,
}

impl JobListing {
    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
            && self.running.is_empty()
            && self.completed.is_empty()
            && self.hit_list.is_none()
    }

    /// Looks a stem up in every sequence.
    pub fn find(&self, stem: &str) -> Option<&JobSummary> {
        self.queued
            .iter()
            .chain(&self.running)
            .chain(&self.completed)
            .chain(&self.hit_list)
            .find(|s| s.stem == stem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::record::group_by_stem;
    use crate::store::StoreEntry;
    use std::path::PathBuf;

    fn completed_set() -> ArtifactSet {
        let entries = ["job", "csv", "log"]
            .iter()
            .map(|ext| StoreEntry {
                stem: "job_1".to_string(),
                extension: Some(ext.to_string()),
                path: PathBuf::from(format!("/jobs/alice/job_1.{}", ext)),
                modified: None,
            })
            .collect();
        group_by_stem(entries).remove("job_1").unwrap()
    }

    #[test]
    fn test_links_follow_result_order() {
        let alice = Principal::new("alice").unwrap();
        let summary = JobSummary::from_set(&alice, &completed_set(), JobState::Completed, None);

        let hrefs: Vec<&str> = summary.artifact_links.iter().map(|l| l.href.as_str()).collect();
        assert_eq!(
            hrefs,
            vec!["alice/job_1.csv", "alice/job_1.log", "alice/job_1.job"]
        );
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let alice = Principal::new("alice").unwrap();
        let summary = JobSummary::from_set(
            &alice,
            &completed_set(),
            JobState::Running,
            Some(Progress::new(3, 10)),
        );

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["state"], "running");
        assert_eq!(json["progress"]["processed"], 3);
        assert_eq!(json["artifactLinks"][0]["fileName"], "job_1.csv");
        assert_eq!(json["artifactLinks"][0]["kind"], "csv");
    }

    #[test]
    fn test_listing_find() {
        let alice = Principal::new("alice").unwrap();
        let listing = JobListing {
            completed: vec![JobSummary::from_set(
                &alice,
                &completed_set(),
                JobState::Completed,
                None,
            )],
            ..Default::default()
        };

        assert!(!listing.is_empty());
        assert!(listing.find("job_1").is_some());
        assert!(listing.find("job_2").is_none());
    }
}
