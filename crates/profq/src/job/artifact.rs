//! Artifact naming. Every file belonging to job `S` is `S` or `S.<ext>`.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// The raw submitted list, no extension. Removed by the worker command.
    Input,
    /// `S.job`, copy of the input written on completion.
    JobCopy,
    /// `S.csv`, structured results.
    Csv,
    /// `S.log`, human-readable transcript.
    Log,
    /// `S.count`, live "processed total" progress.
    Progress,
    Busy,
    Lock,
    Mx,
    Unrecognized,
}

/// Result artifacts in the order they are linked for display.
pub const RESULT_KINDS: [ArtifactKind; 3] =
    [ArtifactKind::Csv, ArtifactKind::Log, ArtifactKind::JobCopy];

impl ArtifactKind {
    pub fn from_extension(extension: Option<&str>) -> Self {
        match extension {
            None => ArtifactKind::Input,
            Some("job") => ArtifactKind::JobCopy,
            Some("csv") => ArtifactKind::Csv,
            Some("log") => ArtifactKind::Log,
            Some("count") => ArtifactKind::Progress,
            Some("busy") => ArtifactKind::Busy,
            Some("lock") => ArtifactKind::Lock,
            Some("mx") => ArtifactKind::Mx,
            Some(_) => ArtifactKind::Unrecognized,
        }
    }

    pub fn extension(self) -> Option<&'static str> {
        match self {
            ArtifactKind::JobCopy => Some("job"),
            ArtifactKind::Csv => Some("csv"),
            ArtifactKind::Log => Some("log"),
            ArtifactKind::Progress => Some("count"),
            ArtifactKind::Busy => Some("busy"),
            ArtifactKind::Lock => Some("lock"),
            ArtifactKind::Mx => Some("mx"),
            ArtifactKind::Input | ArtifactKind::Unrecognized => None,
        }
    }

    /// File name of this artifact for `stem`.
    pub fn file_name(self, stem: &str) -> String {
        match self.extension() {
            Some(ext) => format!("{}.{}", stem, ext),
            None => stem.to_string(),
        }
    }

    pub fn is_result(self) -> bool {
        RESULT_KINDS.contains(&self)
    }

    /// Transient markers owned by a live worker; never swept.
    pub fn is_reserved_marker(self) -> bool {
        matches!(
            self,
            ArtifactKind::Busy | ArtifactKind::Lock | ArtifactKind::Mx
        )
    }
}
