pub mod artifact;
pub mod natsort;
pub mod record;
pub mod summary;

pub use artifact::ArtifactKind;
pub use natsort::{natural_cmp, sort_natural_desc};
pub use record::{group_by_stem, ArtifactSet, Job, JobKind, JobState};
pub use summary::{ArtifactLink, JobListing, JobSummary};
