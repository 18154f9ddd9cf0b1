pub mod config;
pub mod error;
pub mod job;
pub mod lifecycle;
pub mod progress;
pub mod sanitize;
pub mod scheduler;
pub mod store;

pub use config::{load_config, Config};
pub use error::{ProfqError, Result};
pub use job::{Job, JobListing, JobState, JobSummary};
pub use lifecycle::{JobLifecycleManager, ReconcileReport, UploadedFile};
pub use progress::Progress;
pub use scheduler::{AtScheduler, ExecutionScheduler, InMemoryScheduler, PendingQueue, Ticket};
pub use store::{JobDirectoryStore, Principal, RemovalReport};
