//! Job Lifecycle Manager.
//!
//! States are never stored. A job is `Queued` while only its input exists,
//! `Running` while a progress file (or a partial result set) exists, and
//! `Completed` once every result artifact is present. Only `reconcile` can
//! tell a job is `Orphaned`: its progress file went stale, or its input
//! outlived the scheduler's queue. The sweep reports each orphan as
//! `Deleted` when nothing of it is left.

pub mod command;
pub mod manager;
pub mod reconcile;

pub use command::{shell_quote, WorkerCommand};
pub use manager::{JobLifecycleManager, UploadedFile};
pub use reconcile::{OrphanedJob, ReconcileReport, SweepPolicy};
