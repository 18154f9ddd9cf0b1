//! Execution Scheduler Binding.
//!
//! Hands a complete shell command line to a deferred-execution facility that
//! runs it once, detached from the caller. The facility is a black box: it
//! returns an opaque ticket on acceptance, can drop tickets that have not
//! started yet, and can list what it still holds.

pub mod at;
pub mod memory;
pub mod parse;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

pub use at::AtScheduler;
pub use memory::InMemoryScheduler;

/// Opaque id the facility assigned to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticket(String);

impl Ticket {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Ticket {
    fn from(id: &str) -> Self {
        Ticket::new(id)
    }
}

/// One line of the facility's queue listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingEntry {
    pub ticket: Ticket,
    /// The listing line exactly as the facility printed it.
    pub raw: String,
    /// Already started; shown but not offered for cancellation.
    pub executing: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingQueue {
    pub raw_listing: String,
    pub entries: Vec<PendingEntry>,
}

impl PendingQueue {
    /// Tickets that have not started yet.
    pub fn cancellable(&self) -> Vec<Ticket> {
        self.entries
            .iter()
            .filter(|e| !e.executing)
            .map(|e| e.ticket.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, ticket: &Ticket) -> bool {
        self.entries.iter().any(|e| &e.ticket == ticket)
    }
}

#[async_trait]
pub trait ExecutionScheduler: Send + Sync {
    /// Queues `command_line` to run as soon as possible.
    async fn submit(&self, command_line: &str) -> Result<Ticket, SchedulerError>;

    /// Drops a ticket that has not started. Facility complaints come back as
    /// `SchedulerError::Rejected` with the facility's own text.
    async fn cancel(&self, ticket: &Ticket) -> Result<(), SchedulerError>;

    /// Cancels each ticket in turn, stopping at the first error.
    async fn cancel_many(&self, tickets: &[Ticket]) -> Result<(), SchedulerError> {
        for ticket in tickets {
            self.cancel(ticket).await?;
        }
        Ok(())
    }

    async fn list_pending(&self) -> Result<PendingQueue, SchedulerError>;
}
