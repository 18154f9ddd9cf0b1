//! Scheduler queue commands.

use serde::Serialize;

use profq::{JobLifecycleManager, PendingQueue, ProfqError, Ticket};

use super::Render;

impl Render for PendingQueue {
    fn render(&self) -> String {
        if self.is_empty() {
            return "No pending jobs.".to_string();
        }
        self.entries
            .iter()
            .map(|e| {
                if e.executing {
                    format!("{}  (running)", e.raw)
                } else {
                    e.raw.clone()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: Vec<Ticket>,
}

impl Render for CancelResponse {
    fn render(&self) -> String {
        if self.cancelled.is_empty() {
            return "Nothing to cancel.".to_string();
        }
        let ids: Vec<&str> = self.cancelled.iter().map(Ticket::as_str).collect();
        format!("Cancelled {}", ids.join(" "))
    }
}

pub async fn pending(manager: &JobLifecycleManager) -> Result<PendingQueue, ProfqError> {
    manager.pending_queue().await
}

pub async fn cancel(
    manager: &JobLifecycleManager,
    tickets: Vec<String>,
) -> Result<CancelResponse, ProfqError> {
    let tickets: Vec<Ticket> = tickets.into_iter().map(Ticket::new).collect();
    manager.cancel_pending(&tickets).await?;
    Ok(CancelResponse { cancelled: tickets })
}
