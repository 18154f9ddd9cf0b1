//! An in-process scheduler for tests and dry runs. Nothing is ever executed.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::parse::parse_atq_listing;
use super::{ExecutionScheduler, PendingQueue, Ticket};
use crate::error::SchedulerError;

#[derive(Debug, Clone)]
struct Held {
    ticket: Ticket,
    command_line: String,
    executing: bool,
}

#[derive(Debug)]
struct State {
    next_id: u64,
    held: Vec<Held>,
    submitted: Vec<String>,
    available: bool,
}

/// Accepts, lists and cancels tickets in memory.
///
/// Listings are rendered in `atq` format so they go through the same parser
/// as the real facility.
#[derive(Debug)]
pub struct InMemoryScheduler {
    state: Mutex<State>,
}

impl Default for InMemoryScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryScheduler {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1,
                held: Vec::new(),
                submitted: Vec::new(),
                available: true,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panicking test thread must not wedge the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Simulates the facility being absent.
    pub fn set_available(&self, available: bool) {
        self.lock().available = available;
    }

    /// Marks a ticket as started and returns its command line.
    pub fn start(&self, ticket: &Ticket) -> Option<String> {
        let mut state = self.lock();
        let held = state.held.iter_mut().find(|h| &h.ticket == ticket)?;
        held.executing = true;
        Some(held.command_line.clone())
    }

    /// Forgets a ticket as if its command had finished.
    pub fn finish(&self, ticket: &Ticket) -> bool {
        let mut state = self.lock();
        let before = state.held.len();
        state.held.retain(|h| &h.ticket != ticket);
        state.held.len() != before
    }

    /// Every command line ever accepted, in submission order.
    pub fn submitted(&self) -> Vec<String> {
        self.lock().submitted.clone()
    }

    pub fn command_for(&self, ticket: &Ticket) -> Option<String> {
        self.lock()
            .held
            .iter()
            .find(|h| &h.ticket == ticket)
            .map(|h| h.command_line.clone())
    }

    fn check_available(state: &State) -> Result<(), SchedulerError> {
        if state.available {
            Ok(())
        } else {
            Err(SchedulerError::Unavailable(
                "in-memory scheduler switched off".to_string(),
            ))
        }
    }
}

#[async_trait]
impl ExecutionScheduler for InMemoryScheduler {
    async fn submit(&self, command_line: &str) -> Result<Ticket, SchedulerError> {
        let mut state = self.lock();
        Self::check_available(&state)?;

        if command_line.trim().is_empty() {
            return Err(SchedulerError::Rejected("garbled time".to_string()));
        }

        let ticket = Ticket::new(state.next_id.to_string());
        state.next_id += 1;
        state.held.push(Held {
            ticket: ticket.clone(),
            command_line: command_line.to_string(),
            executing: false,
        });
        state.submitted.push(command_line.to_string());
        Ok(ticket)
    }

    async fn cancel(&self, ticket: &Ticket) -> Result<(), SchedulerError> {
        let mut state = self.lock();
        Self::check_available(&state)?;

        let position = state
            .held
            .iter()
            .position(|h| &h.ticket == ticket)
            .ok_or_else(|| SchedulerError::UnknownTicket(ticket.to_string()))?;

        if state.held[position].executing {
            return Err(SchedulerError::Rejected(format!(
                "Cannot cancel ticket {}: already running",
                ticket
            )));
        }

        state.held.remove(position);
        Ok(())
    }

    async fn list_pending(&self) -> Result<PendingQueue, SchedulerError> {
        let state = self.lock();
        Self::check_available(&state)?;

        let when = Utc::now().format("%a %b %e %H:%M:%S %Y");
        let listing: String = state
            .held
            .iter()
            .map(|h| {
                let queue = if h.executing { "=" } else { "a" };
                format!("{}\t{} {} profq\n", h.ticket, when, queue)
            })
            .collect();

        Ok(parse_atq_listing(&listing))
    }
}
