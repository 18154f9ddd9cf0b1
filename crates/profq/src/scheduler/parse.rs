//! Parsing of `at`/`atq` output.

use std::process::Output;
use std::sync::LazyLock;

use regex::Regex;

use crate::scheduler::{PendingEntry, PendingQueue, Ticket};

static RE_AT_TICKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^job\s+(\S+)\s+at\b").unwrap());

/// Whitespace-separated field of an `atq` line holding the queue letter.
pub const QUEUE_FIELD: usize = 6;
/// Queue letter `atq` shows for a job that has already started.
pub const EXECUTING_MARK: &str = "=";

/// Extracts the ticket from `at`'s acknowledgement, e.g.
/// `job 17 at Sat Oct 17 10:00:00 2026`. `at` prints this on stderr, often
/// after a warning line.
pub fn parse_at_ticket(output: &str) -> Option<Ticket> {
    RE_AT_TICKET
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| Ticket::new(m.as_str()))
}

/// Parses an `atq` listing. Blank lines are skipped; every other line becomes
/// an entry keyed by its first field.
pub fn parse_atq_listing(listing: &str) -> PendingQueue {
    let entries = listing
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let ticket = fields.first()?;
            Some(PendingEntry {
                ticket: Ticket::new(*ticket),
                raw: line.to_string(),
                executing: fields.get(QUEUE_FIELD) == Some(&EXECUTING_MARK),
            })
        })
        .collect();

    PendingQueue {
        raw_listing: listing.to_string(),
        entries,
    }
}

/// Combines stderr and stdout of a failed command into one message.
pub fn format_command_error(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

    match (stderr.is_empty(), stdout.is_empty()) {
        (true, true) => format!(
            "Command failed with exit code {}",
            output.status.code().unwrap_or(-1)
        ),
        (true, false) => stdout,
        (false, true) => stderr,
        (false, false) => format!("{}\n{}", stderr, stdout),
    }
}
