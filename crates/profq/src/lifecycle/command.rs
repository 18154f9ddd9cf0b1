//! Worker command lines handed to the scheduler.

use std::path::Path;

use crate::config::WorkerConfig;
use crate::job::JobKind;

/// Quotes `value` for a POSIX shell.
///
/// Values made only of safe characters pass through unchanged; anything else
/// is wrapped in single quotes with embedded quotes spelled `'\''`.
pub fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));

    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// The compound command that runs the worker on one input and then removes
/// the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    line: String,
}

impl WorkerCommand {
    pub fn build(worker: &WorkerConfig, kind: &JobKind, job_dir: &Path, input: &Path) -> Self {
        let input = shell_quote(&input.to_string_lossy());

        let mut parts = vec![shell_quote(&worker.executable)];
        parts.extend(worker.args.iter().map(|a| shell_quote(a)));
        parts.push("-j".to_string());
        parts.push(shell_quote(&job_dir.to_string_lossy()));

        if let JobKind::Ping {
            retry_count,
            pause_millis,
        } = kind
        {
            parts.push(format!("-r{}", retry_count));
            parts.push(format!("-p{}", pause_millis));
        }

        parts.push(input.clone());

        Self {
            line: format!("{}; rm -f {}", parts.join(" "), input),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.line
    }
}
