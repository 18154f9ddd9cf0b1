//! Binding to the POSIX `at` facility.

use std::io::ErrorKind;
use std::process::{Output, Stdio};

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;

use super::parse::{format_command_error, parse_at_ticket, parse_atq_listing};
use super::{ExecutionScheduler, PendingQueue, Ticket};
use crate::config::SchedulerConfig;
use crate::error::SchedulerError;

/// Queues commands with `at -M now`, lists with `atq`, cancels with `atrm`.
///
/// Every call is bounded by the configured timeout. A child still running
/// when the timeout fires is killed.
pub struct AtScheduler {
    settings: SchedulerConfig,
}

impl AtScheduler {
    pub fn new(settings: SchedulerConfig) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SchedulerConfig {
        &self.settings
    }

    fn queue_args(&self) -> Vec<String> {
        match &self.settings.queue {
            Some(queue) => vec!["-q".to_string(), queue.clone()],
            None => Vec::new(),
        }
    }

    async fn run(
        &self,
        program: &str,
        args: &[String],
        input: Option<&str>,
    ) -> Result<Output, SchedulerError> {
        let mut cmd = TokioCommand::new(program);
        cmd.args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Running {} {}", program, args.join(" "));

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                SchedulerError::Unavailable(format!("{} is not installed", program))
            } else {
                SchedulerError::Unavailable(format!("{}: {}", program, e))
            }
        })?;

        let stdin_pipe = child.stdin.take();
        let io = async move {
            if let (Some(mut stdin), Some(text)) = (stdin_pipe, input) {
                // A child that exits without reading closes the pipe early;
                // its own output says why.
                let written = match stdin.write_all(text.as_bytes()).await {
                    Ok(()) => stdin.shutdown().await,
                    Err(e) => Err(e),
                };
                match written {
                    Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                        debug!("{} closed stdin early", program);
                    }
                    other => other?,
                }
            }
            child.wait_with_output().await
        };

        let timeout = self.settings.timeout();
        match tokio::time::timeout(timeout, io).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(SchedulerError::Unavailable(format!("{}: {}", program, e))),
            Err(_) => {
                warn!("{} did not finish within {:?}", program, timeout);
                Err(SchedulerError::Timeout {
                    secs: self.settings.timeout_secs,
                })
            }
        }
    }
}

#[async_trait]
impl ExecutionScheduler for AtScheduler {
    async fn submit(&self, command_line: &str) -> Result<Ticket, SchedulerError> {
        let mut args = self.queue_args();
        args.extend(["-M".to_string(), "now".to_string()]);

        let mut script = command_line.to_string();
        if !script.ends_with('\n') {
            script.push('\n');
        }

        let output = self
            .run(&self.settings.at_command, &args, Some(&script))
            .await?;

        if !output.status.success() {
            return Err(SchedulerError::Rejected(format_command_error(&output)));
        }

        // `at` acknowledges on stderr; some builds use stdout.
        let text = format!(
            "{}\n{}",
            String::from_utf8_lossy(&output.stderr),
            String::from_utf8_lossy(&output.stdout)
        );
        match parse_at_ticket(&text) {
            Some(ticket) => {
                info!("Scheduled ticket {}", ticket);
                Ok(ticket)
            }
            None => Err(SchedulerError::UnexpectedOutput(text.trim().to_string())),
        }
    }

    async fn cancel(&self, ticket: &Ticket) -> Result<(), SchedulerError> {
        self.cancel_many(std::slice::from_ref(ticket)).await
    }

    /// One `atrm` call for all tickets. Any output at all is the facility
    /// complaining and is passed back verbatim.
    async fn cancel_many(&self, tickets: &[Ticket]) -> Result<(), SchedulerError> {
        if tickets.is_empty() {
            return Ok(());
        }

        let args: Vec<String> = tickets.iter().map(|t| t.as_str().to_string()).collect();
        let output = self.run(&self.settings.atrm_command, &args, None).await?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() || !stderr.is_empty() || !stdout.is_empty() {
            return Err(SchedulerError::Rejected(format_command_error(&output)));
        }

        info!("Cancelled {} ticket(s)", tickets.len());
        Ok(())
    }

    async fn list_pending(&self) -> Result<PendingQueue, SchedulerError> {
        let output = self
            .run(&self.settings.atq_command, &self.queue_args(), None)
            .await?;

        if !output.status.success() {
            return Err(SchedulerError::Rejected(format_command_error(&output)));
        }

        Ok(parse_atq_listing(&String::from_utf8_lossy(&output.stdout)))
    }
}
