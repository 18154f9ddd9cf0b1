//! Command handlers for the `profq` binary.
//!
//! Handlers are organized by domain:
//! - `submit`: pasted text, uploaded files, blocklist pings
//! - `jobs`: listing, progress, deletion, cleanup, hit list
//! - `queue`: the scheduler's pending queue and cancellation

pub mod jobs;
pub mod queue;
pub mod submit;

use std::process::ExitCode;

use serde::Serialize;

use profq::ProfqError;

/// Response wrapper for `--json` output.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Plain-text rendering of a command result.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for () {
    fn render(&self) -> String {
        String::new()
    }
}

/// Prints a command result and maps it to the process exit code.
///
/// Errors are shown through `ProfqError::user_message`; the full chain only
/// goes to the log.
pub fn emit<T: Serialize + Render>(json: bool, result: Result<T, ProfqError>) -> ExitCode {
    match result {
        Ok(data) => {
            if json {
                print_json(&ApiResponse::ok(data));
            } else {
                let text = data.render();
                if !text.is_empty() {
                    println!("{}", text);
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            let message = e.user_message();
            if json {
                print_json(&ApiResponse::<()>::err(message));
            } else {
                eprintln!("{}", message);
            }
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: Serialize>(response: &ApiResponse<T>) {
    match serde_json::to_string_pretty(response) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Failed to encode response: {}", e),
    }
}
