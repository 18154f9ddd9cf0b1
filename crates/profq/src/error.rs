use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfqError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Submission rejected: {0}")]
    Submission(#[from] SubmissionError),

    /// The input was persisted but the scheduler refused to queue it. The
    /// input file is left in place.
    #[error("Job '{job_id}' saved but not scheduled: {source}")]
    NotScheduled {
        job_id: String,
        #[source]
        source: SchedulerError,
    },
}

impl ProfqError {
    /// Text suitable for showing to an end user.
    ///
    /// Scheduler output is passed through verbatim. Everything else is reduced
    /// to a short category so internal paths never reach the user.
    pub fn user_message(&self) -> String {
        match self {
            ProfqError::Scheduler(e) | ProfqError::NotScheduled { source: e, .. } => {
                e.user_message()
            }
            ProfqError::Submission(e) => e.to_string(),
            ProfqError::Storage(StorageError::InvalidName(_)) => "Invalid job name.".to_string(),
            ProfqError::Storage(_) => "Job storage failure.".to_string(),
            ProfqError::Config(_) => "Configuration error.".to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to set permissions on '{path}': {source}")]
    SetPermissions {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create file '{path}': {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy file from '{from}' to '{to}': {source}")]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read directory '{path}': {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to remove '{path}': {source}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    #[error("No free file name left for prefix '{prefix}' in '{dir}'")]
    NamesExhausted { dir: PathBuf, prefix: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Scheduler unavailable: {0}")]
    Unavailable(String),

    #[error("Scheduler did not answer within {secs}s")]
    Timeout { secs: u64 },

    #[error("{0}")]
    Rejected(String),

    #[error("Unexpected scheduler output: {0}")]
    UnexpectedOutput(String),

    #[error("Unknown ticket: {0}")]
    UnknownTicket(String),
}

impl SchedulerError {
    /// Facility text is shown as-is; other variants use their display form.
    pub fn user_message(&self) -> String {
        match self {
            SchedulerError::Rejected(text) | SchedulerError::UnexpectedOutput(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("No domains or addresses supplied.")]
    EmptyInput,

    #[error("Uploaded file is missing.")]
    MissingUpload,

    #[error("Uploaded file name is not usable.")]
    InvalidUploadName,
}

pub type Result<T> = std::result::Result<T, ProfqError>;
