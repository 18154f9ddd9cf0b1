use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// Root under which every principal gets its own directory.
    pub job_root_directory: PathBuf,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub ping: PingConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub hit_list: HitListConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

impl Config {
    /// Minimal configuration rooted at `job_root_directory`, everything else
    /// defaulted.
    pub fn with_job_root(job_root_directory: impl Into<PathBuf>) -> Self {
        Self {
            version: "1.0".to_string(),
            job_root_directory: job_root_directory.into(),
            worker: WorkerConfig::default(),
            ping: PingConfig::default(),
            scheduler: SchedulerConfig::default(),
            hit_list: HitListConfig::default(),
            reconcile: ReconcileConfig::default(),
        }
    }
}

/// The external probing program handed to the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_worker_executable")]
    pub executable: String,
    #[serde(default = "default_worker_args")]
    pub args: Vec<String>,
}

fn default_worker_executable() -> String {
    "smtp-profile.sh".to_string()
}

fn default_worker_args() -> Vec<String> {
    vec!["-v".to_string()]
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            executable: default_worker_executable(),
            args: default_worker_args(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingConfig {
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_pause_millis")]
    pub pause_millis: u64,
}

fn default_retry_count() -> u32 {
    2
}

fn default_pause_millis() -> u64 {
    1000
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            pause_millis: default_pause_millis(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_at_command")]
    pub at_command: String,
    #[serde(default = "default_atq_command")]
    pub atq_command: String,
    #[serde(default = "default_atrm_command")]
    pub atrm_command: String,
    /// Queue letter passed as `-q`; the facility default when unset.
    #[serde(default)]
    pub queue: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_at_command() -> String {
    "at".to_string()
}

fn default_atq_command() -> String {
    "atq".to_string()
}

fn default_atrm_command() -> String {
    "atrm".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl SchedulerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            at_command: default_at_command(),
            atq_command: default_atq_command(),
            atrm_command: default_atrm_command(),
            queue: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// The distinguished blocklist hit-list input and the CSV derived from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitListConfig {
    #[serde(default = "default_hit_list_file")]
    pub file_name: String,
    #[serde(default = "default_hit_list_csv")]
    pub derived_csv: String,
}

fn default_hit_list_file() -> String {
    "spamhaus.txt".to_string()
}

fn default_hit_list_csv() -> String {
    "spamhaus.csv".to_string()
}

impl Default for HitListConfig {
    fn default() -> Self {
        Self {
            file_name: default_hit_list_file(),
            derived_csv: default_hit_list_csv(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// A progress file untouched for longer than this is treated as orphaned.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

fn default_stale_after_secs() -> u64 {
    900
}

impl ReconcileConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: default_stale_after_secs(),
        }
    }
}
