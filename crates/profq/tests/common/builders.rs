//! Builder for creating test configurations programmatically.

#![allow(dead_code)]

use std::path::Path;

use profq::config::{Config, HitListConfig, PingConfig, ReconcileConfig, WorkerConfig};

/// Builder for creating `Config` instances.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// A config rooted at `job_root` with every other section defaulted.
    pub fn new(job_root: &Path) -> Self {
        Self {
            config: Config::with_job_root(job_root),
        }
    }

    pub fn worker(mut self, executable: &str, args: &[&str]) -> Self {
        self.config.worker = WorkerConfig {
            executable: executable.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        };
        self
    }

    pub fn ping_defaults(mut self, retry_count: u32, pause_millis: u64) -> Self {
        self.config.ping = PingConfig {
            retry_count,
            pause_millis,
        };
        self
    }

    pub fn hit_list(mut self, file_name: &str, derived_csv: &str) -> Self {
        self.config.hit_list = HitListConfig {
            file_name: file_name.to_string(),
            derived_csv: derived_csv.to_string(),
        };
        self
    }

    pub fn stale_after_secs(mut self, secs: u64) -> Self {
        self.config.reconcile = ReconcileConfig {
            stale_after_secs: secs,
        };
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
