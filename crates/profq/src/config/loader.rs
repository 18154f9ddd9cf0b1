use std::path::{Path, PathBuf};

use crate::config::schema::Config;
use crate::error::ConfigError;
use crate::sanitize;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

/// `<platform config dir>/profq/config.json`, when the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("profq").join("config.json"))
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();

    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.job_root_directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation {
            message: "job_root_directory must not be empty".to_string(),
        });
    }

    if config.worker.executable.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "worker.executable must not be empty".to_string(),
        });
    }

    if config.scheduler.timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "scheduler.timeout_secs must be at least 1".to_string(),
        });
    }

    if config.reconcile.stale_after_secs == 0 {
        return Err(ConfigError::Validation {
            message: "reconcile.stale_after_secs must be at least 1".to_string(),
        });
    }

    for (field, name) in [
        ("hit_list.file_name", &config.hit_list.file_name),
        ("hit_list.derived_csv", &config.hit_list.derived_csv),
    ] {
        if !sanitize::is_plain_component(name) {
            return Err(ConfigError::Validation {
                message: format!("{} must be a plain file name, got '{}'", field, name),
            });
        }
    }

    if config.hit_list.file_name == config.hit_list.derived_csv {
        return Err(ConfigError::Validation {
            message: "hit_list.file_name and hit_list.derived_csv must differ".to_string(),
        });
    }

    Ok(())
}
