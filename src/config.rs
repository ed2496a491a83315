use std::path::PathBuf;

use crate::cli::Cli;
use crate::core::BasePolicy;

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub base_policy: BasePolicy,
    pub log_level: String,
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl AppConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self, String> {
        if cli.data_dir.as_os_str().is_empty() {
            return Err("--data-dir must not be empty".to_string());
        }

        let log_level = cli.log_level.trim().to_ascii_lowercase();
        if !LOG_LEVELS.contains(&log_level.as_str()) {
            return Err(format!(
                "--log-level must be one of {}",
                LOG_LEVELS.join(", ")
            ));
        }

        Ok(AppConfig {
            data_dir: cli.data_dir.clone(),
            base_policy: cli.base_policy.into(),
            log_level,
        })
    }

    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> String {
        format!("take_profit={}", self.log_level)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_dir: PathBuf::from(".take-profit"),
            base_policy: BasePolicy::Recompute,
            log_level: "info".to_string(),
        }
    }
}
