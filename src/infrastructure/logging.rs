use crate::infrastructure::error::InfraError;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const COMMAND_LOG_FILE: &str = "commands.log";
pub const LOG_FILTER_ENV: &str = "TIMESCAPE_LOG";
const DEFAULT_LOG_FILTER: &str = "info";

pub fn command_log_path(logs_dir: &Path) -> PathBuf {
    logs_dir.join(COMMAND_LOG_FILE)
}

/// Installs the process-wide JSON subscriber appending to `commands.log`.
///
/// Returns `false` when a subscriber was already installed, which happens when
/// several app states share one process (tests, re-bootstrap).
pub fn init_command_log(logs_dir: &Path) -> Result<bool, InfraError> {
    init_command_log_with_lookup(logs_dir, |key| std::env::var(key).ok())
}

pub fn init_command_log_with_lookup<F>(logs_dir: &Path, lookup: F) -> Result<bool, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    fs::create_dir_all(logs_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(command_log_path(logs_dir))?;

    let installed = tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_target(false)
        .with_ansi(false)
        .with_env_filter(command_filter(&lookup))
        .with_writer(Mutex::new(file))
        .try_init()
        .is_ok();
    Ok(installed)
}

fn command_filter<F>(lookup: &F) -> EnvFilter
where
    F: Fn(&str) -> Option<String>,
{
    lookup(LOG_FILTER_ENV)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}
