//! Logging configuration for StaySmart.
//!
//! Logs go to stderr by default, or to a file in the platform state directory
//! when the admin CLI runs with `--log-file`.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes logging to a file.
///
/// Location: `~/.local/state/staysmart/staysmart.log` on Linux (XDG state
/// directory), or the platform-appropriate state/config directory elsewhere.
/// Falls back to stderr when the file cannot be opened.
pub fn init_file_logging() {
    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Warning: Could not create log directory: {e}");
            init_stderr_logging();
            return;
        }
    }

    // Append so that consecutive admin runs share one audit trail.
    let log_file = match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file: {e}");
            init_stderr_logging();
            return;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(log_file)
        .with_ansi(false)
        .init();
}

/// Initializes logging to stderr.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Returns the path for the log file.
pub fn get_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir.join("staysmart").join("staysmart.log");
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("staysmart").join("staysmart.log");
    }

    std::env::temp_dir().join("staysmart.log")
}
