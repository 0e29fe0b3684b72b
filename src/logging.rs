//! Log setup. The terminal is in raw alternate-screen mode while playing,
//! so events go to a plain-text file instead of stderr.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Overrides `[log] filter` when set.
pub const ENV_FILTER_VAR: &str = "TILEPAINT_LOG";

fn build_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_env(ENV_FILTER_VAR)
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Returns false (and logs nothing) if the
/// log file cannot be opened; the game runs either way.
pub fn init(config: &LogConfig) -> bool {
    if let Some(parent) = config.file.parent().filter(|p| !p.as_os_str().is_empty()) {
        let _ = std::fs::create_dir_all(parent);
    }
    let file = match OpenOptions::new().create(true).append(true).open(&config.file) {
        Ok(f) => f,
        Err(_) => return false,
    };

    tracing_subscriber::fmt()
        .with_env_filter(build_filter(config))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .is_ok()
}

/// Forward problems collected before the subscriber existed.
pub fn report_startup_warnings(warnings: &[String]) {
    for w in warnings {
        warn!(warning = %w, "config");
    }
}
