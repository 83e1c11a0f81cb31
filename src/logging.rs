use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;
use crate::utils::{self, Profile};

pub const LOG_FILE_NAME: &str = "dayboard.log";

/// Filter from `RUST_LOG` when it is usable, else from the configured level.
/// Invalid or oversized filters are ignored.
pub fn build_filter(rust_log: Option<&str>, configured: &str) -> EnvFilter {
    rust_log
        .map(str::trim)
        .filter(|raw| !raw.is_empty() && raw.len() <= 4096)
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .or_else(|| EnvFilter::try_new(configured.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

pub fn log_file_path(profile: Profile) -> Option<PathBuf> {
    utils::get_data_dir(profile).map(|dir| dir.join(LOG_FILE_NAME))
}

/// Send log output to the profile's log file; the terminal belongs to the UI.
/// Logging is skipped when the file cannot be opened.
pub fn init(config: &Config, profile: Profile) {
    let Some(path) = log_file_path(profile) else {
        return;
    };
    init_with_file(&path, config);
}

fn init_with_file(path: &Path, config: &Config) {
    if let Some(parent) = path.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };

    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = build_filter(rust_log.as_deref(), &config.log_level);
    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);

    // A subscriber installed earlier (tests, embedding) wins
    let _ = tracing_subscriber::registry()
        .with(file_layer)
        .with(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_takes_precedence() {
        let filter = build_filter(Some("debug"), "warn");
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn falls_back_to_configured_level() {
        assert_eq!(build_filter(None, "warn").to_string(), "warn");
        assert_eq!(build_filter(Some("  "), "warn").to_string(), "warn");
        assert_eq!(build_filter(Some("dayboard=loud"), "error").to_string(), "error");
    }

    #[test]
    fn invalid_configured_level_uses_info() {
        assert_eq!(build_filter(None, "dayboard=loud").to_string(), "info");
    }
}
