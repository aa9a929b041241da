use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::{fmt, prelude::*};

use crate::error::{AppError, Result};

/// Environment variable that overrides the configured level.
pub const LOG_ENV: &str = "FTREE_LOG";

const DEFAULT_LOG_FILTER: LevelFilter = LevelFilter::INFO;

/// Map a level name to a filter. Unknown names fall back to `info`.
pub fn parse_level(name: &str) -> LevelFilter {
    match name.trim().to_ascii_lowercase().as_str() {
        "off" => LevelFilter::OFF,
        "error" => LevelFilter::ERROR,
        "warn" | "warning" => LevelFilter::WARN,
        "info" => LevelFilter::INFO,
        "debug" => LevelFilter::DEBUG,
        "trace" => LevelFilter::TRACE,
        _ => DEFAULT_LOG_FILTER,
    }
}

/// The effective level: `$FTREE_LOG` if set, otherwise the configured one.
pub fn effective_level(configured: &str) -> LevelFilter {
    match std::env::var(LOG_ENV) {
        Ok(level) if !level.trim().is_empty() => parse_level(&level),
        _ => parse_level(configured),
    }
}

/// Send `tracing` output to a daily rolling file under `log_dir`.
///
/// The terminal belongs to the UI, so nothing is written to stdout or
/// stderr. Keep the returned guard alive until exit or buffered lines are
/// lost.
pub fn init(log_dir: &Path, level: LevelFilter) -> Result<WorkerGuard> {
    fs::create_dir_all(log_dir)
        .map_err(|e| AppError::Logging(format!("{}: {}", log_dir.display(), e)))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(14)
        .filename_prefix("ftree")
        .filename_suffix("log")
        .build(log_dir)
        .map_err(|e| AppError::Logging(e.to_string()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = Targets::new()
        .with_default(level)
        // crossterm and ratatui are noisy below warn
        .with_target("crossterm", LevelFilter::WARN)
        .with_target("ratatui", LevelFilter::WARN);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_are_case_insensitive() {
        assert_eq!(parse_level("DEBUG"), LevelFilter::DEBUG);
        assert_eq!(parse_level(" warn "), LevelFilter::WARN);
        assert_eq!(parse_level("warning"), LevelFilter::WARN);
        assert_eq!(parse_level("off"), LevelFilter::OFF);
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        assert_eq!(parse_level("verbose"), LevelFilter::INFO);
        assert_eq!(parse_level(""), LevelFilter::INFO);
    }

    #[test]
    fn init_reports_uncreatable_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").expect("write");
        let err = init(&blocker.join("logs"), LevelFilter::INFO).unwrap_err();
        assert!(matches!(err, AppError::Logging(_)));
    }
}
