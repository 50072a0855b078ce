//! Shared logging setup for ConfigBridge binaries.

use anyhow::{Context, Result};
use std::fs;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable overriding the ConfigBridge home directory.
pub const HOME_ENV: &str = "CONFIGBRIDGE_HOME";

const FILE_LOG_FILTER: &str = "configbridge=info,configbridge_core=info";
const DEBUG_CONSOLE_FILTER: &str = "configbridge=debug,configbridge_core=debug";
const QUIET_CONSOLE_FILTER: &str = "warn";

/// Logging configuration shared by ConfigBridge binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Debug mode in effect (already gated by the runtime environment).
    pub debug: bool,
}

/// Keeps the non-blocking file writer alive; drop it last to flush.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
    log_file: Option<PathBuf>,
}

impl LogGuard {
    /// Current log file, or `None` when running console-only.
    pub fn log_file(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }
}

/// Initialize tracing with a daily rolling file and stderr output.
///
/// Fails only when a global subscriber is already installed. A log
/// directory that cannot be created degrades to console-only.
pub fn init_logging(config: LogConfig<'_>) -> Result<LogGuard> {
    let file_name = format!("{}.log", sanitize_name(config.app_name));

    let (file_layer, guard, log_file) = match ensure_logs_dir() {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(&dir, &file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter_or_env(FILE_LOG_FILTER));
            (Some(layer), Some(guard), Some(dir.join(&file_name)))
        }
        Err(err) => {
            eprintln!("Warning: failed to create logs directory: {:#}", err);
            (None, None, None)
        }
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .with_filter(filter_or_env(console_filter(config.debug)));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LogGuard {
        _file: guard,
        log_file,
    })
}

fn console_filter(debug: bool) -> &'static str {
    if debug {
        DEBUG_CONSOLE_FILTER
    } else {
        QUIET_CONSOLE_FILTER
    }
}

fn filter_or_env(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Get the ConfigBridge home directory.
///
/// Priority:
/// 1) CONFIGBRIDGE_HOME
/// 2) ~/.configbridge
pub fn configbridge_home() -> Result<PathBuf> {
    if let Ok(override_path) = std::env::var(HOME_ENV) {
        if !override_path.trim().is_empty() {
            return Ok(PathBuf::from(override_path));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".configbridge"))
        .context("Could not determine home directory")
}

/// Get the logs directory: <home>/logs
pub fn logs_dir() -> Result<PathBuf> {
    Ok(configbridge_home()?.join("logs"))
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir()?;
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "configbridge".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("configbridge"), "configbridge");
        assert_eq!(sanitize_name("my app/../x"), "my_app____x");
        assert_eq!(sanitize_name(""), "configbridge");
    }

    #[test]
    fn test_console_filter_follows_debug() {
        assert_eq!(console_filter(true), DEBUG_CONSOLE_FILTER);
        assert_eq!(console_filter(false), "warn");
    }

    // Env-var based cases live in one test to avoid racing other tests.
    #[test]
    fn test_home_override_and_logs_dir() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("cb-home");
        std::env::set_var(HOME_ENV, &home);

        assert_eq!(configbridge_home().unwrap(), home);
        assert_eq!(logs_dir().unwrap(), home.join("logs"));
        let ensured = ensure_logs_dir().unwrap();
        assert!(ensured.is_dir());

        std::env::set_var(HOME_ENV, "   ");
        let fallback = configbridge_home();
        std::env::remove_var(HOME_ENV);
        if let Ok(path) = fallback {
            assert!(path.ends_with(".configbridge"), "got {}", path.display());
        }
    }
}
