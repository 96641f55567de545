// SnapTrace - Execution Snapshot Tracer
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Logging configuration for SnapTrace components
//!
//! Provides centralized logging setup with:
//! - Colorful console output with structured formatting
//! - Optional file logging with daily rotation
//! - Environment variable support (`RUST_LOG` and
//!   [`SNAPTRACE_LOG_DIR`](crate::env::SNAPTRACE_LOG_DIR))
//! - Default INFO level

use eyre::Result;
use std::{env, fs, path::PathBuf, sync::Once};
use tracing::Level;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, time::LocalTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Initialize logging for a SnapTrace component
///
/// This function sets up:
/// - Colorful, structured console logging (written to stderr, so a trace printed on
///   stdout stays machine readable)
/// - File logging with daily rotation, when `enable_file_logging` is set
/// - Environment variable support for log levels (`RUST_LOG`), INFO by default
///
/// # Arguments
/// * `component_name` - Name of the component (e.g., "snaptrace")
/// * `enable_file_logging` - Whether to also write logs to disk
///
/// # Examples
/// ```rust,no_run
/// use snaptrace_common::logging;
///
/// fn main() -> eyre::Result<()> {
///     logging::init_logging("snaptrace", false)?;
///     tracing::info!("Application started");
///     Ok(())
/// }
/// ```
pub fn init_logging(component_name: &str, enable_file_logging: bool) -> Result<()> {
    let env_filter = default_env_filter(Level::INFO)?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_timer(LocalTime::rfc_3339())
        .with_ansi(true)
        .pretty();

    if enable_file_logging {
        let log_dir = create_log_directory(component_name)?;

        let file_appender = rolling::daily(&log_dir, format!("{component_name}.log"));
        let (non_blocking_appender, guard) = non_blocking(file_appender);

        // The process logs until exit, so the flush guard lives as long as it does
        std::mem::forget(guard);

        let file_layer = fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(LocalTime::rfc_3339())
            .with_ansi(false)
            .with_writer(non_blocking_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer.with_filter(EnvFilter::from_default_env()))
            .try_init()
            .map_err(|e| eyre::eyre!("Failed to initialize tracing subscriber: {}", e))?;

        tracing::info!(
            component = component_name,
            log_dir = %log_dir.display(),
            "Logging initialized with console and file output"
        );
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .try_init()
            .map_err(|e| eyre::eyre!("Failed to initialize tracing subscriber: {}", e))?;

        tracing::debug!(component = component_name, "Logging initialized with console output only");
    }

    Ok(())
}

fn default_env_filter(level: Level) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_str()))
        .map_err(|e| eyre::eyre!("Failed to create environment filter: {}", e))
}

/// Log directory: `$SNAPTRACE_LOG_DIR/<component>` or `<tmp>/snaptrace-logs/<component>`
fn create_log_directory(component_name: &str) -> Result<PathBuf> {
    let root = env::var_os(crate::env::SNAPTRACE_LOG_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("snaptrace-logs"));
    let log_dir = root.join(component_name);

    fs::create_dir_all(&log_dir)?;

    Ok(log_dir)
}

/// Initialize simple logging (console only, no fancy formatting)
///
/// This is useful for tests or simple utilities that don't need
/// the full logging setup.
pub fn init_simple_logging(level: Level) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(default_env_filter(level)?)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to initialize simple logging: {}", e))?;

    Ok(())
}

static TEST_LOGGING_INIT: Once = Once::new();

/// Safe logging initialization for tests - can be called multiple times without crashing
///
/// Console-only, INFO by default (or `default_level`), respects `RUST_LOG`.
///
/// # Usage
/// ```rust
/// use snaptrace_common::logging;
/// use tracing::info;
///
/// logging::ensure_test_logging(None);
/// info!("This will work safely in any test!");
/// ```
pub fn ensure_test_logging(default_level: Option<Level>) {
    TEST_LOGGING_INIT.call_once(|| {
        // A failure here means a subscriber is already installed, which is fine for tests
        let _ = init_simple_logging(default_level.unwrap_or(Level::INFO));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, error, info, warn};

    #[test]
    fn test_logging_functions_work() {
        ensure_test_logging(None);

        info!("Test info message");
        warn!("Test warning message");
        debug!("Test debug message");
        error!("Test error message");
    }

    #[test]
    fn test_log_directory_creation() {
        let log_dir = create_log_directory("test-component").unwrap();
        assert!(log_dir.exists());
        assert!(log_dir.to_string_lossy().contains("test-component"));
    }

    #[test]
    fn test_repeated_initialization_does_not_panic() {
        ensure_test_logging(None);

        // A subscriber is already installed, so these report an error instead of panicking
        assert!(init_logging("test-repeat-1", false).is_err());
        assert!(init_simple_logging(Level::DEBUG).is_err());
    }
}
