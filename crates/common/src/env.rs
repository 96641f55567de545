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

//! Environment variable name constants for SnapTrace configuration.
//!
//! # Environment Variables
//!
//! - [`SNAPTRACE_CONFIG`] - Path of the TOML configuration file
//! - [`SNAPTRACE_LOG_DIR`] - Directory for log files
//! - [`SNAPTRACE_ADAPTER`] - Debug adapter command line

/// Environment variable for specifying the configuration file.
///
/// # Default
///
/// When not set, `./snaptrace.toml` is used if it exists, otherwise built-in defaults.
///
/// # Examples
///
/// ```bash
/// SNAPTRACE_CONFIG=~/traces/python.toml snaptrace trace demo.py
/// ```
///
/// # Related
///
/// Also available as the `--config` CLI argument, which takes precedence.
pub const SNAPTRACE_CONFIG: &str = "SNAPTRACE_CONFIG";

/// Environment variable for the directory that receives log files.
///
/// Only used when file logging is enabled (`--log-file`). Each component logs into its
/// own sub-directory.
///
/// # Default
///
/// `<system temp dir>/snaptrace-logs`
pub const SNAPTRACE_LOG_DIR: &str = "SNAPTRACE_LOG_DIR";

/// Environment variable for the debug adapter command line.
///
/// The first whitespace-separated word is the executable, the rest are its arguments
/// (e.g. `python -m debugpy.adapter`).
///
/// # Related
///
/// Overrides `adapter.command`/`adapter.args` from the configuration file; the
/// `--adapter` CLI argument takes precedence over both.
pub const SNAPTRACE_ADAPTER: &str = "SNAPTRACE_ADAPTER";
