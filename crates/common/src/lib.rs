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

//! SnapTrace Common - Shared functionality for SnapTrace components
//!
//! This crate provides the trace data model shared by the engine, the command line tool
//! and the visualizer-facing JSON output, plus logging setup.

/// Trace data model: values, heap nodes, frames, snapshots and traces
pub mod types;

/// Environment variable names used across SnapTrace components
pub mod env;
/// Logging setup and utilities for consistent logging across SnapTrace components
pub mod logging;

pub use logging::*;
