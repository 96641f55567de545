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

//! The seam between the engine and the debuggee.
//!
//! The engine never talks to a debugger directly. Everything it needs (listing frames,
//! scopes and variables of a paused debuggee, resuming it with a stepping command and
//! waiting for the next pause) goes through [`InspectionService`]. The
//! [`DapClient`](crate::dap::DapClient) implements it over the Debug Adapter Protocol;
//! [`ScriptedInspector`](crate::test_utils::ScriptedInspector) replays canned pauses in
//! tests.

use std::{fmt, path::PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::InspectionError;

/// One active frame of a paused thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    /// Frame id, valid for the current pause only
    pub id: i64,
    /// Name of the function executing in this frame
    pub name: String,
    /// Current line in `source` (1-based)
    pub line: u32,
    /// Source file; `None` for frames the debugger cannot map to source
    pub source: Option<PathBuf>,
}

impl StackFrame {
    /// Create a frame with a source path
    pub fn new(id: i64, name: impl Into<String>, line: u32, source: impl Into<PathBuf>) -> Self {
        Self { id, name: name.into(), line, source: Some(source.into()) }
    }

    /// Create a frame without source information
    pub fn without_source(id: i64, name: impl Into<String>, line: u32) -> Self {
        Self { id, name: name.into(), line, source: None }
    }
}

/// A named group of variables in one frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Display name (`Locals`, `Globals`, ...)
    pub name: String,
    /// Reference to list the scope's variables
    pub variables_reference: u64,
    /// Whether listing the scope is costly
    pub expensive: bool,
}

impl Scope {
    /// Create a cheap scope
    pub fn new(name: impl Into<String>, variables_reference: u64) -> Self {
        Self { name: name.into(), variables_reference, expensive: false }
    }
}

/// One inspected variable, exactly as the inspection service reported it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawVariable {
    /// Variable, field or element name
    pub name: String,
    /// Declared (or runtime) type name
    pub declared_type: String,
    /// Printed value
    pub raw_value_text: String,
    /// Reference to expand the variable; `0` when it cannot be expanded
    pub raw_reference_id: u64,
}

impl RawVariable {
    /// Create a raw variable
    pub fn new(
        name: impl Into<String>,
        declared_type: impl Into<String>,
        raw_value_text: impl Into<String>,
        raw_reference_id: u64,
    ) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            raw_value_text: raw_value_text.into(),
            raw_reference_id,
        }
    }

    /// Whether the variable can be expanded into children
    pub fn is_expandable(&self) -> bool {
        self.raw_reference_id != 0
    }
}

/// Control command that resumes a paused thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepCommand {
    /// Step into the next call, or to the next line
    StepIn,
    /// Step to the next line of the current frame
    Next,
    /// Run until the current frame returns
    StepOut,
    /// Run until the next breakpoint or exit
    Continue,
}

impl StepCommand {
    /// The protocol command name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StepIn => "stepIn",
            Self::Next => "next",
            Self::StepOut => "stepOut",
            Self::Continue => "continue",
        }
    }
}

impl fmt::Display for StepCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened after the debuggee was resumed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PauseEvent {
    /// A thread stopped and can be inspected
    Stopped {
        /// The stopped thread
        thread_id: i64,
        /// Why it stopped (`breakpoint`, `step`, `entry`, ...)
        reason: String,
    },
    /// The debuggee process exited
    Exited {
        /// Process exit code
        exit_code: i64,
    },
    /// The debugging session ended
    Terminated,
}

impl PauseEvent {
    /// Whether the event ends the session
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Stopped { .. })
    }
}

/// Request/response access to a paused debuggee.
///
/// Calls take `&mut self`, so at most one request is in flight per service.
#[async_trait]
pub trait InspectionService: Send {
    /// Frames of a stopped thread, innermost first
    async fn stack_frames(&mut self, thread_id: i64) -> Result<Vec<StackFrame>, InspectionError>;

    /// Scopes of a frame
    async fn scopes(&mut self, frame_id: i64) -> Result<Vec<Scope>, InspectionError>;

    /// Children of an expandable variable or scope
    async fn variables(&mut self, reference: u64) -> Result<Vec<RawVariable>, InspectionError>;

    /// Resume a stopped thread with a stepping command
    async fn resume(&mut self, thread_id: i64, command: StepCommand)
        -> Result<(), InspectionError>;

    /// Wait for the next pause or for the end of the session
    async fn next_event(&mut self) -> Result<PauseEvent, InspectionError>;

    /// Tear the session down; the default does nothing
    async fn shutdown(&mut self) -> Result<(), InspectionError> {
        Ok(())
    }
}
