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

//! Debug Adapter Protocol messages used by the client.
//!
//! Only the fields the engine reads are modeled; everything else in a message is ignored.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{RawVariable, Scope, StackFrame};

/// An outgoing request
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Sequence number of the message
    pub seq: i64,
    /// Always `request`
    #[serde(rename = "type")]
    pub type_: &'static str,
    /// Command name
    pub command: String,
    /// Command arguments
    pub arguments: Value,
}

impl Request {
    /// Create a request
    pub fn new(seq: i64, command: impl Into<String>, arguments: Value) -> Self {
        Self { seq, type_: "request", command: command.into(), arguments }
    }
}

/// A response to a request, in either direction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Sequence number of the message
    #[serde(default)]
    pub seq: i64,
    /// Sequence number of the answered request
    pub request_seq: i64,
    /// Whether the request succeeded
    pub success: bool,
    /// Command of the answered request
    pub command: String,
    /// Error message when `success` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Command-specific result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// An event sent by the adapter
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Event {
    /// Sequence number of the message
    #[serde(default)]
    pub seq: i64,
    /// Event name
    pub event: String,
    /// Event-specific payload
    #[serde(default)]
    pub body: Option<Value>,
}

/// A request sent by the adapter to the client (`runInTerminal`, `startDebugging`)
#[derive(Debug, Clone, Deserialize)]
pub struct ReverseRequest {
    /// Sequence number of the message
    pub seq: i64,
    /// Command name
    pub command: String,
}

/// Any message received from the adapter
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IncomingMessage {
    /// Answer to one of our requests
    Response(Response),
    /// Asynchronous notification
    Event(Event),
    /// Request from the adapter
    Request(ReverseRequest),
}

/// Body of a `stopped` event
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoppedBody {
    /// Why the thread stopped
    pub reason: String,
    /// The stopped thread
    #[serde(default)]
    pub thread_id: Option<i64>,
}

/// Body of an `exited` event
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitedBody {
    /// Process exit code
    pub exit_code: i64,
}

/// Body of an `output` event
#[derive(Debug, Clone, Deserialize)]
pub struct OutputBody {
    /// Output category (`stdout`, `stderr`, `console`, ...)
    #[serde(default)]
    pub category: Option<String>,
    /// The output text
    pub output: String,
}

/// A source file reference
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// Path on disk; absent for sources only reachable through `sourceReference`
    #[serde(default)]
    pub path: Option<String>,
}

/// One entry of a `stackTrace` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DapStackFrame {
    /// Frame id
    pub id: i64,
    /// Function name
    pub name: String,
    /// Current line
    #[serde(default)]
    pub line: u32,
    /// Source of the frame
    #[serde(default)]
    pub source: Option<Source>,
}

impl From<DapStackFrame> for StackFrame {
    fn from(frame: DapStackFrame) -> Self {
        let source = frame.source.and_then(|source| source.path).map(PathBuf::from);
        Self { id: frame.id, name: frame.name, line: frame.line, source }
    }
}

/// Body of a `stackTrace` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceBody {
    /// Frames, innermost first
    pub stack_frames: Vec<DapStackFrame>,
}

/// One entry of a `scopes` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DapScope {
    /// Scope name
    pub name: String,
    /// Reference to list the scope's variables
    pub variables_reference: u64,
    /// Whether listing is costly
    #[serde(default)]
    pub expensive: bool,
}

impl From<DapScope> for Scope {
    fn from(scope: DapScope) -> Self {
        Self {
            name: scope.name,
            variables_reference: scope.variables_reference,
            expensive: scope.expensive,
        }
    }
}

/// Body of a `scopes` response
#[derive(Debug, Clone, Deserialize)]
pub struct ScopesBody {
    /// Scopes of the frame
    pub scopes: Vec<DapScope>,
}

/// One entry of a `variables` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DapVariable {
    /// Variable name
    pub name: String,
    /// Printed value
    pub value: String,
    /// Type name, when the adapter reports types
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    /// Reference to expand the variable, `0` for scalars
    #[serde(default)]
    pub variables_reference: u64,
}

impl From<DapVariable> for RawVariable {
    fn from(var: DapVariable) -> Self {
        Self {
            name: var.name,
            declared_type: var.type_.unwrap_or_default(),
            raw_value_text: var.value,
            raw_reference_id: var.variables_reference,
        }
    }
}

/// Body of a `variables` response
#[derive(Debug, Clone, Deserialize)]
pub struct VariablesBody {
    /// The variables
    pub variables: Vec<DapVariable>,
}

/// Breakpoints to set in one source file before the debuggee starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBreakpoints {
    /// Source file
    pub path: PathBuf,
    /// Lines to break at
    pub lines: Vec<u32>,
}
