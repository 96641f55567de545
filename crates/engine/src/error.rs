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

//! Error taxonomy of the engine.
//!
//! Node-level errors ([`ValueDecodeError`], [`CompositeParseError`], [`InspectionError`]
//! raised while expanding one node) are contained: they are turned into a
//! [`Diagnostic`](crate::Diagnostic) and the traversal goes on. Only
//! [`TraceGenerationAborted`] ends a trace generation without a trace.

use std::time::Duration;

use thiserror::Error;

/// A scalar variable whose printed text does not decode as its declared type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot decode {text:?} as {declared_type}: {reason}")]
pub struct ValueDecodeError {
    /// Declared type reported for the variable
    pub declared_type: String,
    /// The raw text that failed to decode
    pub text: String,
    /// Why decoding failed
    pub reason: String,
}

/// A printed composite literal that could not be read back as a structure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse printed {kind} {text:?}: {reason}")]
pub struct CompositeParseError {
    /// Container kind the text was parsed as
    pub kind: String,
    /// The printed text
    pub text: String,
    /// Why parsing failed
    pub reason: String,
}

/// Failure talking to the debuggee inspection service.
#[derive(Debug, Error)]
pub enum InspectionError {
    /// The service answered a request with `success: false`
    #[error("request `{command}` failed: {message}")]
    Request {
        /// Request command name
        command: String,
        /// Message returned by the service
        message: String,
    },

    /// Transport failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The service sent something that violates the protocol
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A response body did not have the expected shape
    #[error("malformed response: {0}")]
    Json(#[from] serde_json::Error),

    /// No response arrived in time
    #[error("request `{command}` timed out after {timeout:?}")]
    Timeout {
        /// Request command name
        command: String,
        /// How long the request waited
        timeout: Duration,
    },

    /// The service went away
    #[error("inspection service disconnected")]
    Disconnected,
}

/// Fatal conditions that end a trace generation without producing a trace.
///
/// The `Display` text of each variant is the single message shown to the user.
#[derive(Debug, Error)]
pub enum TraceGenerationAborted {
    /// The debuggee could not be started or the stepping session could not be set up
    #[error("could not start the debuggee: {0}")]
    Startup(String),

    /// The debuggee ran to completion without a single recordable pause
    #[error("no trace produced: the debuggee never paused in traceable code")]
    NoPauses,
}

impl TraceGenerationAborted {
    /// Setup failure caused by the inspection service
    pub fn startup(err: impl std::fmt::Display) -> Self {
        Self::Startup(err.to_string())
    }
}
