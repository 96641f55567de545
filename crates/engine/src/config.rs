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

//! Trace generation settings.

use std::{collections::BTreeSet, fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

/// Default upper bound on the number of pauses handled in one trace generation
pub const DEFAULT_MAX_STEPS: usize = 10_000;

/// Default upper bound on the number of heap nodes expanded per pause
pub const DEFAULT_MAX_HEAP_NODES: usize = 10_000;

/// Default timeout for a single inspection request
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Source language of the debuggee, which selects the variable-encoding convention
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// CPython via `debugpy`
    #[default]
    Python,
    /// JVM languages via `java-debug`
    Java,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Python => f.write_str("python"),
            Self::Java => f.write_str("java"),
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Self::Python),
            "java" => Ok(Self::Java),
            other => Err(format!("unsupported language `{other}` (expected `python` or `java`)")),
        }
    }
}

/// Configuration for one trace generation.
///
/// Deserializable from the `[trace]` table of the configuration file; every field has a
/// default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TraceConfig {
    /// Variable-encoding convention of the debuggee
    pub language: Language,
    /// Name of the frame that marks the start of traceable code; the language default
    /// (`<module>` / `main`) when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_frame: Option<String>,
    /// Maximum number of pauses handled before the trace is cut off
    pub max_steps: usize,
    /// Maximum number of heap nodes expanded per pause
    pub max_heap_nodes: usize,
    /// Lines that are always stepped over with `next` instead of `stepIn`
    pub declaration_lines: BTreeSet<u32>,
    /// Whether to detect declaration lines from the source text
    pub detect_declarations: bool,
    /// Timeout for a single inspection request, in seconds
    pub request_timeout_secs: u64,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            language: Language::default(),
            entry_frame: None,
            max_steps: DEFAULT_MAX_STEPS,
            max_heap_nodes: DEFAULT_MAX_HEAP_NODES,
            declaration_lines: BTreeSet::new(),
            detect_declarations: true,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl TraceConfig {
    /// Set the debuggee language
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Set the entry frame name
    pub fn with_entry_frame(mut self, name: impl Into<String>) -> Self {
        self.entry_frame = Some(name.into());
        self
    }

    /// Set the pause limit
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Set the per-pause heap node budget
    pub fn with_max_heap_nodes(mut self, max_heap_nodes: usize) -> Self {
        self.max_heap_nodes = max_heap_nodes;
        self
    }

    /// Flag lines to be stepped over
    pub fn with_declaration_lines(mut self, lines: impl IntoIterator<Item = u32>) -> Self {
        self.declaration_lines.extend(lines);
        self
    }

    /// Enable or disable declaration detection from source text
    pub fn with_detect_declarations(mut self, detect: bool) -> Self {
        self.detect_declarations = detect;
        self
    }

    /// Set the per-request timeout in seconds
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
