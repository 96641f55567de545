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

//! Per-trace-generation state.
//!
//! Everything that must survive from one pause to the next lives in a [`SessionContext`]
//! owned by the running trace generation: the identity map, the stepping flags consumed
//! by the step director, the diagnostics recorded so far and a cache of source files.
//! Nothing here is global, so concurrent trace generations never interfere.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;
use snaptrace_common::types::Address;
use tracing::{debug, warn};

use crate::{
    convention::{convention_for, Convention},
    identity::{IdentityMap, PauseAddresses},
    StackFrame, TraceConfig,
};

/// A node-level problem that was contained instead of aborting the trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Pause number (1-based) the problem occurred at
    pub pause: usize,
    /// What was being processed (a variable name, a frame, a request)
    pub subject: String,
    /// What went wrong
    pub message: String,
}

/// Stepping state carried from one pause to the next
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFlags {
    /// At least one snapshot has been recorded
    pub recorded_any: bool,
    /// A `next` was issued at this stack depth; a deeper pause means it dove into a call
    pub is_next_request: Option<usize>,
    /// A `stepOut` was issued to leave frames without source
    pub synthetic_step_pending: bool,
    /// The pause that completed that `stepOut` is being handled
    pub synthetic_step_finished: bool,
}

/// Scratch state of the pause being processed
#[derive(Debug, Default)]
pub(crate) struct PauseState {
    pub(crate) addresses: PauseAddresses,
    pub(crate) expanded_nodes: usize,
}

/// State of one trace generation
#[derive(Debug)]
pub struct SessionContext {
    config: TraceConfig,
    convention: Box<dyn Convention>,
    entry_frame: String,
    /// Identity token → canonical address
    pub identities: IdentityMap,
    /// Flags consumed by the step director
    pub flags: SessionFlags,
    pub(crate) pause: PauseState,
    pauses_seen: usize,
    diagnostics: Vec<Diagnostic>,
    sources: HashMap<PathBuf, Option<Vec<String>>>,
}

impl SessionContext {
    /// Start a session for the given configuration
    pub fn new(config: TraceConfig) -> Self {
        let convention = convention_for(config.language);
        let entry_frame = config
            .entry_frame
            .clone()
            .unwrap_or_else(|| convention.default_entry_frame().to_string());

        Self {
            config,
            convention,
            entry_frame,
            identities: IdentityMap::new(),
            flags: SessionFlags::default(),
            pause: PauseState::default(),
            pauses_seen: 0,
            diagnostics: Vec::new(),
            sources: HashMap::new(),
        }
    }

    /// The configuration of this session
    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// The language convention of this session
    pub fn convention(&self) -> &dyn Convention {
        self.convention.as_ref()
    }

    /// Name of the frame that marks the start of traceable code
    pub fn entry_frame(&self) -> &str {
        &self.entry_frame
    }

    /// Start handling a new pause
    pub fn begin_pause(&mut self) {
        self.pauses_seen += 1;
        self.pause = PauseState::default();
    }

    /// Number of pauses handled so far
    pub fn pauses_seen(&self) -> usize {
        self.pauses_seen
    }

    /// Record a contained node-level problem
    pub fn record_diagnostic(&mut self, subject: impl Into<String>, message: impl ToString) {
        let diagnostic = Diagnostic {
            pause: self.pauses_seen,
            subject: subject.into(),
            message: message.to_string(),
        };
        warn!(pause = diagnostic.pause, subject = %diagnostic.subject, "{}", diagnostic.message);
        self.diagnostics.push(diagnostic);
    }

    /// Diagnostics recorded so far
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Address of an object without identity token
    pub(crate) fn untracked_address(&mut self, raw_reference_id: u64) -> Address {
        self.pause.addresses.untracked(&self.identities, raw_reference_id)
    }

    /// Fresh per-pause address
    pub(crate) fn synthetic_address(&mut self) -> Address {
        self.pause.addresses.synthetic()
    }

    /// Whether the frame's current line is a declaration to be stepped over
    pub fn is_declaration_line(&mut self, frame: &StackFrame) -> bool {
        if self.config.declaration_lines.contains(&frame.line) {
            return true;
        }
        if !self.config.detect_declarations {
            return false;
        }

        let convention = self.convention.as_ref();
        frame
            .source
            .as_ref()
            .and_then(|path| source_line(&mut self.sources, path, frame.line))
            .is_some_and(|text| convention.is_declaration_line(text))
    }
}

/// Line `line` (1-based) of the file at `path`, loading the file on first use
fn source_line<'a>(
    sources: &'a mut HashMap<PathBuf, Option<Vec<String>>>,
    path: &Path,
    line: u32,
) -> Option<&'a str> {
    let lines = sources.entry(path.to_path_buf()).or_insert_with(|| match fs::read_to_string(path) {
        Ok(text) => Some(text.lines().map(str::to_string).collect()),
        Err(e) => {
            debug!(path = %path.display(), "source not readable: {e}");
            None
        }
    });

    let index = usize::try_from(line).ok()?.checked_sub(1)?;
    lines.as_ref()?.get(index).map(String::as_str)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::Language;

    #[test]
    fn test_entry_frame_defaults_per_language() {
        let session = SessionContext::new(TraceConfig::default());
        assert_eq!(session.entry_frame(), "<module>");

        let session = SessionContext::new(TraceConfig::default().with_language(Language::Java));
        assert_eq!(session.entry_frame(), "main");

        let session = SessionContext::new(TraceConfig::default().with_entry_frame("run"));
        assert_eq!(session.entry_frame(), "run");
    }

    #[test]
    fn test_diagnostics_carry_pause_number() {
        let mut session = SessionContext::new(TraceConfig::default());
        session.begin_pause();
        session.begin_pause();
        session.record_diagnostic("xs", "boom");

        assert_eq!(
            session.diagnostics(),
            &[Diagnostic { pause: 2, subject: "xs".into(), message: "boom".into() }]
        );
    }

    #[test]
    fn test_declaration_lines_from_source_and_config() {
        let mut file = tempfile_with("import os\nx = 1\ndef f():\n    return x\n");
        let path = file.path().to_path_buf();
        file.flush().unwrap();

        let mut session = SessionContext::new(TraceConfig::default().with_declaration_lines([4]));
        let frame = |line| StackFrame::new(1, "<module>", line, path.clone());

        assert!(session.is_declaration_line(&frame(1)));
        assert!(!session.is_declaration_line(&frame(2)));
        assert!(session.is_declaration_line(&frame(3)));
        assert!(session.is_declaration_line(&frame(4)));
        assert!(!session.is_declaration_line(&frame(99)));
        assert!(!session.is_declaration_line(&StackFrame::without_source(2, "f", 3)));
    }

    #[test]
    fn test_detection_can_be_disabled() {
        let file = tempfile_with("def f():\n");
        let mut session =
            SessionContext::new(TraceConfig::default().with_detect_declarations(false));
        assert!(!session.is_declaration_line(&StackFrame::new(1, "<module>", 1, file.path())));
    }

    fn tempfile_with(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }
}
