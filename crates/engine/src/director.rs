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

//! Step director.
//!
//! Decides, at every pause, whether to record a snapshot and which command resumes the
//! debuggee. The rules, in priority order:
//!
//! 1. A frame without source (runtime or library code) → `stepOut`, nothing recorded.
//!    The pause that follows completes this synthetic step.
//! 2. The entry frame is not on the stack (startup code) → `continue`, nothing recorded.
//! 3. A `next` was issued and the stack is now deeper (it stopped inside a call anyway)
//!    → `stepOut`, nothing recorded.
//! 4. Otherwise the pause is recorded. The first recorded pause, declaration lines and
//!    the pause completing a synthetic step advance with `next`; every other pause with
//!    `stepIn`. A completed `stepOut` stops mid-statement in the caller, where `stepIn`
//!    would re-enter the runtime code just left.
//!
//! All state lives in [`SessionFlags`], owned by the running trace generation.

use crate::{SessionFlags, StackFrame, StepCommand};

/// What the director knows about a pause
#[derive(Debug, Clone, Copy)]
pub struct PauseView<'a> {
    /// Frames of the stopped thread, innermost first
    pub frames: &'a [StackFrame],
    /// Whether the innermost frame is on a declaration line
    pub declaration_line: bool,
}

/// Outcome of one stepping decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDecision {
    /// Whether the pause is recorded in the trace
    pub record: bool,
    /// Command that resumes the debuggee
    pub command: StepCommand,
}

impl StepDecision {
    fn skip(command: StepCommand) -> Self {
        Self { record: false, command }
    }

    fn record(command: StepCommand) -> Self {
        Self { record: true, command }
    }
}

/// Decide what to do with the current pause
pub fn decide_next_step(
    view: &PauseView<'_>,
    entry_frame: &str,
    flags: &mut SessionFlags,
) -> StepDecision {
    if view.frames.is_empty() {
        return StepDecision::skip(StepCommand::Continue);
    }

    if view.frames.iter().any(|frame| frame.source.is_none()) {
        flags.synthetic_step_pending = true;
        flags.synthetic_step_finished = false;
        return StepDecision::skip(StepCommand::StepOut);
    }
    flags.synthetic_step_finished = std::mem::take(&mut flags.synthetic_step_pending);

    if !view.frames.iter().any(|frame| frame.name == entry_frame) {
        return StepDecision::skip(StepCommand::Continue);
    }

    let depth = view.frames.len();
    if let Some(requested) = flags.is_next_request.take() {
        if depth > requested {
            flags.is_next_request = Some(requested);
            return StepDecision::skip(StepCommand::StepOut);
        }
    }

    let first = !flags.recorded_any;
    flags.recorded_any = true;
    if first || view.declaration_line || flags.synthetic_step_finished {
        flags.is_next_request = Some(depth);
        StepDecision::record(StepCommand::Next)
    } else {
        StepDecision::record(StepCommand::StepIn)
    }
}
