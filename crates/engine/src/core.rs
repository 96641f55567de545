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

//! Core engine functionality: trace generation.
//!
//! This module drives a paused debuggee one step at a time and turns every interesting
//! pause into a self-contained snapshot of its stack and heap.
//!
//! # Workflow Overview
//!
//! 1. **Wait**: Block on the inspection service until the debuggee pauses or exits
//! 2. **Decide**: Let the step director choose whether to record the pause and how to
//!    resume ([`decide_next_step`](crate::decide_next_step))
//! 3. **Snapshot**: Build frames and heap for recorded pauses ([`snapshot_pause`])
//! 4. **Resume**: Send the chosen stepping command
//! 5. **Assemble**: Once the debuggee exits, deduplicate the collected snapshots
//!
//! # Key Components
//!
//! - [`generate_trace`] - Main trace generation loop
//! - [`on_pause`] - Per-pause hook: decision plus optional snapshot
//! - [`GeneratedTrace`] / [`TraceSummary`] - The trace and what happened while building it

use snaptrace_common::types::{BackendTrace, BackendTraceElem};
use tracing::{debug, error, info, warn};

use crate::{
    build_stack, decide_next_step, Diagnostic, InspectionError, InspectionService, PauseEvent,
    PauseView, SessionContext, StackFrame, StepCommand, TraceAssembler, TraceConfig,
    TraceGenerationAborted,
};

/// Counters and diagnostics of one trace generation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceSummary {
    /// Pauses handled, recorded or not
    pub pauses: usize,
    /// Snapshots recorded before deduplication
    pub recorded: usize,
    /// Snapshots dropped as duplicates
    pub duplicates_removed: usize,
    /// Exit code reported by the debuggee, if it exited normally
    pub exit_code: Option<i64>,
    /// Whether the step limit cut the trace short
    pub truncated: bool,
    /// Node-level problems that were contained
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of a successful trace generation
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedTrace {
    /// The deduplicated trace
    pub trace: BackendTrace,
    /// What happened while building it
    pub summary: TraceSummary,
}

/// Outcome of handling one pause
#[derive(Debug, Clone, PartialEq)]
pub struct PauseOutcome {
    /// Snapshot of the pause, if it is recorded
    pub snapshot: Option<BackendTraceElem>,
    /// Command that resumes the debuggee
    pub command: StepCommand,
}

/// Build the snapshot of the current pause
pub async fn snapshot_pause<S: InspectionService + ?Sized>(
    session: &mut SessionContext,
    service: &mut S,
    frames: &[StackFrame],
) -> BackendTraceElem {
    let build = build_stack(session, service, frames).await;
    if !build.auxiliary.is_empty() {
        debug!(count = build.auxiliary.len(), "snapshot holds synthetic or partial nodes");
    }
    let line = frames.first().map(|frame| frame.line).unwrap_or_default();
    BackendTraceElem::new(line, build.stack, build.heap)
}

/// Handle a pause of `thread_id`: decide how to resume and snapshot it if recorded
pub async fn on_pause<S: InspectionService + ?Sized>(
    session: &mut SessionContext,
    service: &mut S,
    thread_id: i64,
) -> Result<PauseOutcome, InspectionError> {
    session.begin_pause();
    let frames = service.stack_frames(thread_id).await?;

    let declaration_line = frames.first().is_some_and(|frame| session.is_declaration_line(frame));
    let entry_frame = session.entry_frame().to_string();
    let decision = decide_next_step(
        &PauseView { frames: &frames, declaration_line },
        &entry_frame,
        &mut session.flags,
    );
    debug!(
        pause = session.pauses_seen(),
        depth = frames.len(),
        line = frames.first().map(|frame| frame.line),
        record = decision.record,
        after_step_out = session.flags.synthetic_step_finished,
        command = %decision.command,
        "step decision"
    );

    let snapshot = if decision.record {
        Some(snapshot_pause(session, service, &frames).await)
    } else {
        None
    };
    Ok(PauseOutcome { snapshot, command: decision.command })
}

/// Drive the debuggee to completion and return its deduplicated trace.
///
/// A debuggee that exits early, or an inspection service that fails after the first
/// pause, still yields the snapshots recorded so far. Fails only when the session never
/// produced a pause ([`TraceGenerationAborted::Startup`]) or no pause was recorded
/// ([`TraceGenerationAborted::NoPauses`]).
pub async fn generate_trace<S: InspectionService + ?Sized>(
    service: &mut S,
    config: TraceConfig,
) -> Result<GeneratedTrace, TraceGenerationAborted> {
    info!(language = %config.language, max_steps = config.max_steps, "Starting trace generation");

    let max_steps = config.max_steps;
    let mut session = SessionContext::new(config);
    let mut assembler = TraceAssembler::new();
    let mut summary = TraceSummary::default();

    loop {
        let event = match service.next_event().await {
            Ok(event) => event,
            Err(e) if session.pauses_seen() == 0 => {
                error!("Debuggee never paused: {e}");
                shutdown(service).await;
                return Err(TraceGenerationAborted::startup(e));
            }
            Err(e) => {
                warn!("Inspection service failed, keeping the trace recorded so far: {e}");
                break;
            }
        };

        let thread_id = match event {
            PauseEvent::Stopped { thread_id, reason } => {
                debug!(thread_id, %reason, "debuggee stopped");
                thread_id
            }
            PauseEvent::Exited { exit_code } => {
                info!(exit_code, "Debuggee exited");
                summary.exit_code = Some(exit_code);
                break;
            }
            PauseEvent::Terminated => {
                info!("Debug session terminated");
                break;
            }
        };

        if session.pauses_seen() >= max_steps {
            warn!(max_steps, "Step limit reached, cutting the trace short");
            summary.truncated = true;
            break;
        }

        let outcome = match on_pause(&mut session, service, thread_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Cannot inspect pause {}: {e}", session.pauses_seen());
                break;
            }
        };
        if let Some(snapshot) = outcome.snapshot {
            assembler.push(snapshot);
        }

        if let Err(e) = service.resume(thread_id, outcome.command).await {
            warn!("Cannot resume the debuggee with `{}`: {e}", outcome.command);
            break;
        }
    }

    shutdown(service).await;

    summary.pauses = session.pauses_seen();
    summary.recorded = assembler.len();
    let (trace, duplicates_removed) = assembler.finish();
    summary.duplicates_removed = duplicates_removed;
    summary.diagnostics = session.diagnostics().to_vec();

    if trace.is_empty() {
        error!(pauses = summary.pauses, "No snapshot was recorded");
        return Err(TraceGenerationAborted::NoPauses);
    }

    info!(
        pauses = summary.pauses,
        snapshots = trace.len(),
        duplicates_removed = summary.duplicates_removed,
        diagnostics = summary.diagnostics.len(),
        "Trace generation finished"
    );
    Ok(GeneratedTrace { trace, summary })
}

async fn shutdown<S: InspectionService + ?Sized>(service: &mut S) {
    if let Err(e) = service.shutdown().await {
        debug!("Shutting the inspection service down failed: {e}");
    }
}
