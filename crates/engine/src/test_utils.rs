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

//! Test utilities: an in-memory inspection service that replays scripted pauses.
//!
//! A [`ScriptedInspector`] hands out one [`ScriptedPause`] per `next_event`, answers
//! frame/scope/variable requests from the pause's tables, and records every stepping
//! command it receives so tests can check what the step director decided.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;

use crate::{
    InspectionError, InspectionService, PauseEvent, RawVariable, Scope, StackFrame, StepCommand,
};

/// Variables reference of the scripted `Locals` scope of frame `frame_id`
pub fn locals_reference(frame_id: i64) -> u64 {
    1_000_000 + frame_id.unsigned_abs()
}

/// One scripted pause
#[derive(Debug, Clone)]
pub struct ScriptedPause {
    thread_id: i64,
    reason: String,
    frames: Vec<StackFrame>,
    scopes: HashMap<i64, Vec<Scope>>,
    variables: HashMap<u64, Vec<RawVariable>>,
    failing: HashSet<u64>,
}

impl Default for ScriptedPause {
    fn default() -> Self {
        Self {
            thread_id: 1,
            reason: "step".to_string(),
            frames: Vec::new(),
            scopes: HashMap::new(),
            variables: HashMap::new(),
            failing: HashSet::new(),
        }
    }
}

impl ScriptedPause {
    /// An empty pause on thread 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a frame (outer frames after inner ones) with a `Locals` scope holding `locals`
    pub fn frame(mut self, frame: StackFrame, locals: Vec<RawVariable>) -> Self {
        let reference = locals_reference(frame.id);
        self.scopes.entry(frame.id).or_default().push(Scope::new("Locals", reference));
        self.variables.insert(reference, locals);
        self.frames.push(frame);
        self
    }

    /// Add another scope to an already added frame
    pub fn scope(mut self, frame_id: i64, scope: Scope, variables: Vec<RawVariable>) -> Self {
        self.variables.insert(scope.variables_reference, variables);
        self.scopes.entry(frame_id).or_default().push(scope);
        self
    }

    /// Children listed when `reference` is expanded
    pub fn children(mut self, reference: u64, children: Vec<RawVariable>) -> Self {
        self.variables.insert(reference, children);
        self
    }

    /// Make expanding `reference` fail
    pub fn failing(mut self, reference: u64) -> Self {
        self.failing.insert(reference);
        self
    }

    /// Set the stop reason
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

/// How a script ends once its pauses are used up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptEnd {
    /// The debuggee exits with this code
    Exit(i64),
    /// The service disconnects
    Disconnect,
}

/// In-memory [`InspectionService`] replaying [`ScriptedPause`]s in order
#[derive(Debug)]
pub struct ScriptedInspector {
    pending: VecDeque<ScriptedPause>,
    current: Option<ScriptedPause>,
    commands: Vec<StepCommand>,
    variable_requests: usize,
    end: ScriptEnd,
    exited: bool,
    shut_down: bool,
}

impl ScriptedInspector {
    /// Replay `pauses`, then exit with code 0
    pub fn new(pauses: impl IntoIterator<Item = ScriptedPause>) -> Self {
        Self {
            pending: pauses.into_iter().collect(),
            current: None,
            commands: Vec::new(),
            variable_requests: 0,
            end: ScriptEnd::Exit(0),
            exited: false,
            shut_down: false,
        }
    }

    /// Change how the script ends
    pub fn ending_with(mut self, end: ScriptEnd) -> Self {
        self.end = end;
        self
    }

    /// Stepping commands received so far
    pub fn commands(&self) -> &[StepCommand] {
        &self.commands
    }

    /// Number of `variables` requests served so far
    pub fn variable_requests(&self) -> usize {
        self.variable_requests
    }

    /// Whether `shutdown` was called
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    fn stopped(&self) -> Result<&ScriptedPause, InspectionError> {
        self.current.as_ref().ok_or_else(|| InspectionError::Protocol("not stopped".to_string()))
    }
}

#[async_trait]
impl InspectionService for ScriptedInspector {
    async fn stack_frames(&mut self, _thread_id: i64) -> Result<Vec<StackFrame>, InspectionError> {
        Ok(self.stopped()?.frames.clone())
    }

    async fn scopes(&mut self, frame_id: i64) -> Result<Vec<Scope>, InspectionError> {
        Ok(self.stopped()?.scopes.get(&frame_id).cloned().unwrap_or_default())
    }

    async fn variables(&mut self, reference: u64) -> Result<Vec<RawVariable>, InspectionError> {
        self.variable_requests += 1;
        let pause = self.stopped()?;
        let failure = |message: &str| InspectionError::Request {
            command: "variables".to_string(),
            message: format!("{message} {reference}"),
        };

        if pause.failing.contains(&reference) {
            return Err(failure("cannot expand reference"));
        }
        pause.variables.get(&reference).cloned().ok_or_else(|| failure("unknown reference"))
    }

    async fn resume(
        &mut self,
        _thread_id: i64,
        command: StepCommand,
    ) -> Result<(), InspectionError> {
        self.stopped()?;
        self.commands.push(command);
        self.current = None;
        Ok(())
    }

    async fn next_event(&mut self) -> Result<PauseEvent, InspectionError> {
        if let Some(pause) = &self.current {
            // Still stopped: report the same pause again
            return Ok(PauseEvent::Stopped {
                thread_id: pause.thread_id,
                reason: pause.reason.clone(),
            });
        }

        if let Some(pause) = self.pending.pop_front() {
            let event =
                PauseEvent::Stopped { thread_id: pause.thread_id, reason: pause.reason.clone() };
            self.current = Some(pause);
            return Ok(event);
        }

        match self.end {
            ScriptEnd::Exit(_) if self.exited => Ok(PauseEvent::Terminated),
            ScriptEnd::Exit(exit_code) => {
                self.exited = true;
                Ok(PauseEvent::Exited { exit_code })
            }
            ScriptEnd::Disconnect => Err(InspectionError::Disconnected),
        }
    }

    async fn shutdown(&mut self) -> Result<(), InspectionError> {
        self.shut_down = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_pauses_then_exits() {
        let pause = ScriptedPause::new().frame(
            StackFrame::new(1, "<module>", 3, "main.py"),
            vec![RawVariable::new("x", "int", "1", 0)],
        );
        let mut inspector = ScriptedInspector::new([pause]);

        assert_eq!(
            inspector.next_event().await.unwrap(),
            PauseEvent::Stopped { thread_id: 1, reason: "step".into() }
        );
        let frames = inspector.stack_frames(1).await.unwrap();
        let scopes = inspector.scopes(frames[0].id).await.unwrap();
        let locals = inspector.variables(scopes[0].variables_reference).await.unwrap();
        assert_eq!(locals[0].name, "x");

        inspector.resume(1, StepCommand::StepIn).await.unwrap();
        assert_eq!(inspector.next_event().await.unwrap(), PauseEvent::Exited { exit_code: 0 });
        assert_eq!(inspector.next_event().await.unwrap(), PauseEvent::Terminated);
        assert_eq!(inspector.commands(), &[StepCommand::StepIn]);
        assert!(inspector.resume(1, StepCommand::Next).await.is_err());
    }

    #[tokio::test]
    async fn test_failing_references() {
        let pause = ScriptedPause::new().children(7, vec![]).failing(8);
        let mut inspector = ScriptedInspector::new([pause]).ending_with(ScriptEnd::Disconnect);
        inspector.next_event().await.unwrap();

        assert!(inspector.variables(7).await.unwrap().is_empty());
        assert!(matches!(inspector.variables(8).await, Err(InspectionError::Request { .. })));
        assert!(inspector.variables(9).await.is_err());
        assert_eq!(inspector.variable_requests(), 3);

        inspector.resume(1, StepCommand::Continue).await.unwrap();
        assert!(matches!(inspector.next_event().await, Err(InspectionError::Disconnected)));
    }
}
