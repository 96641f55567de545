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

//! Stack builder.
//!
//! Turns each active frame into a [`StackElem`]: the frame's local scopes are listed,
//! bookkeeping pseudo-variables dropped, and every remaining variable classified through
//! the [`HeapBuilder`]. Frames are handled innermost first and share one heap, so an object
//! visible from several frames is expanded once.

use snaptrace_common::types::{Heap, StackElem};

use crate::{
    heap::{AuxNode, HeapBuilder},
    InspectionService, RawVariable, SessionContext, StackFrame,
};

/// Frames and heap of one pause
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackBuild {
    /// One element per frame, innermost first
    pub stack: Vec<StackElem>,
    /// Heap reachable from all frames
    pub heap: Heap,
    /// Synthetic, partial and placeholder heap nodes
    pub auxiliary: Vec<AuxNode>,
}

/// Build the stack and heap of the current pause
pub async fn build_stack<S: InspectionService + ?Sized>(
    session: &mut SessionContext,
    service: &mut S,
    frames: &[StackFrame],
) -> StackBuild {
    let mut build = StackBuild::default();

    for frame in frames {
        let locals = local_variables(session, service, frame).await;
        let mut elem = StackElem::new(&frame.name, frame.id);

        let mut builder = HeapBuilder::new(session, service, std::mem::take(&mut build.heap));
        for raw in &locals {
            match builder.value_of(raw).await {
                Ok(value) => {
                    elem.locals.insert(raw.name.clone(), value);
                }
                Err(e) => builder.record_diagnostic(&raw.name, e),
            }
        }
        builder.run().await;

        let heap = builder.finish();
        build.heap = heap.heap;
        build.auxiliary.extend(heap.auxiliary);
        build.stack.push(elem);
    }

    build
}

/// Program variables of a frame's local scopes
async fn local_variables<S: InspectionService + ?Sized>(
    session: &mut SessionContext,
    service: &mut S,
    frame: &StackFrame,
) -> Vec<RawVariable> {
    let scopes = match service.scopes(frame.id).await {
        Ok(scopes) => scopes,
        Err(e) => {
            session.record_diagnostic(format!("frame {}", frame.name), e);
            return Vec::new();
        }
    };

    let local_scopes: Vec<_> =
        scopes.into_iter().filter(|scope| session.convention().is_local_scope(scope)).collect();

    let mut locals = Vec::new();
    for scope in &local_scopes {
        match service.variables(scope.variables_reference).await {
            Ok(variables) => locals.extend(variables),
            Err(e) => {
                session.record_diagnostic(format!("frame {} scope {}", frame.name, scope.name), e)
            }
        }
    }

    locals.retain(|var| !session.convention().is_bookkeeping(var));
    locals
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use snaptrace_common::types::{Address, HeapValue, Value};

    use super::*;
    use crate::{
        test_utils::{ScriptedInspector, ScriptedPause},
        InspectionService, Scope, TraceConfig,
    };

    async fn run(pause: ScriptedPause) -> (StackBuild, SessionContext) {
        let mut inspector = ScriptedInspector::new([pause]);
        inspector.next_event().await.unwrap();
        let frames = inspector.stack_frames(1).await.unwrap();
        let mut session = SessionContext::new(TraceConfig::default());
        session.begin_pause();
        let build = build_stack(&mut session, &mut inspector, &frames).await;
        (build, session)
    }

    #[tokio::test]
    async fn test_scalar_local() {
        let pause = ScriptedPause::new().frame(
            StackFrame::new(1, "<module>", 1, "main.py"),
            vec![RawVariable::new("x", "int", "1", 0)],
        );

        let (build, _) = run(pause).await;

        assert_eq!(build.stack.len(), 1);
        assert_eq!(build.stack[0].locals.get("x"), Some(&Value::Int(1)));
        assert!(build.heap.is_empty());
    }

    #[tokio::test]
    async fn test_frames_innermost_first_and_bookkeeping_hidden() {
        let pause = ScriptedPause::new()
            .frame(
                StackFrame::new(2, "f", 5, "main.py"),
                vec![
                    RawVariable::new("n", "int", "3", 0),
                    RawVariable::new("special variables", "", "", 90),
                ],
            )
            .frame(
                StackFrame::new(1, "<module>", 9, "main.py"),
                vec![
                    RawVariable::new("f", "function", "<function f at 0x1>", 91),
                    RawVariable::new("__name__", "str", "'__main__'", 0),
                    RawVariable::new("y", "bool", "True", 0),
                ],
            )
            .scope(1, Scope::new("Globals", 77), vec![RawVariable::new("g", "int", "1", 0)]);

        let (build, _) = run(pause).await;

        let names: Vec<_> = build.stack.iter().map(|frame| frame.frame_name.as_str()).collect();
        assert_eq!(names, vec!["f", "<module>"]);
        assert_eq!(build.stack[0].locals.keys().collect::<Vec<_>>(), vec!["n"]);
        assert_eq!(build.stack[1].locals.keys().collect::<Vec<_>>(), vec!["y"]);
        assert_eq!(build.stack[1].locals["y"], Value::Bool("True".into()));
    }

    #[tokio::test]
    async fn test_object_shared_by_two_frames() {
        let node =
            |reference| RawVariable::new("node", "Node", "<Node object at 0xbeef>", reference);
        let pause = ScriptedPause::new()
            .frame(StackFrame::new(2, "visit", 3, "main.py"), vec![node(10)])
            .frame(StackFrame::new(1, "<module>", 8, "main.py"), vec![node(20)])
            .children(10, vec![RawVariable::new("val", "int", "1", 0)])
            .children(20, vec![RawVariable::new("val", "int", "2", 0)]);

        let (build, _) = run(pause).await;

        assert_eq!(build.stack[0].locals["node"], Value::reference(10));
        assert_eq!(build.stack[1].locals["node"], Value::reference(10));
        assert_eq!(build.heap.len(), 1);
        // The inner frame reached it first
        assert_eq!(
            build.heap[&Address(10)],
            HeapValue::Instance([("val".to_string(), Value::Int(1))].into_iter().collect())
        );
    }

    #[tokio::test]
    async fn test_bad_local_is_dropped_with_diagnostic() {
        let pause = ScriptedPause::new().frame(
            StackFrame::new(1, "<module>", 1, "main.py"),
            vec![
                RawVariable::new("big", "int", "99999999999999999999999", 0),
                RawVariable::new("ok", "int", "1", 0),
            ],
        );

        let (build, session) = run(pause).await;

        assert_eq!(build.stack[0].locals.keys().collect::<Vec<_>>(), vec!["ok"]);
        assert_eq!(session.diagnostics()[0].subject, "big");
    }
}
