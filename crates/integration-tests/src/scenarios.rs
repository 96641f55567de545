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

//! Scripted debuggee pauses modelled on what `debugpy` and `java-debug` report.

use snaptrace_engine::{test_utils::ScriptedPause, RawVariable, StackFrame};

/// Source file of the scripted Python program
pub const PYTHON_SOURCE: &str = "/work/demo.py";

/// Source file of the scripted Java program
pub const JAVA_SOURCE: &str = "/work/Main.java";

/// A scalar variable
pub fn scalar(name: &str, declared_type: &str, text: &str) -> RawVariable {
    RawVariable::new(name, declared_type, text, 0)
}

/// An `int` variable
pub fn int(name: &str, value: i64) -> RawVariable {
    scalar(name, "int", &value.to_string())
}

/// The Python module frame at `line`
pub fn module_frame(line: u32) -> StackFrame {
    StackFrame::new(1, "<module>", line, PYTHON_SOURCE)
}

/// A Python function frame
pub fn function_frame(id: i64, name: &str, line: u32) -> StackFrame {
    StackFrame::new(id, name, line, PYTHON_SOURCE)
}

/// Module-level pause with the given locals
pub fn module_pause(line: u32, locals: Vec<RawVariable>) -> ScriptedPause {
    ScriptedPause::new().frame(module_frame(line), locals)
}

/// `x = 1`
pub fn scalar_local() -> ScriptedPause {
    module_pause(1, vec![int("x", 1)])
}

/// `simpleList = [1, 2, 3, 4, 5]`, expandable under reference 42
pub fn five_element_list() -> ScriptedPause {
    let mut children: Vec<_> = (1..=5).map(|i| int(&(i - 1).to_string(), i)).collect();
    children.push(int("len()", 5));
    module_pause(2, vec![RawVariable::new("simpleList", "list", "[1, 2, 3, 4, 5]", 42)])
        .children(42, children)
}

/// `L = []; L.append(L)`
pub fn self_appending_list() -> ScriptedPause {
    let list = RawVariable::new("L", "list", "[[...]]", 7);
    module_pause(3, vec![list.clone()]).children(7, vec![list, int("len()", 1)])
}

/// `node` in `<module>` passed as `n` to `visit`, both printing the same identity
pub fn shared_object_in_two_frames() -> ScriptedPause {
    let repr = "<__main__.Node object at 0x7f3a2c>";
    ScriptedPause::new()
        .frame(function_frame(2, "visit", 9), vec![RawVariable::new("n", "Node", repr, 31)])
        .frame(module_frame(12), vec![RawVariable::new("node", "Node", repr, 30)])
        .children(31, vec![int("value", 4)])
        .children(30, vec![int("value", 4)])
}

/// A set and a dict the adapter only shows as printed text
pub fn printed_containers() -> ScriptedPause {
    module_pause(
        4,
        vec![
            RawVariable::new("s", "set", "{1, 2, 3}", 50),
            RawVariable::new("d", "dict", "{'a': 1}", 51),
        ],
    )
    .children(50, vec![])
    .children(51, vec![])
}

/// `main` of a Java program holding an `ArrayList<Integer>`
pub fn java_list_in_main(line: u32) -> ScriptedPause {
    ScriptedPause::new()
        .frame(
            StackFrame::new(1, "main", line, JAVA_SOURCE),
            vec![
                RawVariable::new("args", "String[]", "String[0]@17", 17),
                RawVariable::new("xs", "ArrayList<Integer>", "ArrayList@23 size=2", 23),
            ],
        )
        .children(17, vec![])
        .children(
            23,
            vec![
                RawVariable::new("[0]", "Integer", "Integer@24", 24),
                RawVariable::new("[1]", "Integer", "Integer@25", 25),
            ],
        )
        .children(24, vec![int("value", 10)])
        .children(25, vec![int("value", 20)])
}
