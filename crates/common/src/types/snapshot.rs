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

//! Per-pause snapshots

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{map_repr, Address, HeapValue, Value};

/// Mapping from canonical address to heap node
pub type Heap = IndexMap<Address, HeapValue>;

/// One active frame and its local variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackElem {
    /// Name of the function executing in this frame
    pub frame_name: String,
    /// Frame id reported by the inspection service
    pub frame_id: i64,
    /// Local variables by name, in the order they were reported
    #[serde(with = "map_repr")]
    pub locals: IndexMap<String, Value>,
}

impl StackElem {
    /// Create a frame with no locals
    pub fn new(frame_name: impl Into<String>, frame_id: i64) -> Self {
        Self { frame_name: frame_name.into(), frame_id, locals: IndexMap::new() }
    }
}

/// Complete, self-contained snapshot of the debuggee at one pause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendTraceElem {
    /// Current source line of the innermost frame
    pub line: u32,
    /// Active frames, innermost first
    pub stack: Vec<StackElem>,
    /// Every heap node reachable from `stack`
    #[serde(with = "map_repr")]
    pub heap: Heap,
}

impl BackendTraceElem {
    /// Create a snapshot
    pub fn new(line: u32, stack: Vec<StackElem>, heap: Heap) -> Self {
        Self { line, stack, heap }
    }

    /// Addresses referenced from the stack or the heap that have no heap entry
    ///
    /// Empty for every well-formed snapshot.
    pub fn dangling_references(&self) -> BTreeSet<Address> {
        let from_stack = self.stack.iter().flat_map(|frame| frame.locals.values());
        let from_heap = self.heap.values().flat_map(HeapValue::values);

        from_stack
            .chain(from_heap)
            .filter_map(Value::as_ref_address)
            .filter(|address| !self.heap.contains_key(address))
            .collect()
    }

    /// A key that is equal for two snapshots exactly when they hold the same line, frames
    /// and heap content, ignoring the order of heap entries and locals.
    ///
    /// Field order inside heap nodes is kept, since a dict's insertion order is program
    /// state.
    pub fn canonical_key(&self) -> String {
        let mut canonical = self.clone();
        canonical.heap.sort_keys();
        canonical.stack.iter_mut().for_each(|frame| frame.locals.sort_keys());
        format!("{canonical:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(locals: &[(&str, Value)]) -> StackElem {
        let mut frame = StackElem::new("main", 1);
        for (name, value) in locals {
            frame.locals.insert(name.to_string(), value.clone());
        }
        frame
    }

    #[test]
    fn test_dangling_references() {
        let mut heap = Heap::new();
        heap.insert(Address(1), HeapValue::List(vec![Value::reference(2)]));
        let elem = BackendTraceElem::new(3, vec![frame(&[("xs", Value::reference(1))])], heap);

        assert_eq!(elem.dangling_references().into_iter().collect::<Vec<_>>(), vec![Address(2)]);
    }

    #[test]
    fn test_canonical_key_ignores_order() {
        let a = BackendTraceElem::new(
            1,
            vec![frame(&[("x", Value::Int(1)), ("y", Value::Int(2))])],
            Heap::new(),
        );
        let b = BackendTraceElem::new(
            1,
            vec![frame(&[("y", Value::Int(2)), ("x", Value::Int(1))])],
            Heap::new(),
        );
        assert_eq!(a.canonical_key(), b.canonical_key());

        let c = BackendTraceElem::new(2, a.stack.clone(), Heap::new());
        assert_ne!(a.canonical_key(), c.canonical_key());
    }

    #[test]
    fn test_canonical_key_keeps_dict_order() {
        let dict = |entries: &[(&str, i64)]| {
            let fields = entries.iter().map(|(k, v)| (k.to_string(), Value::Int(*v))).collect();
            let mut heap = Heap::new();
            heap.insert(Address(1), HeapValue::Dict(fields));
            BackendTraceElem::new(1, vec![frame(&[("d", Value::reference(1))])], heap)
        };

        let ab = dict(&[("a", 1), ("b", 2)]);
        let ba = dict(&[("b", 2), ("a", 1)]);
        assert_ne!(ab.canonical_key(), ba.canonical_key());
        assert_eq!(ab.canonical_key(), dict(&[("a", 1), ("b", 2)]).canonical_key());
    }
}
