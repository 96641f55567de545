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

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use super::BackendTraceElem;

/// Ordered sequence of snapshots spanning one debuggee run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendTrace {
    inner: Vec<BackendTraceElem>,
}

impl Deref for BackendTrace {
    type Target = Vec<BackendTraceElem>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for BackendTrace {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl From<Vec<BackendTraceElem>> for BackendTrace {
    fn from(inner: Vec<BackendTraceElem>) -> Self {
        Self { inner }
    }
}

impl FromIterator<BackendTraceElem> for BackendTrace {
    fn from_iter<I: IntoIterator<Item = BackendTraceElem>>(iter: I) -> Self {
        Self { inner: iter.into_iter().collect() }
    }
}

impl BackendTrace {
    /// Create a new empty trace
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a snapshot to this trace
    pub fn push(&mut self, elem: BackendTraceElem) {
        self.inner.push(elem);
    }

    /// Get the number of snapshots
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the trace is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Convert trace to serde_json::Value for the visualizer
    pub fn to_json_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Render the trace as a JSON document
    pub fn to_json_string(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }

    /// Load a trace previously written with [`BackendTrace::to_json_string`]
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

// IntoIterator for owned BackendTrace (moves out its contents)
impl IntoIterator for BackendTrace {
    type Item = BackendTraceElem;
    type IntoIter = std::vec::IntoIter<BackendTraceElem>;
    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

// IntoIterator for &BackendTrace (shared iteration)
impl<'a> IntoIterator for &'a BackendTrace {
    type Item = &'a BackendTraceElem;
    type IntoIter = std::slice::Iter<'a, BackendTraceElem>;
    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::types::{Address, Heap, HeapValue, StackElem, Value};

    #[test]
    fn test_trace_json_round_trip() {
        let mut locals = IndexMap::new();
        locals.insert("simpleList".to_string(), Value::reference(42));
        let mut heap = Heap::new();
        heap.insert(Address(42), HeapValue::List((1..=3).map(Value::Int).collect()));

        let trace: BackendTrace = vec![BackendTraceElem::new(
            4,
            vec![StackElem { frame_name: "<module>".into(), frame_id: 1, locals }],
            heap,
        )]
        .into();

        let text = trace.to_json_string(false).unwrap();
        assert!(text.contains(r#""heap":{"dataType":"Map","value":[[42,{"type":"list""#));
        assert_eq!(BackendTrace::from_json_str(&text).unwrap(), trace);
    }
}
