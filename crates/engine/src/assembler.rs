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

//! Trace assembler.
//!
//! Collects one snapshot per recorded pause. Finishing the trace drops every snapshot
//! that repeats an earlier one (same line, frames and heap content, ignoring the order of
//! heap entries and locals but not of dict entries): stepping out of runtime frames can
//! stop twice at the same logical point.

use std::collections::HashSet;

use snaptrace_common::types::{BackendTrace, BackendTraceElem};

/// Accumulates snapshots into a trace
#[derive(Debug, Default)]
pub struct TraceAssembler {
    trace: BackendTrace,
}

impl TraceAssembler {
    /// Create an empty assembler
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the snapshot of a recorded pause
    pub fn push(&mut self, elem: BackendTraceElem) {
        self.trace.push(elem);
    }

    /// Number of snapshots collected
    pub fn len(&self) -> usize {
        self.trace.len()
    }

    /// Whether nothing was collected
    pub fn is_empty(&self) -> bool {
        self.trace.is_empty()
    }

    /// Most recent snapshot
    pub fn last(&self) -> Option<&BackendTraceElem> {
        self.trace.last()
    }

    /// The deduplicated trace and the number of snapshots removed
    pub fn finish(mut self) -> (BackendTrace, usize) {
        let removed = deduplicate(&mut self.trace);
        (self.trace, removed)
    }
}

/// Remove every snapshot equal to an earlier one, keeping the order of the rest.
///
/// Returns the number of snapshots removed. Idempotent.
pub fn deduplicate(trace: &mut BackendTrace) -> usize {
    let before = trace.len();
    let mut seen = HashSet::new();
    trace.retain(|elem| seen.insert(elem.canonical_key()));
    before - trace.len()
}
