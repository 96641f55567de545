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

//! Data model of an execution trace
//!
//! A trace is an ordered list of [`BackendTraceElem`] snapshots. Each snapshot holds the
//! active frames ([`StackElem`]) whose locals are [`Value`]s, and the heap: every
//! [`HeapValue`] reachable from those locals, keyed by canonical [`Address`].

/// Order-preserving `{dataType: "Map"}` JSON representation
pub mod map_repr;

mod heap;
mod snapshot;
mod trace;
mod value;

pub use heap::*;
pub use snapshot::*;
pub use trace::*;
pub use value::*;
