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

//! SnapTrace engine - reconstructs execution snapshots from a paused debuggee
//!
//! The engine drives a debuggee through an [`InspectionService`], turns each
//! pause into a [`snaptrace_common::types::BackendTraceElem`] and assembles the
//! pauses into a [`snaptrace_common::types::BackendTrace`]. [`generate_trace`]
//! is the entry point.

pub mod assembler;
pub use assembler::*;

pub mod classify;
pub use classify::*;

pub mod composite;
pub use composite::*;

pub mod config;
pub use config::*;

pub mod convention;
pub use convention::*;

pub mod core;
pub use core::*;

pub mod dap;
pub use dap::*;

pub mod director;
pub use director::*;

pub mod error;
pub use error::*;

pub mod heap;
pub use heap::*;

pub mod identity;
pub use identity::*;

pub mod inspection;
pub use inspection::*;

pub mod session;
pub use session::*;

pub mod stack;
pub use stack::*;

pub mod test_utils;
