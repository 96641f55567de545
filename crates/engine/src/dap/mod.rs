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

//! Debug Adapter Protocol transport for [`InspectionService`](crate::InspectionService).

mod client;
mod codec;
mod messages;

pub use client::DapClient;
pub use codec::{DapReader, DapWriter, MAX_HEADER_LINE_BYTES, MAX_MESSAGE_BYTES};
pub use messages::SourceBreakpoints;
