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

//! Scalar-or-reference values and heap addresses

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical key of one heap object within a pause
///
/// Addresses start out as the inspection service's `variablesReference` of the object and
/// are re-mapped by the identity resolver when the printed form carries a stable identity
/// token, so a single live object keeps a single address across requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub u64);

impl Address {
    /// Create a new address
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw integer
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Address {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A decoded scalar or a reference into the heap
///
/// Serialized as `{"type": "int", "value": 1}` / `{"type": "ref", "value": 42}`.
///
/// Booleans and chars keep the literal token printed by the debuggee ("True" vs "true"),
/// since the visualizer echoes it back verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// String, or the printed form of a no-value sentinel
    Str(String),
    /// Boolean literal as printed
    Bool(String),
    /// Character literal as printed
    Char(String),
    /// Reference to a heap node
    Ref(Address),
}

impl Value {
    /// Shorthand for a string value
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// Shorthand for a reference to a raw address
    pub fn reference(address: u64) -> Self {
        Self::Ref(Address(address))
    }

    /// Address carried by this value, if it is a reference
    pub fn as_ref_address(&self) -> Option<Address> {
        match self {
            Self::Ref(address) => Some(*address),
            _ => None,
        }
    }

    /// Whether this value points into the heap
    pub fn is_ref(&self) -> bool {
        matches!(self, Self::Ref(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Bool(b) | Self::Char(b) => write!(f, "{b}"),
            Self::Ref(address) => write!(f, "@{address}"),
        }
    }
}
