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

//! Heap nodes

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{map_repr, Address, Value};

/// The container shape of a heap node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    /// Object whose attributes are listed by name
    Instance,
    /// Boxed scalar (boxed primitives, strings held by reference)
    Wrapper,
    /// Object shown together with its class name
    Class,
    /// Name-keyed mapping
    Dict,
    /// Mutable sequence
    List,
    /// Immutable sequence
    Tuple,
    /// Unordered collection
    Set,
    /// Associative container whose keys may themselves be references
    Map,
}

impl ContainerKind {
    /// Whether nodes of this kind hold an ordered sequence of values
    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::List | Self::Tuple | Self::Set)
    }

    /// Whether nodes of this kind hold a name-keyed mapping
    pub fn is_named(&self) -> bool {
        matches!(self, Self::Instance | Self::Dict | Self::Class)
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Instance => "instance",
            Self::Wrapper => "wrapper",
            Self::Class => "class",
            Self::Dict => "dict",
            Self::List => "list",
            Self::Tuple => "tuple",
            Self::Set => "set",
            Self::Map => "map",
        };
        f.write_str(name)
    }
}

/// One expanded heap object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum HeapValue {
    /// Attributes of an object
    Instance(#[serde(with = "map_repr")] IndexMap<String, Value>),
    /// A boxed scalar and the declared type it was boxed as
    #[serde(rename_all = "camelCase")]
    Wrapper {
        /// The unboxed value
        value: Value,
        /// Declared type of the box (e.g. `Integer`, `String`)
        declared_type: String,
    },
    /// Fields of an object together with its class name
    #[serde(rename_all = "camelCase")]
    Class {
        /// Name of the object's class
        class_name: String,
        /// Field values by name
        #[serde(with = "map_repr")]
        properties: IndexMap<String, Value>,
    },
    /// Entries of a name-keyed mapping
    Dict(#[serde(with = "map_repr")] IndexMap<String, Value>),
    /// Elements of a list
    List(Vec<Value>),
    /// Elements of a tuple
    Tuple(Vec<Value>),
    /// Elements of a set, in the order the debuggee listed them
    Set(Vec<Value>),
    /// Key/value pairs of an identity-keyed map
    Map(#[serde(with = "map_repr::pairs")] Vec<(Value, Value)>),
}

impl HeapValue {
    /// An empty node of the given kind
    ///
    /// Used for placeholders that keep the heap closed when a node is not (or only partly)
    /// expanded.
    pub fn empty(kind: ContainerKind, declared_type: &str) -> Self {
        match kind {
            ContainerKind::Instance => Self::Instance(IndexMap::new()),
            ContainerKind::Wrapper => Self::Wrapper {
                value: Value::Str(String::new()),
                declared_type: declared_type.to_string(),
            },
            ContainerKind::Class => {
                Self::Class { class_name: declared_type.to_string(), properties: IndexMap::new() }
            }
            ContainerKind::Dict => Self::Dict(IndexMap::new()),
            ContainerKind::List => Self::List(Vec::new()),
            ContainerKind::Tuple => Self::Tuple(Vec::new()),
            ContainerKind::Set => Self::Set(Vec::new()),
            ContainerKind::Map => Self::Map(Vec::new()),
        }
    }

    /// Kind of this node
    pub fn kind(&self) -> ContainerKind {
        match self {
            Self::Instance(_) => ContainerKind::Instance,
            Self::Wrapper { .. } => ContainerKind::Wrapper,
            Self::Class { .. } => ContainerKind::Class,
            Self::Dict(_) => ContainerKind::Dict,
            Self::List(_) => ContainerKind::List,
            Self::Tuple(_) => ContainerKind::Tuple,
            Self::Set(_) => ContainerKind::Set,
            Self::Map(_) => ContainerKind::Map,
        }
    }

    /// Every value held directly by this node, in payload order
    pub fn values(&self) -> Vec<&Value> {
        match self {
            Self::Instance(fields) | Self::Dict(fields) => fields.values().collect(),
            Self::Class { properties, .. } => properties.values().collect(),
            Self::Wrapper { value, .. } => vec![value],
            Self::List(items) | Self::Tuple(items) | Self::Set(items) => items.iter().collect(),
            Self::Map(pairs) => pairs.iter().flat_map(|(k, v)| [k, v]).collect(),
        }
    }

    /// Addresses referenced directly by this node
    pub fn references(&self) -> impl Iterator<Item = Address> + '_ {
        self.values().into_iter().filter_map(Value::as_ref_address)
    }

    /// Whether the node holds nothing
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Wrapper { .. } => false,
            _ => self.values().is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_list_wire_shape() {
        let node = HeapValue::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({
                "type": "list",
                "value": [{"type": "int", "value": 1}, {"type": "int", "value": 2}]
            })
        );
    }

    #[test]
    fn test_map_payload_uses_map_repr() {
        let node = HeapValue::Map(vec![(Value::reference(5), Value::str("five"))]);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "map");
        assert_eq!(json["value"]["dataType"], "Map");
        assert_eq!(json["value"]["value"][0][0], json!({"type": "ref", "value": 5}));

        let back: HeapValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_references_cover_keys_and_values() {
        let node = HeapValue::Map(vec![
            (Value::reference(5), Value::reference(6)),
            (Value::str("k"), Value::Int(0)),
        ]);
        assert_eq!(node.references().collect::<Vec<_>>(), vec![Address(5), Address(6)]);
    }

    #[test]
    fn test_empty_placeholder_keeps_kind() {
        for kind in [ContainerKind::Class, ContainerKind::Set, ContainerKind::Map] {
            assert_eq!(HeapValue::empty(kind, "Foo").kind(), kind);
        }
        assert!(HeapValue::empty(ContainerKind::List, "list").is_empty());
    }
}
