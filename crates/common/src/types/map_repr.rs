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

//! Order-preserving JSON representation for maps.
//!
//! Plain JSON objects only allow string keys and say nothing about ordering, while every
//! map in a trace (the heap, frame locals, dict/instance/class properties and identity-keyed
//! map payloads) must keep both its key identity and its insertion order. Maps are therefore
//! written as
//!
//! ```json
//! { "dataType": "Map", "value": [[key, value], ...] }
//! ```
//!
//! which the visualizer revives into an insertion-ordered map.

use std::hash::Hash;

use indexmap::IndexMap;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Marker stored in the `dataType` field of every serialized map
pub const MAP_DATA_TYPE: &str = "Map";

#[derive(Serialize)]
struct MapReprRef<'a, K, V> {
    #[serde(rename = "dataType")]
    data_type: &'static str,
    value: Vec<(&'a K, &'a V)>,
}

#[derive(Deserialize)]
struct MapReprOwned<K, V> {
    #[serde(rename = "dataType")]
    data_type: String,
    value: Vec<(K, V)>,
}

fn check_data_type<E: de::Error>(found: &str) -> Result<(), E> {
    if found == MAP_DATA_TYPE {
        Ok(())
    } else {
        Err(E::custom(format!("expected dataType {MAP_DATA_TYPE:?}, found {found:?}")))
    }
}

/// Serialize an [`IndexMap`] as a `{dataType: "Map"}` document
pub fn serialize<K, V, S>(map: &IndexMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
where
    K: Serialize,
    V: Serialize,
    S: Serializer,
{
    MapReprRef { data_type: MAP_DATA_TYPE, value: map.iter().collect() }.serialize(serializer)
}

/// Deserialize an [`IndexMap`] from a `{dataType: "Map"}` document
pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<IndexMap<K, V>, D::Error>
where
    K: Deserialize<'de> + Eq + Hash,
    V: Deserialize<'de>,
    D: Deserializer<'de>,
{
    let repr = MapReprOwned::<K, V>::deserialize(deserializer)?;
    check_data_type(&repr.data_type)?;
    Ok(repr.value.into_iter().collect())
}

/// Same representation for association lists whose keys must not be merged
///
/// Identity-keyed maps may hold two entries whose keys print identically but refer to
/// different objects, so they are kept as a pair list rather than an [`IndexMap`].
pub mod pairs {
    use super::*;

    /// Serialize a list of key/value pairs as a `{dataType: "Map"}` document
    pub fn serialize<K, V, S>(pairs: &[(K, V)], serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize,
        V: Serialize,
        S: Serializer,
    {
        MapReprRef { data_type: MAP_DATA_TYPE, value: pairs.iter().map(|(k, v)| (k, v)).collect() }
            .serialize(serializer)
    }

    /// Deserialize a list of key/value pairs from a `{dataType: "Map"}` document
    pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<Vec<(K, V)>, D::Error>
    where
        K: Deserialize<'de>,
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let repr = MapReprOwned::<K, V>::deserialize(deserializer)?;
        check_data_type(&repr.data_type)?;
        Ok(repr.value)
    }
}
