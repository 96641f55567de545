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

//! Identity resolver.
//!
//! The inspection service may hand out a fresh reference id for the same live object on
//! every request. When the printed form of an object carries an identity token, the
//! [`IdentityMap`] pins the token to the first address it was seen at, so the object
//! keeps one address for the whole trace generation.
//!
//! Addresses come from three ranges:
//!
//! - raw reference ids, used as-is for objects without a token
//! - [`REMAP_BASE`] and up, for tokens whose raw id is already owned by another token
//! - [`PauseAddresses`] ranges, minted per pause and restarted at every pause

use std::collections::HashMap;

use snaptrace_common::types::Address;

/// First address handed to a token whose proposed address is taken
pub const REMAP_BASE: u64 = 1 << 52;

/// First per-pause alias for token-less objects whose raw id collides with a token address
pub const ALIAS_BASE: u64 = 1 << 48;

/// First per-pause address for containers recovered from printed text
pub const SYNTHETIC_BASE: u64 = 1 << 40;

/// Identity token → canonical address, for one trace generation.
///
/// Never shrinks, and never overwrites a registered token.
#[derive(Debug, Default)]
pub struct IdentityMap {
    by_token: HashMap<String, Address>,
    owners: HashMap<Address, String>,
    next_remap: u64,
}

impl IdentityMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical address of `token`, registering it at `proposed` if it is new.
    ///
    /// A new token whose proposed address already belongs to another token gets a fresh
    /// address instead, so two objects never share one address.
    pub fn resolve(&mut self, token: &str, proposed: Address) -> Address {
        if let Some(address) = self.by_token.get(token) {
            return *address;
        }

        let address = if self.owners.contains_key(&proposed) {
            let address = Address(REMAP_BASE + self.next_remap);
            self.next_remap += 1;
            address
        } else {
            proposed
        };

        self.by_token.insert(token.to_string(), address);
        self.owners.insert(address, token.to_string());
        address
    }

    /// Address registered for `token`
    pub fn get(&self, token: &str) -> Option<Address> {
        self.by_token.get(token).copied()
    }

    /// Token that owns `address`
    pub fn owner_of(&self, address: Address) -> Option<&str> {
        self.owners.get(&address).map(String::as_str)
    }

    /// Number of registered tokens
    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    /// Whether no token has been registered
    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }
}

/// Addresses minted during one pause.
///
/// Numbering restarts at every pause, so two identical pauses produce identical
/// snapshots.
#[derive(Debug, Default)]
pub struct PauseAddresses {
    aliases: HashMap<u64, Address>,
    next_synthetic: u64,
}

impl PauseAddresses {
    /// Address for a token-less object: its raw id, unless a token already owns that id
    pub fn untracked(&mut self, identities: &IdentityMap, raw_reference_id: u64) -> Address {
        let raw = Address(raw_reference_id);
        if identities.owner_of(raw).is_none() {
            return raw;
        }

        let next = ALIAS_BASE + self.aliases.len() as u64;
        *self.aliases.entry(raw_reference_id).or_insert(Address(next))
    }

    /// A fresh address for a node that has no reference id of its own
    pub fn synthetic(&mut self) -> Address {
        let address = Address(SYNTHETIC_BASE + self.next_synthetic);
        self.next_synthetic += 1;
        address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_writer_wins() {
        let mut identities = IdentityMap::new();
        assert_eq!(identities.resolve("0x10", Address(3)), Address(3));
        assert_eq!(identities.resolve("0x10", Address(8)), Address(3));
        assert_eq!(identities.get("0x10"), Some(Address(3)));
        assert_eq!(identities.owner_of(Address(3)), Some("0x10"));
        assert_eq!(identities.len(), 1);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut identities = IdentityMap::new();
        let first = identities.resolve("23", Address(5));
        for proposed in [5, 6, 7, 5] {
            assert_eq!(identities.resolve("23", Address(proposed)), first);
        }
    }

    #[test]
    fn test_colliding_tokens_are_remapped() {
        let mut identities = IdentityMap::new();
        let a = identities.resolve("0xa", Address(4));
        let b = identities.resolve("0xb", Address(4));
        assert_eq!(a, Address(4));
        assert_eq!(b, Address(REMAP_BASE));
        assert_eq!(identities.resolve("0xb", Address(9)), b);
    }

    #[test]
    fn test_untracked_ids_avoid_token_addresses() {
        let mut identities = IdentityMap::new();
        identities.resolve("0xa", Address(4));

        let mut pause = PauseAddresses::default();
        assert_eq!(pause.untracked(&identities, 5), Address(5));
        let alias = pause.untracked(&identities, 4);
        assert_eq!(alias, Address(ALIAS_BASE));
        assert_eq!(pause.untracked(&identities, 4), alias);

        // A new pause starts numbering again
        let mut next_pause = PauseAddresses::default();
        assert_eq!(next_pause.untracked(&identities, 4), Address(ALIAS_BASE));
    }

    #[test]
    fn test_synthetic_addresses() {
        let mut pause = PauseAddresses::default();
        assert_eq!(pause.synthetic(), Address(SYNTHETIC_BASE));
        assert_eq!(pause.synthetic(), Address(SYNTHETIC_BASE + 1));
    }
}
