//! Account registry (C2).
//!
//! In-memory dictionary keyed by [`Address`] with a secondary index by
//! [`PublicKey`]. Single-owner: mutated only by transaction handlers and
//! by genesis/replay bootstrap.

use std::collections::HashMap;

use crate::types::{Account, Address, Delegate, PublicKey};

/// The account registry. Rebuilt deterministically from genesis on
/// startup by replaying blocks (`crate::consensus::engine` calls
/// `apply_genesis_block` then replays the durable store).
#[derive(Default)]
pub struct AccountRegistry {
    by_address: HashMap<Address, Account>,
    by_public_key: HashMap<PublicKey, Address>,
    delegates: HashMap<Address, Delegate>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_by_address(&self, address: &Address) -> Option<&Account> {
        self.by_address.get(address)
    }

    pub fn get_by_address_mut(&mut self, address: &Address) -> Option<&mut Account> {
        self.by_address.get_mut(address)
    }

    pub fn get_by_public_key(&self, public_key: &PublicKey) -> Option<&Account> {
        self.by_public_key
            .get(public_key)
            .and_then(|addr| self.by_address.get(addr))
    }

    /// Idempotently adds an account. If an entry already exists at
    /// `address`, merges a newly-learned `public_key` into it (without
    /// overwriting a key that's already known) rather than replacing
    /// the account.
    pub fn add(&mut self, address: Address, public_key: Option<PublicKey>) -> &mut Account {
        if let Some(pk) = public_key {
            self.by_public_key.entry(pk).or_insert(address);
        }
        self.by_address
            .entry(address)
            .and_modify(|acc| {
                if let Some(pk) = public_key {
                    acc.learn_public_key(pk);
                }
            })
            .or_insert_with(|| Account::new_stub(address, public_key))
    }

    /// Attaches (or detaches, with `delegate = None`) a delegate record
    /// to the account at `address`.
    pub fn attach_delegate(&mut self, address: Address, delegate: Option<Delegate>) {
        match delegate {
            Some(d) => {
                if let Some(acc) = self.by_address.get_mut(&address) {
                    acc.delegate_username = Some(d.username.clone());
                }
                self.delegates.insert(address, d);
            }
            None => {
                if let Some(acc) = self.by_address.get_mut(&address) {
                    acc.delegate_username = None;
                }
                self.delegates.remove(&address);
            }
        }
    }

    pub fn delegate(&self, address: &Address) -> Option<&Delegate> {
        self.delegates.get(address)
    }

    /// `true` if some other registered delegate already carries
    /// `username`. Usernames are unique across all delegates (data model
    /// invariant), so `DELEGATE` registration checks this before
    /// `apply`.
    pub fn delegate_username_taken(&self, username: &str) -> bool {
        self.delegates.values().any(|d| d.username == username)
    }

    pub fn delegate_mut(&mut self, address: &Address) -> Option<&mut Delegate> {
        self.delegates.get_mut(address)
    }

    /// All registered delegates, in insertion order with respect to the
    /// underlying map's iteration (callers requiring a specific sort
    /// order apply one over this, e.g. the `GET_DELEGATES` route).
    pub fn delegates(&self) -> impl Iterator<Item = &Delegate> {
        self.delegates.values()
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pk(byte: u8) -> PublicKey {
        PublicKey([byte; 32])
    }

    #[test]
    fn add_is_idempotent_and_learns_public_key() {
        let mut registry = AccountRegistry::new();
        registry.add(Address(1), None);
        assert!(registry.get_by_address(&Address(1)).unwrap().public_key.is_none());

        registry.add(Address(1), Some(pk(9)));
        assert_eq!(
            registry.get_by_address(&Address(1)).unwrap().public_key,
            Some(pk(9))
        );
        assert_eq!(registry.get_by_public_key(&pk(9)).unwrap().address, Address(1));

        // Re-adding with a different key does not overwrite.
        registry.add(Address(1), Some(pk(7)));
        assert_eq!(
            registry.get_by_address(&Address(1)).unwrap().public_key,
            Some(pk(9))
        );
    }

    #[test]
    fn attach_and_detach_delegate() {
        let mut registry = AccountRegistry::new();
        registry.add(Address(1), Some(pk(1)));
        let delegate = Delegate::new("alice".to_string(), pk(1)).unwrap();

        registry.attach_delegate(Address(1), Some(delegate));
        assert!(registry.get_by_address(&Address(1)).unwrap().is_delegate());
        assert!(registry.delegate(&Address(1)).is_some());

        registry.attach_delegate(Address(1), None);
        assert!(!registry.get_by_address(&Address(1)).unwrap().is_delegate());
    }

    #[test]
    fn delegate_username_taken_reflects_registered_delegates() {
        let mut registry = AccountRegistry::new();
        registry.add(Address(1), Some(pk(1)));
        assert!(!registry.delegate_username_taken("alice"));

        let delegate = Delegate::new("alice".to_string(), pk(1)).unwrap();
        registry.attach_delegate(Address(1), Some(delegate));
        assert!(registry.delegate_username_taken("alice"));
        assert!(!registry.delegate_username_taken("bob"));
        assert!(registry.delegate(&Address(1)).is_some());
    }
}
