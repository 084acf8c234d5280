//! Account state.
//!
//! An [`Account`] carries both confirmed (`balance`) and unconfirmed
//! (`u_balance`) state. Confirmed state is mutated only by a
//! transaction's `apply`/`undo`; unconfirmed state only by
//! `applyUnconfirmed`/`undoUnconfirmed`. The two are never required to
//! agree — `u_balance` reflects whatever pool transactions are currently
//! staged against this account and may transiently dip below `balance`.

use serde::{Deserialize, Serialize};

use super::{Address, PublicKey};

/// In-memory account record, keyed by [`Address`] in the account
/// registry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,

    /// Learned lazily from the first outbound transaction signed by this
    /// address, if the account was first seen only as a recipient.
    pub public_key: Option<PublicKey>,
    pub second_public_key: Option<PublicKey>,

    pub balance: u64,
    pub u_balance: u64,

    /// Delegate public keys this account has voted for.
    pub votes: Vec<PublicKey>,

    /// Set if this account has registered itself as a delegate.
    pub delegate_username: Option<String>,

    pub multisignatures: Vec<PublicKey>,
    pub multimin: u8,
}

impl Account {
    /// Creates a fresh, zero-balance account stub for `address`, with an
    /// optionally-known public key (set when the account is first seen
    /// as a transaction sender rather than only as a recipient).
    pub fn new_stub(address: Address, public_key: Option<PublicKey>) -> Self {
        Self {
            address,
            public_key,
            second_public_key: None,
            balance: 0,
            u_balance: 0,
            votes: Vec::new(),
            delegate_username: None,
            multisignatures: Vec::new(),
            multimin: 0,
        }
    }

    /// Returns `true` if this account requires multisignature quorum to
    /// authorize outgoing transactions.
    pub fn is_multisig(&self) -> bool {
        !self.multisignatures.is_empty() && self.multimin > 0
    }

    /// Returns `true` if this account is itself a registered delegate.
    pub fn is_delegate(&self) -> bool {
        self.delegate_username.is_some()
    }

    /// Merges a newly-learned public key into this account.
    ///
    /// Idempotent: if the account already carries a public key, this is
    /// a no-op (the registry never overwrites a known key).
    pub fn learn_public_key(&mut self, public_key: PublicKey) {
        if self.public_key.is_none() {
            self.public_key = Some(public_key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_address(byte: u8) -> Address {
        Address(byte as u64)
    }

    #[test]
    fn new_stub_has_zero_balances_and_no_votes() {
        let acc = Account::new_stub(dummy_address(1), None);
        assert_eq!(acc.balance, 0);
        assert_eq!(acc.u_balance, 0);
        assert!(acc.votes.is_empty());
        assert!(!acc.is_delegate());
        assert!(!acc.is_multisig());
    }

    #[test]
    fn learn_public_key_does_not_overwrite_existing() {
        let mut acc = Account::new_stub(dummy_address(1), Some(PublicKey([1u8; 32])));
        acc.learn_public_key(PublicKey([2u8; 32]));
        assert_eq!(acc.public_key.unwrap().0, [1u8; 32]);
    }

    #[test]
    fn learn_public_key_sets_when_absent() {
        let mut acc = Account::new_stub(dummy_address(1), None);
        acc.learn_public_key(PublicKey([9u8; 32]));
        assert_eq!(acc.public_key.unwrap().0, [9u8; 32]);
    }
}
