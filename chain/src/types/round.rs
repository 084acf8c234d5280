//! Round and slot-assignment data types.
//!
//! The shuffle that produces a [`Round`] from an active delegate list
//! lives in [`crate::slots`]; this module only holds the resulting data
//! shape so it can be shared by the slot service, the consensus engine,
//! and storage without a dependency cycle.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::PublicKey;

/// A delegate's assigned slot within a round.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RoundSlot {
    pub slot: u64,
    pub is_forged: bool,
}

/// A window of N consecutive slots, one assigned per active delegate,
/// where N is the active-delegate count.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Round {
    /// Mapping from delegate public key to its assigned slot in this
    /// round. Has exactly N entries for N active delegates.
    pub slots: HashMap<PublicKey, RoundSlot>,
    /// The slot number at which this round's first block may be forged.
    pub start_height: u64,
}

impl Round {
    /// Returns the generator slot assigned to `public_key`, if any.
    pub fn generator_slot(&self, public_key: &PublicKey) -> Option<u64> {
        self.slots.get(public_key).map(|s| s.slot)
    }

    /// Marks the slot for `public_key` as forged. No-op if the key is
    /// not part of this round.
    pub fn mark_forged(&mut self, public_key: &PublicKey) {
        if let Some(slot) = self.slots.get_mut(public_key) {
            slot.is_forged = true;
        }
    }

    /// Unmarks the slot for `public_key` as forged (used when a forged
    /// block is deleted via `deleteLastBlock`).
    pub fn unmark_forged(&mut self, public_key: &PublicKey) {
        if let Some(slot) = self.slots.get_mut(public_key) {
            slot.is_forged = false;
        }
    }

    /// Returns `true` if at most one slot in this round has `is_forged`
    /// set for each generator — i.e. invariant 8 from the spec holds.
    pub fn at_most_one_forged_per_generator(&self) -> bool {
        // Each generator key appears at most once in `slots` by
        // construction (it's a map keyed by public key), so this is
        // trivially true; kept as an explicit check for documentation
        // and so future refactors that change the representation are
        // forced to reconsider it.
        self.slots.len() == self.slots.keys().collect::<std::collections::HashSet<_>>().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PublicKey;

    fn pk(byte: u8) -> PublicKey {
        PublicKey([byte; 32])
    }

    #[test]
    fn mark_and_unmark_forged_round_trip() {
        let mut slots = HashMap::new();
        slots.insert(
            pk(1),
            RoundSlot {
                slot: 0,
                is_forged: false,
            },
        );
        let mut round = Round {
            slots,
            start_height: 1,
        };

        round.mark_forged(&pk(1));
        assert!(round.slots[&pk(1)].is_forged);

        round.unmark_forged(&pk(1));
        assert!(!round.slots[&pk(1)].is_forged);
    }

    #[test]
    fn generator_slot_returns_none_for_unknown_key() {
        let round = Round {
            slots: HashMap::new(),
            start_height: 1,
        };
        assert_eq!(round.generator_slot(&pk(9)), None);
    }
}
