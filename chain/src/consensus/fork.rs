//! Fork-cause branches (spec §4.7.5 decision tree, §8 scenarios 1–2,
//! glossary "Fork cause 1"/"Fork cause 5").
//!
//! These are pure decision functions; [`super::engine::ConsensusEngine`]
//! is the only caller and owns the side effects (rollback, logging,
//! metrics).

use crate::types::Block;

/// `true` if `candidate` outranks `current` under the tiebreak spec
/// uses throughout §4.7.5: earlier `createdAt` wins; ties broken by the
/// lexicographically lower id.
pub fn is_newer(candidate: &Block, current: &Block) -> bool {
    match candidate.created_at.cmp(&current.created_at) {
        std::cmp::Ordering::Less => true,
        std::cmp::Ordering::Equal => candidate.id.as_bytes() < current.id.as_bytes(),
        std::cmp::Ordering::Greater => false,
    }
}

/// Fork cause 1: a received block at `local.height + 1` whose parent is
/// not the local tip.
pub enum ForkOneOutcome {
    /// `received` does not outrank the local tip: discard it.
    DiscardReceived,
    /// `received` outranks the local tip: the local tip must be rolled
    /// back (two `deleteLastBlock` calls, per spec §8 scenario 1) before
    /// retrying `received`.
    RollBackLocal,
}

pub fn fork_cause_one(received: &Block, local_last: &Block) -> ForkOneOutcome {
    if is_newer(received, local_last) {
        ForkOneOutcome::RollBackLocal
    } else {
        ForkOneOutcome::DiscardReceived
    }
}

/// Fork cause 5: a received block at the same height and with the same
/// parent as the local tip, but a different id.
pub enum ForkFiveOutcome {
    KeepLocal,
    ReplaceWithReceived {
        /// `true` when both blocks share a generator: the delegate
        /// signed two competing blocks for the same slot.
        equivocation: bool,
    },
}

pub fn fork_cause_five(received: &Block, local_last: &Block) -> ForkFiveOutcome {
    let equivocation = received.generator_public_key == local_last.generator_public_key;
    if is_newer(received, local_last) {
        ForkFiveOutcome::ReplaceWithReceived { equivocation }
    } else {
        ForkFiveOutcome::KeepLocal
    }
}
