//! Concrete per-type transaction handlers.

use ed25519_dalek::{Signature as DalekSignature, Verifier, VerifyingKey};

use super::TransactionHandler;
use crate::config::ChainConfig;
use crate::error::ChainError;
use crate::types::tx::Asset;
use crate::types::{Account, Transaction};

fn verify_signature(tx: &Transaction) -> Result<(), ChainError> {
    let verifying_key = VerifyingKey::from_bytes(&tx.sender_public_key.0)
        .map_err(|_| ChainError::BadSignature)?;
    let signature = DalekSignature::from_bytes(&tx.signature.0);
    verifying_key
        .verify(&tx.canonical_bytes(), &signature)
        .map_err(|_| ChainError::BadSignature)
}

fn require_balance(sender: &Account, need: u64) -> Result<(), ChainError> {
    if sender.u_balance < need {
        return Err(ChainError::InsufficientBalance {
            need,
            have: sender.u_balance,
        });
    }
    Ok(())
}

pub struct SendHandler;

impl TransactionHandler for SendHandler {
    fn verify(&self, tx: &Transaction) -> Result<(), ChainError> {
        verify_signature(tx)
    }

    fn verify_unconfirmed(&self, tx: &Transaction, sender: &Account) -> Result<(), ChainError> {
        require_balance(sender, tx.amount + tx.fee)
    }

    fn calculate_fee(&self, _tx: &Transaction, _sender: &Account, config: &ChainConfig) -> u64 {
        config.fees.send
    }

    fn apply_unconfirmed(&self, tx: &Transaction, sender: &mut Account) {
        sender.u_balance -= tx.amount + tx.fee;
    }

    fn undo_unconfirmed(&self, tx: &Transaction, sender: &mut Account) {
        sender.u_balance += tx.amount + tx.fee;
    }

    fn apply(&self, tx: &Transaction, sender: &mut Account) {
        sender.balance -= tx.amount + tx.fee;
    }

    fn undo(&self, tx: &Transaction, sender: &mut Account) {
        sender.balance += tx.amount + tx.fee;
    }
}

pub struct VoteHandler;

impl TransactionHandler for VoteHandler {
    fn verify(&self, tx: &Transaction) -> Result<(), ChainError> {
        verify_signature(tx)
    }

    fn verify_unconfirmed(&self, tx: &Transaction, sender: &Account) -> Result<(), ChainError> {
        let Asset::Vote(vote) = &tx.asset else {
            return Err(ChainError::Other("expected VOTE asset".into()));
        };
        for pk in &vote.added {
            if sender.votes.contains(pk) {
                return Err(ChainError::Other("already voted for delegate".into()));
            }
        }
        for pk in &vote.removed {
            if !sender.votes.contains(pk) {
                return Err(ChainError::Other("vote removal for non-existent vote".into()));
            }
        }
        require_balance(sender, tx.fee)
    }

    fn calculate_fee(&self, _tx: &Transaction, sender: &Account, config: &ChainConfig) -> u64 {
        // Vote fees are stake-dependent: scale with the voter's balance
        // so larger stakes pay a proportionally larger vote fee.
        config.fees.vote + sender.balance / 100_000
    }

    fn apply_unconfirmed(&self, tx: &Transaction, sender: &mut Account) {
        let Asset::Vote(vote) = &tx.asset else { return };
        sender.votes.retain(|pk| !vote.removed.contains(pk));
        sender.votes.extend(vote.added.iter().copied());
        sender.u_balance -= tx.fee;
    }

    fn undo_unconfirmed(&self, tx: &Transaction, sender: &mut Account) {
        let Asset::Vote(vote) = &tx.asset else { return };
        sender.votes.retain(|pk| !vote.added.contains(pk));
        sender.votes.extend(vote.removed.iter().copied());
        sender.u_balance += tx.fee;
    }

    fn apply(&self, tx: &Transaction, sender: &mut Account) {
        sender.balance -= tx.fee;
    }

    fn undo(&self, tx: &Transaction, sender: &mut Account) {
        sender.balance += tx.fee;
    }
}

pub struct StakeHandler;

impl TransactionHandler for StakeHandler {
    fn verify(&self, tx: &Transaction) -> Result<(), ChainError> {
        verify_signature(tx)
    }

    fn verify_unconfirmed(&self, tx: &Transaction, sender: &Account) -> Result<(), ChainError> {
        let Asset::Stake(stake) = &tx.asset else {
            return Err(ChainError::Other("expected STAKE asset".into()));
        };
        require_balance(sender, stake.amount + tx.fee)
    }

    fn calculate_fee(&self, _tx: &Transaction, _sender: &Account, config: &ChainConfig) -> u64 {
        config.fees.stake
    }

    fn apply_unconfirmed(&self, tx: &Transaction, sender: &mut Account) {
        let Asset::Stake(stake) = &tx.asset else { return };
        sender.u_balance -= stake.amount + tx.fee;
    }

    fn undo_unconfirmed(&self, tx: &Transaction, sender: &mut Account) {
        let Asset::Stake(stake) = &tx.asset else { return };
        sender.u_balance += stake.amount + tx.fee;
    }

    fn apply(&self, tx: &Transaction, sender: &mut Account) {
        let Asset::Stake(stake) = &tx.asset else { return };
        sender.balance -= stake.amount + tx.fee;
    }

    fn undo(&self, tx: &Transaction, sender: &mut Account) {
        let Asset::Stake(stake) = &tx.asset else { return };
        sender.balance += stake.amount + tx.fee;
    }
}

pub struct RegisterHandler;

impl TransactionHandler for RegisterHandler {
    fn verify(&self, tx: &Transaction) -> Result<(), ChainError> {
        verify_signature(tx)?;
        let Asset::Register(reg) = &tx.asset else {
            return Err(ChainError::Other("expected REGISTER asset".into()));
        };
        if reg.multimin == 0 || reg.multimin as usize > reg.multisignatures.len() {
            return Err(ChainError::Other("multimin exceeds signer count".into()));
        }
        Ok(())
    }

    fn verify_unconfirmed(&self, tx: &Transaction, sender: &Account) -> Result<(), ChainError> {
        if sender.is_multisig() {
            return Err(ChainError::Other("account already has a multisignature quorum".into()));
        }
        require_balance(sender, tx.fee)
    }

    fn calculate_fee(&self, _tx: &Transaction, _sender: &Account, config: &ChainConfig) -> u64 {
        config.fees.register
    }

    fn apply_unconfirmed(&self, tx: &Transaction, sender: &mut Account) {
        let Asset::Register(reg) = &tx.asset else { return };
        sender.multisignatures = reg.multisignatures.clone();
        sender.multimin = reg.multimin;
        sender.u_balance -= tx.fee;
    }

    fn undo_unconfirmed(&self, tx: &Transaction, sender: &mut Account) {
        sender.multisignatures.clear();
        sender.multimin = 0;
        sender.u_balance += tx.fee;
    }

    fn apply(&self, tx: &Transaction, sender: &mut Account) {
        sender.balance -= tx.fee;
    }

    fn undo(&self, tx: &Transaction, sender: &mut Account) {
        sender.balance += tx.fee;
    }
}

pub struct SignatureHandler;

impl TransactionHandler for SignatureHandler {
    fn verify(&self, tx: &Transaction) -> Result<(), ChainError> {
        verify_signature(tx)
    }

    fn verify_unconfirmed(&self, tx: &Transaction, sender: &Account) -> Result<(), ChainError> {
        if sender.second_public_key.is_some() {
            return Err(ChainError::Other("second signature already registered".into()));
        }
        require_balance(sender, tx.fee)
    }

    fn calculate_fee(&self, _tx: &Transaction, _sender: &Account, config: &ChainConfig) -> u64 {
        config.fees.signature
    }

    fn apply_unconfirmed(&self, tx: &Transaction, sender: &mut Account) {
        let Asset::Signature(sig) = &tx.asset else { return };
        sender.second_public_key = Some(sig.second_public_key);
        sender.u_balance -= tx.fee;
    }

    fn undo_unconfirmed(&self, tx: &Transaction, sender: &mut Account) {
        sender.second_public_key = None;
        sender.u_balance += tx.fee;
    }

    fn apply(&self, tx: &Transaction, sender: &mut Account) {
        sender.balance -= tx.fee;
    }

    fn undo(&self, tx: &Transaction, sender: &mut Account) {
        sender.balance += tx.fee;
    }
}

pub struct DelegateHandler;

impl TransactionHandler for DelegateHandler {
    fn verify(&self, tx: &Transaction) -> Result<(), ChainError> {
        verify_signature(tx)?;
        let Asset::Delegate(delegate) = &tx.asset else {
            return Err(ChainError::Other("expected DELEGATE asset".into()));
        };
        crate::types::delegate::validate_username(&delegate.username)
            .map_err(|e| ChainError::Other(e.to_string()))
    }

    fn verify_unconfirmed(&self, tx: &Transaction, sender: &Account) -> Result<(), ChainError> {
        if sender.is_delegate() {
            return Err(ChainError::Other("account is already a delegate".into()));
        }
        require_balance(sender, tx.fee)
    }

    fn calculate_fee(&self, _tx: &Transaction, _sender: &Account, config: &ChainConfig) -> u64 {
        config.fees.delegate
    }

    fn apply_unconfirmed(&self, tx: &Transaction, sender: &mut Account) {
        let Asset::Delegate(delegate) = &tx.asset else { return };
        sender.delegate_username = Some(delegate.username.clone());
        sender.u_balance -= tx.fee;
    }

    fn undo_unconfirmed(&self, tx: &Transaction, sender: &mut Account) {
        sender.delegate_username = None;
        sender.u_balance += tx.fee;
    }

    fn apply(&self, tx: &Transaction, sender: &mut Account) {
        sender.balance -= tx.fee;
    }

    fn undo(&self, tx: &Transaction, sender: &mut Account) {
        sender.balance += tx.fee;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tx::{TransactionStatus, TxSend};
    use crate::types::{Address, PublicKey, Signature};

    fn dummy_tx(amount: u64, fee: u64) -> Transaction {
        Transaction {
            id: crate::types::Hash256([1u8; crate::types::HASH_LEN]),
            sender_public_key: PublicKey([0u8; 32]),
            sender_address: Address(1),
            recipient_address: Some(Address(2)),
            amount,
            fee,
            created_at: 0,
            signature: Signature([0u8; crate::types::SIGNATURE_LEN]),
            second_signature: None,
            asset: Asset::Send(TxSend { amount }),
            block_id: None,
            status: TransactionStatus::Created,
        }
    }

    #[test]
    fn send_apply_unconfirmed_then_undo_restores_balance() {
        let mut sender = Account::new_stub(Address(1), None);
        sender.u_balance = 1_000;
        let tx = dummy_tx(100, 10);

        SendHandler.apply_unconfirmed(&tx, &mut sender);
        assert_eq!(sender.u_balance, 890);

        SendHandler.undo_unconfirmed(&tx, &mut sender);
        assert_eq!(sender.u_balance, 1_000);
    }

    #[test]
    fn send_verify_unconfirmed_rejects_insufficient_balance() {
        let mut sender = Account::new_stub(Address(1), None);
        sender.u_balance = 50;
        let tx = dummy_tx(100, 10);

        assert!(SendHandler.verify_unconfirmed(&tx, &sender).is_err());
    }

    #[test]
    fn ready_is_true_for_non_multisig_sender() {
        let sender = Account::new_stub(Address(1), None);
        let tx = dummy_tx(1, 1);
        assert!(SendHandler.ready(&tx, &sender));
    }
}
