//! Block types and canonical hashing.
//!
//! Serialization for storage/wire transport goes through **bincode 2**
//! with the `serde` integration, same as the rest of the crate.
//! Consensus hashing and signing, however, use the fixed canonical byte
//! layout in [`Block::canonical_bytes`] rather than the bincode form —
//! the two encodings are not interchangeable and must not be confused.

use serde::{Deserialize, Serialize};

use super::{BlockId, Hash256, PublicKey, Signature, Transaction, HASH_LEN, PUBLIC_KEY_LEN};

/// Lifecycle stage of a block as it moves through the consensus
/// pipeline, or `Rejected` if it fails at any stage.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum BlockStage {
    Validate,
    Verify,
    Process,
    Apply,
    Rejected,
}

/// A block: header fields plus an ordered transaction list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub version: u32,
    pub height: u64,
    /// Null only when `height == 1` (genesis).
    pub previous_block_id: Option<BlockId>,
    pub created_at: i32,
    pub generator_public_key: PublicKey,
    pub signature: Signature,
    pub payload_hash: Hash256,
    pub transaction_count: u32,
    /// Sum of SEND-asset amounts across `transactions`.
    pub amount: u64,
    /// Sum of transaction fees across `transactions`.
    pub fee: u64,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Canonical byte layout used for both signing and id derivation:
    /// `version, createdAt, transactionCount, amount, fee,
    /// previousBlockId, payloadHash, generatorPublicKey[, signature]`.
    /// `signature` is appended only when `skip_signature` is `false`.
    pub fn canonical_bytes(&self, skip_signature: bool) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.created_at.to_le_bytes());
        out.extend_from_slice(&self.transaction_count.to_le_bytes());
        out.extend_from_slice(&self.amount.to_le_bytes());
        out.extend_from_slice(&self.fee.to_le_bytes());
        if let Some(prev) = &self.previous_block_id {
            out.extend_from_slice(prev.as_bytes());
        }
        out.extend_from_slice(self.payload_hash.as_bytes());
        out.extend_from_slice(&self.generator_public_key.0);
        if !skip_signature {
            out.extend_from_slice(&self.signature.0);
        }
        out
    }

    /// Computes the signing hash: `SHA256(canonical_bytes(skip_signature=true))`.
    pub fn signing_hash(&self) -> Hash256 {
        Hash256::compute(&self.canonical_bytes(true))
    }

    /// Computes the block id: `SHA256(canonical_bytes(skip_signature=false))`.
    pub fn compute_id(&self) -> BlockId {
        Hash256::compute(&self.canonical_bytes(false))
    }

    /// Recomputes `amount` and `fee` by summing over `transactions`.
    pub fn recompute_totals(&mut self) {
        self.amount = self.transactions.iter().map(|t| t.asset.send_amount()).sum();
        self.fee = self.transactions.iter().map(|t| t.fee).sum();
        self.transaction_count = self.transactions.len() as u32;
    }
}

/// Deterministic, minimal genesis block: height 1, no parent, no
/// transactions, empty payload hash and zero signature — the real
/// payload hash, signature and id are filled by `addPayloadHash`
/// (`crate::consensus::engine`) once the genesis transactions are
/// attached.
pub fn genesis_skeleton(version: u32, generator_public_key: PublicKey) -> Block {
    Block {
        id: Hash256([0u8; HASH_LEN]),
        version,
        height: 1,
        previous_block_id: None,
        created_at: 0,
        generator_public_key,
        signature: Signature([0u8; super::SIGNATURE_LEN]),
        payload_hash: Hash256([0u8; HASH_LEN]),
        transaction_count: 0,
        amount: 0,
        fee: 0,
        transactions: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tx::{Asset, TransactionStatus, TxSend};
    use crate::types::{Address, TransactionId};

    fn dummy_pk(byte: u8) -> PublicKey {
        PublicKey([byte; PUBLIC_KEY_LEN])
    }

    fn dummy_tx(fee: u64, amount: u64, id_byte: u8) -> Transaction {
        Transaction {
            id: TransactionId::compute(&[id_byte]),
            sender_public_key: dummy_pk(1),
            sender_address: Address(1),
            recipient_address: Some(Address(2)),
            amount,
            fee,
            created_at: 0,
            signature: Signature([1u8; super::super::SIGNATURE_LEN]),
            second_signature: None,
            asset: Asset::Send(TxSend { amount }),
            block_id: None,
            status: TransactionStatus::Created,
        }
    }

    fn sample_block() -> Block {
        let mut block = Block {
            id: Hash256([0u8; HASH_LEN]),
            version: 1,
            height: 2,
            previous_block_id: Some(Hash256([9u8; HASH_LEN])),
            created_at: 100,
            generator_public_key: dummy_pk(5),
            signature: Signature([0u8; super::SIGNATURE_LEN]),
            payload_hash: Hash256([3u8; HASH_LEN]),
            transaction_count: 0,
            amount: 0,
            fee: 0,
            transactions: vec![dummy_tx(1, 10, 1), dummy_tx(2, 20, 2)],
        };
        block.recompute_totals();
        block
    }

    #[test]
    fn recompute_totals_sums_fees_and_send_amounts() {
        let block = sample_block();
        assert_eq!(block.fee, 3);
        assert_eq!(block.amount, 30);
        assert_eq!(block.transaction_count, 2);
    }

    #[test]
    fn compute_id_is_deterministic() {
        let block = sample_block();
        assert_eq!(block.compute_id().as_bytes(), block.compute_id().as_bytes());
    }

    #[test]
    fn signing_hash_differs_when_signature_included_changes_downstream_id() {
        let mut block = sample_block();
        let sig_hash = block.signing_hash();
        block.signature = Signature([1u8; super::super::SIGNATURE_LEN]);
        let id_before = block.compute_id();
        block.signature = Signature([2u8; super::super::SIGNATURE_LEN]);
        let id_after = block.compute_id();

        // The signing hash never includes the signature, so it stays
        // independent of which signature is later attached...
        assert_eq!(sig_hash.as_bytes(), block.signing_hash().as_bytes());
        // ...but the full id does, since skip_signature=false there.
        assert_ne!(id_before.as_bytes(), id_after.as_bytes());
    }

    #[test]
    fn genesis_skeleton_has_no_parent_and_height_one() {
        let block = genesis_skeleton(1, dummy_pk(1));
        assert_eq!(block.height, 1);
        assert!(block.previous_block_id.is_none());
        assert!(block.transactions.is_empty());
    }
}
