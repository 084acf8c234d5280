//! Transaction types and their canonical byte encoding.
//!
//! Transactions are a tagged union (`Asset`) wrapped in a common
//! [`Transaction`] envelope. The numeric ordering of [`TransactionKind`]
//! is load-bearing: it is the primary key of `transactionSortFunc`,
//! used both for block-inclusion ordering and for mempool pop order.

use serde::{Deserialize, Serialize};

use super::{Address, BlockId, PublicKey, Signature, TransactionId};

/// Transaction type tag. Discriminants fix the ascending order used by
/// `transactionSortFunc`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionKind {
    Send = 0,
    Signature = 1,
    Delegate = 2,
    Vote = 3,
    Register = 4,
    Stake = 5,
}

/// Lifecycle stage of a transaction, from creation through confirmation
/// or eviction back to the queue.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Created,
    Validated,
    Queued,
    PutInPool,
    UnconfirmApplied,
    PoppedForBlock,
    Confirmed,
}

/// Plain value transfer to `recipient_address`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxSend {
    pub amount: u64,
}

/// Adds/removes delegate votes. `reward`/`unstake` mark this vote as
/// triggering an airdrop payout, which makes the vote's airdrop
/// sponsors indexable as mempool recipients.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxVote {
    pub added: Vec<PublicKey>,
    pub removed: Vec<PublicKey>,
    pub reward: bool,
    pub unstake: bool,
    pub airdrop_sponsors: Vec<Address>,
}

/// Locks `amount` into a stake. Every stake has airdrop sponsors
/// indexed as mempool recipients.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxStake {
    pub amount: u64,
    pub airdrop_sponsors: Vec<Address>,
}

/// Registers a multisignature quorum for the sender account.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxRegister {
    pub multisignatures: Vec<PublicKey>,
    pub multimin: u8,
    pub lifetime: u32,
}

/// Registers a second signature (second passphrase) for the sender.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxSignature {
    pub second_public_key: PublicKey,
}

/// Registers the sender as a delegate under `username`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxDelegate {
    pub username: String,
}

/// Type-discriminated transaction payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Asset {
    Send(TxSend),
    Vote(TxVote),
    Stake(TxStake),
    Register(TxRegister),
    Signature(TxSignature),
    Delegate(TxDelegate),
}

impl Asset {
    pub fn kind(&self) -> TransactionKind {
        match self {
            Asset::Send(_) => TransactionKind::Send,
            Asset::Vote(_) => TransactionKind::Vote,
            Asset::Stake(_) => TransactionKind::Stake,
            Asset::Register(_) => TransactionKind::Register,
            Asset::Signature(_) => TransactionKind::Signature,
            Asset::Delegate(_) => TransactionKind::Delegate,
        }
    }

    /// The SEND-asset amount contributed to `Block.amount`. Zero for
    /// every non-SEND type.
    pub fn send_amount(&self) -> u64 {
        match self {
            Asset::Send(s) => s.amount,
            _ => 0,
        }
    }

    /// Type-specific tail bytes appended after the common prefix in
    /// `Transaction::canonical_bytes`.
    fn canonical_tail(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Asset::Send(_) => {}
            Asset::Vote(v) => {
                for pk in &v.added {
                    out.push(b'+');
                    out.extend_from_slice(&pk.0);
                }
                for pk in &v.removed {
                    out.push(b'-');
                    out.extend_from_slice(&pk.0);
                }
                out.push(v.reward as u8);
                out.push(v.unstake as u8);
            }
            Asset::Stake(s) => {
                out.extend_from_slice(&(s.airdrop_sponsors.len() as u32).to_le_bytes());
                for addr in &s.airdrop_sponsors {
                    out.extend_from_slice(&addr.to_bytes());
                }
            }
            Asset::Register(r) => {
                out.push(r.multimin);
                out.extend_from_slice(&r.lifetime.to_le_bytes());
                for pk in &r.multisignatures {
                    out.extend_from_slice(&pk.0);
                }
            }
            Asset::Signature(s) => {
                out.extend_from_slice(&s.second_public_key.0);
            }
            Asset::Delegate(d) => {
                out.extend_from_slice(d.username.as_bytes());
            }
        }
        out
    }
}

/// A transaction, carrying its type-discriminated payload in `asset`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub sender_public_key: PublicKey,
    pub sender_address: Address,
    pub recipient_address: Option<Address>,
    pub amount: u64,
    pub fee: u64,
    pub created_at: i32,
    pub signature: Signature,
    pub second_signature: Option<Signature>,
    pub asset: Asset,
    pub block_id: Option<BlockId>,
    pub status: TransactionStatus,
}

impl Transaction {
    pub fn kind(&self) -> TransactionKind {
        self.asset.kind()
    }

    /// Canonical byte encoding used for signing and id derivation:
    /// common prefix (`type`, `createdAt`, `senderPublicKey`,
    /// `recipientAddress`, `amount`) followed by asset-specific bytes.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(self.kind() as u8);
        out.extend_from_slice(&self.created_at.to_le_bytes());
        out.extend_from_slice(&self.sender_public_key.0);
        out.extend_from_slice(&self.recipient_address.map(|a| a.to_bytes()).unwrap_or([0u8; 8]));
        out.extend_from_slice(&self.amount.to_le_bytes());
        out.extend_from_slice(&self.asset.canonical_tail());
        out
    }

    /// Computes this transaction's id from its canonical bytes.
    pub fn compute_id(&self) -> TransactionId {
        TransactionId::compute(&self.canonical_bytes())
    }

    /// Sort key used by `transactionSortFunc`: type ascending, then
    /// `createdAt` ascending, then id lexicographic ascending.
    pub fn sort_key(&self) -> (u8, i32, [u8; 32]) {
        (self.kind() as u8, self.created_at, *self.id.as_bytes())
    }
}

/// Stable sort comparator implementing `transactionSortFunc`: primary
/// key type ascending, tiebreakers `createdAt` ascending then id
/// lexicographic ascending.
pub fn transaction_sort_func(a: &Transaction, b: &Transaction) -> std::cmp::Ordering {
    a.sort_key().cmp(&b.sort_key())
}
