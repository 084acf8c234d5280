//! Core domain types shared across the chain.
//!
//! This module defines strongly-typed hashes, addresses, public keys and
//! signatures used throughout the block-processing and mempool pipeline,
//! together with the `Block`, `Transaction`, `Account`, `Delegate` and
//! `Round` aggregates. The goal is to avoid "naked" byte buffers in
//! public APIs and instead use domain-specific newtypes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub mod account;
pub mod block;
pub mod delegate;
pub mod round;
pub mod tx;

pub use account::Account;
pub use block::{Block, BlockStage};
pub use delegate::{Delegate, UsernameError};
pub use round::{Round, RoundSlot};
pub use tx::{
    Asset, Transaction, TransactionKind, TransactionStatus, TxDelegate, TxRegister, TxSend,
    TxSignature, TxStake, TxVote,
};

/// Length in bytes of all 256-bit hashes used in this module.
pub const HASH_LEN: usize = 32;
/// Length in bytes of an Ed25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;
/// Length in bytes of an Ed25519 detached signature.
pub const SIGNATURE_LEN: usize = 64;

/// Strongly-typed 256-bit hash wrapper (SHA-256).
///
/// Used as the backing representation for block ids, transaction ids,
/// and payload hashes. Always exactly [`HASH_LEN`] bytes.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Hash256(pub [u8; HASH_LEN]);

impl Hash256 {
    /// Computes a new [`Hash256`] as the SHA-256 digest of `data`.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let digest = hasher.finalize();
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&digest);
        Hash256(out)
    }

    /// Returns the underlying 32-byte hash as a borrowed array.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Returns the lowercase hex encoding of this hash.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a lowercase (or mixed-case) hex string into a [`Hash256`].
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; HASH_LEN] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Hash256(arr))
    }
}

impl std::fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash256({})", self.to_hex())
    }
}

/// Streaming SHA-256 accumulator, used when hashing a block's payload
/// transaction-by-transaction without materializing every `getBytes()`
/// call into one giant buffer first.
#[derive(Default)]
pub struct StreamingHasher(Sha256);

impl StreamingHasher {
    pub fn new() -> Self {
        Self(Sha256::new())
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }

    pub fn finalize(self) -> Hash256 {
        let digest = self.0.finalize();
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&digest);
        Hash256(out)
    }
}

/// Account address: the first 8 bytes of `SHA256(publicKey)`,
/// interpreted as a big-endian `u64`.
///
/// This matches the canonical wire layout in spec §6, where
/// `recipientAddress` occupies exactly 8 bytes rather than a full
/// 32-byte hash.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Address(pub u64);

impl Address {
    /// Derives an [`Address`] from a public key's canonical bytes.
    ///
    /// Different encodings of the same key produce different addresses,
    /// so callers must always pass the canonical 32-byte public key.
    pub fn from_public_key(pk: &PublicKey) -> Self {
        let digest = Hash256::compute(&pk.0);
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&digest.0[..8]);
        Address(u64::from_be_bytes(buf))
    }

    /// Returns the canonical 8-byte big-endian encoding of this address.
    pub fn to_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Lisk-style decimal rendering, e.g. `"1859190791819301871"`.
    pub fn to_decimal_string(&self) -> String {
        self.0.to_string()
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({})", self.to_decimal_string())
    }
}

/// Ed25519 public key, wrapped to avoid naked byte buffers in public APIs.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; PUBLIC_KEY_LEN] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(PublicKey(arr))
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

/// Detached Ed25519 signature.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct Signature(pub [u8; SIGNATURE_LEN]);

impl Signature {
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; SIGNATURE_LEN] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Signature(arr))
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({}..)", &self.to_hex()[..16])
    }
}

/// Block id: `SHA256(serialize(block))`, see `Block::compute_id`.
pub type BlockId = Hash256;

/// Transaction id: derived from the transaction's canonical bytes.
pub type TransactionId = Hash256;
