//! # Finalized Blocks
//!
//! The client never produces blocks. It receives them from a repeater
//! after a transaction is confirmed, and needs two things from them: the
//! transaction it submitted, found by signature, and enough header data to
//! show where that transaction landed.
//!
//! ## Block Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  FinalBlock                                 │
//! │  ├── version: u8                            │
//! │  ├── previous_hash: [u8; 32]                │
//! │  ├── merkle_root: [u8; 32]  (tx leaves)     │
//! │  ├── block_time: u64        (ms since epoch)│
//! │  └── transactions: Vec<Transaction>         │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Merkle Root
//!
//! Each leaf is `SHA-256(canonical tx bytes || signature bytes)`. The tree
//! is built by [`crate::crypto::merkle_root`]. Empty blocks have an
//! all-zero root.

use serde::{Deserialize, Serialize};

use crate::crypto::hash::{double_sha256, merkle_root, sha256_multi};
use crate::crypto::signatures::TxSignature;
use crate::transaction::{CanonicalEncode, EncodingError, Transaction};

/// Current block format version.
pub const BLOCK_VERSION: u8 = 0;

/// A block as finalized by the shard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalBlock {
    pub version: u8,
    /// Hash of the parent block. All zeros at genesis.
    pub previous_hash: [u8; 32],
    pub merkle_root: [u8; 32],
    /// Finalization time in milliseconds since the Unix epoch.
    pub block_time: u64,
    pub transactions: Vec<Transaction>,
}

impl FinalBlock {
    /// Assemble a block and compute its Merkle root.
    pub fn new(
        previous_hash: [u8; 32],
        block_time: u64,
        transactions: Vec<Transaction>,
    ) -> Result<Self, EncodingError> {
        let root = compute_merkle_root(&transactions)?;
        Ok(Self {
            version: BLOCK_VERSION,
            previous_hash,
            merkle_root: root,
            block_time,
            transactions,
        })
    }

    /// First transaction whose signature is byte-for-byte equal to
    /// `signature`.
    pub fn find_by_signature(&self, signature: &TxSignature) -> Option<&Transaction> {
        self.transactions
            .iter()
            .find(|tx| tx.signature().map(|s| s.as_bytes()) == Some(signature.as_bytes()))
    }

    pub fn contains_signature(&self, signature: &TxSignature) -> bool {
        self.find_by_signature(signature).is_some()
    }

    /// Whether the stored Merkle root matches the transactions.
    pub fn merkle_root_matches(&self) -> Result<bool, EncodingError> {
        Ok(compute_merkle_root(&self.transactions)? == self.merkle_root)
    }

    /// `double_sha256(version || previous_hash || merkle_root || block_time)`.
    pub fn header_hash(&self) -> [u8; 32] {
        let mut header = Vec::with_capacity(1 + 32 + 32 + 8);
        header.push(self.version);
        header.extend_from_slice(&self.previous_hash);
        header.extend_from_slice(&self.merkle_root);
        header.extend_from_slice(&self.block_time.to_le_bytes());
        double_sha256(&header)
    }

    /// Header hash as lower-case hex.
    pub fn hash_hex(&self) -> String {
        hex::encode(self.header_hash())
    }
}

fn compute_merkle_root(transactions: &[Transaction]) -> Result<[u8; 32], EncodingError> {
    let leaves = transactions
        .iter()
        .map(|tx| {
            let body = tx.encode_canonical()?;
            let sig = tx.signature().map(|s| s.as_bytes()).unwrap_or(&[]);
            Ok(sha256_multi(&[body.as_slice(), sig]))
        })
        .collect::<Result<Vec<_>, EncodingError>>()?;
    Ok(merkle_root(&leaves))
}
