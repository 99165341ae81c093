//! Transaction construction via the builder pattern.
//!
//! The [`TransactionBuilder`] collects transfers, an operation and a nonce,
//! checks that the result is encodable, and hands back an unsigned
//! [`Transaction`]. The builder does not sign; that happens in
//! [`super::signing`], so construction stays testable without key material.
//!
//! A [`Transaction`] never changes once built. Its fields are private and
//! signing produces a new value, so a signature can never end up attached
//! to bytes it was not computed over.

use serde::{Deserialize, Serialize};

use super::encoding::{
    decode_transaction_message, encode_transaction_message, CanonicalEncode, EncodingError,
};
use super::types::{Address, Operation, Transfer};
use crate::crypto::hash::sha256_array;
use crate::crypto::signatures::TxSignature;

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A value-transfer transaction.
///
/// The signable form is [`CanonicalEncode::encode_canonical`]; the signature
/// is never part of it. The wire form (see [`crate::network::wire`]) carries
/// the signature alongside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    transfers: Vec<Transfer>,
    operation: Operation,
    nonce: Vec<u8>,
    signature: Option<TxSignature>,
}

impl Transaction {
    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    pub fn signature(&self) -> Option<&TxSignature> {
        self.signature.as_ref()
    }

    /// Returns `true` if the transaction carries a signature.
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// SHA-256 of the canonical encoding. This is what gets signed.
    pub fn digest(&self) -> Result<[u8; 32], EncodingError> {
        Ok(sha256_array(&self.encode_canonical()?))
    }

    /// Every distinct address named by a debit, in first-seen order.
    pub fn debit_addresses(&self) -> Vec<&Address> {
        let mut seen: Vec<&Address> = Vec::new();
        for transfer in self.transfers.iter().filter(|t| t.is_debit()) {
            if !seen.contains(&&transfer.address) {
                seen.push(&transfer.address);
            }
        }
        seen
    }

    /// Rebuild an unsigned transaction from its canonical bytes.
    pub fn from_canonical_bytes(bytes: &[u8]) -> Result<Self, EncodingError> {
        let msg = decode_transaction_message(bytes)?;
        Ok(Self {
            transfers: msg.transfers,
            operation: msg.operation,
            nonce: msg.nonce,
            signature: None,
        })
    }

    /// A copy of this transaction carrying `signature`.
    pub(crate) fn with_signature(&self, signature: TxSignature) -> Self {
        Self {
            signature: Some(signature),
            ..self.clone()
        }
    }
}

impl CanonicalEncode for Transaction {
    fn encode_canonical(&self) -> Result<Vec<u8>, EncodingError> {
        encode_transaction_message(&self.transfers, self.operation, &self.nonce)
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for unsigned [`Transaction`] instances.
///
/// # Usage
///
/// ```rust
/// use tessera_protocol::transaction::{Operation, Transfer, TransactionBuilder};
///
/// let from = "2102514038DA1905561BF9043269B8515C1E7C4E79B011291B4CBED5B18DAECB71E4";
/// let to = "2102E14466DC0E5A3E6EBBEAB5DD24ABE950E44EF2BEB509A5FD113460414A6EFAB4";
///
/// let tx = TransactionBuilder::new(Operation::Exchange)
///     .transfer(format!("{from}:0:-1").parse::<Transfer>().unwrap())
///     .transfer(format!("{to}:0:1").parse::<Transfer>().unwrap())
///     .nonce(vec![0x00, 0x11, 0x22, 0x33])
///     .build()
///     .unwrap();
///
/// assert!(!tx.is_signed());
/// ```
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    operation: Operation,
    transfers: Vec<Transfer>,
    nonce: Vec<u8>,
}

impl TransactionBuilder {
    /// Creates a builder for the given operation with no transfers and an
    /// empty nonce.
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            transfers: Vec::new(),
            nonce: Vec::new(),
        }
    }

    /// Appends one transfer. Order is preserved and signed.
    pub fn transfer(mut self, transfer: Transfer) -> Self {
        self.transfers.push(transfer);
        self
    }

    /// Appends several transfers.
    pub fn transfers(mut self, transfers: impl IntoIterator<Item = Transfer>) -> Self {
        self.transfers.extend(transfers);
        self
    }

    /// Sets the nonce bytes.
    pub fn nonce(mut self, nonce: impl Into<Vec<u8>>) -> Self {
        self.nonce = nonce.into();
        self
    }

    /// Sets the nonce from user text: hex if it decodes as hex, otherwise
    /// the UTF-8 bytes of the text itself.
    pub fn nonce_text(mut self, text: &str) -> Self {
        let trimmed = text.strip_prefix("0x").unwrap_or(text);
        self.nonce = match hex::decode(trimmed) {
            Ok(bytes) if !trimmed.is_empty() => bytes,
            _ => text.as_bytes().to_vec(),
        };
        self
    }

    /// Consumes the builder and produces an unsigned [`Transaction`].
    ///
    /// Fails if the transaction could never be encoded (no transfers, or a
    /// field over its limit). Balance and sender rules are checked at
    /// signing time.
    pub fn build(self) -> Result<Transaction, EncodingError> {
        let tx = Transaction {
            transfers: self.transfers,
            operation: self.operation,
            nonce: self.nonce,
            signature: None,
        };
        tx.encode_canonical()?;
        Ok(tx)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR_1: &str = "2102514038DA1905561BF9043269B8515C1E7C4E79B011291B4CBED5B18DAECB71E4";
    const ADDR_2: &str = "2102E14466DC0E5A3E6EBBEAB5DD24ABE950E44EF2BEB509A5FD113460414A6EFAB4";

    fn sample_tx() -> Transaction {
        TransactionBuilder::new(Operation::Exchange)
            .transfer(Transfer::new(Address::from_hex(ADDR_1).unwrap(), 0, -5, 0))
            .transfer(Transfer::new(Address::from_hex(ADDR_2).unwrap(), 0, 5, 0))
            .nonce(b"nonce-1".to_vec())
            .build()
            .unwrap()
    }

    #[test]
    fn builder_sets_fields() {
        let tx = sample_tx();
        assert_eq!(tx.operation(), Operation::Exchange);
        assert_eq!(tx.transfers().len(), 2);
        assert_eq!(tx.nonce(), b"nonce-1");
        assert!(!tx.is_signed());
        assert!(tx.signature().is_none());
    }

    #[test]
    fn builder_rejects_empty() {
        let err = TransactionBuilder::new(Operation::Create).build().unwrap_err();
        assert_eq!(err, EncodingError::EmptyTransfers);
    }

    #[test]
    fn digest_is_sha256_of_canonical() {
        let tx = sample_tx();
        assert_eq!(
            tx.digest().unwrap(),
            sha256_array(&tx.encode_canonical().unwrap())
        );
    }

    #[test]
    fn signature_does_not_change_canonical_bytes() {
        let tx = sample_tx();
        let signed = tx.with_signature(TxSignature::from_der_bytes(vec![0x30, 0x00]));
        assert_eq!(
            tx.encode_canonical().unwrap(),
            signed.encode_canonical().unwrap()
        );
        assert!(signed.is_signed());
        assert!(!tx.is_signed());
    }

    #[test]
    fn canonical_bytes_roundtrip() {
        let tx = sample_tx();
        let back = Transaction::from_canonical_bytes(&tx.encode_canonical().unwrap()).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn nonce_text_prefers_hex() {
        let tx = TransactionBuilder::new(Operation::Create)
            .transfer(Transfer::new(Address::from_hex(ADDR_1).unwrap(), 1, 0, 0))
            .nonce_text("00112233")
            .build()
            .unwrap();
        assert_eq!(tx.nonce(), &[0x00, 0x11, 0x22, 0x33]);
    }

    #[test]
    fn nonce_text_falls_back_to_utf8() {
        let tx = TransactionBuilder::new(Operation::Create)
            .transfer(Transfer::new(Address::from_hex(ADDR_1).unwrap(), 1, 0, 0))
            .nonce_text("order #17")
            .build()
            .unwrap();
        assert_eq!(tx.nonce(), b"order #17");
    }

    #[test]
    fn debit_addresses_dedup() {
        let a = Address::from_hex(ADDR_1).unwrap();
        let b = Address::from_hex(ADDR_2).unwrap();
        let tx = TransactionBuilder::new(Operation::Exchange)
            .transfer(Transfer::new(a.clone(), 0, -1, 0))
            .transfer(Transfer::new(a.clone(), 1, -1, 0))
            .transfer(Transfer::new(b, 0, 1, 0))
            .build()
            .unwrap();
        assert_eq!(tx.debit_addresses(), vec![&a]);
    }
}
