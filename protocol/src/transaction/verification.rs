//! Transaction validation and signature verification.
//!
//! Two layers, run in this order:
//!
//! 1. **Soundness** ([`validate_unsigned`]): a nonce is present, value is
//!    conserved per coin, and exactly one address pays. These rules do not need a signature and
//!    run before signing, so an unbalanced transaction is never signed.
//! 2. **Authenticity** ([`verify_transaction`]): the DER signature checks
//!    out against the public key embedded in the sender's address.
//!
//! Checks are ordered cheapest first.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use super::builder::Transaction;
use super::encoding::{CanonicalEncode, EncodingError};
use super::types::{Address, Transfer};
use crate::crypto::signatures::{verify, SignatureError};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during transaction validation or verification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransactionError {
    /// Amounts for a coin do not sum to zero.
    #[error("transfers for coin {coin} sum to {sum}, expected 0")]
    Unbalanced { coin: u64, sum: i128 },

    /// The ledger refuses transactions without a nonce.
    #[error("transaction has no nonce")]
    EmptyNonce,

    /// No transfer debits anyone, so there is no one to sign.
    #[error("transaction has no debit transfer, so no sender")]
    NoSender,

    /// More than one address is debited.
    #[error("transaction debits more than one address: {first} and {second}")]
    MultipleSenders { first: Address, second: Address },

    /// The transaction is not signed.
    #[error("transaction is unsigned")]
    MissingSignature,

    /// The sender address does not carry a usable secp256k1 key.
    #[error("sender {address} is not a valid wallet key")]
    InvalidSenderAddress { address: Address },

    /// The signature is not valid DER.
    #[error("malformed signature from {sender}")]
    MalformedSignature { sender: Address },

    /// The signature does not verify against the sender's key.
    #[error("invalid signature: does not verify against sender {sender}")]
    InvalidSignature { sender: Address },

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

// ---------------------------------------------------------------------------
// Soundness
// ---------------------------------------------------------------------------

/// Checks that, for every coin, the transfer amounts sum to zero.
///
/// Sums are taken in `i128` so a pathological list of `i64::MAX` entries
/// cannot wrap back to zero.
pub fn check_balanced(transfers: &[Transfer]) -> Result<(), TransactionError> {
    let mut sums: BTreeMap<u64, i128> = BTreeMap::new();
    for transfer in transfers {
        *sums.entry(transfer.coin).or_insert(0) += transfer.amount as i128;
    }
    match sums.into_iter().find(|(_, sum)| *sum != 0) {
        Some((coin, sum)) => Err(TransactionError::Unbalanced { coin, sum }),
        None => Ok(()),
    }
}

/// The single address debited by the transaction.
pub fn sender(tx: &Transaction) -> Result<&Address, TransactionError> {
    let debits = tx.debit_addresses();
    match debits.as_slice() {
        [] => Err(TransactionError::NoSender),
        [only] => Ok(*only),
        [first, second, ..] => Err(TransactionError::MultipleSenders {
            first: (*first).clone(),
            second: (*second).clone(),
        }),
    }
}

/// All rules that must hold before a transaction may be signed. Returns
/// the sender on success.
pub fn validate_unsigned(tx: &Transaction) -> Result<&Address, TransactionError> {
    if tx.transfers().is_empty() {
        return Err(EncodingError::EmptyTransfers.into());
    }
    if tx.nonce().is_empty() {
        return Err(TransactionError::EmptyNonce);
    }
    check_balanced(tx.transfers())?;
    sender(tx)
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verifies a signed transaction.
///
/// The checks, in order:
///
/// 1. **Soundness**: nonce present, balanced, single sender.
/// 2. **Signature present**.
/// 3. **Sender key**: the sender address decodes to a secp256k1 point.
/// 4. **Signature valid**: ECDSA over SHA-256 of the canonical encoding.
///
/// # Errors
///
/// Returns the first failing check as a [`TransactionError`].
pub fn verify_transaction(tx: &Transaction) -> Result<(), TransactionError> {
    let sender = validate_unsigned(tx)?;

    let signature = tx.signature().ok_or(TransactionError::MissingSignature)?;

    let message = tx.encode_canonical()?;
    verify(sender, &message, signature).map_err(|e| match e {
        SignatureError::InvalidPublicKey => TransactionError::InvalidSenderAddress {
            address: sender.clone(),
        },
        SignatureError::MalformedDer => TransactionError::MalformedSignature {
            sender: sender.clone(),
        },
        SignatureError::VerificationFailed => TransactionError::InvalidSignature {
            sender: sender.clone(),
        },
    })?;

    debug!(sender = %sender, "transaction signature verified");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
