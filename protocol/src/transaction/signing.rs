//! Transaction signing with secp256k1 wallet keys.
//!
//! Signing is a separate step from building because the key may not be
//! available at construction time (an encrypted key file, a remote signer).
//! The signed message is the canonical encoding from [`super::encoding`];
//! the digest is its SHA-256.

use thiserror::Error;
use tracing::{debug, info};

use super::builder::Transaction;
use super::encoding::{CanonicalEncode, EncodingError};
use super::types::{Address, AddressKind};
use super::verification::{validate_unsigned, TransactionError};
use crate::crypto::keys::{KeyError, WalletKeypair};
use crate::crypto::signatures::sign;

/// Errors that can occur while signing.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The transaction is not sound (no nonce, unbalanced, no sender, ...).
    #[error("transaction rejected before signing: {0}")]
    Invalid(#[source] TransactionError),

    #[error("cannot encode transaction: {0}")]
    Encoding(#[from] EncodingError),

    /// The sender is a node address; wallets only sign for wallets.
    #[error("sender {address} is not a secp256k1 wallet address")]
    CurveMismatch { address: Address },

    /// The key does not derive the address it is signing for.
    #[error("signing key derives {actual}, but the signer must be {expected}")]
    KeyMismatch { expected: Address, actual: Address },

    #[error("transaction is already signed")]
    AlreadySigned,

    #[error(transparent)]
    Key(#[from] KeyError),
}

impl From<TransactionError> for SigningError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::Encoding(e) => Self::Encoding(e),
            other => Self::Invalid(other),
        }
    }
}

/// Checks that `keypair` may sign on behalf of `address`.
pub(crate) fn check_signer(address: &Address, keypair: &WalletKeypair) -> Result<(), SigningError> {
    if address.kind() != AddressKind::Wallet {
        return Err(SigningError::CurveMismatch {
            address: address.clone(),
        });
    }
    let actual = keypair.address();
    if &actual != address {
        return Err(SigningError::KeyMismatch {
            expected: address.clone(),
            actual,
        });
    }
    Ok(())
}

/// Signs a transaction and returns the signed copy.
///
/// The signing procedure:
/// 1. Refuse if already signed.
/// 2. Validate soundness: nonce present, per-coin conservation, single sender.
/// 3. Check the key derives the sender address.
/// 4. Encode canonically, SHA-256, ECDSA (RFC 6979, low-S), DER.
///
/// The input is left untouched.
///
/// # Example
///
/// ```rust
/// use tessera_protocol::crypto::WalletKeypair;
/// use tessera_protocol::transaction::{
///     sign_transaction, verify_transaction, Operation, Transfer, TransactionBuilder,
/// };
///
/// let alice = WalletKeypair::generate();
/// let bob = WalletKeypair::generate();
///
/// let tx = TransactionBuilder::new(Operation::Exchange)
///     .transfer(Transfer::new(alice.address(), 0, -10, 0))
///     .transfer(Transfer::new(bob.address(), 0, 10, 0))
///     .nonce(b"invoice-42".to_vec())
///     .build()
///     .unwrap();
///
/// let signed = sign_transaction(&tx, &alice).unwrap();
/// assert!(signed.is_signed());
/// verify_transaction(&signed).unwrap();
/// ```
pub fn sign_transaction(
    tx: &Transaction,
    keypair: &WalletKeypair,
) -> Result<Transaction, SigningError> {
    if tx.is_signed() {
        return Err(SigningError::AlreadySigned);
    }

    let sender = validate_unsigned(tx)?;
    check_signer(sender, keypair)?;

    let message = tx.encode_canonical()?;
    debug!(
        sender = %sender,
        transfers = tx.transfers().len(),
        message_len = message.len(),
        "encoded transaction for signing"
    );

    let signature = sign(keypair, &message)?;
    info!(sender = %sender, operation = %tx.operation(), "signed transaction");
    Ok(tx.with_signature(signature))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::builder::TransactionBuilder;
    use crate::transaction::types::{Operation, Transfer};
    use crate::transaction::verification::verify_transaction;

    fn tx_from(sender: &Address, amount: i64) -> Transaction {
        TransactionBuilder::new(Operation::Exchange)
            .transfer(Transfer::new(sender.clone(), 0, -amount, 0))
            .transfer(Transfer::new(WalletKeypair::generate().address(), 0, amount, 0))
            .nonce(vec![0x00, 0x11, 0x22, 0x33])
            .build()
            .unwrap()
    }

    #[test]
    fn sign_sets_signature() {
        let kp = WalletKeypair::generate();
        let tx = tx_from(&kp.address(), 1);
        let signed = sign_transaction(&tx, &kp).unwrap();
        assert!(signed.is_signed());
        assert!(!tx.is_signed());
        assert_eq!(signed.transfers(), tx.transfers());
    }

    #[test]
    fn signing_twice_gives_verifiable_signatures() {
        let kp = WalletKeypair::generate();
        let tx = tx_from(&kp.address(), 7);
        let first = sign_transaction(&tx, &kp).unwrap();
        let second = sign_transaction(&tx, &kp).unwrap();
        verify_transaction(&first).unwrap();
        verify_transaction(&second).unwrap();
    }

    #[test]
    fn refuses_to_resign() {
        let kp = WalletKeypair::generate();
        let signed = sign_transaction(&tx_from(&kp.address(), 1), &kp).unwrap();
        assert!(matches!(
            sign_transaction(&signed, &kp),
            Err(SigningError::AlreadySigned)
        ));
    }

    #[test]
    fn unbalanced_is_rejected_before_signing() {
        let kp = WalletKeypair::generate();
        let tx = TransactionBuilder::new(Operation::Exchange)
            .transfer(Transfer::new(kp.address(), 0, -2, 0))
            .transfer(Transfer::new(WalletKeypair::generate().address(), 0, 1, 0))
            .nonce(vec![0x01])
            .build()
            .unwrap();
        assert!(matches!(
            sign_transaction(&tx, &kp),
            Err(SigningError::Invalid(TransactionError::Unbalanced { .. }))
        ));
    }

    #[test]
    fn empty_nonce_is_rejected_before_signing() {
        let kp = WalletKeypair::generate();
        let tx = TransactionBuilder::new(Operation::Exchange)
            .transfer(Transfer::new(kp.address(), 0, -1, 0))
            .transfer(Transfer::new(WalletKeypair::generate().address(), 0, 1, 0))
            .build()
            .unwrap();
        assert!(matches!(
            sign_transaction(&tx, &kp),
            Err(SigningError::Invalid(TransactionError::EmptyNonce))
        ));
    }

    #[test]
    fn wrong_key_is_key_mismatch() {
        let owner = WalletKeypair::generate();
        let thief = WalletKeypair::generate();
        let tx = tx_from(&owner.address(), 3);
        assert!(matches!(
            sign_transaction(&tx, &thief),
            Err(SigningError::KeyMismatch { .. })
        ));
    }

    #[test]
    fn node_sender_is_curve_mismatch() {
        let node = Address::from_bytes(&[0x03u8; crate::config::NODE_ADDR_SIZE]).unwrap();
        let kp = WalletKeypair::generate();
        let tx = tx_from(&node, 3);
        assert!(matches!(
            sign_transaction(&tx, &kp),
            Err(SigningError::CurveMismatch { .. })
        ));
    }
}
