//! # Digital Signatures
//!
//! The signature type that rides on transactions and proposals, plus the
//! message-level sign/verify entry points both of them go through.
//!
//! A [`TxSignature`] is a DER-encoded ECDSA signature: a `SEQUENCE` of two
//! `INTEGER`s, 70 to 72 bytes for secp256k1. We keep the encoded form
//! rather than `(r, s)` because the network compares signatures byte for
//! byte (a block is searched for a transaction by its signature bytes),
//! and DER is what it compares.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::hash::sha256_array;
use super::keys::{KeyError, WalletKeypair, WalletPublicKey};
use crate::transaction::types::Address;

/// Errors during signature verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature verification failed")]
    VerificationFailed,

    #[error("signature is not valid DER")]
    MalformedDer,

    #[error("signer address does not carry a usable public key")]
    InvalidPublicKey,
}

/// A DER-encoded ECDSA signature.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxSignature(Vec<u8>);

impl TxSignature {
    /// Wrap already-encoded DER bytes. No validation happens here;
    /// verification rejects malformed encodings.
    pub fn from_der_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Upper-case hex, the form used in query URIs.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(&self.0)
    }

    /// Parse hex in either case, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        Ok(Self(hex::decode(trimmed)?))
    }
}

impl fmt::Display for TxSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TxSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        let shown = hex.get(..16).unwrap_or(&hex);
        write!(f, "TxSignature({}..)", shown)
    }
}

/// Hash a message with SHA-256 and sign the digest.
pub fn sign(keypair: &WalletKeypair, message: &[u8]) -> Result<TxSignature, KeyError> {
    keypair.sign_digest(&sha256_array(message))
}

/// Hash a message with SHA-256 and verify the signature against the key
/// embedded in `address`.
pub fn verify(
    address: &Address,
    message: &[u8],
    signature: &TxSignature,
) -> Result<(), SignatureError> {
    let public_key =
        WalletPublicKey::from_address(address).map_err(|_| SignatureError::InvalidPublicKey)?;
    public_key.verify_digest(&sha256_array(message), signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_message() {
        let kp = WalletKeypair::generate();
        let sig = sign(&kp, b"transfer").unwrap();
        assert!(verify(&kp.address(), b"transfer", &sig).is_ok());
    }

    #[test]
    fn tampered_message_fails() {
        let kp = WalletKeypair::generate();
        let sig = sign(&kp, b"transfer 1").unwrap();
        assert_eq!(
            verify(&kp.address(), b"transfer 2", &sig),
            Err(SignatureError::VerificationFailed)
        );
    }

    #[test]
    fn garbage_signature_is_malformed() {
        let kp = WalletKeypair::generate();
        let sig = TxSignature::from_der_bytes(vec![0xde, 0xad]);
        assert_eq!(
            verify(&kp.address(), b"x", &sig),
            Err(SignatureError::MalformedDer)
        );
    }

    #[test]
    fn hex_roundtrip_accepts_prefix_and_lowercase() {
        let sig = TxSignature::from_der_bytes(vec![0x30, 0x06, 0xab]);
        assert_eq!(sig.to_hex(), "3006AB");
        assert_eq!(TxSignature::from_hex("0x3006ab").unwrap(), sig);
    }

    #[test]
    fn serde_is_transparent() {
        let sig = TxSignature::from_der_bytes(vec![1, 2, 3]);
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json, "[1,2,3]");
    }
}
