//! # Key Management
//!
//! secp256k1 keypairs for Tessera wallets.
//!
//! A wallet is identified by its compressed public key: 33 bytes of SEC1
//! point, prefixed on the wire with a length byte to form an
//! [`Address`](crate::transaction::Address). This module turns private key
//! material into something that can sign a 32-byte digest, and turns an
//! address back into something that can verify one.
//!
//! ## Why secp256k1?
//!
//! The ledger already speaks it. Wallet signatures are DER-encoded ECDSA
//! over a SHA-256 digest, and every validator checks them that way. We
//! sign with RFC 6979 deterministic nonces and normalize to low-S, so the
//! same key and digest always produce the same bytes. Verification accepts
//! either S.
//!
//! ## Security considerations
//!
//! - Private keys are zeroized on drop (`k256` handles this).
//! - Fresh keys come from `OsRng`.
//! - Key bytes are never logged. `Debug` on a keypair prints the address
//!   and nothing else.

use std::fmt;

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::zeroize::Zeroizing;
use rand::rngs::OsRng;
use thiserror::Error;

use super::signatures::TxSignature;
use crate::transaction::types::{Address, AddressKind};

/// Errors that can occur during key operations.
///
/// Messages say *what* failed, never which bytes were involved.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: wrong length or not a valid scalar")]
    InvalidSecretKey,

    #[error("invalid public key bytes: not a valid secp256k1 point")]
    InvalidPublicKey,

    #[error("address {0} is not a wallet address")]
    NotAWalletAddress(Address),

    #[error("key decryption failed: {0}")]
    Decryption(String),

    #[error("key encryption failed: {0}")]
    Encryption(String),

    #[error("malformed key file: {0}")]
    MalformedKeyFile(String),

    #[error("key file names address {expected} but the key derives {actual}")]
    AddressMismatch { expected: Address, actual: Address },

    #[error("ECDSA signing failed")]
    SigningFailed,
}

// ---------------------------------------------------------------------------
// WalletKeypair
// ---------------------------------------------------------------------------

/// A wallet signing key.
///
/// Intentionally not `Serialize`. Getting key material out of a keypair is
/// done through [`crate::crypto::keystore`], which only ever writes it
/// encrypted.
///
/// # Examples
///
/// ```
/// use tessera_protocol::crypto::{sha256_array, WalletKeypair};
///
/// let kp = WalletKeypair::generate();
/// let digest = sha256_array(b"pay alice");
/// let sig = kp.sign_digest(&digest).unwrap();
/// assert!(kp.public_key().verify_digest(&digest, &sig).is_ok());
/// ```
#[derive(Clone)]
pub struct WalletKeypair {
    signing_key: SigningKey,
}

impl WalletKeypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Rebuild a keypair from a raw 32-byte big-endian scalar.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let signing_key = SigningKey::from_slice(bytes).map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self { signing_key })
    }

    /// The raw secret scalar. Wrapped so it is wiped when dropped.
    pub fn secret_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.signing_key.to_bytes().to_vec())
    }

    /// The public half.
    pub fn public_key(&self) -> WalletPublicKey {
        WalletPublicKey {
            verifying_key: self.signing_key.verifying_key().clone(),
        }
    }

    /// The wallet address this key signs for.
    pub fn address(&self) -> Address {
        self.public_key().address()
    }

    /// Sign a 32-byte SHA-256 digest and return the DER-encoded signature.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<TxSignature, KeyError> {
        let signature: Signature = self
            .signing_key
            .sign_prehash(digest)
            .map_err(|_| KeyError::SigningFailed)?;
        let signature = signature.normalize_s().unwrap_or(signature);
        Ok(TxSignature::from_der_bytes(
            signature.to_der().as_bytes().to_vec(),
        ))
    }
}

impl fmt::Debug for WalletKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletKeypair(address={})", self.address())
    }
}

impl PartialEq for WalletKeypair {
    /// Keypairs compare by public key only.
    fn eq(&self, other: &Self) -> bool {
        self.public_key() == other.public_key()
    }
}

impl Eq for WalletKeypair {}

// ---------------------------------------------------------------------------
// WalletPublicKey
// ---------------------------------------------------------------------------

/// The verifying half of a wallet key.
#[derive(Clone)]
pub struct WalletPublicKey {
    verifying_key: VerifyingKey,
}

impl WalletPublicKey {
    /// Parse a compressed (33 byte) or uncompressed (65 byte) SEC1 point.
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let verifying_key =
            VerifyingKey::from_sec1_bytes(bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { verifying_key })
    }

    /// Recover the public key embedded in a wallet address.
    pub fn from_address(address: &Address) -> Result<Self, KeyError> {
        if address.kind() != AddressKind::Wallet {
            return Err(KeyError::NotAWalletAddress(address.clone()));
        }
        Self::from_sec1_bytes(address.raw())
    }

    /// Compressed SEC1 encoding, 33 bytes.
    pub fn to_compressed_bytes(&self) -> Vec<u8> {
        self.verifying_key.to_encoded_point(true).as_bytes().to_vec()
    }

    /// The wallet address for this key.
    pub fn address(&self) -> Address {
        // A compressed secp256k1 point is always WALLET_ADDR_SIZE bytes.
        Address::wallet_from_point(&self.to_compressed_bytes())
    }

    /// Check a DER signature over a 32-byte digest.
    ///
    /// High-S signatures are accepted. Other signers on the network do not
    /// normalize S, and `k256` only verifies the low-S form.
    pub fn verify_digest(
        &self,
        digest: &[u8; 32],
        signature: &TxSignature,
    ) -> Result<(), super::signatures::SignatureError> {
        let parsed = Signature::from_der(signature.as_bytes())
            .map_err(|_| super::signatures::SignatureError::MalformedDer)?;
        let parsed = parsed.normalize_s().unwrap_or(parsed);
        self.verifying_key
            .verify_prehash(digest, &parsed)
            .map_err(|_| super::signatures::SignatureError::VerificationFailed)
    }
}

impl PartialEq for WalletPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_compressed_bytes() == other.to_compressed_bytes()
    }
}

impl Eq for WalletPublicKey {}

impl fmt::Debug for WalletPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WalletPublicKey({})",
            hex::encode_upper(self.to_compressed_bytes())
        )
    }
}
