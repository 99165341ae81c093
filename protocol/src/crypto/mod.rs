//! # Cryptographic Primitives for Tessera
//!
//! Everything the client does with keys goes through here:
//!
//! - **ECDSA over secp256k1** for wallet signatures, DER-encoded.
//! - **SHA-256** for the digest that gets signed, and for block Merkle roots.
//! - **PKCS#8 PBES2** for keys at rest.
//!
//! Nothing here is clever. These are thin, typed wrappers around `k256`,
//! `sha2` and `pkcs8`, so the rest of the crate never touches curve types
//! directly.

pub mod hash;
pub mod keys;
pub mod keystore;
pub mod signatures;

pub use hash::{double_sha256, merkle_root, sha256, sha256_array};
pub use keys::{KeyError, WalletKeypair, WalletPublicKey};
pub use keystore::{KeyDecryptor, KeyFile, Pkcs8KeyDecryptor};
pub use signatures::{sign, verify, SignatureError, TxSignature};
