//! # Hashing Utilities
//!
//! SHA-256 is the only hash function on the signing path. The network
//! digests the canonical encoding of a transaction with SHA-256 before the
//! ECDSA step, and every participant has to agree on that bit for bit, so
//! there is exactly one choice here and it is not ours to make.
//!
//! The Merkle helper builds block transaction roots the same way: SHA-256
//! over pairs, odd leaves duplicated.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data.
///
/// # Example
///
/// ```
/// use tessera_protocol::crypto::sha256;
///
/// let hash = sha256(b"tessera");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> Vec<u8> {
    sha256_array(data).to_vec()
}

/// Compute the SHA-256 hash and return a fixed-size array.
///
/// This is the digest that gets signed. Callers on the signing path want
/// the array type because the ECDSA prehash API takes exactly 32 bytes.
pub fn sha256_array(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hash several byte slices as if they were concatenated.
pub fn sha256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// Compute the double-SHA-256 hash: `SHA-256(SHA-256(data))`.
///
/// Used for block hashes, where a length-extension-resistant digest is
/// worth the second pass.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256_array(&sha256_array(data))
}

/// Compute a binary Merkle root over 32-byte leaves.
///
/// An odd node at any level is paired with itself. A single leaf is
/// hashed with itself so the root is always a hash output. The empty
/// tree has an all-zero root.
pub fn merkle_root(leaves: &[[u8; 32]]) -> [u8; 32] {
    if leaves.is_empty() {
        return [0u8; 32];
    }

    let mut level: Vec<[u8; 32]> = leaves.to_vec();
    if level.len() == 1 {
        return sha256_multi(&[level[0].as_slice(), level[0].as_slice()]);
    }

    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let left = &pair[0];
                let right = pair.get(1).unwrap_or(left);
                sha256_multi(&[left.as_slice(), right.as_slice()])
            })
            .collect();
    }

    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        let hash = sha256(b"");
        let expected =
            hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .unwrap();
        assert_eq!(hash, expected);
    }

    #[test]
    fn test_sha256_array_matches_vec() {
        let vec_result = sha256(b"test data");
        let arr_result = sha256_array(b"test data");
        assert_eq!(vec_result.as_slice(), arr_result.as_slice());
    }

    #[test]
    fn sha256_multi_equals_concatenation() {
        let multi = sha256_multi(&[b"hello", b" world"]);
        assert_eq!(multi, sha256_array(b"hello world"));
    }

    #[test]
    fn double_sha256_is_hash_of_hash() {
        let single = sha256_array(b"block");
        assert_eq!(double_sha256(b"block"), sha256_array(&single));
    }

    #[test]
    fn merkle_root_empty_is_zero() {
        assert_eq!(merkle_root(&[]), [0u8; 32]);
    }

    #[test]
    fn merkle_root_single_leaf_pairs_with_itself() {
        let leaf = sha256_array(b"only");
        let expected = sha256_multi(&[leaf.as_slice(), leaf.as_slice()]);
        assert_eq!(merkle_root(&[leaf]), expected);
    }

    #[test]
    fn merkle_root_odd_leaf_duplicated() {
        let a = sha256_array(b"a");
        let b = sha256_array(b"b");
        let c = sha256_array(b"c");
        let ab = sha256_multi(&[a.as_slice(), b.as_slice()]);
        let cc = sha256_multi(&[c.as_slice(), c.as_slice()]);
        let expected = sha256_multi(&[ab.as_slice(), cc.as_slice()]);
        assert_eq!(merkle_root(&[a, b, c]), expected);
    }

    #[test]
    fn merkle_root_order_matters() {
        let a = sha256_array(b"first");
        let b = sha256_array(b"second");
        assert_ne!(merkle_root(&[a, b]), merkle_root(&[b, a]));
    }
}
