//! Canonical byte encoding of signable messages.
//!
//! Every signature in the system is over SHA-256 of one of these byte
//! strings, so the layout is fixed and shared with every validator. All
//! integers are fixed-width little-endian. There is exactly one layout per
//! message type; nothing here is negotiable or versioned.
//!
//! ```text
//! transaction:
//!   u64 transfer_count | u64 nonce_len | u8 operation
//!   | transfer_count x ( address canonical | u64 coin | i64 amount | u64 delay )
//!   | nonce
//!
//! proposal (one per signer):
//!   u64 name_len | oracle name (UTF-8) | u64 data_len | data | signer address canonical
//! ```
//!
//! The address is self-delimiting: its first byte is the length of the
//! key that follows.

use thiserror::Error;

use super::types::{Address, Operation, Transfer, TypeError};
use crate::config::{MAX_FIELD_BYTES, MAX_ORACLE_NAME_BYTES, MAX_TRANSFERS};

/// Errors raised while producing or reading canonical bytes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("{field} is {len} bytes, limit is {max}")]
    FieldTooLarge {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("unknown operation code {0}")]
    UnknownOperation(u8),

    #[error("transaction has no transfers")]
    EmptyTransfers,

    #[error("truncated input: needed {needed} more bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    #[error("invalid address at offset {offset}: {source}")]
    InvalidAddress {
        offset: usize,
        #[source]
        source: TypeError,
    },
}

/// Values with a canonical signable encoding.
pub trait CanonicalEncode {
    /// The exact bytes that get hashed and signed. Pure and deterministic.
    fn encode_canonical(&self) -> Result<Vec<u8>, EncodingError>;
}

fn check_len(field: &'static str, len: usize, max: usize) -> Result<(), EncodingError> {
    if len > max {
        return Err(EncodingError::FieldTooLarge { field, len, max });
    }
    Ok(())
}

/// Canonical transaction message (signature excluded).
pub fn encode_transaction_message(
    transfers: &[Transfer],
    operation: Operation,
    nonce: &[u8],
) -> Result<Vec<u8>, EncodingError> {
    if transfers.is_empty() {
        return Err(EncodingError::EmptyTransfers);
    }
    check_len("transfers", transfers.len(), MAX_TRANSFERS)?;
    check_len("nonce", nonce.len(), MAX_FIELD_BYTES)?;

    let per_transfer = transfers
        .first()
        .map(|t| t.address.canonical().len() + 24)
        .unwrap_or(0);
    let mut buf = Vec::with_capacity(17 + transfers.len() * per_transfer + nonce.len());

    buf.extend_from_slice(&(transfers.len() as u64).to_le_bytes());
    buf.extend_from_slice(&(nonce.len() as u64).to_le_bytes());
    buf.push(operation.code());

    for transfer in transfers {
        buf.extend_from_slice(transfer.address.canonical());
        buf.extend_from_slice(&transfer.coin.to_le_bytes());
        buf.extend_from_slice(&transfer.amount.to_le_bytes());
        buf.extend_from_slice(&transfer.delay.to_le_bytes());
    }

    buf.extend_from_slice(nonce);
    Ok(buf)
}

/// Canonical proposal message for a single signer.
pub fn encode_proposal_message(
    oracle_name: &str,
    data: &[u8],
    signer: &Address,
) -> Result<Vec<u8>, EncodingError> {
    check_len("oracle name", oracle_name.len(), MAX_ORACLE_NAME_BYTES)?;
    check_len("payload", data.len(), MAX_FIELD_BYTES)?;

    let mut buf =
        Vec::with_capacity(16 + oracle_name.len() + data.len() + signer.canonical().len());
    buf.extend_from_slice(&(oracle_name.len() as u64).to_le_bytes());
    buf.extend_from_slice(oracle_name.as_bytes());
    buf.extend_from_slice(&(data.len() as u64).to_le_bytes());
    buf.extend_from_slice(data);
    buf.extend_from_slice(signer.canonical());
    Ok(buf)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// The fields of a decoded transaction message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionMessage {
    pub transfers: Vec<Transfer>,
    pub operation: Operation,
    pub nonce: Vec<u8>,
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], EncodingError> {
        let remaining = self.bytes.len() - self.offset;
        if n > remaining {
            return Err(EncodingError::Truncated {
                offset: self.offset,
                needed: n - remaining,
            });
        }
        let slice = &self.bytes[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, EncodingError> {
        Ok(self.take(1)?[0])
    }

    fn u64(&mut self) -> Result<u64, EncodingError> {
        let mut arr = [0u8; 8];
        arr.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(arr))
    }

    fn i64(&mut self) -> Result<i64, EncodingError> {
        let mut arr = [0u8; 8];
        arr.copy_from_slice(self.take(8)?);
        Ok(i64::from_le_bytes(arr))
    }

    fn address(&mut self) -> Result<Address, EncodingError> {
        let offset = self.offset;
        let prefix = self.u8()? as usize;
        let raw = self.take(prefix)?;
        let mut canonical = Vec::with_capacity(prefix + 1);
        canonical.push(prefix as u8);
        canonical.extend_from_slice(raw);
        Address::from_bytes(&canonical)
            .map_err(|source| EncodingError::InvalidAddress { offset, source })
    }
}

/// Parse a canonical transaction message. The input must be exactly one
/// message with no trailing bytes.
pub fn decode_transaction_message(bytes: &[u8]) -> Result<TransactionMessage, EncodingError> {
    let mut reader = Reader { bytes, offset: 0 };

    let count = reader.u64()?;
    let nonce_len = reader.u64()?;
    let op_code = reader.u8()?;
    let operation =
        Operation::try_from(op_code).map_err(|_| EncodingError::UnknownOperation(op_code))?;

    if count == 0 {
        return Err(EncodingError::EmptyTransfers);
    }
    check_len("transfers", count as usize, MAX_TRANSFERS)?;
    check_len("nonce", nonce_len as usize, MAX_FIELD_BYTES)?;

    let mut transfers = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let address = reader.address()?;
        let coin = reader.u64()?;
        let amount = reader.i64()?;
        let delay = reader.u64()?;
        transfers.push(Transfer::new(address, coin, amount, delay));
    }

    let nonce = reader.take(nonce_len as usize)?.to_vec();

    let trailing = bytes.len() - reader.offset;
    if trailing != 0 {
        return Err(EncodingError::TrailingBytes(trailing));
    }

    Ok(TransactionMessage {
        transfers,
        operation,
        nonce,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR_1: &str = "2102514038DA1905561BF9043269B8515C1E7C4E79B011291B4CBED5B18DAECB71E4";
    const ADDR_2: &str = "2102E14466DC0E5A3E6EBBEAB5DD24ABE950E44EF2BEB509A5FD113460414A6EFAB4";

    fn sample_transfers() -> Vec<Transfer> {
        vec![
            Transfer::new(Address::from_hex(ADDR_1).unwrap(), 0, -1, 0),
            Transfer::new(Address::from_hex(ADDR_2).unwrap(), 0, 1, 0),
        ]
    }

    #[test]
    fn header_layout() {
        let bytes =
            encode_transaction_message(&sample_transfers(), Operation::Exchange, &[0xAA; 16])
                .unwrap();
        assert_eq!(&bytes[0..8], &2u64.to_le_bytes());
        assert_eq!(&bytes[8..16], &16u64.to_le_bytes());
        assert_eq!(bytes[16], 2);
        // header + 2 x (34 + 24) + nonce
        assert_eq!(bytes.len(), 17 + 2 * 58 + 16);
    }

    #[test]
    fn transfer_fields_are_little_endian() {
        let bytes =
            encode_transaction_message(&sample_transfers(), Operation::Create, b"").unwrap();
        let first = &bytes[17..17 + 58];
        assert_eq!(first[0], 0x21);
        assert_eq!(&first[34..42], &0u64.to_le_bytes());
        assert_eq!(&first[42..50], &[0xFF; 8]);
        assert_eq!(&first[50..58], &0u64.to_le_bytes());
    }

    #[test]
    fn encoding_is_deterministic() {
        let a = encode_transaction_message(&sample_transfers(), Operation::Modify, b"n").unwrap();
        let b = encode_transaction_message(&sample_transfers(), Operation::Modify, b"n").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_transfers_rejected() {
        assert_eq!(
            encode_transaction_message(&[], Operation::Create, b""),
            Err(EncodingError::EmptyTransfers)
        );
    }

    #[test]
    fn oversized_nonce_rejected() {
        let nonce = vec![0u8; MAX_FIELD_BYTES + 1];
        assert!(matches!(
            encode_transaction_message(&sample_transfers(), Operation::Create, &nonce),
            Err(EncodingError::FieldTooLarge { field: "nonce", .. })
        ));
    }

    #[test]
    fn too_many_transfers_rejected() {
        let transfers = vec![sample_transfers()[0].clone(); MAX_TRANSFERS + 1];
        assert!(matches!(
            encode_transaction_message(&transfers, Operation::Create, b""),
            Err(EncodingError::FieldTooLarge {
                field: "transfers",
                ..
            })
        ));
    }

    #[test]
    fn proposal_message_layout() {
        let signer = Address::from_hex(ADDR_1).unwrap();
        let bytes = encode_proposal_message("io.tessera.price", b"\x01\x02", &signer).unwrap();
        assert_eq!(&bytes[0..8], &16u64.to_le_bytes());
        assert_eq!(&bytes[8..24], b"io.tessera.price");
        assert_eq!(&bytes[24..32], &2u64.to_le_bytes());
        assert_eq!(&bytes[32..34], &[1, 2]);
        assert_eq!(&bytes[34..], signer.canonical());
    }

    #[test]
    fn proposal_name_limit() {
        let signer = Address::from_hex(ADDR_1).unwrap();
        let name = "a".repeat(MAX_ORACLE_NAME_BYTES + 1);
        assert!(matches!(
            encode_proposal_message(&name, b"", &signer),
            Err(EncodingError::FieldTooLarge { .. })
        ));
    }

    #[test]
    fn decode_reads_back_fields() {
        let transfers = sample_transfers();
        let bytes = encode_transaction_message(&transfers, Operation::Exchange, b"nonce").unwrap();
        let msg = decode_transaction_message(&bytes).unwrap();
        assert_eq!(msg.transfers, transfers);
        assert_eq!(msg.operation, Operation::Exchange);
        assert_eq!(msg.nonce, b"nonce");
    }

    #[test]
    fn decode_rejects_unknown_operation() {
        let mut bytes =
            encode_transaction_message(&sample_transfers(), Operation::Create, b"").unwrap();
        bytes[16] = 9;
        assert_eq!(
            decode_transaction_message(&bytes),
            Err(EncodingError::UnknownOperation(9))
        );
    }

    #[test]
    fn decode_rejects_truncation_and_trailing() {
        let bytes =
            encode_transaction_message(&sample_transfers(), Operation::Create, b"xy").unwrap();
        assert!(matches!(
            decode_transaction_message(&bytes[..bytes.len() - 1]),
            Err(EncodingError::Truncated { .. })
        ));

        let mut longer = bytes.clone();
        longer.push(0);
        assert_eq!(
            decode_transaction_message(&longer),
            Err(EncodingError::TrailingBytes(1))
        );
    }
}
