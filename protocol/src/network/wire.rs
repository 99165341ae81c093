//! Binary wire encoding for structured messages.
//!
//! Everything that crosses a [`RequestChannel`](super::RequestChannel) is
//! bincode with one fixed configuration: fixed-width little-endian integers,
//! a hard size limit of [`MAX_MESSAGE_BYTES`], and no trailing bytes. Both
//! ends must agree on these options, so they live in exactly one place.
//!
//! This is the *transport* form. The bytes that get signed are produced by
//! [`crate::transaction::encoding`] and are unrelated to this format.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::block::FinalBlock;
use crate::config::MAX_MESSAGE_BYTES;
use crate::network::messages::{RepeaterRequest, RepeaterResponse};
use crate::transaction::{Envelope, Proposal, Transaction};

#[derive(Debug, Error)]
pub enum WireError {
    #[error("failed to encode {kind}: {source}")]
    Encode {
        kind: &'static str,
        #[source]
        source: bincode::Error,
    },

    #[error("failed to decode {kind}: {source}")]
    Decode {
        kind: &'static str,
        #[source]
        source: bincode::Error,
    },
}

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_limit(MAX_MESSAGE_BYTES)
        .reject_trailing_bytes()
}

/// A message with a wire form.
pub trait WireMessage: Serialize + DeserializeOwned {
    /// Name used in error messages.
    const KIND: &'static str;

    fn to_wire(&self) -> Result<Vec<u8>, WireError> {
        options().serialize(self).map_err(|source| WireError::Encode {
            kind: Self::KIND,
            source,
        })
    }

    fn from_wire(bytes: &[u8]) -> Result<Self, WireError> {
        options().deserialize(bytes).map_err(|source| WireError::Decode {
            kind: Self::KIND,
            source,
        })
    }
}

impl WireMessage for Transaction {
    const KIND: &'static str = "transaction";
}

impl WireMessage for Envelope {
    const KIND: &'static str = "envelope";
}

impl WireMessage for Proposal {
    const KIND: &'static str = "proposal";
}

impl WireMessage for FinalBlock {
    const KIND: &'static str = "final block";
}

impl WireMessage for RepeaterRequest {
    const KIND: &'static str = "repeater request";
}

impl WireMessage for RepeaterResponse {
    const KIND: &'static str = "repeater response";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::WalletKeypair;
    use crate::network::messages::RepeaterOperation;
    use crate::transaction::{batch, sign_transaction, Operation, Transfer, TransactionBuilder};

    fn signed_tx() -> Transaction {
        let kp = WalletKeypair::generate();
        let tx = TransactionBuilder::new(Operation::Exchange)
            .transfer(Transfer::new(kp.address(), 0, -1, 0))
            .transfer(Transfer::new(WalletKeypair::generate().address(), 0, 1, 0))
            .nonce(b"wire".to_vec())
            .build()
            .unwrap();
        sign_transaction(&tx, &kp).unwrap()
    }

    #[test]
    fn request_layout_is_fixed_width() {
        let req = RepeaterRequest {
            timestamp: 1,
            operation: RepeaterOperation::CheckTransaction,
            uri: "ab".to_string(),
        };
        let bytes = req.to_wire().unwrap();
        // i64 timestamp | i32 op | u64 len | "ab"
        assert_eq!(bytes.len(), 8 + 4 + 8 + 2);
        assert_eq!(&bytes[0..8], &1i64.to_le_bytes());
        assert_eq!(&bytes[8..12], &9i32.to_le_bytes());
    }

    #[test]
    fn envelope_survives_wire() {
        let env = batch(vec![signed_tx(), signed_tx()]).unwrap();
        let back = Envelope::from_wire(&env.to_wire().unwrap()).unwrap();
        assert_eq!(back, env);
    }

    #[test]
    fn unknown_repeater_operation_rejected() {
        let req = RepeaterRequest {
            timestamp: 0,
            operation: RepeaterOperation::GetBlockAsBytes,
            uri: String::new(),
        };
        let mut bytes = req.to_wire().unwrap();
        bytes[8..12].copy_from_slice(&42i32.to_le_bytes());
        assert!(matches!(
            RepeaterRequest::from_wire(&bytes),
            Err(WireError::Decode { .. })
        ));
    }

    #[test]
    fn unknown_transaction_operation_rejected() {
        let tx = signed_tx();
        let mut bytes = tx.to_wire().unwrap();
        // Fields are serialized in order: transfers, operation, nonce,
        // signature. Count back from the end past `Some(sig)` and the nonce.
        let sig_part = 1 + 8 + tx.signature().unwrap().len();
        let nonce_part = 8 + tx.nonce().len();
        let op_offset = bytes.len() - sig_part - nonce_part - 1;
        assert_eq!(bytes[op_offset], Operation::Exchange.code());
        bytes[op_offset] = 7;
        assert!(Transaction::from_wire(&bytes).is_err());
    }

    #[test]
    fn trailing_bytes_rejected() {
        let resp = RepeaterResponse::ok(b"42".to_vec());
        let mut bytes = resp.to_wire().unwrap();
        bytes.push(0);
        assert!(RepeaterResponse::from_wire(&bytes).is_err());
    }

    #[test]
    fn truncated_input_rejected() {
        let resp = RepeaterResponse::ok(b"42".to_vec());
        let bytes = resp.to_wire().unwrap();
        assert!(RepeaterResponse::from_wire(&bytes[..bytes.len() - 1]).is_err());
    }
}
