//! Envelopes: ordered batches of signed transactions for submission.
//!
//! An envelope is the unit the announcer accepts. It is not signed itself;
//! each transaction inside carries its own signature. Order is preserved
//! exactly as given.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::builder::Transaction;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("cannot batch an empty list of transactions")]
    EmptyBatch,

    #[error("transaction at index {index} is unsigned")]
    UnsignedTransaction { index: usize },
}

/// A non-empty, ordered list of signed transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    transactions: Vec<Transaction>,
}

impl Envelope {
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Wraps signed transactions into an [`Envelope`].
pub fn batch(transactions: Vec<Transaction>) -> Result<Envelope, EnvelopeError> {
    if transactions.is_empty() {
        return Err(EnvelopeError::EmptyBatch);
    }
    if let Some(index) = transactions.iter().position(|tx| !tx.is_signed()) {
        return Err(EnvelopeError::UnsignedTransaction { index });
    }
    debug!(count = transactions.len(), "batched envelope");
    Ok(Envelope { transactions })
}
