//! # Transaction Module
//!
//! Construction, canonical encoding, signing and batching of Tessera
//! transactions and oracle proposals.
//!
//! ## Architecture
//!
//! ```text
//! types.rs        — Address, Operation, Transfer
//! builder.rs      — TransactionBuilder and the immutable Transaction
//! encoding.rs     — canonical signable bytes (and the reverse)
//! verification.rs — soundness rules and signature verification
//! signing.rs      — sign_transaction with a wallet key
//! proposal.rs     — oracle proposals, single- and multi-signer
//! envelope.rs     — batching signed transactions for submission
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Build**: [`TransactionBuilder`] assembles transfers, operation, nonce.
//! 2. **Sign**: [`sign_transaction`] validates, encodes, hashes and signs,
//!    returning a new signed value.
//! 3. **Batch**: [`batch`] wraps signed transactions into an [`Envelope`].
//! 4. **Submit**: [`crate::network::AnnouncerClient`] sends the envelope.
//! 5. **Confirm**: [`crate::network::RepeaterClient`] finds it in a block.
//!
//! ## Design Decisions
//!
//! - All integers in the signed message are fixed-width little-endian.
//!   The layout is shared with every validator and never changes.
//! - Amounts are `i64`: negative debits, positive credits. Per coin they
//!   must sum to zero, checked in `i128`.
//! - Exactly one address may be debited, and it is the signer.

pub mod builder;
pub mod encoding;
pub mod envelope;
pub mod proposal;
pub mod signing;
pub mod types;
pub mod verification;

pub use builder::{Transaction, TransactionBuilder};
pub use encoding::{CanonicalEncode, EncodingError};
pub use envelope::{batch, Envelope, EnvelopeError};
pub use proposal::{build_proposal, verify_proposal, Proposal, ProposalError, ProposalSignature};
pub use signing::{sign_transaction, SigningError};
pub use types::{Address, AddressKind, Operation, Transfer, TypeError};
pub use verification::{check_balanced, verify_transaction, TransactionError};
