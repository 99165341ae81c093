//! # Inclusion Query State Machine
//!
//! Finding out whether a submitted transaction made it into a block is a
//! two-step conversation with the repeater:
//!
//! 1. `CheckTransaction` on `scheme://shard/0/SIG` answers with the block
//!    height, as ASCII decimal.
//! 2. `GetBlockAsBytes` on `scheme://shard/HEIGHT` returns the block, which
//!    is then scanned for the signature.
//!
//! ```text
//!   Idle ──begin_check──▶ AwaitingCheck ──ok──▶ ConfirmedIncluded ──begin_block──▶ AwaitingBlock
//!                              │                                                       │
//!                              └──err──▶ CheckFailed              BlockFailed ◀──err───┤
//!                                                                                      ok
//!                                                                                      ▼
//!                                                                               BlockRetrieved
//! ```
//!
//! `CheckFailed`, `BlockFailed` and `BlockRetrieved` are terminal. A
//! retrieved block that does not contain the signature is still
//! `BlockRetrieved`; the caller gets [`RepeaterError::NotFound`], which is
//! distinct from a failed retrieval.
//!
//! The machine does no I/O. [`RepeaterClient`](super::RepeaterClient)
//! drives it over a channel, and tests can drive it by hand.

use std::fmt;

use tracing::{info, warn};

use super::messages::{RepeaterOperation, RepeaterRequest, RepeaterResponse};
use super::repeater::RepeaterError;
use super::transport::TransportError;
use super::uri::ShardUri;
use super::wire::WireMessage;
use crate::block::FinalBlock;
use crate::crypto::signatures::TxSignature;

/// Why an exchange with the repeater did not produce a usable answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryFailure {
    /// No reply before the deadline.
    Timeout { after_ms: u64 },
    /// The channel failed.
    Transport(String),
    /// The repeater answered with a non-zero return code.
    Rejected { return_code: i32, message: String },
    /// The reply could not be understood.
    Protocol(String),
}

impl QueryFailure {
    /// Attach the operation and URI that failed.
    pub fn into_error(self, operation: RepeaterOperation, uri: &str) -> RepeaterError {
        let uri = uri.to_string();
        match self {
            Self::Timeout { after_ms } => RepeaterError::Timeout {
                operation,
                uri,
                after_ms,
            },
            Self::Transport(reason) => RepeaterError::Transport {
                operation,
                uri,
                reason,
            },
            Self::Rejected {
                return_code,
                message,
            } => RepeaterError::Rejected {
                operation,
                uri,
                return_code,
                message,
            },
            Self::Protocol(reason) => RepeaterError::Protocol {
                operation,
                uri,
                reason,
            },
        }
    }
}

impl From<TransportError> for QueryFailure {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout { after_ms } => Self::Timeout { after_ms },
            other => Self::Transport(other.to_string()),
        }
    }
}

impl fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { after_ms } => write!(f, "timed out after {} ms", after_ms),
            Self::Transport(reason) => write!(f, "transport failure: {}", reason),
            Self::Rejected {
                return_code,
                message,
            } => write!(f, "rejected with code {}: {}", return_code, message),
            Self::Protocol(reason) => write!(f, "protocol error: {}", reason),
        }
    }
}

/// Where an [`InclusionQuery`] is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryState {
    Idle,
    AwaitingCheck { uri: String },
    ConfirmedIncluded { height: u64 },
    CheckFailed(QueryFailure),
    AwaitingBlock { height: u64, uri: String },
    BlockRetrieved { height: u64, block: FinalBlock },
    BlockFailed(QueryFailure),
}

impl QueryState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::AwaitingCheck { .. } => "AwaitingCheck",
            Self::ConfirmedIncluded { .. } => "ConfirmedIncluded",
            Self::CheckFailed(_) => "CheckFailed",
            Self::AwaitingBlock { .. } => "AwaitingBlock",
            Self::BlockRetrieved { .. } => "BlockRetrieved",
            Self::BlockFailed(_) => "BlockFailed",
        }
    }
}

/// Tracks one transaction's inclusion check from first request to block.
#[derive(Debug, Clone)]
pub struct InclusionQuery {
    scheme: String,
    shard: String,
    signature: TxSignature,
    state: QueryState,
}

impl InclusionQuery {
    pub fn new(scheme: &str, shard: &str, signature: TxSignature) -> Self {
        Self {
            scheme: scheme.to_string(),
            shard: shard.to_string(),
            signature,
            state: QueryState::Idle,
        }
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn signature(&self) -> &TxSignature {
        &self.signature
    }

    /// Returns `true` if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            QueryState::CheckFailed(_)
                | QueryState::BlockFailed(_)
                | QueryState::BlockRetrieved { .. }
        )
    }

    /// The retrieved block, once in `BlockRetrieved`.
    pub fn block(&self) -> Option<&FinalBlock> {
        match &self.state {
            QueryState::BlockRetrieved { block, .. } => Some(block),
            _ => None,
        }
    }

    /// Consume the query and return the retrieved block, if any.
    pub fn into_block(self) -> Option<FinalBlock> {
        match self.state {
            QueryState::BlockRetrieved { block, .. } => Some(block),
            _ => None,
        }
    }

    fn invalid_state(&self, expected: &'static str) -> RepeaterError {
        RepeaterError::InvalidState {
            expected,
            actual: self.state.name(),
        }
    }

    /// `Idle` → `AwaitingCheck`. Returns the request to send.
    pub fn begin_check(&mut self) -> Result<RepeaterRequest, RepeaterError> {
        if self.state != QueryState::Idle {
            return Err(self.invalid_state("Idle"));
        }
        let uri = ShardUri::check(&self.scheme, &self.shard, &self.signature).to_string();
        let request = RepeaterRequest::new(RepeaterOperation::CheckTransaction, uri.clone());
        info!(%uri, "checking transaction inclusion");
        self.state = QueryState::AwaitingCheck { uri };
        Ok(request)
    }

    /// `AwaitingCheck` → `ConfirmedIncluded` or `CheckFailed`.
    ///
    /// On success returns the block height.
    pub fn on_check_reply(
        &mut self,
        reply: Result<RepeaterResponse, QueryFailure>,
    ) -> Result<u64, RepeaterError> {
        let QueryState::AwaitingCheck { uri } = &self.state else {
            return Err(self.invalid_state("AwaitingCheck"));
        };
        let uri = uri.clone();

        match height_from_reply(reply) {
            Ok(height) => {
                info!(%uri, height, "transaction confirmed");
                self.state = QueryState::ConfirmedIncluded { height };
                Ok(height)
            }
            Err(failure) => {
                warn!(%uri, %failure, "inclusion check failed");
                self.state = QueryState::CheckFailed(failure.clone());
                Err(failure.into_error(RepeaterOperation::CheckTransaction, &uri))
            }
        }
    }

    /// `ConfirmedIncluded` → `AwaitingBlock`. Returns the request to send.
    pub fn begin_block(&mut self) -> Result<RepeaterRequest, RepeaterError> {
        let QueryState::ConfirmedIncluded { height } = self.state else {
            return Err(self.invalid_state("ConfirmedIncluded"));
        };
        let uri = ShardUri::block(&self.scheme, &self.shard, height).to_string();
        let request = RepeaterRequest::new(RepeaterOperation::GetBlockAsBytes, uri.clone());
        info!(%uri, height, "fetching block");
        self.state = QueryState::AwaitingBlock { height, uri };
        Ok(request)
    }

    /// `AwaitingBlock` → `BlockRetrieved` or `BlockFailed`.
    ///
    /// On success returns the index of the transaction within the block.
    /// A block that does not contain the signature leaves the query in
    /// `BlockRetrieved` and returns [`RepeaterError::NotFound`].
    pub fn on_block_reply(
        &mut self,
        reply: Result<RepeaterResponse, QueryFailure>,
    ) -> Result<usize, RepeaterError> {
        let QueryState::AwaitingBlock { height, uri } = &self.state else {
            return Err(self.invalid_state("AwaitingBlock"));
        };
        let (height, uri) = (*height, uri.clone());

        let block = match block_from_reply(reply) {
            Ok(block) => block,
            Err(failure) => {
                warn!(%uri, %failure, "block retrieval failed");
                self.state = QueryState::BlockFailed(failure.clone());
                return Err(failure.into_error(RepeaterOperation::GetBlockAsBytes, &uri));
            }
        };

        let position = block.transactions.iter().position(|tx| {
            tx.signature().map(|s| s.as_bytes()) == Some(self.signature.as_bytes())
        });
        self.state = QueryState::BlockRetrieved { height, block };

        match position {
            Some(index) => {
                info!(%uri, height, index, "transaction found in block");
                Ok(index)
            }
            None => {
                warn!(%uri, height, "block does not contain transaction");
                Err(RepeaterError::NotFound {
                    uri,
                    height,
                    signature: self.signature.to_hex(),
                })
            }
        }
    }
}

/// The payload of a reply with return code 0.
fn accepted(reply: Result<RepeaterResponse, QueryFailure>) -> Result<Vec<u8>, QueryFailure> {
    let response = reply?;
    if !response.is_ok() {
        return Err(QueryFailure::Rejected {
            return_code: response.return_code,
            message: response.message,
        });
    }
    Ok(response.raw_response)
}

/// The block height carried by a `CheckTransaction` reply.
///
/// Height 0 is the URI placeholder for "unknown", never a finalized block.
pub fn height_from_reply(
    reply: Result<RepeaterResponse, QueryFailure>,
) -> Result<u64, QueryFailure> {
    match parse_height(&accepted(reply)?)? {
        0 => Err(QueryFailure::Protocol("repeater reported block height 0".to_string())),
        height => Ok(height),
    }
}

/// The block carried by a `GetBlockAsBytes` reply.
pub fn block_from_reply(
    reply: Result<RepeaterResponse, QueryFailure>,
) -> Result<FinalBlock, QueryFailure> {
    FinalBlock::from_wire(&accepted(reply)?).map_err(|e| QueryFailure::Protocol(e.to_string()))
}

/// Parse an ASCII-decimal block height. Surrounding whitespace and a
/// trailing NUL are tolerated.
pub fn parse_height(raw: &[u8]) -> Result<u64, QueryFailure> {
    let text = std::str::from_utf8(raw)
        .map_err(|_| QueryFailure::Protocol("block height is not UTF-8".to_string()))?;
    let text = text.trim_end_matches('\0').trim();
    text.parse::<u64>().map_err(|_| {
        QueryFailure::Protocol(format!("block height {:?} is not a decimal integer", text))
    })
}
