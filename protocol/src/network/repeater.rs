//! # Repeater Client
//!
//! Async client for the repeater query service. It owns one
//! [`RequestChannel`] and drives an [`InclusionQuery`] over it.
//!
//! Every call is one or two strict request/reply exchanges. Nothing is
//! retried: a timeout or transport failure is reported with the operation
//! and URI that failed, and the channel is left for the caller to
//! reconnect.

use thiserror::Error;
use tracing::debug;

use super::messages::{RepeaterOperation, RepeaterRequest, RepeaterResponse};
use super::query::{block_from_reply, InclusionQuery, QueryFailure};
use super::transport::{RequestChannel, TcpChannel, TransportError};
use super::uri::ShardUri;
use super::wire::WireMessage;
use crate::block::FinalBlock;
use crate::config::ClientConfig;
use crate::crypto::signatures::TxSignature;

/// Errors from repeater queries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepeaterError {
    #[error("{operation} {uri}: transport failure: {reason}")]
    Transport {
        operation: RepeaterOperation,
        uri: String,
        reason: String,
    },

    #[error("{operation} {uri}: no reply within {after_ms} ms")]
    Timeout {
        operation: RepeaterOperation,
        uri: String,
        after_ms: u64,
    },

    #[error("{operation} {uri}: repeater returned code {return_code}: {message}")]
    Rejected {
        operation: RepeaterOperation,
        uri: String,
        return_code: i32,
        message: String,
    },

    #[error("{operation} {uri}: {reason}")]
    Protocol {
        operation: RepeaterOperation,
        uri: String,
        reason: String,
    },

    #[error("block {height} ({uri}) does not contain transaction {signature}")]
    NotFound {
        uri: String,
        height: u64,
        signature: String,
    },

    #[error("query is in state {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },
}

impl RepeaterError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// A confirmed inclusion: where the transaction landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inclusion {
    pub height: u64,
    /// Position of the transaction within `block.transactions`.
    pub index: usize,
    pub block: FinalBlock,
}

/// Repeater client over any [`RequestChannel`].
#[derive(Debug)]
pub struct RepeaterClient<C> {
    channel: C,
    scheme: String,
    shard: String,
}

impl RepeaterClient<TcpChannel> {
    /// Connect to the repeater named in `config`.
    pub async fn connect(config: &ClientConfig) -> Result<Self, TransportError> {
        let channel = TcpChannel::connect(
            &config.repeater_endpoint,
            config.request_timeout(),
            config.max_frame_bytes,
        )
        .await?;
        Ok(Self::new(channel, &config.uri_scheme, &config.shard))
    }
}

impl<C: RequestChannel> RepeaterClient<C> {
    pub fn new(channel: C, scheme: &str, shard: &str) -> Self {
        Self {
            channel,
            scheme: scheme.to_string(),
            shard: shard.to_string(),
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn into_channel(self) -> C {
        self.channel
    }

    async fn exchange(
        &mut self,
        request: &RepeaterRequest,
    ) -> Result<RepeaterResponse, QueryFailure> {
        let payload = request
            .to_wire()
            .map_err(|e| QueryFailure::Protocol(e.to_string()))?;
        debug!(
            endpoint = self.channel.endpoint(),
            operation = %request.operation,
            uri = %request.uri,
            "sending repeater request"
        );
        let reply = self.channel.request(&payload).await?;
        RepeaterResponse::from_wire(&reply).map_err(|e| QueryFailure::Protocol(e.to_string()))
    }

    /// Send one request and return the raw response, whatever its code.
    pub async fn send(
        &mut self,
        request: &RepeaterRequest,
    ) -> Result<RepeaterResponse, RepeaterError> {
        self.exchange(request)
            .await
            .map_err(|f| f.into_error(request.operation, &request.uri))
    }

    /// Ask which block holds the transaction with `signature`.
    pub async fn check_transaction(
        &mut self,
        signature: &TxSignature,
    ) -> Result<u64, RepeaterError> {
        let mut query = InclusionQuery::new(&self.scheme, &self.shard, signature.clone());
        let request = query.begin_check()?;
        let reply = self.exchange(&request).await;
        query.on_check_reply(reply)
    }

    /// Fetch and decode the block at `height`.
    pub async fn fetch_block(&mut self, height: u64) -> Result<FinalBlock, RepeaterError> {
        let uri = ShardUri::block(&self.scheme, &self.shard, height).to_string();
        let request = RepeaterRequest::new(RepeaterOperation::GetBlockAsBytes, uri);

        let reply = self.exchange(&request).await;
        block_from_reply(reply).map_err(|f| f.into_error(request.operation, &request.uri))
    }

    /// Run the full check-then-fetch sequence for one transaction.
    pub async fn confirm_inclusion(
        &mut self,
        signature: &TxSignature,
    ) -> Result<Inclusion, RepeaterError> {
        let mut query = InclusionQuery::new(&self.scheme, &self.shard, signature.clone());

        let request = query.begin_check()?;
        let reply = self.exchange(&request).await;
        let height = query.on_check_reply(reply)?;

        let request = query.begin_block()?;
        let reply = self.exchange(&request).await;
        let index = query.on_block_reply(reply)?;

        let block = query.into_block().ok_or(RepeaterError::InvalidState {
            expected: "BlockRetrieved",
            actual: "BlockFailed",
        })?;
        Ok(Inclusion {
            height,
            index,
            block,
        })
    }
}
