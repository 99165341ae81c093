//! Announcer client: submits envelopes of signed transactions.
//!
//! The announcer's reply is an opaque acknowledgment. Its contents are not
//! interpreted here; an empty reply frame is still a successful
//! acknowledgment, and only a transport failure counts as a failed
//! submission.

use thiserror::Error;
use tracing::{info, warn};

use super::transport::{RequestChannel, TcpChannel, TransportError};
use super::wire::{WireError, WireMessage};
use crate::config::ClientConfig;
use crate::transaction::Envelope;

#[derive(Debug, Error)]
pub enum AnnouncerError {
    #[error("announcer {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: TransportError,
    },

    #[error(transparent)]
    Wire(#[from] WireError),
}

impl AnnouncerError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_timeout())
    }
}

/// The announcer's opaque reply to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgment(pub Vec<u8>);

impl Acknowledgment {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Client for the announcer endpoint.
#[derive(Debug)]
pub struct AnnouncerClient<C> {
    channel: C,
}

impl AnnouncerClient<TcpChannel> {
    /// Connect to the announcer named in `config`.
    pub async fn connect(config: &ClientConfig) -> Result<Self, TransportError> {
        let channel = TcpChannel::connect(
            &config.announcer_endpoint,
            config.request_timeout(),
            config.max_frame_bytes,
        )
        .await?;
        Ok(Self::new(channel))
    }
}

impl<C: RequestChannel> AnnouncerClient<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Send `envelope` and wait for the acknowledgment.
    pub async fn submit(&mut self, envelope: &Envelope) -> Result<Acknowledgment, AnnouncerError> {
        let payload = envelope.to_wire()?;
        let endpoint = self.channel.endpoint().to_string();

        match self.channel.request(&payload).await {
            Ok(reply) => {
                info!(
                    %endpoint,
                    transactions = envelope.len(),
                    bytes = payload.len(),
                    ack_len = reply.len(),
                    "envelope submitted"
                );
                Ok(Acknowledgment(reply))
            }
            Err(source) => {
                warn!(%endpoint, error = %source, "envelope submission failed");
                Err(AnnouncerError::Transport { endpoint, source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::crypto::keys::WalletKeypair;
    use crate::transaction::{batch, sign_transaction, Operation, Transfer, TransactionBuilder};

    struct FixedReply {
        reply: Option<Result<Vec<u8>, TransportError>>,
        received: Vec<Vec<u8>>,
    }

    #[async_trait]
    impl RequestChannel for FixedReply {
        async fn request(&mut self, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
            self.received.push(payload.to_vec());
            self.reply.take().unwrap_or(Err(TransportError::Closed))
        }

        fn endpoint(&self) -> &str {
            "fixed"
        }
    }

    fn envelope() -> Envelope {
        let kp = WalletKeypair::generate();
        let tx = TransactionBuilder::new(Operation::Exchange)
            .transfer(Transfer::new(kp.address(), 0, -1, 0))
            .transfer(Transfer::new(WalletKeypair::generate().address(), 0, 1, 0))
            .nonce(b"announce".to_vec())
            .build()
            .unwrap();
        batch(vec![sign_transaction(&tx, &kp).unwrap()]).unwrap()
    }

    #[tokio::test]
    async fn submit_sends_wire_envelope() {
        let env = envelope();
        let mut client = AnnouncerClient::new(FixedReply {
            reply: Some(Ok(b"ACK".to_vec())),
            received: Vec::new(),
        });

        let ack = client.submit(&env).await.unwrap();
        assert_eq!(ack.as_bytes(), b"ACK");
        let sent = &client.channel_mut().received[0];
        assert_eq!(Envelope::from_wire(sent).unwrap(), env);
    }

    #[tokio::test]
    async fn empty_ack_is_success() {
        let mut client = AnnouncerClient::new(FixedReply {
            reply: Some(Ok(Vec::new())),
            received: Vec::new(),
        });
        let ack = client.submit(&envelope()).await.unwrap();
        assert!(ack.is_empty());
    }

    #[tokio::test]
    async fn timeout_is_reported() {
        let mut client = AnnouncerClient::new(FixedReply {
            reply: Some(Err(TransportError::Timeout { after_ms: 10 })),
            received: Vec::new(),
        });
        let err = client.submit(&envelope()).await.unwrap_err();
        assert!(err.is_timeout());
    }
}
