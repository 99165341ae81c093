//! # Protocol Configuration & Constants
//!
//! Every magic number the client shares with the network lives here, next
//! to the runtime [`ClientConfig`] that says *where* the network is.
//!
//! The constants fall into two groups. Wire-level sizes and operation codes
//! are a registry shared out-of-band with the ledger: changing one of them
//! breaks signature verification or request routing for every participant.
//! Limits such as [`MAX_FIELD_BYTES`] are client-side guard rails and can be
//! tuned without coordinating with anyone.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Address & Signature Sizes
// ---------------------------------------------------------------------------

/// Raw length of a wallet address: a compressed secp256k1 SEC1 point.
pub const WALLET_ADDR_SIZE: usize = 33;

/// Raw length of a node address: a compressed secp384r1 SEC1 point.
pub const NODE_ADDR_SIZE: usize = 49;

/// Wallet address length including the one-byte type prefix.
pub const WALLET_ADDR_BUF_SIZE: usize = WALLET_ADDR_SIZE + 1;

/// Node address length including the one-byte type prefix.
pub const NODE_ADDR_BUF_SIZE: usize = NODE_ADDR_SIZE + 1;

/// Upper bound on a DER-encoded secp256k1 ECDSA signature.
pub const MAX_WALLET_SIG_SIZE: usize = 72;

// ---------------------------------------------------------------------------
// Canonical Encoding Limits
// ---------------------------------------------------------------------------

/// Maximum size of a nonce or an oracle payload, in bytes.
pub const MAX_FIELD_BYTES: usize = 256 * 1024;

/// Maximum length of a fully-qualified oracle name, in bytes.
pub const MAX_ORACLE_NAME_BYTES: usize = 255;

/// Maximum number of transfers in a single transaction.
pub const MAX_TRANSFERS: usize = 256;

// ---------------------------------------------------------------------------
// Wire Parameters
// ---------------------------------------------------------------------------

/// Largest structured message we are willing to encode or decode.
/// A finalized block with a few thousand transactions fits comfortably.
pub const MAX_MESSAGE_BYTES: u64 = 16 * 1024 * 1024;

/// Default frame limit for the TCP transport. One byte of headroom over the
/// message limit is not needed: frames carry exactly one message.
pub const DEFAULT_MAX_FRAME_BYTES: usize = MAX_MESSAGE_BYTES as usize;

/// Repeater operation code: fetch a finalized block as raw bytes.
pub const OP_GET_BLOCK_AS_BYTES: i32 = 5;

/// Repeater operation code: check whether a transaction was finalized.
pub const OP_CHECK_TRANSACTION: i32 = 9;

/// Return code the repeater uses for success.
pub const REPEATER_OK: i32 = 0;

// ---------------------------------------------------------------------------
// Key Storage
// ---------------------------------------------------------------------------

/// PBKDF2 iteration count used when exporting encrypted keys.
/// Matches the PKCS#8 default most tooling writes.
pub const KEY_EXPORT_PBKDF2_ITERATIONS: u32 = 2048;

/// PEM label of an encrypted PKCS#8 private key.
pub const ENCRYPTED_KEY_PEM_LABEL: &str = "ENCRYPTED PRIVATE KEY";

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// URI scheme for shard resources. A deployment constant, not negotiated.
pub const DEFAULT_URI_SCHEME: &str = "tessera";

/// Default announcer endpoint (transaction submission).
pub const DEFAULT_ANNOUNCER_ENDPOINT: &str = "127.0.0.1:55706";

/// Default repeater endpoint (status and block queries).
pub const DEFAULT_REPEATER_ENDPOINT: &str = "127.0.0.1:55708";

/// Default receive timeout for a single request/reply exchange.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Errors raised while loading a [`ClientConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Where the network lives and how patient we are with it.
///
/// Every field has a default, so a config file only needs to name what
/// differs from a local devnet:
///
/// ```json
/// { "shard": "shard-1", "repeater_endpoint": "10.0.0.7:55708" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// `host:port` of the announcer.
    pub announcer_endpoint: String,
    /// `host:port` of the repeater.
    pub repeater_endpoint: String,
    /// Shard identifier embedded in query URIs.
    pub shard: String,
    /// URI scheme for shard resources.
    pub uri_scheme: String,
    /// Receive timeout per exchange, in milliseconds.
    pub request_timeout_ms: u64,
    /// Largest frame accepted from either endpoint.
    pub max_frame_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            announcer_endpoint: DEFAULT_ANNOUNCER_ENDPOINT.to_string(),
            repeater_endpoint: DEFAULT_REPEATER_ENDPOINT.to_string(),
            shard: "shard-1".to_string(),
            uri_scheme: DEFAULT_URI_SCHEME.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl ClientConfig {
    /// Loads a JSON config file. Missing fields fall back to defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would make every request fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shard.is_empty() || self.shard.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "shard must be a non-empty path segment, got {:?}",
                self.shard
            )));
        }
        if self.uri_scheme.is_empty() || self.uri_scheme.contains(':') {
            return Err(ConfigError::Invalid(format!(
                "uri_scheme must be a bare scheme name, got {:?}",
                self.uri_scheme
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_frame_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_frame_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The receive timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
