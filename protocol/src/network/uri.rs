//! Shard resource URIs.
//!
//! ```text
//! scheme://shard[/height[/SIGNATURE-HEX[/ADDRESS-HEX]]]
//! ```
//!
//! A height of `0` in front of a signature means "height unknown, find it
//! by signature". Hex segments are written upper-case and parsed in either
//! case.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::crypto::signatures::TxSignature;
use crate::transaction::types::Address;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UriError {
    #[error("missing scheme separator \"://\" in {0:?}")]
    MissingScheme(String),

    #[error("empty scheme or shard in {0:?}")]
    EmptySegment(String),

    #[error("invalid height {0:?}")]
    InvalidHeight(String),

    #[error("invalid signature hex {0:?}")]
    InvalidSignature(String),

    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    #[error("too many path segments in {0:?}")]
    TooManySegments(String),
}

/// A parsed shard URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardUri {
    scheme: String,
    shard: String,
    height: Option<u64>,
    signature: Option<TxSignature>,
    address: Option<Address>,
}

impl ShardUri {
    /// `scheme://shard`
    pub fn shard(scheme: &str, shard: &str) -> Self {
        Self {
            scheme: scheme.to_string(),
            shard: shard.to_string(),
            height: None,
            signature: None,
            address: None,
        }
    }

    /// `scheme://shard/height`, the block query form.
    pub fn block(scheme: &str, shard: &str, height: u64) -> Self {
        Self::shard(scheme, shard).with_height(height)
    }

    /// `scheme://shard/0/SIG`, the inclusion check form.
    pub fn check(scheme: &str, shard: &str, signature: &TxSignature) -> Self {
        Self::shard(scheme, shard).with_signature(signature.clone())
    }

    pub fn with_height(mut self, height: u64) -> Self {
        self.height = Some(height);
        self
    }

    /// Attaches a signature segment. A missing height becomes `0`.
    pub fn with_signature(mut self, signature: TxSignature) -> Self {
        self.height.get_or_insert(0);
        self.signature = Some(signature);
        self
    }

    /// Attaches an address segment. Only meaningful after a signature.
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn shard_name(&self) -> &str {
        &self.shard
    }

    pub fn height(&self) -> Option<u64> {
        self.height
    }

    pub fn signature(&self) -> Option<&TxSignature> {
        self.signature.as_ref()
    }

    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }
}

impl fmt::Display for ShardUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.shard)?;
        let Some(height) = self.height else {
            return Ok(());
        };
        write!(f, "/{}", height)?;
        if let Some(sig) = &self.signature {
            write!(f, "/{}", sig.to_hex())?;
            if let Some(addr) = &self.address {
                write!(f, "/{}", addr.to_hex())?;
            }
        }
        Ok(())
    }
}

impl FromStr for ShardUri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| UriError::MissingScheme(s.to_string()))?;

        let mut segments = rest.trim_end_matches('/').split('/');
        let shard = segments.next().unwrap_or_default();
        if scheme.is_empty() || shard.is_empty() {
            return Err(UriError::EmptySegment(s.to_string()));
        }

        let mut uri = ShardUri::shard(scheme, shard);

        if let Some(height) = segments.next() {
            let height: u64 = height
                .parse()
                .map_err(|_| UriError::InvalidHeight(height.to_string()))?;
            uri = uri.with_height(height);
        }
        if let Some(sig) = segments.next() {
            let signature =
                TxSignature::from_hex(sig).map_err(|_| UriError::InvalidSignature(sig.to_string()))?;
            uri = uri.with_signature(signature);
        }
        if let Some(addr) = segments.next() {
            let address =
                Address::from_hex(addr).map_err(|_| UriError::InvalidAddress(addr.to_string()))?;
            uri = uri.with_address(address);
        }
        if segments.next().is_some() {
            return Err(UriError::TooManySegments(s.to_string()));
        }

        Ok(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "2102514038DA1905561BF9043269B8515C1E7C4E79B011291B4CBED5B18DAECB71E4";

    fn sig() -> TxSignature {
        TxSignature::from_der_bytes(vec![0x30, 0x44, 0x02, 0x20, 0xab])
    }

    #[test]
    fn check_uri_format() {
        let uri = ShardUri::check("tessera", "shard-1", &sig());
        assert_eq!(uri.to_string(), "tessera://shard-1/0/30440220AB");
    }

    #[test]
    fn block_uri_format() {
        assert_eq!(
            ShardUri::block("tessera", "shard-1", 42).to_string(),
            "tessera://shard-1/42"
        );
    }

    #[test]
    fn parse_full_uri() {
        let text = format!("tessera://shard-1/7/30440220ab/{}", ADDR.to_lowercase());
        let uri: ShardUri = text.parse().unwrap();
        assert_eq!(uri.scheme(), "tessera");
        assert_eq!(uri.shard_name(), "shard-1");
        assert_eq!(uri.height(), Some(7));
        assert_eq!(uri.signature(), Some(&sig()));
        assert_eq!(uri.address().unwrap().to_hex(), ADDR);
        assert_eq!(
            uri.to_string(),
            format!("tessera://shard-1/7/30440220AB/{}", ADDR)
        );
    }

    #[test]
    fn parse_bare_shard() {
        let uri: ShardUri = "tessera://shard-2/".parse().unwrap();
        assert_eq!(uri.height(), None);
        assert_eq!(uri.to_string(), "tessera://shard-2");
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            "shard-1/0".parse::<ShardUri>(),
            Err(UriError::MissingScheme(_))
        ));
        assert!(matches!(
            "tessera:///0".parse::<ShardUri>(),
            Err(UriError::EmptySegment(_))
        ));
        assert!(matches!(
            "tessera://s/abc".parse::<ShardUri>(),
            Err(UriError::InvalidHeight(_))
        ));
        assert!(matches!(
            "tessera://s/0/XYZ".parse::<ShardUri>(),
            Err(UriError::InvalidSignature(_))
        ));
        assert!(matches!(
            format!("tessera://s/0/AB/{}/extra", ADDR).parse::<ShardUri>(),
            Err(UriError::TooManySegments(_))
        ));
    }
}
