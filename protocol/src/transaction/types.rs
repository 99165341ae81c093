//! Core type definitions for Tessera transactions.
//!
//! These types form the vocabulary of every transaction: who ([`Address`]),
//! what ([`Transfer`]), and which kind of state change ([`Operation`]).
//! They are small, immutable once built, and hash/order cleanly so they can
//! key maps during validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{NODE_ADDR_SIZE, WALLET_ADDR_SIZE};

/// Errors raised while parsing addresses, operations or transfers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid address length {0}: expected 33/49 raw bytes or 34/50 prefixed")]
    InvalidAddressLength(usize),

    #[error("address prefix {prefix:#04x} does not match key length {len}")]
    PrefixMismatch { prefix: u8, len: usize },

    #[error("unknown operation code {0}")]
    UnknownOperation(u8),

    #[error("malformed transfer {input:?}: {reason}")]
    MalformedTransfer { input: String, reason: String },
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// Which curve an address belongs to, read off its length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressKind {
    /// Compressed secp256k1 point, 33 bytes. Wallets sign with these.
    Wallet,
    /// Compressed secp384r1 point, 49 bytes. Validator nodes.
    Node,
}

impl AddressKind {
    /// Raw key length, which is also the type prefix byte.
    pub fn raw_len(self) -> usize {
        match self {
            Self::Wallet => WALLET_ADDR_SIZE,
            Self::Node => NODE_ADDR_SIZE,
        }
    }

    fn from_raw_len(len: usize) -> Option<Self> {
        match len {
            WALLET_ADDR_SIZE => Some(Self::Wallet),
            NODE_ADDR_SIZE => Some(Self::Node),
            _ => None,
        }
    }
}

/// A public key with a one-byte type prefix equal to its length.
///
/// The canonical form is `prefix || raw key`: 34 bytes for a wallet,
/// 50 for a node. That is what gets encoded, signed, hashed and displayed.
///
/// # Examples
///
/// ```
/// use tessera_protocol::transaction::{Address, AddressKind};
///
/// let addr: Address = "2102514038DA1905561BF9043269B8515C1E7C4E79B011291B4CBED5B18DAECB71E4"
///     .parse()
///     .unwrap();
/// assert_eq!(addr.kind(), AddressKind::Wallet);
/// assert_eq!(addr.canonical().len(), 34);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Address {
    canonical: Vec<u8>,
}

impl Address {
    /// Build from raw (33/49) or prefixed (34/50) bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        if let Some(kind) = AddressKind::from_raw_len(bytes.len()) {
            let mut canonical = Vec::with_capacity(bytes.len() + 1);
            canonical.push(kind.raw_len() as u8);
            canonical.extend_from_slice(bytes);
            return Ok(Self { canonical });
        }

        let Some((&prefix, raw)) = bytes.split_first() else {
            return Err(TypeError::InvalidAddressLength(0));
        };
        match AddressKind::from_raw_len(raw.len()) {
            Some(_) if prefix as usize == raw.len() => Ok(Self {
                canonical: bytes.to_vec(),
            }),
            Some(_) => Err(TypeError::PrefixMismatch {
                prefix,
                len: raw.len(),
            }),
            None => Err(TypeError::InvalidAddressLength(bytes.len())),
        }
    }

    /// Parse hex, either case, optional `0x`.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(trimmed).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Wallet address from a compressed secp256k1 point produced by `k256`.
    pub(crate) fn wallet_from_point(point: &[u8]) -> Self {
        debug_assert_eq!(point.len(), WALLET_ADDR_SIZE);
        let mut canonical = Vec::with_capacity(WALLET_ADDR_SIZE + 1);
        canonical.push(WALLET_ADDR_SIZE as u8);
        canonical.extend_from_slice(point);
        Self { canonical }
    }

    pub fn kind(&self) -> AddressKind {
        if self.canonical.len() == NODE_ADDR_SIZE + 1 {
            AddressKind::Node
        } else {
            AddressKind::Wallet
        }
    }

    /// Prefix plus raw key.
    pub fn canonical(&self) -> &[u8] {
        &self.canonical
    }

    /// The raw key without its prefix.
    pub fn raw(&self) -> &[u8] {
        &self.canonical[1..]
    }

    /// Upper-case hex of the canonical form.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(&self.canonical)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<Vec<u8>> for Address {
    type Error = TypeError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_bytes(&bytes)
    }
}

impl From<Address> for Vec<u8> {
    fn from(address: Address) -> Self {
        address.canonical
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// What a transaction does to ledger state.
///
/// The numeric codes are part of the signed message. Do not renumber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Operation {
    Create = 0,
    Modify = 1,
    Exchange = 2,
    Delete = 3,
}

impl Operation {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Operation {
    type Error = TypeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Create),
            1 => Ok(Self::Modify),
            2 => Ok(Self::Exchange),
            3 => Ok(Self::Delete),
            other => Err(TypeError::UnknownOperation(other)),
        }
    }
}

impl From<Operation> for u8 {
    fn from(op: Operation) -> Self {
        op.code()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Modify => write!(f, "modify"),
            Self::Exchange => write!(f, "exchange"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

impl FromStr for Operation {
    type Err = TypeError;

    /// Accepts the lower-case name or the numeric code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "modify" => Ok(Self::Modify),
            "exchange" => Ok(Self::Exchange),
            "delete" => Ok(Self::Delete),
            other => {
                let code: u8 = other
                    .parse()
                    .map_err(|_| TypeError::UnknownOperation(u8::MAX))?;
                Self::try_from(code)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Transfer
// ---------------------------------------------------------------------------

/// One leg of a transaction: `amount` of `coin` moved to (positive) or
/// from (negative) `address`.
///
/// `delay` is a settlement delay in seconds. The signer does not interpret
/// it; it is carried and signed verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transfer {
    pub address: Address,
    pub coin: u64,
    pub amount: i64,
    pub delay: u64,
}

impl Transfer {
    pub fn new(address: Address, coin: u64, amount: i64, delay: u64) -> Self {
        Self {
            address,
            coin,
            amount,
            delay,
        }
    }

    /// `true` if value leaves `address`.
    pub fn is_debit(&self) -> bool {
        self.amount < 0
    }
}

impl FromStr for Transfer {
    type Err = TypeError;

    /// Parses `address:coin:amount[:delay]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| TypeError::MalformedTransfer {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 3 && parts.len() != 4 {
            return Err(malformed("expected address:coin:amount[:delay]"));
        }

        let address = Address::from_hex(parts[0])?;
        let coin = parts[1]
            .parse::<u64>()
            .map_err(|_| malformed("coin is not an unsigned integer"))?;
        let amount = parts[2]
            .parse::<i64>()
            .map_err(|_| malformed("amount is not an integer"))?;
        let delay = match parts.get(3) {
            Some(d) => d
                .parse::<u64>()
                .map_err(|_| malformed("delay is not an unsigned integer"))?,
            None => 0,
        };

        Ok(Self::new(address, coin, amount, delay))
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.address, self.coin, self.amount, self.delay
        )
    }
}
