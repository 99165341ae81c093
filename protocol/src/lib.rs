// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Tessera Protocol — Client Library
//!
//! Everything a wallet needs to talk to a Tessera shard without running a
//! node: build a transaction, encode it byte-for-byte the way every other
//! participant does, sign it, hand it to an announcer, and then ask a
//! repeater whether (and where) it was finalized.
//!
//! The library is deliberately small. No consensus, no block production,
//! no peer-to-peer layer. Just the bytes that have to be right.
//!
//! ## Architecture
//!
//! - **transaction** — Transfers, canonical encoding, signing, proposals
//!   and envelopes. Pure, synchronous, deterministic.
//! - **crypto** — secp256k1 keys, DER signatures, hashing, encrypted key
//!   files.
//! - **block** — The finalized block a repeater hands back.
//! - **network** — Announcer and repeater clients over a length-prefixed
//!   request/reply channel, plus the inclusion query state machine.
//! - **config** — Protocol constants and runtime client configuration.
//!
//! ## Ground Rules
//!
//! 1. The canonical encoding is the contract. If two implementations
//!    disagree on one byte, signatures stop verifying.
//! 2. Signed values are never mutated. Signing returns a new transaction.
//! 3. Secret keys never reach a log line.
//! 4. Nothing retries behind your back. Timeouts are reported, not hidden.

pub mod block;
pub mod config;
pub mod crypto;
pub mod network;
pub mod transaction;
