//! # Network Module
//!
//! Client side of the two services a Tessera shard exposes:
//!
//! - the **announcer**, which accepts envelopes of signed transactions, and
//! - the **repeater**, which answers read-only queries about finalized
//!   transactions and blocks.
//!
//! ## Architecture
//!
//! ```text
//! transport.rs  — RequestChannel trait, length-prefixed TCP implementation
//! wire.rs       — bincode encoding shared by every message
//! messages.rs   — RepeaterRequest / RepeaterResponse / operation codes
//! uri.rs        — scheme://shard/height/SIG/ADDR resource URIs
//! query.rs      — inclusion query state machine (no I/O)
//! repeater.rs   — async repeater client driving the state machine
//! announcer.rs  — async announcer client
//! ```
//!
//! ## Design Decisions
//!
//! - Strict request/reply. A channel has at most one outstanding request,
//!   enforced by `&mut self` on [`RequestChannel::request`].
//! - No retries anywhere in this module. A timeout poisons the channel and
//!   is reported; whether to reconnect and try again is the caller's call.
//! - The state machine is separate from the client so it can be tested
//!   without sockets and driven by other transports.

pub mod announcer;
pub mod messages;
pub mod query;
pub mod repeater;
pub mod transport;
pub mod uri;
pub mod wire;

pub use announcer::{Acknowledgment, AnnouncerClient, AnnouncerError};
pub use messages::{RepeaterOperation, RepeaterRequest, RepeaterResponse};
pub use query::{InclusionQuery, QueryFailure, QueryState};
pub use repeater::{Inclusion, RepeaterClient, RepeaterError};
pub use transport::{read_frame, write_frame, RequestChannel, TcpChannel, TransportError};
pub use uri::{ShardUri, UriError};
pub use wire::{WireError, WireMessage};
