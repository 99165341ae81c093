//! Repeater request and response messages.
//!
//! The repeater is a read-only query service in front of a shard. A
//! request names an operation and a resource URI; the response carries a
//! return code, a human-readable message, and an opaque payload whose
//! meaning depends on the operation.
//!
//! | Operation         | Code | `raw_response` on success           |
//! |-------------------|------|-------------------------------------|
//! | `GetBlockAsBytes` | 5    | wire-encoded [`FinalBlock`]         |
//! | `CheckTransaction`| 9    | block height as ASCII decimal       |
//!
//! [`FinalBlock`]: crate::block::FinalBlock

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::{OP_CHECK_TRANSACTION, OP_GET_BLOCK_AS_BYTES, REPEATER_OK};

/// Repeater operation codes. Shared with the network; do not renumber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum RepeaterOperation {
    GetBlockAsBytes,
    CheckTransaction,
}

impl RepeaterOperation {
    pub fn code(self) -> i32 {
        match self {
            Self::GetBlockAsBytes => OP_GET_BLOCK_AS_BYTES,
            Self::CheckTransaction => OP_CHECK_TRANSACTION,
        }
    }
}

impl TryFrom<i32> for RepeaterOperation {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            OP_GET_BLOCK_AS_BYTES => Ok(Self::GetBlockAsBytes),
            OP_CHECK_TRANSACTION => Ok(Self::CheckTransaction),
            other => Err(format!("unknown repeater operation code {}", other)),
        }
    }
}

impl From<RepeaterOperation> for i32 {
    fn from(op: RepeaterOperation) -> Self {
        op.code()
    }
}

impl fmt::Display for RepeaterOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetBlockAsBytes => write!(f, "GetBlockAsBytes"),
            Self::CheckTransaction => write!(f, "CheckTransaction"),
        }
    }
}

/// A query sent to the repeater.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeaterRequest {
    /// Milliseconds since the Unix epoch at send time.
    pub timestamp: i64,
    pub operation: RepeaterOperation,
    pub uri: String,
}

impl RepeaterRequest {
    /// A request stamped with the current time.
    pub fn new(operation: RepeaterOperation, uri: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().timestamp_millis(),
            operation,
            uri: uri.into(),
        }
    }
}

/// The repeater's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeaterResponse {
    /// `0` on success.
    pub return_code: i32,
    pub message: String,
    pub raw_response: Vec<u8>,
}

impl RepeaterResponse {
    pub fn ok(raw_response: Vec<u8>) -> Self {
        Self {
            return_code: REPEATER_OK,
            message: String::new(),
            raw_response,
        }
    }

    pub fn error(return_code: i32, message: impl Into<String>) -> Self {
        Self {
            return_code,
            message: message.into(),
            raw_response: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.return_code == REPEATER_OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_codes() {
        assert_eq!(RepeaterOperation::GetBlockAsBytes.code(), 5);
        assert_eq!(RepeaterOperation::CheckTransaction.code(), 9);
        assert_eq!(
            RepeaterOperation::try_from(9),
            Ok(RepeaterOperation::CheckTransaction)
        );
        assert!(RepeaterOperation::try_from(1).is_err());
    }

    #[test]
    fn new_request_is_timestamped_now() {
        let before = Utc::now().timestamp_millis();
        let req = RepeaterRequest::new(RepeaterOperation::CheckTransaction, "tessera://s/0/AB");
        let after = Utc::now().timestamp_millis();
        assert!(req.timestamp >= before && req.timestamp <= after);
    }

    #[test]
    fn response_constructors() {
        assert!(RepeaterResponse::ok(vec![]).is_ok());
        let err = RepeaterResponse::error(3, "not finalized");
        assert!(!err.is_ok());
        assert_eq!(err.message, "not finalized");
    }
}
