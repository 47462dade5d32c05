//! Response types written by the command-line harness.
//!
//! These types are serialised as a single JSON document on stdout so that
//! scripts can consume results without parsing free-form text.

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

// ---------------------------------------------------------------------------
// Operation result
// ---------------------------------------------------------------------------

/// Direction requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Plaintext in, ciphertext out.
    Encrypt,
    /// Ciphertext in, plaintext out.
    Decrypt,
}

/// Successful response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpResponse {
    /// Which direction was applied.
    pub operation: Operation,
    /// Output bytes, standard base64.
    pub payload: String,
    /// Output length in bytes before encoding.
    pub len: usize,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Error body written instead of [`OpResponse`] on any failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"invalid_argument"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<ErrorKind> for ErrorResponse {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind.code(), kind.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_response_round_trip() {
        let resp = OpResponse {
            operation: Operation::Encrypt,
            payload: "AAECAw==".into(),
            len: 4,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"operation\":\"encrypt\""));
        let decoded: OpResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.operation, Operation::Encrypt);
        assert_eq!(decoded.len, 4);
    }

    #[test]
    fn error_response_new() {
        let e = ErrorResponse::new("configuration", "missing key");
        assert_eq!(e.code, "configuration");
        assert!(e.message.contains("missing key"));
    }

    #[test]
    fn error_response_from_kind() {
        let e = ErrorResponse::from(ErrorKind::InvalidArgument);
        assert_eq!(e.code, "invalid_argument");
        assert_eq!(e.message, "invalid argument");
    }
}
