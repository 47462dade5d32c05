//! Common error kinds shared across crates.

use thiserror::Error;

/// Structured failure category returned by every cipher-context operation.
///
/// Callers branch on the kind; provider-level diagnostic text never travels
/// in-band and is emitted through `tracing` at the failure site instead.
/// Stable codes for logs and the CLI protocol:
/// - [`ErrorKind::System`] → `"system"`
/// - [`ErrorKind::Configuration`] → `"configuration"`
/// - [`ErrorKind::NotInitialized`] → `"not_initialized"`
/// - [`ErrorKind::InvalidArgument`] → `"invalid_argument"`
/// - [`ErrorKind::OutOfMemory`] → `"out_of_memory"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    /// An underlying cryptographic provider call failed.
    #[error("cryptographic provider failure")]
    System,

    /// Key or IV material could not be obtained.
    #[error("key material unavailable")]
    Configuration,

    /// The context never reached its ready state.
    #[error("cipher context not initialized")]
    NotInitialized,

    /// The input buffer was null or empty.
    #[error("invalid argument")]
    InvalidArgument,

    /// A scratch buffer could not be allocated.
    #[error("out of memory")]
    OutOfMemory,
}

impl ErrorKind {
    /// Returns the stable machine-readable code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::System => "system",
            ErrorKind::Configuration => "configuration",
            ErrorKind::NotInitialized => "not_initialized",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::OutOfMemory => "out_of_memory",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorKind::System.code(), "system");
        assert_eq!(ErrorKind::Configuration.code(), "configuration");
        assert_eq!(ErrorKind::NotInitialized.code(), "not_initialized");
        assert_eq!(ErrorKind::InvalidArgument.code(), "invalid_argument");
        assert_eq!(ErrorKind::OutOfMemory.code(), "out_of_memory");
    }

    #[test]
    fn display_is_human_readable() {
        assert!(ErrorKind::NotInitialized.to_string().contains("not initialized"));
        assert_eq!(ErrorKind::OutOfMemory.to_string(), "out of memory");
    }
}
