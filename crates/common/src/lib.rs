//! Common types, protocol definitions, and errors shared across `cipher-ctx` crates.

pub mod buffer;
pub mod error;
pub mod protocol;

pub use buffer::Buffer;
pub use error::ErrorKind;
