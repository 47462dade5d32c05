//! `cipher-ctx` — reusable symmetric cipher context.
//!
//! A [`CipherContext`] binds raw key and IV bytes from a [`KeySource`] to
//! objects inside a [`CryptoProvider`] and performs one-shot CBC
//! encryption and decryption with automatic padding.
//!
//! ```no_run
//! use cipher_ctx::{CipherContext, StaticKeySource};
//! use common::Buffer;
//!
//! let source = StaticKeySource::new(b"01234567".to_vec(), b"abcdefgh".to_vec());
//! let ctx = CipherContext::new(&source)?;
//! let ct = ctx.encrypt(&Buffer::copy_from_slice(b"hello"))?;
//! assert_eq!(ct.len(), 8);
//! # Ok::<(), common::ErrorKind>(())
//! ```
//!
//! Errors surface as [`common::ErrorKind`]; provider diagnostics go to
//! `tracing` and never into return values.

pub mod bootstrap;
pub mod context;
pub mod key;
pub mod provider;

pub use bootstrap::ProviderState;
pub use context::{CipherContext, ConstructionError, ENCRYPT_OVERHEAD};
pub use key::{ConfigKeySource, KeyMaterial, KeySource, KeySourceError, StaticKeySource};
pub use provider::{CryptoProvider, Direction, Mechanism, SoftProvider};
