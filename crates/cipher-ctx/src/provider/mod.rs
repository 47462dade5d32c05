//! Cryptographic provider abstraction.
//!
//! A provider hands out opaque [`ObjectId`]s for slots, imported keys and IV
//! parameters, and creates transient [`CipherSession`]s that run one
//! update + finalize sequence. Every object it issues must eventually be
//! passed back to [`CryptoProvider::release`]; [`ProviderObject`] makes that
//! automatic.
//!
//! [`SoftProvider`] is the in-process implementation backed by RustCrypto
//! block ciphers.

pub mod mechanism;
pub mod object;
pub mod session;
pub mod soft;

pub use mechanism::{Algorithm, Mechanism, Mode, Padding, UnknownMechanism};
pub use object::ProviderObject;
pub use soft::SoftProvider;

use std::fmt;

use thiserror::Error;

/// Opaque handle to an object living inside a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Wrap a provider-assigned identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier.
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Direction of a single cipher session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Encrypt => "encrypt",
            Direction::Decrypt => "decrypt",
        })
    }
}

/// Capability an imported key is marked with. Keys marked for encryption
/// also drive decryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyUsage {
    Encrypt,
}

/// Errors reported by a provider. The text is diagnostic only; callers of
/// the cipher context see an [`common::ErrorKind`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider could not be brought up.
    #[error("provider initialization failed: {0}")]
    InitFailed(String),

    /// An object was requested before [`CryptoProvider::initialize`] succeeded.
    #[error("provider not initialized")]
    NotInitialized,

    /// No slot can perform the requested mechanism.
    #[error("no slot supports {0}")]
    NoCapableSlot(Mechanism),

    /// The raw key has the wrong length for the mechanism.
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// The raw IV has the wrong length for the mechanism.
    #[error("invalid IV length: expected {expected} bytes, got {actual}")]
    InvalidIvLength { expected: usize, actual: usize },

    /// The handle does not name a live object of the expected kind.
    #[error("invalid object handle {0}")]
    InvalidHandle(ObjectId),

    /// The object was created for a different mechanism.
    #[error("object {object} belongs to {actual}, not {requested}")]
    MechanismMismatch {
        object: ObjectId,
        requested: Mechanism,
        actual: Mechanism,
    },

    /// The caller's output buffer cannot hold the produced bytes.
    #[error("output buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// Ciphertext length is not a whole number of blocks.
    #[error("data length {0} is not a multiple of the block size")]
    DataLength(usize),

    /// Padding bytes did not validate after decryption.
    #[error("bad padding")]
    BadPadding,

    /// The session was already finalized.
    #[error("cipher session already finalized")]
    SessionFinished,
}

/// A transient, single-use cipher execution: one or more `update` calls
/// followed by exactly one `finalize`. Dropping the session destroys it.
pub trait CipherSession {
    /// Process `input`, writing whole output blocks into `out`. Returns the
    /// number of bytes written.
    fn update(&mut self, input: &[u8], out: &mut [u8]) -> Result<usize, ProviderError>;

    /// Flush buffered data (adding or removing padding) into `out`. Returns
    /// the number of bytes written.
    fn finalize(&mut self, out: &mut [u8]) -> Result<usize, ProviderError>;
}

/// PKCS#11-style cryptographic service.
///
/// Implementations must be safe to share between threads; per-call state
/// lives in the returned [`CipherSession`].
#[cfg_attr(test, mockall::automock)]
pub trait CryptoProvider: Send + Sync {
    /// No-database initialization. Must be called before any other method.
    fn initialize(&self) -> Result<(), ProviderError>;

    /// Acquire a reference to the best slot capable of `mechanism`.
    fn best_slot(&self, mechanism: Mechanism) -> Result<ObjectId, ProviderError>;

    /// Import raw key bytes into `slot` as a symmetric key object.
    fn import_sym_key(
        &self,
        slot: ObjectId,
        mechanism: Mechanism,
        usage: KeyUsage,
        raw: &[u8],
    ) -> Result<ObjectId, ProviderError>;

    /// Derive the IV parameter object for `mechanism`.
    fn param_from_iv(&self, mechanism: Mechanism, iv: &[u8]) -> Result<ObjectId, ProviderError>;

    /// Block size of `mechanism` under `param`.
    fn block_size(&self, mechanism: Mechanism, param: ObjectId) -> usize;

    /// Open a cipher session bound to `key` and `param`.
    fn create_context(
        &self,
        mechanism: Mechanism,
        direction: Direction,
        key: ObjectId,
        param: ObjectId,
    ) -> Result<Box<dyn CipherSession>, ProviderError>;

    /// Destroy an object previously returned by this provider. Unknown
    /// handles are ignored.
    fn release(&self, object: ObjectId);
}
