//! Key and IV sources.
//!
//! A [`KeySource`] hands raw key and IV bytes to a cipher context at
//! construction time. Lengths are not checked here; the provider rejects
//! material that does not fit the mechanism.
//!
//! # Security invariants
//!
//! - Key bytes are **never** logged or printed; [`KeyMaterial`]'s `Debug`
//!   output is redacted.
//! - Buffers holding key bytes are zeroized on drop.

pub mod config_source;

pub use config_source::{ConfigKeySource, KeyConfig, ENV_PREFIX};

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Errors produced while obtaining key material.
#[derive(Debug, Error)]
pub enum KeySourceError {
    /// A required value is absent or empty.
    #[error("{0} is required and must not be empty")]
    Missing(&'static str),

    /// A value is not valid base64.
    #[error("{field} is not valid base64: {source}")]
    Decode {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    /// The configuration sources could not be read or deserialised.
    #[error("failed to load key configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Byte buffer zeroized when dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes(Vec<u8>);

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretBytes([REDACTED])")
    }
}

/// Raw key and IV bytes as delivered by a [`KeySource`].
#[derive(Clone, Debug)]
pub struct KeyMaterial {
    key: SecretBytes,
    iv: SecretBytes,
}

impl KeyMaterial {
    pub fn new(key: Vec<u8>, iv: Vec<u8>) -> Self {
        Self {
            key: SecretBytes::new(key),
            iv: SecretBytes::new(iv),
        }
    }

    pub fn key(&self) -> &[u8] {
        self.key.as_slice()
    }

    pub fn iv(&self) -> &[u8] {
        self.iv.as_slice()
    }
}

/// Supplier of raw key and IV bytes.
#[cfg_attr(test, mockall::automock)]
pub trait KeySource {
    /// Fetch the key and IV.
    ///
    /// # Errors
    ///
    /// Returns a [`KeySourceError`] if the material cannot be obtained.
    fn key_and_iv(&self) -> Result<KeyMaterial, KeySourceError>;
}

/// In-memory key source holding fixed material.
#[derive(Clone, Debug)]
pub struct StaticKeySource {
    material: KeyMaterial,
}

impl StaticKeySource {
    pub fn new(key: impl Into<Vec<u8>>, iv: impl Into<Vec<u8>>) -> Self {
        Self {
            material: KeyMaterial::new(key.into(), iv.into()),
        }
    }
}

impl KeySource for StaticKeySource {
    fn key_and_iv(&self) -> Result<KeyMaterial, KeySourceError> {
        Ok(self.material.clone())
    }
}
