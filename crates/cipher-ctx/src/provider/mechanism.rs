//! Cipher mechanism descriptors: algorithm + mode + padding policy.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// Block cipher primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Single DES, 64-bit block, 8-byte key (parity bits ignored).
    Des,
    /// Triple DES in EDE mode with three independent keys (24 bytes).
    Des3,
    /// AES with a 128-bit key.
    Aes128,
}

/// Chaining mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Cipher block chaining.
    Cbc,
}

/// Padding policy applied by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Padding {
    /// PKCS#7 padding added on encrypt and stripped on decrypt, so callers
    /// never pad manually.
    Pkcs7,
}

/// The algorithm + mode + padding triple every context operates under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mechanism {
    pub algorithm: Algorithm,
    pub mode: Mode,
    pub padding: Padding,
}

impl Mechanism {
    /// DES-CBC with automatic padding. Process-wide default.
    pub const DES_CBC_PAD: Self = Self::cbc_pad(Algorithm::Des);

    /// Triple-DES-CBC with automatic padding.
    pub const DES3_CBC_PAD: Self = Self::cbc_pad(Algorithm::Des3);

    /// AES-128-CBC with automatic padding.
    pub const AES128_CBC_PAD: Self = Self::cbc_pad(Algorithm::Aes128);

    const fn cbc_pad(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            mode: Mode::Cbc,
            padding: Padding::Pkcs7,
        }
    }

    /// Cipher block size in bytes; also the required IV length.
    pub const fn block_size(&self) -> usize {
        match self.algorithm {
            Algorithm::Des | Algorithm::Des3 => 8,
            Algorithm::Aes128 => 16,
        }
    }

    /// Raw key length in bytes accepted on import.
    pub const fn key_len(&self) -> usize {
        match self.algorithm {
            Algorithm::Des => 8,
            Algorithm::Des3 => 24,
            Algorithm::Aes128 => 16,
        }
    }

    /// Canonical configuration name, e.g. `"des-cbc-pad"`.
    pub const fn name(&self) -> &'static str {
        match self.algorithm {
            Algorithm::Des => "des-cbc-pad",
            Algorithm::Des3 => "des3-cbc-pad",
            Algorithm::Aes128 => "aes128-cbc-pad",
        }
    }
}

impl Default for Mechanism {
    fn default() -> Self {
        Self::DES_CBC_PAD
    }
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The configured mechanism name is not one of the supported triples.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown cipher mechanism: {0}")]
pub struct UnknownMechanism(pub String);

impl FromStr for Mechanism {
    type Err = UnknownMechanism;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "des-cbc-pad" => Ok(Self::DES_CBC_PAD),
            "des3-cbc-pad" => Ok(Self::DES3_CBC_PAD),
            "aes128-cbc-pad" => Ok(Self::AES128_CBC_PAD),
            _ => Err(UnknownMechanism(s.to_owned())),
        }
    }
}
