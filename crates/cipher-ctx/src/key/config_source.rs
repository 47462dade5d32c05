//! Key source backed by the `config` crate.
//!
//! Values are layered in the order they are added: TOML files, inline TOML,
//! then `CIPHER_CTX_*` environment variables. Later layers override earlier
//! ones. Both values are standard base64:
//!
//! ```toml
//! key = "MDEyMzQ1Njc="
//! iv  = "YWJjZGVmZ2g="
//! ```
//!
//! The sources are re-read on every [`KeySource::key_and_iv`] call so a
//! context constructed later sees rotated material.

use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use tracing::debug;

use super::{KeyMaterial, KeySource, KeySourceError};

/// Environment variable prefix, e.g. `CIPHER_CTX_KEY`.
pub const ENV_PREFIX: &str = "CIPHER_CTX";

/// Base64-encoded key material as read from configuration.
#[derive(Clone, Default, Deserialize)]
pub struct KeyConfig {
    /// Raw key, base64. **Required.**
    #[serde(default)]
    pub key: String,

    /// Raw IV, base64. **Required.**
    #[serde(default)]
    pub iv: String,
}

impl std::fmt::Debug for KeyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyConfig")
            .field("key", &"[REDACTED]")
            .field("iv", &self.iv)
            .finish()
    }
}

impl KeyConfig {
    /// Validate presence, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<(), KeySourceError> {
        ensure_non_empty(&self.key, "key")?;
        ensure_non_empty(&self.iv, "iv")?;
        Ok(())
    }

    /// Decode both values into [`KeyMaterial`].
    pub fn decode(&self) -> Result<KeyMaterial, KeySourceError> {
        self.validate()?;
        let key = decode_field(&self.key, "key")?;
        let iv = decode_field(&self.iv, "iv")?;
        Ok(KeyMaterial::new(key, iv))
    }
}

fn ensure_non_empty(value: &str, name: &'static str) -> Result<(), KeySourceError> {
    if value.trim().is_empty() {
        return Err(KeySourceError::Missing(name));
    }
    Ok(())
}

fn decode_field(value: &str, field: &'static str) -> Result<Vec<u8>, KeySourceError> {
    STANDARD
        .decode(value.trim())
        .map_err(|source| KeySourceError::Decode { field, source })
}

#[derive(Debug, Clone)]
enum Layer {
    File(PathBuf),
    Toml(String),
    Env(String),
}

/// [`KeySource`] reading [`KeyConfig`] from files and the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigKeySource {
    layers: Vec<Layer>,
}

impl ConfigKeySource {
    /// A source with no layers. Add some before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required configuration file; the format follows its extension.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.layers.push(Layer::File(path.into()));
        self
    }

    /// Add inline TOML content.
    pub fn toml(mut self, content: impl Into<String>) -> Self {
        self.layers.push(Layer::Toml(content.into()));
        self
    }

    /// Add environment variables starting with `prefix` and `_`.
    pub fn env(mut self, prefix: impl Into<String>) -> Self {
        self.layers.push(Layer::Env(prefix.into()));
        self
    }

    /// Build and deserialise the layered configuration.
    ///
    /// # Errors
    ///
    /// Returns [`KeySourceError::Load`] if a file is missing or malformed.
    pub fn load(&self) -> Result<KeyConfig, KeySourceError> {
        let mut builder = config::Config::builder();
        for layer in &self.layers {
            builder = match layer {
                Layer::File(path) => builder.add_source(config::File::from(path.as_path())),
                Layer::Toml(content) => builder.add_source(config::File::from_str(
                    content,
                    config::FileFormat::Toml,
                )),
                Layer::Env(prefix) => {
                    builder.add_source(config::Environment::with_prefix(prefix))
                }
            };
        }
        let cfg: KeyConfig = builder.build()?.try_deserialize()?;
        debug!(layers = self.layers.len(), "key configuration loaded");
        Ok(cfg)
    }
}

impl KeySource for ConfigKeySource {
    fn key_and_iv(&self) -> Result<KeyMaterial, KeySourceError> {
        self.load()?.decode()
    }
}
