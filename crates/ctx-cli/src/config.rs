//! Configuration loading and validation for the command-line harness.
//!
//! Values come from `CIPHER_CTX_*` environment variables. Key and IV are read
//! separately by [`cipher_ctx::ConfigKeySource`] from the same prefix and, if
//! set, the file named by `CIPHER_CTX_KEY_FILE`.

use anyhow::{Context, Result};
use cipher_ctx::{key::ENV_PREFIX, ConfigKeySource, Mechanism};
use serde::Deserialize;

/// Validated harness configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Cipher mechanism name (e.g. `"des-cbc-pad"`).
    #[serde(default = "default_mechanism")]
    pub mechanism: String,

    /// Optional TOML file holding `key` and `iv`; environment values win.
    #[serde(default)]
    pub key_file: Option<String>,

    /// Tracing log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_mechanism() -> String {
    Mechanism::DES_CBC_PAD.name().into()
}
fn default_log_level() -> String {
    "warn".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("failed to build cipher-ctx configuration")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise cipher-ctx configuration")?;

        c.validate()?;
        Ok(c)
    }

    fn validate(&self) -> Result<()> {
        self.mechanism()?;
        if let Some(path) = &self.key_file {
            if path.trim().is_empty() {
                anyhow::bail!("CIPHER_CTX_KEY_FILE must not be empty when set");
            }
        }
        Ok(())
    }

    /// The parsed mechanism.
    pub fn mechanism(&self) -> Result<Mechanism> {
        self.mechanism
            .parse()
            .with_context(|| format!("CIPHER_CTX_MECHANISM is invalid: {:?}", self.mechanism))
    }

    /// Key source layering the optional key file under the environment.
    pub fn key_source(&self) -> ConfigKeySource {
        let source = ConfigKeySource::new();
        let source = match &self.key_file {
            Some(path) => source.file(path),
            None => source,
        };
        source.env(ENV_PREFIX)
    }
}
