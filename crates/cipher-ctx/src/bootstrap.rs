//! Provider bootstrap: one-time initialization of a cryptographic provider
//! and the cipher mechanism every context built on it uses.
//!
//! # Lifecycle
//!
//! 1. A [`ProviderState`] pairs a provider with a fixed [`Mechanism`].
//! 2. The first [`ProviderState::ensure_initialized`] call runs the provider's
//!    no-database initialization; later calls return immediately.
//! 3. If initialization fails the state stays uninitialized, so the next
//!    context construction tries again. Nothing retries internally.
//!
//! [`ProviderState::global`] is the process-wide instance (software provider,
//! DES-CBC with padding). It is created lazily and never torn down.

use std::{fmt, sync::Arc};

use common::ErrorKind;
use once_cell::sync::{Lazy, OnceCell};
use tracing::{debug, error};

use crate::provider::{CryptoProvider, Mechanism, SoftProvider};

static GLOBAL: Lazy<ProviderState> =
    Lazy::new(|| ProviderState::new(Arc::new(SoftProvider::new()), Mechanism::DES_CBC_PAD));

/// A provider plus its one-time initialization flag and fixed mechanism.
pub struct ProviderState {
    provider: Arc<dyn CryptoProvider>,
    mechanism: Mechanism,
    initialized: OnceCell<()>,
}

impl ProviderState {
    /// Pair `provider` with `mechanism`. The provider is not touched until
    /// [`ensure_initialized`](Self::ensure_initialized).
    pub fn new(provider: Arc<dyn CryptoProvider>, mechanism: Mechanism) -> Self {
        Self {
            provider,
            mechanism,
            initialized: OnceCell::new(),
        }
    }

    /// The process-wide state used by [`CipherContext::new`](crate::CipherContext::new).
    pub fn global() -> &'static ProviderState {
        &GLOBAL
    }

    /// Initialize the provider if that has not happened yet and return the
    /// fixed mechanism.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::System`] if the provider fails to initialize.
    /// The state remains uninitialized in that case.
    pub fn ensure_initialized(&self) -> Result<Mechanism, ErrorKind> {
        self.initialized.get_or_try_init(|| {
            self.provider.initialize().map_err(|e| {
                error!(error = %e, mechanism = %self.mechanism, "provider initialization failed");
                ErrorKind::System
            })?;
            debug!(mechanism = %self.mechanism, "provider initialized");
            Ok::<(), ErrorKind>(())
        })?;
        Ok(self.mechanism)
    }

    /// Returns `true` once initialization has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.initialized.get().is_some()
    }

    /// The mechanism fixed for this provider.
    pub fn mechanism(&self) -> Mechanism {
        self.mechanism
    }

    /// The provider this state bootstraps.
    pub fn provider(&self) -> &Arc<dyn CryptoProvider> {
        &self.provider
    }
}

impl fmt::Debug for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderState")
            .field("mechanism", &self.mechanism)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}
