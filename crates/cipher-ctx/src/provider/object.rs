//! [`ProviderObject`]: owned provider handle released on drop.

use std::{fmt, sync::Arc};

use tracing::trace;

use super::{CryptoProvider, ObjectId};

/// Exclusively owned provider object (slot reference, key, or IV parameter).
///
/// Dropping the guard calls [`CryptoProvider::release`] exactly once, so every
/// early return after acquisition frees the object without explicit cleanup.
pub struct ProviderObject {
    id: ObjectId,
    provider: Arc<dyn CryptoProvider>,
}

impl ProviderObject {
    /// Take ownership of `id`, which must have been issued by `provider`.
    pub fn new(provider: Arc<dyn CryptoProvider>, id: ObjectId) -> Self {
        Self { id, provider }
    }

    /// The wrapped handle.
    pub fn id(&self) -> ObjectId {
        self.id
    }
}

impl Drop for ProviderObject {
    fn drop(&mut self) {
        trace!(object = %self.id, "releasing provider object");
        self.provider.release(self.id);
    }
}

impl fmt::Debug for ProviderObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProviderObject").field(&self.id).finish()
    }
}
