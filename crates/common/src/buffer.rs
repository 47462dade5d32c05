//! [`Buffer`]: immutable, cheaply cloneable byte view passed into and out of
//! cipher operations.

use bytes::Bytes;

/// Shared-ownership view over raw bytes.
///
/// Cloning a [`Buffer`] bumps a reference count; the bytes are never copied or
/// mutated after construction. An empty buffer stands in for "no data" and is
/// rejected by cipher operations.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Buffer(Bytes);

impl Buffer {
    /// Create an empty buffer without allocating.
    pub const fn empty() -> Self {
        Self(Bytes::new())
    }

    /// Copy `data` into a new buffer.
    pub fn copy_from_slice(data: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(data))
    }

    /// Number of bytes held.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Copy the bytes into an owned vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Self {
        Self(Bytes::from(data))
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::ops::Deref for Buffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Contents may be plaintext; only the length is printed.
        write!(f, "Buffer(len={})", self.0.len())
    }
}
