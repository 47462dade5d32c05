//! [`SoftProvider`]: in-process provider backed by RustCrypto block ciphers.
//!
//! Objects live in a mutex-guarded table keyed by [`ObjectId`]. Key and IV
//! bytes are zeroized when released, as are the expanded key schedules held
//! by each session, and [`SoftProvider::live_objects`] reports how many
//! handles are still outstanding, which makes leaks observable in tests.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
};

use cbc::cipher::KeyIvInit;
use tracing::{debug, trace};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::session::{BlockEngine, CbcSession};
use super::{
    Algorithm, CipherSession, CryptoProvider, Direction, KeyUsage, Mechanism, ObjectId,
    ProviderError,
};

/// Raw key bytes held by the provider.
#[derive(Zeroize, ZeroizeOnDrop)]
struct KeyBytes(Vec<u8>);

enum Object {
    Slot,
    Key { mechanism: Mechanism, bytes: KeyBytes },
    Param { mechanism: Mechanism, iv: Zeroizing<Vec<u8>> },
}

/// Software cryptographic provider with a single internal slot.
pub struct SoftProvider {
    mechanisms: Vec<Mechanism>,
    initialized: AtomicBool,
    next_id: AtomicU64,
    objects: Mutex<HashMap<ObjectId, Object>>,
}

impl SoftProvider {
    /// Provider whose slot supports every known mechanism.
    pub fn new() -> Self {
        Self::with_mechanisms(&[
            Mechanism::DES_CBC_PAD,
            Mechanism::DES3_CBC_PAD,
            Mechanism::AES128_CBC_PAD,
        ])
    }

    /// Provider whose slot supports only `mechanisms`.
    pub fn with_mechanisms(mechanisms: &[Mechanism]) -> Self {
        Self {
            mechanisms: mechanisms.to_vec(),
            initialized: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
            objects: Mutex::new(HashMap::new()),
        }
    }

    /// Number of slots, keys and IV parameters not yet released.
    pub fn live_objects(&self) -> usize {
        self.table().len()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<ObjectId, Object>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_ready(&self) -> Result<(), ProviderError> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(ProviderError::NotInitialized)
        }
    }

    fn insert(&self, object: Object) -> ObjectId {
        let id = ObjectId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.table().insert(id, object);
        id
    }
}

impl Default for SoftProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SoftProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftProvider")
            .field("mechanisms", &self.mechanisms)
            .field("initialized", &self.initialized.load(Ordering::Relaxed))
            .field("live_objects", &self.live_objects())
            .finish()
    }
}

fn build_engine(
    mechanism: Mechanism,
    direction: Direction,
    key: &[u8],
    iv: &[u8],
) -> Result<Box<dyn BlockEngine>, ProviderError> {
    let bad_key = |_: cbc::cipher::InvalidLength| ProviderError::InvalidKeyLength {
        expected: mechanism.key_len(),
        actual: key.len(),
    };
    let engine: Box<dyn BlockEngine> = match (mechanism.algorithm, direction) {
        (Algorithm::Des, Direction::Encrypt) => {
            Box::new(cbc::Encryptor::<des::Des>::new_from_slices(key, iv).map_err(bad_key)?)
        }
        (Algorithm::Des, Direction::Decrypt) => {
            Box::new(cbc::Decryptor::<des::Des>::new_from_slices(key, iv).map_err(bad_key)?)
        }
        (Algorithm::Des3, Direction::Encrypt) => Box::new(
            cbc::Encryptor::<des::TdesEde3>::new_from_slices(key, iv).map_err(bad_key)?,
        ),
        (Algorithm::Des3, Direction::Decrypt) => Box::new(
            cbc::Decryptor::<des::TdesEde3>::new_from_slices(key, iv).map_err(bad_key)?,
        ),
        (Algorithm::Aes128, Direction::Encrypt) => Box::new(
            cbc::Encryptor::<aes::Aes128>::new_from_slices(key, iv).map_err(bad_key)?,
        ),
        (Algorithm::Aes128, Direction::Decrypt) => Box::new(
            cbc::Decryptor::<aes::Aes128>::new_from_slices(key, iv).map_err(bad_key)?,
        ),
    };
    Ok(engine)
}

impl CryptoProvider for SoftProvider {
    fn initialize(&self) -> Result<(), ProviderError> {
        if !self.initialized.swap(true, Ordering::AcqRel) {
            debug!(mechanisms = self.mechanisms.len(), "software provider initialized");
        }
        Ok(())
    }

    fn best_slot(&self, mechanism: Mechanism) -> Result<ObjectId, ProviderError> {
        self.ensure_ready()?;
        if !self.mechanisms.contains(&mechanism) {
            return Err(ProviderError::NoCapableSlot(mechanism));
        }
        Ok(self.insert(Object::Slot))
    }

    fn import_sym_key(
        &self,
        slot: ObjectId,
        mechanism: Mechanism,
        usage: KeyUsage,
        raw: &[u8],
    ) -> Result<ObjectId, ProviderError> {
        self.ensure_ready()?;
        if !matches!(self.table().get(&slot), Some(Object::Slot)) {
            return Err(ProviderError::InvalidHandle(slot));
        }
        if raw.len() != mechanism.key_len() {
            return Err(ProviderError::InvalidKeyLength {
                expected: mechanism.key_len(),
                actual: raw.len(),
            });
        }
        // Keys marked for encryption drive both directions, as with the
        // CKA_ENCRYPT imports this provider models.
        trace!(?usage, %mechanism, "importing symmetric key");
        Ok(self.insert(Object::Key {
            mechanism,
            bytes: KeyBytes(raw.to_vec()),
        }))
    }

    fn param_from_iv(&self, mechanism: Mechanism, iv: &[u8]) -> Result<ObjectId, ProviderError> {
        self.ensure_ready()?;
        if iv.len() != mechanism.block_size() {
            return Err(ProviderError::InvalidIvLength {
                expected: mechanism.block_size(),
                actual: iv.len(),
            });
        }
        Ok(self.insert(Object::Param {
            mechanism,
            iv: Zeroizing::new(iv.to_vec()),
        }))
    }

    fn block_size(&self, mechanism: Mechanism, _param: ObjectId) -> usize {
        mechanism.block_size()
    }

    fn create_context(
        &self,
        mechanism: Mechanism,
        direction: Direction,
        key: ObjectId,
        param: ObjectId,
    ) -> Result<Box<dyn CipherSession>, ProviderError> {
        self.ensure_ready()?;
        let table = self.table();
        let (key_mechanism, key_bytes) = match table.get(&key) {
            Some(Object::Key { mechanism, bytes }) => (*mechanism, bytes),
            _ => return Err(ProviderError::InvalidHandle(key)),
        };
        let (param_mechanism, iv) = match table.get(&param) {
            Some(Object::Param { mechanism, iv }) => (*mechanism, iv),
            _ => return Err(ProviderError::InvalidHandle(param)),
        };
        for (object, actual) in [(key, key_mechanism), (param, param_mechanism)] {
            if actual != mechanism {
                return Err(ProviderError::MechanismMismatch {
                    object,
                    requested: mechanism,
                    actual,
                });
            }
        }
        let engine = build_engine(mechanism, direction, &key_bytes.0, iv)?;
        Ok(Box::new(CbcSession::new(
            engine,
            direction,
            mechanism.block_size(),
        )))
    }

    fn release(&self, object: ObjectId) {
        if self.table().remove(&object).is_none() {
            trace!(%object, "release of unknown object ignored");
        }
    }
}
