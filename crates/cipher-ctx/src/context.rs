//! [`CipherContext`]: key + IV bound to a provider, driving one-shot
//! encrypt/decrypt operations.
//!
//! # Construction
//!
//! 1. Bootstrap the provider ([`ProviderState::ensure_initialized`]).
//! 2. Fetch key and IV from the [`KeySource`] before touching the provider.
//! 3. Acquire the best slot for the mechanism.
//! 4. Import the key with encrypt usage; the same key serves both directions.
//! 5. Derive the IV parameter.
//!
//! Any failure yields a [`ConstructionError`] carrying the [`ErrorKind`] and
//! the unusable context. Objects acquired by a failing step 3 or 4 are
//! released before returning. A step-5 failure leaves the slot and key owned
//! by that context, which stays destructible but never becomes ready.
//!
//! # Operation
//!
//! Each [`CipherContext::op`] opens a transient session, runs one update and
//! one finalize into a scratch buffer sized for the worst case, and returns
//! exactly the bytes produced. The session is dropped on every path; the
//! context's key and IV parameter are never modified.

use std::{fmt, sync::Arc};

use common::{Buffer, ErrorKind};
use thiserror::Error;
use tracing::{debug, error};
use zeroize::Zeroizing;

use crate::bootstrap::ProviderState;
use crate::key::KeySource;
use crate::provider::{
    CryptoProvider, Direction, KeyUsage, Mechanism, ProviderError, ProviderObject,
};

/// Extra encrypt capacity beyond one padding block.
pub const ENCRYPT_OVERHEAD: usize = 8;

/// Reusable encryption context bound to one key and IV.
///
/// Not internally synchronized beyond what the provider guarantees; share a
/// context across threads only when the provider is thread-safe.
pub struct CipherContext {
    // Field order is drop order: IV parameter, key, then slot.
    iv_param: Option<ProviderObject>,
    key: Option<ProviderObject>,
    slot: Option<ProviderObject>,
    provider: Arc<dyn CryptoProvider>,
    mechanism: Mechanism,
}

/// Construction failed; the context it carries is permanently unusable.
#[derive(Debug, Error)]
#[error("cipher context construction failed: {kind}")]
pub struct ConstructionError {
    kind: ErrorKind,
    context: CipherContext,
}

impl ConstructionError {
    /// Why construction failed.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Take the unusable context. Every operation on it returns
    /// [`ErrorKind::NotInitialized`].
    pub fn into_context(self) -> CipherContext {
        self.context
    }
}

impl From<ConstructionError> for ErrorKind {
    fn from(e: ConstructionError) -> Self {
        e.kind
    }
}

fn system(action: &'static str, mechanism: Mechanism) -> impl FnOnce(ProviderError) -> ErrorKind {
    move |e| {
        error!(error = %e, %mechanism, "{} failed", action);
        ErrorKind::System
    }
}

impl CipherContext {
    /// Build a context on the process-wide provider using material from
    /// `source`.
    ///
    /// # Errors
    ///
    /// See [`CipherContext::with_state`].
    pub fn new<S: KeySource + ?Sized>(source: &S) -> Result<Self, ConstructionError> {
        Self::with_state(ProviderState::global(), source)
    }

    /// Build a context on `state`'s provider using material from `source`.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::System`] if bootstrap, slot acquisition, key import or
    ///   IV parameter derivation fails.
    /// - [`ErrorKind::Configuration`] if `source` cannot supply key and IV.
    pub fn with_state<S: KeySource + ?Sized>(
        state: &ProviderState,
        source: &S,
    ) -> Result<Self, ConstructionError> {
        let mut context = Self {
            iv_param: None,
            key: None,
            slot: None,
            provider: Arc::clone(state.provider()),
            mechanism: state.mechanism(),
        };
        match context.acquire(state, source) {
            Ok(()) => Ok(context),
            Err(kind) => Err(ConstructionError { kind, context }),
        }
    }

    fn acquire<S: KeySource + ?Sized>(
        &mut self,
        state: &ProviderState,
        source: &S,
    ) -> Result<(), ErrorKind> {
        let mechanism = state.ensure_initialized()?;
        let provider = Arc::clone(&self.provider);

        let material = source.key_and_iv().map_err(|e| {
            error!(error = %e, "failed to obtain key and IV");
            ErrorKind::Configuration
        })?;

        let slot = provider
            .best_slot(mechanism)
            .map_err(system("security device lookup", mechanism))?;
        let slot = ProviderObject::new(Arc::clone(&provider), slot);

        let key = provider
            .import_sym_key(slot.id(), mechanism, KeyUsage::Encrypt, material.key())
            .map_err(system("key import", mechanism))?;
        self.key = Some(ProviderObject::new(Arc::clone(&provider), key));
        self.slot = Some(slot);

        let param = provider
            .param_from_iv(mechanism, material.iv())
            .map_err(system("IV parameter setup", mechanism))?;
        self.iv_param = Some(ProviderObject::new(provider, param));

        debug!(%mechanism, "cipher context ready");
        Ok(())
    }

    /// Returns `true` when the key and IV parameter are both present.
    pub fn is_ready(&self) -> bool {
        self.key.is_some() && self.iv_param.is_some()
    }

    /// Mechanism every operation on this context uses.
    pub fn mechanism(&self) -> Mechanism {
        self.mechanism
    }

    /// Encrypt `input`. Equivalent to `op(Some(input), Direction::Encrypt)`.
    pub fn encrypt(&self, input: &Buffer) -> Result<Buffer, ErrorKind> {
        self.op(Some(input), Direction::Encrypt)
    }

    /// Decrypt `input`. Equivalent to `op(Some(input), Direction::Decrypt)`.
    pub fn decrypt(&self, input: &Buffer) -> Result<Buffer, ErrorKind> {
        self.op(Some(input), Direction::Decrypt)
    }

    /// Run one complete cipher operation over `input`.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::NotInitialized`] if the context is not ready.
    /// - [`ErrorKind::InvalidArgument`] if `input` is `None` or empty.
    /// - [`ErrorKind::OutOfMemory`] if the scratch buffer cannot be allocated.
    /// - [`ErrorKind::System`] if the provider fails, including bad padding
    ///   on decrypt.
    pub fn op(&self, input: Option<&Buffer>, direction: Direction) -> Result<Buffer, ErrorKind> {
        let (Some(key), Some(param)) = (&self.key, &self.iv_param) else {
            error!(%direction, "cipher context not initialized");
            return Err(ErrorKind::NotInitialized);
        };
        let input = match input {
            Some(buf) if !buf.is_empty() => buf,
            _ => {
                error!(%direction, "invalid input buffer");
                return Err(ErrorKind::InvalidArgument);
            }
        };
        let mechanism = self.mechanism;

        let mut session = self
            .provider
            .create_context(mechanism, direction, key.id(), param.id())
            .map_err(system("cipher session creation", mechanism))?;

        let capacity = match direction {
            Direction::Decrypt => input.len(),
            Direction::Encrypt => {
                input.len() + self.provider.block_size(mechanism, param.id()) + ENCRYPT_OVERHEAD
            }
        };
        // Wiped on every early return; only the final output escapes.
        let mut scratch = Zeroizing::new(Vec::<u8>::new());
        scratch.try_reserve_exact(capacity).map_err(|_| {
            error!(capacity, "failed to allocate scratch buffer");
            ErrorKind::OutOfMemory
        })?;
        scratch.resize(capacity, 0);

        let n1 = session
            .update(input.as_slice(), scratch.as_mut_slice())
            .map_err(system("cipher update", mechanism))?;
        let tail = scratch.get_mut(n1..).ok_or_else(|| {
            error!(n1, capacity, "cipher update overran scratch buffer");
            ErrorKind::System
        })?;
        let n2 = session
            .finalize(tail)
            .map_err(system("cipher finalize", mechanism))?;
        drop(session);

        let total = n1 + n2;
        if total > capacity {
            error!(total, capacity, "cipher finalize overran scratch buffer");
            return Err(ErrorKind::System);
        }
        scratch.truncate(total);
        Ok(Buffer::from(std::mem::take(&mut *scratch)))
    }
}

impl fmt::Debug for CipherContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherContext")
            .field("mechanism", &self.mechanism)
            .field("ready", &self.is_ready())
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use mockall::{predicate::eq, Sequence};

    use super::*;
    use crate::key::{KeySourceError, MockKeySource, StaticKeySource};
    use crate::provider::{
        CipherSession, MockCryptoProvider, ObjectId, ProviderError, SoftProvider,
    };

    const KEY: &[u8] = b"01234567";
    const IV: &[u8] = b"abcdefgh";

    const SLOT: ObjectId = ObjectId::new(1);
    const SYM_KEY: ObjectId = ObjectId::new(2);
    const PARAM: ObjectId = ObjectId::new(3);

    fn soft_state() -> (Arc<SoftProvider>, ProviderState) {
        let soft = Arc::new(SoftProvider::new());
        let state = ProviderState::new(soft.clone(), Mechanism::DES_CBC_PAD);
        (soft, state)
    }

    fn soft_context() -> CipherContext {
        let (_, state) = soft_state();
        CipherContext::with_state(&state, &StaticKeySource::new(KEY, IV)).unwrap()
    }

    /// Mock provider that constructs successfully; `release` is unconstrained.
    fn ready_mock() -> MockCryptoProvider {
        let mut mock = MockCryptoProvider::new();
        mock.expect_initialize().returning(|| Ok(()));
        mock.expect_best_slot().returning(|_| Ok(SLOT));
        mock.expect_import_sym_key().returning(|_, _, _, _| Ok(SYM_KEY));
        mock.expect_param_from_iv().returning(|_, _| Ok(PARAM));
        mock.expect_block_size().return_const(8usize);
        mock.expect_release().return_const(());
        mock
    }

    fn mock_state(mock: MockCryptoProvider) -> ProviderState {
        ProviderState::new(Arc::new(mock), Mechanism::DES_CBC_PAD)
    }

    /// Session whose update fails; records that it was dropped.
    struct FailingSession(Arc<AtomicBool>);

    impl CipherSession for FailingSession {
        fn update(&mut self, _: &[u8], _: &mut [u8]) -> Result<usize, ProviderError> {
            Err(ProviderError::BufferTooSmall {
                needed: 1,
                available: 0,
            })
        }
        fn finalize(&mut self, _: &mut [u8]) -> Result<usize, ProviderError> {
            Ok(0)
        }
    }

    impl Drop for FailingSession {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    // --- Round trip and sizing -------------------------------------------

    #[test]
    fn encrypt_decrypt_round_trip() {
        let ctx = soft_context();
        for len in [1usize, 5, 7, 8, 9, 16, 100, 4096] {
            let msg: Vec<u8> = (0..len).map(|i| (i * 31 % 251) as u8).collect();
            let ct = ctx.encrypt(&Buffer::from(msg.clone())).unwrap();
            assert_ne!(ct.as_slice(), msg.as_slice());
            let pt = ctx.decrypt(&ct).unwrap();
            assert_eq!(pt.as_slice(), msg.as_slice(), "len {len}");
        }
    }

    #[test]
    fn encryption_is_deterministic() {
        let ctx = soft_context();
        let msg = Buffer::copy_from_slice(b"same input, same output");
        let a = ctx.encrypt(&msg).unwrap();
        let b = ctx.encrypt(&msg).unwrap();
        assert_eq!(a, b);
        assert_eq!(ctx.decrypt(&a).unwrap(), ctx.decrypt(&b).unwrap());
    }

    #[test]
    fn two_contexts_with_same_material_agree() {
        let a = soft_context();
        let b = soft_context();
        let msg = Buffer::copy_from_slice(b"interoperable");
        let ct = a.encrypt(&msg).unwrap();
        assert_eq!(b.decrypt(&ct).unwrap(), msg);
    }

    #[test]
    fn output_rounds_up_to_block_boundary() {
        let ctx = soft_context();
        for (len, expected) in [(5usize, 8usize), (8, 16), (16, 24)] {
            let ct = ctx.encrypt(&Buffer::from(vec![0x5A; len])).unwrap();
            assert_eq!(ct.len(), expected, "plaintext of {len} bytes");
            assert!(ct.len() >= len);
            assert!(ct.len() <= len + 8 + ENCRYPT_OVERHEAD);
        }
    }

    #[test]
    fn aes_context_uses_sixteen_byte_blocks() {
        let soft = Arc::new(SoftProvider::new());
        let state = ProviderState::new(soft, Mechanism::AES128_CBC_PAD);
        let source = StaticKeySource::new(b"0123456789abcdef".to_vec(), vec![7u8; 16]);
        let ctx = CipherContext::with_state(&state, &source).unwrap();
        assert_eq!(ctx.mechanism(), Mechanism::AES128_CBC_PAD);
        let ct = ctx.encrypt(&Buffer::from(vec![1u8; 5])).unwrap();
        assert_eq!(ct.len(), 16);
        assert_eq!(ctx.decrypt(&ct).unwrap().to_vec(), vec![1u8; 5]);
    }

    #[test]
    fn global_context_round_trip() {
        let ctx = CipherContext::new(&StaticKeySource::new(KEY, IV)).unwrap();
        assert!(ctx.is_ready());
        let msg = Buffer::copy_from_slice(b"process-wide provider");
        assert_eq!(ctx.decrypt(&ctx.encrypt(&msg).unwrap()).unwrap(), msg);
    }

    // --- Input validation --------------------------------------------------

    #[test]
    fn empty_and_null_input_rejected_without_provider_calls() {
        let mut mock = ready_mock();
        mock.expect_create_context().times(0);
        let state = mock_state(mock);
        let ctx = CipherContext::with_state(&state, &StaticKeySource::new(KEY, IV)).unwrap();

        assert_eq!(ctx.encrypt(&Buffer::empty()), Err(ErrorKind::InvalidArgument));
        assert_eq!(ctx.decrypt(&Buffer::empty()), Err(ErrorKind::InvalidArgument));
        assert_eq!(
            ctx.op(None, Direction::Encrypt),
            Err(ErrorKind::InvalidArgument)
        );
    }

    #[test]
    fn truncated_ciphertext_is_system_error() {
        let ctx = soft_context();
        let ct = ctx.encrypt(&Buffer::copy_from_slice(b"hello world")).unwrap();
        let cut = Buffer::copy_from_slice(&ct[..ct.len() - 3]);
        assert_eq!(ctx.decrypt(&cut), Err(ErrorKind::System));
    }

    #[test]
    fn tampered_ciphertext_fails_or_garbles() {
        let ctx = soft_context();
        let msg = b"tamper with me, please";
        let ct = ctx.encrypt(&Buffer::copy_from_slice(msg)).unwrap();
        for i in 0..ct.len() {
            let mut bad = ct.to_vec();
            bad[i] ^= 0x01;
            match ctx.decrypt(&Buffer::from(bad)) {
                Ok(pt) => assert_ne!(pt.as_slice(), msg),
                Err(kind) => assert_eq!(kind, ErrorKind::System),
            }
        }
    }

    // --- Construction failures ----------------------------------------------

    #[test]
    fn failing_key_source_yields_unusable_context() {
        let mut mock = MockCryptoProvider::new();
        mock.expect_initialize().times(1).returning(|| Ok(()));
        mock.expect_best_slot().times(0);
        mock.expect_create_context().times(0);
        mock.expect_release().times(0);
        let state = mock_state(mock);

        let mut source = MockKeySource::new();
        source
            .expect_key_and_iv()
            .times(1)
            .returning(|| Err(KeySourceError::Missing("key")));

        let err = CipherContext::with_state(&state, &source).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        let ctx = err.into_context();
        assert!(!ctx.is_ready());
        let msg = Buffer::copy_from_slice(b"data");
        assert_eq!(ctx.encrypt(&msg), Err(ErrorKind::NotInitialized));
        assert_eq!(ctx.decrypt(&msg), Err(ErrorKind::NotInitialized));
    }

    #[test]
    fn bootstrap_failure_is_system_and_skips_key_source() {
        let mut mock = MockCryptoProvider::new();
        mock.expect_initialize()
            .returning(|| Err(ProviderError::InitFailed("cannot open config dir".into())));
        mock.expect_best_slot().times(0);
        let state = mock_state(mock);

        let mut source = MockKeySource::new();
        source.expect_key_and_iv().times(0);

        let err = CipherContext::with_state(&state, &source).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::System);
        assert!(!state.is_initialized());
        let ctx = err.into_context();
        assert_eq!(
            ctx.encrypt(&Buffer::copy_from_slice(b"x")),
            Err(ErrorKind::NotInitialized)
        );
    }

    #[test]
    fn missing_slot_skips_key_import() {
        let mut mock = MockCryptoProvider::new();
        mock.expect_initialize().returning(|| Ok(()));
        mock.expect_best_slot()
            .with(eq(Mechanism::DES_CBC_PAD))
            .times(1)
            .returning(|m| Err(ProviderError::NoCapableSlot(m)));
        mock.expect_import_sym_key().times(0);
        mock.expect_release().times(0);
        let state = mock_state(mock);

        let err = CipherContext::with_state(&state, &StaticKeySource::new(KEY, IV)).unwrap_err();
        assert_eq!(ErrorKind::from(err), ErrorKind::System);
    }

    #[test]
    fn failed_key_import_releases_slot() {
        let mut mock = MockCryptoProvider::new();
        mock.expect_initialize().returning(|| Ok(()));
        mock.expect_best_slot().returning(|_| Ok(SLOT));
        mock.expect_import_sym_key()
            .withf(|slot, _, usage, raw| {
                *slot == SLOT && *usage == KeyUsage::Encrypt && raw.to_vec() == KEY.to_vec()
            })
            .times(1)
            .returning(|_, m, _, raw| {
                Err(ProviderError::InvalidKeyLength {
                    expected: m.key_len(),
                    actual: raw.len(),
                })
            });
        mock.expect_param_from_iv().times(0);
        mock.expect_release().with(eq(SLOT)).times(1).return_const(());
        let state = mock_state(mock);

        let err = CipherContext::with_state(&state, &StaticKeySource::new(KEY, IV)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::System);
        assert!(!err.into_context().is_ready());
    }

    #[test]
    fn failed_iv_parameter_keeps_partial_context_until_drop() {
        let mut seq = Sequence::new();
        let mut mock = MockCryptoProvider::new();
        mock.expect_initialize().returning(|| Ok(()));
        mock.expect_best_slot().returning(|_| Ok(SLOT));
        mock.expect_import_sym_key().returning(|_, _, _, _| Ok(SYM_KEY));
        mock.expect_param_from_iv()
            .returning(|_, iv| {
                Err(ProviderError::InvalidIvLength {
                    expected: 8,
                    actual: iv.len(),
                })
            });
        mock.expect_create_context().times(0);
        mock.expect_release()
            .with(eq(SYM_KEY))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        mock.expect_release()
            .with(eq(SLOT))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        let state = mock_state(mock);

        let err =
            CipherContext::with_state(&state, &StaticKeySource::new(KEY, b"short".to_vec()))
                .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::System);
        let ctx = err.into_context();
        assert!(!ctx.is_ready());
        assert_eq!(
            ctx.encrypt(&Buffer::copy_from_slice(b"data")),
            Err(ErrorKind::NotInitialized)
        );
        drop(ctx);
    }

    #[test]
    fn construction_error_displays_kind() {
        let (_, state) = soft_state();
        let err = CipherContext::with_state(&state, &StaticKeySource::new(b"bad".to_vec(), IV))
            .unwrap_err();
        assert!(err.to_string().contains("cryptographic provider failure"));
    }

    // --- Operation failures -------------------------------------------------

    #[test]
    fn session_creation_failure_is_system() {
        let mut mock = ready_mock();
        mock.expect_create_context()
            .times(1)
            .returning(|_, _, key, _| Err(ProviderError::InvalidHandle(key)));
        let state = mock_state(mock);
        let ctx = CipherContext::with_state(&state, &StaticKeySource::new(KEY, IV)).unwrap();
        assert_eq!(
            ctx.encrypt(&Buffer::copy_from_slice(b"data")),
            Err(ErrorKind::System)
        );
    }

    #[test]
    fn update_failure_still_destroys_session() {
        let dropped = Arc::new(AtomicBool::new(false));
        let flag = dropped.clone();
        let mut mock = ready_mock();
        mock.expect_create_context()
            .withf(|_, dir, key, param| {
                *dir == Direction::Decrypt && *key == SYM_KEY && *param == PARAM
            })
            .times(1)
            .returning(move |_, _, _, _| {
                Ok(Box::new(FailingSession(flag.clone())) as Box<dyn CipherSession>)
            });
        let state = mock_state(mock);
        let ctx = CipherContext::with_state(&state, &StaticKeySource::new(KEY, IV)).unwrap();

        assert_eq!(
            ctx.decrypt(&Buffer::copy_from_slice(b"8 bytes!")),
            Err(ErrorKind::System)
        );
        assert!(dropped.load(Ordering::SeqCst));
    }

    // --- Resource accounting ----------------------------------------------

    /// Wraps the software provider and counts acquisitions and releases.
    struct CountingProvider {
        inner: SoftProvider,
        acquired: AtomicUsize,
        released: AtomicUsize,
        sessions: Arc<AtomicUsize>,
    }

    struct CountedSession {
        inner: Box<dyn CipherSession>,
        live: Arc<AtomicUsize>,
    }

    impl CipherSession for CountedSession {
        fn update(&mut self, input: &[u8], out: &mut [u8]) -> Result<usize, ProviderError> {
            self.inner.update(input, out)
        }
        fn finalize(&mut self, out: &mut [u8]) -> Result<usize, ProviderError> {
            self.inner.finalize(out)
        }
    }

    impl Drop for CountedSession {
        fn drop(&mut self) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl CountingProvider {
        fn counted(&self, r: Result<ObjectId, ProviderError>) -> Result<ObjectId, ProviderError> {
            if r.is_ok() {
                self.acquired.fetch_add(1, Ordering::SeqCst);
            }
            r
        }
    }

    impl CryptoProvider for CountingProvider {
        fn initialize(&self) -> Result<(), ProviderError> {
            self.inner.initialize()
        }
        fn best_slot(&self, m: Mechanism) -> Result<ObjectId, ProviderError> {
            self.counted(self.inner.best_slot(m))
        }
        fn import_sym_key(
            &self,
            slot: ObjectId,
            m: Mechanism,
            usage: KeyUsage,
            raw: &[u8],
        ) -> Result<ObjectId, ProviderError> {
            self.counted(self.inner.import_sym_key(slot, m, usage, raw))
        }
        fn param_from_iv(&self, m: Mechanism, iv: &[u8]) -> Result<ObjectId, ProviderError> {
            self.counted(self.inner.param_from_iv(m, iv))
        }
        fn block_size(&self, m: Mechanism, param: ObjectId) -> usize {
            self.inner.block_size(m, param)
        }
        fn create_context(
            &self,
            m: Mechanism,
            dir: Direction,
            key: ObjectId,
            param: ObjectId,
        ) -> Result<Box<dyn CipherSession>, ProviderError> {
            let inner = self.inner.create_context(m, dir, key, param)?;
            self.sessions.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountedSession {
                inner,
                live: self.sessions.clone(),
            }))
        }
        fn release(&self, object: ObjectId) {
            self.released.fetch_add(1, Ordering::SeqCst);
            self.inner.release(object);
        }
    }

    #[test]
    fn ten_thousand_lifecycles_leave_no_handles() {
        let counting = Arc::new(CountingProvider {
            inner: SoftProvider::new(),
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            sessions: Arc::new(AtomicUsize::new(0)),
        });
        let state = ProviderState::new(counting.clone(), Mechanism::DES_CBC_PAD);
        let source = StaticKeySource::new(KEY, IV);
        let msg = Buffer::copy_from_slice(b"lifecycle");

        for _ in 0..10_000 {
            let ctx = CipherContext::with_state(&state, &source).unwrap();
            let ct = ctx.encrypt(&msg).unwrap();
            assert_eq!(ctx.decrypt(&ct).unwrap(), msg);
        }

        assert_eq!(counting.acquired.load(Ordering::SeqCst), 30_000);
        assert_eq!(
            counting.acquired.load(Ordering::SeqCst),
            counting.released.load(Ordering::SeqCst)
        );
        assert_eq!(counting.sessions.load(Ordering::SeqCst), 0);
        assert_eq!(counting.inner.live_objects(), 0);
    }

    #[test]
    fn failed_constructions_leave_no_handles() {
        let (soft, state) = soft_state();
        for iv in [b"bad".to_vec(), IV.to_vec()] {
            for key in [b"bad".to_vec(), KEY.to_vec()] {
                let _ = CipherContext::with_state(&state, &StaticKeySource::new(key, iv.clone()));
            }
        }
        assert_eq!(soft.live_objects(), 0);
    }

    #[test]
    fn live_context_holds_three_objects() {
        let (soft, state) = soft_state();
        let ctx = CipherContext::with_state(&state, &StaticKeySource::new(KEY, IV)).unwrap();
        assert_eq!(soft.live_objects(), 3);
        let _ = ctx.encrypt(&Buffer::copy_from_slice(b"x")).unwrap();
        assert_eq!(soft.live_objects(), 3);
        drop(ctx);
        assert_eq!(soft.live_objects(), 0);
    }

    #[test]
    fn debug_does_not_leak_material() {
        let ctx = soft_context();
        let s = format!("{ctx:?}");
        assert!(s.contains("ready: true"));
        assert!(!s.contains("01234567"));
    }
}
