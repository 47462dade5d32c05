//! Buffered CBC session with PKCS#7 padding, driven block by block.
//!
//! Encryption emits every whole block on `update` and pads the remainder on
//! `finalize`. Decryption always holds back the last full block until
//! `finalize`, where the padding is checked and stripped.

use cbc::cipher::{
    block_padding::{Padding, Pkcs7, UnpadError},
    generic_array::GenericArray,
    BlockCipher, BlockDecryptMut, BlockEncryptMut, BlockSizeUser,
};
use zeroize::{Zeroize, Zeroizing};

use super::{CipherSession, Direction, ProviderError};

/// One chained block transform (encrypt or decrypt) carrying the running IV.
///
/// Blocks passed in must be exactly the cipher's block size.
pub(crate) trait BlockEngine {
    /// Transform exactly one block in place.
    fn process(&mut self, block: &mut [u8]);

    /// Fill `block[pos..]` with PKCS#7 padding.
    fn pad(&self, block: &mut [u8], pos: usize);

    /// Data part of a PKCS#7 padded block.
    fn unpad<'a>(&self, block: &'a [u8]) -> Result<&'a [u8], UnpadError>;
}

fn pkcs7_pad<C: BlockSizeUser>(block: &mut [u8], pos: usize) {
    <Pkcs7 as Padding<C::BlockSize>>::pad(GenericArray::from_mut_slice(block), pos);
}

fn pkcs7_unpad<C: BlockSizeUser>(block: &[u8]) -> Result<&[u8], UnpadError> {
    <Pkcs7 as Padding<C::BlockSize>>::unpad(GenericArray::from_slice(block))
}

impl<C: BlockEncryptMut + BlockCipher> BlockEngine for cbc::Encryptor<C> {
    fn process(&mut self, block: &mut [u8]) {
        self.encrypt_block_mut(GenericArray::from_mut_slice(block));
    }

    fn pad(&self, block: &mut [u8], pos: usize) {
        pkcs7_pad::<C>(block, pos);
    }

    fn unpad<'a>(&self, block: &'a [u8]) -> Result<&'a [u8], UnpadError> {
        pkcs7_unpad::<C>(block)
    }
}

impl<C: BlockDecryptMut + BlockCipher> BlockEngine for cbc::Decryptor<C> {
    fn process(&mut self, block: &mut [u8]) {
        self.decrypt_block_mut(GenericArray::from_mut_slice(block));
    }

    fn pad(&self, block: &mut [u8], pos: usize) {
        pkcs7_pad::<C>(block, pos);
    }

    fn unpad<'a>(&self, block: &'a [u8]) -> Result<&'a [u8], UnpadError> {
        pkcs7_unpad::<C>(block)
    }
}

pub(crate) struct CbcSession {
    engine: Box<dyn BlockEngine>,
    direction: Direction,
    block_size: usize,
    pending: Zeroizing<Vec<u8>>,
    finished: bool,
}

impl CbcSession {
    pub(crate) fn new(engine: Box<dyn BlockEngine>, direction: Direction, block_size: usize) -> Self {
        Self {
            engine,
            direction,
            block_size,
            pending: Zeroizing::new(Vec::with_capacity(block_size * 2)),
            finished: false,
        }
    }

    /// Bytes that can be emitted now out of `buffered` pending bytes.
    fn emit_len(&self, buffered: usize) -> usize {
        let bs = self.block_size;
        match self.direction {
            Direction::Encrypt => buffered / bs * bs,
            // Keep at least one byte (hence the last block) back for unpadding.
            Direction::Decrypt => buffered.saturating_sub(1) / bs * bs,
        }
    }

    fn finalize_encrypt(&mut self, out: &mut [u8]) -> Result<usize, ProviderError> {
        let bs = self.block_size;
        if out.len() < bs {
            return Err(ProviderError::BufferTooSmall {
                needed: bs,
                available: out.len(),
            });
        }
        let tail = self.pending.len();
        let block = &mut out[..bs];
        block[..tail].copy_from_slice(&self.pending);
        self.engine.pad(block, tail);
        self.engine.process(block);
        self.pending.zeroize();
        Ok(bs)
    }

    fn finalize_decrypt(&mut self, out: &mut [u8]) -> Result<usize, ProviderError> {
        let bs = self.block_size;
        if self.pending.len() != bs {
            return Err(ProviderError::DataLength(self.pending.len()));
        }
        let mut block = std::mem::take(&mut self.pending);
        self.engine.process(block.as_mut_slice());

        let data = self
            .engine
            .unpad(block.as_slice())
            .map_err(|_| ProviderError::BadPadding)?;
        let n = data.len();
        if n > out.len() {
            return Err(ProviderError::BufferTooSmall {
                needed: n,
                available: out.len(),
            });
        }
        out[..n].copy_from_slice(data);
        Ok(n)
    }
}

impl CipherSession for CbcSession {
    fn update(&mut self, input: &[u8], out: &mut [u8]) -> Result<usize, ProviderError> {
        if self.finished {
            return Err(ProviderError::SessionFinished);
        }
        let ready = self.emit_len(self.pending.len() + input.len());
        if out.len() < ready {
            return Err(ProviderError::BufferTooSmall {
                needed: ready,
                available: out.len(),
            });
        }
        self.pending.extend_from_slice(input);

        let out = &mut out[..ready];
        out.copy_from_slice(&self.pending[..ready]);
        for block in out.chunks_exact_mut(self.block_size) {
            self.engine.process(block);
        }
        self.pending[..ready].zeroize();
        self.pending.drain(..ready);
        Ok(ready)
    }

    fn finalize(&mut self, out: &mut [u8]) -> Result<usize, ProviderError> {
        if self.finished {
            return Err(ProviderError::SessionFinished);
        }
        self.finished = true;
        match self.direction {
            Direction::Encrypt => self.finalize_encrypt(out),
            Direction::Decrypt => self.finalize_decrypt(out),
        }
    }
}
