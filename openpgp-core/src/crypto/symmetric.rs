//! Symmetric encryption and decryption of packet bodies.
//!
//! OpenPGP always uses a cipher in (segmented) CFB mode with a
//! per-message IV: either the classic "OpenPGP CFB" construction
//! (used by SED and the SEIP+MDC container) or plain CFB inside an
//! AEAD envelope. This module wraps the RustCrypto block ciphers for
//! the algorithms `openpgp-core` supports.

use cipher::{BlockCipher, BlockEncrypt, BlockDecrypt, KeyInit, generic_array::GenericArray};

use crate::{Error, Result};
use crate::types::SymmetricAlgorithm;

/// A symmetric cipher context bound to a concrete key.
///
/// Encrypts/decrypts using the classic OpenPGP-CFB self-synchronizing
/// mode described in [Section 13.9 of RFC 4880].
///
/// [Section 13.9 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-13.9
pub(crate) enum Context {
    #[cfg(feature = "crypto-rust")]
    Aes128(Box<aes::Aes128>),
    #[cfg(feature = "crypto-rust")]
    Aes192(Box<aes::Aes192>),
    #[cfg(feature = "crypto-rust")]
    Aes256(Box<aes::Aes256>),
    #[cfg(feature = "crypto-rust")]
    Twofish(Box<twofish::Twofish>),
    #[cfg(feature = "crypto-rust")]
    Camellia128(Box<camellia::Camellia128>),
    #[cfg(feature = "crypto-rust")]
    Camellia192(Box<camellia::Camellia192>),
    #[cfg(feature = "crypto-rust")]
    Camellia256(Box<camellia::Camellia256>),
    #[cfg(feature = "crypto-rust")]
    Cast5(Box<cast5::Cast5>),
    #[cfg(feature = "crypto-rust")]
    Blowfish(Box<blowfish::Blowfish>),
    #[cfg(feature = "crypto-rust")]
    Idea(Box<idea::Idea>),
    #[cfg(feature = "crypto-rust")]
    TripleDes(Box<des::TdesEde3>),
}

macro_rules! block_size_match {
    ($self:ident, $name:ident, $body:expr) => {
        match $self {
            #[cfg(feature = "crypto-rust")]
            Context::Aes128($name) => $body,
            #[cfg(feature = "crypto-rust")]
            Context::Aes192($name) => $body,
            #[cfg(feature = "crypto-rust")]
            Context::Aes256($name) => $body,
            #[cfg(feature = "crypto-rust")]
            Context::Twofish($name) => $body,
            #[cfg(feature = "crypto-rust")]
            Context::Camellia128($name) => $body,
            #[cfg(feature = "crypto-rust")]
            Context::Camellia192($name) => $body,
            #[cfg(feature = "crypto-rust")]
            Context::Camellia256($name) => $body,
            #[cfg(feature = "crypto-rust")]
            Context::Cast5($name) => $body,
            #[cfg(feature = "crypto-rust")]
            Context::Blowfish($name) => $body,
            #[cfg(feature = "crypto-rust")]
            Context::Idea($name) => $body,
            #[cfg(feature = "crypto-rust")]
            Context::TripleDes($name) => $body,
        }
    }
}

impl Context {
    #[cfg(feature = "crypto-rust")]
    pub(crate) fn new(algo: SymmetricAlgorithm, key: &[u8]) -> Result<Self> {
        use SymmetricAlgorithm::*;
        Ok(match algo {
            AES128 => Context::Aes128(Box::new(aes::Aes128::new(
                GenericArray::from_slice(key)))),
            AES192 => Context::Aes192(Box::new(aes::Aes192::new(
                GenericArray::from_slice(key)))),
            AES256 => Context::Aes256(Box::new(aes::Aes256::new(
                GenericArray::from_slice(key)))),
            Twofish => Context::Twofish(Box::new(twofish::Twofish::new(
                GenericArray::from_slice(key)))),
            Camellia128 => Context::Camellia128(Box::new(camellia::Camellia128::new(
                GenericArray::from_slice(key)))),
            Camellia192 => Context::Camellia192(Box::new(camellia::Camellia192::new(
                GenericArray::from_slice(key)))),
            Camellia256 => Context::Camellia256(Box::new(camellia::Camellia256::new(
                GenericArray::from_slice(key)))),
            CAST5 => Context::Cast5(Box::new(cast5::Cast5::new(
                GenericArray::from_slice(key)))),
            Blowfish => Context::Blowfish(Box::new(blowfish::Blowfish::new(
                GenericArray::from_slice(key)))),
            IDEA => Context::Idea(Box::new(idea::Idea::new(
                GenericArray::from_slice(key)))),
            TripleDES => Context::TripleDes(Box::new(des::TdesEde3::new(
                GenericArray::from_slice(key)))),
            _ => return Err(Error::UnsupportedAlgorithm(format!("symmetric algorithm {:?}", algo)).into()),
        })
    }

    fn block_size(&self) -> usize {
        block_size_match!(self, c, {
            use cipher::BlockSizeUser;
            let _ = c;
            <_ as BlockSizeUser>::block_size(&**c)
        })
    }

    /// Encrypts `plaintext` into `ciphertext` using OpenPGP-CFB, with
    /// `iv` as the feedback register (mutated in place so the caller
    /// can continue encrypting the next chunk).
    pub(crate) fn encrypt(&mut self, iv: &mut [u8], plaintext: &[u8],
                           ciphertext: &mut [u8])
        -> Result<()>
    {
        let bs = self.block_size();
        if iv.len() != bs || plaintext.len() != ciphertext.len() {
            return Err(Error::InvalidArgument(
                "IV/block size mismatch".into()).into());
        }
        for (i, chunk) in plaintext.chunks(bs).enumerate() {
            let off = i * bs;
            let mut fb = GenericArray::clone_from_slice(iv);
            block_size_match!(self, c, c.encrypt_block(&mut fb));
            for j in 0..chunk.len() {
                ciphertext[off + j] = chunk[j] ^ fb[j];
            }
            iv[..chunk.len()].copy_from_slice(&ciphertext[off..off + chunk.len()]);
        }
        Ok(())
    }

    /// Decrypts `ciphertext` into `plaintext`, the inverse of
    /// [`encrypt`](Self::encrypt).
    pub(crate) fn decrypt(&mut self, iv: &mut [u8], ciphertext: &[u8],
                           plaintext: &mut [u8])
        -> Result<()>
    {
        let bs = self.block_size();
        if iv.len() != bs || plaintext.len() != ciphertext.len() {
            return Err(Error::InvalidArgument(
                "IV/block size mismatch".into()).into());
        }
        for (i, chunk) in ciphertext.chunks(bs).enumerate() {
            let off = i * bs;
            let mut fb = GenericArray::clone_from_slice(iv);
            block_size_match!(self, c, c.encrypt_block(&mut fb));
            for j in 0..chunk.len() {
                plaintext[off + j] = chunk[j] ^ fb[j];
            }
            iv[..chunk.len()].copy_from_slice(chunk);
        }
        Ok(())
    }
}

// Silence unused-import warnings when only a subset of ciphers'
// traits are exercised by the macro expansion above.
#[allow(unused_imports)]
use cipher::BlockSizeUser as _;
#[allow(dead_code)]
fn _assert_traits<C: BlockCipher + BlockEncrypt + BlockDecrypt>() {}
