//! AEAD encryption, for AEAD-encrypted session keys and (future)
//! AEAD-protected containers.
//!
//! Only EAX and OCB are defined by the crypto refresh draft that
//! introduced AEAD to OpenPGP; both are wired to their RustCrypto
//! implementations here.

use crate::{Error, Result};
use crate::types::{AEADAlgorithm, SymmetricAlgorithm};

impl AEADAlgorithm {
    /// Returns the size, in bytes, of this algorithm's nonce.
    pub fn nonce_size(self) -> Result<usize> {
        match self {
            AEADAlgorithm::EAX => Ok(16),
            AEADAlgorithm::OCB => Ok(15),
            _ => Err(Error::UnsupportedAlgorithm(format!("AEAD algorithm {:?}", self)).into()),
        }
    }

    /// Returns the size, in bytes, of this algorithm's authentication tag.
    pub fn digest_size(self) -> Result<usize> {
        match self {
            AEADAlgorithm::EAX | AEADAlgorithm::OCB => Ok(16),
            _ => Err(Error::UnsupportedAlgorithm(format!("AEAD algorithm {:?}", self)).into()),
        }
    }
}

#[cfg(feature = "crypto-rust")]
pub(crate) mod rust {
    use aes::{Aes128, Aes192, Aes256};
    use eax::Eax;
    use ocb3::Ocb3;
    use aead::{AeadInPlace, KeyInit, generic_array::GenericArray};

    use crate::{Error, Result};
    use crate::types::{AEADAlgorithm, SymmetricAlgorithm};

    /// Seals `buf` in place, appending the authentication tag, using
    /// `key`/`nonce` bound to the given AEAD and symmetric algorithms.
    pub(crate) fn encrypt(aead: AEADAlgorithm, sym: SymmetricAlgorithm,
                           key: &[u8], nonce: &[u8], aad: &[u8],
                           buf: &mut Vec<u8>)
        -> Result<()>
    {
        macro_rules! seal {
            ($cipher:ty) => {{
                let c = <$cipher>::new(GenericArray::from_slice(key));
                let tag = c.encrypt_in_place_detached(
                    GenericArray::from_slice(nonce), aad, buf)
                    .map_err(|_| Error::InvalidOperation(
                        "AEAD encryption failed".into()))?;
                buf.extend_from_slice(&tag);
                Ok(())
            }}
        }
        match (aead, sym) {
            (AEADAlgorithm::EAX, SymmetricAlgorithm::AES128) => seal!(Eax<Aes128>),
            (AEADAlgorithm::EAX, SymmetricAlgorithm::AES192) => seal!(Eax<Aes192>),
            (AEADAlgorithm::EAX, SymmetricAlgorithm::AES256) => seal!(Eax<Aes256>),
            (AEADAlgorithm::OCB, SymmetricAlgorithm::AES128) => seal!(Ocb3<Aes128, typenum::U15>),
            (AEADAlgorithm::OCB, SymmetricAlgorithm::AES192) => seal!(Ocb3<Aes192, typenum::U15>),
            (AEADAlgorithm::OCB, SymmetricAlgorithm::AES256) => seal!(Ocb3<Aes256, typenum::U15>),
            _ => Err(Error::UnsupportedAlgorithm(format!("AEAD algorithm {:?}", aead)).into()),
        }
    }

    /// Opens `buf` in place, stripping and checking the authentication
    /// tag; the inverse of [`encrypt`].
    pub(crate) fn decrypt(aead: AEADAlgorithm, sym: SymmetricAlgorithm,
                          key: &[u8], nonce: &[u8], aad: &[u8],
                          buf: &mut Vec<u8>)
        -> Result<()>
    {
        let tag_len = aead.digest_size()?;
        if buf.len() < tag_len {
            return Err(Error::Malformed("AEAD chunk too short".into()).into());
        }
        let tag = buf.split_off(buf.len() - tag_len);
        macro_rules! open {
            ($cipher:ty) => {{
                let c = <$cipher>::new(GenericArray::from_slice(key));
                c.decrypt_in_place_detached(
                    GenericArray::from_slice(nonce), aad, buf,
                    GenericArray::from_slice(&tag))
                    .map_err(|_| Error::BadCrypto("message has been manipulated".into()))?;
                Ok(())
            }}
        }
        match (aead, sym) {
            (AEADAlgorithm::EAX, SymmetricAlgorithm::AES128) => open!(Eax<Aes128>),
            (AEADAlgorithm::EAX, SymmetricAlgorithm::AES192) => open!(Eax<Aes192>),
            (AEADAlgorithm::EAX, SymmetricAlgorithm::AES256) => open!(Eax<Aes256>),
            (AEADAlgorithm::OCB, SymmetricAlgorithm::AES128) => open!(Ocb3<Aes128, typenum::U15>),
            (AEADAlgorithm::OCB, SymmetricAlgorithm::AES192) => open!(Ocb3<Aes192, typenum::U15>),
            (AEADAlgorithm::OCB, SymmetricAlgorithm::AES256) => open!(Ocb3<Aes256, typenum::U15>),
            _ => Err(Error::UnsupportedAlgorithm(format!("AEAD algorithm {:?}", aead)).into()),
        }
    }
}
