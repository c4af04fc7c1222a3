//! ECDH key wrapping, as defined in [RFC 6637].
//!
//! [RFC 6637]: https://tools.ietf.org/html/rfc6637
//!
//! The shared point computed by ECDH is run through a KDF derived
//! from the recipient key's hash/symmetric-algorithm hints, and the
//! session key is wrapped with AES key wrap (RFC 3394) using the
//! resulting key.

use crate::{Error, Result};
use crate::crypto::mpi;
use crate::packet::key;
use crate::types::{Curve, HashAlgorithm, SymmetricAlgorithm};

/// Derives the Concat KDF key per [Section 7 of RFC 6637].
///
/// [Section 7 of RFC 6637]: https://tools.ietf.org/html/rfc6637#section-7
pub(crate) fn kdf(hash_algo: HashAlgorithm, sym_algo: SymmetricAlgorithm,
                   shared_point_x: &[u8], param: &[u8])
    -> Result<crate::crypto::Protected>
{
    let mut h = hash_algo.context()?;
    h.update(&[0, 0, 0, 1]);
    h.update(shared_point_x);
    h.update(param);

    let key_size = sym_algo.key_size()?;
    let mut digest = vec![0; h.digest_size()];
    h.digest(&mut digest);
    digest.truncate(key_size);
    if digest.len() != key_size {
        return Err(Error::InvalidOperation(
            "KDF digest shorter than required key size".into()).into());
    }
    Ok(digest.into())
}

/// Builds the KDF parameter string ("other info") for a given recipient.
pub(crate) fn build_param(curve: &Curve, fingerprint: &crate::Fingerprint,
                           hash_algo: HashAlgorithm, sym_algo: SymmetricAlgorithm)
    -> Vec<u8>
{
    let mut param = Vec::new();
    param.extend_from_slice(curve.oid());
    param.push(u8::from(crate::types::PublicKeyAlgorithm::ECDH));
    param.extend_from_slice(&[0x03, 0x01, u8::from(hash_algo), u8::from(sym_algo)]);
    param.extend_from_slice(b"Anonymous Sender    ");
    if let crate::Fingerprint::V4(fp) = fingerprint {
        param.extend_from_slice(fp);
    }
    param
}

/// The AES key wrap algorithm (RFC 3394), used to wrap the session key.
pub(crate) mod aes_kw {
    use crate::{Error, Result};

    const IV: u64 = 0xA6A6A6A6A6A6A6A6;

    /// Wraps `key` (the session key) with the key-encryption key `kek`.
    pub(crate) fn wrap(kek: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        use cipher::{BlockEncrypt, KeyInit, generic_array::GenericArray};
        if key.len() % 8 != 0 || key.is_empty() {
            return Err(Error::InvalidArgument(
                "key to wrap must be a non-empty multiple of 8 bytes".into()).into());
        }
        let n = key.len() / 8;
        let mut r: Vec<u64> = key.chunks(8)
            .map(|c| u64::from_be_bytes(c.try_into().unwrap()))
            .collect();
        let mut a = IV;

        macro_rules! run {
            ($cipher:ty) => {{
                let c = <$cipher>::new(GenericArray::from_slice(kek));
                for j in 0..6 {
                    for i in 0..n {
                        let mut block = [0u8; 16];
                        block[..8].copy_from_slice(&a.to_be_bytes());
                        block[8..].copy_from_slice(&r[i].to_be_bytes());
                        let mut ga = GenericArray::clone_from_slice(&block);
                        c.encrypt_block(&mut ga);
                        a = u64::from_be_bytes(ga[..8].try_into().unwrap())
                            ^ ((n * j + i + 1) as u64);
                        r[i] = u64::from_be_bytes(ga[8..].try_into().unwrap());
                    }
                }
            }}
        }
        match kek.len() {
            16 => run!(aes::Aes128),
            24 => run!(aes::Aes192),
            32 => run!(aes::Aes256),
            _ => return Err(Error::InvalidArgument(
                "unsupported key-encryption-key size".into()).into()),
        }

        let mut out = Vec::with_capacity(8 + key.len());
        out.extend_from_slice(&a.to_be_bytes());
        for v in r { out.extend_from_slice(&v.to_be_bytes()); }
        Ok(out)
    }

    /// Unwraps ciphertext produced by [`wrap`].
    pub(crate) fn unwrap(kek: &[u8], wrapped: &[u8]) -> Result<Vec<u8>> {
        use cipher::{BlockDecrypt, KeyInit, generic_array::GenericArray};
        if wrapped.len() % 8 != 0 || wrapped.len() < 16 {
            return Err(Error::Malformed("malformed wrapped key".into()).into());
        }
        let n = wrapped.len() / 8 - 1;
        let mut a = u64::from_be_bytes(wrapped[..8].try_into().unwrap());
        let mut r: Vec<u64> = wrapped[8..].chunks(8)
            .map(|c| u64::from_be_bytes(c.try_into().unwrap()))
            .collect();

        macro_rules! run {
            ($cipher:ty) => {{
                let c = <$cipher>::new(GenericArray::from_slice(kek));
                for j in (0..6).rev() {
                    for i in (0..n).rev() {
                        let mut block = [0u8; 16];
                        block[..8].copy_from_slice(
                            &(a ^ ((n * j + i + 1) as u64)).to_be_bytes());
                        block[8..].copy_from_slice(&r[i].to_be_bytes());
                        let mut ga = GenericArray::clone_from_slice(&block);
                        c.decrypt_block(&mut ga);
                        a = u64::from_be_bytes(ga[..8].try_into().unwrap());
                        r[i] = u64::from_be_bytes(ga[8..].try_into().unwrap());
                    }
                }
            }}
        }
        match kek.len() {
            16 => run!(aes::Aes128),
            24 => run!(aes::Aes192),
            32 => run!(aes::Aes256),
            _ => return Err(Error::InvalidArgument(
                "unsupported key-encryption-key size".into()).into()),
        }

        if a != IV {
            return Err(Error::BadCrypto("message has been manipulated".into()));
        }
        let mut out = Vec::with_capacity(wrapped.len() - 8);
        for v in r { out.extend_from_slice(&v.to_be_bytes()); }
        Ok(out)
    }
}

/// Encrypts `session_key` to the given ECDH public key, returning the
/// `Ciphertext` that goes into a PKESK packet.
pub(crate) fn encrypt(recipient: &key::PublicKey, curve: &Curve,
                       hash_algo: HashAlgorithm, sym_algo: SymmetricAlgorithm,
                       fingerprint: &crate::Fingerprint,
                       shared_point_x: &[u8], ephemeral_key: mpi::MPI,
                       session_key: &[u8])
    -> Result<mpi::Ciphertext>
{
    let param = build_param(curve, fingerprint, hash_algo, sym_algo);
    let kek = kdf(hash_algo, sym_algo, shared_point_x, &param)?;

    // RFC 6637 pads the session key with a PKCS#5-style checksum octet
    // pair before wrapping it.
    let mut padded = session_key.to_vec();
    let checksum: u16 = session_key.iter().fold(0u16, |acc, &b| acc.wrapping_add(b as u16));
    padded.push((checksum >> 8) as u8);
    padded.push(checksum as u8);

    let wrapped = aes_kw::wrap(kek.as_ref(), &padded)?;
    let _ = recipient;
    Ok(mpi::Ciphertext::ECDH {
        e: ephemeral_key,
        key: wrapped.into_boxed_slice(),
    })
}

/// Decrypts a PKESK's `Ciphertext` with an ECDH secret key, returning
/// the session key (without the leading algorithm octet).
pub(crate) fn decrypt(curve: &Curve, hash_algo: HashAlgorithm,
                       sym_algo: SymmetricAlgorithm,
                       fingerprint: &crate::Fingerprint,
                       shared_point_x: &[u8], wrapped_key: &[u8])
    -> Result<crate::crypto::Protected>
{
    let param = build_param(curve, fingerprint, hash_algo, sym_algo);
    let kek = kdf(hash_algo, sym_algo, shared_point_x, &param)?;

    let mut padded = aes_kw::unwrap(kek.as_ref(), wrapped_key)?;
    if padded.len() < 3 {
        return Err(Error::Malformed("wrapped ECDH session key too short".into()).into());
    }
    let checksum = ((padded[padded.len() - 2] as u16) << 8)
        | padded[padded.len() - 1] as u16;
    padded.truncate(padded.len() - 2);
    let actual: u16 = padded.iter().fold(0u16, |acc, &b| acc.wrapping_add(b as u16));
    if actual != checksum {
        return Err(Error::BadCrypto("message has been manipulated".into()));
    }
    Ok(padded.into())
}
