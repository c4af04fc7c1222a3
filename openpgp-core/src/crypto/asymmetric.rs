//! Public-key signature generation and verification.
//!
//! This module wires the algorithm-tagged MPI structures in
//! [`crate::crypto::mpi`] to the RustCrypto implementations of RSA,
//! DSA, ECDSA, and EdDSA. Callers go through [`sign`] and [`verify`],
//! which dispatch on the signer's/verifier's public-key algorithm.

use crate::crypto::mpi::{self, MPI, PublicKey, SecretKeyMaterial};
use crate::types::{Curve, HashAlgorithm};
use crate::{Error, Result};

/// Left-pads `buf` with zeroes to `len` bytes.
fn pad(buf: &[u8], len: usize) -> Vec<u8> {
    let mut v = vec![0u8; len.saturating_sub(buf.len())];
    v.extend_from_slice(buf);
    v
}

fn rsa_padding(hash_algo: HashAlgorithm) -> Result<rsa::Pkcs1v15Sign> {
    use HashAlgorithm::*;
    Ok(match hash_algo {
        MD5 => rsa::Pkcs1v15Sign::new::<md5::Md5>(),
        SHA1 => rsa::Pkcs1v15Sign::new::<sha1collisiondetection::Sha1CD>(),
        SHA224 => rsa::Pkcs1v15Sign::new::<sha2::Sha224>(),
        SHA256 => rsa::Pkcs1v15Sign::new::<sha2::Sha256>(),
        SHA384 => rsa::Pkcs1v15Sign::new::<sha2::Sha384>(),
        SHA512 => rsa::Pkcs1v15Sign::new::<sha2::Sha512>(),
        _ => return Err(Error::UnsupportedAlgorithm(format!("hash algorithm {:?}", hash_algo)).into()),
    })
}

fn rsa_sign(e: &MPI, n: &MPI, d: &mpi::ProtectedMPI, p: &mpi::ProtectedMPI,
            q: &mpi::ProtectedMPI, hash_algo: HashAlgorithm, digest: &[u8])
    -> Result<mpi::Signature>
{
    use rsa::BigUint;
    let key = rsa::RsaPrivateKey::from_components(
        BigUint::from_bytes_be(n.value()),
        BigUint::from_bytes_be(e.value()),
        BigUint::from_bytes_be(d.value()),
        vec![BigUint::from_bytes_be(p.value()), BigUint::from_bytes_be(q.value())],
    ).map_err(|e| Error::BadCrypto(e.to_string()))?;

    let sig = key.sign(rsa_padding(hash_algo)?, digest)
        .map_err(|e| Error::BadCrypto(e.to_string()))?;
    Ok(mpi::Signature::RSA { s: MPI::new(&sig) })
}

fn rsa_verify(e: &MPI, n: &MPI, hash_algo: HashAlgorithm, digest: &[u8], s: &MPI)
    -> Result<()>
{
    use rsa::BigUint;
    let key = rsa::RsaPublicKey::new(
        BigUint::from_bytes_be(n.value()),
        BigUint::from_bytes_be(e.value()),
    ).map_err(|e| Error::Malformed(e.to_string()))?;

    key.verify(rsa_padding(hash_algo)?, digest, s.value())
        .map_err(|_| Error::BadCrypto(
            "RSA signature verification failed".into()).into())
}

fn dsa_sign(p: &MPI, q: &MPI, g: &MPI, x: &mpi::ProtectedMPI, digest: &[u8])
    -> Result<mpi::Signature>
{
    use dsa::signature::hazmat::PrehashSigner;
    use dsa::BigUint;

    let components = dsa::Components::from_components(
        BigUint::from_bytes_be(p.value()),
        BigUint::from_bytes_be(q.value()),
        BigUint::from_bytes_be(g.value()),
    ).map_err(|e| Error::BadCrypto(e.to_string()))?;
    let x = BigUint::from_bytes_be(x.value());
    let y = dsa::generate::public_component(&components, &x);
    let verifying_key = dsa::VerifyingKey::from_components(components, y)
        .map_err(|e| Error::BadCrypto(e.to_string()))?;
    let signing_key = dsa::SigningKey::from_components(verifying_key, x)
        .map_err(|e| Error::BadCrypto(e.to_string()))?;

    let sig: dsa::Signature = signing_key.sign_prehash(digest)
        .map_err(|e| Error::BadCrypto(e.to_string()))?;
    Ok(mpi::Signature::DSA {
        r: MPI::new(&sig.r().to_bytes_be()),
        s: MPI::new(&sig.s().to_bytes_be()),
    })
}

fn dsa_verify(p: &MPI, q: &MPI, g: &MPI, y: &MPI, digest: &[u8], r: &MPI, s: &MPI)
    -> Result<()>
{
    use dsa::signature::hazmat::PrehashVerifier;
    use dsa::BigUint;

    let components = dsa::Components::from_components(
        BigUint::from_bytes_be(p.value()),
        BigUint::from_bytes_be(q.value()),
        BigUint::from_bytes_be(g.value()),
    ).map_err(|e| Error::BadCrypto(e.to_string()))?;
    let verifying_key = dsa::VerifyingKey::from_components(
        components, BigUint::from_bytes_be(y.value()))
        .map_err(|e| Error::BadCrypto(e.to_string()))?;
    let sig = dsa::Signature::from_components(
        BigUint::from_bytes_be(r.value()), BigUint::from_bytes_be(s.value()))
        .map_err(|e| Error::Malformed(e.to_string()))?;

    verifying_key.verify_prehash(digest, &sig)
        .map_err(|_| Error::BadCrypto(
            "DSA signature verification failed".into()).into())
}

macro_rules! ecdsa_curve {
    ($curve:ty, $scalar:expr, $digest:expr) => {{
        use ecdsa::signature::hazmat::PrehashSigner;
        use ecdsa::elliptic_curve::generic_array::GenericArray;
        let signing_key = ecdsa::SigningKey::<$curve>::from_bytes(
            GenericArray::from_slice($scalar))
            .map_err(|e| Error::Malformed(e.to_string()))?;
        let sig: ecdsa::Signature<$curve> = signing_key.sign_prehash($digest)
            .map_err(|e| Error::BadCrypto(e.to_string()))?;
        let bytes = sig.to_bytes();
        let half = bytes.len() / 2;
        mpi::Signature::ECDSA {
            r: MPI::new(&bytes[..half]),
            s: MPI::new(&bytes[half..]),
        }
    }}
}

fn ecdsa_sign(curve: &Curve, scalar: &mpi::ProtectedMPI, field_bytes: usize,
              digest: &[u8])
    -> Result<mpi::Signature>
{
    let scalar = pad(scalar.value(), field_bytes);
    Ok(match curve {
        Curve::NistP256 => ecdsa_curve!(p256::NistP256, scalar.as_slice(), digest),
        Curve::NistP384 => ecdsa_curve!(p384::NistP384, scalar.as_slice(), digest),
        Curve::NistP521 => ecdsa_curve!(p521::NistP521, scalar.as_slice(), digest),
        _ => return Err(Error::UnsupportedAlgorithm(format!("elliptic curve {:?}", curve.clone())).into()),
    })
}

fn ecdsa_verify(curve: &Curve, x: &[u8], y: &[u8], field_bytes: usize,
                digest: &[u8], r: &MPI, s: &MPI)
    -> Result<()>
{
    let r = pad(r.value(), field_bytes);
    let s = pad(s.value(), field_bytes);
    match curve {
        Curve::NistP256 => {
            use ecdsa::signature::hazmat::PrehashVerifier;
            let mut point = vec![0x04u8];
            point.extend_from_slice(x);
            point.extend_from_slice(y);
            let verifying_key = ecdsa::VerifyingKey::<p256::NistP256>::from_sec1_bytes(&point)
                .map_err(|e| Error::Malformed(e.to_string()))?;
            let sig = ecdsa::Signature::<p256::NistP256>::from_slice(&[r, s].concat())
                .map_err(|e| Error::Malformed(e.to_string()))?;
            verifying_key.verify_prehash(digest, &sig)
                .map_err(|_| Error::BadCrypto(
                    "ECDSA signature verification failed".into()).into())
        }
        Curve::NistP384 => {
            use ecdsa::signature::hazmat::PrehashVerifier;
            let mut point = vec![0x04u8];
            point.extend_from_slice(x);
            point.extend_from_slice(y);
            let verifying_key = ecdsa::VerifyingKey::<p384::NistP384>::from_sec1_bytes(&point)
                .map_err(|e| Error::Malformed(e.to_string()))?;
            let sig = ecdsa::Signature::<p384::NistP384>::from_slice(&[r, s].concat())
                .map_err(|e| Error::Malformed(e.to_string()))?;
            verifying_key.verify_prehash(digest, &sig)
                .map_err(|_| Error::BadCrypto(
                    "ECDSA signature verification failed".into()).into())
        }
        Curve::NistP521 => {
            use ecdsa::signature::hazmat::PrehashVerifier;
            let mut point = vec![0x04u8];
            point.extend_from_slice(x);
            point.extend_from_slice(y);
            let verifying_key = ecdsa::VerifyingKey::<p521::NistP521>::from_sec1_bytes(&point)
                .map_err(|e| Error::Malformed(e.to_string()))?;
            let sig = ecdsa::Signature::<p521::NistP521>::from_slice(&[r, s].concat())
                .map_err(|e| Error::Malformed(e.to_string()))?;
            verifying_key.verify_prehash(digest, &sig)
                .map_err(|_| Error::BadCrypto(
                    "ECDSA signature verification failed".into()).into())
        }
        _ => Err(Error::UnsupportedAlgorithm(format!("elliptic curve {:?}", curve.clone())).into()),
    }
}

fn eddsa_sign(curve: &Curve, scalar: &mpi::ProtectedMPI, digest: &[u8])
    -> Result<mpi::Signature>
{
    if *curve != Curve::Ed25519 {
        return Err(Error::UnsupportedAlgorithm(format!("elliptic curve {:?}", curve.clone())).into());
    }
    let bytes: [u8; 32] = pad(scalar.value(), 32).try_into()
        .map_err(|_| Error::Malformed("bad Ed25519 scalar length".into()))?;
    let signing_key = ed25519_dalek::SigningKey::from_bytes(&bytes);
    let sig = ed25519_dalek::Signer::sign(&signing_key, digest);
    let bytes = sig.to_bytes();
    Ok(mpi::Signature::EdDSA {
        r: MPI::new(&bytes[..32]),
        s: MPI::new(&bytes[32..]),
    })
}

fn eddsa_verify(curve: &Curve, q: &MPI, digest: &[u8], r: &MPI, s: &MPI) -> Result<()> {
    if *curve != Curve::Ed25519 {
        return Err(Error::UnsupportedAlgorithm(format!("elliptic curve {:?}", curve.clone())).into());
    }
    let (point, _) = q.decode_point(curve)?;
    let point: [u8; 32] = point.try_into()
        .map_err(|_| Error::Malformed("bad Ed25519 point length".into()))?;
    let verifying_key = ed25519_dalek::VerifyingKey::from_bytes(&point)
        .map_err(|e| Error::Malformed(e.to_string()))?;

    let r = pad(r.value(), 32);
    let s = pad(s.value(), 32);
    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(&r);
    sig_bytes[32..].copy_from_slice(&s);
    let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);

    ed25519_dalek::Verifier::verify(&verifying_key, digest, &sig)
        .map_err(|_| Error::BadCrypto(
            "EdDSA signature verification failed".into()).into())
}

/// Signs `digest` (the output of hashing the signature's coverage
/// area with `hash_algo`) with `secret`, whose public half is
/// `public`.
pub(crate) fn sign(public: &PublicKey, secret: &SecretKeyMaterial,
                    hash_algo: HashAlgorithm, digest: &[u8])
    -> Result<mpi::Signature>
{
    match (public, secret) {
        (PublicKey::RSA { e, n }, SecretKeyMaterial::RSA { d, p, q, .. }) =>
            rsa_sign(e, n, d, p, q, hash_algo, digest),

        (PublicKey::DSA { p, q, g, .. }, SecretKeyMaterial::DSA { x }) =>
            dsa_sign(p, q, g, x, digest),

        (PublicKey::EdDSA { curve, .. }, SecretKeyMaterial::EdDSA { scalar }) =>
            eddsa_sign(curve, scalar, digest),

        (PublicKey::ECDSA { curve, .. }, SecretKeyMaterial::ECDSA { scalar }) => {
            let field_bytes = (curve.bits()? + 7) / 8;
            ecdsa_sign(curve, scalar, field_bytes, digest)
        }

        (pk, _) => Err(Error::InvalidOperation(format!(
            "unsupported combination of public key algorithm {:?} and secret key material",
            pk.algo())).into()),
    }
}

/// Verifies that `signature` over `digest` was made by the holder of
/// `public`.
pub(crate) fn verify(public: &PublicKey, hash_algo: HashAlgorithm, digest: &[u8],
                      signature: &mpi::Signature)
    -> Result<()>
{
    match (public, signature) {
        (PublicKey::RSA { e, n }, mpi::Signature::RSA { s }) =>
            rsa_verify(e, n, hash_algo, digest, s),

        (PublicKey::DSA { p, q, g, y }, mpi::Signature::DSA { r, s }) =>
            dsa_verify(p, q, g, y, digest, r, s),

        (PublicKey::EdDSA { curve, q }, mpi::Signature::EdDSA { r, s }) =>
            eddsa_verify(curve, q, digest, r, s),

        (PublicKey::ECDSA { curve, q }, mpi::Signature::ECDSA { r, s }) => {
            let (x, y) = q.decode_point(curve)?;
            let field_bytes = (curve.bits()? + 7) / 8;
            ecdsa_verify(curve, x, y, field_bytes, digest, r, s)
        }

        (pk, sig) => Err(Error::InvalidOperation(format!(
            "unsupported combination of public key algorithm {:?} and signature {:?}",
            pk.algo(), sig)).into()),
    }
}
