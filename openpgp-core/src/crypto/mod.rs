//! Cryptographic primitives.

//! Cryptographic primitives used by the packet parser and serializer.
//!
//! This crate delegates the actual number-crunching (modular
//! exponentiation, block ciphers, hash compression functions) to the
//! RustCrypto ecosystem; this module only wires packet-level
//! structures (MPIs, S2K specifiers, symmetric session keys) to those
//! primitives.

pub mod mem;
pub mod mpi;
pub mod hash;
pub mod s2k;
pub(crate) mod symmetric;
pub(crate) mod aead;
pub(crate) mod ecdh;
pub(crate) mod asymmetric;

pub use mem::Protected;
pub use mpi::{MPI, ProtectedMPI, PublicKey, SecretKeyMaterial, Ciphertext, Signature};

use crate::packet::key;
use crate::types::HashAlgorithm;
use crate::Result;

/// Produces signatures over pre-computed hash digests.
///
/// Implemented by [`key::KeyPair`]; signature creation
/// ([`crate::packet::signature::SignatureBuilder::sign_hash`]) goes
/// through this trait rather than a concrete key type so that callers
/// can substitute a hardware-backed or otherwise custom signer.
pub trait Signer {
    /// Returns the public key that corresponds to the signing key.
    fn public(&self) -> &key::Key<key::PublicParts, key::UnspecifiedRole>;

    /// Signs `digest`, the output of hashing a signature's coverage
    /// area with `hash_algo`.
    fn sign(&mut self, hash_algo: HashAlgorithm, digest: &[u8]) -> Result<mpi::Signature>;
}

/// Fills `buf` with cryptographically secure random bytes.
///
/// Used to generate session keys, IVs, S2K salts, and message padding.
pub(crate) fn random(buf: &mut [u8]) {
    use rand::rngs::OsRng;
    rand::RngCore::fill_bytes(&mut OsRng, buf);
}

impl Signer for key::KeyPair {
    fn public(&self) -> &key::Key<key::PublicParts, key::UnspecifiedRole> {
        key::KeyPair::public(self)
    }

    fn sign(&mut self, hash_algo: HashAlgorithm, digest: &[u8]) -> Result<mpi::Signature> {
        crate::crypto::asymmetric::sign(self.public().mpis(), self.secret(), hash_algo, digest)
    }
}
