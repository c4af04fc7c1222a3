//! Key packets: public/secret, primary/subordinate, versions 3 and 4.
//!
//! RFC 4880 packet tags 5, 6, 7, 14 all share this body layout; they
//! differ only in whether the secret fields are present and whether
//! the key is a primary or a subordinate key. This module models that
//! with two independent type parameters (`KeyParts`, `KeyRole`)
//! rather than four separate packet bodies.

use std::time::SystemTime;

use crate::{Error, Result};
use crate::conversions::Time;
use crate::crypto::mpi::{self, PublicKey as MpiPublicKey, SecretKeyMaterial};
use crate::types::{PublicKeyAlgorithm, Timestamp};

mod seal {
    pub trait Sealed {}
}

/// Marks a type parameter as describing which parts of a key are present.
pub trait KeyParts: seal::Sealed + Clone + Send + Sync + 'static {
    /// Whether secret key material must be present.
    const REQUIRES_SECRET: bool;
}

/// Only public key material is present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicParts;
/// Only secret key material is present (the public parameters can
/// always be derived from it, but are stored alongside for convenience).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretParts;
/// Key material may or may not include a secret component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnspecifiedParts;

impl seal::Sealed for PublicParts {}
impl seal::Sealed for SecretParts {}
impl seal::Sealed for UnspecifiedParts {}
impl KeyParts for PublicParts { const REQUIRES_SECRET: bool = false; }
impl KeyParts for SecretParts { const REQUIRES_SECRET: bool = true; }
impl KeyParts for UnspecifiedParts { const REQUIRES_SECRET: bool = false; }

/// Marks a type parameter as describing whether a key is primary or
/// subordinate.
pub trait KeyRole: seal::Sealed + Clone + Send + Sync + 'static {}

/// The key is certification-capable and identifies the OpenPGP
/// certificate it belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrimaryRole;
/// The key is bound to a primary key via a subkey binding signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubordinateRole;
/// The key's role has not been determined yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnspecifiedRole;

impl seal::Sealed for PrimaryRole {}
impl seal::Sealed for SubordinateRole {}
impl seal::Sealed for UnspecifiedRole {}
impl KeyRole for PrimaryRole {}
impl KeyRole for SubordinateRole {}
impl KeyRole for UnspecifiedRole {}

/// How a key packet's secret material is protected on the wire.
///
/// Public keys, and secret keys that were decrypted (or never
/// encrypted) at construction time, are `Unprotected`; `secret()`
/// returns their material directly. Secret keys read off the wire
/// with a non-zero S2K usage octet are `Protected`: the encrypted
/// octets are kept verbatim so the packet serializes losslessly
/// without a passphrase, and [`Key4::decrypt_secret`] derives the key
/// and performs the CFB decryption on demand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SecretKeyEncryption {
    /// No S2K container; `secret` holds cleartext material (if any).
    Unprotected,
    /// S2K-protected secret key material.
    Protected {
        /// The raw S2K usage octet (254 or 255; legacy non-zero
        /// values in 1..=253 reuse their value as the symmetric
        /// algorithm and derive the key with an MD5 simple S2K).
        usage: u8,
        sym_algo: crate::types::SymmetricAlgorithm,
        s2k: crate::crypto::s2k::S2K,
        iv: Box<[u8]>,
        /// Whether the trailing checksum is a 20-byte SHA-1 digest
        /// (usage 254) rather than a 2-byte additive checksum.
        sha1_checksum: bool,
        /// CFB-encrypted, checksum-appended secret MPIs.
        ciphertext: Box<[u8]>,
    },
}

/// A version 4 key packet body.
#[derive(Clone, Debug)]
pub struct Key4<P: KeyParts, R: KeyRole> {
    creation_time: Timestamp,
    pk_algo: PublicKeyAlgorithm,
    mpis: MpiPublicKey,
    secret: Option<SecretKeyMaterial>,
    protection: SecretKeyEncryption,
    _parts: std::marker::PhantomData<P>,
    _role: std::marker::PhantomData<R>,
}

impl<P: KeyParts, R: KeyRole> PartialEq for Key4<P, R> {
    fn eq(&self, other: &Self) -> bool {
        self.creation_time == other.creation_time
            && self.pk_algo == other.pk_algo
            && self.mpis == other.mpis
            && self.secret == other.secret
            && self.protection == other.protection
    }
}

impl<P: KeyParts, R: KeyRole> Key4<P, R> {
    /// Creates a new, bare key from its public parameters.
    pub fn new<T>(creation_time: T, pk_algo: PublicKeyAlgorithm,
                   mpis: MpiPublicKey)
        -> Result<Self>
        where T: Into<SystemTime>
    {
        Ok(Key4 {
            creation_time: creation_time.into().to_pgp()
                .ok_or_else(|| Error::InvalidArgument("bad creation time".into()))?
                .into(),
            pk_algo,
            mpis,
            secret: None,
            protection: SecretKeyEncryption::Unprotected,
            _parts: Default::default(),
            _role: Default::default(),
        })
    }

    /// Creates a new key, attaching secret key material.
    pub fn with_secret<T>(creation_time: T, pk_algo: PublicKeyAlgorithm,
                           mpis: MpiPublicKey, secret: SecretKeyMaterial)
        -> Result<Self>
        where T: Into<SystemTime>
    {
        let mut k = Self::new(creation_time, pk_algo, mpis)?;
        k.secret = Some(secret);
        k.protection = SecretKeyEncryption::Unprotected;
        Ok(k)
    }

    /// Creates a new key whose secret key material remains S2K
    /// protected until [`Key4::decrypt_secret`] is called.
    pub(crate) fn with_encrypted_secret<T>(
        creation_time: T, pk_algo: PublicKeyAlgorithm, mpis: MpiPublicKey,
        protection: SecretKeyEncryption,
    ) -> Result<Self>
        where T: Into<SystemTime>
    {
        let mut k = Self::new(creation_time, pk_algo, mpis)?;
        k.protection = protection;
        Ok(k)
    }

    /// Returns the key's creation time.
    pub fn creation_time(&self) -> Timestamp { self.creation_time }

    /// Sets the key's creation time, returning the previous value.
    ///
    /// Changing a key's creation time after the fact changes its
    /// fingerprint; this is mostly useful right after generation, or
    /// in tests that need a fixed timestamp.
    pub fn set_creation_time<T>(&mut self, creation_time: T) -> Result<SystemTime>
        where T: Into<SystemTime>
    {
        let old = SystemTime::from(self.creation_time);
        self.creation_time = creation_time.into().to_pgp()
            .ok_or_else(|| Error::InvalidArgument("bad creation time".into()))?
            .into();
        Ok(old)
    }

    /// Returns the key's public key algorithm.
    pub fn pk_algo(&self) -> PublicKeyAlgorithm { self.pk_algo }

    /// Returns the key's public parameters.
    pub fn mpis(&self) -> &MpiPublicKey { &self.mpis }

    /// Returns the key's secret key material, if any.
    pub fn secret(&self) -> Option<&SecretKeyMaterial> { self.secret.as_ref() }

    /// Strips the secret key material, if any.
    pub fn take_secret(&mut self) -> Option<SecretKeyMaterial> {
        self.secret.take()
    }

    /// Computes this key's fingerprint.
    pub fn fingerprint(&self) -> crate::Fingerprint {
        // 0x99 || big-endian body length || version || creation time
        // || pk_algo || public MPIs, hashed with SHA-1.
        let mut body = Vec::new();
        body.push(4u8);
        let ct = u32::from(self.creation_time);
        body.extend_from_slice(&ct.to_be_bytes());
        body.push(self.pk_algo.into());
        body.extend_from_slice(&crate::serialize::MarshalInto::to_vec(&self.mpis)
            .unwrap_or_default());

        let mut h = crate::types::HashAlgorithm::SHA1.context()
            .expect("SHA-1 is always supported");
        h.update(&[0x99u8]);
        h.update(&(body.len() as u16).to_be_bytes());
        h.update(&body);
        let mut digest = [0u8; 20];
        h.digest(&mut digest);
        crate::Fingerprint::V4(digest)
    }

    /// Computes this key's Key ID.
    pub fn keyid(&self) -> crate::KeyID {
        self.fingerprint().to_keyid()
    }

    /// Casts away the `KeyParts` marker, e.g. after stripping secret
    /// key material.
    pub(crate) fn into_parts<P2: KeyParts>(self) -> Key4<P2, R> {
        Key4 {
            creation_time: self.creation_time,
            pk_algo: self.pk_algo,
            mpis: self.mpis,
            secret: self.secret,
            protection: self.protection,
            _parts: Default::default(),
            _role: Default::default(),
        }
    }

    /// Casts away the `KeyRole` marker.
    pub(crate) fn into_role<R2: KeyRole>(self) -> Key4<P, R2> {
        Key4 {
            creation_time: self.creation_time,
            pk_algo: self.pk_algo,
            mpis: self.mpis,
            secret: self.secret,
            protection: self.protection,
            _parts: Default::default(),
            _role: Default::default(),
        }
    }

    /// Whether the secret key material is still S2K-protected (i.e.
    /// [`Key4::secret`] returns `None` until [`Key4::decrypt_secret`]
    /// is called with the right passphrase).
    pub fn is_protected(&self) -> bool {
        matches!(self.protection, SecretKeyEncryption::Protected { .. })
    }

    /// Derives the passphrase-protection key via the key packet's S2K
    /// specifier, decrypts the secret MPIs, and validates the
    /// trailing checksum.
    ///
    /// Does not mutate `self`; the caller decides whether to cache
    /// the result (e.g. by building a new `Key4` with
    /// [`Key4::with_secret`]).
    pub fn decrypt_secret(&self, passphrase: &[u8]) -> Result<SecretKeyMaterial> {
        let (usage, sym_algo, s2k, iv, sha1_checksum, ciphertext) = match &self.protection {
            SecretKeyEncryption::Unprotected => {
                return self.secret.clone()
                    .ok_or_else(|| Error::InvalidOperation(
                        "key has no secret key material".into()).into());
            }
            SecretKeyEncryption::Protected {
                usage, sym_algo, s2k, iv, sha1_checksum, ciphertext,
            } => (*usage, *sym_algo, s2k, iv, *sha1_checksum, ciphertext),
        };
        let _ = usage;

        let key_size = sym_algo.key_size()?;
        let session_key = s2k.derive_key(passphrase, key_size)?;
        let mut cfb = crate::crypto::symmetric::Context::new(sym_algo, session_key.as_ref())?;
        let mut iv = iv.to_vec();
        let mut plaintext = vec![0u8; ciphertext.len()];
        cfb.decrypt(&mut iv, ciphertext, &mut plaintext)?;

        let checksum_len = if sha1_checksum { 20 } else { 2 };
        if plaintext.len() < checksum_len {
            return Err(Error::Malformed(
                "truncated secret key checksum".into()).into());
        }
        let (body, checksum) = plaintext.split_at(plaintext.len() - checksum_len);
        if sha1_checksum {
            let mut h = crate::types::HashAlgorithm::SHA1.context()?;
            h.update(body);
            let mut digest = [0u8; 20];
            h.digest(&mut digest);
            if digest != checksum {
                return Err(Error::Malformed(
                    "secret key SHA-1 checksum mismatch (bad passphrase?)".into()).into());
            }
        } else {
            let sum = body.iter().fold(0u16, |acc, &b| acc.wrapping_add(b as u16));
            if sum.to_be_bytes() != checksum {
                return Err(Error::Malformed(
                    "secret key checksum mismatch (bad passphrase?)".into()).into());
            }
        }

        SecretKeyMaterial::parse(self.pk_algo, body.to_vec())
    }
}

#[cfg(any(feature = "crypto-rust", test))]
impl Key4<SecretParts, UnspecifiedRole> {
    /// Generates a fresh EdDSA/ECDH key pair over the given curve.
    ///
    /// Used internally to build self-tests and example material; not
    /// part of the consumer-facing sign/verify/encrypt/decrypt API.
    pub fn generate_ecc(for_signing: bool, curve: crate::types::Curve)
        -> Result<Self>
    {
        use rand::rngs::OsRng;

        match (for_signing, &curve) {
            (true, crate::types::Curve::Ed25519) => {
                let mut csprng = OsRng;
                let signing_key = ed25519_dalek::SigningKey::generate(&mut csprng);
                let public = signing_key.verifying_key().to_bytes();
                let mut q = vec![0x40u8];
                q.extend_from_slice(&public);

                Key4::with_secret(
                    SystemTime::now(),
                    PublicKeyAlgorithm::EdDSA,
                    MpiPublicKey::EdDSA {
                        curve,
                        q: mpi::MPI::new(&q),
                    },
                    SecretKeyMaterial::EdDSA {
                        scalar: mpi::MPI::new(&signing_key.to_bytes()).into(),
                    },
                )
            }
            (false, crate::types::Curve::Cv25519) => {
                use x25519_dalek::{StaticSecret, PublicKey as XPublicKey};
                let mut csprng = OsRng;
                let mut raw = [0u8; 32];
                rand::RngCore::fill_bytes(&mut csprng, &mut raw);
                let secret = StaticSecret::from(raw);
                let public = XPublicKey::from(&secret);
                let mut q = vec![0x40u8];
                q.extend_from_slice(public.as_bytes());

                Key4::with_secret(
                    SystemTime::now(),
                    PublicKeyAlgorithm::ECDH,
                    MpiPublicKey::ECDH {
                        curve,
                        q: mpi::MPI::new(&q),
                        hash: crate::types::HashAlgorithm::SHA256,
                        sym: crate::types::SymmetricAlgorithm::AES128,
                    },
                    SecretKeyMaterial::ECDH {
                        scalar: mpi::MPI::new(&secret.to_bytes()).into(),
                    },
                )
            }
            _ => Err(Error::InvalidOperation(
                "unsupported curve/usage combination for key generation".into()).into()),
        }
    }
}

/// A key packet, over any version.
///
/// Currently only version 4 keys are supported for construction; v3
/// keys are only ever produced by parsing (see [`Key4`] vs. the
/// legacy v3 fields tracked separately during parsing).
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum Key<P: KeyParts, R: KeyRole> {
    /// A version 4 key.
    V4(Key4<P, R>),
}

impl<P: KeyParts, R: KeyRole> PartialEq for Key<P, R> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::V4(a), Key::V4(b)) => a == b,
        }
    }
}

impl<P: KeyParts, R: KeyRole> Key<P, R> {
    /// Returns the key's creation time.
    pub fn creation_time(&self) -> Timestamp {
        match self { Key::V4(k) => k.creation_time() }
    }

    /// Sets the key's creation time, returning the previous value.
    pub fn set_creation_time<T>(&mut self, creation_time: T) -> Result<SystemTime>
        where T: Into<SystemTime>
    {
        match self { Key::V4(k) => k.set_creation_time(creation_time) }
    }

    /// Casts away the `KeyRole` marker.
    pub(crate) fn into_role<R2: KeyRole>(self) -> Key<P, R2> {
        match self { Key::V4(k) => Key::V4(k.into_role()) }
    }

    /// Returns the key's public key algorithm.
    pub fn pk_algo(&self) -> PublicKeyAlgorithm {
        match self { Key::V4(k) => k.pk_algo() }
    }

    /// Returns the key's public parameters.
    pub fn mpis(&self) -> &MpiPublicKey {
        match self { Key::V4(k) => k.mpis() }
    }

    /// Returns the key's secret key material, if any.
    pub fn secret(&self) -> Option<&SecretKeyMaterial> {
        match self { Key::V4(k) => k.secret() }
    }

    /// Computes this key's fingerprint.
    pub fn fingerprint(&self) -> crate::Fingerprint {
        match self { Key::V4(k) => k.fingerprint() }
    }

    /// Computes this key's Key ID.
    pub fn keyid(&self) -> crate::KeyID {
        match self { Key::V4(k) => k.keyid() }
    }
}

impl<R: KeyRole> From<Key4<SecretParts, UnspecifiedRole>> for Key<SecretParts, R> {
    fn from(k: Key4<SecretParts, UnspecifiedRole>) -> Self { Key::V4(k.into_role()) }
}

impl<R: KeyRole> From<Key4<PublicParts, UnspecifiedRole>> for Key<PublicParts, R> {
    fn from(k: Key4<PublicParts, UnspecifiedRole>) -> Self { Key::V4(k.into_role()) }
}

impl<R: KeyRole> Key<SecretParts, R> {
    /// Drops the secret key material, returning a public-only view.
    pub fn take_secret(self) -> (Key<PublicParts, R>, Option<SecretKeyMaterial>) {
        match self {
            Key::V4(mut k) => {
                let secret = k.take_secret();
                (Key::V4(k.into_parts()), secret)
            }
        }
    }

    /// Turns this key into a [`KeyPair`] that can be used with
    /// [`crate::crypto::Signer`], failing if it carries no secret key
    /// material (e.g. because it is still S2K-protected).
    pub fn into_keypair(self) -> Result<KeyPair> {
        let (public, secret) = self.take_secret();
        let secret = secret.ok_or_else(|| Error::InvalidOperation(
            "key has no unprotected secret key material".into()))?;
        Ok(KeyPair { public: public.into_role(), secret })
    }
}

/// A public key bound to its secret key material, ready to produce
/// signatures.
///
/// Obtained via [`Key::into_keypair`]; the public half is kept around
/// so callers (and [`crate::crypto::Signer::public`]) can read the
/// algorithm and MPIs without a second lookup.
#[derive(Clone, Debug)]
pub struct KeyPair {
    public: Key<PublicParts, UnspecifiedRole>,
    secret: SecretKeyMaterial,
}

impl KeyPair {
    /// Returns the public half of this key pair.
    pub fn public(&self) -> &Key<PublicParts, UnspecifiedRole> { &self.public }

    /// Returns the secret key material.
    pub fn secret(&self) -> &SecretKeyMaterial { &self.secret }
}

/// A public primary key.
pub type PublicKey = Key<PublicParts, PrimaryRole>;
/// A public subkey.
pub type PublicSubkey = Key<PublicParts, SubordinateRole>;
/// A secret primary key.
pub type SecretKey = Key<SecretParts, PrimaryRole>;
/// A secret subkey.
pub type SecretSubkey = Key<SecretParts, SubordinateRole>;

// Wire format, [Section 5.5 of RFC 4880]: a one-octet version, a
// four-octet creation time, a one-octet public-key algorithm, the
// algorithm-specific public MPIs (no leading curve OID octets, to
// match `crypto::mpi::PublicKey`'s simplified ECC encoding), and, for
// secret key packets, an S2K usage octet followed by the (possibly
// encrypted) secret MPIs and a checksum.
//
// [Section 5.5 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.5

use crate::serialize::Marshal;

/// Returns the number of bytes the algorithm-specific public MPI
/// sequence occupies at the front of `data`.
fn public_mpi_region_len(algo: PublicKeyAlgorithm, data: &[u8]) -> Result<usize> {
    use crate::parse::Parse;
    use crate::crypto::mpi::MPI;

    fn one(data: &[u8]) -> Result<usize> {
        Ok(2 + MPI::from_bytes(data)?.value().len())
    }

    use PublicKeyAlgorithm::*;
    let len = match algo {
        RSAEncryptSign | RSAEncrypt | RSASign => {
            let n = one(data)?;
            let e = one(&data[n..])?;
            n + e
        }
        DSA => {
            let p = one(data)?;
            let q = one(&data[p..])?;
            let g = one(&data[p + q..])?;
            let y = one(&data[p + q + g..])?;
            p + q + g + y
        }
        ElGamalEncrypt | ElGamalEncryptSign => {
            let p = one(data)?;
            let g = one(&data[p..])?;
            let y = one(&data[p + g..])?;
            p + g + y
        }
        EdDSA | ECDSA => one(data)?,
        ECDH => {
            let q = one(data)?;
            if data.len() < q + 4 {
                return Err(Error::Malformed(
                    "truncated ECDH KDF parameters".into()).into());
            }
            q + 4
        }
        _ => data.len(),
    };
    Ok(len)
}

fn parse_public_prefix(data: &[u8])
    -> Result<(Timestamp, PublicKeyAlgorithm, MpiPublicKey, usize)>
{
    if data.len() < 6 {
        return Err(Error::Malformed("truncated key packet".into()).into());
    }
    let version = data[0];
    if version != 4 {
        return Err(Error::Malformed(
            format!("unsupported key packet version {}", version)).into());
    }
    let creation_time = Timestamp::from(
        u32::from_be_bytes([data[1], data[2], data[3], data[4]]));
    let pk_algo = PublicKeyAlgorithm::from(data[5]);
    let mut pos = 6;
    let mpi_len = public_mpi_region_len(pk_algo, &data[pos..])?;
    if data.len() < pos + mpi_len {
        return Err(Error::Malformed("truncated key packet".into()).into());
    }
    let mpis = MpiPublicKey::parse(pk_algo, data[pos..pos + mpi_len].to_vec())?;
    pos += mpi_len;
    Ok((creation_time, pk_algo, mpis, pos))
}

fn serialize_public_prefix<W: std::io::Write + ?Sized>(
    sink: &mut W, creation_time: Timestamp, pk_algo: PublicKeyAlgorithm, mpis: &MpiPublicKey,
) -> Result<()> {
    sink.write_all(&[4u8])?;
    sink.write_all(&u32::from(creation_time).to_be_bytes())?;
    sink.write_all(&[pk_algo.into()])?;
    mpis.serialize(sink)?;
    Ok(())
}

impl<R: KeyRole> Marshal for Key4<PublicParts, R> {
    fn serialize(&self, sink: &mut dyn std::io::Write) -> Result<()> {
        serialize_public_prefix(sink, self.creation_time, self.pk_algo, &self.mpis)
    }
}

impl<R: KeyRole> crate::parse::Parse<'_, Key4<PublicParts, R>> for Key4<PublicParts, R> {
    fn from_bytes(data: &[u8]) -> Result<Self> {
        let (creation_time, pk_algo, mpis, consumed) = parse_public_prefix(data)?;
        if consumed != data.len() {
            return Err(Error::Malformed(
                "trailing data in public key packet".into()).into());
        }
        Key4::new(creation_time, pk_algo, mpis)
    }
}

impl<R: KeyRole> Marshal for Key4<SecretParts, R> {
    fn serialize(&self, sink: &mut dyn std::io::Write) -> Result<()> {
        serialize_public_prefix(sink, self.creation_time, self.pk_algo, &self.mpis)?;
        match &self.protection {
            SecretKeyEncryption::Unprotected => {
                let secret = self.secret.as_ref()
                    .ok_or_else(|| Error::InvalidOperation(
                        "secret key packet without secret key material".into()))?;
                sink.write_all(&[0u8])?;
                let mut body = Vec::new();
                secret.serialize(&mut body)?;
                let sum = body.iter().fold(0u16, |acc, &b| acc.wrapping_add(b as u16));
                body.extend_from_slice(&sum.to_be_bytes());
                sink.write_all(&body)?;
            }
            SecretKeyEncryption::Protected {
                usage, sym_algo, s2k, iv, ciphertext, ..
            } => {
                sink.write_all(&[*usage])?;
                sink.write_all(&[u8::from(*sym_algo)])?;
                s2k.serialize(sink)?;
                sink.write_all(iv)?;
                sink.write_all(ciphertext)?;
            }
        }
        Ok(())
    }
}

impl<R: KeyRole> crate::parse::Parse<'_, Key4<SecretParts, R>> for Key4<SecretParts, R> {
    fn from_bytes(data: &[u8]) -> Result<Self> {
        let (creation_time, pk_algo, mpis, mut pos) = parse_public_prefix(data)?;

        let usage = *data.get(pos)
            .ok_or_else(|| Error::Malformed("truncated key packet".into()))?;
        pos += 1;

        match usage {
            0 => {
                if data.len() < pos + 2 {
                    return Err(Error::Malformed(
                        "truncated secret key material".into()).into());
                }
                let (body, checksum) = data[pos..].split_at(data.len() - pos - 2);
                let sum = body.iter().fold(0u16, |acc, &b| acc.wrapping_add(b as u16));
                if sum.to_be_bytes() != checksum {
                    return Err(Error::Malformed(
                        "secret key checksum mismatch".into()).into());
                }
                let secret = SecretKeyMaterial::parse(pk_algo, body.to_vec())?;
                Key4::with_secret(creation_time, pk_algo, mpis, secret)
            }
            254 | 255 => {
                let sym_algo = crate::types::SymmetricAlgorithm::from(
                    *data.get(pos)
                        .ok_or_else(|| Error::Malformed("truncated key packet".into()))?);
                pos += 1;

                let mut cursor: &[u8] = &data[pos..];
                let s2k = crate::crypto::s2k::S2K::parse(&mut cursor)?;
                pos = data.len() - cursor.len();

                let iv_len = sym_algo.block_size()?;
                if data.len() < pos + iv_len {
                    return Err(Error::Malformed("truncated key packet IV".into()).into());
                }
                let iv = data[pos..pos + iv_len].to_vec().into_boxed_slice();
                pos += iv_len;

                let ciphertext = data[pos..].to_vec().into_boxed_slice();
                Key4::with_encrypted_secret(
                    creation_time, pk_algo, mpis,
                    SecretKeyEncryption::Protected {
                        usage, sym_algo, s2k, iv,
                        sha1_checksum: usage == 254,
                        ciphertext,
                    })
            }
            legacy_algo => {
                let sym_algo = crate::types::SymmetricAlgorithm::from(legacy_algo);
                let s2k = crate::crypto::s2k::S2K::Simple {
                    hash: crate::types::HashAlgorithm::MD5,
                };

                let iv_len = sym_algo.block_size()?;
                if data.len() < pos + iv_len {
                    return Err(Error::Malformed("truncated key packet IV".into()).into());
                }
                let iv = data[pos..pos + iv_len].to_vec().into_boxed_slice();
                pos += iv_len;

                let ciphertext = data[pos..].to_vec().into_boxed_slice();
                Key4::with_encrypted_secret(
                    creation_time, pk_algo, mpis,
                    SecretKeyEncryption::Protected {
                        usage, sym_algo, s2k, iv,
                        sha1_checksum: false,
                        ciphertext,
                    })
            }
        }
    }
}

impl<P: KeyParts, R: KeyRole> Marshal for Key<P, R>
    where Key4<P, R>: Marshal
{
    fn serialize(&self, sink: &mut dyn std::io::Write) -> Result<()> {
        match self { Key::V4(k) => k.serialize(sink) }
    }
}

impl<'a, P: KeyParts, R: KeyRole> crate::parse::Parse<'a, Key<P, R>> for Key<P, R>
    where Key4<P, R>: crate::parse::Parse<'a, Key4<P, R>>
{
    fn from_bytes(data: &'a [u8]) -> Result<Self> {
        Ok(Key::V4(Key4::from_bytes(data)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Parse;

    #[test]
    fn public_key_roundtrip() {
        let key = Key4::<SecretParts, UnspecifiedRole>::generate_ecc(
            true, crate::types::Curve::Ed25519).unwrap();
        let (public, _secret) = Key::from(key).take_secret();

        let bytes = crate::serialize::MarshalInto::to_vec(&public).unwrap();
        let parsed = PublicKey::from_bytes(&bytes).unwrap();
        assert_eq!(public, parsed);
    }

    #[test]
    fn secret_key_unprotected_roundtrip() {
        let key = Key4::<SecretParts, UnspecifiedRole>::generate_ecc(
            false, crate::types::Curve::Cv25519).unwrap();
        let key: SecretKey = Key::V4(key.into_role());

        let bytes = crate::serialize::MarshalInto::to_vec(&key).unwrap();
        let parsed = SecretKey::from_bytes(&bytes).unwrap();
        assert_eq!(key, parsed);
    }
}
