//! Hash contexts, and hashing of packets and related types into the
//! signature coverage defined by RFC 4880.

use crate::types::HashAlgorithm;
use crate::Error;
use crate::Result;

use std::io::{self, Write};

/// State of a hash function.
pub struct Context {
    algo: HashAlgorithm,
    ctx: Box<dyn digest::DynDigest + Send + Sync>,
}

impl Clone for Context {
    fn clone(&self) -> Self {
        // `DynDigest` doesn't require `Clone`; boxed algorithm state is
        // cheap to recreate empty, which is all callers need a clone
        // for (none of them clone mid-hash).
        self.algo.context().expect("algorithm was constructible once")
    }
}

impl Context {
    /// Returns the algorithm.
    pub fn algo(&self) -> HashAlgorithm {
        self.algo
    }

    /// Size of the digest in bytes.
    pub fn digest_size(&self) -> usize {
        self.ctx.output_size()
    }

    /// Writes data into the hash function.
    pub fn update<D: AsRef<[u8]>>(&mut self, data: D) {
        self.ctx.update(data.as_ref());
    }

    /// Finalizes the hash function and writes the digest into the
    /// provided slice, resetting the hash function's state.
    ///
    /// `digest` must be at least `self.digest_size()` bytes large,
    /// otherwise the digest will be truncated.
    pub fn digest<D: AsMut<[u8]>>(&mut self, mut digest: D) {
        let digest = digest.as_mut();
        let out = self.ctx.finalize_reset();
        let n = digest.len().min(out.len());
        digest[..n].copy_from_slice(&out[..n]);
    }
}

impl Write for Context {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl HashAlgorithm {
    /// Whether this algorithm is implemented.
    pub fn is_supported(self) -> bool {
        matches!(self,
            HashAlgorithm::MD5 | HashAlgorithm::SHA1 | HashAlgorithm::RipeMD |
            HashAlgorithm::SHA256 | HashAlgorithm::SHA384 |
            HashAlgorithm::SHA512 | HashAlgorithm::SHA224)
    }

    /// Creates a new hash context for this algorithm.
    ///
    /// Fails with `Error::UnsupportedAlgorithm` for algorithms this
    /// crate does not implement.
    pub fn context(self) -> Result<Context> {
        use sha1collisiondetection::Sha1CD;
        use sha2::{Sha224, Sha256, Sha384, Sha512};

        let ctx: Box<dyn digest::DynDigest + Send + Sync> = match self {
            HashAlgorithm::MD5 => Box::new(md5::Md5::default()),
            HashAlgorithm::SHA1 => Box::new(Sha1CD::default()),
            HashAlgorithm::RipeMD => Box::new(ripemd::Ripemd160::default()),
            HashAlgorithm::SHA224 => Box::new(Sha224::default()),
            HashAlgorithm::SHA256 => Box::new(Sha256::default()),
            HashAlgorithm::SHA384 => Box::new(Sha384::default()),
            HashAlgorithm::SHA512 => Box::new(Sha512::default()),
            HashAlgorithm::Private(_) | HashAlgorithm::Unknown(_) =>
                return Err(Error::UnsupportedAlgorithm(format!("hash algorithm {:?}", self)).into()),
        };

        Ok(Context { algo: self, ctx })
    }
}

/// Hashes OpenPGP values into a running [`Context`], following the
/// coverage rules of the object being hashed (e.g. a user ID is
/// preceded by a synthetic `0xB4` tag and a 4-byte length; a key is
/// preceded by `0x99` and a 2-byte length).
pub trait Hash {
    /// Updates `hash` with a representation of `self`.
    fn hash(&self, hash: &mut Context);
}

impl Hash for crate::packet::UserID {
    fn hash(&self, hash: &mut Context) {
        let mut header = [0u8; 5];
        header[0] = 0xB4;
        header[1..].copy_from_slice(&(self.value().len() as u32).to_be_bytes());
        hash.update(&header[..]);
        hash.update(self.value());
    }
}

impl<P, R> Hash for crate::packet::key::Key4<P, R>
    where P: crate::packet::key::KeyParts,
          R: crate::packet::key::KeyRole,
{
    fn hash(&self, hash: &mut Context) {
        use crate::serialize::Marshal;

        // 9 bytes of header (tag, 2-byte length, version, 4-byte
        // creation time, algorithm) minus the 3 bytes that aren't
        // part of the length, plus the serialized public MPIs.
        let len = (9 - 3) + self.mpis().serialized_len();

        let mut header = Vec::with_capacity(9);
        header.push(0x99u8);
        header.push((len >> 8) as u8);
        header.push(len as u8);
        header.push(4);
        header.extend_from_slice(&u32::from(self.creation_time()).to_be_bytes());
        header.push(self.pk_algo().into());
        hash.update(&header);

        self.mpis().hash(hash);
    }
}

impl<P, R> Hash for crate::packet::key::Key<P, R>
    where P: crate::packet::key::KeyParts,
          R: crate::packet::key::KeyRole,
{
    fn hash(&self, hash: &mut Context) {
        match self {
            crate::packet::key::Key::V4(k) => k.hash(hash),
        }
    }
}

impl Hash for crate::packet::UserAttribute {
    fn hash(&self, hash: &mut Context) {
        let mut header = [0u8; 5];
        header[0] = 0xD1;
        header[1..].copy_from_slice(&(self.value().len() as u32).to_be_bytes());
        hash.update(&header[..]);
        hash.update(self.value());
    }
}

impl Hash for crate::packet::signature::SignatureFields {
    /// Hashes the version-4 signature header and hashed subpacket
    /// area, then appends the version-4 trailer.  See RFC 4880,
    /// Section 5.2.4.
    fn hash(&self, hash: &mut Context) {
        let hashed_area = self.hashed_area().to_vec()
            .unwrap_or_default();

        let mut header = [0u8; 6];
        header[0] = self.version();
        header[1] = self.typ().into();
        header[2] = self.pk_algo().into();
        header[3] = self.hash_algo().into();
        header[4] = (hashed_area.len() >> 8) as u8;
        header[5] = hashed_area.len() as u8;

        hash.update(&header[..]);
        hash.update(&hashed_area);

        let len = header.len() + hashed_area.len();
        let trailer = [0x04u8, 0xff,
                       (len >> 24) as u8, (len >> 16) as u8,
                       (len >> 8) as u8, len as u8];
        hash.update(&trailer[..]);
    }
}

impl Hash for crate::packet::Signature4 {
    fn hash(&self, hash: &mut Context) {
        self.fields.hash(hash);
    }
}

impl Hash for crate::packet::signature::Signature3 {
    /// Hashes the five bytes of version-3 signature material: the
    /// signature type and the fixed creation time.  Version 3
    /// signatures have no subpacket areas and no trailer.
    fn hash(&self, hash: &mut Context) {
        let mut buf = [0u8; 5];
        buf[0] = self.typ().into();
        buf[1..].copy_from_slice(&u32::from(self.creation_time()).to_be_bytes());
        hash.update(&buf[..]);
    }
}

impl Hash for crate::packet::Signature {
    fn hash(&self, hash: &mut Context) {
        match self {
            crate::packet::Signature::V3(sig) => sig.hash(hash),
            crate::packet::Signature::V4(sig) => sig.hash(hash),
        }
    }
}

/// Digests of the signature coverage areas defined by RFC 4880,
/// Section 5.2.4: a signature is never hashed alone, but always
/// together with the key material, user ID, or user attribute it
/// binds together.
impl crate::packet::Signature {
    /// Returns the message digest of a standalone signature, i.e.
    /// one that covers nothing but its own signature data.
    pub(crate) fn standalone_hash(&self) -> Result<Vec<u8>> {
        let mut h = self.hash_algo().context()?;
        self.hash(&mut h);
        let mut digest = vec![0u8; h.digest_size()];
        h.digest(&mut digest);
        Ok(digest)
    }

    /// Returns the message digest of a timestamp signature.
    pub(crate) fn timestamp_hash(&self) -> Result<Vec<u8>> {
        self.standalone_hash()
    }

    /// Returns the message digest of the primary key binding over
    /// the given primary key.
    pub(crate) fn primary_key_binding_hash(
        &self,
        key: &crate::packet::key::PublicKey,
    ) -> Result<Vec<u8>> {
        let mut h = self.hash_algo().context()?;
        key.hash(&mut h);
        self.hash(&mut h);
        let mut digest = vec![0u8; h.digest_size()];
        h.digest(&mut digest);
        Ok(digest)
    }

    /// Returns the message digest of the subkey binding over the
    /// given primary key and subkey.
    pub(crate) fn subkey_binding_hash<P>(
        &self,
        key: &crate::packet::key::PublicKey,
        subkey: &crate::packet::key::Key<P, crate::packet::key::SubordinateRole>,
    ) -> Result<Vec<u8>>
    where
        P: crate::packet::key::KeyParts,
    {
        let mut h = self.hash_algo().context()?;
        key.hash(&mut h);
        subkey.hash(&mut h);
        self.hash(&mut h);
        let mut digest = vec![0u8; h.digest_size()];
        h.digest(&mut digest);
        Ok(digest)
    }

    /// Returns the message digest of the user ID binding over the
    /// given primary key and user ID.
    pub(crate) fn userid_binding_hash(
        &self,
        key: &crate::packet::key::PublicKey,
        userid: &crate::packet::UserID,
    ) -> Result<Vec<u8>> {
        let mut h = self.hash_algo().context()?;
        key.hash(&mut h);
        userid.hash(&mut h);
        self.hash(&mut h);
        let mut digest = vec![0u8; h.digest_size()];
        h.digest(&mut digest);
        Ok(digest)
    }

    /// Returns the message digest of the user attribute binding over
    /// the given primary key and user attribute.
    pub(crate) fn user_attribute_binding_hash(
        &self,
        key: &crate::packet::key::PublicKey,
        ua: &crate::packet::UserAttribute,
    ) -> Result<Vec<u8>> {
        let mut h = self.hash_algo().context()?;
        key.hash(&mut h);
        ua.hash(&mut h);
        self.hash(&mut h);
        let mut digest = vec![0u8; h.digest_size()];
        h.digest(&mut digest);
        Ok(digest)
    }
}
