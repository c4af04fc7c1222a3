//! Packet-related types.
//!
//! See [Section 4 of RFC 4880] for more details.
//!
//!   [Section 4 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4

use std::slice;

use crate::Packet;
use crate::Result;
use crate::serialize::Marshal;

pub(crate) mod container;
pub(crate) use container::Container;

pub mod key;
pub mod signature;
pub mod userid;
mod seip;
mod aed;
mod trust;

pub use self::trust::Trust;
pub use self::seip::SEIP1;
pub use self::aed::AED1;
pub use self::userid::UserID;
pub use self::signature::{Signature, Signature3, Signature4, SignatureBuilder};
pub use crate::types::Tag;

/// Holds a symmetrically encrypted integrity protected data packet.
///
/// This packet is a container.  See [Section 5.13 of RFC 4880] for
/// details.
///
/// [Section 5.13 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.13
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SEIP {
    /// SEIP packet version 1.
    V1(self::seip::SEIP1),
}

impl SEIP {
    pub(crate) fn container_ref(&self) -> &Container {
        match self {
            SEIP::V1(p) => &*p,
        }
    }

    pub(crate) fn container_mut(&mut self) -> &mut Container {
        match self {
            SEIP::V1(p) => &mut *p,
        }
    }
}

impl Marshal for SEIP {
    fn serialize(&self, sink: &mut dyn std::io::Write) -> Result<()> {
        match self {
            SEIP::V1(p) => p.serialize(sink),
        }
    }
}

/// Holds an AEAD encrypted data packet.
///
/// This packet is a container.  See [Section 5.16 of RFC 4880bis] for
/// details.
///
/// [Section 5.16 of RFC 4880bis]: https://tools.ietf.org/html/draft-ietf-openpgp-rfc4880bis-05#section-5.16
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum AED {
    /// AED packet version 1.
    V1(self::aed::AED1),
}

impl AED {
    pub(crate) fn container_ref(&self) -> &Container {
        match self {
            AED::V1(p) => &*p,
        }
    }

    pub(crate) fn container_mut(&mut self) -> &mut Container {
        match self {
            AED::V1(p) => &mut *p,
        }
    }
}

impl Marshal for AED {
    fn serialize(&self, sink: &mut dyn std::io::Write) -> Result<()> {
        match self {
            AED::V1(p) => p.serialize(sink),
        }
    }
}

/// Fields common to all packet bodies.
///
/// Currently empty; reserved so that cross-cutting metadata (e.g. the
/// packet's original header encoding) can be added without changing
/// every packet body's constructor signature.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Common {}

/// A `Iter` iterates over the *contents* of a packet in depth-first
/// order.
pub struct Iter<'a> {
    children: slice::Iter<'a, Packet>,
    child: Option<&'a Packet>,
    grandchildren: Option<Box<Iter<'a>>>,
    depth: usize,
}

impl<'a> Default for Iter<'a> {
    fn default() -> Self {
        Iter {
            children: [].iter(),
            child: None,
            grandchildren: None,
            depth: 0,
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Packet;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(ref mut grandchildren) = self.grandchildren {
            let grandchild = grandchildren.next();
            if grandchild.is_some() {
                self.depth = grandchildren.depth + 1;
                return grandchild;
            }
        }

        self.child = self.children.next();
        if let Some(child) = self.child {
            self.grandchildren = Some(Box::new(child.descendants()));
        }

        self.depth = 0;
        self.child
    }
}

/// Holds a one-pass signature packet.
///
/// See [Section 5.4 of RFC 4880] for details.
///
///   [Section 5.4 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.4
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OnePassSig {
    pub(crate) common: Common,
    sigtype: crate::types::SignatureType,
    hash_algo: crate::types::HashAlgorithm,
    pk_algo: crate::types::PublicKeyAlgorithm,
    issuer: crate::KeyID,
    last: bool,
}

impl OnePassSig {
    /// Creates a new one-pass signature packet announcing a
    /// subsequent signature of the given type, to be verified with
    /// the given key.
    pub fn new(sigtype: crate::types::SignatureType,
               hash_algo: crate::types::HashAlgorithm,
               pk_algo: crate::types::PublicKeyAlgorithm,
               issuer: crate::KeyID,
               last: bool) -> Self {
        OnePassSig { common: Default::default(), sigtype, hash_algo, pk_algo, issuer, last }
    }

    /// Returns the signature type that follows.
    pub fn sigtype(&self) -> crate::types::SignatureType { self.sigtype }
    /// Returns the hash algorithm used by the following signature.
    pub fn hash_algo(&self) -> crate::types::HashAlgorithm { self.hash_algo }
    /// Returns the public key algorithm used by the following signature.
    pub fn pk_algo(&self) -> crate::types::PublicKeyAlgorithm { self.pk_algo }
    /// Returns the Key ID of the signer.
    pub fn issuer(&self) -> &crate::KeyID { &self.issuer }
    /// Returns whether this is the last one-pass signature packet
    /// before the signed content, i.e. the outermost signature.
    pub fn last(&self) -> bool { self.last }
}

impl From<OnePassSig> for Packet {
    fn from(p: OnePassSig) -> Self { Packet::OnePassSig(p) }
}

impl Marshal for OnePassSig {
    fn serialize(&self, sink: &mut dyn std::io::Write) -> Result<()> {
        sink.write_all(&[3, u8::from(self.sigtype), u8::from(self.hash_algo),
                          u8::from(self.pk_algo)])?;
        sink.write_all(self.issuer.as_bytes())?;
        sink.write_all(&[self.last as u8])?;
        Ok(())
    }
}

/// Holds a Marker packet.
///
/// See [Section 5.8 of RFC 4880] for details. Markers carry no
/// information and are ignored by readers; they exist so that
/// implementations can detect certain legacy/experimental streams.
///
///   [Section 5.8 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.8
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Marker {
    pub(crate) common: Common,
}

/// The fixed three-byte body of a Marker packet, `"PGP"`.
pub const MARKER_BODY: [u8; 3] = [0x50, 0x47, 0x50];

impl Marker {
    /// Creates a new Marker packet.
    pub fn new() -> Self {
        Marker { common: Default::default() }
    }
}

impl From<Marker> for Packet {
    fn from(p: Marker) -> Self { Packet::Marker(p) }
}

impl Marshal for Marker {
    fn serialize(&self, sink: &mut dyn std::io::Write) -> Result<()> {
        sink.write_all(&MARKER_BODY)?;
        Ok(())
    }
}

/// Holds a User Attribute packet.
///
/// See [Section 5.12 of RFC 4880] for details. A user attribute is a
/// sequence of self-describing subpackets (currently only the JPEG
/// image subpacket type is standardized); this crate treats the
/// subpacket stream as an opaque blob, leaving interpretation to
/// callers.
///
///   [Section 5.12 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.12
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserAttribute {
    pub(crate) common: Common,
    value: Vec<u8>,
}

impl UserAttribute {
    /// Creates a new User Attribute packet from its raw subpacket
    /// stream.
    pub fn new(value: Vec<u8>) -> Self {
        UserAttribute { common: Default::default(), value }
    }

    /// Returns the raw subpacket stream.
    pub fn value(&self) -> &[u8] { &self.value }
}

impl From<UserAttribute> for Packet {
    fn from(p: UserAttribute) -> Self { Packet::UserAttribute(p) }
}

impl Marshal for UserAttribute {
    fn serialize(&self, sink: &mut dyn std::io::Write) -> Result<()> {
        sink.write_all(&self.value)?;
        Ok(())
    }
}

/// Holds a Literal Data packet.
///
/// See [Section 5.9 of RFC 4880] for details.
///
///   [Section 5.9 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.9
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Literal {
    pub(crate) common: Common,
    format: DataFormat,
    filename: Option<Vec<u8>>,
    date: Option<crate::types::Timestamp>,
    container: Container,
}

/// The content hint carried by a Literal Data packet's format octet.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataFormat {
    /// Binary data.
    Binary,
    /// Text data, with the line-ending convention of the sender.
    Text,
    /// Text data, known or assumed to be UTF-8.
    UTF8,
    /// An unassigned format octet.
    Unknown(u8),
}

impl From<u8> for DataFormat {
    fn from(v: u8) -> Self {
        match v {
            b'b' => DataFormat::Binary,
            b't' => DataFormat::Text,
            b'u' => DataFormat::UTF8,
            v => DataFormat::Unknown(v),
        }
    }
}

impl From<DataFormat> for u8 {
    fn from(v: DataFormat) -> Self {
        match v {
            DataFormat::Binary => b'b',
            DataFormat::Text => b't',
            DataFormat::UTF8 => b'u',
            DataFormat::Unknown(v) => v,
        }
    }
}

impl Literal {
    /// Creates a new, empty Literal Data packet.
    pub fn new(format: DataFormat) -> Self {
        Literal {
            common: Default::default(),
            format,
            filename: None,
            date: None,
            container: Default::default(),
        }
    }

    /// Returns the content hint.
    pub fn format(&self) -> DataFormat { self.format }
    /// Sets the content hint.
    pub fn set_format(&mut self, format: DataFormat) { self.format = format; }
    /// Returns the filename hint, if any.
    pub fn filename(&self) -> Option<&[u8]> { self.filename.as_deref() }
    /// Sets the filename hint.
    ///
    /// Returns an error if `filename` is longer than 255 bytes, the
    /// maximum representable in the wire format.
    pub fn set_filename(&mut self, filename: Vec<u8>) -> crate::Result<()> {
        if filename.len() > 255 {
            return Err(crate::Error::InvalidArgument(
                "filename longer than 255 bytes".into()).into());
        }
        self.filename = Some(filename);
        Ok(())
    }
    /// Returns the timestamp hint, if any.
    pub fn date(&self) -> Option<crate::types::Timestamp> { self.date }
    /// Sets the timestamp hint.
    pub fn set_date(&mut self, date: Option<crate::types::Timestamp>) { self.date = date; }

    pub(crate) fn container_ref(&self) -> &Container { &self.container }
    pub(crate) fn container_mut(&mut self) -> &mut Container { &mut self.container }

    /// Returns the literal data.
    pub fn body(&self) -> &[u8] { self.container.body() }
    /// Sets the literal data.
    pub fn set_body(&mut self, data: Vec<u8>) -> Vec<u8> { self.container.set_body(data) }
}

impl From<Literal> for Packet {
    fn from(p: Literal) -> Self { Packet::Literal(p) }
}

impl Marshal for Literal {
    fn serialize(&self, sink: &mut dyn std::io::Write) -> Result<()> {
        let filename = self.filename.as_deref().unwrap_or(&[]);
        sink.write_all(&[u8::from(self.format), filename.len() as u8])?;
        sink.write_all(filename)?;
        let date: u32 = self.date.map(u32::from).unwrap_or(0);
        sink.write_all(&date.to_be_bytes())?;
        sink.write_all(self.container.body())?;
        Ok(())
    }
}

/// Holds a Compressed Data packet.
///
/// A compressed data packet is a container: its body, once
/// decompressed, is itself an OpenPGP message. See [Section 5.6 of
/// RFC 4880] for details.
///
///   [Section 5.6 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.6
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CompressedData {
    pub(crate) common: Common,
    algo: crate::types::CompressionAlgorithm,
    container: Container,
}

impl CompressedData {
    /// Creates a new, empty Compressed Data packet.
    pub fn new(algo: crate::types::CompressionAlgorithm) -> Self {
        CompressedData { common: Default::default(), algo, container: Default::default() }
    }

    /// Returns the compression algorithm.
    pub fn algo(&self) -> crate::types::CompressionAlgorithm { self.algo }

    container::impl_container_forwards!(CompressedData);
}

impl From<CompressedData> for Packet {
    fn from(p: CompressedData) -> Self { Packet::CompressedData(p) }
}

impl Marshal for CompressedData {
    fn serialize(&self, sink: &mut dyn std::io::Write) -> Result<()> {
        if self.container.children_ref().is_empty() {
            // No parsed children: the body, if any, is the packet's
            // original content (algorithm octet included), kept opaque.
            sink.write_all(self.container.body())?;
            return Ok(());
        }

        let mut plaintext = Vec::new();
        for child in self.container.children_ref() {
            child.serialize(&mut plaintext)?;
        }

        sink.write_all(&[u8::from(self.algo)])?;
        use crate::types::CompressionAlgorithm::*;
        match self.algo {
            Uncompressed => { sink.write_all(&plaintext)?; }
            Zip => {
                #[cfg(feature = "compression-deflate")]
                {
                    use std::io::Write as _;
                    let mut e = flate2::write::DeflateEncoder::new(
                        Vec::new(), flate2::Compression::default());
                    e.write_all(&plaintext)?;
                    sink.write_all(&e.finish()?)?;
                }
                #[cfg(not(feature = "compression-deflate"))]
                return Err(Error::UnsupportedAlgorithm(format!("compression algorithm {:?}", self.algo)).into());
            }
            Zlib => {
                #[cfg(feature = "compression-deflate")]
                {
                    use std::io::Write as _;
                    let mut e = flate2::write::ZlibEncoder::new(
                        Vec::new(), flate2::Compression::default());
                    e.write_all(&plaintext)?;
                    sink.write_all(&e.finish()?)?;
                }
                #[cfg(not(feature = "compression-deflate"))]
                return Err(Error::UnsupportedAlgorithm(format!("compression algorithm {:?}", self.algo)).into());
            }
            BZip2 => {
                #[cfg(feature = "compression-bzip2")]
                {
                    use std::io::Write as _;
                    let mut e = bzip2::write::BzEncoder::new(
                        Vec::new(), bzip2::Compression::default());
                    e.write_all(&plaintext)?;
                    sink.write_all(&e.finish()?)?;
                }
                #[cfg(not(feature = "compression-bzip2"))]
                return Err(Error::UnsupportedAlgorithm(format!("compression algorithm {:?}", self.algo)).into());
            }
            _ => return Err(Error::UnsupportedAlgorithm(format!("compression algorithm {:?}", self.algo)).into()),
        }
        Ok(())
    }
}

/// Holds a packet whose tag this crate recognizes but whose content
/// could not be parsed into the corresponding packet type, or whose
/// tag is entirely unassigned.
///
/// See [`Packet`]'s documentation for when this variant is produced.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Unknown {
    pub(crate) common: Common,
    tag: Tag,
    reason: String,
    container: Container,
}

impl Unknown {
    /// Creates a new Unknown packet wrapping an unparsed body.
    pub fn new(tag: Tag, reason: String) -> Self {
        Unknown { common: Default::default(), tag, reason, container: Default::default() }
    }

    /// Returns the packet's tag.
    pub fn tag(&self) -> Tag { self.tag }

    /// Returns why this packet was not parsed into its proper type.
    pub fn reason(&self) -> &str { &self.reason }

    pub(crate) fn container_ref(&self) -> &Container { &self.container }
    pub(crate) fn container_mut(&mut self) -> &mut Container { &mut self.container }

    /// Returns the packet's raw body.
    pub fn body(&self) -> &[u8] { self.container.body() }
    /// Sets the packet's raw body.
    pub fn set_body(&mut self, data: Vec<u8>) -> Vec<u8> { self.container.set_body(data) }
}

impl From<Unknown> for Packet {
    fn from(p: Unknown) -> Self { Packet::Unknown(p) }
}

impl Marshal for Unknown {
    fn serialize(&self, sink: &mut dyn std::io::Write) -> Result<()> {
        sink.write_all(self.container.body())?;
        Ok(())
    }
}

/// Holds a Modification Detection Code packet.
///
/// MDC packets are only ever found inside a [`SEIP1`] container, as
/// its final child, and are not meaningful on their own. See [Section
/// 5.14 of RFC 4880].
///
///   [Section 5.14 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.14
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MDC {
    pub(crate) common: Common,
    digest: [u8; 20],
}

impl MDC {
    /// Creates a new MDC packet from a precomputed SHA-1 digest.
    pub fn new(digest: [u8; 20]) -> Self {
        MDC { common: Default::default(), digest }
    }

    /// Returns the expected SHA-1 digest.
    pub fn digest(&self) -> &[u8; 20] { &self.digest }
}

impl From<MDC> for Packet {
    fn from(p: MDC) -> Self { Packet::MDC(p) }
}

impl Marshal for MDC {
    fn serialize(&self, sink: &mut dyn std::io::Write) -> Result<()> {
        sink.write_all(&self.digest)?;
        Ok(())
    }
}

/// Holds a Public-Key Encrypted Session Key packet.
///
/// See [Section 5.1 of RFC 4880] for details.
///
///   [Section 5.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.1
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PKESK {
    pub(crate) common: Common,
    recipient: crate::KeyID,
    pk_algo: crate::types::PublicKeyAlgorithm,
    esk: crate::crypto::mpi::Ciphertext,
}

impl PKESK {
    /// Creates a new PKESK packet.
    pub fn new(recipient: crate::KeyID, pk_algo: crate::types::PublicKeyAlgorithm,
               esk: crate::crypto::mpi::Ciphertext) -> Self {
        PKESK { common: Default::default(), recipient, pk_algo, esk }
    }

    /// Returns the intended recipient's Key ID.
    ///
    /// This may be the wildcard Key ID, if the sender chose not to
    /// disclose the recipient.
    pub fn recipient(&self) -> &crate::KeyID { &self.recipient }
    /// Returns the public key algorithm used to encrypt the session key.
    pub fn pk_algo(&self) -> crate::types::PublicKeyAlgorithm { self.pk_algo }
    /// Returns the encrypted session key.
    pub fn esk(&self) -> &crate::crypto::mpi::Ciphertext { &self.esk }
}

impl From<PKESK> for Packet {
    fn from(p: PKESK) -> Self { Packet::PKESK(p) }
}

impl Marshal for PKESK {
    fn serialize(&self, sink: &mut dyn std::io::Write) -> Result<()> {
        sink.write_all(&[3])?;
        sink.write_all(self.recipient.as_bytes())?;
        sink.write_all(&[u8::from(self.pk_algo)])?;
        self.esk.serialize(sink)
    }
}

/// Holds a Symmetric-Key Encrypted Session Key packet.
///
/// See [Section 5.3 of RFC 4880] for details.
///
///   [Section 5.3 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.3
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SKESK {
    pub(crate) common: Common,
    sym_algo: crate::types::SymmetricAlgorithm,
    s2k: crate::crypto::s2k::S2K,
    esk: Option<Vec<u8>>,
    aead: Option<(crate::types::AEADAlgorithm, Vec<u8>, Vec<u8>)>,
}

impl SKESK {
    /// Creates a new, version 4, CFB-protected SKESK packet.
    pub fn new(sym_algo: crate::types::SymmetricAlgorithm,
               s2k: crate::crypto::s2k::S2K, esk: Option<Vec<u8>>) -> Self {
        SKESK { common: Default::default(), sym_algo, s2k, esk, aead: None }
    }

    /// Creates a new, version 5, AEAD-protected SKESK packet.
    pub fn with_aead(sym_algo: crate::types::SymmetricAlgorithm,
                      s2k: crate::crypto::s2k::S2K,
                      aead_algo: crate::types::AEADAlgorithm,
                      iv: Vec<u8>, esk: Vec<u8>) -> Self {
        SKESK {
            common: Default::default(),
            sym_algo,
            s2k,
            esk: None,
            aead: Some((aead_algo, iv, esk)),
        }
    }

    /// Returns the symmetric algorithm protecting the session key.
    pub fn sym_algo(&self) -> crate::types::SymmetricAlgorithm { self.sym_algo }
    /// Returns the string-to-key specifier.
    pub fn s2k(&self) -> &crate::crypto::s2k::S2K { &self.s2k }
    /// Returns the CFB-encrypted session key, if this is a version 4 packet.
    pub fn esk(&self) -> Option<&[u8]> { self.esk.as_deref() }
    /// Returns the AEAD algorithm, nonce, and encrypted session key,
    /// if this is a version 5 packet.
    pub fn aead(&self) -> Option<(crate::types::AEADAlgorithm, &[u8], &[u8])> {
        self.aead.as_ref().map(|(a, iv, esk)| (*a, iv.as_slice(), esk.as_slice()))
    }

    /// Returns whether this is an AEAD-protected (version 5) packet.
    pub fn is_aead(&self) -> bool { self.aead.is_some() }

    /// Wraps `session_key` for `password`, producing a version 4,
    /// CFB-protected SKESK packet.
    pub fn encrypt_password(cipher_algo: crate::types::SymmetricAlgorithm,
                             s2k: crate::crypto::s2k::S2K,
                             session_key: &crate::crypto::Protected,
                             password: &[u8]) -> Result<Self> {
        let kek = s2k.derive_key(password, cipher_algo.key_size()?)?;
        let mut plaintext = Vec::with_capacity(1 + session_key.len());
        plaintext.push(u8::from(cipher_algo));
        plaintext.extend_from_slice(session_key.as_ref());

        let mut cfb = crate::crypto::symmetric::Context::new(cipher_algo, kek.as_ref())?;
        let mut iv = vec![0u8; cipher_algo.block_size()?];
        let mut ciphertext = vec![0u8; plaintext.len()];
        cfb.encrypt(&mut iv, &plaintext, &mut ciphertext)?;

        Ok(SKESK::new(cipher_algo, s2k, Some(ciphertext)))
    }

    /// Recovers the session key protecting the enclosing SEIP/AED
    /// stream, given `password`.
    ///
    /// If the packet carries no ESK, the S2K-derived key is itself the
    /// session key, with [`SKESK::sym_algo`] naming its cipher.
    /// Otherwise the session key is recovered by CFB-decrypting the
    /// ESK with a zero IV, per Section 5.3 of RFC 4880.
    pub fn decrypt(&self, password: &[u8])
        -> Result<(crate::types::SymmetricAlgorithm, crate::crypto::Protected)>
    {
        if self.aead.is_some() {
            return Err(crate::Error::InvalidOperation(
                "AEAD-protected SKESK decryption is not supported".into()).into());
        }

        let kek = self.s2k.derive_key(password, self.sym_algo.key_size()?)?;
        match &self.esk {
            None => Ok((self.sym_algo, kek)),
            Some(esk) => {
                let mut cfb = crate::crypto::symmetric::Context::new(self.sym_algo, kek.as_ref())?;
                let mut iv = vec![0u8; self.sym_algo.block_size()?];
                let mut plaintext = vec![0u8; esk.len()];
                cfb.decrypt(&mut iv, esk, &mut plaintext)?;

                if plaintext.is_empty() {
                    return Err(crate::Error::Malformed(
                        "empty SKESK encrypted session key".into()).into());
                }
                let algo = crate::types::SymmetricAlgorithm::from(plaintext[0]);
                Ok((algo, plaintext[1..].to_vec().into()))
            }
        }
    }
}

impl From<SKESK> for Packet {
    fn from(p: SKESK) -> Self { Packet::SKESK(p) }
}

impl Marshal for SKESK {
    fn serialize(&self, sink: &mut dyn std::io::Write) -> Result<()> {
        match &self.aead {
            None => {
                sink.write_all(&[4, u8::from(self.sym_algo)])?;
                self.s2k.serialize(sink)?;
                if let Some(esk) = &self.esk {
                    sink.write_all(esk)?;
                }
            }
            Some((aead_algo, iv, esk)) => {
                sink.write_all(&[5, u8::from(self.sym_algo), u8::from(*aead_algo)])?;
                self.s2k.serialize(sink)?;
                sink.write_all(iv)?;
                sink.write_all(esk)?;
            }
        }
        Ok(())
    }
}
