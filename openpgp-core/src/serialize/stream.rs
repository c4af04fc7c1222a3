//! Streaming packet composition.
//!
//! Where [`Marshal`](super::Marshal) serializes an already-built
//! [`Packet`](crate::Packet) tree, this module builds one up
//! incrementally by stacking [`writer`](super::writer) layers on top
//! of a sink: compression wraps encryption wraps the literal data
//! writer, and each layer writes its own packet framing as data
//! arrives rather than buffering the whole message first.
//!
//! A typical signed, compressed message is assembled by nesting these
//! layers outside-in and writing to the innermost one:
//!
//! ```
//! use openpgp_core::serialize::stream::{Message, LiteralWriter};
//! use std::io::Write;
//!
//! # fn main() -> openpgp_core::Result<()> {
//! let mut sink = Vec::new();
//! let message = Message::new(&mut sink);
//! let mut message = LiteralWriter::new(message).build()?;
//! message.write_all(b"love")?;
//! message.finalize()?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::io::{self, Write};
use std::time::SystemTime;

use crate::{Error, Result};
use crate::crypto;
use crate::crypto::s2k::S2K;
use crate::packet::{DataFormat, Literal, OnePassSig, SKESK};
use crate::packet::signature::SignatureBuilder;
use crate::serialize::{writer, Marshal};
use crate::serialize::writer::{Stack, Stackable};
use crate::types::{
    CompressionAlgorithm, HashAlgorithm, SignatureType, SymmetricAlgorithm, Tag,
};

/// Default partial-body chunk size (as a power of two) used by the
/// writers in this module: `1 << 13` = 8 KiB.
pub(crate) const DEFAULT_PARTIAL_BODY_CHUNK: u8 = 13;

/// Private state threaded through a [`Message`]'s writer stack.
///
/// `level` tracks nesting depth (top-level packets are level 0,
/// packets inside a compressed or encrypted container are level 1,
/// and so on); it exists so that a writer can derive its children's
/// level without each layer needing to be told explicitly.
#[derive(Debug)]
pub(crate) struct Cookie {
    level: usize,
}

impl Cookie {
    pub(crate) fn new(level: usize) -> Self {
        Cookie { level }
    }

    pub(crate) fn level(&self) -> usize {
        self.level
    }
}

/// An OpenPGP message under construction.
///
/// The type parameter on the underlying stack is erased; `Message`
/// is just the handle passed between the builders in this module
/// ([`Compressor`], [`Encryptor`], [`Signer`], [`LiteralWriter`],
/// [`ArbitraryWriter`]) and finally [`Message::finalize`].
pub struct Message<'a>(Stack<'a, Cookie>);

impl<'a> fmt::Debug for Message<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Message").field(&self.0).finish()
    }
}

impl<'a> Message<'a> {
    /// Starts a new message, writing to `sink`.
    pub fn new<W: Write + 'a>(sink: W) -> Message<'a> {
        Message(writer::Generic::new(sink, Cookie::new(0)))
    }

    pub(crate) fn into_stack(self) -> Stack<'a, Cookie> {
        self.0
    }

    /// Wraps a raw writer stack back up as a `Message`.
    ///
    /// Used by [`super::padding::Padder`], the only writer outside
    /// this module that needs to build directly on [`writer::Stack`].
    pub(crate) fn from_stack(stack: Stack<'a, Cookie>) -> Message<'a> {
        Message(stack)
    }

    /// Finalizes every writer in the stack, from the top down to the
    /// sink passed to [`Message::new`].
    ///
    /// This must be called once the message is complete: it is what
    /// flushes partial-body length framing, compressor trailers, MDC
    /// digests, and trailing signature packets.
    pub fn finalize(self) -> Result<()> {
        let mut stack = Some(self.0);
        while let Some(w) = stack {
            stack = w.into_inner()?;
        }
        Ok(())
    }
}

impl<'a> Write for Message<'a> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

/// Writes an arbitrary packet, framing its body with a partial-body
/// length.
///
/// Mostly useful for tests and for emitting packet types this module
/// has no dedicated builder for.
pub struct ArbitraryWriter;

impl ArbitraryWriter {
    /// Starts an arbitrary packet with the given tag on top of
    /// `inner`.
    pub fn new(inner: Message<'_>, tag: Tag) -> Result<Message<'_>> {
        let mut inner = inner.into_stack();
        let level = inner.cookie_ref().level + 1;
        super::write_ptag(&mut inner, tag)?;
        let inner = writer::PartialBodyFilter::new(
            inner, Cookie::new(level), DEFAULT_PARTIAL_BODY_CHUNK);
        Ok(Message(inner))
    }
}

/// Writes a literal data packet.
///
/// Built with the [`Literal`] metadata fluent-style, then
/// [`LiteralWriter::build`] starts the packet body; subsequent writes
/// to the returned [`Message`] are the literal content.
///
/// If a [`Signer`] sits directly above this writer on the stack,
/// `build` detaches it first and reattaches it below the packet
/// framing, so that the one-pass-signature's hash covers only the
/// literal content, not this packet's own header ([Section 5.2.4 of
/// RFC 4880]'s "document" signature semantics).
///
///   [Section 5.2.4 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.4
pub struct LiteralWriter<'a> {
    template: Literal,
    inner: Stack<'a, Cookie>,
}

impl<'a> LiteralWriter<'a> {
    /// Starts a new literal data packet on top of `inner`.
    pub fn new(inner: Message<'a>) -> Self {
        LiteralWriter {
            template: Literal::new(DataFormat::Binary),
            inner: inner.into_stack(),
        }
    }

    /// Sets the content hint.
    pub fn format(mut self, format: DataFormat) -> Self {
        self.template.set_format(format);
        self
    }

    /// Sets the filename hint.
    pub fn filename<F: AsRef<[u8]>>(mut self, filename: F) -> Result<Self> {
        self.template.set_filename(filename.as_ref().to_vec())?;
        Ok(self)
    }

    /// Sets the timestamp hint.
    pub fn date(mut self, date: SystemTime) -> Result<Self> {
        self.template.set_date(Some(date.try_into()?));
        Ok(self)
    }

    /// Writes the packet header and returns a `Message` ready for the
    /// literal content.
    pub fn build(self) -> Result<Message<'a>> {
        let mut inner = self.inner;
        let signer = inner.pop()?;
        let level = inner.cookie_ref().level + 1;

        let mut header = Vec::new();
        header.push(u8::from(self.template.format()));
        let filename = self.template.filename().unwrap_or(&[]);
        header.push(filename.len() as u8);
        header.extend_from_slice(filename);
        let date: u32 = self.template.date().map(u32::from).unwrap_or(0);
        header.extend_from_slice(&date.to_be_bytes());

        super::write_ptag(&mut inner, Tag::Literal)?;
        let mut inner: Stack<'a, Cookie> = writer::PartialBodyFilter::new(
            inner, Cookie::new(level), DEFAULT_PARTIAL_BODY_CHUNK);
        inner.write_all(&header)?;

        Ok(match signer {
            Some(mut signer) => {
                signer.mount(inner);
                Message(signer)
            }
            None => Message(inner),
        })
    }
}

/// Compresses the packets written to it into a single Compressed
/// Data packet.
pub struct Compressor;

impl Compressor {
    /// Starts a compressed data packet on top of `inner`, using
    /// `level` for algorithms where that is meaningful.
    pub fn new(inner: Message<'_>, algo: CompressionAlgorithm,
               level: writer::CompressionLevel)
        -> Result<Message<'_>>
    {
        let mut inner = inner.into_stack();
        let child_level = inner.cookie_ref().level + 1;

        super::write_ptag(&mut inner, Tag::CompressedData)?;
        let mut framed = writer::PartialBodyFilter::new(
            inner, Cookie::new(child_level), DEFAULT_PARTIAL_BODY_CHUNK);
        framed.write_all(&[u8::from(algo)])?;

        let inner = writer::Compressor::new(algo, level, Cookie::new(child_level), framed)?;
        Ok(Message(inner))
    }
}

/// Signs the packets written to it, emitting a leading one-pass
/// signature packet per signer and a trailing signature packet once
/// the message is finalized.
///
/// See [`LiteralWriter`] for how the hashed content is scoped to
/// exclude packet framing when a `Signer` directly wraps a literal
/// data packet.
pub struct Signer<'a> {
    inner: Option<Stack<'a, Cookie>>,
    signers: Vec<Box<dyn crypto::Signer + Send + Sync + 'a>>,
    hashes: Vec<crypto::hash::Context>,
    sig_type: SignatureType,
    hash_algo: HashAlgorithm,
}

impl<'a> Signer<'a> {
    /// Starts a binary-document signature over SHA-512 by `signer`.
    pub fn new(inner: Message<'a>, signer: impl crypto::Signer + Send + Sync + 'a) -> Self {
        Signer::with_template(inner, signer, SignatureType::Binary, HashAlgorithm::SHA512)
    }

    /// Starts a signature of the given type and hash algorithm.
    pub fn with_template(inner: Message<'a>, signer: impl crypto::Signer + Send + Sync + 'a,
                          sig_type: SignatureType, hash_algo: HashAlgorithm) -> Self {
        Signer {
            inner: Some(inner.into_stack()),
            signers: vec![Box::new(signer)],
            hashes: Vec::new(),
            sig_type,
            hash_algo,
        }
    }

    /// Adds an additional signer; the resulting message carries one
    /// one-pass signature and one trailing signature packet per
    /// signer.
    pub fn add_signer(mut self, signer: impl crypto::Signer + Send + Sync + 'a) -> Self {
        self.signers.push(Box::new(signer));
        self
    }

    /// Writes the one-pass signature packets and returns a `Message`
    /// ready for the signed content.
    pub fn build(mut self) -> Result<Message<'a>> {
        let n = self.signers.len();
        {
            let inner = self.inner.as_mut().expect("just constructed");
            for (i, signer) in self.signers.iter().enumerate() {
                let ops = OnePassSig::new(self.sig_type, self.hash_algo,
                                          signer.public().pk_algo(),
                                          signer.public().keyid(),
                                          i + 1 == n);
                let packet: crate::Packet = ops.into();
                packet.serialize(inner)?;
            }
        }
        self.hashes = self.signers.iter()
            .map(|_| self.hash_algo.context())
            .collect::<Result<Vec<_>>>()?;
        Ok(Message(Box::new(self)))
    }
}

impl<'a> fmt::Debug for Signer<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Signer")
            .field("signers", &self.signers.len())
            .field("sig_type", &self.sig_type)
            .field("hash_algo", &self.hash_algo)
            .finish()
    }
}

impl<'a> Write for Signer<'a> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for hash in self.hashes.iter_mut() {
            hash.update(buf);
        }
        match self.inner.as_mut() {
            Some(inner) => inner.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.as_mut() {
            Some(inner) => inner.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> Stackable<'a, Cookie> for Signer<'a> {
    fn into_inner(mut self: Box<Self>) -> Result<Option<Stack<'a, Cookie>>> {
        let mut inner = self.inner.take()
            .expect("signer is never finalized while detached");
        // Take the hashes by value rather than cloning them: a
        // `crypto::hash::Context` clones as a fresh, empty context of
        // the same algorithm (the boxed digest state underneath isn't
        // `Clone`), so cloning here would sign over nothing rather
        // than the body just streamed through `Write::write`.
        let hashes = std::mem::take(&mut self.hashes);
        for (signer, hash) in self.signers.iter_mut().zip(hashes.into_iter()) {
            let sig = SignatureBuilder::new(self.sig_type)
                .sign_hash(signer.as_mut(), hash)?;
            let packet: crate::Packet = sig.into();
            packet.serialize(&mut inner)?;
        }
        Ok(Some(inner))
    }

    fn pop(&mut self) -> Result<Option<Stack<'a, Cookie>>> {
        Ok(self.inner.take())
    }

    fn mount(&mut self, new: Stack<'a, Cookie>) {
        self.inner = Some(new);
    }

    fn inner_ref(&self) -> Option<&(dyn Stackable<'a, Cookie> + 'a)> {
        self.inner.as_deref()
    }

    fn inner_mut(&mut self) -> Option<&mut (dyn Stackable<'a, Cookie> + 'a)> {
        self.inner.as_deref_mut()
    }

    fn cookie_ref(&self) -> &Cookie {
        self.inner.as_ref().expect("signer has no cookie while detached").cookie_ref()
    }

    fn cookie_mut(&mut self) -> &mut Cookie {
        self.inner.as_mut().expect("signer has no cookie while detached").cookie_mut()
    }

    fn position(&self) -> u64 {
        self.inner.as_ref().map(|i| i.position()).unwrap_or(0)
    }
}

/// How a message will be used, which determines which of a
/// recipient's subkeys are eligible encryption targets.
///
/// This crate's `Encryptor` only supports password (SKESK)
/// recipients, so the distinction currently has no effect here; it is
/// kept so that code selecting recipient subkeys by key flags has
/// somewhere to record the intent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncryptionMode {
    /// The message is encrypted to be stored, e.g. in a local archive.
    AtRest,
    /// The message is encrypted to be sent to another party.
    ForTransport,
}

/// Number of bytes the S2K iteration count aims to hash; tuned so key
/// derivation takes a noticeable fraction of a second on commodity
/// hardware without being unusably slow.
const DEFAULT_S2K_BYTES: usize = 1 << 16;

/// Encrypts the packets written to it, producing a Symmetrically
/// Encrypted Integrity Protected Data packet preceded by one
/// Symmetric-Key Encrypted Session Key packet per password.
///
/// Public-key recipients are not supported: the crate has no public
/// key session-key-wrapping routine to build on (only
/// [`crate::crypto::ecdh`]'s ECDH-specific encryption exists, which is
/// not a general encrypt-to-any-recipient primitive), so `Encryptor`
/// covers passwords only.
pub struct Encryptor<'a> {
    inner: Message<'a>,
    passwords: Vec<Vec<u8>>,
    sym_algo: SymmetricAlgorithm,
    mode: EncryptionMode,
}

impl<'a> Encryptor<'a> {
    /// Starts building an encryption container on top of `inner`.
    ///
    /// At least one password must be added with
    /// [`Encryptor::add_password`] before calling
    /// [`Encryptor::build`].
    pub fn new(inner: Message<'a>, mode: EncryptionMode) -> Self {
        Encryptor {
            inner,
            passwords: Vec::new(),
            sym_algo: SymmetricAlgorithm::AES256,
            mode,
        }
    }

    /// Adds a password recipient.
    pub fn add_password(mut self, password: impl AsRef<[u8]>) -> Self {
        self.passwords.push(password.as_ref().to_vec());
        self
    }

    /// Overrides the session's symmetric algorithm (default AES-256).
    pub fn sym_algo(mut self, algo: SymmetricAlgorithm) -> Self {
        self.sym_algo = algo;
        self
    }

    /// Writes the ESK packets and the SEIP packet header, returning a
    /// `Message` ready for the plaintext content.
    pub fn build(self) -> Result<Message<'a>> {
        if self.passwords.is_empty() {
            return Err(Error::InvalidOperation(
                "Encryptor needs at least one recipient".into()).into());
        }
        // `mode` has no effect while only password recipients are
        // supported; retained on the builder for API stability once
        // public-key recipients are added.
        let _ = self.mode;

        let mut inner = self.inner.into_stack();
        let level = inner.cookie_ref().level;

        let key_size = self.sym_algo.key_size()?;
        let mut session_key = vec![0u8; key_size];
        crypto::random(&mut session_key);
        let session_key: crypto::Protected = session_key.into();

        for password in &self.passwords {
            let mut salt = [0u8; 8];
            crypto::random(&mut salt);
            let count = S2K::decode_count(S2K::encode_count(DEFAULT_S2K_BYTES));
            let s2k = S2K::IteratedSalted { hash: HashAlgorithm::SHA256, salt, count };
            let skesk = SKESK::encrypt_password(self.sym_algo, s2k, &session_key, password)?;
            let packet: crate::Packet = skesk.into();
            packet.serialize(&mut inner)?;
        }

        super::write_ptag(&mut inner, Tag::SEIP)?;
        let mut framed = writer::PartialBodyFilter::new(
            inner, Cookie::new(level + 1), DEFAULT_PARTIAL_BODY_CHUNK);
        framed.write_all(&[1])?; // SEIP version 1

        let inner = writer::Encryptor::new(
            self.sym_algo, session_key.as_ref(), Cookie::new(level + 1), framed)?;
        Ok(Message(inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::key::{Key4, SecretParts, UnspecifiedRole};
    use crate::parse::Parse;
    use crate::types::Curve;
    use crate::PacketPile;

    fn parse(bytes: &[u8]) -> PacketPile {
        PacketPile::from_bytes(bytes).expect("parses")
    }

    #[test]
    fn arbitrary() {
        let mut buf = Vec::new();
        {
            let m = Message::new(&mut buf);
            let mut m = ArbitraryWriter::new(m, Tag::Literal).unwrap();
            m.write_all(b"hello").unwrap();
            m.finalize().unwrap();
        }
        let pile = parse(&buf);
        assert_eq!(pile.len(), 1);
    }

    #[test]
    fn literal_roundtrips() {
        let mut buf = Vec::new();
        {
            let m = Message::new(&mut buf);
            let mut m = LiteralWriter::new(m).format(DataFormat::Text).build().unwrap();
            m.write_all(b"six by nine, forty two").unwrap();
            m.finalize().unwrap();
        }
        let pile = parse(&buf);
        assert_eq!(pile.len(), 1);
        match pile.children().next().unwrap() {
            crate::Packet::Literal(l) => {
                assert_eq!(l.format(), DataFormat::Text);
                assert_eq!(l.body(), b"six by nine, forty two");
            }
            p => panic!("unexpected packet: {:?}", p),
        }
    }

    #[test]
    fn nested_compression() {
        let mut buf = Vec::new();
        {
            let m = Message::new(&mut buf);
            let m = Compressor::new(m, CompressionAlgorithm::Zip,
                                     writer::CompressionLevel::default()).unwrap();
            let mut m = LiteralWriter::new(m).build().unwrap();
            m.write_all(&vec![0x2a; 4096]).unwrap();
            m.finalize().unwrap();
        }
        let pile = parse(&buf);
        assert_eq!(pile.len(), 1);
        match pile.children().next().unwrap() {
            crate::Packet::CompressedData(c) => {
                assert_eq!(c.children_ref().len(), 1);
                match &c.children_ref()[0] {
                    crate::Packet::Literal(l) =>
                        assert_eq!(l.body(), vec![0x2a; 4096].as_slice()),
                    p => panic!("unexpected packet: {:?}", p),
                }
            }
            p => panic!("unexpected packet: {:?}", p),
        }
    }

    #[test]
    fn big_message_compresses_down() {
        let mut buf = Vec::new();
        {
            let m = Message::new(&mut buf);
            let m = Compressor::new(m, CompressionAlgorithm::BZip2,
                                     writer::CompressionLevel::best()).unwrap();
            let mut m = LiteralWriter::new(m).build().unwrap();
            m.write_all(&vec![0u8; 1 << 20]).unwrap();
            m.finalize().unwrap();
        }
        assert!(buf.len() < (1 << 16));
    }

    #[test]
    fn signed_literal_hash_excludes_framing() {
        let key4 = Key4::<SecretParts, UnspecifiedRole>::generate_ecc(true, Curve::Ed25519)
            .unwrap();
        let key: crate::packet::key::Key<SecretParts, UnspecifiedRole> = key4.into();
        let key = key.into_keypair().unwrap();

        let mut buf = Vec::new();
        {
            let m = Message::new(&mut buf);
            let m = Signer::new(m, key).build().unwrap();
            let mut m = LiteralWriter::new(m).build().unwrap();
            m.write_all(b"attack at dawn").unwrap();
            m.finalize().unwrap();
        }

        let pile = parse(&buf);
        assert_eq!(pile.len(), 3);
        let mut children = pile.children();
        assert!(matches!(children.next().unwrap(), crate::Packet::OnePassSig(_)));
        assert!(matches!(children.next().unwrap(), crate::Packet::Literal(_)));
        assert!(matches!(children.next().unwrap(), crate::Packet::Signature(_)));
    }

    /// The SEIP reader only exposes the still-encrypted container
    /// body (see `parse::parse_seip`); this crate does not yet offer
    /// a streaming decryption reader, so the round trip is verified
    /// by driving the same CFB construction `writer::Encryptor` uses,
    /// in reverse, directly against the parsed ciphertext.
    #[test]
    fn password_encryption_roundtrips() {
        let password = b"s3kr1t";
        let plaintext = b"the eagle lands at midnight";

        let mut buf = Vec::new();
        {
            let m = Message::new(&mut buf);
            let m = Encryptor::new(m, EncryptionMode::ForTransport)
                .add_password(&password[..])
                .build()
                .unwrap();
            let mut m = LiteralWriter::new(m).build().unwrap();
            m.write_all(plaintext).unwrap();
            m.finalize().unwrap();
        }

        let pile = parse(&buf);
        assert_eq!(pile.len(), 2);
        let mut children = pile.children();
        let skesk = match children.next().unwrap() {
            crate::Packet::SKESK(s) => s,
            p => panic!("unexpected packet: {:?}", p),
        };
        let ciphertext = match children.next().unwrap() {
            crate::Packet::SEIP(crate::packet::SEIP::V1(s)) => s.body(),
            p => panic!("unexpected packet: {:?}", p),
        };

        let (algo, session_key) = skesk.decrypt(password).unwrap();
        let block_size = algo.block_size().unwrap();

        let mut cipher = crate::crypto::symmetric::Context::new(algo, session_key.as_ref())
            .unwrap();
        let mut iv = vec![0u8; block_size];
        let mut prefix = vec![0u8; block_size + 2];
        cipher.decrypt(&mut iv, &ciphertext[..block_size + 2], &mut prefix).unwrap();
        assert_eq!(prefix[block_size - 2], prefix[block_size]);
        assert_eq!(prefix[block_size - 1], prefix[block_size + 1]);

        let rest = &ciphertext[block_size + 2..];
        let mut decrypted = vec![0u8; rest.len()];
        cipher.decrypt(&mut iv, rest, &mut decrypted).unwrap();

        assert_eq!(decrypted.len(), rest.len());
        let mdc_start = decrypted.len() - 22;
        assert_eq!(&decrypted[mdc_start..mdc_start + 2], &[0xD3, 0x14]);

        let mut hash = HashAlgorithm::SHA1.context().unwrap();
        hash.update(&prefix);
        hash.update(&decrypted[..mdc_start + 2]);
        let mut digest = [0u8; 20];
        hash.digest(&mut digest[..]);
        assert_eq!(&decrypted[mdc_start + 2..], &digest[..]);

        let inner_pile = parse(&decrypted[..mdc_start]);
        assert_eq!(inner_pile.len(), 1);
        match inner_pile.children().next().unwrap() {
            crate::Packet::Literal(l) => assert_eq!(l.body(), plaintext),
            p => panic!("unexpected packet: {:?}", p),
        }
    }
}
