//! OpenPGP packet-stream parsing and serialization, as defined by
//! [RFC 4880] (with the [RFC 6637] ECC extensions and some [RFC
//! 4880bis] AEAD support).  This crate covers the wire format: packet
//! tags, length encodings, MPIs, S2K, subpackets, armor framing, and
//! the signature hash machinery, plus a streaming packet writer.
//!
//! A non-goal of this crate is any sort of high-level, bolted-on
//! functionality: trust models (web of trust, direct trust, TOFU),
//! key-ring/keystore persistence, and network key lookup are out of
//! scope.  [RFC 4880] does provide some mechanisms for creating trust
//! models (specifically, UserID certifications), and this crate does
//! expose those mechanisms, but policy built on top of them belongs in
//! a higher-level crate.
//!
//! [RFC 4880]: https://tools.ietf.org/html/rfc4880
//! [RFC 6637]: https://tools.ietf.org/html/rfc6637
//!
//! # Experimental Features
//!
//! This crate implements functionality from [RFC 4880bis], notable
//! AEAD encryption containers.  As of this writing, this RFC is still
//! a draft and the syntax or semantic defined in it may change or go
//! away.  Therefore, all related functionality may change and
//! artifacts created using this functionality may not be usable in
//! the future.  Do not use it for things other than experiments.
//!
//! [RFC 4880bis]: https://tools.ietf.org/html/draft-ietf-openpgp-rfc4880bis-08

#![warn(missing_docs)]

extern crate buffered_reader;

extern crate memsec;

#[cfg(feature = "compression-deflate")]
extern crate flate2;
#[cfg(feature = "compression-bzip2")]
extern crate bzip2;

#[cfg(test)]
#[macro_use]
extern crate quickcheck;

extern crate rand;

#[macro_use] extern crate lazy_static;

extern crate idna;

// On debug builds, Vec<u8>::truncate is very, very slow.  For
// instance, running the decrypt_test_stream test takes 51 seconds on
// my (Neal's) computer using Vec<u8>::truncate and <0.1 seconds using
// `unsafe { v.set_len(len); }`.
//
// The issue is that the compiler calls drop on every element that is
// dropped, even though a u8 doesn't have a drop implementation.  The
// compiler optimizes this away at high optimization levels, but those
// levels make debugging harder.
fn vec_truncate(v: &mut Vec<u8>, len: usize) {
    if cfg!(debug_assertions) {
        if len < v.len() {
            unsafe { v.set_len(len); }
        }
    } else {
        v.truncate(len);
    }
}

/// Like `drop(Vec<u8>::drain(..prefix_len))`, but fast in debug
/// builds.
fn vec_drain_prefix(v: &mut Vec<u8>, prefix_len: usize) {
    if cfg!(debug_assertions) {
        // Panic like v.drain(..prefix_len).
        assert!(prefix_len <= v.len(), "prefix len {} > vector len {}",
                prefix_len, v.len());
        let new_len = v.len() - prefix_len;
        unsafe {
            std::ptr::copy(v[prefix_len..].as_ptr(),
                           v[..].as_mut_ptr(),
                           new_len);
        }
        vec_truncate(v, new_len);
    } else {
        v.drain(..prefix_len);
    }
}

// Like assert!, but checks a pattern.
//
//   assert_match!(Some(_) = x);
//
// Note: For modules to see this macro, we need to define it before we
// declare the modules.
#[allow(unused_macros)]
macro_rules! assert_match {
    ( $error: pat = $expr:expr, $fmt:expr, $($pargs:expr),* ) => {{
        let x = $expr;
        if let $error = x {
            /* Pass.  */
        } else {
            let extra = format!($fmt, $($pargs),*);
            panic!("Expected {}, got {:?}{}{}",
                   stringify!($error), x,
                   if $fmt.len() > 0 { ": " } else { "." }, extra);
        }
    }};
    ( $error: pat = $expr: expr, $fmt:expr ) => {
        assert_match!($error = $expr, $fmt, );
    };
    ( $error: pat = $expr: expr ) => {
        assert_match!($error = $expr, "");
    };
}

// Defines a local `t!` macro that eprintln!s when `$enabled` is true,
// indented by `$indent` levels and tagged with `$fn`.
//
//   tracer!(true, "decompose", 0);
//   t!("userid: {}", userid);
#[allow(unused_macros)]
macro_rules! tracer {
    ( $enabled: expr, $fn: expr, $indent: expr ) => {
        #[allow(unused_macros)]
        macro_rules! t {
            ( $fmt: expr ) => {
                if $enabled {
                    eprintln!("{}{}: {}",
                              "  ".repeat($indent), $fn, $fmt);
                }
            };
            ( $fmt: expr, $($arg: tt)* ) => {
                if $enabled {
                    eprintln!(concat!("{}{}: ", $fmt),
                              "  ".repeat($indent), $fn, $($arg)*);
                }
            };
        }
    };
    ( $enabled: expr, $indent: expr ) => {
        tracer!($enabled, "", $indent);
    };
}

// Asserts that a type (optionally generic, with trait bounds) is
// `Send` and `Sync`.  Used to pin down the concurrency guarantees of
// the reader/writer stacks, which are built from trait objects where
// a missing bound is otherwise easy to miss.
//
//   assert_send_and_sync!(Reader<'_>);
//   assert_send_and_sync!(Writer<W> where W: Write);
#[allow(unused_macros)]
macro_rules! assert_send_and_sync {
    ($x:ty where $($g:ident: $bound1:path $(+ $bound2:path)*),*) => {
        const _: () = {
            fn assert_send<T: Send>() {}
            fn assert_sync<T: Sync>() {}
            #[allow(dead_code)]
            fn assert_both<$($g: $bound1 $(+ $bound2)*),*>() {
                assert_send::<$x>();
                assert_sync::<$x>();
            }
        };
    };
    ($x:ty) => {
        const _: () = {
            fn assert_send<T: Send>() {}
            fn assert_sync<T: Sync>() {}
            #[allow(dead_code)]
            fn assert_both() {
                assert_send::<$x>();
                assert_sync::<$x>();
            }
        };
    };
}

#[macro_use]
pub mod armor;
pub mod fmt;
pub mod crypto;

pub mod packet;

pub mod parse;
pub mod serialize;
use crate::serialize::Marshal;

pub mod ops;

mod packet_pile;
use crate::packet::Container;

pub mod types;
use crate::types::{
    PublicKeyAlgorithm,
    SymmetricAlgorithm,
    HashAlgorithm,
    SignatureType,
};

mod conversions;
mod fingerprint;
pub use fingerprint::Fingerprint;
mod keyid;
pub use keyid::KeyID;
mod keyhandle;
pub use keyhandle::KeyHandle;

/// Returns a fixed timestamp, used by tests that need a stable
/// reference point in time.
#[cfg(test)]
fn frozen_time() -> std::time::SystemTime {
    crate::types::Timestamp::from(1554542220 - 1).into()
}

/// Crate result specialization.
///
/// Every fallible API in this crate returns the concrete [`Error`]
/// type below, not a boxed or type-erased error — callers match on
/// `Error`'s kind rather than downcasting.
pub type Result<T> = ::std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
/// Errors returned by this crate.
///
/// The variants correspond to the error kinds a packet-stream
/// parser/serializer can raise: `IO`, `MALFORMED` (header, length,
/// version), `PACKET_CONSUMED`/`PACKET_NOT_CONSUMED` (region boundary
/// mismatch), `UNSUPPORTED_ALG`, `UNSUPPORTED_PACKET`, `BAD_ARMOR`
/// (framing, CRC, base64), `BAD_COMPRESSION`, `BAD_CRYPTO`
/// (decrypt/signature-mismatch), `ALLOC`, and `CALLBACK_ABORT`. Trust
/// models, certificate policy, and key-ring management are out of
/// scope for this crate and have no corresponding error kind.
///
/// Note: This enum cannot be exhaustively matched to allow future
/// extensions.
pub enum Error {
    /// Invalid argument to an API call.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid operation given the object's current state.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// I/O error reading or writing the underlying byte stream.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed packet, header, length, MPI, subpacket, or message
    /// structure.
    #[error("Malformed: {0}")]
    Malformed(String),

    /// A determinate-length region was over- or under-consumed:
    /// parsing read past the packet's declared length, or stopped
    /// short of it.
    #[error("Packet consumed past its declared length")]
    PacketConsumed,

    /// A determinate-length region was left with unconsumed bytes
    /// when the packet's body parser returned.
    #[error("Packet body not fully consumed")]
    PacketNotConsumed,

    /// Unsupported hash, public-key, symmetric, AEAD, compression,
    /// or signature algorithm identifier.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Unsupported packet type.
    #[error("Unsupported packet type: {0}")]
    UnsupportedPacket(String),

    /// Malformed ASCII-armor framing, CRC-24 checksum, or base64 body.
    #[error("Bad armor: {0}")]
    BadArmor(String),

    /// The compressed-data stream didn't end exactly where the
    /// packet's region said it would.
    #[error("Bad compression: {0}")]
    BadCompression(String),

    /// A cryptographic operation failed: decryption, signature
    /// verification, or a manipulated/truncated ciphertext.
    #[error("Bad crypto: {0}")]
    BadCrypto(String),

    /// A packet or buffer exceeds a configured size limit.
    #[error("Allocation refused: {0}")]
    Alloc(String),

    /// A registered callback aborted the parse.
    #[error("Callback aborted the parse")]
    CallbackAbort,

    /// This marks this enum as non-exhaustive.  Do not use this
    /// variant.
    #[doc(hidden)] #[error("__Nonexhaustive")] __Nonexhaustive,
}

/// The OpenPGP packets that this crate understands.
///
/// The different OpenPGP packets are detailed in [Section 5 of RFC 4880].
///
/// The `Unknown` packet allows this crate to deal with packets that it
/// doesn't understand.  The `Unknown` packet is basically a binary
/// blob that includes the packet's tag.
///
/// The unknown packet is also used for packets that are understood,
/// but use unsupported options.  For instance, when the packet parser
/// encounters a compressed data packet with an unknown compression
/// algorithm, it returns the packet in an `Unknown` packet rather
/// than a `CompressedData` packet.
///
///   [Section 5 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5
///
/// Note: This enum cannot be exhaustively matched to allow future
/// extensions.
#[derive(Debug)]
#[derive(PartialEq, Eq, Hash, Clone)]
pub enum Packet {
    /// Unknown packet.
    Unknown(packet::Unknown),
    /// Signature packet.
    Signature(packet::Signature),
    /// One pass signature packet.
    OnePassSig(packet::OnePassSig),
    /// Public key packet.
    PublicKey(packet::key::PublicKey),
    /// Public subkey packet.
    PublicSubkey(packet::key::PublicSubkey),
    /// Public/Secret key pair.
    SecretKey(packet::key::SecretKey),
    /// Public/Secret subkey pair.
    SecretSubkey(packet::key::SecretSubkey),
    /// Marker packet.
    Marker(packet::Marker),
    /// Trust packet.
    Trust(packet::Trust),
    /// User ID packet.
    UserID(packet::UserID),
    /// User attribute packet.
    UserAttribute(packet::UserAttribute),
    /// Literal data packet.
    Literal(packet::Literal),
    /// Compressed literal data packet.
    CompressedData(packet::CompressedData),
    /// Public key encrypted data packet.
    PKESK(packet::PKESK),
    /// Symmetric key encrypted data packet.
    SKESK(packet::SKESK),
    /// Symmetric key encrypted, integrity protected data packet.
    SEIP(packet::SEIP),
    /// Modification detection code packet.
    MDC(packet::MDC),
    /// AEAD Encrypted Data Packet.
    AED(packet::AED),

    /// This marks this enum as non-exhaustive.  Do not use this
    /// variant.
    #[doc(hidden)] __Nonexhaustive,
}

impl Packet {
    /// Returns the `Packet's` corresponding OpenPGP tag.
    ///
    /// Tags are explained in [Section 4.3 of RFC 4880].
    ///
    ///   [Section 4.3 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.3
    pub fn tag(&self) -> packet::Tag {
        use crate::packet::Tag;
        match self {
            &Packet::Unknown(ref packet) => packet.tag(),
            &Packet::Signature(_) => Tag::Signature,
            &Packet::OnePassSig(_) => Tag::OnePassSig,
            &Packet::PublicKey(_) => Tag::PublicKey,
            &Packet::PublicSubkey(_) => Tag::PublicSubkey,
            &Packet::SecretKey(_) => Tag::SecretKey,
            &Packet::SecretSubkey(_) => Tag::SecretSubkey,
            &Packet::Marker(_) => Tag::Marker,
            &Packet::Trust(_) => Tag::Trust,
            &Packet::UserID(_) => Tag::UserID,
            &Packet::UserAttribute(_) => Tag::UserAttribute,
            &Packet::Literal(_) => Tag::Literal,
            &Packet::CompressedData(_) => Tag::CompressedData,
            &Packet::PKESK(_) => Tag::PKESK,
            &Packet::SKESK(_) => Tag::SKESK,
            &Packet::SEIP(_) => Tag::SEIP,
            &Packet::MDC(_) => Tag::MDC,
            &Packet::AED(_) => Tag::AED,
            Packet::__Nonexhaustive => unreachable!(),
        }
    }

    /// Returns the parsed `Packet's` corresponding OpenPGP tag.
    ///
    /// Returns the packets tag, but only if it was successfully
    /// parsed into the corresponding packet type.  If e.g. a
    /// Signature Packet uses some unsupported methods, it is parsed
    /// into an `Packet::Unknown`.  `tag()` returns `Tag::Signature`,
    /// whereas `kind()` returns `None`.
    pub fn kind(&self) -> Option<packet::Tag> {
        use crate::packet::Tag;
        match self {
            &Packet::Unknown(_) => None,
            &Packet::Signature(_) => Some(Tag::Signature),
            &Packet::OnePassSig(_) => Some(Tag::OnePassSig),
            &Packet::PublicKey(_) => Some(Tag::PublicKey),
            &Packet::PublicSubkey(_) => Some(Tag::PublicSubkey),
            &Packet::SecretKey(_) => Some(Tag::SecretKey),
            &Packet::SecretSubkey(_) => Some(Tag::SecretSubkey),
            &Packet::Marker(_) => Some(Tag::Marker),
            &Packet::Trust(_) => Some(Tag::Trust),
            &Packet::UserID(_) => Some(Tag::UserID),
            &Packet::UserAttribute(_) => Some(Tag::UserAttribute),
            &Packet::Literal(_) => Some(Tag::Literal),
            &Packet::CompressedData(_) => Some(Tag::CompressedData),
            &Packet::PKESK(_) => Some(Tag::PKESK),
            &Packet::SKESK(_) => Some(Tag::SKESK),
            &Packet::SEIP(_) => Some(Tag::SEIP),
            &Packet::MDC(_) => Some(Tag::MDC),
            &Packet::AED(_) => Some(Tag::AED),
            Packet::__Nonexhaustive => unreachable!(),
        }
    }
}

impl serialize::Marshal for Packet {
    fn serialize(&self, sink: &mut dyn std::io::Write) -> Result<()> {
        let mut body = Vec::new();
        match self {
            Packet::Unknown(p) => p.serialize(&mut body)?,
            Packet::Signature(p) => p.serialize(&mut body)?,
            Packet::OnePassSig(p) => p.serialize(&mut body)?,
            Packet::PublicKey(p) => p.serialize(&mut body)?,
            Packet::PublicSubkey(p) => p.serialize(&mut body)?,
            Packet::SecretKey(p) => p.serialize(&mut body)?,
            Packet::SecretSubkey(p) => p.serialize(&mut body)?,
            Packet::Marker(p) => p.serialize(&mut body)?,
            Packet::Trust(p) => p.serialize(&mut body)?,
            Packet::UserID(p) => p.serialize(&mut body)?,
            Packet::UserAttribute(p) => p.serialize(&mut body)?,
            Packet::Literal(p) => p.serialize(&mut body)?,
            Packet::CompressedData(p) => p.serialize(&mut body)?,
            Packet::PKESK(p) => p.serialize(&mut body)?,
            Packet::SKESK(p) => p.serialize(&mut body)?,
            Packet::SEIP(p) => p.serialize(&mut body)?,
            Packet::MDC(p) => p.serialize(&mut body)?,
            Packet::AED(p) => p.serialize(&mut body)?,
            Packet::__Nonexhaustive => unreachable!(),
        }
        serialize::write_ptag(sink, self.tag())?;
        serialize::write_length(sink, body.len())?;
        sink.write_all(&body)?;
        Ok(())
    }
}

/// A `PacketPile` holds a deserialized sequence of OpenPGP messages.
///
/// To deserialize an OpenPGP usage, use either [`PacketParser`],
/// [`PacketPileParser`], or [`PacketPile::from_file`] (or related
/// routines).
///
/// Normally, you'll want to convert the `PacketPile` to a Cert or a
/// `Message`.
///
///   [`PacketParser`]: parse/struct.PacketParser.html
///   [`PacketPileParser`]: parse/struct.PacketPileParser.html
///   [`PacketPile::from_file`]: struct.PacketPile.html#method.from_file
#[derive(PartialEq, Clone)]
pub struct PacketPile {
    /// At the top level, we have a sequence of packets, which may be
    /// containers.
    top_level: Container,
}

/// An OpenPGP message.
///
/// An OpenPGP message is a structured sequence of OpenPGP packets.
/// Basically, it's an optionally encrypted, optionally signed literal
/// data packet.  The exact structure is defined in [Section 11.3 of RFC
/// 4880].
///
///   [Section 11.3 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-11.3
#[derive(PartialEq)]
pub struct Message {
    /// A message is just a validated packet pile.
    pile: PacketPile,
}

impl Message {
    /// Checks that `packets` forms a valid OpenPGP message, per the
    /// grammar in Section 11.3 of RFC 4880:
    ///
    /// ```text
    /// OpenPGP Message :- Encrypted Message | Signed Message |
    ///                     Compressed Message | Literal Message.
    /// Compressed Message :- Compressed Data Packet.
    /// Literal Message :- Literal Data Packet.
    /// ESK :- Public-Key Encrypted Session Key Packet |
    ///        Symmetric-Key Encrypted Session Key Packet.
    /// ESK Sequence :- ESK | ESK Sequence, ESK.
    /// Encrypted Data :- Symmetrically Encrypted Data Packet |
    ///       Symmetrically Encrypted Integrity Protected Data Packet.
    /// Encrypted Message :- Encrypted Data | ESK Sequence, Encrypted Data.
    /// One-Pass Signed Message :- One-Pass Signature Packet,
    ///       OpenPGP Message, Corresponding Signature Packet.
    /// Signed Message :- Signature Packet, OpenPGP Message |
    ///             One-Pass Signed Message.
    /// ```
    fn check_structure(packets: &[Packet]) -> Result<()> {
        match packets {
            [] => Err(Error::Malformed("empty message".into()).into()),
            [Packet::Literal(_)] | [Packet::CompressedData(_)]
            | [Packet::SEIP(_)] | [Packet::AED(_)] => Ok(()),
            [Packet::SEIP(_), Packet::MDC(_)] => Ok(()),
            [first, rest @ ..]
                if matches!(first, Packet::PKESK(_) | Packet::SKESK(_)) =>
            {
                Self::check_structure(rest)
            }
            [Packet::OnePassSig(_), rest @ ..] => match rest.split_last() {
                Some((Packet::Signature(_), inner)) =>
                    Self::check_structure(inner),
                _ => Err(Error::Malformed(
                    "one-pass signature without matching signature".into())
                    .into()),
            },
            [Packet::Signature(_), rest @ ..] => Self::check_structure(rest),
            _ => Err(Error::Malformed(
                "packet sequence does not form a valid message".into())
                .into()),
        }
    }

    /// Returns the message's literal data packet, if any.
    ///
    /// Traverses compressed data, encrypted data, and signature
    /// layers to find the innermost literal data packet.
    pub fn body(&self) -> Option<&packet::Literal> {
        self.pile.descendants().find_map(|p| {
            if let Packet::Literal(l) = p { Some(l) } else { None }
        })
    }

    /// Returns an iterator over the top-level packets of this message.
    pub fn children(&self) -> impl Iterator<Item = &Packet> {
        self.pile.children()
    }

    /// Returns an iterator over all of the message's packets, in
    /// depth-first order.
    pub fn descendants(&self) -> packet::Iter<'_> {
        self.pile.descendants()
    }
}

impl<'a> parse::Parse<'a, Message> for Message {
    fn from_bytes(data: &'a [u8]) -> Result<Self> {
        use std::convert::TryFrom;
        Message::try_from(PacketPile::from_bytes(data)?)
    }
}

impl std::convert::TryFrom<PacketPile> for Message {
    type Error = Error;

    fn try_from(pile: PacketPile) -> Result<Self> {
        let packets = pile.children().cloned().collect::<Vec<_>>();
        Message::check_structure(&packets)?;
        Ok(Message { pile })
    }
}

impl From<Message> for PacketPile {
    fn from(m: Message) -> Self {
        m.pile
    }
}

impl serialize::Marshal for Message {
    fn serialize(&self, sink: &mut dyn std::io::Write) -> Result<()> {
        self.pile.serialize(sink)
    }
}

