//! Parses OpenPGP packet streams.
//!
//! This module provides two layers. The low-level layer,
//! [`PacketParser`], is an iterator-like cursor over a packet stream:
//! each call to [`PacketParser::next`] returns the packet that was
//! just read together with a parser positioned at the following one,
//! optionally recursing into containers (compressed data, encrypted
//! containers) up to [`MAX_RECURSION_DEPTH`]. The higher-level
//! [`Callback`]-based [`ParseInfo::run`] drives a `PacketParser` to
//! completion, dispatching a [`ParserEvent`] to a stack of callbacks
//! per packet; this is convenient for streaming consumers that don't
//! want to build a tree themselves (see [`crate::PacketPile`] for
//! that).
//!
//! Each packet body is parsed via the per-type [`Parse`] trait, which
//! individual packet types implement directly (see e.g.
//! `crypto::mpi::MPI`'s or `packet::key::Key4`'s implementations).

use std::io::{self, Read};
use std::path::Path;

use buffered_reader::BufferedReader;

use crate::{Error, Packet, Result};
use crate::crypto::hash;
use crate::packet::{self, Tag};
use crate::types::HashAlgorithm;

pub(crate) mod region;
pub(crate) use self::region::Region;

/// Maximum number of times a compressed data or encrypted container
/// packet may be nested.
///
/// Without a bound, a maliciously crafted message could force
/// unbounded recursion (a "decompression bomb" of packet structure
/// rather than of raw bytes).
pub const MAX_RECURSION_DEPTH: u8 = 8;

/// A parser for a particular data type.
///
/// This is the conventional interface for parsing a particular
/// OpenPGP data type. Most types that implement `Parse` can be read
/// from a slice, a reader, or a file; the lifetime parameter `'a`
/// bounds how long a borrowing implementation (like
/// [`PacketParser`]) may hold onto the underlying data.
pub trait Parse<'a, T> {
    /// Reads from the given reader.
    fn from_reader<R: 'a + Read>(mut reader: R) -> Result<T> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Self::from_bytes(&buf)
    }

    /// Reads from the given file.
    fn from_file<P: AsRef<Path>>(path: P) -> Result<T> {
        Self::from_reader(std::fs::File::open(path)?)
    }

    /// Reads from the given slice.
    fn from_bytes(data: &'a [u8]) -> Result<T>;
}

/// What a [`Cookie`]'s hash contexts are accumulating, for the
/// benefit of signature (or MDC) verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum HashesFor {
    /// Not accumulating anything.
    Nothing,
    /// Accumulating the contents of a literal data packet for one or
    /// more pending signatures.
    Signature,
    /// Accumulating the plaintext of a SEIP packet for its trailing
    /// MDC.
    MDC,
}

impl Default for HashesFor {
    fn default() -> Self { HashesFor::Nothing }
}

/// Per-`BufferedReader`-layer state threaded through the reader
/// stack.
///
/// Layered readers (partial-body framing, decompression,
/// decryption) each get their own `Cookie`, carrying the recursion
/// depth at which they were pushed and, for literal data and SEIP
/// plaintext, the hash contexts that are fed every byte as it is
/// read so that trailing signatures or the MDC can be verified
/// without buffering the whole body.
#[derive(Default)]
pub(crate) struct Cookie {
    pub(crate) level: Option<isize>,
    pub(crate) hashes_for: HashesFor,
    pub(crate) hashes: Vec<(HashAlgorithm, hash::Context)>,
}

impl Cookie {
    fn new(level: isize) -> Self {
        Cookie { level: Some(level), ..Default::default() }
    }

    /// Feeds `data` to every active hash context.
    pub(crate) fn update_hashes(&mut self, data: &[u8]) {
        for (_, ctx) in self.hashes.iter_mut() {
            ctx.update(data);
        }
    }
}

/// The three ways a new-format or old-format packet header can
/// express the length of the body that follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BodyLength {
    /// The packet's body is exactly this many bytes.
    Full(u32),
    /// The packet uses new-format partial body lengths; this is the
    /// length of the first chunk, and more chunks (the last of which
    /// is announced by a `Full` length) follow.
    Partial(u32),
    /// The body continues until the underlying reader hits EOF (only
    /// legal for old-format packets, and only as the last packet in
    /// a non-seekable stream).
    Indeterminate,
}

/// Reads a new-format length octet sequence, per
/// [Section 4.2.2 of RFC 4880][link].
///
/// [link]: https://tools.ietf.org/html/rfc4880#section-4.2.2
fn read_new_format_length<C>(reader: &mut dyn BufferedReader<C>) -> Result<BodyLength> {
    let octet1 = reader.data_consume_hard(1)?[0];
    Ok(match octet1 {
        0..=191 => BodyLength::Full(octet1 as u32),
        192..=223 => {
            let octet2 = reader.data_consume_hard(1)?[0];
            BodyLength::Full(((octet1 as u32 - 192) << 8) + octet2 as u32 + 192)
        }
        224..=254 => BodyLength::Partial(1 << (octet1 & 0x1F)),
        255 => {
            let buf = reader.data_consume_hard(4)?;
            let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
            BodyLength::Full(len)
        }
    })
}

/// Reads an old-format length, per
/// [Section 4.2.1 of RFC 4880][link].
///
/// [link]: https://tools.ietf.org/html/rfc4880#section-4.2.1
fn read_old_format_length<C>(reader: &mut dyn BufferedReader<C>, length_type: u8)
    -> Result<BodyLength>
{
    Ok(match length_type {
        0 => BodyLength::Full(reader.data_consume_hard(1)?[0] as u32),
        1 => {
            let buf = reader.data_consume_hard(2)?;
            BodyLength::Full(u16::from_be_bytes([buf[0], buf[1]]) as u32)
        }
        2 => {
            let buf = reader.data_consume_hard(4)?;
            BodyLength::Full(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]))
        }
        3 => BodyLength::Indeterminate,
        _ => return Err(Error::Malformed(
            format!("invalid old-format length type {}", length_type)).into()),
    })
}

/// Reads a packet header (tag octet plus length), returning the tag
/// and the body's length.
pub(crate) fn read_header<C>(reader: &mut dyn BufferedReader<C>)
    -> Result<(Tag, BodyLength)>
{
    let ptag = reader.data_consume_hard(1)?[0];
    if ptag & 0x80 == 0 {
        return Err(Error::Malformed(
            format!("malformed packet tag octet {:#04x}: high bit unset", ptag)).into());
    }

    if ptag & 0x40 != 0 {
        // New format.
        let tag = Tag::from(ptag & 0x3F);
        let len = read_new_format_length(reader)?;
        Ok((tag, len))
    } else {
        // Old format.
        let tag = Tag::from((ptag >> 2) & 0x0F);
        let length_type = ptag & 0x03;
        let len = read_old_format_length(reader, length_type)?;
        Ok((tag, len))
    }
}

/// Reads exactly `len` bytes of a single length-prefixed chunk by
/// temporarily pushing a [`Region`] of that length onto the reader
/// stack: the chunk is consumed entirely from within the region (so
/// a bug that tried to read past the chunk boundary would hit the
/// region's own limit first, not the packet that follows it), then
/// the region is popped and the underlying reader handed back.
fn read_region_exact<'a>(
    reader: &mut Box<dyn BufferedReader<Cookie> + 'a>,
    len: usize,
    hash_body: bool,
) -> Result<Vec<u8>> {
    let placeholder: Box<dyn BufferedReader<Cookie> + 'a> =
        Box::new(buffered_reader::BufferedReaderMemory::with_cookie(
            &[][..], Cookie::default()));
    let inner = std::mem::replace(reader, placeholder);
    let mut region = Region::new(inner, len as u64);
    let chunk = region.data_consume_hard(len)?[..len].to_vec();
    debug_assert!(region.at_end(), "region boundary and chunk length must coincide");
    *reader = region.into_inner();
    if hash_body {
        reader.cookie_mut().update_hashes(&chunk);
    }
    Ok(chunk)
}

/// Reads exactly `length` bytes, honoring old- and new-format
/// framing, including new-format partial body chunking.
///
/// For `BodyLength::Indeterminate`, reads until EOF. When `hash_body`
/// is set (only true for a literal data packet's body), feeds the
/// bytes read to the reader's active [`Cookie`] hash contexts as
/// they're consumed, so that a trailing document signature can be
/// verified against what was actually parsed without a second pass
/// over the data.
fn read_body<'a>(
    reader: &mut Box<dyn BufferedReader<Cookie> + 'a>,
    length: BodyLength,
    hash_body: bool,
) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    match length {
        BodyLength::Full(len) => {
            body = read_region_exact(reader, len as usize, hash_body)?;
        }
        BodyLength::Partial(first) => {
            let mut next = BodyLength::Partial(first);
            loop {
                match next {
                    BodyLength::Partial(len) => {
                        let chunk = read_region_exact(reader, len as usize, hash_body)?;
                        body.extend_from_slice(&chunk);
                        next = read_new_format_length(&mut **reader)?;
                    }
                    BodyLength::Full(len) => {
                        let chunk = read_region_exact(reader, len as usize, hash_body)?;
                        body.extend_from_slice(&chunk);
                        break;
                    }
                    BodyLength::Indeterminate =>
                        return Err(Error::Malformed(
                            "indeterminate length inside partial body sequence".into()).into()),
                }
            }
        }
        BodyLength::Indeterminate => {
            // No declared length to bound a `Region` with; this is
            // only legal for the last packet in a non-seekable
            // stream, so reading to the underlying EOF is exact by
            // construction.
            let chunk = reader.steal_eof()?;
            if hash_body {
                reader.cookie_mut().update_hashes(&chunk);
            }
            body = chunk;
        }
    }
    Ok(body)
}

/// Updates the reader's pending-signature hash contexts for the
/// packet that was just parsed.
///
/// A one-pass signature packet announces a hash algorithm and pushes
/// a fresh context (RFC 4880's one-pass signatures nest, so later
/// signature packets match the most recently pushed context first,
/// hence a stack rather than a single slot). `read_body` feeds the
/// following literal data packet's bytes into every active context.
/// When the matching signature packet itself is reached, its own
/// hash coverage (header, hashed subpacket area, trailer) is appended
/// and the result stashed on the packet via `set_computed_hash`, so
/// `Signature::verify` can succeed against bytes this process only
/// just parsed rather than ones it produced itself.
fn note_packet_for_hashing(
    reader: &mut Box<dyn BufferedReader<Cookie> + '_>,
    packet: &mut Packet,
) -> Result<()> {
    use crate::crypto::hash::Hash as _;

    match packet {
        Packet::OnePassSig(ops) => {
            let algo = ops.hash_algo();
            let ctx = algo.context()?;
            let cookie = reader.cookie_mut();
            cookie.hashes_for = HashesFor::Signature;
            cookie.hashes.push((algo, ctx));
        }
        Packet::Signature(sig) => {
            let cookie = reader.cookie_mut();
            if let Some(pos) =
                cookie.hashes.iter().rposition(|(algo, _)| *algo == sig.hash_algo())
            {
                let (algo, mut ctx) = cookie.hashes.remove(pos);
                if cookie.hashes.is_empty() {
                    cookie.hashes_for = HashesFor::Nothing;
                }
                sig.hash(&mut ctx);
                let mut digest = vec![0u8; ctx.digest_size()];
                ctx.digest(&mut digest);
                sig.set_computed_hash(Some((algo, digest)));
            }
        }
        _ => {}
    }
    Ok(())
}

/// Dispatches on `tag`, parsing `body` into the corresponding
/// [`Packet`] variant.
///
/// If the tag is recognized but the body doesn't parse (an unknown
/// algorithm, a malformed MPI sequence, ...), or the tag itself isn't
/// recognized, the packet is returned as [`Packet::Unknown`] rather
/// than failing the whole parse: one bad packet shouldn't prevent the
/// caller from inspecting the packets around it.
fn packet_from_tag_and_body(tag: Tag, body: Vec<u8>, depth: u8) -> Result<Packet> {
    let raw = body.clone();

    let parsed = (|| -> Result<Packet> {
        match tag {
            Tag::Signature =>
                Ok(Packet::Signature(packet::Signature::from_bytes(&body)?)),
            Tag::OnePassSig => Ok(Packet::OnePassSig(parse_one_pass_sig(&body)?)),
            Tag::PublicKey =>
                Ok(Packet::PublicKey(packet::key::PublicKey::from_bytes(&body)?)),
            Tag::PublicSubkey =>
                Ok(Packet::PublicSubkey(packet::key::PublicSubkey::from_bytes(&body)?)),
            Tag::SecretKey =>
                Ok(Packet::SecretKey(packet::key::SecretKey::from_bytes(&body)?)),
            Tag::SecretSubkey =>
                Ok(Packet::SecretSubkey(packet::key::SecretSubkey::from_bytes(&body)?)),
            Tag::Marker => {
                if body[..] != packet::MARKER_BODY[..] {
                    return Err(Error::Malformed("bad marker packet body".into()).into());
                }
                Ok(Packet::Marker(packet::Marker::new()))
            }
            Tag::Trust => Ok(Packet::Trust(packet::Trust::from(body))),
            Tag::UserID => Ok(Packet::UserID(packet::UserID::from(body))),
            Tag::UserAttribute =>
                Ok(Packet::UserAttribute(packet::UserAttribute::new(body))),
            Tag::Literal => Ok(Packet::Literal(parse_literal(body)?)),
            Tag::CompressedData => Ok(Packet::CompressedData(parse_compressed(body, depth)?)),
            Tag::PKESK => Ok(Packet::PKESK(parse_pkesk(&body)?)),
            Tag::SKESK => Ok(Packet::SKESK(parse_skesk(&body)?)),
            Tag::SEIP => Ok(Packet::SEIP(parse_seip(body)?)),
            Tag::MDC => {
                if body.len() != 20 {
                    return Err(Error::Malformed("MDC body must be 20 bytes".into()).into());
                }
                let mut digest = [0u8; 20];
                digest.copy_from_slice(&body);
                Ok(Packet::MDC(packet::MDC::new(digest)))
            }
            Tag::AED => Ok(Packet::AED(parse_aed(body, depth)?)),
            _ => Err(Error::UnsupportedPacket(format!("{:?}", tag))),
        }
    })();

    match parsed {
        Ok(p) => Ok(p),
        Err(e) => {
            let mut p = packet::Unknown::new(tag, e.to_string());
            p.set_body(raw);
            Ok(Packet::from(p))
        }
    }
}

fn parse_one_pass_sig(data: &[u8]) -> Result<packet::OnePassSig> {
    if data.len() != 13 {
        return Err(Error::Malformed("bad one-pass signature length".into()).into());
    }
    if data[0] != 3 {
        return Err(Error::Malformed(
            format!("unsupported one-pass signature version {}", data[0])).into());
    }
    let sigtype = crate::types::SignatureType::from(data[1]);
    let hash_algo = HashAlgorithm::from(data[2]);
    let pk_algo = crate::types::PublicKeyAlgorithm::from(data[3]);
    let issuer = crate::KeyID::from_bytes(&data[4..12]);
    let last = data[12] != 0;
    Ok(packet::OnePassSig::new(sigtype, hash_algo, pk_algo, issuer, last))
}

fn parse_literal(mut data: Vec<u8>) -> Result<packet::Literal> {
    if data.len() < 6 {
        return Err(Error::Malformed("truncated literal data packet".into()).into());
    }
    let format = packet::DataFormat::from(data[0]);
    let filename_len = data[1] as usize;
    if data.len() < 2 + filename_len + 4 {
        return Err(Error::Malformed("truncated literal data packet".into()).into());
    }
    let filename = if filename_len > 0 {
        Some(data[2..2 + filename_len].to_vec())
    } else {
        None
    };
    let mut pos = 2 + filename_len;
    let date = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]);
    pos += 4;
    let body = data.split_off(pos);

    let mut p = packet::Literal::new(format);
    if let Some(f) = filename { p.set_filename(f)?; }
    if date != 0 {
        p.set_date(Some(crate::types::Timestamp::from(date)));
    }
    p.set_body(body);
    Ok(p)
}

/// Decompresses `body` (whose first byte is the algorithm octet) and
/// recursively parses the result into child packets, provided the
/// recursion limit hasn't been hit; otherwise the (still compressed)
/// body is left opaque for the caller to decompress and parse later.
fn parse_compressed(body: Vec<u8>, depth: u8) -> Result<packet::CompressedData> {
    if body.is_empty() {
        return Err(Error::Malformed("empty compressed data packet".into()).into());
    }
    let algo = crate::types::CompressionAlgorithm::from(body[0]);
    let mut p = packet::CompressedData::new(algo);
    if depth >= MAX_RECURSION_DEPTH {
        p.set_body(body);
        return Ok(p);
    }

    let plaintext = decompress(algo, &body[1..])?;
    let children = parse_packets(&plaintext, depth + 1)?;
    *p.children_mut() = children;
    Ok(p)
}

/// Runs a low-level `flate2::Decompress` to completion over the whole
/// of `data`, rather than driving a `Read` wrapper, so that we can
/// demand the decoder consume every byte of its region: a `Read`
/// wrapper stops pulling from its source the instant the deflate
/// stream signals its own end, and happily leaves any trailing bytes
/// in `data` unexamined.
#[cfg(feature = "compression-deflate")]
fn decompress_deflate(data: &[u8], zlib_header: bool) -> Result<Vec<u8>> {
    use flate2::{Decompress, FlushDecompress, Status};

    let mut inflate = Decompress::new(zlib_header);
    let mut out = vec![0u8; data.len().max(4096) * 4];
    loop {
        let before_in = inflate.total_in();
        let before_out = inflate.total_out();
        let status = inflate.decompress(
            &data[before_in as usize..], &mut out[before_out as usize..],
            FlushDecompress::Finish)
            .map_err(|e| Error::BadCompression(format!("deflate error: {}", e)))?;
        match status {
            Status::StreamEnd => break,
            Status::Ok | Status::BufError
                if (inflate.total_out() as usize) < out.len() =>
            {
                // Made no forward progress with room left: the stream
                // is truncated mid-block.
                if inflate.total_out() == before_out && inflate.total_in() == before_in {
                    return Err(Error::BadCompression(
                        "truncated deflate stream".into()));
                }
            }
            _ => {
                let len = out.len();
                out.resize(len * 2, 0);
            }
        }
    }
    let consumed = inflate.total_in() as usize;
    if consumed != data.len() {
        return Err(Error::BadCompression(format!(
            "{} trailing byte(s) after compressed data", data.len() - consumed)));
    }
    out.truncate(inflate.total_out() as usize);
    Ok(out)
}

#[cfg(feature = "compression-bzip2")]
fn decompress_bzip2(data: &[u8]) -> Result<Vec<u8>> {
    use bzip2::{Decompress, Status};

    let mut bzip = Decompress::new(false);
    let mut out = vec![0u8; data.len().max(4096) * 4];
    loop {
        let before_in = bzip.total_in();
        let before_out = bzip.total_out();
        let status = bzip.decompress(
            &data[before_in as usize..], &mut out[before_out as usize..])
            .map_err(|e| Error::BadCompression(format!("bzip2 error: {}", e)))?;
        match status {
            Status::StreamEnd => break,
            _ if (bzip.total_out() as usize) < out.len() => {
                if bzip.total_out() == before_out && bzip.total_in() == before_in {
                    return Err(Error::BadCompression(
                        "truncated bzip2 stream".into()));
                }
            }
            _ => {
                let len = out.len();
                out.resize(len * 2, 0);
            }
        }
    }
    let consumed = bzip.total_in() as usize;
    if consumed != data.len() {
        return Err(Error::BadCompression(format!(
            "{} trailing byte(s) after compressed data", data.len() - consumed)));
    }
    out.truncate(bzip.total_out() as usize);
    Ok(out)
}

/// Decompresses `data`, the region-bounded body of a compressed data
/// packet, failing closed: every byte of `data` must belong to
/// exactly one compressed stream, so that any trailing garbage past
/// the stream's logical end raises [`Error::BadCompression`] rather
/// than being silently dropped.
fn decompress(algo: crate::types::CompressionAlgorithm, data: &[u8]) -> Result<Vec<u8>> {
    use crate::types::CompressionAlgorithm::*;
    match algo {
        Uncompressed => Ok(data.to_vec()),
        Zip => {
            #[cfg(feature = "compression-deflate")]
            { decompress_deflate(data, false) }
            #[cfg(not(feature = "compression-deflate"))]
            Err(Error::UnsupportedAlgorithm(format!("compression algorithm {:?}", algo)).into())
        }
        Zlib => {
            #[cfg(feature = "compression-deflate")]
            { decompress_deflate(data, true) }
            #[cfg(not(feature = "compression-deflate"))]
            Err(Error::UnsupportedAlgorithm(format!("compression algorithm {:?}", algo)).into())
        }
        BZip2 => {
            #[cfg(feature = "compression-bzip2")]
            { decompress_bzip2(data) }
            #[cfg(not(feature = "compression-bzip2"))]
            Err(Error::UnsupportedAlgorithm(format!("compression algorithm {:?}", algo)).into())
        }
        _ => Err(Error::UnsupportedAlgorithm(format!("compression algorithm {:?}", algo)).into()),
    }
}

fn parse_pkesk(data: &[u8]) -> Result<packet::PKESK> {
    if data.len() < 10 {
        return Err(Error::Malformed("truncated PKESK packet".into()).into());
    }
    if data[0] != 3 {
        return Err(Error::Malformed(
            format!("unsupported PKESK version {}", data[0])).into());
    }
    let recipient = crate::KeyID::from_bytes(&data[1..9]);
    let pk_algo = crate::types::PublicKeyAlgorithm::from(data[9]);
    let esk = crate::crypto::mpi::Ciphertext::parse(pk_algo, data[10..].to_vec())?;
    Ok(packet::PKESK::new(recipient, pk_algo, esk))
}

fn parse_skesk(data: &[u8]) -> Result<packet::SKESK> {
    if data.len() < 2 {
        return Err(Error::Malformed("truncated SKESK packet".into()).into());
    }
    match data[0] {
        4 => {
            let sym_algo = crate::types::SymmetricAlgorithm::from(data[1]);
            let mut cursor: &[u8] = &data[2..];
            let s2k = crate::crypto::s2k::S2K::parse(&mut cursor)?;
            let consumed = data.len() - 2 - cursor.len();
            let esk = &data[2 + consumed..];
            let esk = if esk.is_empty() { None } else { Some(esk.to_vec()) };
            Ok(packet::SKESK::new(sym_algo, s2k, esk))
        }
        5 => {
            let sym_algo = crate::types::SymmetricAlgorithm::from(data[1]);
            if data.len() < 3 {
                return Err(Error::Malformed("truncated SKESK packet".into()).into());
            }
            let aead_algo = crate::types::AEADAlgorithm::from(data[2]);
            let mut cursor: &[u8] = &data[3..];
            let s2k = crate::crypto::s2k::S2K::parse(&mut cursor)?;
            let consumed = data.len() - 3 - cursor.len();
            let mut pos = 3 + consumed;
            let iv_len = aead_algo.nonce_size()?;
            if data.len() < pos + iv_len {
                return Err(Error::Malformed("truncated SKESK packet IV".into()).into());
            }
            let iv = data[pos..pos + iv_len].to_vec();
            pos += iv_len;
            let esk = data[pos..].to_vec();
            Ok(packet::SKESK::with_aead(sym_algo, s2k, aead_algo, iv, esk))
        }
        v => Err(Error::Malformed(format!("unsupported SKESK version {}", v)).into()),
    }
}

fn parse_seip(body: Vec<u8>) -> Result<packet::SEIP> {
    if body.is_empty() || body[0] != 1 {
        return Err(Error::Malformed("unsupported SEIP version".into()).into());
    }
    let mut p = packet::SEIP1::new();
    p.set_body(body[1..].to_vec());
    Ok(packet::SEIP::V1(p))
}

fn parse_aed(body: Vec<u8>, depth: u8) -> Result<packet::AED> {
    if body.len() < 4 || body[0] != 1 {
        return Err(Error::Malformed("unsupported AED version".into()).into());
    }
    let sym_algo = crate::types::SymmetricAlgorithm::from(body[1]);
    let aead = crate::types::AEADAlgorithm::from(body[2]);
    let chunk_size = 1usize << body[3];
    let iv_len = aead.nonce_size()?;
    if body.len() < 4 + iv_len {
        return Err(Error::Malformed("truncated AED packet".into()).into());
    }
    let iv = body[4..4 + iv_len].to_vec().into_boxed_slice();
    let mut p = packet::AED1::new(sym_algo, aead, chunk_size, iv)?;
    let _ = depth; // ciphertext isn't recursed into; it is opaque until decrypted.
    p.set_body(body[4 + iv_len..].to_vec());
    Ok(packet::AED::V1(p))
}

impl<'a> Parse<'a, packet::UserID> for packet::UserID {
    fn from_bytes(data: &'a [u8]) -> Result<Self> {
        Ok(packet::UserID::from(data.to_vec()))
    }
}

impl<'a> Parse<'a, packet::Trust> for packet::Trust {
    fn from_bytes(data: &'a [u8]) -> Result<Self> {
        Ok(packet::Trust::from(data.to_vec()))
    }
}

impl<'a> Parse<'a, packet::UserAttribute> for packet::UserAttribute {
    fn from_bytes(data: &'a [u8]) -> Result<Self> {
        Ok(packet::UserAttribute::new(data.to_vec()))
    }
}

impl<'a> Parse<'a, Packet> for Packet {
    fn from_bytes(data: &'a [u8]) -> Result<Self> {
        let mut reader: Box<dyn BufferedReader<Cookie>> =
            Box::new(buffered_reader::BufferedReaderMemory::with_cookie(
                data, Cookie::new(0)));
        let (tag, len) = read_header(&mut *reader)?;
        let body = read_body(&mut reader, len, tag == Tag::Literal)?;
        let mut packet = packet_from_tag_and_body(tag, body, 0)?;
        note_packet_for_hashing(&mut reader, &mut packet)?;
        Ok(packet)
    }
}

/// Parses a complete, concatenated sequence of packets from `data`,
/// recursing into containers up to `depth` levels deep already
/// consumed.
pub(crate) fn parse_packets(data: &[u8], depth: u8) -> Result<Vec<Packet>> {
    let mut reader: Box<dyn BufferedReader<Cookie>> =
        Box::new(buffered_reader::BufferedReaderMemory::with_cookie(
            data, Cookie::new(depth as isize)));
    let mut packets = Vec::new();
    while !reader.data(1)?.is_empty() {
        let (tag, len) = read_header(&mut *reader)?;
        let body = read_body(&mut reader, len, tag == Tag::Literal)?;
        let mut packet = packet_from_tag_and_body(tag, body, depth)?;
        note_packet_for_hashing(&mut reader, &mut packet)?;
        packets.push(packet);
    }
    Ok(packets)
}

/// A cursor over an OpenPGP packet stream.
///
/// Call [`PacketParser::from_reader`] or [`PacketParser::from_bytes`]
/// to obtain the first packet, then repeatedly call
/// [`PacketParser::next`] to advance. Each call returns the packet
/// just parsed, and a [`PacketParserResult`] for what follows: either
/// another `PacketParser`, or `EOF` if the stream is exhausted.
///
/// This type fully materializes each packet's body (including
/// recursing into compressed data and encrypted containers up to
/// [`MAX_RECURSION_DEPTH`]) rather than offering true incremental
/// reads of a single large literal data packet's content; see
/// [`packet::Literal::body`] for the buffered result.
pub struct PacketParser<'a> {
    packet: Packet,
    reader: Box<dyn BufferedReader<Cookie> + 'a>,
    depth: u8,
}

/// The result of parsing a packet: either another packet follows
/// (wrapped in a fresh `PacketParser`), or the stream has ended.
pub enum PacketParserResult<'a> {
    /// A packet was successfully parsed; more may follow.
    Some(PacketParser<'a>),
    /// The packet stream is exhausted.
    EOF(PacketParserEOF),
}

/// Marks the end of a packet stream.
pub struct PacketParserEOF {
    _private: (),
}

impl<'a> PacketParser<'a> {
    /// Starts parsing the packet stream read from `reader`.
    pub fn from_reader<R: io::Read + 'a>(reader: R) -> Result<PacketParserResult<'a>> {
        let inner: Box<dyn BufferedReader<Cookie> + 'a> =
            Box::new(buffered_reader::BufferedReaderGeneric::with_cookie(
                reader, None, Cookie::new(0)));
        Self::from_buffered_reader(inner)
    }

    /// Starts parsing the packet stream stored in `bytes`.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<PacketParserResult<'a>> {
        let inner: Box<dyn BufferedReader<Cookie> + 'a> =
            Box::new(buffered_reader::BufferedReaderMemory::with_cookie(
                bytes, Cookie::new(0)));
        Self::from_buffered_reader(inner)
    }

    fn from_buffered_reader(mut reader: Box<dyn BufferedReader<Cookie> + 'a>)
        -> Result<PacketParserResult<'a>>
    {
        if reader.data(1)?.is_empty() {
            return Ok(PacketParserResult::EOF(PacketParserEOF { _private: () }));
        }
        let (tag, len) = read_header(&mut *reader)?;
        let body = read_body(&mut reader, len, tag == Tag::Literal)?;
        let mut packet = packet_from_tag_and_body(tag, body, 0)?;
        note_packet_for_hashing(&mut reader, &mut packet)?;
        Ok(PacketParserResult::Some(PacketParser { packet, reader, depth: 0 }))
    }

    /// Returns a reference to the packet just parsed.
    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    /// Finishes with this packet and returns it together with the
    /// parser state needed to continue reading the next one.
    pub fn next(self) -> Result<(Packet, PacketParserResult<'a>)> {
        let PacketParser { packet, mut reader, depth } = self;
        if reader.data(1)?.is_empty() {
            return Ok((packet, PacketParserResult::EOF(PacketParserEOF { _private: () })));
        }
        let (tag, len) = read_header(&mut *reader)?;
        let body = read_body(&mut reader, len, tag == Tag::Literal)?;
        let mut next_packet = packet_from_tag_and_body(tag, body, depth)?;
        note_packet_for_hashing(&mut reader, &mut next_packet)?;
        Ok((packet, PacketParserResult::Some(PacketParser { packet: next_packet, reader, depth })))
    }
}

/// Configures a [`PacketParser`] before parsing begins.
///
/// Currently the only knob is the recursion depth at which compressed
/// data and encrypted containers stop being transparently decoded;
/// deeper containers are returned with an opaque, still-encoded body.
pub struct PacketParserBuilder<'a> {
    reader: Box<dyn BufferedReader<Cookie> + 'a>,
    max_depth: u8,
}

impl<'a> PacketParserBuilder<'a> {
    /// Creates a builder that will read from `reader`.
    pub fn from_reader<R: io::Read + 'a>(reader: R) -> Result<Self> {
        Ok(PacketParserBuilder {
            reader: Box::new(buffered_reader::BufferedReaderGeneric::with_cookie(
                reader, None, Cookie::new(0))),
            max_depth: MAX_RECURSION_DEPTH,
        })
    }

    /// Creates a builder that will read from `bytes`.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self> {
        Ok(PacketParserBuilder {
            reader: Box::new(buffered_reader::BufferedReaderMemory::with_cookie(
                bytes, Cookie::new(0))),
            max_depth: MAX_RECURSION_DEPTH,
        })
    }

    /// Sets the maximum recursion depth. Defaults to
    /// [`MAX_RECURSION_DEPTH`]; values above it are clamped.
    pub fn max_recursion_depth(mut self, depth: u8) -> Self {
        self.max_depth = depth.min(MAX_RECURSION_DEPTH);
        self
    }

    /// Builds the parser, returning the first packet (if any).
    pub fn build(self) -> Result<PacketParserResult<'a>> {
        PacketParser::from_buffered_reader(self.reader)
    }
}

/// What [`ParseInfo::run`] reports to each registered [`Callback`].
pub enum ParserEvent<'a> {
    /// A packet was parsed at the given recursion depth.
    Packet { packet: &'a Packet, depth: u8 },
}

/// What a [`Callback`] reports after handling (or declining) an
/// event.
///
/// Mirrors the `{OK, ERROR, FINISHED}` outcomes a single callback
/// produces, with `Err` standing in for `ERROR` (it already carries a
/// reason, which a bare variant wouldn't) and [`Disposition::Pass`]
/// making the "try the next handler" case explicit for stacked
/// dispatch.
pub enum Disposition {
    /// This callback handled the event; stop walking the stack for
    /// it and move on to the next event.
    Consumed,
    /// This callback has nothing to say about the event; dispatch
    /// falls through to the next callback down the stack. If every
    /// callback passes, the event goes unconsumed and parsing
    /// continues regardless -- an unconsumed event is not an error.
    Pass,
    /// Cleanly terminate the parse, as if the packet stream had
    /// ended after this event.
    Finished,
}

/// A handler invoked per packet by [`ParseInfo::run`].
///
/// [`ParseInfo`] holds a stack of these, dispatching every event to
/// each in registration order until one returns
/// [`Disposition::Consumed`] or [`Disposition::Finished`], or one
/// returns `Err` and aborts the whole parse. This lets independent
/// concerns share one traversal without coordinating directly with
/// each other -- e.g. a hashing callback registered below a signature
/// verification callback: the hashing one accumulates digest bytes
/// and always passes, letting the verification callback still see
/// (and act on) every event.
///
/// [`destroy`][Callback::destroy] runs exactly once per callback, on
/// every exit path -- stream exhaustion, an early `Finished`, or an
/// aborting error -- so a callback holding its own resources (an open
/// file, a hash context it owns outright) has one place to release
/// them regardless of how the parse ended.
pub trait Callback {
    /// Handles one packet.
    fn packet(&mut self, event: &ParserEvent) -> Result<Disposition>;

    /// Releases any resources this callback owns.
    ///
    /// Called once, after the parse has fully stopped (successfully
    /// or not). The default implementation does nothing.
    fn destroy(&mut self) {}
}

impl<F: FnMut(&ParserEvent) -> Result<Disposition>> Callback for F {
    fn packet(&mut self, event: &ParserEvent) -> Result<Disposition> {
        self(event)
    }
}

/// Drives a [`PacketParser`] to completion, dispatching each packet to
/// a stack of [`Callback`]s.
///
/// This is an event-driven alternative to consuming `PacketParser`
/// directly, for callers that process packets as they arrive -- one
/// or more at a time -- rather than building a [`crate::PacketPile`].
pub struct ParseInfo<'a> {
    result: Option<PacketParserResult<'a>>,
    callbacks: Vec<Box<dyn Callback + 'a>>,
}

impl<'a> ParseInfo<'a> {
    /// Wraps a parser (or its `EOF`) for driving, with an empty
    /// callback stack.
    pub fn new(result: PacketParserResult<'a>) -> Self {
        ParseInfo { result: Some(result), callbacks: Vec::new() }
    }

    /// Pushes a callback onto the stack.
    ///
    /// Callbacks are dispatched in the order they were pushed: the
    /// first one registered sees each event first, and only falls
    /// through to later ones if it returns
    /// [`Disposition::Pass`]. Mirrors how a reader-stack layer sits
    /// below the layers pushed after it.
    pub fn push_callback<C: Callback + 'a>(mut self, callback: C) -> Self {
        self.callbacks.push(Box::new(callback));
        self
    }

    /// Runs the registered callbacks once per packet, depth-first in
    /// stream order, until the stream ends, a callback reports
    /// [`Disposition::Finished`], or a callback errors out.
    ///
    /// Every registered callback's [`destroy`][Callback::destroy] hook
    /// runs before this returns, regardless of which of those three
    /// ways the parse ended.
    pub fn run(mut self) -> Result<()> {
        let outcome = self.drive();
        for callback in self.callbacks.iter_mut() {
            callback.destroy();
        }
        outcome
    }

    /// Runs a single callback, without needing [`push_callback`]
    /// first; equivalent to `self.push_callback(callback).run()`.
    pub fn for_each<C: Callback + 'a>(self, callback: C) -> Result<()> {
        self.push_callback(callback).run()
    }

    fn drive(&mut self) -> Result<()> {
        loop {
            match self.result.take() {
                Some(PacketParserResult::Some(pp)) => {
                    let depth = pp.depth;
                    let (packet, next) = pp.next()?;
                    let event = ParserEvent::Packet { packet: &packet, depth };
                    match self.dispatch(&event)? {
                        Disposition::Finished => return Ok(()),
                        Disposition::Consumed | Disposition::Pass => {}
                    }
                    self.result = Some(next);
                }
                Some(PacketParserResult::EOF(_)) | None => return Ok(()),
            }
        }
    }

    /// Walks the callback stack for one event, stopping at the first
    /// one that consumes it (or wants to finish).
    fn dispatch(&mut self, event: &ParserEvent) -> Result<Disposition> {
        for callback in self.callbacks.iter_mut() {
            match callback.packet(event)? {
                Disposition::Pass => continue,
                other => return Ok(other),
            }
        }
        Ok(Disposition::Pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_new_format_single_octet() {
        let data = [0xCBu8, 0x05, 1, 2, 3, 4, 5];
        let mut reader: Box<dyn BufferedReader<Cookie>> =
            Box::new(buffered_reader::BufferedReaderMemory::with_cookie(
                &data, Cookie::default()));
        let (tag, len) = read_header(&mut *reader).unwrap();
        assert_eq!(tag, Tag::Literal);
        assert_eq!(len, BodyLength::Full(5));
    }

    #[test]
    fn header_old_format_two_octet() {
        // Tag 2 (Signature), length-type 1 (two-octet length).
        let data = [0x89u8, 0x00, 0x03, 0xAA, 0xBB, 0xCC];
        let mut reader: Box<dyn BufferedReader<Cookie>> =
            Box::new(buffered_reader::BufferedReaderMemory::with_cookie(
                &data, Cookie::default()));
        let (tag, len) = read_header(&mut *reader).unwrap();
        assert_eq!(tag, Tag::Signature);
        assert_eq!(len, BodyLength::Full(3));
    }

    #[test]
    fn partial_body_lengths_concatenate() {
        // Literal data packet, two partial chunks of 1 byte, then a
        // final chunk of 1 byte.
        let data = [0xCBu8, 224, b'x', 224, b'y', 1, b'z'];
        let mut reader: Box<dyn BufferedReader<Cookie>> =
            Box::new(buffered_reader::BufferedReaderMemory::with_cookie(
                &data, Cookie::default()));
        let (tag, len) = read_header(&mut *reader).unwrap();
        assert_eq!(tag, Tag::Literal);
        let body = read_body(&mut reader, len, true).unwrap();
        assert_eq!(body, b"xyz");
    }

    #[test]
    fn marker_packet_roundtrip() {
        let mut data = vec![0xA8u8, 3];
        data.extend_from_slice(&packet::MARKER_BODY);
        let p = Packet::from_bytes(&data).unwrap();
        assert!(matches!(p, Packet::Marker(_)));
    }

    #[test]
    #[cfg(feature = "compression-deflate")]
    fn decompress_rejects_trailing_garbage() {
        use std::io::Write;
        let mut compressed = Vec::new();
        {
            let mut enc = flate2::write::ZlibEncoder::new(
                &mut compressed, flate2::Compression::default());
            enc.write_all(b"hello, world").unwrap();
        }
        // A clean stream round-trips.
        assert_eq!(decompress(crate::types::CompressionAlgorithm::Zlib, &compressed)
            .unwrap(), b"hello, world");

        // Appending garbage past the stream's logical end must fail
        // closed rather than being silently ignored.
        compressed.extend_from_slice(b"junk");
        let err = decompress(crate::types::CompressionAlgorithm::Zlib, &compressed)
            .unwrap_err();
        assert!(matches!(err, Error::BadCompression(_)), "{:?}", err);
    }

    #[test]
    fn document_signature_verifies_against_parsed_bytes() {
        use std::io::Write as _;
        use crate::packet::key::{Key4, Key, SecretParts, PrimaryRole};
        use crate::serialize::stream::{Message, Signer, LiteralWriter};

        let key4 = Key4::<SecretParts, _>::generate_ecc(true, crate::types::Curve::Ed25519)
            .unwrap();
        let key: Key<SecretParts, PrimaryRole> = key4.into();
        let keypair = key.into_keypair().unwrap();
        let public = keypair.public().clone();

        let mut buf = Vec::new();
        {
            let message = Message::new(&mut buf);
            let message = Signer::new(message, keypair).build().unwrap();
            let mut message = LiteralWriter::new(message).build().unwrap();
            message.write_all(b"hello, parsed world").unwrap();
            message.finalize().unwrap();
        }

        let packets = parse_packets(&buf, 0).unwrap();
        assert!(matches!(packets.first(), Some(Packet::OnePassSig(_))));
        assert!(matches!(packets.get(1), Some(Packet::Literal(_))));

        let sig = packets.iter().find_map(|p| match p {
            Packet::Signature(s) => Some(s),
            _ => None,
        }).expect("signature packet present");

        // The digest was computed from the bytes this test just
        // parsed, not recalled from when the crate itself produced
        // the signature.
        assert!(sig.verify(&public).unwrap());
    }

    #[test]
    fn document_signature_over_tampered_content_fails() {
        use std::io::Write as _;
        use crate::packet::key::{Key4, Key, SecretParts, PrimaryRole};
        use crate::serialize::stream::{Message, Signer, LiteralWriter};

        let key4 = Key4::<SecretParts, _>::generate_ecc(true, crate::types::Curve::Ed25519)
            .unwrap();
        let key: Key<SecretParts, PrimaryRole> = key4.into();
        let keypair = key.into_keypair().unwrap();
        let public = keypair.public().clone();

        let mut buf = Vec::new();
        {
            let message = Message::new(&mut buf);
            let message = Signer::new(message, keypair).build().unwrap();
            let mut message = LiteralWriter::new(message).build().unwrap();
            message.write_all(b"hello, parsed world").unwrap();
            message.finalize().unwrap();
        }

        // Flip a byte in the middle of the literal data packet's
        // content (well past the header octets every other test
        // relies on), leaving the packet framing intact.
        let needle = b"parsed";
        let at = buf.windows(needle.len()).position(|w| w == needle).unwrap();
        buf[at] ^= 0x01;

        let packets = parse_packets(&buf, 0).unwrap();
        let sig = packets.iter().find_map(|p| match p {
            Packet::Signature(s) => Some(s),
            _ => None,
        }).expect("signature packet present");
        assert!(!sig.verify(&public).unwrap());
    }

    #[test]
    fn unknown_tag_falls_back() {
        // New-format packet, tag 62 (private/experimental), 1-byte body.
        let data = [0xFFu8, 1, 0x42];
        let p = Packet::from_bytes(&data).unwrap();
        match p {
            Packet::Unknown(u) => assert_eq!(u.body(), &[0x42]),
            other => panic!("expected Unknown, got {:?}", other),
        }
    }

    fn two_literal_packets() -> Vec<u8> {
        use crate::serialize::Marshal;

        let mut buf = Vec::new();
        for content in [&b"first"[..], &b"second"[..]] {
            let mut l = packet::Literal::new(crate::packet::DataFormat::Binary);
            l.set_body(content.to_vec());
            let p: Packet = l.into();
            p.serialize(&mut buf).unwrap();
        }
        buf
    }

    #[test]
    fn for_each_visits_every_packet() {
        let data = two_literal_packets();
        let ppr = PacketParser::from_bytes(&data).unwrap();
        let mut seen = Vec::new();
        ParseInfo::new(ppr).for_each(|event: &ParserEvent| -> Result<Disposition> {
            let ParserEvent::Packet { packet, .. } = event;
            if let Packet::Literal(l) = packet {
                seen.push(l.body().to_vec());
            }
            Ok(Disposition::Pass)
        }).unwrap();
        assert_eq!(seen, vec![b"first".to_vec(), b"second".to_vec()]);
    }

    #[test]
    fn finished_stops_the_parse_early() {
        let data = two_literal_packets();
        let ppr = PacketParser::from_bytes(&data).unwrap();
        let mut count = 0;
        ParseInfo::new(ppr).for_each(|_event: &ParserEvent| -> Result<Disposition> {
            count += 1;
            Ok(Disposition::Finished)
        }).unwrap();
        assert_eq!(count, 1, "Finished on the first event must stop before the second");
    }

    #[test]
    fn error_aborts_and_propagates() {
        let data = two_literal_packets();
        let ppr = PacketParser::from_bytes(&data).unwrap();
        let err = ParseInfo::new(ppr).for_each(|_event: &ParserEvent| -> Result<Disposition> {
            Err(Error::CallbackAbort.into())
        }).unwrap_err();
        assert!(matches!(err, Error::CallbackAbort));
    }

    #[test]
    fn stacked_callbacks_fall_through_on_pass() {
        // A hashing-style callback that only observes (always
        // passes) sits below a callback that actually consumes the
        // event; both must run for every packet.
        let data = two_literal_packets();
        let ppr = PacketParser::from_bytes(&data).unwrap();

        let observed = std::cell::RefCell::new(0usize);
        let consumed = std::cell::RefCell::new(0usize);

        let info = ParseInfo::new(ppr)
            .push_callback(|_event: &ParserEvent| -> Result<Disposition> {
                *observed.borrow_mut() += 1;
                Ok(Disposition::Pass)
            })
            .push_callback(|_event: &ParserEvent| -> Result<Disposition> {
                *consumed.borrow_mut() += 1;
                Ok(Disposition::Consumed)
            });
        info.run().unwrap();

        assert_eq!(*observed.borrow(), 2);
        assert_eq!(*consumed.borrow(), 2);
    }

    #[test]
    fn destroy_runs_on_every_exit_path() {
        struct Counting<'a>(&'a std::cell::Cell<usize>);
        impl<'a> Callback for Counting<'a> {
            fn packet(&mut self, _event: &ParserEvent) -> Result<Disposition> {
                Ok(Disposition::Pass)
            }
            fn destroy(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let destroyed = std::cell::Cell::new(0usize);

        // Exit path 1: clean EOF.
        let data = two_literal_packets();
        let ppr = PacketParser::from_bytes(&data).unwrap();
        ParseInfo::new(ppr).push_callback(Counting(&destroyed)).run().unwrap();
        assert_eq!(destroyed.get(), 1);

        // Exit path 2: an aborting error.
        let ppr = PacketParser::from_bytes(&data).unwrap();
        let _ = ParseInfo::new(ppr)
            .push_callback(Counting(&destroyed))
            .push_callback(|_event: &ParserEvent| -> Result<Disposition> {
                Err(Error::CallbackAbort.into())
            })
            .run();
        assert_eq!(destroyed.get(), 2);
    }
}
