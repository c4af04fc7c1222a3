//! A stack of writers, the inverse of [`crate::parse`]'s reader stack.
//!
//! Composing an OpenPGP message is a matter of stacking writers:
//! compression wraps encryption wraps the literal data writer, each
//! layer only knowing how to transform bytes handed to it by the
//! layer above. [`stream`](super::stream) and
//! [`padding`](super::padding) build on top of the primitives here.

use std::fmt;
use std::io::{self, Write};

use crate::{Error, Result};
use crate::types::{CompressionAlgorithm, SymmetricAlgorithm};

/// A writer that can be stacked on top of another writer.
///
/// Every writer in a stack owns (or, for [`Stackable::pop`]-capable
/// writers, temporarily detaches from) the one beneath it, and tracks
/// how many bytes of *logical* (pre-transformation) content have
/// passed through it so that callers like
/// [`padding::Padder`](super::padding::Padder) can make padding
/// decisions without re-deriving that count themselves.
pub(crate) trait Stackable<'a, C>: Write + fmt::Debug {
    /// Finalizes this writer (flushing any buffered or trailing
    /// state) and recovers the inner writer, consuming `self`.
    ///
    /// Returns `Ok(None)` if this was the bottom of the stack (e.g.
    /// [`Generic`] wrapping a non-stacked `io::Write`).
    fn into_inner(self: Box<Self>) -> Result<Option<Stack<'a, C>>>;

    /// Detaches and returns the inner writer, leaving this writer with
    /// none.
    ///
    /// Only [`super::stream::Signer`] supports this: it needs to stop
    /// passing bytes through while the literal packet header around
    /// it is written directly to the unsigned stream. Every other
    /// layer always has exactly one inner writer and rejects this.
    fn pop(&mut self) -> Result<Option<Stack<'a, C>>> {
        Err(Error::InvalidOperation(
            "this writer does not support being popped".into()).into())
    }

    /// Reattaches an inner writer previously removed with
    /// [`Stackable::pop`].
    fn mount(&mut self, _new: Stack<'a, C>) {
        panic!("this writer does not support mount");
    }

    /// Returns a reference to the inner writer, if any.
    fn inner_ref(&self) -> Option<&(dyn Stackable<'a, C> + 'a)> {
        None
    }

    /// Returns a mutable reference to the inner writer, if any.
    fn inner_mut(&mut self) -> Option<&mut (dyn Stackable<'a, C> + 'a)> {
        None
    }

    /// Returns a reference to the writer's cookie.
    fn cookie_ref(&self) -> &C;

    /// Returns a mutable reference to the writer's cookie.
    fn cookie_mut(&mut self) -> &mut C;

    /// Replaces the writer's cookie, returning the old value.
    fn cookie_set(&mut self, cookie: C) -> C {
        std::mem::replace(self.cookie_mut(), cookie)
    }

    /// Returns the number of bytes of logical content written so far.
    fn position(&self) -> u64;
}

/// An owned, boxed [`Stackable`].
pub(crate) type Stack<'a, C> = Box<dyn Stackable<'a, C> + 'a>;

fn to_io_error(e: Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

/// The bottom of a writer stack: wraps a plain [`io::Write`].
pub(crate) struct Generic<W, C> {
    inner: W,
    cookie: C,
    position: u64,
}

impl<W: fmt::Debug, C> fmt::Debug for Generic<W, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Generic")
            .field("inner", &self.inner)
            .field("position", &self.position)
            .finish()
    }
}

impl<W: Write, C> Generic<W, C> {
    pub(crate) fn new<'a>(inner: W, cookie: C) -> Stack<'a, C>
        where W: 'a, C: 'a
    {
        Box::new(Generic { inner, cookie, position: 0 })
    }
}

impl<W: Write, C> Write for Generic<W, C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<'a, W: Write + 'a, C: 'a> Stackable<'a, C> for Generic<W, C> {
    fn into_inner(self: Box<Self>) -> Result<Option<Stack<'a, C>>> {
        Ok(None)
    }

    fn cookie_ref(&self) -> &C {
        &self.cookie
    }

    fn cookie_mut(&mut self) -> &mut C {
        &mut self.cookie
    }

    fn position(&self) -> u64 {
        self.position
    }
}

/// A writer that passes bytes through unchanged.
///
/// Used where a layer (e.g. [`CompressionAlgorithm::Uncompressed`])
/// is conceptually present but does nothing beyond bookkeeping.
pub(crate) struct Identity<'a, C> {
    inner: Stack<'a, C>,
    cookie: C,
    position: u64,
}

impl<'a, C> fmt::Debug for Identity<'a, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Identity").field("position", &self.position).finish()
    }
}

impl<'a, C: 'a> Identity<'a, C> {
    pub(crate) fn new(inner: Stack<'a, C>, cookie: C) -> Stack<'a, C> {
        Box::new(Identity { inner, cookie, position: 0 })
    }
}

impl<'a, C> Write for Identity<'a, C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<'a, C: 'a> Stackable<'a, C> for Identity<'a, C> {
    fn into_inner(self: Box<Self>) -> Result<Option<Stack<'a, C>>> {
        Ok(Some(self.inner))
    }

    fn inner_ref(&self) -> Option<&(dyn Stackable<'a, C> + 'a)> {
        Some(&*self.inner)
    }

    fn inner_mut(&mut self) -> Option<&mut (dyn Stackable<'a, C> + 'a)> {
        Some(&mut *self.inner)
    }

    fn cookie_ref(&self) -> &C {
        &self.cookie
    }

    fn cookie_mut(&mut self) -> &mut C {
        &mut self.cookie
    }

    fn position(&self) -> u64 {
        self.position
    }
}

/// Buffers writes and frames them as RFC 4880 §4.2.2 partial body
/// length packets: each full buffer is flushed as a chunk whose
/// length is the chosen fixed power of two, with the final, possibly
/// short, chunk framed as a plain (determinate) length once the
/// writer is finalized.
pub(crate) struct PartialBodyFilter<'a, C> {
    inner: Stack<'a, C>,
    buffer: Vec<u8>,
    // Chunk size as a power of two, fixed for the filter's lifetime.
    log2_chunk_size: u8,
    cookie: C,
}

impl<'a, C> fmt::Debug for PartialBodyFilter<'a, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PartialBodyFilter")
            .field("buffered", &self.buffer.len())
            .field("log2_chunk_size", &self.log2_chunk_size)
            .finish()
    }
}

impl<'a, C: 'a> PartialBodyFilter<'a, C> {
    /// `log2_chunk_size` must be in `0..=30`, per the wire format.
    pub(crate) fn new(inner: Stack<'a, C>, cookie: C, log2_chunk_size: u8) -> Stack<'a, C> {
        let chunk_size = 1usize << log2_chunk_size;
        Box::new(PartialBodyFilter {
            inner,
            buffer: Vec::with_capacity(chunk_size),
            log2_chunk_size,
            cookie,
        })
    }

    fn chunk_size(&self) -> usize {
        1 << self.log2_chunk_size
    }

    fn flush_full_chunks(&mut self) -> io::Result<()> {
        let chunk_size = self.chunk_size();
        while self.buffer.len() >= chunk_size {
            super::write_partial_length(&mut self.inner, self.log2_chunk_size)
                .map_err(to_io_error)?;
            self.inner.write_all(&self.buffer[..chunk_size])?;
            self.buffer.drain(..chunk_size);
        }
        Ok(())
    }
}

impl<'a, C> Write for PartialBodyFilter<'a, C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.flush_full_chunks()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<'a, C: 'a> Stackable<'a, C> for PartialBodyFilter<'a, C> {
    fn into_inner(mut self: Box<Self>) -> Result<Option<Stack<'a, C>>> {
        super::write_length(&mut self.inner, self.buffer.len())?;
        self.inner.write_all(&self.buffer)?;
        Ok(Some(self.inner))
    }

    fn inner_ref(&self) -> Option<&(dyn Stackable<'a, C> + 'a)> {
        Some(&*self.inner)
    }

    fn inner_mut(&mut self) -> Option<&mut (dyn Stackable<'a, C> + 'a)> {
        Some(&mut *self.inner)
    }

    fn cookie_ref(&self) -> &C {
        &self.cookie
    }

    fn cookie_mut(&mut self) -> &mut C {
        &mut self.cookie
    }

    fn position(&self) -> u64 {
        self.inner.position() + self.buffer.len() as u64
    }
}

/// The compression level passed to the underlying codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct CompressionLevel(u32);

impl CompressionLevel {
    pub(crate) fn none() -> Self { CompressionLevel(0) }
    pub(crate) fn default() -> Self { CompressionLevel(6) }
    pub(crate) fn best() -> Self { CompressionLevel(9) }
}

enum Inner<'a, C> {
    Uncompressed(Stack<'a, C>),
    #[cfg(feature = "compression-deflate")]
    Zip(flate2::write::DeflateEncoder<Stack<'a, C>>),
    #[cfg(feature = "compression-deflate")]
    Zlib(flate2::write::ZlibEncoder<Stack<'a, C>>),
    #[cfg(feature = "compression-bzip2")]
    BZip2(bzip2::write::BzEncoder<Stack<'a, C>>),
}

/// Compresses written data before passing it to the inner writer.
///
/// Supports the algorithms this crate can decompress
/// ([`crate::parse::decompress`]): DEFLATE, zlib, and BZip2, each
/// gated on the same Cargo feature as the read-side decoder.
pub(crate) struct Compressor<'a, C> {
    inner: Inner<'a, C>,
    cookie: C,
    position: u64,
}

impl<'a, C> fmt::Debug for Compressor<'a, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Compressor").field("position", &self.position).finish()
    }
}

impl<'a, C: 'a> Compressor<'a, C> {
    pub(crate) fn new(algo: CompressionAlgorithm, level: CompressionLevel, cookie: C,
                       inner: Stack<'a, C>)
        -> Result<Stack<'a, C>>
    {
        use CompressionAlgorithm::*;
        let inner = match algo {
            Uncompressed => Inner::Uncompressed(inner),
            Zip => {
                #[cfg(feature = "compression-deflate")]
                { Inner::Zip(flate2::write::DeflateEncoder::new(
                    inner, flate2::Compression::new(level.0))) }
                #[cfg(not(feature = "compression-deflate"))]
                return Err(Error::UnsupportedAlgorithm(format!("compression algorithm {:?}", algo)).into());
            }
            Zlib => {
                #[cfg(feature = "compression-deflate")]
                { Inner::Zlib(flate2::write::ZlibEncoder::new(
                    inner, flate2::Compression::new(level.0))) }
                #[cfg(not(feature = "compression-deflate"))]
                return Err(Error::UnsupportedAlgorithm(format!("compression algorithm {:?}", algo)).into());
            }
            BZip2 => {
                #[cfg(feature = "compression-bzip2")]
                { Inner::BZip2(bzip2::write::BzEncoder::new(
                    inner, bzip2::Compression::new(level.0))) }
                #[cfg(not(feature = "compression-bzip2"))]
                return Err(Error::UnsupportedAlgorithm(format!("compression algorithm {:?}", algo)).into());
            }
            _ => return Err(Error::UnsupportedAlgorithm(format!("compression algorithm {:?}", algo)).into()),
        };
        Ok(Box::new(Compressor { inner, cookie, position: 0 }))
    }
}

impl<'a, C> Write for Compressor<'a, C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = match &mut self.inner {
            Inner::Uncompressed(w) => w.write(buf)?,
            #[cfg(feature = "compression-deflate")]
            Inner::Zip(w) => w.write(buf)?,
            #[cfg(feature = "compression-deflate")]
            Inner::Zlib(w) => w.write(buf)?,
            #[cfg(feature = "compression-bzip2")]
            Inner::BZip2(w) => w.write(buf)?,
        };
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            Inner::Uncompressed(w) => w.flush(),
            #[cfg(feature = "compression-deflate")]
            Inner::Zip(w) => w.flush(),
            #[cfg(feature = "compression-deflate")]
            Inner::Zlib(w) => w.flush(),
            #[cfg(feature = "compression-bzip2")]
            Inner::BZip2(w) => w.flush(),
        }
    }
}

impl<'a, C: 'a> Stackable<'a, C> for Compressor<'a, C> {
    fn into_inner(self: Box<Self>) -> Result<Option<Stack<'a, C>>> {
        let inner = match self.inner {
            Inner::Uncompressed(w) => w,
            #[cfg(feature = "compression-deflate")]
            Inner::Zip(w) => w.finish()?,
            #[cfg(feature = "compression-deflate")]
            Inner::Zlib(w) => w.finish()?,
            #[cfg(feature = "compression-bzip2")]
            Inner::BZip2(w) => w.finish()?,
        };
        Ok(Some(inner))
    }

    fn cookie_ref(&self) -> &C {
        &self.cookie
    }

    fn cookie_mut(&mut self) -> &mut C {
        &mut self.cookie
    }

    fn position(&self) -> u64 {
        self.position
    }
}

const MDC_HEADER: [u8; 2] = [0xD3, 0x14];

/// Encrypts written data using OpenPGP-CFB (the mode used by the
/// SEIP packet), emitting the random prefix on construction and the
/// MDC trailer when finalized.
///
/// See [Section 5.13 of RFC 4880] for the packet format and
/// [Section 13.9] for the CFB construction: unlike the legacy SED
/// packet, SEIP does not resynchronize the cipher after the prefix,
/// so the prefix, the plaintext, and the trailing MDC header are all
/// just one continuous CFB stream.
///
///   [Section 5.13 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.13
///   [Section 13.9]: https://tools.ietf.org/html/rfc4880#section-13.9
pub(crate) struct Encryptor<'a, C> {
    inner: Stack<'a, C>,
    cookie: C,
    position: u64,
    cipher: crate::crypto::symmetric::Context,
    iv: Vec<u8>,
    hash: crate::crypto::hash::Context,
}

impl<'a, C: 'a> Encryptor<'a, C> {
    pub(crate) fn new(sym_algo: SymmetricAlgorithm, session_key: &[u8], cookie: C,
                       mut inner: Stack<'a, C>)
        -> Result<Stack<'a, C>>
    {
        let block_size = sym_algo.block_size()?;
        let mut cipher = crate::crypto::symmetric::Context::new(sym_algo, session_key)?;
        let mut iv = vec![0u8; block_size];

        let mut prefix = vec![0u8; block_size + 2];
        crate::crypto::random(&mut prefix[..block_size]);
        prefix[block_size] = prefix[block_size - 2];
        prefix[block_size + 1] = prefix[block_size - 1];

        let mut hash = crate::types::HashAlgorithm::SHA1.context()?;
        hash.update(&prefix);

        let mut ciphertext = vec![0u8; prefix.len()];
        cipher.encrypt(&mut iv, &prefix, &mut ciphertext)?;
        inner.write_all(&ciphertext)?;

        Ok(Box::new(Encryptor { inner, cookie, position: 0, cipher, iv, hash }))
    }
}

impl<'a, C> fmt::Debug for Encryptor<'a, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Encryptor").field("position", &self.position).finish()
    }
}

impl<'a, C> Write for Encryptor<'a, C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.hash.update(buf);
        let mut ciphertext = vec![0u8; buf.len()];
        self.cipher.encrypt(&mut self.iv, buf, &mut ciphertext).map_err(to_io_error)?;
        self.inner.write_all(&ciphertext)?;
        self.position += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<'a, C: 'a> Stackable<'a, C> for Encryptor<'a, C> {
    fn into_inner(mut self: Box<Self>) -> Result<Option<Stack<'a, C>>> {
        self.hash.update(&MDC_HEADER);
        let mut digest = [0u8; 20];
        self.hash.digest(&mut digest[..]);

        let mut trailer = Vec::with_capacity(22);
        trailer.extend_from_slice(&MDC_HEADER);
        trailer.extend_from_slice(&digest);

        let mut ciphertext = vec![0u8; trailer.len()];
        self.cipher.encrypt(&mut self.iv, &trailer, &mut ciphertext)?;
        self.inner.write_all(&ciphertext)?;
        Ok(Some(self.inner))
    }

    fn cookie_ref(&self) -> &C {
        &self.cookie
    }

    fn cookie_mut(&mut self) -> &mut C {
        &mut self.cookie
    }

    fn position(&self) -> u64 {
        self.position
    }
}
