use std::fmt;
use std::io;

use flate2::read::{DeflateDecoder, ZlibDecoder};

use super::{buffered_reader_generic_read_impl, BufferedReader, BufferedReaderGeneric};

/// Decompresses a DEFLATE-compressed (RFC 1951) stream on the fly.
pub struct BufferedReaderDeflate<T: BufferedReader<C>, C> {
    reader: BufferedReaderGeneric<DeflateDecoder<T>, C>,
}

impl<T: BufferedReader<()>> BufferedReaderDeflate<T, ()> {
    /// Creates a new decompressing reader.
    pub fn new(reader: T) -> Self {
        Self::with_cookie(reader, ())
    }
}

impl<T: BufferedReader<C>, C> BufferedReaderDeflate<T, C> {
    /// Like [`new`](Self::new), but sets the cookie.
    pub fn with_cookie(reader: T, cookie: C) -> Self {
        BufferedReaderDeflate {
            reader: BufferedReaderGeneric::with_cookie(
                DeflateDecoder::new(reader), None, cookie),
        }
    }
}

impl<T: BufferedReader<C>, C> fmt::Debug for BufferedReaderDeflate<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BufferedReaderDeflate").finish()
    }
}

impl<T: BufferedReader<C>, C> io::Read for BufferedReaderDeflate<T, C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        buffered_reader_generic_read_impl(self, buf)
    }
}

impl<T: BufferedReader<C>, C> BufferedReader<C> for BufferedReaderDeflate<T, C> {
    fn buffer(&self) -> &[u8] {
        self.reader.buffer()
    }

    fn data(&mut self, amount: usize) -> io::Result<&[u8]> {
        self.reader.data(amount)
    }

    fn consume(&mut self, amount: usize) -> &[u8] {
        self.reader.consume(amount)
    }

    fn into_inner<'b>(self: Box<Self>) -> Option<Box<dyn BufferedReader<C> + 'b>>
        where Self: 'b
    {
        None
    }

    fn get_mut(&mut self) -> Option<&mut dyn BufferedReader<C>> {
        None
    }

    fn get_ref(&self) -> Option<&dyn BufferedReader<C>> {
        None
    }

    fn cookie_set(&mut self, cookie: C) -> C {
        self.reader.cookie_set(cookie)
    }

    fn cookie_ref(&self) -> &C {
        self.reader.cookie_ref()
    }

    fn cookie_mut(&mut self) -> &mut C {
        self.reader.cookie_mut()
    }
}

/// Decompresses a zlib-compressed (RFC 1950) stream on the fly.
pub struct BufferedReaderZlib<T: BufferedReader<C>, C> {
    reader: BufferedReaderGeneric<ZlibDecoder<T>, C>,
}

impl<T: BufferedReader<()>> BufferedReaderZlib<T, ()> {
    /// Creates a new decompressing reader.
    pub fn new(reader: T) -> Self {
        Self::with_cookie(reader, ())
    }
}

impl<T: BufferedReader<C>, C> BufferedReaderZlib<T, C> {
    /// Like [`new`](Self::new), but sets the cookie.
    pub fn with_cookie(reader: T, cookie: C) -> Self {
        BufferedReaderZlib {
            reader: BufferedReaderGeneric::with_cookie(
                ZlibDecoder::new(reader), None, cookie),
        }
    }
}

impl<T: BufferedReader<C>, C> fmt::Debug for BufferedReaderZlib<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BufferedReaderZlib").finish()
    }
}

impl<T: BufferedReader<C>, C> io::Read for BufferedReaderZlib<T, C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        buffered_reader_generic_read_impl(self, buf)
    }
}

impl<T: BufferedReader<C>, C> BufferedReader<C> for BufferedReaderZlib<T, C> {
    fn buffer(&self) -> &[u8] {
        self.reader.buffer()
    }

    fn data(&mut self, amount: usize) -> io::Result<&[u8]> {
        self.reader.data(amount)
    }

    fn consume(&mut self, amount: usize) -> &[u8] {
        self.reader.consume(amount)
    }

    fn into_inner<'b>(self: Box<Self>) -> Option<Box<dyn BufferedReader<C> + 'b>>
        where Self: 'b
    {
        None
    }

    fn get_mut(&mut self) -> Option<&mut dyn BufferedReader<C>> {
        None
    }

    fn get_ref(&self) -> Option<&dyn BufferedReader<C>> {
        None
    }

    fn cookie_set(&mut self, cookie: C) -> C {
        self.reader.cookie_set(cookie)
    }

    fn cookie_ref(&self) -> &C {
        self.reader.cookie_ref()
    }

    fn cookie_mut(&mut self) -> &mut C {
        self.reader.cookie_mut()
    }
}
