use std::fmt;
use std::io;

use super::{buffered_reader_generic_read_impl, BufferedReader};

/// Wraps a `BufferedReader` so that consuming from the wrapper
/// doesn't consume from the underlying reader.
///
/// Used for speculative lookahead: e.g. the armor reader sniffs the
/// first line of input through a `BufferedReaderDup` to decide
/// whether it's looking at a `-----BEGIN PGP...` header before
/// committing to consuming anything, and a parser probing for a
/// partial-body-length continuation byte does the same.
pub struct BufferedReaderDup<T, C> {
    reader: T,
    // Bytes consumed through this layer that haven't been
    // re-delivered to the underlying reader yet.
    consumed: usize,
    cookie: C,
}

impl<T: BufferedReader<()>> BufferedReaderDup<T, ()> {
    /// Creates a new `BufferedReaderDup`.
    pub fn new(reader: T) -> Self {
        Self::with_cookie(reader, ())
    }
}

impl<T: BufferedReader<C>, C> BufferedReaderDup<T, C> {
    /// Like [`new`](Self::new), but sets the cookie.
    pub fn with_cookie(reader: T, cookie: C) -> Self {
        BufferedReaderDup { reader, consumed: 0, cookie }
    }

    /// Consumes the underlying reader for real, up to what has been
    /// consumed through this layer so far, and returns it.
    pub fn into_inner_consuming(mut self) -> T {
        self.reader.consume(self.consumed);
        self.reader
    }
}

impl<T: BufferedReader<C>, C> fmt::Debug for BufferedReaderDup<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BufferedReaderDup")
            .field("consumed", &self.consumed)
            .finish()
    }
}

impl<T: BufferedReader<C>, C> io::Read for BufferedReaderDup<T, C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        buffered_reader_generic_read_impl(self, buf)
    }
}

impl<T: BufferedReader<C>, C> BufferedReader<C> for BufferedReaderDup<T, C> {
    fn buffer(&self) -> &[u8] {
        &self.reader.buffer()[self.consumed..]
    }

    fn data(&mut self, amount: usize) -> io::Result<&[u8]> {
        let buffer = self.reader.data(self.consumed + amount)?;
        Ok(&buffer[self.consumed..])
    }

    fn data_hard(&mut self, amount: usize) -> io::Result<&[u8]> {
        let buffer = self.reader.data_hard(self.consumed + amount)?;
        Ok(&buffer[self.consumed..])
    }

    fn consume(&mut self, amount: usize) -> &[u8] {
        self.consumed += amount;
        &self.reader.buffer()[self.consumed - amount..]
    }

    fn into_inner<'b>(self: Box<Self>) -> Option<Box<dyn BufferedReader<C> + 'b>>
        where Self: 'b
    {
        Some(Box::new(self.reader))
    }

    fn get_mut(&mut self) -> Option<&mut dyn BufferedReader<C>> {
        Some(&mut self.reader)
    }

    fn get_ref(&self) -> Option<&dyn BufferedReader<C>> {
        Some(&self.reader)
    }

    fn cookie_set(&mut self, cookie: C) -> C {
        std::mem::replace(&mut self.cookie, cookie)
    }

    fn cookie_ref(&self) -> &C {
        &self.cookie
    }

    fn cookie_mut(&mut self) -> &mut C {
        &mut self.cookie
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::BufferedReaderMemory;

    #[test]
    fn peek_without_consuming() {
        let data = b"0123456789";
        let br = BufferedReaderMemory::new(&data[..]);
        let mut dup = BufferedReaderDup::new(br);
        assert_eq!(dup.data(4).unwrap(), b"0123");
        dup.consume(4);
        let inner = dup.into_inner_consuming();
        // The underlying reader was untouched until we explicitly
        // asked to replay what the dup consumed.
        assert_eq!(inner.buffer(), b"456789");
    }
}
