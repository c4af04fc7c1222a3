use std::cmp;
use std::fmt;
use std::io;

use super::{buffered_reader_generic_read_impl, BufferedReader};

/// A `BufferedReader` specialized for a contiguous slice of memory.
///
/// Unlike [`BufferedReaderGeneric`](super::BufferedReaderGeneric),
/// this never copies: `data()` always returns (a suffix of) the
/// caller-provided slice directly.
pub struct BufferedReaderMemory<'a, C> {
    buffer: &'a [u8],
    cookie: C,
}

impl<'a> BufferedReaderMemory<'a, ()> {
    /// Creates a new `BufferedReaderMemory` with the default cookie.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self::with_cookie(buffer, ())
    }
}

impl<'a, C> BufferedReaderMemory<'a, C> {
    /// Creates a new `BufferedReaderMemory` with the given cookie.
    pub fn with_cookie(buffer: &'a [u8], cookie: C) -> Self {
        BufferedReaderMemory { buffer, cookie }
    }
}

impl<'a, C> fmt::Debug for BufferedReaderMemory<'a, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BufferedReaderMemory")
            .field("buffer", &self.buffer.len())
            .finish()
    }
}

impl<'a, C> io::Read for BufferedReaderMemory<'a, C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        buffered_reader_generic_read_impl(self, buf)
    }
}

impl<'a, C> BufferedReader<C> for BufferedReaderMemory<'a, C> {
    fn buffer(&self) -> &[u8] {
        self.buffer
    }

    fn data(&mut self, _amount: usize) -> io::Result<&[u8]> {
        Ok(self.buffer)
    }

    fn data_eof(&mut self) -> io::Result<&[u8]> {
        Ok(self.buffer)
    }

    fn consume(&mut self, amount: usize) -> &[u8] {
        assert!(amount <= self.buffer.len());
        self.buffer = &self.buffer[amount..];
        self.buffer
    }

    fn data_consume(&mut self, amount: usize) -> io::Result<&[u8]> {
        let amount = cmp::min(amount, self.buffer.len());
        Ok(self.consume(amount))
    }

    fn steal(&mut self, amount: usize) -> io::Result<Vec<u8>> {
        if self.buffer.len() < amount {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof,
                                       "unexpected EOF"));
        }
        let (head, tail) = self.buffer.split_at(amount);
        self.buffer = tail;
        Ok(head.to_vec())
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

    #[test]
    fn zero_copy() {
        let data = b"0123456789";
        let mut br = BufferedReaderMemory::new(&data[..]);
        let a = br.data(4).unwrap().as_ptr();
        let b = br.buffer().as_ptr();
        assert_eq!(a, b);
    }
}
