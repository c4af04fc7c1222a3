use std::cmp;
use std::fmt;
use std::io;
use std::io::Read;

use super::{buffered_reader_generic_read_impl, BufferedReader};

/// Wraps an arbitrary [`Read`]er so that it can be used as a
/// [`BufferedReader`].
///
/// This is the bottom of most reader stacks: a file, a socket, or an
/// in-memory cursor that doesn't already implement `BufferedReader`
/// itself.
pub struct BufferedReaderGeneric<T: Read, C> {
    buffer: Vec<u8>,
    // Position of the next unconsumed byte in `buffer`.
    cursor: usize,
    // Set once `reader` has returned EOF or an error.
    error: Option<io::Error>,
    eof: bool,
    reader: T,
    cookie: C,
}

impl<T: Read, C> fmt::Debug for BufferedReaderGeneric<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BufferedReaderGeneric")
            .field("buffer", &(self.buffer.len() - self.cursor))
            .field("eof", &self.eof)
            .finish()
    }
}

impl<T: Read> BufferedReaderGeneric<T, ()> {
    /// Creates a new `BufferedReaderGeneric` with the default cookie.
    pub fn new(reader: T, preferred_chunk_size: Option<usize>) -> Self {
        Self::with_cookie(reader, preferred_chunk_size, ())
    }
}

impl<T: Read, C> BufferedReaderGeneric<T, C> {
    /// Creates a new `BufferedReaderGeneric` with the given cookie.
    pub fn with_cookie(reader: T, preferred_chunk_size: Option<usize>,
                        cookie: C) -> Self {
        BufferedReaderGeneric {
            buffer: Vec::with_capacity(
                preferred_chunk_size.unwrap_or(super::DEFAULT_BUF_SIZE)),
            cursor: 0,
            error: None,
            eof: false,
            reader,
            cookie,
        }
    }

    /// Returns a reference to the wrapped reader.
    pub fn reader_ref(&self) -> &T {
        &self.reader
    }

    /// Returns a mutable reference to the wrapped reader.
    pub fn reader_mut(&mut self) -> &mut T {
        &mut self.reader
    }

    /// Consumes `self`, returning the wrapped reader.
    pub fn into_reader(self) -> T {
        self.reader
    }

    // Ensures that `self.buffer` has at least `amount` bytes of
    // unconsumed data, short reads excepted (EOF, a saved error).
    fn fill(&mut self, amount: usize) -> io::Result<()> {
        if self.eof || self.error.is_some() {
            return Ok(());
        }

        // Compact: drop already-consumed data so the buffer doesn't
        // grow without bound on a long-lived stream.
        if self.cursor > 0 {
            self.buffer.drain(..self.cursor);
            self.cursor = 0;
        }

        while self.buffer.len() < amount {
            let start = self.buffer.len();
            let want = cmp::max(amount - start, super::DEFAULT_BUF_SIZE);
            self.buffer.resize(start + want, 0);

            loop {
                match self.reader.read(&mut self.buffer[start..]) {
                    Ok(0) => {
                        self.buffer.truncate(start);
                        self.eof = true;
                        return Ok(());
                    }
                    Ok(n) => {
                        self.buffer.truncate(start + n);
                        break;
                    }
                    Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {
                        continue;
                    }
                    Err(e) => {
                        self.buffer.truncate(start);
                        self.error = Some(io::Error::new(e.kind(),
                                                          e.to_string()));
                        return Ok(());
                    }
                }
            }
        }

        Ok(())
    }
}

impl<T: Read, C> io::Read for BufferedReaderGeneric<T, C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        buffered_reader_generic_read_impl(self, buf)
    }
}

impl<T: Read, C> BufferedReader<C> for BufferedReaderGeneric<T, C> {
    fn buffer(&self) -> &[u8] {
        &self.buffer[self.cursor..]
    }

    fn data(&mut self, amount: usize) -> io::Result<&[u8]> {
        self.fill(amount)?;
        if let Some(ref e) = self.error {
            if self.buffer.len() - self.cursor == 0 {
                return Err(io::Error::new(e.kind(), e.to_string()));
            }
        }
        Ok(&self.buffer[self.cursor..])
    }

    fn consume(&mut self, amount: usize) -> &[u8] {
        assert!(self.cursor + amount <= self.buffer.len());
        self.cursor += amount;
        &self.buffer[self.cursor - amount..]
    }

    fn into_inner<'a>(self: Box<Self>) -> Option<Box<dyn BufferedReader<C> + 'a>>
        where Self: 'a
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
    fn buffer_grows_and_compacts() {
        let data = b"0123456789".to_vec();
        let mut br = BufferedReaderGeneric::new(&data[..], None);
        assert_eq!(br.data(4).unwrap(), b"0123");
        br.consume(4);
        // After consuming, a subsequent fill must not re-read what's
        // already been handed out.
        assert_eq!(br.data(4).unwrap(), b"4567");
    }
}
