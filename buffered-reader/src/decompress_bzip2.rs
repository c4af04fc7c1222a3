use std::fmt;
use std::io;

use bzip2::read::BzDecoder;

use super::{buffered_reader_generic_read_impl, BufferedReader, BufferedReaderGeneric};

/// Decompresses a bzip2-compressed stream on the fly.
pub struct BufferedReaderBzip<T: BufferedReader<C>, C> {
    reader: BufferedReaderGeneric<BzDecoder<T>, C>,
}

impl<T: BufferedReader<()>> BufferedReaderBzip<T, ()> {
    /// Creates a new decompressing reader.
    pub fn new(reader: T) -> Self {
        Self::with_cookie(reader, ())
    }
}

impl<T: BufferedReader<C>, C> BufferedReaderBzip<T, C> {
    /// Like [`new`](Self::new), but sets the cookie.
    pub fn with_cookie(reader: T, cookie: C) -> Self {
        BufferedReaderBzip {
            reader: BufferedReaderGeneric::with_cookie(
                BzDecoder::new(reader), None, cookie),
        }
    }
}

impl<T: BufferedReader<C>, C> fmt::Debug for BufferedReaderBzip<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BufferedReaderBzip").finish()
    }
}

impl<T: BufferedReader<C>, C> io::Read for BufferedReaderBzip<T, C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        buffered_reader_generic_read_impl(self, buf)
    }
}

impl<T: BufferedReader<C>, C> BufferedReader<C> for BufferedReaderBzip<T, C> {
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
