use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

use super::{buffered_reader_generic_read_impl, BufferedReader, BufferedReaderGeneric};

/// A `BufferedReader` that reads from a file, using portable
/// `std::fs::File` I/O.
///
/// This is the fallback implementation used on non-Unix platforms.
/// See [`file_unix`](super::file_unix) for a version that uses
/// `mmap` where available.
pub struct BufferedReaderFile<'a, C> {
    reader: BufferedReaderGeneric<File, C>,
    _p: std::marker::PhantomData<&'a ()>,
}

impl<'a> BufferedReaderFile<'a, ()> {
    /// Opens the given file for reading, using the default cookie.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Self::with_cookie(path, ())
    }
}

impl<'a, C> BufferedReaderFile<'a, C> {
    /// Opens the given file for reading with the given cookie.
    pub fn with_cookie<P: AsRef<Path>>(path: P, cookie: C) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(BufferedReaderFile {
            reader: BufferedReaderGeneric::with_cookie(file, None, cookie),
            _p: std::marker::PhantomData,
        })
    }
}

impl<'a, C> fmt::Debug for BufferedReaderFile<'a, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BufferedReaderFile").finish()
    }
}

impl<'a, C> io::Read for BufferedReaderFile<'a, C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        buffered_reader_generic_read_impl(self, buf)
    }
}

impl<'a, C> BufferedReader<C> for BufferedReaderFile<'a, C> {
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
