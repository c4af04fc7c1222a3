use std::fmt;
use std::io;

use super::{buffered_reader_generic_read_impl, BufferedReader};

/// A `BufferedReader` that is always at EOF.
///
/// Used to cap a reader stack: pushing a `BufferedReaderEOF` on top
/// of a stack makes the stack appear empty without having to unwind
/// or special-case the layers underneath, e.g. once a container
/// packet's region has been fully consumed and the packet parser
/// wants a handle on "no more data" to hand to a nested parser.
pub struct BufferedReaderEOF<C> {
    cookie: C,
}

impl BufferedReaderEOF<()> {
    /// Creates a new `BufferedReaderEOF` with the default cookie.
    pub fn new() -> Self {
        Self::with_cookie(())
    }
}

impl<C> BufferedReaderEOF<C> {
    /// Creates a new `BufferedReaderEOF` with the given cookie.
    pub fn with_cookie(cookie: C) -> Self {
        BufferedReaderEOF { cookie }
    }
}

impl Default for BufferedReaderEOF<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for BufferedReaderEOF<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BufferedReaderEOF").finish()
    }
}

impl<C> io::Read for BufferedReaderEOF<C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        buffered_reader_generic_read_impl(self, buf)
    }
}

impl<C> BufferedReader<C> for BufferedReaderEOF<C> {
    fn buffer(&self) -> &[u8] {
        &[]
    }

    fn data(&mut self, _amount: usize) -> io::Result<&[u8]> {
        Ok(&[])
    }

    fn consume(&mut self, amount: usize) -> &[u8] {
        assert_eq!(amount, 0, "can't consume from a reader that is always at EOF");
        &[]
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
    fn always_empty() {
        let mut eof: BufferedReaderEOF<()> = BufferedReaderEOF::new();
        assert_eq!(eof.data(10).unwrap(), &[] as &[u8]);
        assert_eq!(eof.data_eof().unwrap(), &[] as &[u8]);
    }
}
