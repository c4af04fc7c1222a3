use std::fmt;
use std::io;

use super::{buffered_reader_generic_read_impl, BufferedReader};

/// Reserves the trailing `reserve` bytes of the substrate's data,
/// making them invisible to the layer on top.
///
/// This is used when a fixed-size trailer (e.g. the final MDC hash,
/// or an armor CRC-24) has to be peeled off a stream without knowing
/// in advance exactly where the body ends: the body-parsing layer
/// sees everything except the last `reserve` bytes, and once it hits
/// what looks like EOF, the reserved tail can be read off separately
/// with [`reserved`](BufferedReaderReserve::reserved).
///
/// Requires buffering the whole substrate up to EOF, since the
/// boundary can't be known until then.
pub struct BufferedReaderReserve<T, C> {
    reader: T,
    reserve: usize,
    cookie: C,
}

impl<T: BufferedReader<()>> BufferedReaderReserve<T, ()> {
    /// Creates a new reservation of `reserve` trailing bytes.
    pub fn new(reader: T, reserve: usize) -> Self {
        Self::with_cookie(reader, reserve, ())
    }
}

impl<T: BufferedReader<C>, C> BufferedReaderReserve<T, C> {
    /// Like [`new`](Self::new), but sets the cookie.
    pub fn with_cookie(reader: T, reserve: usize, cookie: C) -> Self {
        BufferedReaderReserve { reader, reserve, cookie }
    }

    // The amount of `self.reader`'s buffered data that is visible,
    // given that `self.reserve` bytes must stay hidden.  Forces
    // buffering to EOF the first time this is called.
    fn visible_len(&mut self) -> io::Result<usize> {
        let total = self.reader.data_eof()?.len();
        Ok(total.saturating_sub(self.reserve))
    }

    /// Returns the reserved trailing bytes.
    ///
    /// Only meaningful once the visible portion has been entirely
    /// consumed.
    pub fn reserved(&mut self) -> io::Result<&[u8]> {
        let total = self.reader.data_eof()?.len();
        let visible = total.saturating_sub(self.reserve);
        Ok(&self.reader.buffer()[visible..])
    }
}

impl<T: BufferedReader<C>, C> fmt::Debug for BufferedReaderReserve<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BufferedReaderReserve")
            .field("reserve", &self.reserve)
            .finish()
    }
}

impl<T: BufferedReader<C>, C> io::Read for BufferedReaderReserve<T, C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        buffered_reader_generic_read_impl(self, buf)
    }
}

impl<T: BufferedReader<C>, C> BufferedReader<C> for BufferedReaderReserve<T, C> {
    fn buffer(&self) -> &[u8] {
        let buffer = self.reader.buffer();
        &buffer[..buffer.len().saturating_sub(self.reserve)]
    }

    fn data(&mut self, _amount: usize) -> io::Result<&[u8]> {
        // The boundary between visible and reserved bytes can only be
        // known once the substrate has hit EOF, so every call forces
        // full buffering; the requested `amount` can't shrink that.
        let visible = self.visible_len()?;
        Ok(&self.reader.buffer()[..visible])
    }

    fn consume(&mut self, amount: usize) -> &[u8] {
        self.reader.consume(amount)
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
    fn hides_trailing_bytes() {
        let data = b"0123456789";
        let br = BufferedReaderMemory::new(&data[..]);
        let mut r = BufferedReaderReserve::new(br, 3);
        assert_eq!(r.data_eof().unwrap(), b"0123456");
        assert_eq!(r.reserved().unwrap(), b"789");
    }
}
