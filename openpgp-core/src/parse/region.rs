//! Bounds reads to a packet body's declared length.
//!
//! A [`Region`] wraps [`buffered_reader::BufferedReaderLimitor`] to
//! give the concept a name at the parser layer: once a packet's
//! header announces a body of `N` bytes, everything this crate reads
//! while parsing that body goes through a `Region` limited to `N`,
//! so a packet can never accidentally consume bytes belonging to its
//! successor.

use buffered_reader::{BufferedReader, BufferedReaderLimitor};

use super::Cookie;

/// A reader limited to a packet body's declared length.
pub(crate) struct Region<'a> {
    inner: Box<BufferedReaderLimitor<Box<dyn BufferedReader<Cookie> + 'a>, Cookie>>,
}

impl<'a> Region<'a> {
    /// Limits `reader` to exactly `len` bytes.
    pub(crate) fn new(reader: Box<dyn BufferedReader<Cookie> + 'a>, len: u64) -> Self {
        Region { inner: Box::new(
            BufferedReaderLimitor::with_cookie(reader, len, Cookie::default())) }
    }

    /// Returns whether the region has been read to its end.
    pub(crate) fn at_end(&self) -> bool {
        self.inner.remaining() == Some(0)
    }

    /// Consumes the region, returning the underlying reader.
    pub(crate) fn into_inner(self) -> Box<dyn BufferedReader<Cookie> + 'a> {
        BufferedReader::into_inner(self.inner)
            .expect("Region always wraps an inner reader")
    }
}

impl<'a> std::ops::Deref for Region<'a> {
    type Target = BufferedReaderLimitor<Box<dyn BufferedReader<Cookie> + 'a>, Cookie>;
    fn deref(&self) -> &Self::Target { &self.inner }
}

impl<'a> std::ops::DerefMut for Region<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target { &mut self.inner }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_reports_end() {
        let data: &[u8] = b"hello world";
        let inner: Box<dyn BufferedReader<Cookie>> =
            Box::new(buffered_reader::BufferedReaderMemory::with_cookie(
                data, Cookie::default()));
        let mut region = Region::new(inner, 5);
        assert!(!region.at_end());
        let _ = region.data_consume_hard(5).unwrap();
        assert!(region.at_end());
    }
}
