use std::cmp;
use std::fmt;
use std::io;

use super::{buffered_reader_generic_read_impl, BufferedReader};

/// Bounds a stacked `BufferedReader` to a sub-region of its substrate.
///
/// This is the mechanism a packet parser uses to carve out a packet's
/// or sub-packet's body: every `data`/`consume` call is clamped to
/// what remains of the region, so the packet decoder on top of this
/// layer can never read into (or past) whatever follows.
///
/// A region is either of a known, fixed length, or *indeterminate*
/// (it runs to the end of its substrate — used for old-format
/// packets whose length wasn't recorded, and for the trailing chunk
/// of a partial-body-length stream). `length_read` tracks how many
/// bytes have actually been consumed through this layer so far;
/// `last_read` is the size of the most recent successful pull. Both
/// are exposed so that a caller can check, on exiting the region,
/// that exactly as much was consumed as was promised.
pub struct BufferedReaderLimitor<T, C> {
    reader: T,
    limit: Option<u64>,
    length_read: u64,
    last_read: usize,
    cookie: C,
}

impl<T: BufferedReader<()>> BufferedReaderLimitor<T, ()> {
    /// Creates a new, fixed-length region bounded to `limit` bytes.
    pub fn new(reader: T, limit: u64) -> Self {
        Self::with_cookie(reader, limit, ())
    }

    /// Creates a new region that runs until the substrate's EOF.
    pub fn new_indeterminate(reader: T) -> Self {
        Self::indeterminate_with_cookie(reader, ())
    }
}

impl<T: BufferedReader<C>, C> BufferedReaderLimitor<T, C> {
    /// Like [`new`](Self::new), but sets the cookie.
    pub fn with_cookie(reader: T, limit: u64, cookie: C) -> Self {
        BufferedReaderLimitor {
            reader,
            limit: Some(limit),
            length_read: 0,
            last_read: 0,
            cookie,
        }
    }

    /// Like [`new_indeterminate`](Self::new_indeterminate), but sets
    /// the cookie.
    pub fn indeterminate_with_cookie(reader: T, cookie: C) -> Self {
        BufferedReaderLimitor {
            reader,
            limit: None,
            length_read: 0,
            last_read: 0,
            cookie,
        }
    }

    /// Whether this region is indeterminate (unbounded, runs to EOF).
    pub fn is_indeterminate(&self) -> bool {
        self.limit.is_none()
    }

    /// The region's declared length, if any.
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// How many bytes have been consumed through this layer.
    pub fn length_read(&self) -> u64 {
        self.length_read
    }

    /// The size of the most recent successful pull.
    pub fn last_read(&self) -> usize {
        self.last_read
    }

    /// How many bytes remain before the region boundary, if known.
    pub fn remaining(&self) -> Option<u64> {
        self.limit.map(|l| l.saturating_sub(self.length_read))
    }

    fn clamp(&self, amount: usize) -> usize {
        match self.limit {
            Some(limit) => {
                let remaining = limit.saturating_sub(self.length_read);
                cmp::min(amount as u64, remaining) as usize
            }
            None => amount,
        }
    }
}

impl<T: BufferedReader<C>, C> fmt::Debug for BufferedReaderLimitor<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BufferedReaderLimitor")
            .field("limit", &self.limit)
            .field("length_read", &self.length_read)
            .finish()
    }
}

impl<T: BufferedReader<C>, C> io::Read for BufferedReaderLimitor<T, C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        buffered_reader_generic_read_impl(self, buf)
    }
}

impl<T: BufferedReader<C>, C> BufferedReader<C> for BufferedReaderLimitor<T, C> {
    fn buffer(&self) -> &[u8] {
        let buffer = self.reader.buffer();
        &buffer[..self.clamp(buffer.len())]
    }

    fn data(&mut self, amount: usize) -> io::Result<&[u8]> {
        let capped = self.clamp(amount);
        let buffer = self.reader.data(capped)?;
        Ok(&buffer[..cmp::min(buffer.len(), self.clamp(buffer.len()))])
    }

    fn consume(&mut self, amount: usize) -> &[u8] {
        if let Some(limit) = self.limit {
            assert!(self.length_read + amount as u64 <= limit,
                     "region overrun: consumed {} of a {}-byte region \
                      (already at {})",
                     amount, limit, self.length_read);
        }
        self.length_read += amount as u64;
        self.last_read = amount;
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
    fn clamps_to_limit() {
        let data = b"0123456789";
        let br = BufferedReaderMemory::new(&data[..]);
        let mut lim = BufferedReaderLimitor::new(br, 4);
        assert_eq!(lim.data_eof().unwrap(), b"0123");
        lim.consume(4);
        assert_eq!(lim.data(1).unwrap().len(), 0);
        assert_eq!(lim.length_read(), 4);
    }

    #[test]
    #[should_panic]
    fn overrun_panics() {
        let data = b"0123456789";
        let br = BufferedReaderMemory::new(&data[..]);
        let mut lim = BufferedReaderLimitor::new(br, 4);
        lim.data(10).unwrap();
        lim.consume(5);
    }
}
