use std::fmt;
use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::ptr;

use super::{buffered_reader_generic_read_impl, BufferedReader, BufferedReaderGeneric};

/// A `BufferedReader` that reads from a file.
///
/// On Unix, regular files are `mmap`ed read-only rather than copied
/// through a userspace buffer, which matters for the large keyrings
/// and message archives this is typically pointed at. Anything that
/// isn't a regular file that can be mapped (a pipe, a socket, `/dev`
/// special files) falls back to ordinary buffered reads.
pub struct BufferedReaderFile<'a, C> {
    inner: Inner<'a>,
    cookie: C,
}

enum Inner<'a> {
    Mapped(Mapping, std::marker::PhantomData<&'a ()>),
    Unmapped(BufferedReaderGeneric<File, ()>),
}

/// An mmap'd file, exposed as a byte slice for the lifetime of the mapping.
pub struct Mapping {
    ptr: *mut libc::c_void,
    len: usize,
    cursor: usize,
}

impl Mapping {
    fn as_slice(&self) -> &[u8] {
        if self.len == 0 {
            &[]
        } else {
            unsafe {
                std::slice::from_raw_parts(self.ptr as *const u8, self.len)
            }
        }
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        if self.len > 0 {
            unsafe {
                libc::munmap(self.ptr, self.len);
            }
        }
    }
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
        let len = file.metadata()?.len();

        if len == 0 || len > isize::MAX as u64 {
            return Ok(BufferedReaderFile {
                inner: Inner::Unmapped(BufferedReaderGeneric::new(file, None)),
                cookie,
            });
        }

        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len as libc::size_t,
                libc::PROT_READ,
                libc::MAP_PRIVATE,
                file.as_raw_fd(),
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            // Not everything that opens is mmap-able (pipes,
            // character devices).  Fall back to read(2).
            return Ok(BufferedReaderFile {
                inner: Inner::Unmapped(BufferedReaderGeneric::new(file, None)),
                cookie,
            });
        }

        Ok(BufferedReaderFile {
            inner: Inner::Mapped(
                Mapping { ptr, len: len as usize, cursor: 0 },
                std::marker::PhantomData,
            ),
            cookie,
        })
    }
}

impl<'a, C> fmt::Debug for BufferedReaderFile<'a, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.inner {
            Inner::Mapped(m, _) =>
                f.debug_struct("BufferedReaderFile")
                    .field("mmap_len", &m.len)
                    .finish(),
            Inner::Unmapped(_) =>
                f.debug_struct("BufferedReaderFile")
                    .field("mmap", &false)
                    .finish(),
        }
    }
}

impl<'a, C> io::Read for BufferedReaderFile<'a, C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        buffered_reader_generic_read_impl(self, buf)
    }
}

impl<'a, C> BufferedReader<C> for BufferedReaderFile<'a, C> {
    fn buffer(&self) -> &[u8] {
        match &self.inner {
            Inner::Mapped(m, _) => &m.as_slice()[m.cursor..],
            Inner::Unmapped(r) => r.buffer(),
        }
    }

    fn data(&mut self, amount: usize) -> io::Result<&[u8]> {
        match &mut self.inner {
            Inner::Mapped(m, _) => Ok(&m.as_slice()[m.cursor..]),
            Inner::Unmapped(r) => r.data(amount),
        }
    }

    fn consume(&mut self, amount: usize) -> &[u8] {
        match &mut self.inner {
            Inner::Mapped(m, _) => {
                assert!(m.cursor + amount <= m.len);
                m.cursor += amount;
                &m.as_slice()[m.cursor - amount..]
            }
            Inner::Unmapped(r) => r.consume(amount),
        }
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
