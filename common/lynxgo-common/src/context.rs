//! Fixed-length byte cursor that a core serializes its context into and restores it from
//!
//! The cursor never grows: writes past the end are short and reads past the end return 0 bytes,
//! so a core that disagrees with itself about its context size shows up as an `io` error instead
//! of silently producing a larger blob.

use std::io;
use std::io::{Read, Write};

#[derive(Debug)]
pub struct ContextCursor<'a> {
    buffer: &'a mut [u8],
    index: usize,
}

impl<'a> ContextCursor<'a> {
    #[must_use]
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, index: 0 }
    }

    /// Current offset into the buffer.
    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Total length of the buffer.
    #[inline]
    #[must_use]
    pub fn limit(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.index
    }

    #[inline]
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.index == self.buffer.len()
    }
}

impl Read for ContextCursor<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(self.remaining());
        buf[..len].copy_from_slice(&self.buffer[self.index..self.index + len]);
        self.index += len;

        Ok(len)
    }
}

impl Write for ContextCursor<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let len = buf.len().min(self.remaining());
        self.buffer[self.index..self.index + len].copy_from_slice(&buf[..len]);
        self.index += len;

        Ok(len)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
