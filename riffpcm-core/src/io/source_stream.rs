// RiffPcm
// Copyright (c) 2024-2025 The Project RiffPcm Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cmp;
use std::io;
use std::io::{Read, Seek, SeekFrom};

use super::{MediaSource, ReadBytes};

const END_OF_STREAM_ERROR_STR: &str = "end of stream";

#[inline(always)]
fn end_of_stream_error<T>() -> io::Result<T> {
    Err(io::Error::new(io::ErrorKind::UnexpectedEof, END_OF_STREAM_ERROR_STR))
}

/// `SourceStreamOptions` specifies the buffering behaviour of a `SourceStream`.
#[derive(Copy, Clone, Debug)]
pub struct SourceStreamOptions {
    /// The maximum buffer size. Must be a power of 2 and at least 1kB.
    pub buffer_len: usize,
}

impl Default for SourceStreamOptions {
    fn default() -> Self {
        SourceStreamOptions { buffer_len: 32 * 1024 }
    }
}

/// A `SourceStream` is the buffered `ReadBytes` implementation over any [`MediaSource`].
///
/// Reads from the inner source are performed in blocks that start at 1kB and double with each
/// sequential refill up-to the buffer length, so a seek followed by a short read does not pull a
/// full buffer from the source. Seeks that land inside the currently buffered bytes do not touch
/// the inner source at all.
pub struct SourceStream {
    /// The source reader.
    inner: Box<dyn MediaSource>,
    /// Cached result of `inner.is_seekable()`.
    seekable: bool,
    /// The read-ahead buffer.
    buf: Box<[u8]>,
    /// The read position within the buffer.
    read_pos: usize,
    /// The number of valid bytes in the buffer.
    end_pos: usize,
    /// The current block size for a new read.
    read_block_len: usize,
    /// Absolute position of the inner source, i.e., the position just after `buf[end_pos - 1]`.
    abs_pos: u64,
}

impl SourceStream {
    const MIN_BLOCK_LEN: usize = 1024;

    pub fn new(source: Box<dyn MediaSource>, options: SourceStreamOptions) -> Self {
        // The buffer length must be a power of 2 and fit atleast one minimum sized block.
        assert!(options.buffer_len.count_ones() == 1);
        assert!(options.buffer_len >= Self::MIN_BLOCK_LEN);

        let seekable = source.is_seekable();

        SourceStream {
            inner: source,
            seekable,
            buf: vec![0; options.buffer_len].into_boxed_slice(),
            read_pos: 0,
            end_pos: 0,
            read_block_len: Self::MIN_BLOCK_LEN,
            abs_pos: 0,
        }
    }

    /// Returns if the underlying source is seekable.
    pub fn is_seekable(&self) -> bool {
        self.seekable
    }

    /// Returns the length in bytes of the underlying source, if available.
    pub fn byte_len(&self) -> Option<u64> {
        self.inner.byte_len()
    }

    /// Get the number of bytes buffered but not yet read.
    pub fn unread_buffer_len(&self) -> usize {
        self.end_pos - self.read_pos
    }

    /// Unwrap this `SourceStream` returning the inner source.
    pub fn into_inner(self) -> Box<dyn MediaSource> {
        self.inner
    }

    /// If the buffer has been exhausted, fetch a new block of data to replenish it. Returns the
    /// number of bytes now available, 0 indicates the end of the source.
    fn fetch(&mut self) -> io::Result<usize> {
        if self.read_pos < self.end_pos {
            return Ok(self.end_pos - self.read_pos);
        }

        let block_len = cmp::min(self.read_block_len, self.buf.len());

        let actual_read_len = loop {
            match self.inner.read(&mut self.buf[..block_len]) {
                Ok(len) => break len,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        };

        self.read_pos = 0;
        self.end_pos = actual_read_len;
        self.abs_pos += actual_read_len as u64;

        // Grow the read block length exponentially to reduce the overhead of buffering on
        // consecutive seeks.
        self.read_block_len = cmp::min(self.read_block_len << 1, self.buf.len());

        Ok(actual_read_len)
    }

    /// Fetch a new block and return an error if the source is exhausted.
    fn fetch_or_eof(&mut self) -> io::Result<()> {
        if self.fetch()? == 0 {
            return end_of_stream_error();
        }
        Ok(())
    }

    /// Seek the inner source, invalidating the buffer.
    fn seek_inner(&mut self, pos: u64) -> io::Result<u64> {
        self.abs_pos = self.inner.seek(SeekFrom::Start(pos))?;
        self.read_pos = 0;
        self.end_pos = 0;
        self.read_block_len = Self::MIN_BLOCK_LEN;
        Ok(self.abs_pos)
    }
}

impl ReadBytes for SourceStream {
    #[inline(always)]
    fn read_byte(&mut self) -> io::Result<u8> {
        if self.read_pos == self.end_pos {
            self.fetch_or_eof()?;
        }

        let value = self.buf[self.read_pos];
        self.read_pos += 1;
        Ok(value)
    }

    fn read_double_bytes(&mut self) -> io::Result<[u8; 2]> {
        let mut bytes = [0; 2];
        self.read_buf_exact(&mut bytes)?;
        Ok(bytes)
    }

    fn read_quad_bytes(&mut self) -> io::Result<[u8; 4]> {
        let mut bytes = [0; 4];
        self.read_buf_exact(&mut bytes)?;
        Ok(bytes)
    }

    fn read_buf(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut read = 0;

        while read < buf.len() {
            if self.fetch()? == 0 {
                break;
            }

            let count = cmp::min(buf.len() - read, self.end_pos - self.read_pos);
            buf[read..read + count].copy_from_slice(&self.buf[self.read_pos..self.read_pos + count]);
            self.read_pos += count;
            read += count;
        }

        Ok(read)
    }

    fn read_buf_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        if self.read_buf(buf)? < buf.len() {
            return end_of_stream_error();
        }
        Ok(())
    }

    fn ignore_bytes(&mut self, mut count: u64) -> io::Result<()> {
        let unread = self.unread_buffer_len() as u64;

        if count <= unread {
            self.read_pos += count as usize;
            return Ok(());
        }

        // Jump over the unbuffered remainder when the source allows it.
        if self.seekable {
            let target = self.pos() + count;
            self.seek_inner(target)?;
            return Ok(());
        }

        // Otherwise, the bytes must be read and discarded.
        while count > 0 {
            self.fetch_or_eof()?;
            let discard = cmp::min(count, self.unread_buffer_len() as u64);
            self.read_pos += discard as usize;
            count -= discard;
        }

        Ok(())
    }

    #[inline(always)]
    fn pos(&self) -> u64 {
        self.abs_pos - (self.end_pos - self.read_pos) as u64
    }
}

impl Read for SourceStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_buf(buf)
    }
}

impl Seek for SourceStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(pos) => pos,
            SeekFrom::Current(delta) => self
                .pos()
                .checked_add_signed(delta)
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid seek"))?,
            // The buffer cannot resolve an end-relative seek, defer it to the inner source.
            SeekFrom::End(_) => {
                self.abs_pos = self.inner.seek(pos)?;
                self.read_pos = 0;
                self.end_pos = 0;
                return Ok(self.abs_pos);
            }
        };

        // Seek within the buffered data if possible.
        let buf_start = self.abs_pos - self.end_pos as u64;

        if target >= buf_start && target <= self.abs_pos {
            self.read_pos = (target - buf_start) as usize;
            return Ok(target);
        }

        self.seek_inner(target)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read, Seek, SeekFrom};

    use super::{SourceStream, SourceStreamOptions};
    use crate::io::{ReadBytes, ReadOnlySource};

    /// Generate a random vector of bytes of the specified length using a PRNG.
    fn generate_random_bytes(len: usize) -> Box<[u8]> {
        let mut lcg: u32 = 0xec57c4bf;

        let mut bytes = vec![0; len];

        for quad in bytes.chunks_mut(4) {
            lcg = lcg.wrapping_mul(1664525).wrapping_add(1013904223);
            for (src, dest) in quad.iter_mut().zip(&lcg.to_ne_bytes()) {
                *src = *dest;
            }
        }

        bytes.into_boxed_slice()
    }

    #[test]
    fn verify_ss_read() {
        let data = generate_random_bytes(3 * 40 * 1024);

        let ms = Cursor::new(data.clone());
        let mut ss = SourceStream::new(Box::new(ms), Default::default());

        // Each scenario reads more than one buffer length. Between each scenario, ignore an odd
        // number of bytes.
        let mut buf = &data[..];

        for byte in &buf[..40 * 1024] {
            assert_eq!(*byte, ss.read_byte().unwrap());
        }

        ss.ignore_bytes(11).unwrap();

        buf = &buf[11 + (40 * 1024)..];

        for bytes in buf[..2 * 20 * 1024].chunks_exact(2) {
            assert_eq!(bytes, &ss.read_double_bytes().unwrap());
        }

        ss.ignore_bytes(33).unwrap();

        buf = &buf[33 + (2 * 20 * 1024)..];

        for bytes in buf[..4 * 8 * 1024].chunks_exact(4) {
            assert_eq!(bytes, &ss.read_quad_bytes().unwrap());
        }
    }

    #[test]
    fn verify_ss_read_to_end() {
        let data = generate_random_bytes(5 * 16 * 1024);

        let ms = Cursor::new(data.clone());
        let mut ss = SourceStream::new(Box::new(ms), Default::default());
        let mut output: Vec<u8> = Vec::new();
        assert_eq!(ss.read_to_end(&mut output).unwrap(), data.len());
        assert_eq!(output.into_boxed_slice(), data);
        assert!(ss.read_byte().is_err());
    }

    #[test]
    fn verify_ss_seek() {
        let data = generate_random_bytes(256 * 1024);

        let ms = Cursor::new(data.clone());
        let opts = SourceStreamOptions { buffer_len: 4 * 1024 };
        let mut ss = SourceStream::new(Box::new(ms), opts);

        // Seek within the buffered bytes.
        ss.ignore_bytes(100).unwrap();
        assert_eq!(ss.seek(SeekFrom::Start(10)).unwrap(), 10);
        assert_eq!(ss.read_byte().unwrap(), data[10]);

        // Seek far beyond the buffer.
        assert_eq!(ss.seek(SeekFrom::Start(200_000)).unwrap(), 200_000);
        assert_eq!(ss.pos(), 200_000);
        assert_eq!(ss.read_byte().unwrap(), data[200_000]);

        // Seek backwards beyond the buffer.
        assert_eq!(ss.seek(SeekFrom::Current(-100_001)).unwrap(), 100_000);
        assert_eq!(ss.read_byte().unwrap(), data[100_000]);

        // A large ignore on a seekable source jumps over the data.
        ss.ignore_bytes(50_000).unwrap();
        assert_eq!(ss.pos(), 150_001);
        assert_eq!(ss.read_byte().unwrap(), data[150_001]);
    }

    #[test]
    fn verify_ss_unseekable_ignore() {
        let data = generate_random_bytes(64 * 1024);

        let ms = ReadOnlySource::new(Cursor::new(data.clone()));
        let mut ss = SourceStream::new(Box::new(ms), Default::default());

        assert!(!ss.is_seekable());

        ss.ignore_bytes(40_000).unwrap();
        assert_eq!(ss.pos(), 40_000);
        assert_eq!(ss.read_byte().unwrap(), data[40_000]);

        assert!(ss.ignore_bytes(64 * 1024).is_err());
    }
}
