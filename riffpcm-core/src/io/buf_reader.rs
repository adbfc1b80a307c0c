// RiffPcm
// Copyright (c) 2024-2025 The Project RiffPcm Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cmp;
use std::io;

use super::{FiniteStream, ReadBytes};

#[inline(always)]
fn underrun_error<T>() -> io::Result<T> {
    Err(io::Error::new(io::ErrorKind::UnexpectedEof, "buffer underrun"))
}

/// A `BufReader` reads bytes from a byte buffer.
pub struct BufReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BufReader<'a> {
    /// Instantiate a new `BufReader` with a given byte buffer.
    pub fn new(buf: &'a [u8]) -> Self {
        BufReader { buf, pos: 0 }
    }

    /// Returns a reference to the next `len` bytes in the buffer and advances the stream.
    pub fn read_buf_bytes_ref(&mut self, len: usize) -> io::Result<&'a [u8]> {
        if len > self.buf.len() - self.pos {
            return underrun_error();
        }
        self.pos += len;
        Ok(&self.buf[self.pos - len..self.pos])
    }

    /// Returns a reference to the remaining bytes in the buffer and advances the stream to the end.
    pub fn read_buf_bytes_available_ref(&mut self) -> &'a [u8] {
        let pos = self.pos;
        self.pos = self.buf.len();
        &self.buf[pos..]
    }
}

impl ReadBytes for BufReader<'_> {
    #[inline(always)]
    fn read_byte(&mut self) -> io::Result<u8> {
        if self.buf.len() - self.pos < 1 {
            return underrun_error();
        }

        self.pos += 1;
        Ok(self.buf[self.pos - 1])
    }

    #[inline(always)]
    fn read_double_bytes(&mut self) -> io::Result<[u8; 2]> {
        if self.buf.len() - self.pos < 2 {
            return underrun_error();
        }

        let mut bytes: [u8; 2] = [0u8; 2];
        bytes.copy_from_slice(&self.buf[self.pos..self.pos + 2]);
        self.pos += 2;

        Ok(bytes)
    }

    #[inline(always)]
    fn read_quad_bytes(&mut self) -> io::Result<[u8; 4]> {
        if self.buf.len() - self.pos < 4 {
            return underrun_error();
        }

        let mut bytes: [u8; 4] = [0u8; 4];
        bytes.copy_from_slice(&self.buf[self.pos..self.pos + 4]);
        self.pos += 4;

        Ok(bytes)
    }

    fn read_buf(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = cmp::min(self.buf.len() - self.pos, buf.len());
        buf[..len].copy_from_slice(&self.buf[self.pos..self.pos + len]);
        self.pos += len;

        Ok(len)
    }

    fn read_buf_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        let len = buf.len();

        if self.buf.len() - self.pos < len {
            return underrun_error();
        }

        buf.copy_from_slice(&self.buf[self.pos..self.pos + len]);
        self.pos += len;

        Ok(())
    }

    fn ignore_bytes(&mut self, count: u64) -> io::Result<()> {
        // The count is untrusted, compare in u64 so it cannot truncate on 32-bit targets.
        if ((self.buf.len() - self.pos) as u64) < count {
            return underrun_error();
        }

        self.pos += count as usize;
        Ok(())
    }

    #[inline(always)]
    fn pos(&self) -> u64 {
        self.pos as u64
    }
}

impl FiniteStream for BufReader<'_> {
    #[inline(always)]
    fn byte_len(&self) -> u64 {
        self.buf.len() as u64
    }

    #[inline(always)]
    fn bytes_read(&self) -> u64 {
        self.pos as u64
    }

    #[inline(always)]
    fn bytes_available(&self) -> u64 {
        (self.buf.len() - self.pos) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::BufReader;
    use crate::io::{FiniteStream, ReadBytes};

    #[test]
    fn verify_buf_reader_integers() {
        let data = [0x34, 0x12, 0x12, 0x34, 0x78, 0x56, 0x34, 0x12, 0xff, 0xff];
        let mut reader = BufReader::new(&data);

        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_be_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u32().unwrap(), 0x1234_5678);
        assert_eq!(reader.read_i16().unwrap(), -1);
        assert_eq!(reader.bytes_available(), 0);
        assert!(reader.read_byte().is_err());
    }

    #[test]
    fn verify_buf_reader_underrun() {
        let data = [1u8, 2, 3];
        let mut reader = BufReader::new(&data);

        assert!(reader.read_quad_bytes().is_err());
        assert!(reader.ignore_bytes(4).is_err());
        assert!(reader.ignore_bytes(u64::MAX).is_err());

        // A failed read must not advance the reader.
        assert_eq!(reader.pos(), 0);

        let mut buf = [0u8; 8];
        assert_eq!(reader.read_buf(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &data);
    }

    #[test]
    fn verify_buf_reader_refs() {
        let data = [1u8, 2, 3, 4, 5];
        let mut reader = BufReader::new(&data);

        assert_eq!(reader.read_buf_bytes_ref(2).unwrap(), &[1, 2]);
        assert!(reader.read_buf_bytes_ref(4).is_err());
        assert_eq!(reader.read_buf_bytes_available_ref(), &[3, 4, 5]);
        assert_eq!(reader.bytes_read(), 5);
    }
}
