// RiffPcm
// Copyright (c) 2024-2025 The Project RiffPcm Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Byte-level input for the container walker and the block decoders.
//!
//! Two readers implement [`ReadBytes`]:
//!  * [`SourceStream`] buffers a boxed [`MediaSource`] (a file, a cursor, or an unseekable
//!    reader) and is used to walk chunks and fetch compressed blocks.
//!  * [`BufReader`] reads from a borrowed `&[u8]`, typically a single compressed block. It is also
//!    a [`FiniteStream`], so a decoder can tell how much of the block is left.

use std::io;

mod buf_reader;
mod source_stream;

pub use buf_reader::BufReader;
pub use source_stream::{SourceStream, SourceStreamOptions};

/// A byte source that a [`SourceStream`] can buffer.
///
/// `Seek` is required by the signature, but a source may still refuse to seek. Callers check
/// [`MediaSource::is_seekable`] first and fall back to reading forward.
pub trait MediaSource: io::Read + io::Seek + Send + Sync {
    /// Returns true if the source can seek. May query the operating system.
    fn is_seekable(&self) -> bool;

    /// Returns the total length of the source in bytes, if known. May query the operating
    /// system.
    fn byte_len(&self) -> Option<u64>;
}

impl MediaSource for std::fs::File {
    /// Only regular files are treated as seekable. Pipes and character devices are not.
    fn is_seekable(&self) -> bool {
        // metadata() follows symlinks.
        match self.metadata() {
            Ok(metadata) => metadata.is_file(),
            _ => false,
        }
    }

    fn byte_len(&self) -> Option<u64> {
        match self.metadata() {
            Ok(metadata) => Some(metadata.len()),
            _ => None,
        }
    }
}

impl<T: AsRef<[u8]> + Send + Sync> MediaSource for io::Cursor<T> {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        Some(self.get_ref().as_ref().len() as u64)
    }
}

/// Adapts a plain [`std::io::Read`] (a socket, a pipe, a decompressor) into a [`MediaSource`]
/// that reports itself as unseekable.
///
/// A WAVE file read through it is walked only up to the `data` chunk, and seeks within the
/// decoded stream can only move forward.
pub struct ReadOnlySource<R: io::Read> {
    inner: R,
}

impl<R: io::Read + Send> ReadOnlySource<R> {
    pub fn new(inner: R) -> Self {
        ReadOnlySource { inner }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: io::Read + Send + Sync> MediaSource for ReadOnlySource<R> {
    fn is_seekable(&self) -> bool {
        false
    }

    fn byte_len(&self) -> Option<u64> {
        None
    }
}

impl<R: io::Read> io::Read for ReadOnlySource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: io::Read> io::Seek for ReadOnlySource<R> {
    fn seek(&mut self, _: io::SeekFrom) -> io::Result<u64> {
        Err(io::Error::new(io::ErrorKind::Other, "source does not support seeking"))
    }
}

/// Sequential reads of raw bytes and fixed-width integers.
///
/// RIFF headers and most ADPCM preambles are little-endian. The QuickTime IMA packet header is
/// the lone big-endian field, read with [`ReadBytes::read_be_u16`].
pub trait ReadBytes {
    /// Reads one byte. Fails with `UnexpectedEof` at the end of the stream.
    fn read_byte(&mut self) -> io::Result<u8>;

    /// Reads two bytes in stream order.
    fn read_double_bytes(&mut self) -> io::Result<[u8; 2]>;

    /// Reads four bytes in stream order. Used for chunk ids and form types.
    fn read_quad_bytes(&mut self) -> io::Result<[u8; 4]>;

    /// Fills as much of `buf` as the stream allows, returning the count. Returns fewer bytes than
    /// requested only at the end of the stream.
    fn read_buf(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Fills all of `buf`, or fails with `UnexpectedEof`.
    fn read_buf_exact(&mut self, buf: &mut [u8]) -> io::Result<()>;

    #[inline(always)]
    fn read_u8(&mut self) -> io::Result<u8> {
        self.read_byte()
    }

    /// Reads a little-endian `u16`.
    #[inline(always)]
    fn read_u16(&mut self) -> io::Result<u16> {
        Ok(u16::from_le_bytes(self.read_double_bytes()?))
    }

    /// Reads a little-endian `i16`, as found in ADPCM preambles.
    #[inline(always)]
    fn read_i16(&mut self) -> io::Result<i16> {
        Ok(i16::from_le_bytes(self.read_double_bytes()?))
    }

    /// Reads a big-endian `u16`.
    #[inline(always)]
    fn read_be_u16(&mut self) -> io::Result<u16> {
        Ok(u16::from_be_bytes(self.read_double_bytes()?))
    }

    /// Reads a little-endian `u32`, as found in chunk sizes.
    #[inline(always)]
    fn read_u32(&mut self) -> io::Result<u32> {
        Ok(u32::from_le_bytes(self.read_quad_bytes()?))
    }

    /// Reads exactly `len` bytes into a new allocation.
    fn read_boxed_slice_exact(&mut self, len: usize) -> io::Result<Box<[u8]>> {
        let mut buf = vec![0u8; len];
        self.read_buf_exact(&mut buf)?;
        Ok(buf.into_boxed_slice())
    }

    /// Skips `count` bytes. Streams over a seekable source may seek instead of reading.
    fn ignore_bytes(&mut self, count: u64) -> io::Result<()>;

    /// Gets the absolute offset of the next byte to be read.
    fn pos(&self) -> u64;
}

impl<R: ReadBytes> ReadBytes for &mut R {
    #[inline(always)]
    fn read_byte(&mut self) -> io::Result<u8> {
        (*self).read_byte()
    }

    #[inline(always)]
    fn read_double_bytes(&mut self) -> io::Result<[u8; 2]> {
        (*self).read_double_bytes()
    }

    #[inline(always)]
    fn read_quad_bytes(&mut self) -> io::Result<[u8; 4]> {
        (*self).read_quad_bytes()
    }

    #[inline(always)]
    fn read_buf(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (*self).read_buf(buf)
    }

    #[inline(always)]
    fn read_buf_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        (*self).read_buf_exact(buf)
    }

    #[inline(always)]
    fn ignore_bytes(&mut self, count: u64) -> io::Result<()> {
        (*self).ignore_bytes(count)
    }

    #[inline(always)]
    fn pos(&self) -> u64 {
        (**self).pos()
    }
}

/// A stream with a fixed, known length, such as one compressed block.
pub trait FiniteStream {
    /// Gets the total length in bytes.
    fn byte_len(&self) -> u64;

    /// Gets the number of bytes consumed so far.
    fn bytes_read(&self) -> u64;

    /// Gets the number of bytes left to read.
    fn bytes_available(&self) -> u64;
}

impl<F: FiniteStream> FiniteStream for &mut F {
    fn byte_len(&self) -> u64 {
        (**self).byte_len()
    }

    fn bytes_read(&self) -> u64 {
        (**self).bytes_read()
    }

    fn bytes_available(&self) -> u64 {
        (**self).bytes_available()
    }
}
