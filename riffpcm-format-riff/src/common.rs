// RiffPcm
// Copyright (c) 2024-2025 The Project RiffPcm Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::borrow::Cow;
use std::io;
use std::marker::PhantomData;

use riffpcm_core::errors::{container_error, ContainerErrorKind, Result};
use riffpcm_core::io::ReadBytes;

use log::{debug, info, warn};

/// A `Chunk` records the header of a chunk and where its payload lives in the stream.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    /// The four character chunk identifier.
    pub id: [u8; 4],
    /// The payload length in bytes, excluding the pad byte.
    pub data_size: u32,
    /// The stream position of the first payload byte.
    pub start_offset: u64,
}

impl Chunk {
    /// The stream position just past the chunk, including the pad byte of an odd-sized chunk.
    pub fn end_offset(&self) -> u64 {
        self.start_offset + u64::from(self.data_size) + u64::from(self.data_size & 1)
    }

    /// The chunk identifier as text.
    pub fn id_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.id)
    }
}

/// `ParseChunkTag` implements `parse_tag` to map between the 4-byte chunk identifier and the
/// enumeration
pub trait ParseChunkTag: Sized {
    fn parse_tag(chunk: Chunk) -> Option<Self>;
}

pub enum NullChunks {}

impl ParseChunkTag for NullChunks {
    fn parse_tag(_chunk: Chunk) -> Option<Self> {
        None
    }
}

fn is_eof(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::UnexpectedEof
}

/// `ChunksReader` reads chunks from a `ReadBytes` stream. It is generic across a type, usually an
/// enum, implementing the `ParseChunkTag` trait. When a new chunk is encountered in the stream,
/// `parse_tag` on T is called to return an object capable of parsing/reading that chunk or `None`.
/// This makes reading the actual chunk data lazy in that the chunk is not read until the object is
/// consumed.
///
/// Whatever part of a returned chunk the caller leaves unread is skipped before the next header
/// is read.
pub struct ChunksReader<T: ParseChunkTag> {
    /// The length of the parent chunk, if known.
    len: Option<u64>,
    /// Bytes of the parent chunk accounted for so far.
    consumed: u64,
    /// The previous chunk had an odd length and its pad byte is still unread.
    pending_pad: bool,
    /// The stream position where the previous chunk's payload ends.
    next_pos: Option<u64>,
    /// Every chunk header seen, in stream order.
    chunks: Vec<Chunk>,
    phantom: PhantomData<T>,
}

impl<T: ParseChunkTag> ChunksReader<T> {
    pub fn new(len: Option<u32>) -> Self {
        ChunksReader {
            len: len.map(u64::from),
            consumed: 0,
            pending_pad: false,
            next_pos: None,
            chunks: Vec::new(),
            phantom: PhantomData,
        }
    }

    /// Consumes the reader, returning the headers of all chunks seen.
    pub fn into_chunks(self) -> Vec<Chunk> {
        self.chunks
    }

    fn remaining(&self) -> Option<u64> {
        self.len.map(|len| len.saturating_sub(self.consumed))
    }

    /// Skips whatever remains of the previously returned chunk's payload. Returns false if the
    /// stream ended while doing so.
    fn skip_to_next<B: ReadBytes>(&mut self, reader: &mut B) -> Result<bool> {
        if let Some(next_pos) = self.next_pos.take() {
            let pos = reader.pos();

            if pos > next_pos {
                return container_error(ContainerErrorKind::Malformed(
                    "riff: chunk parser read past the end of the chunk",
                ));
            }

            match reader.ignore_bytes(next_pos - pos) {
                Ok(_) => (),
                Err(err) if is_eof(&err) => return Ok(false),
                Err(err) => return Err(err.into()),
            }
        }
        Ok(true)
    }

    pub fn next<B: ReadBytes>(&mut self, reader: &mut B) -> Result<Option<T>> {
        // Loop until a chunk is recognized and returned, or the end of stream is reached.
        loop {
            if !self.skip_to_next(reader)? {
                return Ok(None);
            }

            // Check if at the end of the parent chunk.
            if self.remaining() == Some(0) {
                return Ok(None);
            }

            let mut tag = [0u8; 4];
            let mut header_len = 8;

            // An odd-sized chunk is followed by a pad byte. Writers sometimes omit it, so a zero
            // byte is consumed as padding while any other byte starts the next chunk tag.
            if self.pending_pad {
                self.pending_pad = false;

                let byte = match reader.read_u8() {
                    Ok(byte) => byte,
                    Err(err) if is_eof(&err) => return Ok(None),
                    Err(err) => return Err(err.into()),
                };

                if byte == 0 {
                    self.consumed += 1;
                }
                else {
                    warn!("riff: missing pad byte after odd-sized chunk");
                    tag[0] = byte;
                    header_len = 7;
                }
            }

            // Check if there are enough bytes (8) to read a chunk header. If not, there are no more
            // chunks to be read.
            if let Some(remaining) = self.remaining() {
                if remaining < 8 {
                    debug!("riff: {} trailing bytes, too short for a chunk header", remaining);
                    return Ok(None);
                }
            }

            // Read chunk tag and length (the chunk header). A stream ending inside the header
            // ends the walk.
            let header = if header_len == 7 {
                let mut rest = [0u8; 3];
                reader.read_buf_exact(&mut rest).and_then(|_| {
                    tag[1..].copy_from_slice(&rest);
                    reader.read_u32()
                })
            }
            else {
                reader.read_quad_bytes().and_then(|quad| {
                    tag = quad;
                    reader.read_u32()
                })
            };

            let chunk_len = match header {
                Ok(len) => len,
                Err(err) if is_eof(&err) => return Ok(None),
                Err(err) => return Err(err.into()),
            };

            self.consumed += 8;

            // Check if the parent chunk has enough unread bytes to fully contain the chunk body.
            if let Some(remaining) = self.remaining() {
                // Warning: The formulation of this conditional is critical because chunk_len is an
                // untrusted input, it may overflow when if added to anything.
                if remaining < u64::from(chunk_len) {
                    warn!(
                        "riff: length of chunk {} exceeds parent length, ignoring parent length",
                        String::from_utf8_lossy(&tag)
                    );
                    self.len = None;
                }
            }

            // The length of the chunk has been validated, so "consume" the chunk.
            self.consumed = self.consumed.saturating_add(u64::from(chunk_len));
            self.pending_pad = chunk_len & 1 == 1;

            let chunk = Chunk { id: tag, data_size: chunk_len, start_offset: reader.pos() };

            self.chunks.push(chunk);
            self.next_pos = Some(chunk.start_offset + u64::from(chunk_len));

            match T::parse_tag(chunk) {
                Some(parsed) => return Ok(Some(parsed)),
                None => {
                    // As per the RIFF spec, unknown chunks are to be ignored.
                    info!(
                        "ignoring unknown chunk: tag={}, len={}.",
                        chunk.id_str(),
                        chunk.data_size
                    );
                }
            }
        }
    }

    /// Skips the remainder of the parent chunk.
    pub fn finish<B: ReadBytes>(&mut self, reader: &mut B) -> Result<()> {
        if !self.skip_to_next(reader)? {
            return Ok(());
        }

        // If data is remaining in the parent chunk, skip it.
        if let Some(remaining) = self.remaining() {
            reader.ignore_bytes(remaining)?;
            self.consumed += remaining;
        }

        Ok(())
    }
}

/// Common trait implemented for all chunks that are parsed by a `ChunkParser`.
pub trait ParseChunk: Sized {
    fn parse<B: ReadBytes>(reader: &mut B, chunk: &Chunk) -> Result<Self>;
}

/// `ChunkParser` is a utility struct for unifying the parsing of chunks.
pub struct ChunkParser<P: ParseChunk> {
    pub chunk: Chunk,
    phantom: PhantomData<P>,
}

impl<P: ParseChunk> ChunkParser<P> {
    pub fn new(chunk: Chunk) -> Self {
        ChunkParser { chunk, phantom: PhantomData }
    }

    pub fn parse<B: ReadBytes>(&self, reader: &mut B) -> Result<P> {
        P::parse(reader, &self.chunk)
    }
}
