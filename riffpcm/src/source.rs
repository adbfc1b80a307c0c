// RiffPcm
// Copyright (c) 2024-2025 The Project RiffPcm Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io;
use std::io::{Seek, SeekFrom};

use riffpcm_codec_adpcm::{codec_params_for_format, AdpcmDecoder};
use riffpcm_core::codecs::{CodecParameters, CODEC_TYPE_PCM_S16LE};
use riffpcm_core::errors::{seek_error, Error, Result, SeekErrorKind};
use riffpcm_core::io::{MediaSource, ReadBytes, SourceStream};
use riffpcm_core::meta::Metadata;
use riffpcm_format_riff::{ContainerChunks, FormatDescriptor};

use log::{debug, warn};

/// The number of bytes in one decoded sample.
const BYTES_PER_SAMPLE: u64 = 2;

/// `DecodeSource` streams the decoded content of an ADPCM WAVE file as interleaved
/// little-endian signed 16-bit PCM.
///
/// Positions are counted in decoded bytes. Nothing is read from the `data` chunk until the first
/// call to [`DecodeSource::read`] or [`DecodeSource::set_position`].
pub struct DecodeSource {
    reader: SourceStream,
    container: ContainerChunks,
    decoder: AdpcmDecoder,
    output_params: CodecParameters,
    /// The number of channels in the decoded stream.
    n_channels: u64,
    /// The size of one compressed block.
    block_align: u64,
    /// The size of one fully decoded block.
    decoded_block_len: u64,
    /// The index of the next block to decode.
    next_block: u64,
    /// The position, in decoded bytes, of the next byte returned by `read`.
    position: u64,
    /// Compressed bytes of the current block.
    block_buf: Vec<u8>,
    /// Decoded bytes of the current block.
    pending: Vec<u8>,
    /// The number of bytes of `pending` already returned.
    pending_pos: usize,
    /// The data chunk, or the source, ended.
    ended: bool,
}

impl DecodeSource {
    /// Instantiate a `DecodeSource` over a walked container.
    pub fn try_new(reader: SourceStream, container: ContainerChunks) -> Result<Self> {
        let format = &container.format;

        let mut params = codec_params_for_format(
            format.codec_tag(),
            format.channels,
            format.sample_rate,
            format.block_align,
        )?;

        if let Some(fact) = &container.fact {
            params.with_n_frames(u64::from(fact.n_frames));
        }

        let decoder = AdpcmDecoder::try_new(&params)?;

        let n_channels = decoder.last_decoded().spec().channels as u64;
        let block_align = u64::from(params.block_align.unwrap_or(0));
        let frames_per_block = decoder.frames_per_block() as u64;

        // Report the declared speaker positions when they agree with the decoded channel count.
        let channels = match params.channels {
            Some(channels) if format.channel_mask().count() == channels.count() => {
                format.channel_mask()
            }
            Some(channels) => channels,
            None => format.channel_mask(),
        };

        let mut output_params = CodecParameters::new();
        output_params
            .for_codec(CODEC_TYPE_PCM_S16LE)
            .with_sample_rate(format.sample_rate)
            .with_channels(channels)
            .with_bits_per_sample(16)
            .with_bits_per_coded_sample(16)
            .with_block_align((n_channels * BYTES_PER_SAMPLE) as u32);

        if let Some(n_frames) = params.n_frames {
            output_params.with_n_frames(n_frames);
        }

        debug!(
            "opened {} stream: block_align={}, frames_per_block={}, data_len={}",
            params.codec, block_align, frames_per_block, container.data.data_size
        );

        Ok(DecodeSource {
            reader,
            container,
            decoder,
            output_params,
            n_channels,
            block_align,
            decoded_block_len: frames_per_block * n_channels * BYTES_PER_SAMPLE,
            next_block: 0,
            position: 0,
            block_buf: vec![0; block_align as usize],
            pending: Vec::new(),
            pending_pos: 0,
            ended: false,
        })
    }

    /// Gets the parameters of the decoded output: 16-bit PCM at the declared sample rate.
    pub fn output_params(&self) -> &CodecParameters {
        &self.output_params
    }

    /// Gets the parameters of the compressed input.
    pub fn codec_params(&self) -> &CodecParameters {
        self.decoder.codec_params()
    }

    /// Gets the parsed `fmt ` chunk.
    pub fn format(&self) -> &FormatDescriptor {
        &self.container.format
    }

    /// Gets the tags read from the container.
    pub fn metadata(&self) -> &Metadata {
        &self.container.metadata
    }

    /// Gets everything learned from walking the container.
    pub fn container(&self) -> &ContainerChunks {
        &self.container
    }

    /// Gets the number of frames in one complete block.
    pub fn frames_per_block(&self) -> usize {
        self.decoder.frames_per_block()
    }

    /// Gets the size of one compressed block.
    pub fn block_align(&self) -> u32 {
        self.block_align as u32
    }

    /// Gets the size of one fully decoded block in bytes.
    pub fn decoded_block_len(&self) -> u64 {
        self.decoded_block_len
    }

    /// Gets the number of frames in the stream. The `fact` chunk is authoritative if present,
    /// otherwise the count of complete blocks is used.
    pub fn n_frames(&self) -> u64 {
        match self.output_params.n_frames {
            Some(n_frames) => n_frames,
            None => self.n_complete_blocks() * self.decoder.frames_per_block() as u64,
        }
    }

    /// Gets the length of the decoded stream in bytes. A truncated final block is not counted, so
    /// the stream may end before, or just after, this length.
    pub fn length(&self) -> u64 {
        self.n_complete_blocks() * self.decoded_block_len
    }

    /// Gets the current position in decoded bytes.
    pub fn position(&self) -> u64 {
        self.position
    }

    fn data_len(&self) -> u64 {
        u64::from(self.container.data.data_size)
    }

    fn n_complete_blocks(&self) -> u64 {
        self.data_len() / self.block_align
    }

    /// Moves the compressed cursor to the start of `block`.
    fn seek_reader(&mut self, block: u64) -> Result<()> {
        let target = self.container.data.start_offset + block * self.block_align;
        let current = self.reader.pos();

        if current == target {
            return Ok(());
        }

        // If the reader supports seeking we can seek directly to the block's offset wherever it
        // may be.
        if self.reader.is_seekable() {
            self.reader.seek(SeekFrom::Start(target))?;
        }
        // If the reader does not support seeking, we can only emulate forward seeks by consuming
        // bytes. If the reader has to seek backwards, return an error.
        else if target > current {
            self.reader.ignore_bytes(target - current)?;
        }
        else {
            return seek_error(SeekErrorKind::ForwardOnly);
        }

        Ok(())
    }

    /// Reads up-to one block of compressed data, returning the number of bytes read.
    fn read_block(&mut self) -> Result<usize> {
        let offset = self.next_block * self.block_align;

        if offset >= self.data_len() {
            return Ok(0);
        }

        let len = (self.data_len() - offset).min(self.block_align) as usize;

        self.seek_reader(self.next_block)?;

        let read = self.reader.read_buf(&mut self.block_buf[..len])?;
        Ok(read)
    }

    /// Decodes the next block into the pending buffer. Returns false at the end of the stream.
    fn decode_next_block(&mut self) -> Result<bool> {
        if self.ended {
            return Ok(false);
        }

        let len = self.read_block()?;

        if len == 0 {
            self.ended = true;
            return Ok(false);
        }

        self.next_block += 1;

        if (len as u64) < self.block_align {
            warn!("final block truncated to {} of {} bytes", len, self.block_align);
            self.ended = true;
        }

        let frames = self.decoder.decode(&self.block_buf[..len])?;

        // The block was too short to hold its preamble.
        if frames == 0 {
            self.ended = true;
            return Ok(false);
        }

        self.pending.resize(frames * (self.n_channels * BYTES_PER_SAMPLE) as usize, 0);
        self.decoder.write_interleaved_le(&mut self.pending);
        self.pending_pos = 0;

        Ok(true)
    }

    /// Reads decoded PCM into `buf`, returning the number of bytes written. Returns 0 only at the
    /// end of the stream or if `buf` is empty.
    ///
    /// The buffer is filled as far as possible. Any part of a decoded block that does not fit is
    /// kept for the next call.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut written = 0;

        while written < buf.len() {
            if self.pending_pos == self.pending.len() && !self.decode_next_block()? {
                break;
            }

            let count = (buf.len() - written).min(self.pending.len() - self.pending_pos);
            buf[written..written + count]
                .copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + count]);

            self.pending_pos += count;
            written += count;
        }

        self.position += written as u64;
        Ok(written)
    }

    /// Seeks to the decoded byte position `pos`, returning the actual position.
    ///
    /// The position is rounded down to the start of its block, and clamped to the end of the
    /// `data` chunk. Decoding restarts from that block's preamble.
    pub fn set_position(&mut self, pos: u64) -> Result<u64> {
        let block = (pos / self.decoded_block_len).min(self.n_complete_blocks());

        debug!("seeking to position={} (block={})", pos, block);

        // The source is left untouched if the reader cannot reach the block.
        self.seek_reader(block)?;

        self.next_block = block;
        self.position = block * self.decoded_block_len;
        self.pending.clear();
        self.pending_pos = 0;
        self.ended = false;
        self.decoder.reset();

        Ok(self.position)
    }

    /// Unwrap this `DecodeSource` returning the underlying source.
    pub fn into_inner(self) -> Box<dyn MediaSource> {
        self.reader.into_inner()
    }
}

fn into_io_error(err: Error) -> io::Error {
    match err {
        Error::IoError(err) => err,
        err => io::Error::new(io::ErrorKind::Other, err),
    }
}

impl io::Read for DecodeSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        DecodeSource::read(self, buf).map_err(into_io_error)
    }
}

/// Seeking through `io::Seek` rounds down to a block boundary like
/// [`DecodeSource::set_position`]. `SeekFrom::End` is relative to [`DecodeSource::length`].
impl io::Seek for DecodeSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(pos) => Some(pos),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(delta) => self.length().checked_add_signed(delta),
        };

        let Some(target) = target
        else {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "invalid seek"));
        };

        self.set_position(target).map_err(into_io_error)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor};

    use riffpcm_core::errors::{ContainerErrorKind, Error};
    use riffpcm_core::io::{SourceStream, SourceStreamOptions};
    use riffpcm_format_riff::{read_container, FormatOptions};

    use super::{into_io_error, DecodeSource};

    /// Builds a mono IMA ADPCM WAVE file with 36 byte blocks (64 frames).
    fn ima_wave(data: &[u8]) -> Vec<u8> {
        let mut fmt = Vec::new();
        fmt.extend_from_slice(&0x0011u16.to_le_bytes());
        fmt.extend_from_slice(&1u16.to_le_bytes());
        fmt.extend_from_slice(&8000u32.to_le_bytes());
        fmt.extend_from_slice(&4000u32.to_le_bytes());
        fmt.extend_from_slice(&36u16.to_le_bytes());
        fmt.extend_from_slice(&4u16.to_le_bytes());

        let mut body = b"WAVE".to_vec();
        body.extend_from_slice(b"fmt ");
        body.extend_from_slice(&(fmt.len() as u32).to_le_bytes());
        body.extend_from_slice(&fmt);
        body.extend_from_slice(b"data");
        body.extend_from_slice(&(data.len() as u32).to_le_bytes());
        body.extend_from_slice(data);

        let mut wave = b"RIFF".to_vec();
        wave.extend_from_slice(&(body.len() as u32).to_le_bytes());
        wave.extend_from_slice(&body);
        wave
    }

    fn open(wave: Vec<u8>) -> DecodeSource {
        let mut reader =
            SourceStream::new(Box::new(Cursor::new(wave)), SourceStreamOptions::default());
        let container = read_container(&mut reader, &FormatOptions::default()).unwrap();
        DecodeSource::try_new(reader, container).unwrap()
    }

    #[test]
    fn verify_silent_block() {
        // A zero preamble and zero nibbles decode to silence.
        let mut source = open(ima_wave(&[0; 36]));

        assert_eq!(source.frames_per_block(), 64);
        assert_eq!(source.length(), 128);

        let mut buf = [0xff; 200];
        assert_eq!(source.read(&mut buf).unwrap(), 128);
        assert!(buf[..128].iter().all(|&b| b == 0));
        assert_eq!(source.position(), 128);
    }

    #[test]
    fn verify_carry_over() {
        let mut source = open(ima_wave(&[0; 72]));

        // Each read only takes part of a decoded block.
        let mut buf = [0; 100];
        assert_eq!(source.read(&mut buf).unwrap(), 100);
        assert_eq!(source.read(&mut buf).unwrap(), 100);
        assert_eq!(source.read(&mut buf).unwrap(), 56);
        assert_eq!(source.read(&mut buf).unwrap(), 0);
        assert_eq!(source.position(), 256);
    }

    #[test]
    fn verify_empty_data() {
        let mut source = open(ima_wave(&[]));

        assert_eq!(source.length(), 0);
        assert_eq!(source.n_frames(), 0);
        assert_eq!(source.set_position(500).unwrap(), 0);

        let mut buf = [0; 16];
        assert_eq!(source.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn verify_io_error_mapping() {
        let err = into_io_error(Error::IoError(io::Error::new(io::ErrorKind::BrokenPipe, "x")));
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

        let err = into_io_error(Error::ContainerError(ContainerErrorKind::Truncated));
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }
}
