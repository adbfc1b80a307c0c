// RiffPcm
// Copyright (c) 2024-2025 The Project RiffPcm Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

use riffpcm_core::audio::Channels;
use riffpcm_core::errors::{container_error, ContainerErrorKind, Result};
use riffpcm_core::io::ReadBytes;
use riffpcm_core::meta::{Metadata, Tag};

use log::{info, warn};

use crate::common::{Chunk, ChunkParser, ChunksReader, NullChunks, ParseChunk, ParseChunkTag};

/// The format tag of the `WAVE_FORMAT_EXTENSIBLE` layout.
pub const WAVE_FORMAT_EXTENSIBLE: u16 = 0xfffe;

/// The extra data size of the `WAVE_FORMAT_EXTENSIBLE` layout.
const EXTENSIBLE_EXTRA_SIZE: u16 = 22;

/// `FormatDescriptor` is the decoded `fmt ` chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatDescriptor {
    /// The format tag.
    pub encoding_tag: u16,
    /// The number of channels.
    pub channels: u16,
    /// The sample rate in Hz.
    pub sample_rate: u32,
    /// The average data rate in bytes/second.
    pub avg_bytes_per_sec: u32,
    /// The byte size of one compressed block. For ADPCM formats a zero value is replaced by a
    /// codec-specific default before decoding.
    pub block_align: u16,
    /// The nominal bits per sample.
    pub bits_per_sample: u16,
    /// The size of the extra data following the fixed fields, or 0 if there is none.
    pub extra_size: u16,
    /// The samples per block recorded by the writer in the extension data, if any. Decoders
    /// derive their own value from `block_align`.
    pub samples_per_block: u32,
    /// For the extensible layout, the real format tag taken from the sub-format GUID.
    pub sub_encoding: Option<u16>,
    /// For the extensible layout, the number of valid bits per sample.
    pub valid_bits: Option<u16>,
    /// For the extensible layout, the speaker position mask.
    pub speaker_mask: Option<u32>,
}

impl FormatDescriptor {
    /// Gets the format tag used to select a codec: the sub-format tag for the extensible layout,
    /// otherwise the format tag itself.
    pub fn codec_tag(&self) -> u16 {
        match self.sub_encoding {
            Some(sub) if self.encoding_tag == WAVE_FORMAT_EXTENSIBLE => sub,
            _ => self.encoding_tag,
        }
    }

    /// Gets the speaker positions of the stream. If the stream does not declare them, a default
    /// layout is derived from the channel count.
    pub fn channel_mask(&self) -> Channels {
        match self.speaker_mask {
            Some(mask) => Channels::from_bits_truncate(mask),
            None => Channels::default_for_count(self.channels),
        }
    }

    /// Returns true if the `fmt ` chunk used the extensible layout.
    pub fn is_extensible(&self) -> bool {
        self.encoding_tag == WAVE_FORMAT_EXTENSIBLE
    }

    fn read_extensible<B: ReadBytes>(&mut self, reader: &mut B) -> Result<()> {
        let valid_bits = match reader.read_u16()? {
            0 => self.bits_per_sample,
            bits => bits,
        };

        let speaker_mask = match reader.read_u32()? {
            0 => Channels::default_for_count(self.channels).bits(),
            mask => {
                if mask.count_ones() != u32::from(self.channels) {
                    warn!(
                        "wav: speaker mask {:#x} does not match {} channels",
                        mask, self.channels
                    );
                }
                mask
            }
        };

        // Only the first two bytes of the sub-format GUID carry information, the remainder is the
        // fixed KSDATAFORMAT suffix.
        let mut sub_format_guid = [0u8; 16];
        reader.read_buf_exact(&mut sub_format_guid)?;

        self.valid_bits = Some(valid_bits);
        self.speaker_mask = Some(speaker_mask);
        self.sub_encoding = Some(u16::from_le_bytes([sub_format_guid[0], sub_format_guid[1]]));

        Ok(())
    }
}

impl ParseChunk for FormatDescriptor {
    fn parse<B: ReadBytes>(reader: &mut B, chunk: &Chunk) -> Result<FormatDescriptor> {
        let len = chunk.data_size;

        // The fixed part of the format chunk is 16 bytes long.
        if len < 16 {
            return container_error(ContainerErrorKind::InvalidFormatChunk);
        }

        let mut format = FormatDescriptor {
            encoding_tag: reader.read_u16()?,
            channels: reader.read_u16()?,
            sample_rate: reader.read_u32()?,
            avg_bytes_per_sec: reader.read_u32()?,
            block_align: reader.read_u16()?,
            bits_per_sample: reader.read_u16()?,
            extra_size: 0,
            samples_per_block: 0,
            sub_encoding: None,
            valid_bits: None,
            speaker_mask: None,
        };

        // The extra data size field is only present if the chunk is long enough.
        if len >= 18 {
            format.extra_size = reader.read_u16()?;

            // The extra data may not be longer than what remains of the chunk.
            let available = len - 18;

            if u32::from(format.extra_size) > available {
                warn!(
                    "wav: fmt extra data size {} exceeds the {} bytes available",
                    format.extra_size, available
                );
            }

            if format.extra_size == EXTENSIBLE_EXTRA_SIZE && available >= 22 {
                format.read_extensible(reader)?;
            }
            else if format.extra_size >= 2 && available >= 2 {
                // Codec-specific extension data. Most ADPCM writers start it with the number of
                // samples per block, the rest is skipped.
                format.samples_per_block = u32::from(reader.read_u16()?);
            }
        }

        if format.is_extensible() && format.sub_encoding.is_none() {
            return container_error(ContainerErrorKind::Malformed(
                "wav: extensible fmt chunk without a sub-format",
            ));
        }

        Ok(format)
    }
}

impl fmt::Display for FormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FormatDescriptor {{")?;
        writeln!(f, "\tencoding_tag: {:#06x},", self.encoding_tag)?;
        writeln!(f, "\tchannels: {},", self.channels)?;
        writeln!(f, "\tsample_rate: {} Hz,", self.sample_rate)?;
        writeln!(f, "\tavg_bytes_per_sec: {},", self.avg_bytes_per_sec)?;
        writeln!(f, "\tblock_align: {},", self.block_align)?;
        writeln!(f, "\tbits_per_sample: {},", self.bits_per_sample)?;
        writeln!(f, "\textra_size: {},", self.extra_size)?;

        if let Some(sub) = self.sub_encoding {
            writeln!(f, "\tsub_encoding: {:#06x},", sub)?;
        }
        if let Some(bits) = self.valid_bits {
            writeln!(f, "\tvalid_bits: {},", bits)?;
        }

        writeln!(f, "\tchannel_mask: {},", self.channel_mask())?;
        writeln!(f, "}}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FactChunk {
    pub n_frames: u32,
}

impl ParseChunk for FactChunk {
    fn parse<B: ReadBytes>(reader: &mut B, chunk: &Chunk) -> Result<Self> {
        // A Fact chunk is exactly 4 bytes long, though there is some mystery as to whether there
        // can be more fields in the chunk.
        if chunk.data_size < 4 {
            return container_error(ContainerErrorKind::Malformed("wav: malformed fact chunk"));
        }

        Ok(FactChunk { n_frames: reader.read_u32()? })
    }
}

impl fmt::Display for FactChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FactChunk {{")?;
        writeln!(f, "\tn_frames: {},", self.n_frames)?;
        writeln!(f, "}}")
    }
}

pub struct ListChunk {
    pub form: [u8; 4],
    pub len: u32,
}

impl ListChunk {
    pub fn skip<B: ReadBytes>(&self, reader: &mut B) -> Result<()> {
        ChunksReader::<NullChunks>::new(Some(self.len)).finish(reader)
    }
}

impl ParseChunk for ListChunk {
    fn parse<B: ReadBytes>(reader: &mut B, chunk: &Chunk) -> Result<Self> {
        // A List chunk must contain atleast the list/form identifier. However, an empty list
        // (len == 4) is permissible.
        if chunk.data_size < 4 {
            return container_error(ContainerErrorKind::Malformed("wav: malformed list chunk"));
        }

        Ok(ListChunk { form: reader.read_quad_bytes()?, len: chunk.data_size - 4 })
    }
}

impl fmt::Display for ListChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ListChunk {{")?;
        writeln!(f, "\tform: {},", String::from_utf8_lossy(&self.form))?;
        writeln!(f, "\tlen: {},", self.len)?;
        writeln!(f, "}}")
    }
}

/// The longest INFO value that is read, longer values are truncated.
const MAX_INFO_VALUE_LEN: u32 = 64 * 1024;

pub struct InfoChunk {
    pub tag: Tag,
}

impl ParseChunk for InfoChunk {
    fn parse<B: ReadBytes>(reader: &mut B, chunk: &Chunk) -> Result<InfoChunk> {
        let len = chunk.data_size.min(MAX_INFO_VALUE_LEN);

        let value_buf = reader.read_boxed_slice_exact(len as usize)?;

        // Values are NUL terminated, and often NUL padded.
        let end = value_buf.iter().rposition(|&b| b != 0).map_or(0, |pos| pos + 1);
        let value = String::from_utf8_lossy(&value_buf[..end]);

        Ok(InfoChunk { tag: Tag::new(&chunk.id_str(), &value) })
    }
}

pub struct DataChunk {
    pub chunk: Chunk,
}

impl ParseChunk for DataChunk {
    fn parse<B: ReadBytes>(_: &mut B, chunk: &Chunk) -> Result<DataChunk> {
        Ok(DataChunk { chunk: *chunk })
    }
}

pub enum RiffWaveChunks {
    Format(ChunkParser<FormatDescriptor>),
    List(ChunkParser<ListChunk>),
    Fact(ChunkParser<FactChunk>),
    Data(ChunkParser<DataChunk>),
}

macro_rules! parser {
    ($class:expr, $result:ty, $chunk:expr) => {
        Some($class(ChunkParser::<$result>::new($chunk)))
    };
}

impl ParseChunkTag for RiffWaveChunks {
    fn parse_tag(chunk: Chunk) -> Option<Self> {
        match &chunk.id {
            b"fmt " => parser!(RiffWaveChunks::Format, FormatDescriptor, chunk),
            b"LIST" => parser!(RiffWaveChunks::List, ListChunk, chunk),
            b"fact" => parser!(RiffWaveChunks::Fact, FactChunk, chunk),
            b"data" => parser!(RiffWaveChunks::Data, DataChunk, chunk),
            _ => None,
        }
    }
}

pub enum RiffInfoListChunks {
    Info(ChunkParser<InfoChunk>),
}

impl ParseChunkTag for RiffInfoListChunks {
    fn parse_tag(chunk: Chunk) -> Option<Self> {
        // Every sub-chunk of an INFO list is a text entry.
        parser!(RiffInfoListChunks::Info, InfoChunk, chunk)
    }
}

/// Reads the entries of a `LIST` chunk of the `INFO` form into `metadata`.
pub fn read_info_chunk<B: ReadBytes>(
    reader: &mut B,
    len: u32,
    metadata: &mut Metadata,
) -> Result<()> {
    let mut info_list = ChunksReader::<RiffInfoListChunks>::new(Some(len));

    while let Some(RiffInfoListChunks::Info(info)) = info_list.next(reader)? {
        let parsed_info = info.parse(reader)?;
        info!("wav: info {}", parsed_info.tag);
        metadata.add_tag(parsed_info.tag);
    }

    info_list.finish(reader)
}
