// RiffPcm
// Copyright (c) 2024-2025 The Project RiffPcm Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `codecs` module provides the types used to describe an encoded or decoded audio stream.

use std::fmt;

use crate::audio::Channels;

/// A `CodecType` is a unique identifier used to identify a specific codec.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CodecType(u32);

impl CodecType {
    /// Gets the raw identifier.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CodecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Null codec.
pub const CODEC_TYPE_NULL: CodecType = CodecType(0x0);

// Uncompressed PCM audio codecs
//------------------------------

/// PCM signed 16-bit little-endian interleaved.
pub const CODEC_TYPE_PCM_S16LE: CodecType = CodecType(0x108);

// ADPCM audio codecs
//-------------------

/// ADPCM Microsoft.
pub const CODEC_TYPE_ADPCM_MS: CodecType = CodecType(0x203);
/// ADPCM IMA WAV.
pub const CODEC_TYPE_ADPCM_IMA_WAV: CodecType = CodecType(0x204);
/// ADPCM IMA QuickTime.
pub const CODEC_TYPE_ADPCM_IMA_QT: CodecType = CodecType(0x205);
/// ADPCM IMA Duck DK3.
pub const CODEC_TYPE_ADPCM_IMA_DK3: CodecType = CodecType(0x206);
/// ADPCM IMA Duck DK4.
pub const CODEC_TYPE_ADPCM_IMA_DK4: CodecType = CodecType(0x207);
/// ADPCM Electronic Arts.
pub const CODEC_TYPE_ADPCM_EA: CodecType = CodecType(0x208);

/// A `CodecDescriptor` stores a description of a single logical codec.
#[derive(Copy, Clone, Debug)]
pub struct CodecDescriptor {
    /// The `CodecType` identifier.
    pub codec: CodecType,
    /// A short ASCII-only string identifying the codec.
    pub short_name: &'static str,
    /// A longer, more descriptive, string identifying the codec.
    pub long_name: &'static str,
}

/// Convenience macro for declaring a `CodecDescriptor`.
#[macro_export]
macro_rules! support_codec {
    ($type:expr, $short_name:expr, $long_name:expr) => {
        $crate::codecs::CodecDescriptor {
            codec: $type,
            short_name: $short_name,
            long_name: $long_name,
        }
    };
}

/// Codec parameters stored in a container format's headers and metadata may be passed to a codec
/// using the `CodecParameters` structure.
#[derive(Clone, Debug, Default)]
pub struct CodecParameters {
    /// The codec type.
    pub codec: CodecType,

    /// The sample rate of the audio in Hz.
    pub sample_rate: Option<u32>,

    /// The length of the stream in number of frames.
    pub n_frames: Option<u64>,

    /// The number of bits per one decoded audio sample.
    pub bits_per_sample: Option<u32>,

    /// The number of bits per one encoded audio sample.
    pub bits_per_coded_sample: Option<u32>,

    /// A bitmask of all channels in the stream.
    pub channels: Option<Channels>,

    /// The size in bytes of one encoded block.
    pub block_align: Option<u32>,

    /// The number of frames per encoded block.
    pub frames_per_block: Option<u64>,
}

impl Default for CodecType {
    fn default() -> Self {
        CODEC_TYPE_NULL
    }
}

impl CodecParameters {
    pub fn new() -> CodecParameters {
        Default::default()
    }

    /// Provide the `CodecType`.
    pub fn for_codec(&mut self, codec: CodecType) -> &mut Self {
        self.codec = codec;
        self
    }

    /// Provide the sample rate in Hz.
    pub fn with_sample_rate(&mut self, sample_rate: u32) -> &mut Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    /// Provide the total number of frames.
    pub fn with_n_frames(&mut self, n_frames: u64) -> &mut Self {
        self.n_frames = Some(n_frames);
        self
    }

    /// Provide the bit per sample of a decoded audio sample.
    pub fn with_bits_per_sample(&mut self, bits_per_sample: u32) -> &mut Self {
        self.bits_per_sample = Some(bits_per_sample);
        self
    }

    /// Provide the bits per sample of an encoded audio sample.
    pub fn with_bits_per_coded_sample(&mut self, bits_per_coded_sample: u32) -> &mut Self {
        self.bits_per_coded_sample = Some(bits_per_coded_sample);
        self
    }

    /// Provide the channel map.
    pub fn with_channels(&mut self, channels: Channels) -> &mut Self {
        self.channels = Some(channels);
        self
    }

    /// Provide the size of one encoded block in bytes.
    pub fn with_block_align(&mut self, block_align: u32) -> &mut Self {
        self.block_align = Some(block_align);
        self
    }

    /// Provide the number of frames per encoded block.
    pub fn with_frames_per_block(&mut self, len: u64) -> &mut Self {
        self.frames_per_block = Some(len);
        self
    }
}
