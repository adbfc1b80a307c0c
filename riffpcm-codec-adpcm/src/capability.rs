// RiffPcm
// Copyright (c) 2024-2025 The Project RiffPcm Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The table of supported ADPCM format tags and the block geometry of each variant.

use riffpcm_core::audio::Channels;
use riffpcm_core::codecs::{CodecParameters, CodecType};
use riffpcm_core::codecs::{
    CODEC_TYPE_ADPCM_EA, CODEC_TYPE_ADPCM_IMA_DK3, CODEC_TYPE_ADPCM_IMA_DK4,
    CODEC_TYPE_ADPCM_IMA_QT, CODEC_TYPE_ADPCM_IMA_WAV, CODEC_TYPE_ADPCM_MS,
};
use riffpcm_core::errors::{
    invalid_parameters_error, unsupported_encoding_error, ParameterErrorKind, Result,
};

use log::warn;

use crate::{codec_dk3, codec_ima_qt, codec_ima_wav, codec_ms};

/// Microsoft ADPCM.
pub const WAVE_FORMAT_ADPCM: u16 = 0x0002;
/// IMA ADPCM as written by Microsoft (also known as DVI ADPCM).
pub const WAVE_FORMAT_IMA_ADPCM: u16 = 0x0011;
/// Duck DK4 IMA ADPCM.
pub const WAVE_FORMAT_DUCK_DK4: u16 = 0x0061;
/// Duck DK3 IMA ADPCM.
pub const WAVE_FORMAT_DUCK_DK3: u16 = 0x0062;
/// QuickTime IMA4 ADPCM.
pub const WAVE_FORMAT_IMA_QT: u16 = 0x00a4;
/// Electronic Arts ADPCM. This tag is private to RiffPcm, EA streams carry no registered tag.
pub const WAVE_FORMAT_EA_ADPCM: u16 = 0x4541;

/// The default block size substituted when a stream declares a block align of 0.
const DEFAULT_BLOCK_ALIGN: u32 = 1024;

/// `AdpcmVariant` names one of the supported ADPCM bitstreams.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AdpcmVariant {
    Ms,
    ImaWav,
    ImaQt,
    Dk4,
    Dk3,
    Ea,
}

struct Capability {
    tag: u16,
    variant: AdpcmVariant,
    codec: CodecType,
    max_channels: u16,
}

const CAPABILITIES: [Capability; 6] = [
    Capability {
        tag: WAVE_FORMAT_ADPCM,
        variant: AdpcmVariant::Ms,
        codec: CODEC_TYPE_ADPCM_MS,
        max_channels: 2,
    },
    Capability {
        tag: WAVE_FORMAT_IMA_ADPCM,
        variant: AdpcmVariant::ImaWav,
        codec: CODEC_TYPE_ADPCM_IMA_WAV,
        max_channels: 2,
    },
    Capability {
        tag: WAVE_FORMAT_DUCK_DK4,
        variant: AdpcmVariant::Dk4,
        codec: CODEC_TYPE_ADPCM_IMA_DK4,
        max_channels: 2,
    },
    Capability {
        tag: WAVE_FORMAT_DUCK_DK3,
        variant: AdpcmVariant::Dk3,
        codec: CODEC_TYPE_ADPCM_IMA_DK3,
        max_channels: 2,
    },
    Capability {
        tag: WAVE_FORMAT_IMA_QT,
        variant: AdpcmVariant::ImaQt,
        codec: CODEC_TYPE_ADPCM_IMA_QT,
        max_channels: 2,
    },
    Capability {
        tag: WAVE_FORMAT_EA_ADPCM,
        variant: AdpcmVariant::Ea,
        codec: CODEC_TYPE_ADPCM_EA,
        max_channels: 2,
    },
];

impl AdpcmVariant {
    fn capability(self) -> &'static Capability {
        // Every variant has exactly one entry.
        match self {
            AdpcmVariant::Ms => &CAPABILITIES[0],
            AdpcmVariant::ImaWav => &CAPABILITIES[1],
            AdpcmVariant::Dk4 => &CAPABILITIES[2],
            AdpcmVariant::Dk3 => &CAPABILITIES[3],
            AdpcmVariant::ImaQt => &CAPABILITIES[4],
            AdpcmVariant::Ea => &CAPABILITIES[5],
        }
    }

    /// Gets the variant for a WAVE format tag.
    pub fn for_tag(tag: u16) -> Option<AdpcmVariant> {
        CAPABILITIES.iter().find(|cap| cap.tag == tag).map(|cap| cap.variant)
    }

    /// Gets the variant decoding a codec.
    pub fn for_codec(codec: CodecType) -> Option<AdpcmVariant> {
        CAPABILITIES.iter().find(|cap| cap.codec == codec).map(|cap| cap.variant)
    }

    /// Gets the WAVE format tag of the variant.
    pub fn tag(self) -> u16 {
        self.capability().tag
    }

    /// Gets the codec type of the variant.
    pub fn codec(self) -> CodecType {
        self.capability().codec
    }

    /// Gets the maximum number of channels the variant can code.
    pub fn max_channels(self) -> u16 {
        self.capability().max_channels
    }

    /// Gets the block align used when a stream declares none.
    pub fn default_block_align(self, channels: u16) -> u32 {
        match self {
            AdpcmVariant::ImaQt => (codec_ima_qt::PACKET_LEN as u32) * u32::from(channels),
            _ => DEFAULT_BLOCK_ALIGN,
        }
    }

    /// Gets the length of the preamble(s) at the start of every block.
    pub fn preamble_len(self, channels: u16) -> u32 {
        let channels = u32::from(channels);

        match self {
            AdpcmVariant::Ms => codec_ms::PREAMBLE_LEN as u32 * channels,
            AdpcmVariant::ImaWav | AdpcmVariant::Dk4 => {
                codec_ima_wav::PREAMBLE_LEN as u32 * channels
            }
            AdpcmVariant::ImaQt => 2 * channels,
            AdpcmVariant::Dk3 => codec_dk3::PREAMBLE_LEN as u32,
            AdpcmVariant::Ea => channels,
        }
    }

    /// Computes the number of frames in one block. The result is not positive if the block
    /// align is too small for the channel count.
    pub fn frames_per_block(self, block_align: u32, channels: u16) -> i64 {
        let block_align = i64::from(block_align);
        let ch = i64::from(channels);

        match self {
            AdpcmVariant::Ms => 2 * (block_align - 7 * ch) / ch + 2,
            AdpcmVariant::ImaWav => 2 * (block_align - 4 * ch) / ch,
            AdpcmVariant::Dk4 => (block_align - 4 * ch) / ch + 1,
            AdpcmVariant::Dk3 => (4 * (block_align - 16) + 2) / 3,
            AdpcmVariant::Ea => 2 * (block_align - ch) / ch,
            AdpcmVariant::ImaQt => codec_ima_qt::FRAMES_PER_PACKET as i64,
        }
    }
}

/// Resolves the decoder parameters of an ADPCM stream from its format chunk fields.
///
/// A block align of 0 is replaced by the variant's default. DK3 streams are always decoded as
/// stereo.
pub fn codec_params_for_format(
    tag: u16,
    channels: u16,
    sample_rate: u32,
    block_align: u16,
) -> Result<CodecParameters> {
    let Some(variant) = AdpcmVariant::for_tag(tag)
    else {
        return unsupported_encoding_error(tag);
    };

    if channels == 0 {
        return invalid_parameters_error(ParameterErrorKind::InvalidChannelCount(channels));
    }

    let channels = match variant {
        AdpcmVariant::Dk3 if channels != 2 => {
            warn!("adpcm (dk3): {} channels declared, decoding as stereo", channels);
            2
        }
        _ if channels > variant.max_channels() => {
            return invalid_parameters_error(ParameterErrorKind::InvalidChannelCount(channels));
        }
        _ => channels,
    };

    let block_align = match u32::from(block_align) {
        0 => {
            let default = variant.default_block_align(channels);
            warn!("adpcm: block align is 0, assuming {} bytes", default);
            default
        }
        block_align => block_align,
    };

    // A block must hold atleast its preamble.
    if block_align < variant.preamble_len(channels) {
        return invalid_parameters_error(ParameterErrorKind::ZeroSamplesPerBlock);
    }

    let frames_per_block = variant.frames_per_block(block_align, channels);

    if frames_per_block <= 0 {
        return invalid_parameters_error(ParameterErrorKind::ZeroSamplesPerBlock);
    }

    let mut params = CodecParameters::new();
    params
        .for_codec(variant.codec())
        .with_sample_rate(sample_rate)
        .with_channels(Channels::default_for_count(channels))
        .with_bits_per_coded_sample(4)
        .with_bits_per_sample(16)
        .with_block_align(block_align)
        .with_frames_per_block(frames_per_block as u64);

    Ok(params)
}
