// RiffPcm
// Copyright (c) 2024-2025 The Project RiffPcm Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]
// The following lints are allowed in all RiffPcm crates. Please see the workspace Cargo.toml for
// their justification.
#![allow(clippy::comparison_chain)]
#![allow(clippy::identity_op)]
#![allow(clippy::manual_range_contains)]

//! Block decoders for the ADPCM encodings found in WAVE files.

use riffpcm_core::support_codec;

use riffpcm_core::audio::{AudioBuffer, SignalSpec};
use riffpcm_core::codecs::{CodecDescriptor, CodecParameters};
use riffpcm_core::codecs::{
    CODEC_TYPE_ADPCM_EA, CODEC_TYPE_ADPCM_IMA_DK3, CODEC_TYPE_ADPCM_IMA_DK4,
    CODEC_TYPE_ADPCM_IMA_QT, CODEC_TYPE_ADPCM_IMA_WAV, CODEC_TYPE_ADPCM_MS,
};
use riffpcm_core::errors::{unsupported_error, Result};
use riffpcm_core::io::BufReader;

use log::warn;

mod capability;
mod codec_dk3;
mod codec_dk4;
mod codec_ea;
mod codec_ima_qt;
mod codec_ima_wav;
mod codec_ms;
mod common;
mod common_ima;

pub use capability::{
    codec_params_for_format, AdpcmVariant, WAVE_FORMAT_ADPCM, WAVE_FORMAT_DUCK_DK3,
    WAVE_FORMAT_DUCK_DK4, WAVE_FORMAT_EA_ADPCM, WAVE_FORMAT_IMA_ADPCM, WAVE_FORMAT_IMA_QT,
};

use codec_ea::AdpcmEaState;

enum InnerDecoder {
    AdpcmMs,
    AdpcmImaWav,
    AdpcmImaQt,
    AdpcmDk4,
    AdpcmDk3,
    AdpcmEa(AdpcmEaState),
}

impl InnerDecoder {
    fn new(variant: AdpcmVariant) -> Self {
        match variant {
            AdpcmVariant::Ms => InnerDecoder::AdpcmMs,
            AdpcmVariant::ImaWav => InnerDecoder::AdpcmImaWav,
            AdpcmVariant::ImaQt => InnerDecoder::AdpcmImaQt,
            AdpcmVariant::Dk4 => InnerDecoder::AdpcmDk4,
            AdpcmVariant::Dk3 => InnerDecoder::AdpcmDk3,
            AdpcmVariant::Ea => InnerDecoder::AdpcmEa(Default::default()),
        }
    }

    fn reset(&mut self) {
        // Only EA keeps state between blocks.
        if let InnerDecoder::AdpcmEa(state) = self {
            state.reset();
        }
    }

    fn decode_mono(
        &mut self,
        stream: &mut BufReader<'_>,
        buffer: &mut [i16],
        frames_per_block: usize,
    ) -> Result<usize> {
        match self {
            InnerDecoder::AdpcmMs => codec_ms::decode_mono(stream, buffer, frames_per_block),
            InnerDecoder::AdpcmImaWav => {
                codec_ima_wav::decode_mono(stream, buffer, frames_per_block)
            }
            InnerDecoder::AdpcmImaQt => codec_ima_qt::decode_mono(stream, buffer),
            InnerDecoder::AdpcmDk4 => codec_dk4::decode_mono(stream, buffer, frames_per_block),
            // DK3 decoders are always created with two channels.
            InnerDecoder::AdpcmDk3 => unreachable!(),
            InnerDecoder::AdpcmEa(state) => state.decode_mono(stream, buffer, frames_per_block),
        }
    }

    fn decode_stereo(
        &mut self,
        stream: &mut BufReader<'_>,
        buffers: [&mut [i16]; 2],
        frames_per_block: usize,
    ) -> Result<usize> {
        match self {
            InnerDecoder::AdpcmMs => codec_ms::decode_stereo(stream, buffers, frames_per_block),
            InnerDecoder::AdpcmImaWav => {
                codec_ima_wav::decode_stereo(stream, buffers, frames_per_block)
            }
            InnerDecoder::AdpcmImaQt => codec_ima_qt::decode_stereo(stream, buffers),
            InnerDecoder::AdpcmDk4 => codec_dk4::decode_stereo(stream, buffers, frames_per_block),
            InnerDecoder::AdpcmDk3 => codec_dk3::decode_stereo(stream, buffers, frames_per_block),
            InnerDecoder::AdpcmEa(state) => {
                state.decode_stereo(stream, buffers, frames_per_block)
            }
        }
    }
}

/// Adaptive Differential Pulse Code Modulation (ADPCM) decoder.
///
/// The decoder consumes one compressed block per call to [`AdpcmDecoder::decode`] and produces
/// up to `frames_per_block` frames of 16-bit audio.
pub struct AdpcmDecoder {
    params: CodecParameters,
    variant: AdpcmVariant,
    inner_decoder: InnerDecoder,
    frames_per_block: usize,
    block_align: usize,
    buf: AudioBuffer,
}

impl AdpcmDecoder {
    pub fn try_new(params: &CodecParameters) -> Result<Self> {
        // This decoder only supports certain ADPCM codecs.
        let Some(variant) = AdpcmVariant::for_codec(params.codec)
        else {
            return unsupported_error("adpcm: invalid codec type");
        };

        let frames_per_block = match params.frames_per_block {
            Some(frames) if frames > 0 => frames as usize,
            _ => return unsupported_error("adpcm: valid frames per block is required"),
        };

        let block_align = match params.block_align {
            Some(block_align) if block_align > 0 => block_align,
            _ => return unsupported_error("adpcm: valid block align is required"),
        };

        let rate = match params.sample_rate {
            Some(rate) => rate,
            _ => return unsupported_error("adpcm: sample rate is required"),
        };

        let channels = match params.channels.map(|channels| channels.count()) {
            Some(2) => 2,
            Some(1) if variant != AdpcmVariant::Dk3 => 1,
            Some(_) => return unsupported_error("adpcm: unsupported channel count"),
            None => return unsupported_error("adpcm: channels are required"),
        };

        // The output buffer is sized from frames per block, so it must agree with the block
        // geometry.
        if block_align < variant.preamble_len(channels as u16) {
            return unsupported_error("adpcm: block align is shorter than the preamble");
        }

        if variant.frames_per_block(block_align, channels as u16) != frames_per_block as i64 {
            return unsupported_error("adpcm: frames per block does not match block align");
        }

        Ok(AdpcmDecoder {
            params: params.clone(),
            variant,
            inner_decoder: InnerDecoder::new(variant),
            frames_per_block,
            block_align: block_align as usize,
            buf: AudioBuffer::new(frames_per_block, SignalSpec::new(rate, channels)),
        })
    }

    pub fn supported_codecs() -> &'static [CodecDescriptor] {
        &[
            support_codec!(CODEC_TYPE_ADPCM_MS, "adpcm_ms", "Microsoft ADPCM"),
            support_codec!(CODEC_TYPE_ADPCM_IMA_WAV, "adpcm_ima_wav", "ADPCM IMA WAV"),
            support_codec!(CODEC_TYPE_ADPCM_IMA_QT, "adpcm_ima_qt", "ADPCM IMA QuickTime"),
            support_codec!(CODEC_TYPE_ADPCM_IMA_DK3, "adpcm_ima_dk3", "ADPCM IMA Duck DK3"),
            support_codec!(CODEC_TYPE_ADPCM_IMA_DK4, "adpcm_ima_dk4", "ADPCM IMA Duck DK4"),
            support_codec!(CODEC_TYPE_ADPCM_EA, "adpcm_ea", "ADPCM Electronic Arts"),
        ]
    }

    /// Gets the variant being decoded.
    pub fn variant(&self) -> AdpcmVariant {
        self.variant
    }

    pub fn codec_params(&self) -> &CodecParameters {
        &self.params
    }

    /// Gets the number of frames in a complete block.
    pub fn frames_per_block(&self) -> usize {
        self.frames_per_block
    }

    /// Clears all state carried between blocks. Must be called after seeking.
    pub fn reset(&mut self) {
        self.inner_decoder.reset();
        self.buf.clear();
    }

    fn decode_inner(&mut self, block: &[u8]) -> Result<usize> {
        let mut stream = BufReader::new(block);

        self.buf.clear();

        let frames = match self.buf.spec().channels {
            1 => {
                let buffer = self.buf.chan_mut(0);
                self.inner_decoder.decode_mono(&mut stream, buffer, self.frames_per_block)?
            }
            2 => {
                let (left, right) = self.buf.chan_pair_mut(0, 1);
                self.inner_decoder.decode_stereo(
                    &mut stream,
                    [left, right],
                    self.frames_per_block,
                )?
            }
            _ => unreachable!(),
        };

        self.buf.render_reserved(frames);
        Ok(frames)
    }

    /// Decodes one block, returning the number of frames produced.
    ///
    /// A block shorter than the block align is decoded as far as its complete nibbles allow.
    /// Bytes past the block align are ignored.
    pub fn decode(&mut self, block: &[u8]) -> Result<usize> {
        let block = &block[..block.len().min(self.block_align)];

        if block.len() < self.block_align {
            warn!("adpcm: truncated block, {} of {} bytes", block.len(), self.block_align);
        }

        match self.decode_inner(block) {
            Ok(frames) => Ok(frames),
            Err(err) => {
                self.buf.clear();
                Err(err)
            }
        }
    }

    /// Gets the audio decoded from the last block.
    pub fn last_decoded(&self) -> &AudioBuffer {
        &self.buf
    }

    /// Writes the last decoded block as interleaved little-endian 16-bit samples, returning the
    /// number of bytes written.
    pub fn write_interleaved_le(&self, dest: &mut [u8]) -> usize {
        self.buf.copy_interleaved_le(dest)
    }
}

#[cfg(test)]
mod tests {
    use riffpcm_core::codecs::CODEC_TYPE_PCM_S16LE;
    use riffpcm_core::errors::Error;

    use super::*;

    /// A deterministic pseudo-random byte generator.
    fn lcg_bytes(len: usize, seed: u32) -> Vec<u8> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
                (state >> 16) as u8
            })
            .collect()
    }

    fn decoder(tag: u16, channels: u16, block_align: u16) -> AdpcmDecoder {
        let params = codec_params_for_format(tag, channels, 22050, block_align).unwrap();
        AdpcmDecoder::try_new(&params).unwrap()
    }

    #[test]
    fn verify_rejects_other_codecs() {
        let mut params = CodecParameters::new();
        params.for_codec(CODEC_TYPE_PCM_S16LE).with_sample_rate(8000);

        assert!(matches!(AdpcmDecoder::try_new(&params), Err(Error::Unsupported(_))));
    }

    #[test]
    fn verify_rejects_mismatched_geometry() {
        // Frames per block smaller than the block yields.
        let mut params = codec_params_for_format(WAVE_FORMAT_ADPCM, 1, 8000, 256).unwrap();
        params.with_frames_per_block(1);
        assert!(matches!(AdpcmDecoder::try_new(&params), Err(Error::Unsupported(_))));

        // QuickTime packets always hold 64 frames.
        let mut params = codec_params_for_format(WAVE_FORMAT_IMA_QT, 1, 8000, 34).unwrap();
        params.with_frames_per_block(10);
        assert!(matches!(AdpcmDecoder::try_new(&params), Err(Error::Unsupported(_))));

        // Block align shorter than the preamble.
        let mut params = codec_params_for_format(WAVE_FORMAT_ADPCM, 2, 8000, 256).unwrap();
        params.with_block_align(10).with_frames_per_block(2);
        assert!(matches!(AdpcmDecoder::try_new(&params), Err(Error::Unsupported(_))));

        // Parameters from the format chunk are accepted as-is.
        let params = codec_params_for_format(WAVE_FORMAT_IMA_QT, 2, 8000, 68).unwrap();
        assert!(AdpcmDecoder::try_new(&params).is_ok());
    }

    #[test]
    fn verify_full_blocks_fill_frames_per_block() {
        let cases = [
            (WAVE_FORMAT_ADPCM, 1, 256),
            (WAVE_FORMAT_ADPCM, 2, 512),
            (WAVE_FORMAT_IMA_ADPCM, 1, 256),
            (WAVE_FORMAT_IMA_ADPCM, 2, 512),
            (WAVE_FORMAT_IMA_QT, 1, 34),
            (WAVE_FORMAT_IMA_QT, 2, 68),
            (WAVE_FORMAT_DUCK_DK4, 1, 256),
            (WAVE_FORMAT_DUCK_DK4, 2, 512),
            (WAVE_FORMAT_DUCK_DK3, 2, 1024),
            (WAVE_FORMAT_EA_ADPCM, 1, 128),
            (WAVE_FORMAT_EA_ADPCM, 2, 128),
        ];

        for (tag, channels, block_align) in cases {
            let mut decoder = decoder(tag, channels, block_align);
            let block = lcg_bytes(usize::from(block_align), u32::from(tag));

            let frames = decoder.decode(&block).unwrap();

            assert_eq!(frames, decoder.frames_per_block(), "tag {:#x}", tag);
            assert_eq!(decoder.last_decoded().frames(), frames);
        }
    }

    #[test]
    fn verify_deterministic() {
        let block = lcg_bytes(512, 7);

        let mut first = decoder(WAVE_FORMAT_ADPCM, 2, 512);
        let mut second = decoder(WAVE_FORMAT_ADPCM, 2, 512);

        first.decode(&block).unwrap();
        second.decode(&block).unwrap();

        assert_eq!(first.last_decoded().chan(0), second.last_decoded().chan(0));
        assert_eq!(first.last_decoded().chan(1), second.last_decoded().chan(1));
    }

    #[test]
    fn verify_truncated_block() {
        let mut decoder = decoder(WAVE_FORMAT_IMA_ADPCM, 1, 256);
        let block = lcg_bytes(256, 3);

        // Preamble plus 10 data bytes.
        assert_eq!(decoder.decode(&block[..14]).unwrap(), 20);

        // Preamble cut short.
        assert_eq!(decoder.decode(&block[..3]).unwrap(), 0);
        assert_eq!(decoder.last_decoded().frames(), 0);

        // Extra bytes are ignored.
        let mut long_block = block.clone();
        long_block.extend_from_slice(&[0xff; 16]);
        assert_eq!(decoder.decode(&long_block).unwrap(), 504);
    }

    #[test]
    fn verify_ea_reset() {
        let mut block = lcg_bytes(64, 11);
        // Coefficients (460, -208) make every sample depend on the history.
        block[0] = 0x24;

        let mut decoder = decoder(WAVE_FORMAT_EA_ADPCM, 1, 64);

        decoder.decode(&block).unwrap();
        let first = decoder.last_decoded().chan(0).to_vec();

        // The history of the previous block changes the output.
        decoder.decode(&block).unwrap();
        let second = decoder.last_decoded().chan(0).to_vec();

        decoder.reset();
        decoder.decode(&block).unwrap();

        assert_eq!(decoder.last_decoded().chan(0), &first[..]);
        assert_ne!(first, second);
    }

    #[test]
    fn verify_interleaved_output() {
        let mut decoder = decoder(WAVE_FORMAT_DUCK_DK4, 2, 10);

        let mut block = 1000i16.to_le_bytes().to_vec();
        block.extend_from_slice(&[0, 0]);
        block.extend_from_slice(&(-1000i16).to_le_bytes());
        block.extend_from_slice(&[0, 0]);
        block.extend_from_slice(&[0x00, 0x00]);

        assert_eq!(decoder.decode(&block).unwrap(), 2);

        let mut out = [0u8; 8];
        assert_eq!(decoder.write_interleaved_le(&mut out), 8);

        assert_eq!(i16::from_le_bytes([out[0], out[1]]), 1000);
        assert_eq!(i16::from_le_bytes([out[2], out[3]]), -1000);
        assert_eq!(i16::from_le_bytes([out[4], out[5]]), 1000);
        assert_eq!(i16::from_le_bytes([out[6], out[7]]), -1000);
    }

    #[test]
    fn verify_supported_codecs() {
        for descriptor in AdpcmDecoder::supported_codecs() {
            assert!(AdpcmVariant::for_codec(descriptor.codec).is_some());
        }
        assert_eq!(AdpcmDecoder::supported_codecs().len(), 6);
    }
}
