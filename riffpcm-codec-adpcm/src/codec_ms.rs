// RiffPcm
// Copyright (c) 2024-2025 The Project RiffPcm Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use riffpcm_core::errors::Result;
use riffpcm_core::io::{BufReader, ReadBytes};
use riffpcm_core::util::clamp::clamp_i16;

use log::debug;

use crate::common::{has_preamble, signed_nibble, take_data, Nibble};

#[rustfmt::skip]
const MS_ADAPTATION_TABLE: [i32; 16] = [
    230, 230, 230, 230, 307, 409, 512, 614,
    768, 614, 512, 409, 307, 230, 230, 230,
];

const MS_ADAPT_COEFFS1: [i32; 7] = [256, 512, 0, 192, 240, 460, 392];
const MS_ADAPT_COEFFS2: [i32; 7] = [0, -256, 0, 64, 0, -208, -232];

const DELTA_MIN: i32 = 16;

/// The preamble length of one channel: predictor index, delta, and two samples.
pub(crate) const PREAMBLE_LEN: usize = 7;

fn coeffs(block_predictor: u8) -> (i32, i32) {
    let max = MS_ADAPT_COEFFS1.len() - 1;

    if block_predictor as usize > max {
        debug!("adpcm (ms): block predictor {} clamped to {}", block_predictor, max);
    }

    let index = (block_predictor as usize).min(max);
    (MS_ADAPT_COEFFS1[index], MS_ADAPT_COEFFS2[index])
}

/// `AdpcmMsBlockStatus` contains values to decode a block
#[derive(Debug)]
struct AdpcmMsBlockStatus {
    coeff1: i32,
    coeff2: i32,
    delta: i32,
    sample1: i32,
    sample2: i32,
}

impl AdpcmMsBlockStatus {
    fn read_mono_preamble<B: ReadBytes>(stream: &mut B) -> Result<Self> {
        let (coeff1, coeff2) = coeffs(stream.read_byte()?);
        let status = Self {
            coeff1,
            coeff2,
            delta: i32::from(stream.read_i16()?),
            sample1: i32::from(stream.read_i16()?),
            sample2: i32::from(stream.read_i16()?),
        };
        Ok(status)
    }

    /// The stereo preamble interleaves the channels field by field.
    fn read_stereo_preamble<B: ReadBytes>(stream: &mut B) -> Result<(Self, Self)> {
        let (left_coeff1, left_coeff2) = coeffs(stream.read_byte()?);
        let (right_coeff1, right_coeff2) = coeffs(stream.read_byte()?);
        let left_delta = i32::from(stream.read_i16()?);
        let right_delta = i32::from(stream.read_i16()?);
        let left_sample1 = i32::from(stream.read_i16()?);
        let right_sample1 = i32::from(stream.read_i16()?);
        let left_sample2 = i32::from(stream.read_i16()?);
        let right_sample2 = i32::from(stream.read_i16()?);
        Ok((
            Self {
                coeff1: left_coeff1,
                coeff2: left_coeff2,
                delta: left_delta,
                sample1: left_sample1,
                sample2: left_sample2,
            },
            Self {
                coeff1: right_coeff1,
                coeff2: right_coeff2,
                delta: right_delta,
                sample1: right_sample1,
                sample2: right_sample2,
            },
        ))
    }

    fn expand_nibble(&mut self, byte: u8, nibble: Nibble) -> i16 {
        let nibble = nibble.get_nibble(byte);
        let predictor = ((self.sample1 * self.coeff1) + (self.sample2 * self.coeff2)) / 256
            + signed_nibble(nibble) * self.delta;
        self.sample2 = self.sample1;
        self.sample1 = clamp_i16(predictor) as i32;
        // Delta is a 16-bit quantity in the bitstream.
        let delta = (MS_ADAPTATION_TABLE[nibble as usize] * self.delta) / 256;
        self.delta = i32::from(clamp_i16(delta)).max(DELTA_MIN);
        self.sample1 as i16
    }
}

pub(crate) fn decode_mono(
    stream: &mut BufReader<'_>,
    buffer: &mut [i16],
    frames_per_block: usize,
) -> Result<usize> {
    if !has_preamble(stream, PREAMBLE_LEN) {
        return Ok(0);
    }

    let mut status = AdpcmMsBlockStatus::read_mono_preamble(stream)?;
    buffer[0] = status.sample2 as i16;
    buffer[1] = status.sample1 as i16;

    let mut frames = 2;
    for &nibbles in take_data(stream, (frames_per_block - 2) / 2) {
        buffer[frames] = status.expand_nibble(nibbles, Nibble::Upper);
        buffer[frames + 1] = status.expand_nibble(nibbles, Nibble::Lower);
        frames += 2;
    }
    Ok(frames)
}

pub(crate) fn decode_stereo(
    stream: &mut BufReader<'_>,
    buffers: [&mut [i16]; 2],
    frames_per_block: usize,
) -> Result<usize> {
    if !has_preamble(stream, 2 * PREAMBLE_LEN) {
        return Ok(0);
    }

    let (mut left_status, mut right_status) = AdpcmMsBlockStatus::read_stereo_preamble(stream)?;
    buffers[0][0] = left_status.sample2 as i16;
    buffers[0][1] = left_status.sample1 as i16;
    buffers[1][0] = right_status.sample2 as i16;
    buffers[1][1] = right_status.sample1 as i16;

    let mut frames = 2;
    for &nibbles in take_data(stream, frames_per_block - 2) {
        buffers[0][frames] = left_status.expand_nibble(nibbles, Nibble::Upper);
        buffers[1][frames] = right_status.expand_nibble(nibbles, Nibble::Lower);
        frames += 1;
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono_block(predictor: u8, delta: i16, sample1: i16, sample2: i16, data: &[u8]) -> Vec<u8> {
        let mut block = vec![predictor];
        block.extend_from_slice(&delta.to_le_bytes());
        block.extend_from_slice(&sample1.to_le_bytes());
        block.extend_from_slice(&sample2.to_le_bytes());
        block.extend_from_slice(data);
        block
    }

    #[test]
    fn verify_zero_history_zero_nibble() {
        let block = mono_block(0, 16, 0, 0, &[0x00]);
        let mut buffer = [i16::MAX; 4];

        let frames = decode_mono(&mut BufReader::new(&block), &mut buffer, 4).unwrap();

        assert_eq!(frames, 4);
        assert_eq!(buffer, [0, 0, 0, 0]);
    }

    #[test]
    fn verify_preamble_samples_emitted_first() {
        let block = mono_block(1, 16, 100, -50, &[0x10]);
        let mut buffer = [0i16; 4];

        decode_mono(&mut BufReader::new(&block), &mut buffer, 4).unwrap();

        // Predictor 1: (100 * 512 - 50 * -256) / 256 = 250, plus 1 * 16.
        assert_eq!(buffer[0], -50);
        assert_eq!(buffer[1], 100);
        assert_eq!(buffer[2], 266);
    }

    #[test]
    fn verify_delta_floor() {
        let mut status =
            AdpcmMsBlockStatus { coeff1: 256, coeff2: 0, delta: 16, sample1: 0, sample2: 0 };

        for byte in 0..=255u8 {
            status.expand_nibble(byte, Nibble::Upper);
            assert!(status.delta >= DELTA_MIN);
            status.expand_nibble(byte, Nibble::Lower);
            assert!(status.delta >= DELTA_MIN);
        }

        // A large delta adapts upwards but stays within 16 bits.
        let mut status =
            AdpcmMsBlockStatus { coeff1: 256, coeff2: 0, delta: 30000, sample1: 0, sample2: 0 };

        for _ in 0..8 {
            status.expand_nibble(0x80, Nibble::Upper);
            assert!(status.delta <= i32::from(i16::MAX));
        }
    }

    #[test]
    fn verify_predictor_index_clamped() {
        let block = mono_block(200, 16, 0, 0, &[0x11]);
        let mut buffer = [0i16; 4];

        assert_eq!(decode_mono(&mut BufReader::new(&block), &mut buffer, 4).unwrap(), 4);
        assert_eq!(&buffer[2..], &[16, 40]);
    }

    #[test]
    fn verify_stereo_interleave() {
        let mut block = vec![0, 0];
        block.extend_from_slice(&16i16.to_le_bytes());
        block.extend_from_slice(&32i16.to_le_bytes());
        block.extend_from_slice(&10i16.to_le_bytes());
        block.extend_from_slice(&(-10i16).to_le_bytes());
        block.extend_from_slice(&20i16.to_le_bytes());
        block.extend_from_slice(&(-20i16).to_le_bytes());
        block.push(0x1f);

        let mut left = [0i16; 3];
        let mut right = [0i16; 3];

        let frames =
            decode_stereo(&mut BufReader::new(&block), [&mut left, &mut right], 3).unwrap();

        assert_eq!(frames, 3);
        assert_eq!(left, [20, 10, 26]);
        assert_eq!(right, [-20, -10, -42]);
    }

    #[test]
    fn verify_truncated_block() {
        let block = mono_block(0, 16, 0, 0, &[0x11, 0x11]);
        let mut buffer = [0i16; 10];

        // Four data bytes expected, two present.
        assert_eq!(decode_mono(&mut BufReader::new(&block), &mut buffer, 10).unwrap(), 6);

        // Preamble cut short.
        assert_eq!(decode_mono(&mut BufReader::new(&block[..5]), &mut buffer, 10).unwrap(), 0);
    }
}
