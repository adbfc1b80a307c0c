// RiffPcm
// Copyright (c) 2024-2025 The Project RiffPcm Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Duck DK3 IMA ADPCM.
//!
//! DK3 is always stereo and codes a sum (mid) channel and a difference (side) channel with two
//! IMA predictors. The sum channel is updated twice for each update of the difference channel,
//! so every 3 nibbles produce 2 stereo frames.

use riffpcm_core::errors::Result;
use riffpcm_core::io::{BufReader, ReadBytes};
use riffpcm_core::util::clamp::clamp_i16;

use crate::common::has_preamble;
use crate::common_ima::AdpcmImaBlockStatus;

/// The preamble length of a block.
pub(crate) const PREAMBLE_LEN: usize = 16;

fn read_preamble<B: ReadBytes>(
    stream: &mut B,
) -> Result<(AdpcmImaBlockStatus, AdpcmImaBlockStatus)> {
    // Block size, channel count, and sample rate fields that duplicate the format chunk.
    stream.ignore_bytes(10)?;
    let sum_predictor = i32::from(stream.read_i16()?);
    let diff_predictor = i32::from(stream.read_i16()?);
    let sum_step_index = i32::from(stream.read_byte()?);
    let diff_step_index = i32::from(stream.read_byte()?);
    Ok((
        AdpcmImaBlockStatus::new(sum_predictor, sum_step_index),
        AdpcmImaBlockStatus::new(diff_predictor, diff_step_index),
    ))
}

pub(crate) fn decode_stereo(
    stream: &mut BufReader<'_>,
    buffers: [&mut [i16]; 2],
    frames_per_block: usize,
) -> Result<usize> {
    if !has_preamble(stream, PREAMBLE_LEN) {
        return Ok(0);
    }

    let (mut sum, mut diff) = read_preamble(stream)?;
    let mut diff_value = diff.predictor;

    // Nibbles are consumed low nibble first.
    let mut nibbles =
        stream.read_buf_bytes_available_ref().iter().flat_map(|&byte| [byte & 0x0f, byte >> 4]);

    let [left, right] = buffers;
    let mut frames = 0;

    while frames < frames_per_block {
        let (Some(sum_nibble), Some(diff_nibble)) = (nibbles.next(), nibbles.next())
        else {
            break;
        };

        sum.expand(sum_nibble);
        diff.expand(diff_nibble);
        diff_value = (diff_value + diff.predictor) / 2;

        left[frames] = clamp_i16(sum.predictor + diff_value);
        right[frames] = clamp_i16(sum.predictor - diff_value);
        frames += 1;

        if frames == frames_per_block {
            break;
        }

        let Some(sum_nibble) = nibbles.next()
        else {
            break;
        };

        sum.expand(sum_nibble);

        left[frames] = clamp_i16(sum.predictor + diff_value);
        right[frames] = clamp_i16(sum.predictor - diff_value);
        frames += 1;
    }

    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(sum: i16, diff: i16, data: &[u8]) -> Vec<u8> {
        let mut block = vec![0u8; 10];
        block.extend_from_slice(&sum.to_le_bytes());
        block.extend_from_slice(&diff.to_le_bytes());
        block.extend_from_slice(&[0, 0]);
        block.extend_from_slice(data);
        block
    }

    #[test]
    fn verify_sum_diff_schedule() {
        // Nibbles in order: sum 7, diff 7, sum 0, sum 0, diff 0, sum 0.
        let block = block(1000, 100, &[0x77, 0x00, 0x00]);

        let mut left = [0i16; 4];
        let mut right = [0i16; 4];

        let frames =
            decode_stereo(&mut BufReader::new(&block), [&mut left, &mut right], 4).unwrap();

        assert_eq!(frames, 4);

        // sum = 1013, diff = 113, diff_value = (100 + 113) / 2 = 106.
        assert_eq!((left[0], right[0]), (1119, 907));
        // sum = 1015, diff_value unchanged.
        assert_eq!((left[1], right[1]), (1121, 909));
        // sum = 1016, diff = 115, diff_value = (106 + 115) / 2 = 110.
        assert_eq!((left[2], right[2]), (1126, 906));
        // sum = 1017.
        assert_eq!((left[3], right[3]), (1127, 907));
    }

    #[test]
    fn verify_output_clamped() {
        let block = block(32000, 32000, &[0x77, 0x07]);

        let mut left = [0i16; 2];
        let mut right = [0i16; 2];

        decode_stereo(&mut BufReader::new(&block), [&mut left, &mut right], 2).unwrap();

        assert_eq!(left, [i16::MAX, i16::MAX]);
    }

    #[test]
    fn verify_partial_cycle() {
        // Two nibbles complete one frame, the third is missing.
        let block = block(0, 0, &[0x00]);

        let mut left = [0i16; 8];
        let mut right = [0i16; 8];

        let frames =
            decode_stereo(&mut BufReader::new(&block), [&mut left, &mut right], 8).unwrap();
        assert_eq!(frames, 1);

        let frames =
            decode_stereo(&mut BufReader::new(&block[..12]), [&mut left, &mut right], 8).unwrap();
        assert_eq!(frames, 0);
    }
}
