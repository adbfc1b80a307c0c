// RiffPcm
// Copyright (c) 2024-2025 The Project RiffPcm Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use riffpcm_core::errors::Result;
use riffpcm_core::io::{BufReader, ReadBytes};

use crate::common::{has_preamble, take_data, Nibble};
use crate::common_ima::AdpcmImaBlockStatus;

/// The preamble length of one channel: predictor, step index, and a reserved byte.
pub(crate) const PREAMBLE_LEN: usize = 4;

pub(crate) fn read_preamble<B: ReadBytes>(stream: &mut B) -> Result<AdpcmImaBlockStatus> {
    let predictor = i32::from(stream.read_i16()?);
    let step_index = i32::from(stream.read_byte()?);
    // reserved byte
    let _ = stream.read_byte()?;
    Ok(AdpcmImaBlockStatus::new(predictor, step_index))
}

pub(crate) fn decode_mono(
    stream: &mut BufReader<'_>,
    buffer: &mut [i16],
    frames_per_block: usize,
) -> Result<usize> {
    if !has_preamble(stream, PREAMBLE_LEN) {
        return Ok(0);
    }

    let mut status = read_preamble(stream)?;

    let mut frames = 0;
    for &nibbles in take_data(stream, frames_per_block / 2) {
        buffer[frames] = status.expand_nibble(nibbles, Nibble::Lower);
        buffer[frames + 1] = status.expand_nibble(nibbles, Nibble::Upper);
        frames += 2;
    }
    Ok(frames)
}

/// Stereo data alternates between runs of 4 bytes (8 samples) for each channel.
pub(crate) fn decode_stereo(
    stream: &mut BufReader<'_>,
    buffers: [&mut [i16]; 2],
    frames_per_block: usize,
) -> Result<usize> {
    if !has_preamble(stream, 2 * PREAMBLE_LEN) {
        return Ok(0);
    }

    let mut status = [read_preamble(stream)?, read_preamble(stream)?];
    let mut frames = [0; 2];

    for (index, &nibbles) in take_data(stream, frames_per_block).iter().enumerate() {
        let channel = (index / 4) & 1;
        let offset = (index / 8) * 8;
        let byte = index % 4;
        let slot = offset + byte * 2;

        // A block align that is not a multiple of the run length leaves a ragged tail.
        if slot + 1 >= frames_per_block {
            break;
        }

        buffers[channel][slot] = status[channel].expand_nibble(nibbles, Nibble::Lower);
        buffers[channel][slot + 1] = status[channel].expand_nibble(nibbles, Nibble::Upper);
        frames[channel] = slot + 2;
    }
    Ok(frames[0].min(frames[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preamble(predictor: i16, step_index: u8) -> Vec<u8> {
        let mut buf = predictor.to_le_bytes().to_vec();
        buf.push(step_index);
        buf.push(0);
        buf
    }

    #[test]
    fn verify_zero_nibble_from_rest() {
        let mut block = preamble(0, 0);
        block.extend_from_slice(&[0x00, 0x00]);

        let mut buffer = [i16::MIN; 4];
        let frames = decode_mono(&mut BufReader::new(&block), &mut buffer, 4).unwrap();

        assert_eq!(frames, 4);
        assert_eq!(buffer, [0; 4]);
    }

    #[test]
    fn verify_mono_nibble_order() {
        let mut block = preamble(1000, 0);
        block.push(0x07);

        let mut buffer = [0i16; 2];
        decode_mono(&mut BufReader::new(&block), &mut buffer, 2).unwrap();

        // Low nibble first: +13 at step 7, then nibble 0 at step 16 adds 2.
        assert_eq!(buffer, [1013, 1015]);
    }

    #[test]
    fn verify_step_index_clamped_in_preamble() {
        let mut block = preamble(0, 120);
        block.push(0x00);

        let mut buffer = [0i16; 2];
        decode_mono(&mut BufReader::new(&block), &mut buffer, 2).unwrap();

        // Step index 88: diff = 32767 >> 3.
        assert_eq!(buffer[0], 4095);
    }

    #[test]
    fn verify_stereo_runs() {
        let mut block = preamble(0, 0);
        block.extend(preamble(0, 0));
        // Left run: first byte positive, right run: first byte negative.
        block.extend_from_slice(&[0x07, 0, 0, 0]);
        block.extend_from_slice(&[0x0f, 0, 0, 0]);

        let mut left = [0i16; 8];
        let mut right = [0i16; 8];

        let frames =
            decode_stereo(&mut BufReader::new(&block), [&mut left, &mut right], 8).unwrap();

        assert_eq!(frames, 8);
        assert_eq!(left[0], 13);
        assert_eq!(right[0], -13);
        assert_eq!(left[1], 15);
        assert_eq!(right[1], -11);
    }

    #[test]
    fn verify_stereo_truncated_run() {
        let mut block = preamble(0, 0);
        block.extend(preamble(0, 0));
        block.extend_from_slice(&[0; 4]);
        block.extend_from_slice(&[0; 2]);

        let mut left = [0i16; 8];
        let mut right = [0i16; 8];

        let frames =
            decode_stereo(&mut BufReader::new(&block), [&mut left, &mut right], 8).unwrap();

        assert_eq!(frames, 4);
    }
}
