// RiffPcm
// Copyright (c) 2024-2025 The Project RiffPcm Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Duck DK4 IMA ADPCM.
//!
//! DK4 shares the IMA-WAV preamble, but the preamble predictor is the first output sample. Each
//! data byte codes a single sample in its high nibble. The low nibble is ignored. Stereo data bytes
//! alternate between the left and right channels.

use riffpcm_core::errors::Result;
use riffpcm_core::io::BufReader;

use crate::codec_ima_wav::{read_preamble, PREAMBLE_LEN};
use crate::common::{has_preamble, take_data, Nibble};

pub(crate) fn decode_mono(
    stream: &mut BufReader<'_>,
    buffer: &mut [i16],
    frames_per_block: usize,
) -> Result<usize> {
    if !has_preamble(stream, PREAMBLE_LEN) {
        return Ok(0);
    }

    let mut status = read_preamble(stream)?;
    buffer[0] = status.predictor as i16;

    let mut frames = 1;
    for &byte in take_data(stream, frames_per_block - 1) {
        buffer[frames] = status.expand_nibble(byte, Nibble::Upper);
        frames += 1;
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

    let mut left_status = read_preamble(stream)?;
    let mut right_status = read_preamble(stream)?;
    buffers[0][0] = left_status.predictor as i16;
    buffers[1][0] = right_status.predictor as i16;

    let mut frames = 1;
    for pair in take_data(stream, 2 * (frames_per_block - 1)).chunks_exact(2) {
        buffers[0][frames] = left_status.expand_nibble(pair[0], Nibble::Upper);
        buffers[1][frames] = right_status.expand_nibble(pair[1], Nibble::Upper);
        frames += 1;
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono_block(predictor: i16, data: &[u8]) -> Vec<u8> {
        let mut block = predictor.to_le_bytes().to_vec();
        block.extend_from_slice(&[0, 0]);
        block.extend_from_slice(data);
        block
    }

    #[test]
    fn verify_mono_high_nibble_only() {
        let block = mono_block(500, &[0x70, 0x00]);

        let mut buffer = [0i16; 3];
        let frames = decode_mono(&mut BufReader::new(&block), &mut buffer, 3).unwrap();

        assert_eq!(frames, 3);
        assert_eq!(buffer, [500, 513, 515]);
    }

    #[test]
    fn verify_low_nibble_ignored() {
        let mut clean = [0i16; 3];
        let mut noisy = [0i16; 3];

        decode_mono(&mut BufReader::new(&mono_block(500, &[0x70, 0x00])), &mut clean, 3).unwrap();
        decode_mono(&mut BufReader::new(&mono_block(500, &[0x7f, 0x09])), &mut noisy, 3).unwrap();

        assert_eq!(clean, noisy);

        // Zero high nibbles from a zero preamble stay silent whatever the low nibbles hold.
        let mut buffer = [0i16; 3];
        decode_mono(&mut BufReader::new(&mono_block(0, &[0x07, 0x07])), &mut buffer, 3).unwrap();

        assert_eq!(buffer, [0, 0, 0]);
    }

    #[test]
    fn verify_stereo_alternating_bytes() {
        let mut block = 100i16.to_le_bytes().to_vec();
        block.extend_from_slice(&[0, 0]);
        block.extend_from_slice(&(-100i16).to_le_bytes());
        block.extend_from_slice(&[0, 0]);
        block.extend_from_slice(&[0x7f, 0xf3]);

        let mut left = [0i16; 2];
        let mut right = [0i16; 2];

        let frames =
            decode_stereo(&mut BufReader::new(&block), [&mut left, &mut right], 2).unwrap();

        assert_eq!(frames, 2);
        assert_eq!(left, [100, 113]);
        assert_eq!(right, [-100, -113]);
    }

    #[test]
    fn verify_truncated_block() {
        let block = 7i16.to_le_bytes();

        let mut buffer = [0i16; 9];
        assert_eq!(decode_mono(&mut BufReader::new(&block), &mut buffer, 9).unwrap(), 0);

        // A dangling left byte without its right partner yields no frame.
        let mut block = [0u8; 9];
        block[8] = 0x70;

        let mut left = [0i16; 3];
        let mut right = [0i16; 3];
        let frames =
            decode_stereo(&mut BufReader::new(&block), [&mut left, &mut right], 3).unwrap();
        assert_eq!(frames, 1);
    }
}
