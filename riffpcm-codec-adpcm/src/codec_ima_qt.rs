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

// IMA4 always uses 34 byte packets per channel
// https://wiki.multimedia.cx/index.php/Apple_QuickTime_IMA_ADPCM

/// The length of one channel's packet.
pub(crate) const PACKET_LEN: usize = 34;
/// The number of samples in one channel's packet.
pub(crate) const FRAMES_PER_PACKET: usize = 64;

fn read_preamble<B: ReadBytes>(stream: &mut B) -> Result<AdpcmImaBlockStatus> {
    let header = stream.read_be_u16()?;
    let predictor = i32::from((header & 0xFF80) as i16);
    let step_index = i32::from(header & 0x7F);
    Ok(AdpcmImaBlockStatus::new(predictor, step_index))
}

pub(crate) fn decode_mono(stream: &mut BufReader<'_>, buffer: &mut [i16]) -> Result<usize> {
    if !has_preamble(stream, 2) {
        return Ok(0);
    }

    let mut status = read_preamble(stream)?;

    let mut frames = 0;
    for &nibbles in take_data(stream, PACKET_LEN - 2) {
        buffer[frames] = status.expand_nibble(nibbles, Nibble::Lower);
        buffer[frames + 1] = status.expand_nibble(nibbles, Nibble::Upper);
        frames += 2;
    }
    Ok(frames)
}

/// Stereo blocks hold the left packet followed by the right packet.
pub(crate) fn decode_stereo(stream: &mut BufReader<'_>, buffers: [&mut [i16]; 2]) -> Result<usize> {
    let [left, right] = buffers;
    let left_frames = decode_mono(stream, left)?;
    let right_frames = decode_mono(stream, right)?;
    Ok(left_frames.min(right_frames))
}
