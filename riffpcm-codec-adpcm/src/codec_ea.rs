// RiffPcm
// Copyright (c) 2024-2025 The Project RiffPcm Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Electronic Arts ADPCM.
//!
//! Each channel's block starts with one byte selecting a coefficient pair (upper nibble) and a
//! shift (lower nibble). Unlike the IMA family, the two-sample history carries over from one
//! block to the next.

use riffpcm_core::errors::Result;
use riffpcm_core::io::{BufReader, ReadBytes};
use riffpcm_core::util::clamp::clamp_i16;

use crate::common::{has_preamble, take_data, Nibble};

#[rustfmt::skip]
const EA_ADPCM_TABLE: [i32; 20] = [
    0, 240, 460, 392,
    0, 0, -208, -220,
    0, 1, 3, 4,
    7, 8, 10, 11,
    0, -1, -3, -4,
];

/// `AdpcmEaBlockStatus` contains the coefficients and shift of one channel for one block.
#[derive(Copy, Clone, Debug)]
struct AdpcmEaBlockStatus {
    coeff1: i32,
    coeff2: i32,
    shift: u32,
}

impl AdpcmEaBlockStatus {
    fn read_preamble<B: ReadBytes>(stream: &mut B) -> Result<Self> {
        let byte = stream.read_byte()?;
        let index = usize::from(byte >> 4);
        Ok(AdpcmEaBlockStatus {
            coeff1: EA_ADPCM_TABLE[index],
            coeff2: EA_ADPCM_TABLE[index + 4],
            shift: u32::from(byte & 0x0f) + 8,
        })
    }
}

/// The sample history of one channel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct AdpcmEaHistory {
    prev: i32,
    cur: i32,
}

impl AdpcmEaHistory {
    fn expand_nibble(&mut self, status: &AdpcmEaBlockStatus, byte: u8, nibble: Nibble) -> i16 {
        // Place the nibble in the top bits so the arithmetic shift sign-extends it.
        let raw = (i32::from(nibble.get_nibble(byte)) << 28) >> status.shift;
        let sample =
            clamp_i16((raw + self.cur * status.coeff1 + self.prev * status.coeff2 + 0x80) >> 8);
        self.prev = self.cur;
        self.cur = i32::from(sample);
        sample
    }
}

/// `AdpcmEaState` is the decoder state that persists between blocks.
#[derive(Clone, Debug, Default)]
pub(crate) struct AdpcmEaState {
    history: [AdpcmEaHistory; 2],
}

impl AdpcmEaState {
    pub(crate) fn reset(&mut self) {
        self.history = Default::default();
    }

    pub(crate) fn decode_mono(
        &mut self,
        stream: &mut BufReader<'_>,
        buffer: &mut [i16],
        frames_per_block: usize,
    ) -> Result<usize> {
        if !has_preamble(stream, 1) {
            return Ok(0);
        }

        let status = AdpcmEaBlockStatus::read_preamble(stream)?;
        let history = &mut self.history[0];

        let mut frames = 0;
        for &nibbles in take_data(stream, frames_per_block / 2) {
            buffer[frames] = history.expand_nibble(&status, nibbles, Nibble::Upper);
            buffer[frames + 1] = history.expand_nibble(&status, nibbles, Nibble::Lower);
            frames += 2;
        }
        Ok(frames)
    }

    pub(crate) fn decode_stereo(
        &mut self,
        stream: &mut BufReader<'_>,
        buffers: [&mut [i16]; 2],
        frames_per_block: usize,
    ) -> Result<usize> {
        if !has_preamble(stream, 2) {
            return Ok(0);
        }

        let left_status = AdpcmEaBlockStatus::read_preamble(stream)?;
        let right_status = AdpcmEaBlockStatus::read_preamble(stream)?;
        let [left_history, right_history] = &mut self.history;

        let mut frames = 0;
        for &nibbles in take_data(stream, frames_per_block) {
            buffers[0][frames] = left_history.expand_nibble(&left_status, nibbles, Nibble::Upper);
            buffers[1][frames] = right_history.expand_nibble(&right_status, nibbles, Nibble::Lower);
            frames += 1;
        }
        Ok(frames)
    }
}
