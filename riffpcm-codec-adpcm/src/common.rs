// RiffPcm
// Copyright (c) 2024-2025 The Project RiffPcm Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use riffpcm_core::io::{BufReader, FiniteStream};

/// `Nibble` represents the lower or upper 4 bits of a byte
#[derive(Copy, Clone)]
pub(crate) enum Nibble {
    Upper,
    Lower,
}

impl Nibble {
    pub fn get_nibble(&self, byte: u8) -> u8 {
        match self {
            Nibble::Upper => byte >> 4,
            Nibble::Lower => byte & 0x0F,
        }
    }
}

/// Sign-extends a 4-bit value.
pub(crate) fn signed_nibble(nibble: u8) -> i32 {
    if (nibble & 0x08) != 0 {
        i32::from(nibble) - 0x10
    }
    else {
        i32::from(nibble)
    }
}

/// Returns true if atleast `len` bytes of the block remain. A block too short to hold its
/// preamble yields no samples.
pub(crate) fn has_preamble(stream: &BufReader<'_>, len: usize) -> bool {
    stream.bytes_available() >= len as u64
}

/// Takes the next `len` data bytes of the block, or fewer if the block is truncated.
pub(crate) fn take_data<'a>(stream: &mut BufReader<'a>, len: usize) -> &'a [u8] {
    let available = stream.bytes_available().min(len as u64) as usize;
    // The length never exceeds what is available.
    stream.read_buf_bytes_ref(available).unwrap_or_default()
}
