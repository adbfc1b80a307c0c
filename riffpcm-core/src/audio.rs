// RiffPcm
// Copyright (c) 2024-2025 The Project RiffPcm Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `audio` module provides primitives for working with decoded audio.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// A bitmask representing positional audio channels.
    ///
    /// The positions are identical to those specified by the channel mask in Microsoft's
    /// `WAVEFORMATEXTENSIBLE` structure.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct Channels: u32 {
        /// Front-left (left) channel.
        const FRONT_LEFT          = 1 << 0;
        /// Front-right (right) channel.
        const FRONT_RIGHT         = 1 << 1;
        /// Front-center (center) or the Mono channel.
        const FRONT_CENTER        = 1 << 2;
        /// Low-frequency effects (LFE) channel.
        const LFE1                = 1 << 3;
        /// Rear-left channel.
        const REAR_LEFT           = 1 << 4;
        /// Rear-right channel.
        const REAR_RIGHT          = 1 << 5;
        /// Front left-of-center channel.
        const FRONT_LEFT_CENTER   = 1 << 6;
        /// Front right-of-center channel.
        const FRONT_RIGHT_CENTER  = 1 << 7;
        /// Rear-center channel.
        const REAR_CENTER         = 1 << 8;
        /// Side-left channel.
        const SIDE_LEFT           = 1 << 9;
        /// Side-right channel.
        const SIDE_RIGHT          = 1 << 10;
        /// Top-center channel.
        const TOP_CENTER          = 1 << 11;
        /// Top-front left channel.
        const TOP_FRONT_LEFT      = 1 << 12;
        /// Top-front center channel.
        const TOP_FRONT_CENTER    = 1 << 13;
        /// Top-front right channel.
        const TOP_FRONT_RIGHT     = 1 << 14;
        /// Top-rear left channel.
        const TOP_REAR_LEFT       = 1 << 15;
        /// Top-rear center channel.
        const TOP_REAR_CENTER     = 1 << 16;
        /// Top-rear right channel.
        const TOP_REAR_RIGHT      = 1 << 17;
    }
}

impl Channels {
    /// The 7.1 surround layout used for 8 channel streams that do not declare a mask.
    pub const SURROUND_7_1: Channels = Channels::FRONT_LEFT
        .union(Channels::FRONT_RIGHT)
        .union(Channels::FRONT_CENTER)
        .union(Channels::LFE1)
        .union(Channels::REAR_LEFT)
        .union(Channels::REAR_RIGHT)
        .union(Channels::SIDE_LEFT)
        .union(Channels::SIDE_RIGHT);

    /// Gets the number of channels.
    pub fn count(self) -> usize {
        self.bits().count_ones() as usize
    }

    /// Derives the default speaker mask for a stream with `count` channels.
    ///
    /// Eight channels map to 7.1 surround. Any other count takes the first `count` positions in
    /// mask order. Counts beyond the number of defined positions are truncated to all positions.
    pub fn default_for_count(count: u16) -> Channels {
        if count == 8 {
            return Channels::SURROUND_7_1;
        }

        let n = u32::from(count).min(Channels::all().bits().count_ones());

        match n {
            0 => Channels::empty(),
            n => Channels::from_bits_truncate(u32::MAX >> (32 - n)),
        }
    }
}

impl fmt::Display for Channels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#020b}", self.bits())
    }
}

/// `SignalSpec` describes the characteristics of a decoded audio signal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SignalSpec {
    /// The signal sampling rate in hertz (Hz).
    pub rate: u32,
    /// The number of interleaved channels.
    pub channels: usize,
}

impl SignalSpec {
    pub fn new(rate: u32, channels: usize) -> Self {
        SignalSpec { rate, channels }
    }
}

/// `AudioBuffer` is a container for planar 16-bit audio. Each channel occupies a contiguous
/// plane of `capacity` samples, and `frames` of those samples are valid.
pub struct AudioBuffer {
    buf: Vec<i16>,
    spec: SignalSpec,
    n_frames: usize,
    n_capacity: usize,
}

impl AudioBuffer {
    /// Instantiate a new `AudioBuffer` using the specified signal specification and of the given
    /// duration in frames.
    pub fn new(duration: usize, spec: SignalSpec) -> Self {
        AudioBuffer {
            buf: vec![0; duration * spec.channels],
            spec,
            n_frames: 0,
            n_capacity: duration,
        }
    }

    /// Gets the signal specification for the buffer.
    pub fn spec(&self) -> &SignalSpec {
        &self.spec
    }

    /// Gets the total capacity of the buffer in frames.
    pub fn capacity(&self) -> usize {
        self.n_capacity
    }

    /// Gets the number of valid frames in the buffer.
    pub fn frames(&self) -> usize {
        self.n_frames
    }

    /// Clears all written frames from the buffer.
    pub fn clear(&mut self) {
        self.n_frames = 0;
    }

    /// Marks `n_frames` of the buffer as valid. The count is limited to the buffer capacity.
    pub fn render_reserved(&mut self, n_frames: usize) {
        self.n_frames = n_frames.min(self.n_capacity);
    }

    /// Gets an immutable reference to the valid samples of a channel.
    pub fn chan(&self, channel: usize) -> &[i16] {
        let start = channel * self.n_capacity;
        &self.buf[start..start + self.n_frames]
    }

    /// Gets a mutable reference to the full plane of a channel, regardless of how many frames
    /// are valid.
    pub fn chan_mut(&mut self, channel: usize) -> &mut [i16] {
        let start = channel * self.n_capacity;
        &mut self.buf[start..start + self.n_capacity]
    }

    /// Gets mutable references to the full planes of two distinct channels.
    pub fn chan_pair_mut(&mut self, first: usize, second: usize) -> (&mut [i16], &mut [i16]) {
        assert!(first != second);

        let cap = self.n_capacity;

        if first < second {
            let (a, b) = self.buf.split_at_mut(second * cap);
            (&mut a[first * cap..(first + 1) * cap], &mut b[..cap])
        }
        else {
            let (a, b) = self.buf.split_at_mut(first * cap);
            (&mut b[..cap], &mut a[second * cap..(second + 1) * cap])
        }
    }

    /// Writes the valid frames as interleaved little-endian 16-bit samples into `dest`. Returns
    /// the number of bytes written. `dest` must hold atleast `frames * channels * 2` bytes.
    pub fn copy_interleaved_le(&self, dest: &mut [u8]) -> usize {
        let n_channels = self.spec.channels;
        let len = self.n_frames * n_channels * 2;

        assert!(dest.len() >= len);

        for ch in 0..n_channels {
            let plane = self.chan(ch);

            for (frame, sample) in plane.iter().enumerate() {
                let offset = 2 * (frame * n_channels + ch);
                dest[offset..offset + 2].copy_from_slice(&sample.to_le_bytes());
            }
        }

        len
    }
}
