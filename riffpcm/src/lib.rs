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

//! # Project RiffPcm
//!
//! RiffPcm reads WAVE files holding legacy ADPCM audio and exposes them as a seekable stream of
//! interleaved, little-endian, signed 16-bit PCM.
//!
//! # Support
//!
//! | Encoding                  | Tag      | Channels |
//! |---------------------------|----------|----------|
//! | Microsoft ADPCM           | `0x0002` | 1-2      |
//! | IMA ADPCM (WAV)           | `0x0011` | 1-2      |
//! | Duck DK4 IMA ADPCM        | `0x0061` | 1-2      |
//! | Duck DK3 IMA ADPCM        | `0x0062` | 2        |
//! | IMA ADPCM (QuickTime)     | `0x00a4` | 1-2      |
//! | Electronic Arts ADPCM     | `0x4541` | 1-2      |
//!
//! `WAVE_FORMAT_EXTENSIBLE` files carrying one of the above as their sub-format are supported.
//!
//! # Usage
//!
//! 1. Open a [`MediaSource`](core::io::MediaSource) with [`open`], or use [`open_file`] or
//!    [`open_bytes`]. The container is walked and a decoder is selected immediately.
//! 2. Inspect [`DecodeSource::output_params`] to learn the sample rate and channels.
//! 3. Read PCM with [`DecodeSource::read`] (or through [`std::io::Read`]) and seek with
//!    [`DecodeSource::set_position`] (or through [`std::io::Seek`]).
//!
//! Positions and lengths are in bytes of decoded PCM.

use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use riffpcm_core::errors::Result;
use riffpcm_core::io::{MediaSource, SourceStream, SourceStreamOptions};
use riffpcm_format_riff::{read_container, FormatOptions};

use log::debug;

mod source;

pub use riffpcm_codec_adpcm as adpcm;
pub use riffpcm_core as core;
pub use riffpcm_format_riff as riff;

pub use source::DecodeSource;

/// `OpenOptions` controls how a source is opened.
#[derive(Copy, Clone, Debug, Default)]
pub struct OpenOptions {
    /// Options for walking the container. Trailing chunks are only scanned if the source is
    /// seekable.
    pub format: FormatOptions,
    /// Options for the buffered source stream.
    pub stream: SourceStreamOptions,
}

/// Opens a WAVE stream, walking its container and selecting a decoder.
///
/// The walk reads only chunk headers and metadata. The audio payload is not touched until the
/// first read or seek.
pub fn open(source: Box<dyn MediaSource>, opts: &OpenOptions) -> Result<DecodeSource> {
    let mut reader = SourceStream::new(source, opts.stream);

    let format_opts = FormatOptions {
        scan_trailing_chunks: opts.format.scan_trailing_chunks && reader.is_seekable(),
    };

    debug!("walking container (scan_trailing_chunks={})", format_opts.scan_trailing_chunks);

    let container = read_container(&mut reader, &format_opts)?;

    DecodeSource::try_new(reader, container)
}

/// Opens the WAVE file at `path` with default options.
pub fn open_file<P: AsRef<Path>>(path: P) -> Result<DecodeSource> {
    let file = File::open(path)?;
    open(Box::new(file), &Default::default())
}

/// Opens a WAVE file held in memory with default options.
pub fn open_bytes(bytes: Vec<u8>) -> Result<DecodeSource> {
    open(Box::new(Cursor::new(bytes)), &Default::default())
}
