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

//! RIFF/WAVE container walking.
//!
//! [`read_container`] walks the chunks of a WAVE stream, parses the `fmt `, `fact` and
//! `LIST/INFO` chunks, and records where the `data` payload lives without reading it.

use std::io;

use riffpcm_core::errors::{
    container_error, missing_chunk_error, ChunkKind, ContainerErrorKind, Error, Result,
};
use riffpcm_core::io::{BufReader, ReadBytes};
use riffpcm_core::meta::Metadata;

use log::{debug, error, warn};

mod chunks;
mod common;

pub use chunks::{FactChunk, FormatDescriptor, WAVE_FORMAT_EXTENSIBLE};
pub use common::Chunk;

use chunks::{read_info_chunk, RiffWaveChunks};
use common::ChunksReader;

/// WAVE is actually a RIFF stream, with a "RIFF" ASCII stream marker.
const RIFF_STREAM_MARKER: [u8; 4] = *b"RIFF";
/// A possible RIFF form is "wave".
const WAVE_RIFF_FORM: [u8; 4] = *b"WAVE";

/// `FormatOptions` is a common set of options that control how the container is walked.
#[derive(Copy, Clone, Debug)]
pub struct FormatOptions {
    /// Continue walking chunks after the `data` chunk, picking up trailing metadata or a late
    /// `fmt ` chunk. Only useful if the source can seek back to the data payload afterwards.
    ///
    /// Default: `true`.
    pub scan_trailing_chunks: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        FormatOptions { scan_trailing_chunks: true }
    }
}

/// `ContainerChunks` is everything learned from walking a WAVE container.
#[derive(Clone, Debug)]
pub struct ContainerChunks {
    /// The parsed `fmt ` chunk.
    pub format: FormatDescriptor,
    /// The `data` chunk. Its payload is never read by the walker.
    pub data: Chunk,
    /// The `fact` chunk, if present.
    pub fact: Option<FactChunk>,
    /// Tags read from `LIST/INFO` chunks.
    pub metadata: Metadata,
    /// Every chunk header seen, in stream order.
    pub chunks: Vec<Chunk>,
    /// The length of the RIFF form, or `None` if the writer did not know it.
    pub riff_len: Option<u32>,
}

/// Maps an unexpected end of stream while reading a header to a truncation error.
fn truncated(err: Error) -> Error {
    match err {
        Error::IoError(ref io_err) if io_err.kind() == io::ErrorKind::UnexpectedEof => {
            Error::ContainerError(ContainerErrorKind::Truncated)
        }
        err => err,
    }
}

/// Walks a complete WAVE file held in memory.
pub fn parse(bytes: &[u8]) -> Result<ContainerChunks> {
    let mut reader = BufReader::new(bytes);
    read_container(&mut reader, &FormatOptions::default())
}

/// Walks the WAVE container at the current position of `reader`.
///
/// If `opts.scan_trailing_chunks` is false the walk stops at the first `data` chunk, leaving
/// `reader` positioned at the start of its payload. Otherwise the walk continues to the end of
/// the container and the caller is responsible for returning to `data.start_offset`.
pub fn read_container<B: ReadBytes>(reader: &mut B, opts: &FormatOptions) -> Result<ContainerChunks> {
    // A Wave file is one large RIFF chunk, with the actual meta and audio data contained in
    // nested chunks. Therefore, the file starts with a RIFF chunk header (chunk ID & size).
    let marker = reader.read_quad_bytes().map_err(|err| truncated(err.into()))?;

    if marker != RIFF_STREAM_MARKER {
        return container_error(ContainerErrorKind::NotRiff);
    }

    // The length of the top-level RIFF chunk. Must be atleast 4 bytes.
    let riff_len = reader.read_u32().map_err(|err| truncated(err.into()))?;

    if riff_len < 4 {
        return container_error(ContainerErrorKind::Malformed("riff: invalid riff length"));
    }

    // The form type. Only the WAVE form is supported.
    let riff_form = reader.read_quad_bytes().map_err(|err| truncated(err.into()))?;

    if riff_form != WAVE_RIFF_FORM {
        error!("riff form is not wave ({})", String::from_utf8_lossy(&riff_form));

        return container_error(ContainerErrorKind::NotWave);
    }

    // Streaming writers set the riff length to (2^32)-1 since the size is not known ahead of
    // time.
    let riff_data_len = if riff_len < u32::MAX { Some(riff_len - 4) } else { None };

    let mut riff_chunks = ChunksReader::<RiffWaveChunks>::new(riff_data_len);

    let mut format = None;
    let mut data = None;
    let mut fact = None;
    let mut metadata = Metadata::default();

    while let Some(chunk) = riff_chunks.next(reader).map_err(truncated)? {
        match chunk {
            RiffWaveChunks::Format(fmt) => {
                if format.is_some() {
                    warn!("wav: ignoring duplicate fmt chunk");
                    continue;
                }

                let parsed = fmt.parse(reader).map_err(truncated)?;
                debug!("{}", parsed);

                format = Some(parsed);
            }
            RiffWaveChunks::Fact(fct) => {
                let parsed = fct.parse(reader).map_err(truncated)?;
                debug!("{}", parsed);

                fact = Some(parsed);
            }
            RiffWaveChunks::List(lst) => {
                let list = lst.parse(reader).map_err(truncated)?;
                debug!("{}", list);

                // Riff Lists can have many different forms, but only Info lists carry metadata.
                match &list.form {
                    b"INFO" => read_info_chunk(reader, list.len, &mut metadata)?,
                    _ => list.skip(reader)?,
                }
            }
            RiffWaveChunks::Data(dat) => {
                if data.is_some() {
                    warn!("wav: ignoring additional data chunk");
                    continue;
                }

                let parsed = dat.parse(reader)?;
                debug!(
                    "wav: data chunk at {} with {} bytes",
                    parsed.chunk.start_offset, parsed.chunk.data_size
                );

                data = Some(parsed.chunk);

                if !opts.scan_trailing_chunks {
                    break;
                }
            }
        }
    }

    let Some(data) = data
    else {
        return missing_chunk_error(ChunkKind::Data);
    };

    let Some(format) = format
    else {
        return missing_chunk_error(ChunkKind::Format);
    };

    Ok(ContainerChunks {
        format,
        data,
        fact,
        metadata,
        chunks: riff_chunks.into_chunks(),
        riff_len: if riff_len < u32::MAX { Some(riff_len) } else { None },
    })
}
