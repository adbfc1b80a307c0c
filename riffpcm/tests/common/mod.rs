// RiffPcm
// Copyright (c) 2024-2025 The Project RiffPcm Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![allow(dead_code)]

use riffpcm::DecodeSource;

pub const WAVE_FORMAT_PCM: u16 = 0x0001;
pub const WAVE_FORMAT_ADPCM_MS: u16 = 0x0002;
pub const WAVE_FORMAT_ADPCM_IMA: u16 = 0x0011;
pub const WAVE_FORMAT_ADPCM_DK4: u16 = 0x0061;
pub const WAVE_FORMAT_ADPCM_DK3: u16 = 0x0062;
pub const WAVE_FORMAT_ADPCM_IMA_QT: u16 = 0x00a4;
pub const WAVE_FORMAT_ADPCM_EA: u16 = 0x4541;
pub const WAVE_FORMAT_EXTENSIBLE: u16 = 0xfffe;

/// Generate a vector of pseudo-random bytes of the specified length.
pub fn generate_random_bytes(len: usize, seed: u32) -> Vec<u8> {
    let mut lcg: u32 = 0xec57c4bf ^ seed;

    let mut bytes = vec![0; len];

    for quad in bytes.chunks_mut(4) {
        lcg = lcg.wrapping_mul(1664525).wrapping_add(1013904223);
        for (src, dest) in quad.iter_mut().zip(&lcg.to_le_bytes()) {
            *src = *dest;
        }
    }

    bytes
}

/// Serializes a chunk, appending a pad byte if the payload length is odd.
pub fn chunk(id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(payload.len() + 9);
    bytes.extend_from_slice(id);
    bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    bytes.extend_from_slice(payload);

    if payload.len() % 2 != 0 {
        bytes.push(0);
    }

    bytes
}

/// Serializes a 20 byte `fmt ` chunk with a 2 byte extension holding samples-per-block.
pub fn fmt_chunk(tag: u16, channels: u16, sample_rate: u32, block_align: u16) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&tag.to_le_bytes());
    payload.extend_from_slice(&channels.to_le_bytes());
    payload.extend_from_slice(&sample_rate.to_le_bytes());
    payload.extend_from_slice(&(sample_rate / 2 * u32::from(channels)).to_le_bytes());
    payload.extend_from_slice(&block_align.to_le_bytes());
    payload.extend_from_slice(&4u16.to_le_bytes());
    payload.extend_from_slice(&2u16.to_le_bytes());
    payload.extend_from_slice(&0u16.to_le_bytes());
    chunk(b"fmt ", &payload)
}

/// Serializes a 40 byte `WAVE_FORMAT_EXTENSIBLE` `fmt ` chunk.
pub fn fmt_extensible_chunk(
    sub_format: u16,
    channels: u16,
    sample_rate: u32,
    block_align: u16,
    speaker_mask: u32,
) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&WAVE_FORMAT_EXTENSIBLE.to_le_bytes());
    payload.extend_from_slice(&channels.to_le_bytes());
    payload.extend_from_slice(&sample_rate.to_le_bytes());
    payload.extend_from_slice(&(sample_rate / 2 * u32::from(channels)).to_le_bytes());
    payload.extend_from_slice(&block_align.to_le_bytes());
    payload.extend_from_slice(&4u16.to_le_bytes());
    payload.extend_from_slice(&22u16.to_le_bytes());
    payload.extend_from_slice(&4u16.to_le_bytes());
    payload.extend_from_slice(&speaker_mask.to_le_bytes());
    payload.extend_from_slice(&sub_format.to_le_bytes());
    payload.extend_from_slice(&[
        0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71,
    ]);
    chunk(b"fmt ", &payload)
}

pub fn fact_chunk(n_frames: u32) -> Vec<u8> {
    chunk(b"fact", &n_frames.to_le_bytes())
}

/// Serializes a `LIST/INFO` chunk holding the given NUL-terminated text entries.
pub fn info_list_chunk(entries: &[(&[u8; 4], &str)]) -> Vec<u8> {
    let mut payload = b"INFO".to_vec();

    for (id, value) in entries {
        let mut text = value.as_bytes().to_vec();
        text.push(0);
        payload.extend_from_slice(&chunk(id, &text));
    }

    chunk(b"LIST", &payload)
}

/// Wraps the chunks in a `RIFF/WAVE` form.
pub fn riff_wave(chunks: &[Vec<u8>]) -> Vec<u8> {
    let body: Vec<u8> = chunks.concat();

    let mut bytes = b"RIFF".to_vec();
    bytes.extend_from_slice(&(body.len() as u32 + 4).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(&body);
    bytes
}

/// Builds a minimal WAVE file: `fmt ` followed by `data`.
pub fn simple_wave(
    tag: u16,
    channels: u16,
    sample_rate: u32,
    block_align: u16,
    data: &[u8],
) -> Vec<u8> {
    riff_wave(&[fmt_chunk(tag, channels, sample_rate, block_align), chunk(b"data", data)])
}

/// Reads the source to its end using reads of at most `buf_len` bytes.
pub fn read_to_end(source: &mut DecodeSource, buf_len: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = vec![0; buf_len];

    loop {
        let len = source.read(&mut buf).unwrap();

        if len == 0 {
            break;
        }

        out.extend_from_slice(&buf[..len]);
    }

    out
}
