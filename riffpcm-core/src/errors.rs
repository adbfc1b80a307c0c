// RiffPcm
// Copyright (c) 2024-2025 The Project RiffPcm Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type.

use std::error;
use std::fmt;
use std::io;
use std::result;

/// `ContainerErrorKind` is a list of reasons why a RIFF container could not be walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerErrorKind {
    /// The stream does not start with the `RIFF` marker.
    NotRiff,
    /// The RIFF form is not `WAVE`.
    NotWave,
    /// The `fmt ` chunk is shorter than the 16 byte minimum.
    InvalidFormatChunk,
    /// The stream ended inside a header.
    Truncated,
    /// A chunk is otherwise structurally invalid.
    Malformed(&'static str),
}

impl ContainerErrorKind {
    fn as_str(&self) -> &'static str {
        match *self {
            ContainerErrorKind::NotRiff => "missing riff stream marker",
            ContainerErrorKind::NotWave => "riff form is not wave",
            ContainerErrorKind::InvalidFormatChunk => "fmt chunk is shorter than 16 bytes",
            ContainerErrorKind::Truncated => "stream ended inside a header",
            ContainerErrorKind::Malformed(msg) => msg,
        }
    }
}

/// `ChunkKind` names the chunks that must be present for decoding to proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// The `fmt ` chunk.
    Format,
    /// The `data` chunk.
    Data,
}

/// `ParameterErrorKind` is a list of reasons why a format description cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterErrorKind {
    /// The channel count is zero or exceeds what the codec supports.
    InvalidChannelCount(u16),
    /// The block alignment is too small to hold a single sample per block.
    ZeroSamplesPerBlock,
}

/// `SeekErrorKind` is a list of generic reasons why a seek may fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekErrorKind {
    /// The stream is not seekable at all.
    Unseekable,
    /// The stream can only be seeked forward.
    ForwardOnly,
}

impl SeekErrorKind {
    fn as_str(&self) -> &'static str {
        match *self {
            SeekErrorKind::Unseekable => "stream is not seekable",
            SeekErrorKind::ForwardOnly => "stream can only be seeked forward",
        }
    }
}

/// `Error` provides an enumeration of all possible errors reported by RiffPcm.
///
/// Every variant other than `IoError` and `SeekError` is raised while opening a stream, before
/// any sample is produced.
#[derive(Debug)]
pub enum Error {
    /// An IO error occured while reading, writing, or seeking the stream.
    IoError(io::Error),
    /// The RIFF container is malformed.
    ContainerError(ContainerErrorKind),
    /// A chunk required for decoding is missing.
    MissingChunk(ChunkKind),
    /// The encoding tag is not one this library decodes.
    UnsupportedEncoding(u16),
    /// The format parameters are invalid for the selected codec.
    InvalidParameters(ParameterErrorKind),
    /// The stream could not be seeked.
    SeekError(SeekErrorKind),
    /// An unsupported codec or feature was requested of a decoder.
    Unsupported(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::IoError(ref err) => err.fmt(f),
            Error::ContainerError(ref kind) => {
                write!(f, "malformed container: {}", kind.as_str())
            }
            Error::MissingChunk(ChunkKind::Format) => write!(f, "missing fmt chunk"),
            Error::MissingChunk(ChunkKind::Data) => write!(f, "missing data chunk"),
            Error::UnsupportedEncoding(tag) => {
                write!(f, "unsupported encoding: {:#06x}", tag)
            }
            Error::InvalidParameters(ParameterErrorKind::InvalidChannelCount(n)) => {
                write!(f, "invalid format parameters: unsupported channel count {}", n)
            }
            Error::InvalidParameters(ParameterErrorKind::ZeroSamplesPerBlock) => {
                write!(f, "invalid format parameters: block align yields no samples per block")
            }
            Error::SeekError(ref kind) => {
                write!(f, "seek error: {}", kind.as_str())
            }
            Error::Unsupported(feature) => {
                write!(f, "unsupported feature: {}", feature)
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::IoError(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IoError(err)
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Convenience function to create a container error.
pub fn container_error<T>(kind: ContainerErrorKind) -> Result<T> {
    Err(Error::ContainerError(kind))
}

/// Convenience function to create a missing chunk error.
pub fn missing_chunk_error<T>(kind: ChunkKind) -> Result<T> {
    Err(Error::MissingChunk(kind))
}

/// Convenience function to create an unsupported encoding error.
pub fn unsupported_encoding_error<T>(tag: u16) -> Result<T> {
    Err(Error::UnsupportedEncoding(tag))
}

/// Convenience function to create an invalid parameters error.
pub fn invalid_parameters_error<T>(kind: ParameterErrorKind) -> Result<T> {
    Err(Error::InvalidParameters(kind))
}

/// Convenience function to create a seek error.
pub fn seek_error<T>(kind: SeekErrorKind) -> Result<T> {
    Err(Error::SeekError(kind))
}

/// Convenience function to create an unsupported feature error.
pub fn unsupported_error<T>(feature: &'static str) -> Result<T> {
    Err(Error::Unsupported(feature))
}

/// Convenience function to create an end-of-stream error.
pub fn end_of_stream_error<T>() -> Result<T> {
    Err(Error::IoError(io::Error::new(io::ErrorKind::UnexpectedEof, "end of stream")))
}

/// Returns true if the error is an unexpected end of the underlying byte source.
pub fn is_end_of_stream(err: &Error) -> bool {
    matches!(err, Error::IoError(err) if err.kind() == io::ErrorKind::UnexpectedEof)
}
