//! Codec options, result model and error types.

use std::io::{self, Read, Write};

use thiserror::Error;

use crate::strip::strip_metadata;

/// Which segments count as metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumStripScope {
    /// Drop EXIF `APP1` segments only.
    #[default]
    Exif,
    /// Drop every application segment except JFIF (`APP0`) and Adobe (`APP14`),
    /// plus comments.
    All,
}

/// Counters for one stripped stream.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReportStrip {
    /// Number of marker segments dropped.
    pub cnt_segments_dropped: u64,
    /// Bytes dropped, marker and length field included.
    pub n_bytes_dropped: u64,
}

/// Stateless JPEG metadata stripper.
#[derive(Debug, Default, Clone, Copy)]
pub struct JpegMetadataStripper {
    pub scope: EnumStripScope,
}

impl JpegMetadataStripper {
    pub fn new(scope: EnumStripScope) -> Self {
        Self { scope }
    }

    /// Stream `reader` into `writer`, dropping metadata segments.
    pub fn strip<R: Read, W: Write>(&self, reader: R, writer: W) -> Result<ReportStrip, CodecError> {
        strip_metadata(reader, writer, self.scope)
    }
}

/// Failure while parsing or rewriting a JPEG stream.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Stream does not start with `FF D8`.
    #[error("Missing JPEG SOI marker")]
    MissingSoi,
    /// A byte other than `FF` where a marker was expected, or a reserved marker.
    #[error("Invalid JPEG marker 0x{found:02X} at offset {offset}")]
    InvalidMarker { offset: u64, found: u8 },
    /// Segment length field below its own size.
    #[error("Invalid length {length} for JPEG segment 0x{marker:02X} at offset {offset}")]
    InvalidSegmentLength { offset: u64, marker: u8, length: u16 },
    /// Stream ended inside a marker or segment.
    #[error("Truncated JPEG stream at offset {offset}")]
    Truncated { offset: u64 },
    /// Stream ended (or hit EOI) before any scan data.
    #[error("JPEG stream has no scan data")]
    MissingScan,
    /// Underlying read/write failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}
