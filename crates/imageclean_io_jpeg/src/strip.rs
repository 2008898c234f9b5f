//! JPEG marker-segment filter.
//!
//! A JPEG stream is a sequence of `FF xx` markers. Everything before the first
//! start-of-scan (`SOS`) is a list of length-prefixed segments; metadata lives
//! in the application (`APPn`) and comment (`COM`) segments. The filter walks
//! those segments, drops the ones selected by [`EnumStripScope`], and copies the
//! scan header, entropy-coded data and any trailer verbatim.

use std::io::{self, Read, Write};

use crate::spec::{CodecError, EnumStripScope, ReportStrip};

mod markers {
    pub const PREFIX: u8 = 0xFF;

    pub const TEM: u8 = 0x01;
    pub const RST0: u8 = 0xD0;
    pub const RST7: u8 = 0xD7;
    pub const SOI: u8 = 0xD8;
    pub const EOI: u8 = 0xD9;
    pub const SOS: u8 = 0xDA;

    pub const APP1: u8 = 0xE1; // EXIF, XMP.
    pub const APP13: u8 = 0xED; // IPTC/Photoshop.
    pub const APP15: u8 = 0xEF;
    pub const COM: u8 = 0xFE;
}

const C_EXIF_HEADER: &[u8] = b"Exif\0";

/// Byte source that tracks its offset for error messages.
struct JpegReader<R> {
    inner: R,
    n_offset: u64,
}

impl<R: Read> JpegReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, n_offset: 0 }
    }

    /// `None` on end of stream.
    fn read_u8(&mut self) -> Result<Option<u8>, CodecError> {
        let mut buf = [0_u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.n_offset += 1;
                    return Ok(Some(buf[0]));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(CodecError::Io(e)),
            }
        }
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), CodecError> {
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.n_offset += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(CodecError::Truncated {
                offset: self.n_offset,
            }),
            Err(e) => Err(CodecError::Io(e)),
        }
    }
}

pub(crate) fn is_metadata_segment(marker: u8, payload: &[u8], scope: EnumStripScope) -> bool {
    match scope {
        EnumStripScope::Exif => marker == markers::APP1 && payload.starts_with(C_EXIF_HEADER),
        EnumStripScope::All => matches!(
            marker,
            markers::APP1..=markers::APP13 | markers::APP15 | markers::COM
        ),
    }
}

fn is_standalone_marker(marker: u8) -> bool {
    marker == markers::TEM || (markers::RST0..=markers::RST7).contains(&marker)
}

/// Copy a JPEG stream from `reader` to `writer` without its metadata segments.
///
/// The stream is processed in one pass; only a single segment payload (at most
/// 64 KiB) is buffered at a time. Output is a pure function of the input bytes
/// and `scope`.
///
/// # Errors
/// Returns [`CodecError`] when the input is not a JPEG stream, is truncated
/// before its first scan, or when reading/writing fails. Bytes already written
/// to `writer` are not rolled back.
pub fn strip_metadata<R, W>(
    reader: R,
    mut writer: W,
    scope: EnumStripScope,
) -> Result<ReportStrip, CodecError>
where
    R: Read,
    W: Write,
{
    let mut jpeg_reader = JpegReader::new(reader);
    let mut report_strip = ReportStrip::default();

    let mut raw_soi = [0_u8; 2];
    match jpeg_reader.read_exact(&mut raw_soi) {
        Ok(()) => {}
        Err(CodecError::Truncated { .. }) => return Err(CodecError::MissingSoi),
        Err(e) => return Err(e),
    }
    if raw_soi != [markers::PREFIX, markers::SOI] {
        return Err(CodecError::MissingSoi);
    }
    writer.write_all(&raw_soi)?;

    loop {
        let n_offset_marker = jpeg_reader.n_offset;
        let Some(byte_lead) = jpeg_reader.read_u8()? else {
            return Err(CodecError::MissingScan);
        };
        if byte_lead != markers::PREFIX {
            return Err(CodecError::InvalidMarker {
                offset: n_offset_marker,
                found: byte_lead,
            });
        }

        // Any number of FF fill bytes may precede the marker code.
        let mut marker = markers::PREFIX;
        while marker == markers::PREFIX {
            marker = jpeg_reader.read_u8()?.ok_or(CodecError::Truncated {
                offset: jpeg_reader.n_offset,
            })?;
        }

        match marker {
            markers::SOS => {
                writer.write_all(&[markers::PREFIX, markers::SOS])?;
                io::copy(&mut jpeg_reader.inner, &mut writer)?;
                writer.flush()?;
                return Ok(report_strip);
            }
            markers::EOI => return Err(CodecError::MissingScan),
            0x00 | markers::SOI => {
                return Err(CodecError::InvalidMarker {
                    offset: n_offset_marker,
                    found: marker,
                });
            }
            m if is_standalone_marker(m) => {
                writer.write_all(&[markers::PREFIX, m])?;
                continue;
            }
            _ => {}
        }

        let mut raw_length = [0_u8; 2];
        jpeg_reader.read_exact(&mut raw_length)?;
        let n_length = u16::from_be_bytes(raw_length);
        if n_length < 2 {
            return Err(CodecError::InvalidSegmentLength {
                offset: n_offset_marker,
                marker,
                length: n_length,
            });
        }

        let mut payload = vec![0_u8; usize::from(n_length) - 2];
        jpeg_reader.read_exact(&mut payload)?;

        if is_metadata_segment(marker, &payload, scope) {
            report_strip.cnt_segments_dropped += 1;
            report_strip.n_bytes_dropped += 2 + u64::from(n_length);
            continue;
        }

        writer.write_all(&[markers::PREFIX, marker])?;
        writer.write_all(&raw_length)?;
        writer.write_all(&payload)?;
    }
}
