//! Single-image transform: scoped streams around the metadata codec.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use imageclean_io_jpeg::{CodecError, JpegMetadataStripper};

use crate::spec::{EnumTransformStage, TransformError};

/// Byte-stream metadata codec.
///
/// Implementations read one whole image from `reader` and write the cleaned
/// image to `writer`. They are shared across worker threads.
pub trait MetadataStripper: Send + Sync {
    fn strip(&self, reader: &mut dyn Read, writer: &mut dyn Write) -> Result<(), CodecError>;
}

impl MetadataStripper for JpegMetadataStripper {
    fn strip(&self, reader: &mut dyn Read, writer: &mut dyn Write) -> Result<(), CodecError> {
        let report_strip = JpegMetadataStripper::strip(self, reader, writer)?;
        tracing::trace!(
            segments = report_strip.cnt_segments_dropped,
            bytes = report_strip.n_bytes_dropped,
            "dropped metadata segments"
        );
        Ok(())
    }
}

/// Write a metadata-free copy of `path_src` to `path_dst`.
///
/// Missing parent directories of `path_dst` are created. Both files are closed
/// on every return path. An existing destination is overwritten; when the codec
/// fails, the partially written destination is removed.
pub fn transform_image<S>(path_src: &Path, path_dst: &Path, stripper: &S) -> Result<(), TransformError>
where
    S: MetadataStripper + ?Sized,
{
    let file_src =
        File::open(path_src).map_err(|e| TransformError::io(path_src, EnumTransformStage::Open, e))?;

    if let Some(path_parent_dst) = path_dst.parent() {
        fs::create_dir_all(path_parent_dst)
            .map_err(|e| TransformError::io(path_dst, EnumTransformStage::Create, e))?;
    }
    let file_dst =
        File::create(path_dst).map_err(|e| TransformError::io(path_dst, EnumTransformStage::Create, e))?;

    let mut reader = BufReader::new(file_src);
    let mut writer = BufWriter::new(file_dst);

    if let Err(source) = stripper.strip(&mut reader, &mut writer) {
        drop(writer);
        if let Err(e) = fs::remove_file(path_dst) {
            tracing::debug!(path = %path_dst.display(), "failed to remove partial output: {e}");
        }
        return Err(TransformError {
            path: path_src.to_path_buf(),
            stage: EnumTransformStage::Strip,
            source,
        });
    }

    writer
        .flush()
        .map_err(|e| TransformError::io(path_dst, EnumTransformStage::Finalize, e))?;
    Ok(())
}
