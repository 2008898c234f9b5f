//! `imageclean_io_jpeg` v1:
//! Streaming JPEG metadata stripper used by the image-clean pipeline.
//!
//! - `spec`  : strip scope, stripper handle and codec errors
//! - `strip` : marker-segment filter

pub mod spec;
pub mod strip;

pub use spec::{CodecError, EnumStripScope, JpegMetadataStripper, ReportStrip};
pub use strip::strip_metadata;
