//! `imageclean_io_fs` v1:
//! Copy images from scan roots into a build output tree with metadata removed.
//!
//! - `clean`     : traversal and clean orchestration
//! - `spec`      : enums/options/project context/errors
//! - `report`    : run-time report model
//! - `transform` : single-image transform over the metadata codec
//! - `util`      : shared helper functions

pub mod clean;
pub mod report;
pub mod spec;
pub mod transform;
mod util;

pub use clean::{clean_images, clean_tree, run_image_clean};
pub use report::{ReportClean, ReportCleanBuilder};
pub use spec::{
    EnumCleanSymlinkStrategy, EnumFailurePolicy, EnumTransformStage, EnumTraversalMode,
    ImageCleanError, SpecCleanArgs, SpecCleanOptions, SpecProjectContext, TransformError,
};
pub use transform::{MetadataStripper, transform_image};
pub use util::{derive_destination_path, resolve_scan_roots};
