//! Clean specification models and top-level error types.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use imageclean_io_jpeg::CodecError;
use thiserror::Error;

use crate::report::ReportClean;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Directory enumeration strategy, chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumTraversalMode {
    /// Direct children of the scan root only.
    Flat,
    /// Full subtree below the scan root.
    #[default]
    Recursive,
}

impl EnumTraversalMode {
    /// Map the `--no-recursion` flag onto a traversal mode.
    pub fn from_no_recursion(if_no_recursion: bool) -> Self {
        if if_no_recursion {
            Self::Flat
        } else {
            Self::Recursive
        }
    }
}

/// Per-root handling of failed files. Identical for both traversal modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumFailurePolicy {
    /// Attempt every eligible file, then fail the root if any file failed.
    #[default]
    CollectAll,
    /// Stop the root at the first failed file.
    FailFast,
}

/// Symlink handling policy for file entries.
///
/// Symlinked directories are never descended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumCleanSymlinkStrategy {
    /// Follow links to regular files and clean the target bytes.
    #[default]
    Dereference,
    /// Ignore symlink entries.
    SkipSymlinks,
}

/// Processing step a [`TransformError`] happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumTransformStage {
    /// Opening the source image.
    Open,
    /// Creating the destination file or its parent directories.
    Create,
    /// Running the metadata codec.
    Strip,
    /// Flushing the destination or applying timestamps.
    Finalize,
}

impl fmt::Display for EnumTransformStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let txt = match self {
            Self::Open => "open",
            Self::Create => "create",
            Self::Strip => "strip metadata from",
            Self::Finalize => "finalize",
        };
        f.write_str(txt)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Collaborators

/// Build-system project context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecProjectContext {
    /// Project root directory.
    pub path_dir_project: PathBuf,
    /// Build target directory (usually `<project>/target`).
    pub path_dir_build_target: PathBuf,
}

impl SpecProjectContext {
    pub fn new<P, Q>(dir_project: P, dir_build_target: Q) -> Self
    where
        P: Into<PathBuf>,
        Q: Into<PathBuf>,
    {
        Self {
            path_dir_project: dir_project.into(),
            path_dir_build_target: dir_build_target.into(),
        }
    }

    /// Context with the conventional `<project>/target` build directory.
    pub fn from_project_dir<P: Into<PathBuf>>(dir_project: P) -> Self {
        let path_dir_project = dir_project.into();
        let path_dir_build_target = path_dir_project.join("target");
        Self {
            path_dir_project,
            path_dir_build_target,
        }
    }

    /// Default scan root: `<project>/src/main/images`.
    pub fn dir_images_default(&self) -> PathBuf {
        self.path_dir_project.join("src").join("main").join("images")
    }

    /// Fixed output root: `<build target>/classes`.
    pub fn dir_output(&self) -> PathBuf {
        self.path_dir_build_target.join("classes")
    }
}

/// Parsed command arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecCleanArgs {
    /// Explicit scan roots. `Some(vec![])` means "no roots", `None` means
    /// "use the project default".
    pub paths: Option<Vec<String>>,
    /// Restrict traversal to direct children of each root.
    pub if_no_recursion: bool,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// Input options for `clean_tree` / `clean_images`.
#[derive(Debug, Clone)]
pub struct SpecCleanOptions {
    /// Flat listing vs recursive walk.
    pub rule_traversal: EnumTraversalMode,
    /// Handling of failed files within one root.
    pub rule_failure: EnumFailurePolicy,
    /// Symlink handling behavior.
    pub rule_symlink: EnumCleanSymlinkStrategy,
    /// Glob patterns on file basenames that are skipped even when eligible.
    pub patterns_exclude_files: Option<Vec<String>>,
    /// Glob patterns on directory basenames that are not descended.
    pub patterns_exclude_dirs: Option<Vec<String>>,
    /// Maximum worker threads for the transform stage.
    pub num_workers_max: Option<usize>,
    /// Copy source access/modification times onto cleaned files.
    pub if_preserve_times: bool,
    /// Do not mutate filesystem; record what would happen.
    pub if_dry_run: bool,
}

impl Default for SpecCleanOptions {
    fn default() -> Self {
        Self {
            rule_traversal: EnumTraversalMode::Recursive,
            rule_failure: EnumFailurePolicy::CollectAll,
            rule_symlink: EnumCleanSymlinkStrategy::Dereference,
            patterns_exclude_files: None,
            patterns_exclude_dirs: None,
            num_workers_max: None,
            if_preserve_times: false,
            if_dry_run: false,
        }
    }
}

/// One file that could not be cleaned.
#[derive(Debug, Error)]
#[error("Cannot {stage} `{}`", .path.display())]
pub struct TransformError {
    /// Source image (or destination, for `Create`/`Finalize`).
    pub path: PathBuf,
    /// Step that failed.
    pub stage: EnumTransformStage,
    /// Codec or I/O cause.
    #[source]
    pub source: CodecError,
}

impl TransformError {
    pub(crate) fn io(path: &Path, stage: EnumTransformStage, source: io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            stage,
            source: CodecError::Io(source),
        }
    }
}

/// "Top-level call failed" errors.
#[derive(Debug, Error)]
pub enum ImageCleanError {
    /// Invalid exclude pattern.
    #[error("Invalid pattern in exclude list: {0}")]
    InvalidPattern(String),
    /// Scan root is missing or not a directory.
    #[error("Scan root is not a directory: {}", .0.display())]
    ScanRootNotDirectory(PathBuf),
    /// Scan root and output root resolve to the same directory.
    #[error("Scan root is the output directory: {}", .0.display())]
    ScanRootIsDestination(PathBuf),
    /// Output root initialization failed.
    #[error("Failed to initialize destination {}", .path.display())]
    DestinationInitFailed {
        /// Output root that failed initialization.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// At least one image of a root could not be cleaned.
    #[error("Failed to remove metadata from image")]
    MetadataRemoval {
        /// First failure in processing order.
        #[source]
        source: TransformError,
        /// Number of failed files in the root.
        cnt_failed: usize,
        /// Report of the failed root; `errors` holds the failures after the first.
        report: Box<ReportClean>,
    },
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
