use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};

use crate::spec::{EnumCleanSymlinkStrategy, ImageCleanError, SpecProjectContext};

/// Basename pattern of images the pipeline accepts. Case-sensitive.
pub(crate) const C_PATTERN_IMAGE: &str = "*.jpg";

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

#[derive(Debug, Clone)]
pub(crate) struct SpecCleanPatterns {
    pub(crate) matcher_image: GlobMatcher,
    pub(crate) patterns_exclude_files: Option<Vec<GlobMatcher>>,
    pub(crate) patterns_exclude_dirs: Option<Vec<GlobMatcher>>,
}

impl SpecCleanPatterns {
    pub(crate) fn from_raw(
        patterns_exclude_files: Option<&[String]>,
        patterns_exclude_dirs: Option<&[String]>,
    ) -> Result<Self, ImageCleanError> {
        Ok(Self {
            matcher_image: _compile_one(C_PATTERN_IMAGE)?,
            patterns_exclude_files: _compile(patterns_exclude_files)?,
            patterns_exclude_dirs: _compile(patterns_exclude_dirs)?,
        })
    }

    pub(crate) fn should_exclude_file(&self, name_file: &str) -> bool {
        _is_pattern_matching(name_file, self.patterns_exclude_files.as_deref())
    }

    pub(crate) fn should_exclude_dir(&self, name_dir: &str) -> bool {
        _is_pattern_matching(name_dir, self.patterns_exclude_dirs.as_deref())
    }
}

fn _compile_one(pattern: &str) -> Result<GlobMatcher, ImageCleanError> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|e| ImageCleanError::InvalidPattern(e.to_string()))
}

fn _compile(patterns: Option<&[String]>) -> Result<Option<Vec<GlobMatcher>>, ImageCleanError> {
    let Some(patterns) = patterns else {
        return Ok(None);
    };
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut l_glob = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        l_glob.push(_compile_one(pattern)?);
    }
    Ok(Some(l_glob))
}

fn _is_pattern_matching(value: &str, patterns: Option<&[GlobMatcher]>) -> bool {
    patterns.is_some_and(|v| v.iter().any(|p| p.is_match(value)))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Classification

/// File type of a directory entry, symlinks not followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EnumEntryKind {
    File,
    Dir,
    Symlink,
    Special,
}

impl From<fs::FileType> for EnumEntryKind {
    fn from(file_type: fs::FileType) -> Self {
        if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_dir() {
            Self::Dir
        } else if file_type.is_file() {
            Self::File
        } else {
            Self::Special
        }
    }
}

/// Whether an entry is a regular file whose name ends in exactly `.jpg`.
///
/// Symlinks count when they resolve to a regular file and the strategy is
/// [`EnumCleanSymlinkStrategy::Dereference`]. Directories, links to
/// directories, dangling links and special files never qualify.
pub(crate) fn is_eligible_image(
    path_entry: &Path,
    name_entry: &str,
    enum_entry_kind: EnumEntryKind,
    rule_symlink: EnumCleanSymlinkStrategy,
    matcher_image: &GlobMatcher,
) -> bool {
    if !matcher_image.is_match(name_entry) {
        return false;
    }
    match enum_entry_kind {
        EnumEntryKind::File => true,
        EnumEntryKind::Symlink => {
            rule_symlink == EnumCleanSymlinkStrategy::Dereference
                && fs::metadata(path_entry).is_ok_and(|meta| meta.is_file())
        }
        EnumEntryKind::Dir | EnumEntryKind::Special => false,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

/// Turn raw path arguments into scan roots.
///
/// `Some(paths)` yields one root per string, in order, duplicates kept;
/// relative strings are resolved against the project directory. `None`
/// yields the project's default images directory. Existence is not checked.
pub fn resolve_scan_roots(
    paths: Option<&[String]>,
    spec_project: &SpecProjectContext,
) -> Vec<PathBuf> {
    match paths {
        Some(l_paths) => l_paths
            .iter()
            .map(|path| spec_project.path_dir_project.join(path))
            .collect(),
        None => vec![spec_project.dir_images_default()],
    }
}

/// Destination of `path_src`: its path relative to `path_dir_root`, joined onto
/// `path_dir_dst`.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use imageclean_io_fs::derive_destination_path;
///
/// let path_dst = derive_destination_path(
///     Path::new("/project/src/main/images/icons/logo.jpg"),
///     Path::new("/project/src/main/images"),
///     Path::new("/project/target/classes"),
/// );
/// assert_eq!(path_dst, Path::new("/project/target/classes/icons/logo.jpg"));
/// ```
pub fn derive_destination_path(path_src: &Path, path_dir_root: &Path, path_dir_dst: &Path) -> PathBuf {
    match path_src.strip_prefix(path_dir_root) {
        Ok(path_rel) => path_dir_dst.join(path_rel),
        Err(_) => path_dir_dst.join(path_src.file_name().unwrap_or_default()),
    }
}

pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

/// Normalized `path_dir_dst` when it lies strictly inside `path_dir_root`.
pub(crate) fn nested_destination(path_dir_root: &Path, path_dir_dst: &Path) -> Option<PathBuf> {
    let path_root_resolved = normalize_path(path_dir_root);
    let path_dst_resolved = normalize_path(path_dir_dst);
    (path_dst_resolved != path_root_resolved && path_dst_resolved.starts_with(&path_root_resolved))
        .then_some(path_dst_resolved)
}

pub(crate) fn copy_file_times(path_file_src: &Path, path_file_dst: &Path) -> Result<(), io::Error> {
    use filetime::{FileTime, set_file_times};

    let stat_src = fs::metadata(path_file_src)?;
    let file_time_access = FileTime::from_last_access_time(&stat_src);
    let file_time_modify = FileTime::from_last_modification_time(&stat_src);
    set_file_times(path_file_dst, file_time_access, file_time_modify)
}

pub(crate) fn calculate_worker_limit(num_workers_max: Option<usize>) -> usize {
    let n_cpu = std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1);

    match num_workers_max {
        Some(n) => n.clamp(1, n_cpu),
        None => n_cpu.clamp(1, 8),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use tempfile::TempDir;

    use super::{
        EnumEntryKind, SpecCleanPatterns, calculate_worker_limit, derive_destination_path,
        is_eligible_image, nested_destination, resolve_scan_roots,
    };
    use crate::spec::{EnumCleanSymlinkStrategy, ImageCleanError, SpecProjectContext};

    fn patterns() -> SpecCleanPatterns {
        SpecCleanPatterns::from_raw(None, None).expect("default patterns")
    }

    #[test]
    fn resolve_scan_roots_defaults_to_project_images_dir() {
        let spec_project = SpecProjectContext::from_project_dir("/work/app");
        let l_roots = resolve_scan_roots(None, &spec_project);
        assert_eq!(l_roots, vec![PathBuf::from("/work/app/src/main/images")]);
    }

    #[test]
    fn resolve_scan_roots_keeps_order_and_duplicates() {
        let spec_project = SpecProjectContext::from_project_dir("/work/app");
        let l_paths = vec![
            "assets/b".to_string(),
            "/abs/a".to_string(),
            "assets/b".to_string(),
        ];
        let l_roots = resolve_scan_roots(Some(l_paths.as_slice()), &spec_project);
        assert_eq!(
            l_roots,
            vec![
                PathBuf::from("/work/app/assets/b"),
                PathBuf::from("/abs/a"),
                PathBuf::from("/work/app/assets/b"),
            ]
        );
    }

    #[test]
    fn resolve_scan_roots_empty_list_means_no_roots() {
        let spec_project = SpecProjectContext::from_project_dir("/work/app");
        let l_paths: Vec<String> = Vec::new();
        assert!(resolve_scan_roots(Some(l_paths.as_slice()), &spec_project).is_empty());
    }

    #[test]
    fn image_name_match_is_exact_and_case_sensitive() {
        let spec_pats = patterns();
        let path = Path::new("unused");
        let is_eligible = |name: &str| {
            is_eligible_image(
                path,
                name,
                EnumEntryKind::File,
                EnumCleanSymlinkStrategy::Dereference,
                &spec_pats.matcher_image,
            )
        };

        assert!(is_eligible("photo.jpg"));
        assert!(is_eligible("archive.tar.jpg"));
        assert!(!is_eligible("photo.JPG"));
        assert!(!is_eligible("photo.jpeg"));
        assert!(!is_eligible("photo.jpg.bak"));
        assert!(!is_eligible("photo.png"));
    }

    #[test]
    fn directories_and_special_entries_are_not_eligible() {
        let spec_pats = patterns();
        for enum_kind in [EnumEntryKind::Dir, EnumEntryKind::Special] {
            assert!(!is_eligible_image(
                Path::new("album.jpg"),
                "album.jpg",
                enum_kind,
                EnumCleanSymlinkStrategy::Dereference,
                &spec_pats.matcher_image,
            ));
        }
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_follow_strategy_and_target_type() {
        use std::os::unix::fs::symlink;

        let tmp = TempDir::new().expect("tempdir");
        let spec_pats = patterns();
        std::fs::write(tmp.path().join("real.jpg"), b"x").expect("write");
        std::fs::create_dir(tmp.path().join("dir.jpg")).expect("mkdir");
        symlink(tmp.path().join("real.jpg"), tmp.path().join("file_link.jpg")).expect("link");
        symlink(tmp.path().join("dir.jpg"), tmp.path().join("dir_link.jpg")).expect("link");
        symlink(tmp.path().join("gone.jpg"), tmp.path().join("dangling.jpg")).expect("link");

        let check = |name: &str, rule_symlink| {
            is_eligible_image(
                &tmp.path().join(name),
                name,
                EnumEntryKind::Symlink,
                rule_symlink,
                &spec_pats.matcher_image,
            )
        };
        assert!(check("file_link.jpg", EnumCleanSymlinkStrategy::Dereference));
        assert!(!check("file_link.jpg", EnumCleanSymlinkStrategy::SkipSymlinks));
        assert!(!check("dir_link.jpg", EnumCleanSymlinkStrategy::Dereference));
        assert!(!check("dangling.jpg", EnumCleanSymlinkStrategy::Dereference));
    }

    #[test]
    fn exclude_patterns_match_basenames() {
        let l_files = vec!["*_raw.jpg".to_string()];
        let l_dirs = vec!["thumb*".to_string()];
        let spec_pats = SpecCleanPatterns::from_raw(Some(l_files.as_slice()), Some(l_dirs.as_slice()))
        .expect("patterns");

        assert!(spec_pats.should_exclude_file("img_raw.jpg"));
        assert!(!spec_pats.should_exclude_file("img.jpg"));
        assert!(spec_pats.should_exclude_dir("thumbnails"));
        assert!(!spec_pats.should_exclude_dir("icons"));
    }

    #[test]
    fn invalid_exclude_pattern_rejected() {
        let l_files = vec!["[".to_string()];
        let err = SpecCleanPatterns::from_raw(Some(l_files.as_slice()), None)
            .expect_err("invalid glob must fail");
        assert!(matches!(err, ImageCleanError::InvalidPattern(_)));
    }

    #[test]
    fn destination_mirrors_relative_path() {
        let path_dst = derive_destination_path(
            Path::new("/r/a/b/c.jpg"),
            Path::new("/r"),
            Path::new("/out/classes"),
        );
        assert_eq!(path_dst, PathBuf::from("/out/classes/a/b/c.jpg"));

        let path_dst = derive_destination_path(
            Path::new("/r/top.jpg"),
            Path::new("/r"),
            Path::new("/out/classes"),
        );
        assert_eq!(path_dst, PathBuf::from("/out/classes/top.jpg"));
    }

    #[test]
    fn destination_falls_back_to_file_name_outside_root() {
        let path_dst = derive_destination_path(
            Path::new("/elsewhere/x.jpg"),
            Path::new("/r"),
            Path::new("/out"),
        );
        assert_eq!(path_dst, PathBuf::from("/out/x.jpg"));
    }

    #[test]
    fn nested_destination_detected_only_inside_root() {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("project");
        let dst_inside = root.join("target/classes");
        let dst_outside = tmp.path().join("out");
        std::fs::create_dir_all(&dst_inside).expect("mkdir");
        std::fs::create_dir_all(&dst_outside).expect("mkdir");

        assert!(nested_destination(&root, &dst_inside).is_some());
        assert!(nested_destination(&root, &dst_outside).is_none());
        assert!(nested_destination(&root, &root).is_none());
    }

    #[test]
    fn worker_limit_is_at_least_one() {
        assert_eq!(calculate_worker_limit(Some(0)), 1);
        assert_eq!(calculate_worker_limit(Some(1)), 1);
        assert!(calculate_worker_limit(None) >= 1);
        assert!(calculate_worker_limit(None) <= 8);
    }
}
