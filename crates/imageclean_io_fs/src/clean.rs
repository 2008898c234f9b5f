//! Scan-root traversal and clean orchestration.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::report::{ReportClean, ReportCleanBuilder};
use crate::spec::{
    EnumFailurePolicy, EnumTransformStage, EnumTraversalMode, ImageCleanError, SpecCleanArgs,
    SpecCleanOptions, SpecProjectContext, TransformError,
};
use crate::transform::{MetadataStripper, transform_image};
use crate::util::{
    EnumEntryKind, SpecCleanPatterns, calculate_worker_limit, copy_file_times,
    derive_destination_path, is_eligible_image, nested_destination, normalize_path,
    resolve_scan_roots,
};

#[derive(Debug, Clone)]
struct SpecDirEntry {
    path_dir_src_sub: PathBuf,
    name_dir: String,
}

#[derive(Debug, Clone)]
struct SpecFileEntry {
    path_file_src: PathBuf,
    name_file: String,
    enum_entry_kind: EnumEntryKind,
}

#[derive(Debug, Clone)]
struct SpecCleanTaskFile {
    path_file_src: PathBuf,
    path_file_dst: PathBuf,
}

#[derive(Debug)]
struct SpecCleanContext<'a> {
    path_dir_root: PathBuf,
    path_dir_dst: PathBuf,
    path_dir_dst_nested: Option<PathBuf>,
    spec_cl_options: &'a SpecCleanOptions,
    spec_cl_pats: &'a SpecCleanPatterns,
    builder_cl_report: ReportCleanBuilder,
    l_tasks_file_clean: Vec<SpecCleanTaskFile>,
}

/// Run one image-clean invocation for a build project.
///
/// Scan roots come from `spec_args.paths` (or `<project>/src/main/images`),
/// the output root is `<build target>/classes`, and `spec_args.if_no_recursion`
/// selects the traversal mode, overriding `spec_cl_options.rule_traversal`.
pub fn run_image_clean<S>(
    spec_project: &SpecProjectContext,
    spec_args: &SpecCleanArgs,
    spec_cl_options: &SpecCleanOptions,
    stripper: &S,
) -> Result<ReportClean, ImageCleanError>
where
    S: MetadataStripper + ?Sized,
{
    let l_dirs_root = resolve_scan_roots(spec_args.paths.as_deref(), spec_project);
    let path_dir_dst = spec_project.dir_output();
    let spec_cl_options = SpecCleanOptions {
        rule_traversal: EnumTraversalMode::from_no_recursion(spec_args.if_no_recursion),
        ..spec_cl_options.clone()
    };
    clean_images(&l_dirs_root, &path_dir_dst, &spec_cl_options, stripper)
}

/// Clean every scan root in order into `dir_destination`.
///
/// Roots are processed one after another. The first root that fails (missing
/// root or failed images) ends the run; later roots are not touched and files
/// already written stay in place.
pub fn clean_images<P, S>(
    l_dirs_root: &[P],
    dir_destination: &Path,
    spec_cl_options: &SpecCleanOptions,
    stripper: &S,
) -> Result<ReportClean, ImageCleanError>
where
    P: AsRef<Path>,
    S: MetadataStripper + ?Sized,
{
    let spec_cl_pats = SpecCleanPatterns::from_raw(
        spec_cl_options.patterns_exclude_files.as_deref(),
        spec_cl_options.patterns_exclude_dirs.as_deref(),
    )?;
    init_destination(dir_destination, spec_cl_options.if_dry_run)?;

    let mut builder_cl_report = ReportCleanBuilder::default();
    for dir_root in l_dirs_root {
        let report_root = clean_root(
            dir_root.as_ref(),
            dir_destination,
            spec_cl_options,
            &spec_cl_pats,
            stripper,
        )?;
        builder_cl_report.merge(report_root);
    }

    let report_cl = builder_cl_report.build();
    tracing::info!("{report_cl}");
    Ok(report_cl)
}

/// Clean the images below one scan root into `dir_destination`.
///
/// This function performs:
/// 1. Pattern validation and destination initialization.
/// 2. Directory traversal (flat or recursive) and task planning.
/// 3. Task execution (serial or rayon thread pool) under the failure policy.
///
/// Returns [`ReportClean`] when every planned image was cleaned. Returns
/// [`ImageCleanError::MetadataRemoval`] when at least one image failed; its
/// source is the first failure in traversal order.
pub fn clean_tree<P, Q, S>(
    dir_source: P,
    dir_destination: Q,
    spec_cl_options: &SpecCleanOptions,
    stripper: &S,
) -> Result<ReportClean, ImageCleanError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    S: MetadataStripper + ?Sized,
{
    let spec_cl_pats = SpecCleanPatterns::from_raw(
        spec_cl_options.patterns_exclude_files.as_deref(),
        spec_cl_options.patterns_exclude_dirs.as_deref(),
    )?;
    init_destination(dir_destination.as_ref(), spec_cl_options.if_dry_run)?;
    clean_root(
        dir_source.as_ref(),
        dir_destination.as_ref(),
        spec_cl_options,
        &spec_cl_pats,
        stripper,
    )
}

fn init_destination(path_dir_dst: &Path, if_dry_run: bool) -> Result<(), ImageCleanError> {
    if if_dry_run {
        return Ok(());
    }
    fs::create_dir_all(path_dir_dst).map_err(|e| ImageCleanError::DestinationInitFailed {
        path: path_dir_dst.to_path_buf(),
        source: e,
    })
}

fn clean_root<S>(
    path_dir_root: &Path,
    path_dir_dst: &Path,
    spec_cl_options: &SpecCleanOptions,
    spec_cl_pats: &SpecCleanPatterns,
    stripper: &S,
) -> Result<ReportClean, ImageCleanError>
where
    S: MetadataStripper + ?Sized,
{
    if !path_dir_root.is_dir() {
        return Err(ImageCleanError::ScanRootNotDirectory(
            path_dir_root.to_path_buf(),
        ));
    }
    if normalize_path(path_dir_root) == normalize_path(path_dir_dst) {
        return Err(ImageCleanError::ScanRootIsDestination(
            path_dir_root.to_path_buf(),
        ));
    }
    tracing::info!(
        root = %path_dir_root.display(),
        mode = ?spec_cl_options.rule_traversal,
        "cleaning images"
    );

    let mut spec_cl_ctx = SpecCleanContext {
        path_dir_root: path_dir_root.to_path_buf(),
        path_dir_dst: path_dir_dst.to_path_buf(),
        path_dir_dst_nested: nested_destination(path_dir_root, path_dir_dst),
        spec_cl_options,
        spec_cl_pats,
        builder_cl_report: ReportCleanBuilder::default(),
        l_tasks_file_clean: Vec::new(),
    };
    spec_cl_ctx.builder_cl_report.add_root();

    walk_directory(path_dir_root, &mut spec_cl_ctx);
    flush_clean_tasks(&mut spec_cl_ctx, stripper);

    let mut report_cl = spec_cl_ctx.builder_cl_report.build();
    if report_cl.errors.is_empty() {
        return Ok(report_cl);
    }
    let cnt_failed = report_cl.errors.len();
    let source = report_cl.errors.remove(0);
    Err(ImageCleanError::MetadataRemoval {
        source,
        cnt_failed,
        report: Box::new(report_cl),
    })
}

fn walk_directory(path_dir: &Path, spec_cl_ctx: &mut SpecCleanContext<'_>) {
    let mut l_dirs: Vec<SpecDirEntry> = Vec::new();
    let mut l_files: Vec<SpecFileEntry> = Vec::new();

    let iter_entries = match fs::read_dir(path_dir) {
        Ok(iter) => iter,
        Err(e) => {
            spec_cl_ctx.builder_cl_report.add_warning(format!(
                "Failed to read directory {} ({e})",
                path_dir.display()
            ));
            return;
        }
    };

    for _entry_res in iter_entries {
        let entry = match _entry_res {
            Ok(v) => v,
            Err(e) => {
                spec_cl_ctx.builder_cl_report.add_warning(format!(
                    "Failed to read directory entry under {} ({e})",
                    path_dir.display()
                ));
                continue;
            }
        };

        let path_entry = entry.path();
        let c_name = entry.file_name().to_string_lossy().to_string();
        let enum_entry_kind = match entry.file_type() {
            Ok(v) => EnumEntryKind::from(v),
            Err(e) => {
                spec_cl_ctx
                    .builder_cl_report
                    .add_warning(format!("Failed to inspect {} ({e})", path_entry.display()));
                continue;
            }
        };

        if enum_entry_kind == EnumEntryKind::Dir {
            l_dirs.push(SpecDirEntry {
                path_dir_src_sub: path_entry,
                name_dir: c_name,
            });
        } else {
            l_files.push(SpecFileEntry {
                path_file_src: path_entry,
                name_file: c_name,
                enum_entry_kind,
            });
        }
    }

    l_dirs.sort_by(|a, b| a.name_dir.cmp(&b.name_dir));
    l_files.sort_by(|a, b| a.name_file.cmp(&b.name_file));

    if spec_cl_ctx.spec_cl_options.rule_traversal == EnumTraversalMode::Flat {
        l_dirs.clear();
    }

    for _dir_entry in l_dirs {
        if should_skip_dir(&_dir_entry, spec_cl_ctx) {
            continue;
        }
        walk_directory(&_dir_entry.path_dir_src_sub, spec_cl_ctx);
    }

    for _file_entry in l_files {
        handle_file_entry(_file_entry, spec_cl_ctx);
    }
}

fn should_skip_dir(spec_dir_entry: &SpecDirEntry, spec_cl_ctx: &mut SpecCleanContext<'_>) -> bool {
    if spec_cl_ctx
        .spec_cl_pats
        .should_exclude_dir(&spec_dir_entry.name_dir)
    {
        tracing::debug!(dir = %spec_dir_entry.path_dir_src_sub.display(), "directory excluded");
        return true;
    }

    let if_output_dir = spec_cl_ctx
        .path_dir_dst_nested
        .as_ref()
        .is_some_and(|p| normalize_path(&spec_dir_entry.path_dir_src_sub) == *p);
    if if_output_dir {
        spec_cl_ctx.builder_cl_report.add_warning(format!(
            "Output directory inside scan root skipped: {}",
            spec_dir_entry.path_dir_src_sub.display()
        ));
    }
    if_output_dir
}

fn handle_file_entry(spec_file_entry: SpecFileEntry, spec_cl_ctx: &mut SpecCleanContext<'_>) {
    spec_cl_ctx.builder_cl_report.add_scanned();

    if !is_eligible_image(
        &spec_file_entry.path_file_src,
        &spec_file_entry.name_file,
        spec_file_entry.enum_entry_kind,
        spec_cl_ctx.spec_cl_options.rule_symlink,
        &spec_cl_ctx.spec_cl_pats.matcher_image,
    ) {
        return;
    }
    spec_cl_ctx.builder_cl_report.add_matched();

    if spec_cl_ctx
        .spec_cl_pats
        .should_exclude_file(&spec_file_entry.name_file)
    {
        tracing::debug!(file = %spec_file_entry.path_file_src.display(), "image excluded");
        spec_cl_ctx.builder_cl_report.add_skipped(1);
        return;
    }

    let path_file_dst = derive_destination_path(
        &spec_file_entry.path_file_src,
        &spec_cl_ctx.path_dir_root,
        &spec_cl_ctx.path_dir_dst,
    );

    // Creating the destination would truncate the source.
    if normalize_path(&spec_file_entry.path_file_src) == normalize_path(&path_file_dst) {
        spec_cl_ctx.builder_cl_report.add_warning(format!(
            "Image is its own destination, skipped: {}",
            spec_file_entry.path_file_src.display()
        ));
        spec_cl_ctx.builder_cl_report.add_skipped(1);
        return;
    }

    if spec_cl_ctx.spec_cl_options.if_dry_run {
        tracing::info!(
            src = %spec_file_entry.path_file_src.display(),
            dst = %path_file_dst.display(),
            "dry run: would clean image"
        );
        spec_cl_ctx.builder_cl_report.add_skipped(1);
        return;
    }

    spec_cl_ctx.l_tasks_file_clean.push(SpecCleanTaskFile {
        path_file_src: spec_file_entry.path_file_src,
        path_file_dst,
    });
}

fn run_clean_task<S>(
    spec_task: &SpecCleanTaskFile,
    stripper: &S,
    if_preserve_times: bool,
) -> Result<(), TransformError>
where
    S: MetadataStripper + ?Sized,
{
    tracing::debug!(
        src = %spec_task.path_file_src.display(),
        dst = %spec_task.path_file_dst.display(),
        "cleaning image"
    );
    transform_image(&spec_task.path_file_src, &spec_task.path_file_dst, stripper)?;
    if if_preserve_times {
        copy_file_times(&spec_task.path_file_src, &spec_task.path_file_dst).map_err(|e| {
            TransformError::io(&spec_task.path_file_dst, EnumTransformStage::Finalize, e)
        })?;
    }
    Ok(())
}

fn flush_clean_tasks<S>(spec_cl_ctx: &mut SpecCleanContext<'_>, stripper: &S)
where
    S: MetadataStripper + ?Sized,
{
    let l_tasks_file_clean = std::mem::take(&mut spec_cl_ctx.l_tasks_file_clean);
    if l_tasks_file_clean.is_empty() {
        return;
    }

    let if_fail_fast = spec_cl_ctx.spec_cl_options.rule_failure == EnumFailurePolicy::FailFast;
    let if_preserve_times = spec_cl_ctx.spec_cl_options.if_preserve_times;
    let n_workers_max =
        calculate_worker_limit(spec_cl_ctx.spec_cl_options.num_workers_max).min(l_tasks_file_clean.len());
    let b_aborted = AtomicBool::new(false);

    // `None` marks a task that never started because an earlier one failed.
    let run_task = |spec_task: SpecCleanTaskFile| -> Option<Result<(), TransformError>> {
        if if_fail_fast && b_aborted.load(Ordering::Acquire) {
            return None;
        }
        let res_clean = run_clean_task(&spec_task, stripper, if_preserve_times);
        if if_fail_fast && res_clean.is_err() {
            b_aborted.store(true, Ordering::Release);
        }
        Some(res_clean)
    };

    let apply_results = |l_results: Vec<Option<Result<(), TransformError>>>,
                         builder_cl_report: &mut ReportCleanBuilder| {
        for res_task in l_results {
            match res_task {
                Some(Ok(())) => builder_cl_report.add_cleaned(),
                Some(Err(e)) => {
                    tracing::error!(path = %e.path.display(), "{e}: {}", e.source);
                    builder_cl_report.add_error(e);
                }
                None => builder_cl_report.add_skipped(1),
            }
        }
    };

    if n_workers_max <= 1 {
        let l_results = l_tasks_file_clean.into_iter().map(&run_task).collect::<Vec<_>>();
        apply_results(l_results, &mut spec_cl_ctx.builder_cl_report);
        return;
    }

    let thread_pool = ThreadPoolBuilder::new().num_threads(n_workers_max).build();
    let Ok(thread_pool) = thread_pool else {
        spec_cl_ctx.builder_cl_report.add_warning(format!(
            "Failed to initialize thread pool (workers={n_workers_max}); fallback to serial clean."
        ));
        let l_results = l_tasks_file_clean.into_iter().map(&run_task).collect::<Vec<_>>();
        apply_results(l_results, &mut spec_cl_ctx.builder_cl_report);
        return;
    };

    let l_results = thread_pool.install(|| {
        l_tasks_file_clean
            .into_par_iter()
            .map(&run_task)
            .collect::<Vec<_>>()
    });
    apply_results(l_results, &mut spec_cl_ctx.builder_cl_report);
}
