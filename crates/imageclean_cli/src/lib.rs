//! `imageclean_cli` v1:
//! Command-line bridge onto `imageclean_io_fs::run_image_clean`.

use std::path::PathBuf;

use clap::Parser;
use imageclean_io_fs::{
    EnumFailurePolicy, ReportClean, SpecCleanArgs, SpecCleanOptions, SpecProjectContext,
    run_image_clean,
};
use imageclean_io_jpeg::{EnumStripScope, JpegMetadataStripper};

/// Copy `.jpg` images into `<build target>/classes` with their metadata removed.
#[derive(Parser, Debug)]
#[command(name = "imageclean")]
#[command(version)]
pub struct Cli {
    /// Scan roots. Defaults to `<project-dir>/src/main/images`.
    #[arg(value_name = "PATHS")]
    pub paths: Vec<String>,

    /// Only clean direct children of each scan root.
    #[arg(long)]
    pub no_recursion: bool,

    /// Project directory; relative scan roots resolve against it.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub project_dir: PathBuf,

    /// Build target directory. Defaults to `<project-dir>/target`.
    #[arg(long, value_name = "DIR")]
    pub build_target: Option<PathBuf>,

    /// Skip image files whose name matches this glob.
    #[arg(long = "exclude", value_name = "GLOB")]
    pub patterns_exclude_files: Vec<String>,

    /// Do not descend into directories whose name matches this glob.
    #[arg(long = "exclude-dir", value_name = "GLOB")]
    pub patterns_exclude_dirs: Vec<String>,

    /// What to do when an image cannot be cleaned.
    #[arg(
        long = "on-error",
        value_name = "POLICY",
        default_value = "collect-all",
        value_parser = parse_rule_failure
    )]
    pub rule_failure: EnumFailurePolicy,

    /// Maximum worker threads.
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub num_workers_max: Option<usize>,

    /// Drop every APPn (except APP0/APP14) and COM segment, not only EXIF.
    #[arg(long)]
    pub strip_all: bool,

    /// Report what would be cleaned without writing.
    #[arg(long)]
    pub dry_run: bool,

    /// Copy access and modification times onto cleaned files.
    #[arg(long)]
    pub preserve_times: bool,

    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn to_project(&self) -> SpecProjectContext {
        match self.build_target.as_ref() {
            Some(dir_build_target) => SpecProjectContext::new(
                &self.project_dir,
                self.project_dir.join(dir_build_target),
            ),
            None => SpecProjectContext::from_project_dir(&self.project_dir),
        }
    }

    /// Empty positional list means "use the default root".
    pub fn to_args(&self) -> SpecCleanArgs {
        SpecCleanArgs {
            paths: (!self.paths.is_empty()).then(|| self.paths.clone()),
            if_no_recursion: self.no_recursion,
        }
    }

    pub fn to_options(&self) -> SpecCleanOptions {
        SpecCleanOptions {
            rule_failure: self.rule_failure,
            patterns_exclude_files: non_empty(&self.patterns_exclude_files),
            patterns_exclude_dirs: non_empty(&self.patterns_exclude_dirs),
            num_workers_max: self.num_workers_max,
            if_preserve_times: self.preserve_times,
            if_dry_run: self.dry_run,
            ..SpecCleanOptions::default()
        }
    }

    pub fn to_stripper(&self) -> JpegMetadataStripper {
        let scope = if self.strip_all {
            EnumStripScope::All
        } else {
            EnumStripScope::Exif
        };
        JpegMetadataStripper::new(scope)
    }
}

fn non_empty(l_values: &[String]) -> Option<Vec<String>> {
    (!l_values.is_empty()).then(|| l_values.to_vec())
}

pub fn parse_rule_failure(value: &str) -> Result<EnumFailurePolicy, String> {
    match value {
        "collect-all" => Ok(EnumFailurePolicy::CollectAll),
        "fail-fast" => Ok(EnumFailurePolicy::FailFast),
        _ => Err(format!(
            "Invalid failure policy: `{value}`. Expected one of: ['collect-all', 'fail-fast']"
        )),
    }
}

/// Run one clean for the parsed command line.
pub fn run(cli: &Cli) -> anyhow::Result<ReportClean> {
    let spec_project = cli.to_project();
    tracing::debug!(
        project = %spec_project.path_dir_project.display(),
        output = %spec_project.dir_output().display(),
        "resolved project"
    );
    let report_cl = run_image_clean(
        &spec_project,
        &cli.to_args(),
        &cli.to_options(),
        &cli.to_stripper(),
    )?;
    for (key, value) in report_cl.to_dict() {
        tracing::debug!(counter = key.as_str(), value, "clean counter");
    }
    Ok(report_cl)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;
    use imageclean_io_fs::{EnumFailurePolicy, EnumTraversalMode, ImageCleanError};
    use imageclean_io_jpeg::EnumStripScope;
    use tempfile::TempDir;

    use super::{Cli, parse_rule_failure, run};

    #[test]
    fn defaults_use_project_layout() {
        let cli = Cli::try_parse_from(["imageclean"]).expect("parse");
        assert!(!cli.no_recursion);
        assert_eq!(cli.to_args().paths, None);

        let spec_project = cli.to_project();
        assert_eq!(spec_project.path_dir_project, PathBuf::from("."));
        assert_eq!(spec_project.dir_output(), PathBuf::from("./target/classes"));

        let spec_cl_options = cli.to_options();
        assert_eq!(spec_cl_options.rule_failure, EnumFailurePolicy::CollectAll);
        assert_eq!(spec_cl_options.rule_traversal, EnumTraversalMode::Recursive);
        assert!(spec_cl_options.patterns_exclude_files.is_none());
        assert!(!spec_cl_options.if_dry_run);
        assert_eq!(cli.to_stripper().scope, EnumStripScope::Exif);
    }

    #[test]
    fn flags_and_positional_paths() {
        let cli = Cli::try_parse_from([
            "imageclean",
            "--no-recursion",
            "--project-dir",
            "/work/app",
            "--build-target",
            "out",
            "--exclude",
            "*_raw.jpg",
            "--exclude-dir",
            "thumbs",
            "--on-error",
            "fail-fast",
            "-j",
            "3",
            "--strip-all",
            "--dry-run",
            "--preserve-times",
            "-vv",
            "assets/a",
            "assets/b",
        ])
        .expect("parse");

        let spec_args = cli.to_args();
        assert!(spec_args.if_no_recursion);
        assert_eq!(
            spec_args.paths,
            Some(vec!["assets/a".to_string(), "assets/b".to_string()])
        );
        assert_eq!(
            cli.to_project().dir_output(),
            PathBuf::from("/work/app/out/classes")
        );

        let spec_cl_options = cli.to_options();
        assert_eq!(spec_cl_options.rule_failure, EnumFailurePolicy::FailFast);
        assert_eq!(
            spec_cl_options.patterns_exclude_files,
            Some(vec!["*_raw.jpg".to_string()])
        );
        assert_eq!(
            spec_cl_options.patterns_exclude_dirs,
            Some(vec!["thumbs".to_string()])
        );
        assert_eq!(spec_cl_options.num_workers_max, Some(3));
        assert!(spec_cl_options.if_dry_run);
        assert!(spec_cl_options.if_preserve_times);
        assert_eq!(cli.to_stripper().scope, EnumStripScope::All);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn invalid_failure_policy_rejected() {
        assert!(parse_rule_failure("ignore").is_err());
        assert!(Cli::try_parse_from(["imageclean", "--on-error", "ignore"]).is_err());
    }

    #[test]
    fn run_cleans_default_root() {
        let tmp = TempDir::new().expect("tempdir");
        let path_dir_images = tmp.path().join("src/main/images/icons");
        std::fs::create_dir_all(&path_dir_images).expect("mkdir");
        std::fs::write(
            path_dir_images.join("logo.jpg"),
            [0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x02, 0x11, 0xFF, 0xD9],
        )
        .expect("write");

        let dir_project = tmp.path().to_string_lossy().to_string();
        let cli = Cli::try_parse_from(["imageclean", "--project-dir", dir_project.as_str()])
            .expect("parse");
        let report_cl = run(&cli).expect("run");
        assert_eq!(report_cl.cnt_cleaned, 1);
        assert!(tmp.path().join("target/classes/icons/logo.jpg").exists());
    }

    #[test]
    fn run_reports_missing_root() {
        let tmp = TempDir::new().expect("tempdir");
        let dir_project = tmp.path().to_string_lossy().to_string();
        let cli = Cli::try_parse_from([
            "imageclean",
            "--project-dir",
            dir_project.as_str(),
            "missing",
        ])
        .expect("parse");

        let err = run(&cli).expect_err("must fail");
        assert!(matches!(
            err.downcast_ref::<ImageCleanError>(),
            Some(ImageCleanError::ScanRootNotDirectory(_))
        ));
    }
}
