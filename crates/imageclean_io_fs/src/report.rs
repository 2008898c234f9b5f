//! Clean report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;

use crate::spec::TransformError;

/// Aggregate counters and diagnostics for one clean run.
#[derive(Debug, Default)]
pub struct ReportClean {
    /// Number of scan roots traversed.
    pub cnt_roots: u64,
    /// Total scanned file entries.
    pub cnt_scanned: u64,
    /// Number of scanned entries classified as eligible images.
    pub cnt_matched: u64,
    /// Number of images written without metadata.
    pub cnt_cleaned: u64,
    /// Number of eligible images not written (dry-run, excluded, fail-fast abort).
    pub cnt_skipped: u64,
    /// Non-fatal warnings collected during traversal.
    pub warnings: Vec<String>,
    /// Per-file failures.
    pub errors: Vec<TransformError>,
}

impl ReportClean {
    /// Number of collected hard errors.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_roots".to_string(), self.cnt_roots);
        dict_counts.insert("cnt_scanned".to_string(), self.cnt_scanned);
        dict_counts.insert("cnt_matched".to_string(), self.cnt_matched);
        dict_counts.insert("cnt_cleaned".to_string(), self.cnt_cleaned);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} roots={} scanned={} matched={} cleaned={} skipped={} errors={} warnings={}",
            self.cnt_roots,
            self.cnt_scanned,
            self.cnt_matched,
            self.cnt_cleaned,
            self.cnt_skipped,
            self.error_count(),
            self.warning_count()
        )
    }
}

impl fmt::Display for ReportClean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[CLEAN]"))
    }
}

/// Mutable accumulator for clean statistics.
#[derive(Debug, Default)]
pub struct ReportCleanBuilder {
    /// See [`ReportClean::cnt_roots`].
    pub cnt_roots: u64,
    /// See [`ReportClean::cnt_scanned`].
    pub cnt_scanned: u64,
    /// See [`ReportClean::cnt_matched`].
    pub cnt_matched: u64,
    /// See [`ReportClean::cnt_cleaned`].
    pub cnt_cleaned: u64,
    /// See [`ReportClean::cnt_skipped`].
    pub cnt_skipped: u64,
    /// See [`ReportClean::errors`].
    pub errors: Vec<TransformError>,
    /// See [`ReportClean::warnings`].
    pub warnings: Vec<String>,
}

impl ReportCleanBuilder {
    pub fn add_root(&mut self) {
        self.cnt_roots += 1;
    }

    pub fn add_scanned(&mut self) {
        self.cnt_scanned += 1;
    }

    pub fn add_matched(&mut self) {
        self.cnt_matched += 1;
    }

    pub fn add_cleaned(&mut self) {
        self.cnt_cleaned += 1;
    }

    /// Increment skipped count by `value`.
    pub fn add_skipped(&mut self, value: u64) {
        self.cnt_skipped += value;
    }

    /// Add warning message; also emitted through `tracing`.
    pub fn add_warning(&mut self, warning: String) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Add one path-scoped failure.
    pub fn add_error(&mut self, error: TransformError) {
        self.errors.push(error);
    }

    /// Fold a finished per-root report into this accumulator.
    pub fn merge(&mut self, report: ReportClean) {
        self.cnt_roots += report.cnt_roots;
        self.cnt_scanned += report.cnt_scanned;
        self.cnt_matched += report.cnt_matched;
        self.cnt_cleaned += report.cnt_cleaned;
        self.cnt_skipped += report.cnt_skipped;
        self.warnings.extend(report.warnings);
        self.errors.extend(report.errors);
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportClean {
        ReportClean {
            cnt_roots: self.cnt_roots,
            cnt_scanned: self.cnt_scanned,
            cnt_matched: self.cnt_matched,
            cnt_cleaned: self.cnt_cleaned,
            cnt_skipped: self.cnt_skipped,
            warnings: self.warnings,
            errors: self.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::PathBuf;

    use super::{ReportClean, ReportCleanBuilder};
    use crate::spec::{EnumTransformStage, TransformError};

    #[test]
    fn report_clean_to_dict_and_format() {
        let report = ReportClean {
            cnt_roots: 1,
            cnt_scanned: 8,
            cnt_matched: 5,
            cnt_cleaned: 3,
            cnt_skipped: 2,
            warnings: vec!["w".to_string()],
            errors: vec![],
        };

        let dict_counts = report.to_dict();
        assert_eq!(dict_counts["cnt_roots"], 1);
        assert_eq!(dict_counts["cnt_matched"], 5);
        assert_eq!(dict_counts["cnt_scanned"], 8);
        assert_eq!(dict_counts["cnt_cleaned"], 3);
        assert_eq!(dict_counts["cnt_skipped"], 2);
        assert_eq!(dict_counts["cnt_errors"], 0);
        assert_eq!(dict_counts["cnt_warnings"], 1);

        let txt = report.format("[CLEAN]");
        assert_eq!(
            txt,
            "[CLEAN] roots=1 scanned=8 matched=5 cleaned=3 skipped=2 errors=0 warnings=1"
        );
        assert_eq!(report.to_string(), txt);
    }

    #[test]
    fn builder_merge_sums_counters_and_keeps_errors() {
        let mut builder_first = ReportCleanBuilder::default();
        builder_first.add_root();
        builder_first.add_scanned();
        builder_first.add_matched();
        builder_first.add_cleaned();

        let mut builder_second = ReportCleanBuilder::default();
        builder_second.add_root();
        builder_second.add_scanned();
        builder_second.add_matched();
        builder_second.add_skipped(2);
        builder_second.add_warning("special file".to_string());
        builder_second.add_error(TransformError::io(
            &PathBuf::from("b.jpg"),
            EnumTransformStage::Open,
            io::Error::from(io::ErrorKind::NotFound),
        ));

        builder_first.merge(builder_second.build());
        let report = builder_first.build();
        assert_eq!(report.cnt_roots, 2);
        assert_eq!(report.cnt_scanned, 2);
        assert_eq!(report.cnt_matched, 2);
        assert_eq!(report.cnt_cleaned, 1);
        assert_eq!(report.cnt_skipped, 2);
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.errors[0].path, PathBuf::from("b.jpg"));
    }
}
