//! Code-quality signal extraction.
//!
//! One bounded pass over a candidate's Python sources. Counting only; the
//! deduction logic lives in the aggregator.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{CandidateDir, QualitySignals};
use crate::error::Result;
use crate::fs::{FileSystem, MAX_FILE_BYTES, MAX_FILES_PER_CANDIDATE};
use crate::locator::is_excluded_path;

/// Import of a recognized logging facility.
static LOGGING_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:import\s+(?:logging|loguru|structlog)\b|from\s+(?:logging|loguru|structlog)[\w.]*\s+import\s)")
        .expect("logging import regex")
});

/// Statement-level print call.
static PRINT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*print\s*\(").expect("print regex"));

/// Bare or overly-broad except clause.
static BARE_EXCEPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*except\s*(?:Exception\s*)?:").expect("bare except regex"));

/// Known lazy error-message literals.
static LAZY_LITERAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)["'](?:error|failed|oops|something went wrong|unknown error)[.!]?["']"#)
        .expect("lazy literal regex")
});

/// A raised exception with an implausibly short message.
static SHORT_RAISE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"raise\s+\w*(?:Error|Exception)\(\s*["'][^"']{0,3}["']\s*\)"#)
        .expect("short raise regex")
});

/// Extract quality signals for one candidate.
///
/// Individual file read failures contribute no signal; a failed directory
/// walk fails the whole candidate.
pub fn extract_quality<F: FileSystem>(fs: &F, candidate: &CandidateDir) -> Result<QualitySignals> {
    let mut signals = QualitySignals::default();
    let files = fs.list_files(&candidate.path)?;

    let sources = files
        .iter()
        .filter(|path| is_source_file(&candidate.path, path))
        .take(MAX_FILES_PER_CANDIDATE);
    for path in sources {
        let Ok(contents) = fs.read_to_string(path) else {
            continue;
        };
        if contents.len() > MAX_FILE_BYTES {
            continue;
        }
        scan_quality_file(path, &contents, &mut signals);
    }
    Ok(signals)
}

fn scan_quality_file(path: &Path, contents: &str, signals: &mut QualitySignals) {
    if !signals.has_logging && LOGGING_IMPORT_RE.is_match(contents) {
        signals.has_logging = true;
    }
    signals.bare_except_count += BARE_EXCEPT_RE.find_iter(contents).count();

    if is_test_file(path) {
        return;
    }
    signals.print_statement_count += PRINT_RE.find_iter(contents).count();
    signals.lazy_error_message_count += LAZY_LITERAL_RE.find_iter(contents).count();
    signals.lazy_error_message_count += SHORT_RAISE_RE.find_iter(contents).count();
}

fn is_source_file(root: &Path, path: &Path) -> bool {
    let is_python = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("py"))
        .unwrap_or(false);
    if !is_python {
        return false;
    }
    path.strip_prefix(root)
        .map(|rel| !is_excluded_path(rel))
        .unwrap_or(false)
}

fn is_test_file(path: &Path) -> bool {
    let in_test_dir = path.components().any(|component| {
        let segment = component.as_os_str().to_string_lossy().to_lowercase();
        segment == "test" || segment == "tests"
    });
    if in_test_dir {
        return true;
    }
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.to_lowercase())
        .unwrap_or_default();
    stem.starts_with("test_") || stem.ends_with("_test")
}
