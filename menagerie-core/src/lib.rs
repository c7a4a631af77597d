#![deny(missing_docs)]
//! Menagerie core library.
//!
//! Batch static analysis for MCP server repositories: candidate discovery,
//! pattern-based signal extraction, compliance classification, scan
//! orchestration and report rendering.

pub mod aggregate;
pub mod domain;
pub mod error;
pub mod fs;
pub mod locator;
pub mod quality;
pub mod report;
pub mod scan;
pub mod structure;
pub mod tools;

pub use aggregate::{BASELINE_FRAMEWORK_VERSION, aggregate, priority_for, size_class_for};
pub use domain::{
    ACTIVITY_LOG_CAPACITY, CandidateDir, ComplianceStatus, Priority, QualitySignals, RepoAnalysis,
    ScanOutcome, ScanProgress, SizeClass, StructureSignals, SummaryStats, ToolSignals,
};
pub use error::{MenagerieError, Result};
pub use fs::{FileSystem, StdFileSystem};
pub use locator::{detect_framework_version, locate};
pub use quality::extract_quality;
pub use report::{
    priority_label, render_analysis_markdown, render_json, render_scan_markdown, size_class_label,
    status_label,
};
pub use scan::{CancelFlag, ProgressSink, ScanOptions, analyze_one, scan, summarize};
pub use structure::extract_structure;
pub use tools::{extract_tools, locate_tool_sources};
