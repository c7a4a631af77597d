//! Domain entities for Menagerie.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Maximum number of lines retained in a scan's activity log.
pub const ACTIVITY_LOG_CAPACITY: usize = 50;

/// A directory that declares the target framework at a detectable version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDir {
    /// Directory name, used as the repository name.
    pub name: String,
    /// Absolute path to the candidate directory.
    pub path: PathBuf,
    /// Declared fastmcp version string.
    pub framework_version: String,
}

/// Signals produced by the tool/pattern extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToolSignals {
    /// Total tool definitions found in the selected source set.
    pub tool_count_total: usize,
    /// Tools counted as individual (single-operation) definitions.
    pub tool_count_individual: usize,
    /// Tools counted as portmanteau (multi-operation) definitions.
    pub tool_count_portmanteau: usize,
    /// Operations dispatched by portmanteau tools via closed string sets.
    pub portmanteau_operation_count: usize,
    /// Tools whose docstring carries a recognized section header.
    pub documented_tool_count: usize,
    /// Whether more than half of the tools are properly documented.
    pub has_proper_docstrings: bool,
    /// Whether a help-like tool is exposed.
    pub has_help_tool: bool,
    /// Whether a status-like tool is exposed.
    pub has_status_tool: bool,
}

impl ToolSignals {
    /// Whether any portmanteau tool was detected.
    pub fn has_portmanteau(&self) -> bool {
        self.tool_count_portmanteau > 0
    }
}

/// Presence and count signals about repository layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StructureSignals {
    /// Whether a `src/` layout directory exists.
    pub has_source_layout: bool,
    /// Whether a tests directory exists.
    pub has_tests: bool,
    /// Whether a unit-test subdirectory exists.
    pub has_unit_tests: bool,
    /// Whether an integration-test subdirectory exists.
    pub has_integration_tests: bool,
    /// Number of test files under the tests directory.
    pub test_file_count: usize,
    /// Whether a CI workflow directory exists.
    pub has_ci: bool,
    /// Number of workflow files in the CI directory.
    pub ci_workflow_count: usize,
    /// Whether a lint configuration was found.
    pub has_lint_config: bool,
    /// Whether a packaging manifest exists.
    pub has_packaging_manifest: bool,
    /// Whether a deprecated packaging marker exists.
    pub has_deprecated_packaging_format: bool,
    /// Whether a README file exists.
    pub has_readme: bool,
    /// Whether a LICENSE file exists.
    pub has_license: bool,
    /// Whether VCS metadata exists.
    pub has_vcs: bool,
    /// Whether the VCS config declares a remote.
    pub has_vcs_remote: bool,
}

/// Code-quality signals from the candidate's source files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QualitySignals {
    /// Whether any source file imports a recognized logging facility.
    pub has_logging: bool,
    /// Print statements found outside test files.
    pub print_statement_count: usize,
    /// Bare or overly-broad except clauses, counted everywhere.
    pub bare_except_count: usize,
    /// Lazy error-message literals found outside test files.
    pub lazy_error_message_count: usize,
}

/// Compliance status label for a repository.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    /// Fully compliant, nothing flagged.
    Sota,
    /// Compliant with a small number of flagged criteria.
    Improvable,
    /// Compliant but with many flagged criteria.
    Critical,
    /// Non-compliant: at least one critical criterion failed.
    Runt,
}

/// Remediation priority, derived from the number of reasons.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// No flagged criteria.
    None,
    /// One flagged criterion.
    Low,
    /// Two flagged criteria.
    Medium,
    /// Three or more flagged criteria.
    High,
}

/// Cosmetic size bucket derived from the total tool count.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    /// Fewer than 2 tools.
    Tiny,
    /// 2 to 4 tools.
    Small,
    /// 5 to 9 tools.
    Medium,
    /// 10 to 19 tools.
    Large,
    /// 20 or more tools.
    Huge,
}

/// Full analysis record for one scanned repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoAnalysis {
    /// Repository name (directory name).
    pub name: String,
    /// Absolute path to the repository.
    pub path: PathBuf,
    /// Declared fastmcp version.
    pub framework_version: String,
    /// Tool and docstring signals.
    pub tools: ToolSignals,
    /// Layout and packaging signals.
    pub structure: StructureSignals,
    /// Code-quality signals.
    pub quality: QualitySignals,
    /// Whether a critical criterion failed.
    pub is_noncompliant: bool,
    /// Compliance status label.
    pub status: ComplianceStatus,
    /// One entry per flagged criterion, in evaluation order.
    pub reasons: Vec<String>,
    /// Suggested remediations, in evaluation order.
    pub recommendations: Vec<String>,
    /// Compliance score, 0-100.
    pub compliance_score: u8,
    /// Remediation priority.
    pub priority: Priority,
    /// Cosmetic size bucket.
    pub size_class: SizeClass,
}

/// Mutable progress state for one scan invocation.
///
/// Owned by the orchestrator behind a mutex; consumers only ever see cloned
/// snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanProgress {
    /// Candidates enumerated for this scan.
    pub total: usize,
    /// Candidates fully processed (analyzed, skipped, or errored).
    pub done: usize,
    /// Candidates that produced an analysis.
    pub found: usize,
    /// Candidates dropped for lacking a framework version.
    pub skipped: usize,
    /// Candidates that failed during extraction or aggregation.
    pub errors: usize,
    /// Name of the in-flight candidate, if any.
    pub current_item: Option<String>,
    /// Bounded activity log, oldest lines evicted first.
    pub activity_log: Vec<String>,
}

impl ScanProgress {
    /// Append a line to the activity log, evicting the oldest past capacity.
    pub fn log_activity(&mut self, line: impl Into<String>) {
        if self.activity_log.len() == ACTIVITY_LOG_CAPACITY {
            self.activity_log.remove(0);
        }
        self.activity_log.push(line.into());
    }
}

/// Aggregate statistics for a completed scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    /// Repositories analyzed.
    pub analyzed: usize,
    /// Repositories with no flagged criteria.
    pub sota: usize,
    /// Repositories with one or two flagged criteria.
    pub improvable: usize,
    /// Compliant repositories with three or more flagged criteria.
    pub critical: usize,
    /// Non-compliant repositories.
    pub runts: usize,
    /// Candidates skipped for lacking a framework version.
    pub skipped: usize,
    /// Candidates that failed during processing.
    pub errors: usize,
    /// Mean compliance score across analyzed repositories.
    pub average_score: f64,
}

/// Results and summary for one completed scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutcome {
    /// Analyses in deterministic order.
    pub results: Vec<RepoAnalysis>,
    /// Aggregate statistics.
    pub summary: SummaryStats,
}
