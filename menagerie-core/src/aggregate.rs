//! Aggregation of extractor signals into a compliance classification.
//!
//! Criteria are evaluated into an ordered list of outcome records which is
//! folded once into the final analysis, so identical signals always produce
//! identical reasons, recommendations and score.

use crate::domain::{
    CandidateDir, ComplianceStatus, Priority, QualitySignals, RepoAnalysis, SizeClass,
    StructureSignals, ToolSignals,
};

/// Minimum fastmcp version considered current.
pub const BASELINE_FRAMEWORK_VERSION: &str = "2.0.0";

/// Individual-tool count at which a consolidated dispatcher is expected.
pub const PORTMANTEAU_HINT_THRESHOLD: usize = 10;

const PENALTY_OUTDATED_VERSION: u32 = 15;
const PENALTY_PORTMANTEAU_RATIO: u32 = 5;
const PENALTY_MISSING_CI: u32 = 15;
const PENALTY_EXCESS_CI: u32 = 2;
const PENALTY_MISSING_PACKAGING: u32 = 15;
const PENALTY_DEPRECATED_PACKAGING: u32 = 3;
const PENALTY_MISSING_HELP: u32 = 10;
const PENALTY_MISSING_STATUS: u32 = 10;
const PENALTY_POOR_DOCSTRINGS: u32 = 10;
const PENALTY_MISSING_LINT: u32 = 5;
const PENALTY_MISSING_TESTS: u32 = 15;
const PENALTY_MISSING_LOGGING: u32 = 10;
const PENALTY_PRINT_STATEMENTS: u32 = 5;
const PENALTY_BARE_EXCEPTS: u32 = 5;
const PENALTY_LAZY_ERRORS: u32 = 5;

/// One evaluated criterion: a failure with reason and penalty, or advice
/// carrying only a recommendation.
#[derive(Debug, Clone)]
struct CriterionOutcome {
    critical: bool,
    penalty: u32,
    reason: Option<String>,
    recommendation: Option<String>,
}

impl CriterionOutcome {
    fn failed(
        critical: bool,
        penalty: u32,
        reason: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            critical,
            penalty,
            reason: Some(reason.into()),
            recommendation: Some(recommendation.into()),
        }
    }

    fn advice(recommendation: impl Into<String>) -> Self {
        Self {
            critical: false,
            penalty: 0,
            reason: None,
            recommendation: Some(recommendation.into()),
        }
    }
}

/// Fold extractor signals into one immutable analysis record.
pub fn aggregate(
    candidate: &CandidateDir,
    tools: ToolSignals,
    structure: StructureSignals,
    quality: QualitySignals,
) -> RepoAnalysis {
    let outcomes = evaluate_criteria(&candidate.framework_version, &tools, &structure, &quality);

    let mut reasons = Vec::new();
    let mut recommendations = Vec::new();
    let mut penalty_total: u32 = 0;
    let mut is_noncompliant = false;

    for outcome in outcomes {
        if let Some(reason) = outcome.reason {
            reasons.push(reason);
            penalty_total += outcome.penalty;
            if outcome.critical {
                is_noncompliant = true;
            }
        }
        if let Some(recommendation) = outcome.recommendation {
            recommendations.push(recommendation);
        }
    }

    let compliance_score = (100i64 - i64::from(penalty_total)).clamp(0, 100) as u8;
    let status = status_for(is_noncompliant, reasons.len());
    let priority = priority_for(reasons.len());
    let size_class = size_class_for(tools.tool_count_total);

    RepoAnalysis {
        name: candidate.name.clone(),
        path: candidate.path.clone(),
        framework_version: candidate.framework_version.clone(),
        tools,
        structure,
        quality,
        is_noncompliant,
        status,
        reasons,
        recommendations,
        compliance_score,
        priority,
        size_class,
    }
}

fn evaluate_criteria(
    version: &str,
    tools: &ToolSignals,
    structure: &StructureSignals,
    quality: &QualitySignals,
) -> Vec<CriterionOutcome> {
    let mut outcomes = Vec::new();

    if !version_at_least(version, BASELINE_FRAMEWORK_VERSION) {
        outcomes.push(CriterionOutcome::failed(
            true,
            PENALTY_OUTDATED_VERSION,
            format!("fastmcp {version} is below the supported baseline {BASELINE_FRAMEWORK_VERSION}"),
            format!("Upgrade fastmcp to {BASELINE_FRAMEWORK_VERSION} or newer."),
        ));
    }

    // Ratio and docstring criteria are undefined at zero tools.
    if tools.tool_count_total > 0
        && tools.tool_count_individual >= PORTMANTEAU_HINT_THRESHOLD
        && !tools.has_portmanteau()
    {
        outcomes.push(CriterionOutcome::failed(
            false,
            PENALTY_PORTMANTEAU_RATIO,
            format!(
                "{} individual tools with no consolidated dispatcher",
                tools.tool_count_individual
            ),
            "Consolidate related tools behind a single dispatching tool.",
        ));
    }

    if !structure.has_ci {
        outcomes.push(CriterionOutcome::failed(
            true,
            PENALTY_MISSING_CI,
            "no CI workflow directory",
            "Add a GitHub Actions workflow under .github/workflows.",
        ));
    } else if structure.ci_workflow_count > 1 {
        outcomes.push(CriterionOutcome::failed(
            false,
            PENALTY_EXCESS_CI,
            format!(
                "{} CI workflows where one is expected",
                structure.ci_workflow_count
            ),
            "Consolidate CI workflows into a single pipeline.",
        ));
    }

    if !structure.has_packaging_manifest {
        outcomes.push(CriterionOutcome::failed(
            true,
            PENALTY_MISSING_PACKAGING,
            "no packaging manifest",
            "Add a pyproject.toml with project metadata.",
        ));
    }
    if structure.has_deprecated_packaging_format {
        outcomes.push(CriterionOutcome::failed(
            false,
            PENALTY_DEPRECATED_PACKAGING,
            "deprecated setup.py packaging present",
            "Migrate packaging metadata to pyproject.toml.",
        ));
    }

    if !tools.has_help_tool {
        outcomes.push(CriterionOutcome::failed(
            true,
            PENALTY_MISSING_HELP,
            "no help tool",
            "Expose a help tool describing available operations.",
        ));
    }
    if !tools.has_status_tool {
        outcomes.push(CriterionOutcome::failed(
            true,
            PENALTY_MISSING_STATUS,
            "no status tool",
            "Expose a status tool reporting server health.",
        ));
    }

    if tools.tool_count_total > 0 && !tools.has_proper_docstrings {
        outcomes.push(CriterionOutcome::failed(
            false,
            PENALTY_POOR_DOCSTRINGS,
            "fewer than half of the tools are documented",
            "Add Args/Returns sections to tool docstrings.",
        ));
    }

    if !structure.has_lint_config {
        outcomes.push(CriterionOutcome::failed(
            false,
            PENALTY_MISSING_LINT,
            "no lint configuration",
            "Adopt ruff and commit its configuration.",
        ));
    }

    if !structure.has_tests {
        outcomes.push(CriterionOutcome::failed(
            true,
            PENALTY_MISSING_TESTS,
            "no tests directory",
            "Add a tests directory with coverage for every tool.",
        ));
    } else {
        if !structure.has_unit_tests {
            outcomes.push(CriterionOutcome::advice(
                "Split unit tests into tests/unit.",
            ));
        }
        if !structure.has_integration_tests {
            outcomes.push(CriterionOutcome::advice(
                "Add integration tests under tests/integration.",
            ));
        }
    }

    if !quality.has_logging {
        outcomes.push(CriterionOutcome::failed(
            false,
            PENALTY_MISSING_LOGGING,
            "no logging configured",
            "Log through the standard logging module.",
        ));
    }

    if quality.print_statement_count > 0 {
        outcomes.push(CriterionOutcome::failed(
            false,
            PENALTY_PRINT_STATEMENTS,
            format!(
                "{} print statements in non-test code",
                quality.print_statement_count
            ),
            "Replace print statements with logger calls.",
        ));
    }

    if quality.bare_except_count > 0 {
        outcomes.push(CriterionOutcome::failed(
            false,
            PENALTY_BARE_EXCEPTS,
            format!("{} bare except clauses", quality.bare_except_count),
            "Catch specific exception types.",
        ));
    }

    if quality.lazy_error_message_count > 0 {
        outcomes.push(CriterionOutcome::failed(
            false,
            PENALTY_LAZY_ERRORS,
            format!("{} lazy error messages", quality.lazy_error_message_count),
            "Write actionable error messages with context.",
        ));
    }

    if !structure.has_readme {
        outcomes.push(CriterionOutcome::advice("Add a README."));
    }
    if !structure.has_license {
        outcomes.push(CriterionOutcome::advice("Add a LICENSE."));
    }
    if !structure.has_vcs {
        outcomes.push(CriterionOutcome::advice("Track the repository in git."));
    } else if !structure.has_vcs_remote {
        outcomes.push(CriterionOutcome::advice(
            "Push the repository to a configured remote.",
        ));
    }

    outcomes
}

/// Status label from the noncompliance flag and reason count.
fn status_for(is_noncompliant: bool, reason_count: usize) -> ComplianceStatus {
    if is_noncompliant {
        ComplianceStatus::Runt
    } else if reason_count == 0 {
        ComplianceStatus::Sota
    } else if reason_count <= 2 {
        ComplianceStatus::Improvable
    } else {
        ComplianceStatus::Critical
    }
}

/// Remediation priority from the reason count.
pub fn priority_for(reason_count: usize) -> Priority {
    match reason_count {
        0 => Priority::None,
        1 => Priority::Low,
        2 => Priority::Medium,
        _ => Priority::High,
    }
}

/// Size bucket from the total tool count, inclusive-lower/exclusive-upper.
pub fn size_class_for(tool_count_total: usize) -> SizeClass {
    match tool_count_total {
        0..=1 => SizeClass::Tiny,
        2..=4 => SizeClass::Small,
        5..=9 => SizeClass::Medium,
        10..=19 => SizeClass::Large,
        _ => SizeClass::Huge,
    }
}

/// Compare dotted version strings numerically, missing components as zero.
fn version_at_least(version: &str, baseline: &str) -> bool {
    let lhs = version_components(version);
    let rhs = version_components(baseline);
    let len = lhs.len().max(rhs.len());
    for index in 0..len {
        let a = lhs.get(index).copied().unwrap_or(0);
        let b = rhs.get(index).copied().unwrap_or(0);
        if a != b {
            return a > b;
        }
    }
    true
}

fn version_components(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|component| {
            let digits: String = component.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().unwrap_or(0)
        })
        .collect()
}
