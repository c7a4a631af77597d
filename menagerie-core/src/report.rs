//! Report rendering for scan results.
//!
//! Pure transforms with no I/O; the caller decides where the output goes.

use std::fmt::Write;

use serde::Serialize;

use crate::domain::{ComplianceStatus, Priority, RepoAnalysis, ScanOutcome, SizeClass};

/// Render a full scan outcome as Markdown, one section per repository plus
/// an aggregate statistics footer.
pub fn render_scan_markdown(outcome: &ScanOutcome) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# MCP Server Compliance Report\n");
    for analysis in &outcome.results {
        append_analysis(&mut output, analysis);
    }
    append_summary(&mut output, outcome);
    output
}

/// Render a single repository analysis as Markdown.
pub fn render_analysis_markdown(analysis: &RepoAnalysis) -> String {
    let mut output = String::new();
    append_analysis(&mut output, analysis);
    output
}

/// Render any serializable report payload as JSON.
pub fn render_json<T: Serialize + ?Sized>(payload: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(payload)
}

/// Human-readable label for a compliance status.
pub fn status_label(status: ComplianceStatus) -> &'static str {
    match status {
        ComplianceStatus::Sota => "SOTA",
        ComplianceStatus::Improvable => "improvable",
        ComplianceStatus::Critical => "critical",
        ComplianceStatus::Runt => "runt",
    }
}

/// Human-readable label for a priority.
pub fn priority_label(priority: Priority) -> &'static str {
    match priority {
        Priority::None => "none",
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
    }
}

/// Human-readable label for a size class.
pub fn size_class_label(size_class: SizeClass) -> &'static str {
    match size_class {
        SizeClass::Tiny => "tiny",
        SizeClass::Small => "small",
        SizeClass::Medium => "medium",
        SizeClass::Large => "large",
        SizeClass::Huge => "huge",
    }
}

fn append_analysis(output: &mut String, analysis: &RepoAnalysis) {
    let _ = writeln!(output, "## {}\n", analysis.name);
    let _ = writeln!(output, "- Path: `{}`", analysis.path.display());
    let _ = writeln!(output, "- fastmcp: {}", analysis.framework_version);
    let _ = writeln!(output, "- Status: {}", status_label(analysis.status));
    let _ = writeln!(output, "- Score: {}/100", analysis.compliance_score);
    let _ = writeln!(output, "- Priority: {}", priority_label(analysis.priority));
    let _ = writeln!(
        output,
        "- Size class: {}",
        size_class_label(analysis.size_class)
    );
    let _ = writeln!(
        output,
        "- Tools: {} total ({} individual, {} portmanteau, {} operations)",
        analysis.tools.tool_count_total,
        analysis.tools.tool_count_individual,
        analysis.tools.tool_count_portmanteau,
        analysis.tools.portmanteau_operation_count
    );
    let _ = writeln!(output);
    append_list(output, "Reasons", &analysis.reasons, "No criteria flagged.");
    append_list(
        output,
        "Recommendations",
        &analysis.recommendations,
        "Nothing to recommend.",
    );
}

fn append_summary(output: &mut String, outcome: &ScanOutcome) {
    let summary = &outcome.summary;
    let _ = writeln!(output, "## Summary\n");
    let _ = writeln!(
        output,
        "- Analyzed: {} (SOTA {}, improvable {}, critical {}, runts {})",
        summary.analyzed, summary.sota, summary.improvable, summary.critical, summary.runts
    );
    let _ = writeln!(output, "- Skipped: {}", summary.skipped);
    let _ = writeln!(output, "- Errors: {}", summary.errors);
    let _ = writeln!(output, "- Average score: {:.2}", summary.average_score);
}

fn append_list(output: &mut String, title: &str, items: &[String], empty_message: &str) {
    if items.is_empty() {
        let _ = writeln!(output, "### {title}\n{empty_message}\n");
        return;
    }
    let _ = writeln!(output, "### {title}");
    for item in items {
        let _ = writeln!(output, "- {item}");
    }
    let _ = writeln!(output);
}

#[cfg(test)]
mod tests {
    use super::{render_analysis_markdown, render_json, render_scan_markdown};
    use crate::domain::{
        CandidateDir, ComplianceStatus, QualitySignals, ScanOutcome, StructureSignals, ToolSignals,
    };
    use crate::{aggregate, summarize};
    use std::path::PathBuf;

    fn sample_analysis() -> crate::domain::RepoAnalysis {
        let candidate = CandidateDir {
            name: "demo".to_string(),
            path: PathBuf::from("/zoo/demo"),
            framework_version: "2.1.0".to_string(),
        };
        aggregate(
            &candidate,
            ToolSignals::default(),
            StructureSignals::default(),
            QualitySignals::default(),
        )
    }

    fn sample_outcome() -> ScanOutcome {
        let results = vec![sample_analysis()];
        let summary = summarize(&results, 2, 1);
        ScanOutcome { results, summary }
    }

    #[test]
    fn renders_markdown_sections_and_footer() {
        let output = render_scan_markdown(&sample_outcome());

        assert!(output.contains("# MCP Server Compliance Report"));
        assert!(output.contains("## demo"));
        assert!(output.contains("- fastmcp: 2.1.0"));
        assert!(output.contains("- Status: runt"));
        assert!(output.contains("### Reasons"));
        assert!(output.contains("no CI workflow directory"));
        assert!(output.contains("## Summary"));
        assert!(output.contains("- Skipped: 2"));
        assert!(output.contains("- Errors: 1"));
    }

    #[test]
    fn renders_single_analysis_without_footer() {
        let output = render_analysis_markdown(&sample_analysis());

        assert!(output.contains("## demo"));
        assert!(!output.contains("## Summary"));
    }

    #[test]
    fn renders_json_payload() {
        let outcome = sample_outcome();
        let json = render_json(&outcome).expect("json");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("parse");

        assert_eq!(parsed["results"][0]["name"], "demo");
        assert_eq!(parsed["results"][0]["status"], "runt");
        assert_eq!(parsed["summary"]["skipped"], 2);
    }

    #[test]
    fn status_of_sample_is_runt() {
        assert_eq!(sample_analysis().status, ComplianceStatus::Runt);
    }
}
