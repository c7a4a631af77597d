#![deny(missing_docs)]
//! Menagerie command-line interface.
//!
//! Batch compliance scans over a directory of MCP server repositories, and
//! on-demand inspection of a single repository.

use clap::{Args, Parser, Subcommand, ValueEnum};
use menagerie_core::{
    ProgressSink, RepoAnalysis, ScanOptions, ScanOutcome, ScanProgress, StdFileSystem, analyze_one,
    priority_label, render_analysis_markdown, render_json, render_scan_markdown, scan,
    size_class_label, status_label,
};
use std::fmt::Write;
use std::path::PathBuf;
use std::sync::Arc;

pub(crate) type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "menagerie", version, about = "MCP server compliance scanner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct OutputArgs {
    /// Output format for report data.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Write the report to a file instead of stdout.
    #[arg(long = "report-output")]
    report_output: Option<PathBuf>,
}

#[derive(ValueEnum, Copy, Clone, Debug, Eq, PartialEq)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a directory of candidate repositories.
    Scan {
        /// Root directory holding candidate repositories.
        #[arg(long)]
        root: PathBuf,
        /// Maximum number of concurrently analyzed candidates.
        #[arg(short = 'j', long, default_value_t = 4)]
        concurrency: usize,
        #[command(flatten)]
        report: OutputArgs,
        /// Log a progress line for every completed candidate.
        #[arg(long)]
        progress: bool,
    },
    /// Analyze a single repository.
    Inspect {
        /// Repository path to analyze.
        #[arg(long)]
        path: PathBuf,
        #[command(flatten)]
        report: OutputArgs,
    },
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> CliResult<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            root,
            concurrency,
            report,
            progress,
        } => run_scan(root, concurrency, report, progress).await?,
        Commands::Inspect { path, report } => run_inspect(path, report).await?,
    }

    Ok(())
}

#[cfg(test)]
fn main() {}

struct LogSink;

impl ProgressSink for LogSink {
    fn update(&self, snapshot: &ScanProgress) {
        log::info!(
            "{}/{} done ({} found, {} skipped, {} errors)",
            snapshot.done,
            snapshot.total,
            snapshot.found,
            snapshot.skipped,
            snapshot.errors
        );
    }
}

async fn run_scan(
    root: PathBuf,
    concurrency: usize,
    report: OutputArgs,
    progress: bool,
) -> CliResult<()> {
    let sink: Option<Arc<dyn ProgressSink>> = if progress {
        Some(Arc::new(LogSink))
    } else {
        None
    };
    let outcome = scan(
        Arc::new(StdFileSystem::new()),
        &root,
        ScanOptions {
            concurrency: concurrency.max(1),
        },
        sink,
        None,
    )
    .await?;

    let contents = match report.format {
        OutputFormat::Text => render_scan_text(&outcome),
        OutputFormat::Markdown => render_scan_markdown(&outcome),
        OutputFormat::Json => render_json(&outcome)?,
    };
    emit_output(&report, contents).await
}

async fn run_inspect(path: PathBuf, report: OutputArgs) -> CliResult<()> {
    let fs = StdFileSystem::new();
    let Some(analysis) = analyze_one(&fs, &path)? else {
        println!("Not a fastmcp repository: {}", path.display());
        return Ok(());
    };

    let contents = match report.format {
        OutputFormat::Text => render_analysis_text(&analysis),
        OutputFormat::Markdown => render_analysis_markdown(&analysis),
        OutputFormat::Json => render_json(&analysis)?,
    };
    emit_output(&report, contents).await
}

async fn emit_output(output: &OutputArgs, contents: String) -> CliResult<()> {
    if let Some(path) = &output.report_output {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, contents).await?;
    } else {
        print!("{contents}");
    }
    Ok(())
}

fn render_scan_text(outcome: &ScanOutcome) -> String {
    let mut output = String::new();
    for analysis in &outcome.results {
        output.push_str(&render_analysis_text(analysis));
        let _ = writeln!(output);
    }
    let summary = &outcome.summary;
    let _ = writeln!(
        output,
        "Analyzed: {} (SOTA {}, improvable {}, critical {}, runts {})",
        summary.analyzed, summary.sota, summary.improvable, summary.critical, summary.runts
    );
    let _ = writeln!(output, "Skipped: {}", summary.skipped);
    let _ = writeln!(output, "Errors: {}", summary.errors);
    let _ = writeln!(output, "Average score: {:.2}", summary.average_score);
    output
}

fn render_analysis_text(analysis: &RepoAnalysis) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Repository: {}", analysis.name);
    let _ = writeln!(output, "Path: {}", analysis.path.display());
    let _ = writeln!(output, "fastmcp: {}", analysis.framework_version);
    let _ = writeln!(
        output,
        "Status: {} (score {}/100, priority {})",
        status_label(analysis.status),
        analysis.compliance_score,
        priority_label(analysis.priority)
    );
    let _ = writeln!(
        output,
        "Tools: {} total, size class {}",
        analysis.tools.tool_count_total,
        size_class_label(analysis.size_class)
    );

    if analysis.reasons.is_empty() {
        let _ = writeln!(output, "Reasons: none");
    } else {
        let _ = writeln!(output, "Reasons:");
        for reason in &analysis.reasons {
            let _ = writeln!(output, "- {reason}");
        }
    }

    if analysis.recommendations.is_empty() {
        let _ = writeln!(output, "Recommendations: none");
    } else {
        let _ = writeln!(output, "Recommendations:");
        for recommendation in &analysis.recommendations {
            let _ = writeln!(output, "- {recommendation}");
        }
    }

    output
}
