//! Analyze command implementation.
//!
//! The analyze command:
//! 1. Parses and finalizes the trace
//! 2. Builds the statistics tree
//! 3. Computes the requested window
//! 4. Writes the report and optional summary

use crate::aggregator::StatisticsTree;
use crate::output::{build_report, generate_text_summary, write_report, Report};
use crate::parser::{parse_file, ParseOptions};
use crate::utils::config::DEFAULT_SUMMARY_ROWS;
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::PathBuf;
use std::time::Instant;

/// Arguments for the analyze command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    /// Trace file to ingest
    pub trace_path: PathBuf,

    /// Window start in seconds after the first sample (default 0)
    pub window_start: Option<f64>,

    /// Window end in seconds after the first sample (default: end of trace)
    pub window_end: Option<f64>,

    /// Output path for the JSON report (None = no file)
    pub output_json: Option<PathBuf>,

    /// Print text summary to stdout
    pub print_summary: bool,

    /// Number of lines shown in the summary
    pub top_lines: usize,

    /// Reject trailing tokens on trace lines
    pub strict: bool,
}

impl Default for AnalyzeArgs {
    fn default() -> Self {
        Self {
            trace_path: PathBuf::new(),
            window_start: None,
            window_end: None,
            output_json: Some(PathBuf::from("report.json")),
            print_summary: false,
            top_lines: DEFAULT_SUMMARY_ROWS,
            strict: true,
        }
    }
}

/// Execute the analyze command
///
/// **Public** - main entry point called from main.rs
///
/// # Returns
/// The report that was written (or would have been, without an output path)
///
/// # Errors
/// * Trace open/parse errors
/// * Empty or invalid statistics window
/// * File write errors
pub fn execute_analyze(args: AnalyzeArgs) -> Result<Report> {
    let start_time = Instant::now();

    info!("Analyzing trace: {}", args.trace_path.display());

    // Step 1: Parse trace
    info!("Step 1/4: Parsing trace...");
    let options = ParseOptions::new().with_strict(args.strict);
    let model = parse_file(&args.trace_path, &options)
        .with_context(|| format!("Failed to parse trace {}", args.trace_path.display()))?;

    debug!(
        "Parsed trace: {} lines on {} owners, end time {}",
        model.line_count(),
        model.owners().len(),
        model.end_time()
    );

    // Step 2: Build statistics tree
    info!("Step 2/4: Building statistics tree...");
    let mut tree = StatisticsTree::build(&model);

    // Step 3: Compute window
    let window_start = args.window_start.unwrap_or(0.0);
    let window_end = args.window_end.unwrap_or_else(|| model.end_time());
    info!("Step 3/4: Computing window [{}, {})...", window_start, window_end);
    tree.compute(&model, window_start, window_end)
        .context("Failed to compute window statistics")?;

    // Step 4: Write outputs
    info!("Step 4/4: Writing outputs...");
    let source = args.trace_path.display().to_string();
    let report = build_report(&model, &tree, &source);

    if let Some(path) = &args.output_json {
        write_report(&report, path).context("Failed to write report JSON")?;
        info!("✓ Report written to: {}", path.display());
    }

    if args.print_summary {
        println!("\n{}", "=".repeat(80));
        println!("TRACE SUMMARY");
        println!("{}", "=".repeat(80));
        println!("Trace:    {}", source);
        println!("Owners:   {}", report.owners.len());
        println!("Lines:    {}", model.line_count());
        println!("Load:     {:.1}%", report.totals.load * 100.0);
        println!("\n{}", generate_text_summary(&report, args.top_lines));
        println!("{}", "=".repeat(80));
    }

    let elapsed = start_time.elapsed();
    info!("Analysis completed in {:.2}s", elapsed.as_secs_f64());

    Ok(report)
}

/// Validate analyze arguments
///
/// **Public** - can be called before execute_analyze for early validation
pub fn validate_args(args: &AnalyzeArgs) -> Result<()> {
    if args.trace_path.as_os_str().is_empty() {
        anyhow::bail!("Trace path cannot be empty");
    }

    if !args.trace_path.exists() {
        anyhow::bail!("Trace file not found: {}", args.trace_path.display());
    }

    for bound in [args.window_start, args.window_end].into_iter().flatten() {
        if !bound.is_finite() {
            anyhow::bail!("Window bounds must be finite numbers");
        }
    }

    if let (Some(start), Some(end)) = (args.window_start, args.window_end) {
        if end <= start {
            anyhow::bail!("Window end ({}) must be greater than start ({})", end, start);
        }
    }

    if args.top_lines == 0 {
        anyhow::bail!("top must be greater than 0");
    }

    if args.top_lines > 1000 {
        anyhow::bail!("top is too large (max 1000)");
    }

    Ok(())
}
