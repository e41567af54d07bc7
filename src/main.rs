//! RTOS Trace Studio CLI
//!
//! Reconstructs task, interrupt and counter timelines from RTOS execution
//! traces and reports windowed load statistics.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use rtos_trace_studio::commands::{
    display_schema, display_version, execute_analyze, list_lines, validate_args,
    validate_report_file, AnalyzeArgs,
};
use rtos_trace_studio::utils::config::DEFAULT_SUMMARY_ROWS;

/// RTOS Trace Studio - execution trace analysis for embedded runtimes
#[derive(Parser, Debug)]
#[command(name = "rtos-trace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a trace and compute window statistics
    Analyze {
        /// Trace file to analyze
        #[arg(short, long, env = "RTOS_TRACE_FILE")]
        file: PathBuf,

        /// Window start (seconds after the first sample)
        #[arg(long)]
        start: Option<f64>,

        /// Window end (seconds after the first sample, default: end of trace)
        #[arg(long)]
        end: Option<f64>,

        /// Output path for JSON report
        #[arg(short, long, default_value = "report.json")]
        output: PathBuf,

        /// Do not write a JSON report
        #[arg(long)]
        no_output: bool,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,

        /// Number of lines in the text summary
        #[arg(long, default_value_t = DEFAULT_SUMMARY_ROWS)]
        top: usize,

        /// Ignore unexpected trailing tokens instead of failing
        #[arg(long)]
        lenient: bool,
    },

    /// List every line of a trace
    Lines {
        /// Trace file to inspect
        #[arg(short, long, env = "RTOS_TRACE_FILE")]
        file: PathBuf,

        /// Ignore unexpected trailing tokens instead of failing
        #[arg(long)]
        lenient: bool,
    },

    /// Validate a report JSON file
    Validate {
        /// Path to report JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Analyze {
            file,
            start,
            end,
            output,
            no_output,
            summary,
            top,
            lenient,
        } => {
            let args = AnalyzeArgs {
                trace_path: file,
                window_start: start,
                window_end: end,
                output_json: (!no_output).then_some(output),
                print_summary: summary,
                top_lines: top,
                strict: !lenient,
            };

            // Validate arguments
            validate_args(&args)?;

            execute_analyze(args)?;
        }

        Commands::Lines { file, lenient } => {
            list_lines(file, !lenient)?;
        }

        Commands::Validate { file } => {
            validate_report_file(file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
