use crate::model::TraceModel;
use crate::output::read_report;
use crate::parser::{parse_file, ParseOptions};
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Print the line inventory of a trace
pub fn list_lines(file_path: PathBuf, strict: bool) -> Result<()> {
    let options = ParseOptions::new().with_strict(strict);
    let model = parse_file(&file_path, &options)
        .with_context(|| format!("Failed to parse trace {}", file_path.display()))?;

    println!("Trace: {}", file_path.display());
    println!("End time: {}", model.end_time());
    println!();
    println!("{}", line_inventory(&model));

    Ok(())
}

/// One row per line: owner, kind, id, name, samples, validity, maxima
pub fn line_inventory(model: &TraceModel) -> String {
    let mut rows = vec![format!(
        "{:<12} {:<10} {:>8}  {:<24} {:>8}  {:<24} {:>12} {:>12}",
        "OWNER", "KIND", "ID", "NAME", "SAMPLES", "VALID", "MAX VALUE", "MAX DURATION"
    )];

    for (line_ref, line) in model.lines() {
        let owner = model
            .owner(line.owner())
            .map_or_else(|| line.owner().to_string(), |o| o.name.clone());
        let valid = format!("[{}, {})", line.time_create(), line.time_delete());
        rows.push(format!(
            "{:<12} {:<10} {:>8}  {:<24} {:>8}  {:<24} {:>12.6} {:>12.6}",
            owner,
            line_ref.kind.label(),
            line.id(),
            line.name(),
            line.count(),
            valid,
            line.max_sample_value(),
            line.max_sample_duration()
        ));
    }

    rows.push(format!("{} lines", model.line_count()));
    rows.join("\n")
}

/// Validate a report JSON file
pub fn validate_report_file(file_path: PathBuf) -> Result<()> {
    println!("Validating report: {}", file_path.display());

    let report = read_report(&file_path)?;

    if report.version != SCHEMA_VERSION {
        println!(
            "⚠ Report schema v{} differs from current v{}",
            report.version, SCHEMA_VERSION
        );
    }

    println!("✓ Valid report JSON");
    println!("  Version: {}", report.version);
    println!("  Source: {}", report.source);
    println!("  Window: [{}, {})", report.window.start, report.window.end);
    println!("  Owners: {}", report.owners.len());
    println!("  Lines: {}", report.line_count());
    println!("  Load: {:.1}%", report.totals.load * 100.0);

    Ok(())
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("RTOS Trace Studio Report Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  version: string           - Schema version (e.g., '1.0.0')");
        println!("  source: string            - Trace the report was computed from");
        println!("  end_time: number          - Last sample time (s, origin at first sample)");
        println!("  window: object            - start, end, length of the queried window");
        println!("  totals: statistics        - Whole-trace statistics");
        println!("  owners: array             - One entry per CPU");
        println!("    id, name: number/string");
        println!("    clocks_per_sec: number  - SPEED of the owner");
        println!("    mem_clocks_per_sec: number");
        println!("    stats: statistics");
        println!("    sections: array         - One entry per entity kind in use");
        println!("      kind: string          - task, isr, semaphore, agent, cycles, ...");
        println!("      stats: statistics");
        println!("      lines: array");
        println!("        id, name, sample_count");
        println!("        created, deleted: number?  - Validity window (null = unbounded)");
        println!("        max_sample_value, max_sample_duration: number");
        println!("        stats: statistics");
        println!("  generated_at: string      - RFC 3339 timestamp");
        println!();
        println!("statistics:");
        println!("  total_time, trace_time, load, count, min, avg, max");
        println!("  min_period, max_period    - ISR lines only");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("RTOS Trace Studio v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Timeline reconstruction and windowed statistics for RTOS execution traces.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;

    #[test]
    fn test_line_inventory_lists_every_line() {
        let model = parse_str(
            "CPU 0 main\nNAM 0 5 idle\nSTA 0 5 0\nSTO 0 5 10\nOCC 4 1 3\n",
            &ParseOptions::default(),
        )
        .unwrap();
        let inventory = line_inventory(&model);

        assert!(inventory.contains("idle"));
        assert!(inventory.contains("EVENT"));
        assert!(inventory.ends_with("2 lines"));
    }
}
