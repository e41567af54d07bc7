//! Plain-text summary of a report for the terminal.

use super::schema::Report;

/// Render the busiest lines of the report window, highest load first
///
/// **Public** - printed by `analyze --summary`
///
/// # Arguments
/// * `report` - report to summarize
/// * `max_rows` - number of lines to list
pub fn generate_text_summary(report: &Report, max_rows: usize) -> String {
    let mut rows: Vec<_> = report.lines().collect();
    rows.sort_by(|a, b| b.2.stats.load.total_cmp(&a.2.stats.load));

    let mut out = Vec::new();
    out.push(format!(
        "  WINDOW [{:.6}, {:.6})  length {:.6}  trace end {:.6}",
        report.window.start, report.window.end, report.window.length, report.end_time
    ));
    out.push(String::new());
    out.push("  BUSIEST LINES".to_string());
    out.push(
        "  ┏━━━━━━━━━━━━━━┳━━━━━━━━━━━━┳━━━━━━━━━━━━━━━━━━━━━━━━━━┳━━━━━━━━━━━━━━┳━━━━━━━━━━┳━━━━━━━━━┓"
            .to_string(),
    );
    out.push(format!(
        "  ┃ {:<12} ┃ {:<10} ┃ {:<24} ┃ {:^12} ┃ {:^8} ┃ {:^7} ┃",
        "Owner", "Kind", "Line", "Total", "Count", "Load"
    ));
    out.push(
        "  ┣━━━━━━━━━━━━━━╋━━━━━━━━━━━━╋━━━━━━━━━━━━━━━━━━━━━━━━━━╋━━━━━━━━━━━━━━╋━━━━━━━━━━╋━━━━━━━━━┫"
            .to_string(),
    );

    for (owner, kind, line) in rows.iter().take(max_rows) {
        out.push(format!(
            "  ┃ {:<12} ┃ {:<10} ┃ {:<24} ┃ {:>12.6} ┃ {:>8} ┃ {:>6.1}% ┃",
            truncate(owner, 12),
            kind.label(),
            truncate(&line.name, 24),
            line.stats.total_time,
            line.stats.count,
            line.stats.load * 100.0
        ));
    }

    out.push(
        "  ┗━━━━━━━━━━━━━━┻━━━━━━━━━━━━┻━━━━━━━━━━━━━━━━━━━━━━━━━━┻━━━━━━━━━━━━━━┻━━━━━━━━━━┻━━━━━━━━━┛"
            .to_string(),
    );

    if rows.len() > max_rows {
        out.push(String::new());
        out.push(format!("   (Showing top {} of {} lines)", max_rows, rows.len()));
    }

    out.join("\n")
}

// Keep the last characters, where ids usually differ
fn truncate(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count <= width {
        return text.to_string();
    }
    let tail: String = text.chars().skip(count - (width - 3)).collect();
    format!("...{}", tail)
}
