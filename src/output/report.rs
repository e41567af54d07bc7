//! Assemble a [`Report`] from a model and its computed statistics tree.

use super::schema::{LineReport, OwnerReport, Report, SectionReport, StatisticReport, WindowReport};
use crate::aggregator::{Statistic, StatisticsTree};
use crate::model::TraceModel;
use crate::utils::config::SCHEMA_VERSION;
use log::debug;

/// Build the report of the tree's latest window
///
/// **Public** - main entry point for report assembly
///
/// # Arguments
/// * `model` - finalized model the tree was built from
/// * `tree` - statistics tree after `compute`; an uncomputed tree yields
///   zeroed statistics over `[0, end_time]`
/// * `source` - name of the trace, stored as-is
pub fn build_report(model: &TraceModel, tree: &StatisticsTree, source: &str) -> Report {
    let (start, end) = tree.window().unwrap_or((0.0, model.end_time()));
    let owner_nodes = tree.root().children();

    let mut owners: Vec<OwnerReport> = model
        .owners()
        .iter()
        .enumerate()
        .map(|(index, owner)| OwnerReport {
            id: owner.id,
            name: owner.name.clone(),
            clocks_per_sec: owner.clocks_per_sec,
            mem_clocks_per_sec: owner.mem_clocks_per_sec,
            stats: owner_nodes
                .get(index)
                .map(|node| statistic_report(node.as_ref()))
                .unwrap_or_default(),
            sections: Vec::new(),
        })
        .collect();

    for &(line_ref, path) in tree.bindings() {
        let Some(owner) = owners.get_mut(path.owner) else {
            continue;
        };
        if path.section >= owner.sections.len() {
            let stats = owner_nodes
                .get(path.owner)
                .and_then(|node| node.children().get(path.section))
                .map(|node| statistic_report(node.as_ref()))
                .unwrap_or_default();
            owner.sections.push(SectionReport {
                kind: line_ref.kind,
                stats,
                lines: Vec::new(),
            });
        }

        let line = model.line(line_ref);
        let report = LineReport {
            id: line.id(),
            name: line.name().to_string(),
            sample_count: line.count(),
            created: finite(line.time_create()),
            deleted: finite(line.time_delete()),
            max_sample_value: line.max_sample_value(),
            max_sample_duration: line.max_sample_duration(),
            stats: tree.node(path).map(statistic_report).unwrap_or_default(),
        };
        if let Some(section) = owner.sections.get_mut(path.section) {
            section.lines.push(report);
        }
    }

    debug!("Report: {} owners, {} line entries", owners.len(), tree.bindings().len());

    Report {
        version: SCHEMA_VERSION.to_string(),
        source: source.to_string(),
        end_time: model.end_time(),
        window: WindowReport {
            start,
            end,
            length: tree.root().window_length(),
        },
        totals: statistic_report(tree.root()),
        owners,
        generated_at: chrono::Utc::now().to_rfc3339(),
    }
}

/// Read-out of one statistics node
///
/// Non-finite read-outs are reported as 0 so the report stays valid JSON.
pub fn statistic_report(statistic: &dyn Statistic) -> StatisticReport {
    let periods = statistic.periods();
    StatisticReport {
        total_time: finite_or_zero(statistic.total_time()),
        trace_time: finite_or_zero(statistic.trace_time()),
        load: finite_or_zero(statistic.load()),
        count: statistic.count(),
        min: finite_or_zero(statistic.min()),
        avg: finite_or_zero(statistic.avg()),
        max: finite_or_zero(statistic.max()),
        min_period: periods.map(|(min, _)| finite_or_zero(min)),
        max_period: periods.map(|(_, max)| finite_or_zero(max)),
    }
}

fn finite(time: f64) -> Option<f64> {
    time.is_finite().then_some(time)
}

fn finite_or_zero(value: f64) -> f64 {
    finite(value).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::CounterStatistic;
    use crate::model::LineKind;
    use crate::parser::{parse_str, ParseOptions};

    #[test]
    fn test_report_mirrors_tree() {
        let model = parse_str(
            "CPU 0 main\nSTA 0 5 0\nSTO 0 5 100\nSTA 1 2 40\nSTO 1 2 50\nEND\n",
            &ParseOptions::default(),
        )
        .unwrap();
        let mut tree = StatisticsTree::build(&model);
        tree.compute(&model, 0.0, 100.0).unwrap();

        let report = build_report(&model, &tree, "demo.trace");

        assert_eq!(report.version, SCHEMA_VERSION);
        assert_eq!(report.owners.len(), 1);
        let sections = &report.owners[0].sections;
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].kind, LineKind::Task);
        assert_eq!(sections[1].kind, LineKind::Isr);
        assert_eq!(sections[1].lines[0].stats.total_time, 10.0);
        assert!(sections[1].lines[0].stats.min_period.is_some());
        assert!(sections[0].lines[0].stats.min_period.is_none());
        assert_eq!(sections[0].lines[0].created, None);
        assert_eq!(report.line_count(), 2);
    }

    #[test]
    fn test_non_finite_readouts_become_zero() {
        let mut stat = CounterStatistic::new("VALUE 1", 1.0);
        stat.init(0.0, 0.0, 10.0);
        stat.update_counter(0.0, 10.0, f64::INFINITY);
        stat.consolidate();
        assert!(stat.total_time().is_infinite());

        let report = statistic_report(&stat);
        assert_eq!(report.total_time, 0.0);
        assert_eq!(report.load, 0.0);
        assert_eq!(report.max, 0.0);
        assert_eq!(report.count, 1);

        let json = serde_json::to_string(&report).unwrap();
        let parsed: StatisticReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
