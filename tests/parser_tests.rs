use pretty_assertions::assert_eq;
use rtos_trace_studio::model::{LineKind, LineRef, SampleKind, SampleValue, TraceModel};
use rtos_trace_studio::parser::{parse_file, parse_str, ParseOptions};
use rtos_trace_studio::utils::error::ParseError;
use std::io::Write;
use tempfile::NamedTempFile;

fn parse(text: &str) -> TraceModel {
    parse_str(text, &ParseOptions::default()).unwrap()
}

fn task(index: usize) -> LineRef {
    LineRef { kind: LineKind::Task, index }
}

fn kinds_and_times(model: &TraceModel, line: LineRef) -> Vec<(SampleKind, f64)> {
    model
        .line(line)
        .samples()
        .iter()
        .map(|s| (s.kind, s.time))
        .collect()
}

#[test]
fn test_end_to_end_single_task() {
    let model = parse("CPU 0 main\nSTA 0 5 0\nSTO 0 5 100\nEND\n");

    assert_eq!(model.line_count(), 1);
    let line = model.line(task(0));
    assert_eq!(line.id(), 5);
    assert_eq!(
        kinds_and_times(&model, task(0)),
        vec![
            (SampleKind::Start, 0.0),
            (SampleKind::Stop, 100.0),
            (SampleKind::End, 100.0),
        ]
    );
    assert_eq!(line.max_sample_duration(), 100.0);
    assert_eq!(line.sample(0).value, SampleValue::Link(1));
    assert_eq!(line.sample(1).value.color(), Some("none"));
}

#[test]
fn test_preemption_symmetry() {
    let model = parse("STA 0 1 0\nSTA 0 2 10\nSTO 0 2 20\nSTO 0 1 30\n");

    assert_eq!(
        kinds_and_times(&model, task(0)),
        vec![
            (SampleKind::Start, 0.0),
            (SampleKind::Suspend, 10.0),
            (SampleKind::Resume, 20.0),
            (SampleKind::Stop, 30.0),
            (SampleKind::End, 30.0),
        ]
    );
}

#[test]
fn test_isr_preemption_does_not_touch_tasks() {
    let model = parse("STA 0 1 0\nSTA 1 7 5\nSTO 1 7 6\nSTO 0 1 10\n");

    let samples = kinds_and_times(&model, task(0));
    assert!(samples
        .iter()
        .all(|(kind, _)| !matches!(kind, SampleKind::Suspend | SampleKind::Resume)));
}

#[test]
fn test_preemption_stays_on_owner() {
    let model = parse("CPU 0 a\nSTA 0 1 0\nCPU 1 b\nSTA 0 2 5\nSTO 0 2 6\nCPU 0 a\nSTO 0 1 10\n");

    assert_eq!(
        kinds_and_times(&model, task(0)),
        vec![
            (SampleKind::Start, 0.0),
            (SampleKind::Stop, 10.0),
            (SampleKind::End, 10.0),
        ]
    );
}

#[test]
fn test_nested_isr_suspensions_collapse() {
    let model = parse("STA 1 1 0\nSTA 1 2 5\nSTA 1 3 6\nSTO 1 3 7\nSTO 1 2 8\nSTO 1 1 9\n");
    let isr = LineRef { kind: LineKind::Isr, index: 0 };

    assert_eq!(
        kinds_and_times(&model, isr),
        vec![
            (SampleKind::Start, 0.0),
            (SampleKind::Suspend, 5.0),
            (SampleKind::Resume, 8.0),
            (SampleKind::Stop, 9.0),
            (SampleKind::End, 9.0),
        ]
    );
}

#[test]
fn test_unmatched_isr_stop_does_not_resume_peers() {
    let model = parse("STA 1 1 0\nSTA 1 3 2\nSTO 1 2 3\nSTO 1 3 4\nSTO 1 1 10\n");
    let isr = |index| LineRef { kind: LineKind::Isr, index };

    assert_eq!(
        kinds_and_times(&model, isr(0)),
        vec![
            (SampleKind::Start, 0.0),
            (SampleKind::Suspend, 2.0),
            (SampleKind::Resume, 4.0),
            (SampleKind::Stop, 10.0),
            (SampleKind::End, 10.0),
        ]
    );
    assert_eq!(kinds_and_times(&model, isr(2)), vec![(SampleKind::End, 10.0)]);
}

#[test]
fn test_unmatched_task_stop_does_not_resume_peers() {
    let model = parse("STA 0 1 0\nSTO 0 2 5\nSTO 0 1 10\n");
    let line = model.line(task(0));

    assert_eq!(
        kinds_and_times(&model, task(0)),
        vec![
            (SampleKind::Start, 0.0),
            (SampleKind::Stop, 10.0),
            (SampleKind::End, 10.0),
        ]
    );
    assert_eq!(line.sample(0).value, SampleValue::Link(1));
    assert_eq!(line.max_sample_duration(), 10.0);
}

#[test]
fn test_time_origin_is_normalized() {
    let model = parse("STA 0 1 500\nSTO 0 1 800\n");

    assert_eq!(model.line(task(0)).sample(0).time, 0.0);
    assert_eq!(model.line(task(0)).sample(1).time, 300.0);
    assert_eq!(model.end_time(), 300.0);
}

#[test]
fn test_time_unit_applies_to_later_commands() {
    let model = parse("STA 0 1 0\nTIME 1000\nSTO 0 1 2000\n");
    assert_eq!(model.line(task(0)).sample(1).time, 2.0);
}

#[test]
fn test_value_uses_last_time() {
    let model = parse("TIM 50\nVAL 5 1 7\nTIM 60\nVAL 5 1 9\n");
    let line = model.line(LineRef { kind: LineKind::Value, index: 0 });

    assert_eq!(line.sample(0).time, 0.0);
    assert_eq!(line.sample(1).time, 10.0);
    assert_eq!(line.max_sample_value(), 9.0);
}

#[test]
fn test_queue_values_are_unpacked() {
    let model = parse("STA 3 1 0 0x0000000500000008\nSTO 3 1 1\n");
    let queue = model.line(LineRef { kind: LineKind::Queue, index: 0 });

    assert_eq!(queue.sample(0).value, SampleValue::Queue { depth: 5, size: 8 });
    assert_eq!(queue.sample(1).value, SampleValue::Queue { depth: 0, size: 0 });
    assert_eq!(model.max_sample_value(LineKind::Queue), 5.0);
}

#[test]
fn test_color_description_reaches_closing_sample() {
    let model = parse("STA 0 1 0\nDSC 3 1 dark red\nSTO 0 1 10\n");
    let line = model.line(task(0));

    assert_eq!(line.descriptions().len(), 1);
    assert_eq!(line.sample(1).value.color(), Some("dark red"));
}

#[test]
fn test_cycles_description_divided_by_speed() {
    let model = parse("CPU 0 main\nSPEED 1000\nSTA 0 1 0\nDSC 2 7 5000\n");
    let line = model.line(task(0));

    assert_eq!(line.description(0).value(), Some(5.0));
}

#[test]
fn test_names_and_description_names() {
    let model = parse("NAM 0 3 idle task\nDNM 0 7 stack depth\nSTA 0 3 0\n");

    assert_eq!(model.line_count(), 1);
    assert_eq!(model.line(task(0)).name(), "idle task");
    assert_eq!(model.description_name(7), Some("stack depth"));
}

#[test]
fn test_name_before_samples_covers_whole_trace() {
    let model = parse("NAM 0 3 idle task\nSTA 0 3 500\nSTO 0 3 600\n");
    let line = model.line(task(0));

    assert_eq!(model.line_count(), 1);
    assert_eq!(line.time_create(), f64::NEG_INFINITY);
    assert!(line.is_valid_at(0.0));
    assert_eq!(line.count(), 3);
}

#[test]
fn test_recreate_closes_previous_line() {
    let model = parse("CRE 3 1 0\nSTA 3 1 1\nCRE 3 1 5\nSTA 3 1 6\n");
    let section = model.sections().section(LineKind::Queue);

    assert_eq!(section.len(), 2);
    // Origin moved to the first sample at 1
    assert_eq!(section.line(0).time_create(), -1.0);
    assert_eq!(section.line(0).time_delete(), 4.0);
    assert_eq!(section.line(1).time_create(), 4.0);
    assert_eq!(section.line(1).count(), 2);
}

#[test]
fn test_delete_at_creation_time_is_rejected() {
    let model = parse("CRE 3 1 10\nDEL 3 1 10\n");
    let queue = model.line(LineRef { kind: LineKind::Queue, index: 0 });

    assert_eq!(queue.time_delete(), f64::INFINITY);
}

#[test]
fn test_port_links_resolve_endpoints() {
    let model = parse("STA 0 1 0\nSTA 8 2 0\nCRE 11 9 1 1 2\n");
    let port = model.line(LineRef { kind: LineKind::Port, index: 0 });
    let link = port.port().unwrap();

    assert_eq!(link.producer, Some(task(0)));
    assert_eq!(link.consumer, Some(LineRef { kind: LineKind::Agent, index: 0 }));
}

#[test]
fn test_end_stops_ingestion() {
    let model = parse("STA 0 1 0\nEND\nthis is not a command\n");
    assert_eq!(model.line_count(), 1);
}

#[test]
fn test_blank_lines_are_skipped() {
    let model = parse("\n   \nSTA 0 1 0\n\nSTO 0 1 1\n");
    assert_eq!(model.line(task(0)).count(), 3);
}

#[test]
fn test_unknown_command_reports_line() {
    let err = parse_str("STA 0 1 0\nFOO 1\n", &ParseOptions::default()).unwrap_err();

    assert!(matches!(err, ParseError::UnknownCommand { line: 2, .. }));
    assert_eq!(err.line(), Some(2));
}

#[test]
fn test_unknown_entity_kind() {
    let err = parse_str("STA 12 1 0\n", &ParseOptions::default()).unwrap_err();
    assert!(matches!(err, ParseError::UnknownEntityKind { line: 1, .. }));
}

#[test]
fn test_missing_argument() {
    let err = parse_str("STO 0 1\n", &ParseOptions::default()).unwrap_err();
    assert!(matches!(err, ParseError::MissingArgument { argument: "time", .. }));
}

#[test]
fn test_trailing_tokens_strict_and_lenient() {
    let text = "OCC 4 1 0 extra\n";

    let err = parse_str(text, &ParseOptions::default()).unwrap_err();
    assert!(matches!(err, ParseError::TrailingTokens { .. }));

    let model = parse_str(text, &ParseOptions::new().with_strict(false)).unwrap();
    assert_eq!(model.line_count(), 1);
}

#[test]
fn test_parse_file_reads_from_disk() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "CPU 1 dsp").unwrap();
    writeln!(file, "STA 0 5 0").unwrap();
    writeln!(file, "STO 0 5 100").unwrap();

    let model = parse_file(file.path(), &ParseOptions::default()).unwrap();

    assert_eq!(model.owners().len(), 1);
    assert_eq!(model.owners()[0].name, "dsp");
    assert_eq!(model.line(task(0)).owner(), 1);
}

#[test]
fn test_parse_file_missing_is_io_error() {
    let err = parse_file("/nonexistent/run.trace", &ParseOptions::default()).unwrap_err();

    assert!(matches!(err, ParseError::Open { .. }));
    assert!(err.is_io());
}
