use rtos_trace_studio::aggregator::{
    replay_line, ExecutionStatistic, Statistic, StatisticsTree,
};
use rtos_trace_studio::model::{LineKind, LineRef, TraceModel};
use rtos_trace_studio::parser::{parse_str, ParseOptions};
use rtos_trace_studio::utils::error::QueryError;

const EPSILON: f64 = 1e-9;

fn parse(text: &str) -> TraceModel {
    parse_str(text, &ParseOptions::default()).unwrap()
}

fn computed(model: &TraceModel, start: f64, end: f64) -> StatisticsTree {
    let mut tree = StatisticsTree::build(model);
    tree.compute(model, start, end).unwrap();
    tree
}

#[test]
fn test_end_to_end_load_is_one() {
    let model = parse("CPU 0 main\nSTA 0 5 0\nSTO 0 5 100\nEND\n");
    let line = model.line(LineRef { kind: LineKind::Task, index: 0 });

    let mut stat = ExecutionStatistic::new(line.name());
    stat.init(0.0, 0.0, 100.0);
    replay_line(line, &mut stat);

    assert_eq!(stat.load(), 1.0);
    assert_eq!(stat.total_time(), 100.0);
    assert_eq!(stat.count(), 1);
}

#[test]
fn test_preempted_tasks_share_the_window() {
    let model = parse("STA 0 1 0\nSTA 0 2 10\nSTO 0 2 30\nSTO 0 1 40\nSTA 0 3 50\nSTO 0 3 100\n");
    let tree = computed(&model, 0.0, 100.0);

    let task = |index| tree.statistic(LineRef { kind: LineKind::Task, index }).unwrap();
    assert!((task(0).total_time() - 20.0).abs() < EPSILON);
    assert!((task(1).total_time() - 20.0).abs() < EPSILON);
    assert!((task(2).total_time() - 50.0).abs() < EPSILON);

    let section = &tree.root().children()[0].children()[0];
    assert!(section.total_time() <= section.window_length() + EPSILON);
    assert!((section.load() - 0.9).abs() < EPSILON);
}

#[test]
fn test_suspended_time_is_not_counted_but_epoch_is_whole() {
    let model = parse("STA 0 1 0\nSTA 0 2 10\nSTO 0 2 30\nSTO 0 1 40\n");
    let tree = computed(&model, 0.0, 40.0);
    let first = tree.statistic(LineRef { kind: LineKind::Task, index: 0 }).unwrap();

    assert_eq!(first.count(), 1);
    assert!((first.max() - 20.0).abs() < EPSILON);
    assert!((first.load() - 0.5).abs() < EPSILON);
}

#[test]
fn test_window_clipping() {
    let model = parse("STA 0 1 0\nSTO 0 1 10\nSTA 0 1 20\nSTO 0 1 30\n");
    let tree = computed(&model, 5.0, 25.0);
    let stat = tree.statistic(LineRef { kind: LineKind::Task, index: 0 }).unwrap();

    assert!((stat.total_time() - 10.0).abs() < EPSILON);
    assert!((stat.trace_time() - 20.0).abs() < EPSILON);
    assert_eq!(stat.count(), 2);
    assert!((stat.load() - 0.5).abs() < EPSILON);
}

#[test]
fn test_recompute_with_new_window() {
    let model = parse("STA 0 1 0\nSTO 0 1 10\nSTA 0 1 20\nSTO 0 1 30\n");
    let mut tree = StatisticsTree::build(&model);
    let line = LineRef { kind: LineKind::Task, index: 0 };

    tree.compute(&model, 0.0, 30.0).unwrap();
    assert_eq!(tree.statistic(line).unwrap().count(), 2);

    tree.compute(&model, 15.0, 30.0).unwrap();
    assert_eq!(tree.statistic(line).unwrap().count(), 1);
    assert_eq!(tree.window(), Some((15.0, 30.0)));
}

#[test]
fn test_interrupt_periods() {
    let model = parse("STA 1 1 0\nSTO 1 1 1\nSTA 1 1 10\nSTO 1 1 11\nSTA 1 1 30\nSTO 1 1 31\n");
    let tree = computed(&model, 0.0, 31.0);
    let isr = tree.statistic(LineRef { kind: LineKind::Isr, index: 0 }).unwrap();

    assert_eq!(isr.periods(), Some((10.0, 20.0)));
    assert_eq!(isr.count(), 3);
    assert!((isr.avg() - 1.0).abs() < EPSILON);
}

#[test]
fn test_cycles_scaled_by_speed() {
    let model = parse("CPU 0 main\nSPEED 1000\nTIM 0\nVAL 6 1 0\nTIM 10\nVAL 6 1 4000\n");
    let tree = computed(&model, 0.0, 10.0);
    let cycles = tree.statistic(LineRef { kind: LineKind::Cycles, index: 0 }).unwrap();

    assert!((cycles.total_time() - 4.0).abs() < EPSILON);
    assert!((cycles.load() - 0.4).abs() < EPSILON);
}

#[test]
fn test_mem_cycles_use_mem_speed() {
    let model = parse("CPU 0 main\nSPEED 1000\nMEMSPEED 100\nTIM 0\nVAL 9 1 0\nTIM 10\nVAL 9 1 500\n");
    let tree = computed(&model, 0.0, 10.0);
    let mem = tree.statistic(LineRef { kind: LineKind::MemCycles, index: 0 }).unwrap();

    assert!((mem.total_time() - 5.0).abs() < EPSILON);
}

#[test]
fn test_semaphore_busy_time() {
    let model = parse("STA 2 1 0\nSTA 2 1 2\nSTO 2 1 4\nSTO 2 1 6\nSTA 2 1 8\nSTO 2 1 10\n");
    let tree = computed(&model, 0.0, 10.0);
    let sem = tree.statistic(LineRef { kind: LineKind::Semaphore, index: 0 }).unwrap();

    assert!((sem.total_time() - 8.0).abs() < EPSILON);
    assert_eq!(sem.count(), 2);
}

#[test]
fn test_owner_composites_sum_children() {
    let model = parse("CPU 0 a\nSTA 0 1 0\nSTO 0 1 5\nCPU 1 b\nSTA 0 1 0\nSTO 0 1 10\n");
    let tree = computed(&model, 0.0, 10.0);
    let owners = tree.root().children();

    assert!((owners[0].total_time() - 5.0).abs() < EPSILON);
    assert!((owners[1].total_time() - 10.0).abs() < EPSILON);
    assert!((tree.root().total_time() - 15.0).abs() < EPSILON);
    assert_eq!(tree.root().count(), 2);
    assert!((tree.root().min() - 5.0).abs() < EPSILON);
    assert!((tree.root().max() - 10.0).abs() < EPSILON);
}

#[test]
fn test_owner_load_is_peak_of_sections() {
    let model = parse(
        "CPU 0 main\nSTA 0 1 0\nSTO 0 1 10\nSTA 1 1 0\nSTO 1 1 10\nSTA 2 1 0\nSTO 2 1 10\n",
    );
    let tree = computed(&model, 0.0, 10.0);
    let owner = &tree.root().children()[0];

    assert_eq!(owner.children().len(), 3);
    for section in owner.children() {
        assert!((section.load() - 1.0).abs() < EPSILON);
    }
    assert!((owner.total_time() - 30.0).abs() < EPSILON);
    assert!((owner.load() - 1.0).abs() < EPSILON);
    assert!((tree.root().load() - 1.0).abs() < EPSILON);
}

#[test]
fn test_unmatched_isr_stop_keeps_section_load_bounded() {
    let model = parse("STA 1 1 0\nSTA 1 3 2\nSTO 1 2 3\nSTO 1 3 4\nSTO 1 1 10\n");
    let tree = computed(&model, 0.0, 10.0);
    let section = &tree.root().children()[0].children()[0];

    assert!((section.total_time() - 10.0).abs() < EPSILON);
    assert!(section.load() <= 1.0 + EPSILON);
}

#[test]
fn test_empty_window_is_rejected() {
    let model = parse("STA 0 1 0\nSTO 0 1 10\n");
    let mut tree = StatisticsTree::build(&model);

    assert_eq!(
        tree.compute(&model, 10.0, 2.0),
        Err(QueryError::EmptyWindow { start: 10.0, end: 2.0 })
    );
}
