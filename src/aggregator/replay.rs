//! Feed a reconstructed line into a statistics node.

use super::statistic::{CounterStatistic, ExecutionStatistic, InterruptStatistic, Statistic};
use crate::model::{Activation, LineKind, Owner, SampleLine};
use log::debug;

/// Leaf statistic matching the kind of `line`
///
/// **Public** - used by the tree builder
///
/// # Returns
/// `None` for kinds without a statistic (QUEUE, EVENT, NOTE, PORT)
pub fn new_statistic(line: &SampleLine, owner: Option<&Owner>) -> Option<Box<dyn Statistic>> {
    let name = line.name().to_string();
    match line.kind() {
        LineKind::Task | LineKind::Agent | LineKind::Semaphore => {
            Some(Box::new(ExecutionStatistic::new(name)))
        }
        LineKind::Isr => Some(Box::new(InterruptStatistic::new(name))),
        LineKind::Cycles | LineKind::MemCycles | LineKind::Value => {
            let scale = owner.map_or(1.0, |o| o.clock_rate_for(line.kind()));
            Some(Box::new(CounterStatistic::new(name, scale)))
        }
        LineKind::Queue | LineKind::Event | LineKind::Note | LineKind::Port => None,
    }
}

/// Replay every interval of `line` into `statistic`, one epoch per activation
pub fn replay_line(line: &SampleLine, statistic: &mut dyn Statistic) {
    match line.kind() {
        LineKind::Task | LineKind::Isr | LineKind::Agent => {
            replay_activations(&line.activations(), statistic)
        }
        LineKind::Semaphore => replay_activations(&line.busy_periods(), statistic),
        LineKind::Cycles | LineKind::MemCycles | LineKind::Value => {
            for (start, end, delta) in line.counter_steps() {
                statistic.update_counter(start, end, delta);
                statistic.consolidate();
            }
        }
        kind => debug!("{}: no replay for {} lines", line.name(), kind),
    }
}

fn replay_activations(activations: &[Activation], statistic: &mut dyn Statistic) {
    for activation in activations {
        for &(start, end) in &activation.running {
            statistic.update(start, end);
        }
        statistic.consolidate();
    }
}
