//! Windowed statistics nodes.
//!
//! A statistic is fed the reconstructed intervals of one line: `update` once
//! per interval piece, then `consolidate` once per activation (an *epoch*).
//! Each piece counts fully toward the whole-trace total and, clipped to the
//! window, toward the windowed total. Epochs feed min/avg/max.

use std::fmt;

/// Common read-out and accumulation interface of all statistics nodes
///
/// **Public** - implemented by leaf statistics and by [`CompositeStatistic`]
pub trait Statistic: fmt::Debug + Send {
    /// Display name of the node
    fn name(&self) -> &str;

    /// Reset all accumulators and fix the window
    ///
    /// # Arguments
    /// * `first_sample_time` - earliest sample of the trace; the window never
    ///   starts before it
    /// * `window_start` / `window_end` - queried window
    fn init(&mut self, first_sample_time: f64, window_start: f64, window_end: f64);

    /// Account one active interval piece
    fn update(&mut self, start: f64, end: f64);

    /// Account one counter step; `delta` is the raw counter increase
    fn update_counter(&mut self, start: f64, end: f64, _delta: f64) {
        self.update(start, end);
    }

    /// Close the current epoch
    fn consolidate(&mut self);

    /// Active time inside the window
    fn total_time(&self) -> f64;

    /// Active time over the whole trace
    fn trace_time(&self) -> f64;

    fn window_length(&self) -> f64;

    /// Epochs that touched the window
    fn count(&self) -> u64;

    fn min(&self) -> f64;

    fn avg(&self) -> f64;

    fn max(&self) -> f64;

    /// Share of the window spent active
    fn load(&self) -> f64 {
        let length = self.window_length();
        if length > 0.0 {
            self.total_time() / length
        } else {
            0.0
        }
    }

    /// `(min, max)` inter-arrival period, for statistics that track arrivals
    fn periods(&self) -> Option<(f64, f64)> {
        None
    }

    /// Child nodes, empty for leaves
    fn children(&self) -> &[Box<dyn Statistic>] {
        &[]
    }

    fn child_mut(&mut self, _index: usize) -> Option<&mut dyn Statistic> {
        None
    }
}

/// Window plus the accumulators shared by every leaf statistic
#[derive(Debug, Clone, Default)]
struct Accumulator {
    window_start: f64,
    window_end: f64,
    window_length: f64,
    trace_total: f64,
    window_total: f64,
    epoch_trace: f64,
    epoch_touched: bool,
    epochs: u64,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl Accumulator {
    fn init(&mut self, first_sample_time: f64, window_start: f64, window_end: f64) {
        *self = Self {
            window_start,
            window_end,
            window_length: (window_end - window_start.max(first_sample_time)).max(0.0),
            ..Self::default()
        };
    }

    fn clip(&self, start: f64, end: f64) -> f64 {
        (end.min(self.window_end) - start.max(self.window_start)).max(0.0)
    }

    fn touches(&self, start: f64, end: f64) -> bool {
        end >= self.window_start && start <= self.window_end
    }

    /// Account `amount` spread evenly over the piece `[start, end]`
    fn add(&mut self, start: f64, end: f64, amount: f64) {
        let length = end - start;
        let windowed = if length > 0.0 {
            amount * self.clip(start, end) / length
        } else if self.touches(start, end) {
            amount
        } else {
            0.0
        };

        self.trace_total += amount;
        self.window_total += windowed;
        self.epoch_trace += amount;
        self.epoch_touched |= self.touches(start, end);
    }

    fn consolidate(&mut self) {
        if self.epoch_touched {
            let value = self.epoch_trace;
            self.epochs += 1;
            self.sum += value;
            self.min = Some(self.min.map_or(value, |m| m.min(value)));
            self.max = Some(self.max.map_or(value, |m| m.max(value)));
        }
        self.epoch_trace = 0.0;
        self.epoch_touched = false;
    }

    fn avg(&self) -> f64 {
        if self.epochs > 0 {
            self.sum / self.epochs as f64
        } else {
            0.0
        }
    }
}

macro_rules! accumulator_readouts {
    () => {
        fn total_time(&self) -> f64 {
            self.acc.window_total
        }

        fn trace_time(&self) -> f64 {
            self.acc.trace_total
        }

        fn window_length(&self) -> f64 {
            self.acc.window_length
        }

        fn count(&self) -> u64 {
            self.acc.epochs
        }

        fn min(&self) -> f64 {
            self.acc.min.unwrap_or(0.0)
        }

        fn avg(&self) -> f64 {
            self.acc.avg()
        }

        fn max(&self) -> f64 {
            self.acc.max.unwrap_or(0.0)
        }
    };
}

/// Running time of a TASK, AGENT or SEMAPHORE line
#[derive(Debug, Clone)]
pub struct ExecutionStatistic {
    name: String,
    acc: Accumulator,
}

impl ExecutionStatistic {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            acc: Accumulator::default(),
        }
    }
}

impl Statistic for ExecutionStatistic {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, first_sample_time: f64, window_start: f64, window_end: f64) {
        self.acc.init(first_sample_time, window_start, window_end);
    }

    fn update(&mut self, start: f64, end: f64) {
        self.acc.add(start, end, end - start);
    }

    fn consolidate(&mut self) {
        self.acc.consolidate();
    }

    accumulator_readouts!();
}

/// Execution statistic of an ISR line, plus the spread of its arrival period
#[derive(Debug, Clone)]
pub struct InterruptStatistic {
    name: String,
    acc: Accumulator,
    epoch_arrival: Option<f64>,
    last_arrival: Option<f64>,
    min_period: Option<f64>,
    max_period: Option<f64>,
}

impl InterruptStatistic {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            acc: Accumulator::default(),
            epoch_arrival: None,
            last_arrival: None,
            min_period: None,
            max_period: None,
        }
    }

    /// Shortest time between two consecutive activations, 0 if fewer than two
    pub fn min_period(&self) -> f64 {
        self.min_period.unwrap_or(0.0)
    }

    /// Longest time between two consecutive activations, 0 if fewer than two
    pub fn max_period(&self) -> f64 {
        self.max_period.unwrap_or(0.0)
    }
}

impl Statistic for InterruptStatistic {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, first_sample_time: f64, window_start: f64, window_end: f64) {
        self.acc.init(first_sample_time, window_start, window_end);
        self.epoch_arrival = None;
        self.last_arrival = None;
        self.min_period = None;
        self.max_period = None;
    }

    fn update(&mut self, start: f64, end: f64) {
        self.epoch_arrival.get_or_insert(start);
        self.acc.add(start, end, end - start);
    }

    fn consolidate(&mut self) {
        let touched = self.acc.epoch_touched;
        self.acc.consolidate();

        let Some(arrival) = self.epoch_arrival.take() else {
            return;
        };
        if touched {
            if let Some(previous) = self.last_arrival {
                let period = arrival - previous;
                self.min_period = Some(self.min_period.map_or(period, |m| m.min(period)));
                self.max_period = Some(self.max_period.map_or(period, |m| m.max(period)));
            }
        }
        self.last_arrival = Some(arrival);
    }

    fn periods(&self) -> Option<(f64, f64)> {
        Some((self.min_period(), self.max_period()))
    }

    accumulator_readouts!();
}

/// Counter increase of a CYCLES, MEM_CYCLES or VALUE line
///
/// Deltas are divided by `scale` (the owner's clock rate for cycle counters)
/// so CPU cycles read as seconds of busy time.
#[derive(Debug, Clone)]
pub struct CounterStatistic {
    name: String,
    scale: f64,
    acc: Accumulator,
}

impl CounterStatistic {
    pub fn new(name: impl Into<String>, scale: f64) -> Self {
        Self {
            name: name.into(),
            scale: if scale > 0.0 { scale } else { 1.0 },
            acc: Accumulator::default(),
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }
}

impl Statistic for CounterStatistic {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, first_sample_time: f64, window_start: f64, window_end: f64) {
        self.acc.init(first_sample_time, window_start, window_end);
    }

    fn update(&mut self, start: f64, end: f64) {
        self.acc.add(start, end, end - start);
    }

    fn update_counter(&mut self, start: f64, end: f64, delta: f64) {
        self.acc.add(start, end, delta / self.scale);
    }

    fn consolidate(&mut self) {
        self.acc.consolidate();
    }

    accumulator_readouts!();
}

/// How a composite derives its load from its children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadRule {
    /// Summed time over the window; children measure the same resource
    #[default]
    Sum,
    /// Highest child load; children measure different resources
    Peak,
}

/// Node fanning every call out to its children
///
/// Read-outs aggregate the children: totals and counts are summed, min and
/// max taken over children that saw epochs, avg weighted by epoch count.
/// Load follows the node's [`LoadRule`].
#[derive(Debug, Default)]
pub struct CompositeStatistic {
    name: String,
    children: Vec<Box<dyn Statistic>>,
    window_length: f64,
    load_rule: LoadRule,
}

impl CompositeStatistic {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            window_length: 0.0,
            load_rule: LoadRule::Sum,
        }
    }

    pub fn with_load_rule(mut self, load_rule: LoadRule) -> Self {
        self.load_rule = load_rule;
        self
    }

    pub fn load_rule(&self) -> LoadRule {
        self.load_rule
    }

    /// Append a child and return its index
    pub fn push(&mut self, child: Box<dyn Statistic>) -> usize {
        self.children.push(child);
        self.children.len() - 1
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    fn observed(&self) -> impl Iterator<Item = &dyn Statistic> + '_ {
        self.children
            .iter()
            .map(|c| c.as_ref())
            .filter(|c| c.count() > 0)
    }
}

impl Statistic for CompositeStatistic {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, first_sample_time: f64, window_start: f64, window_end: f64) {
        self.window_length = (window_end - window_start.max(first_sample_time)).max(0.0);
        for child in &mut self.children {
            child.init(first_sample_time, window_start, window_end);
        }
    }

    fn update(&mut self, start: f64, end: f64) {
        for child in &mut self.children {
            child.update(start, end);
        }
    }

    fn update_counter(&mut self, start: f64, end: f64, delta: f64) {
        for child in &mut self.children {
            child.update_counter(start, end, delta);
        }
    }

    fn consolidate(&mut self) {
        for child in &mut self.children {
            child.consolidate();
        }
    }

    fn total_time(&self) -> f64 {
        self.children.iter().map(|c| c.total_time()).sum()
    }

    fn trace_time(&self) -> f64 {
        self.children.iter().map(|c| c.trace_time()).sum()
    }

    fn window_length(&self) -> f64 {
        self.window_length
    }

    fn count(&self) -> u64 {
        self.children.iter().map(|c| c.count()).sum()
    }

    fn min(&self) -> f64 {
        self.observed().map(|c| c.min()).reduce(f64::min).unwrap_or(0.0)
    }

    fn avg(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        let weighted: f64 = self.observed().map(|c| c.avg() * c.count() as f64).sum();
        weighted / count as f64
    }

    fn max(&self) -> f64 {
        self.observed().map(|c| c.max()).reduce(f64::max).unwrap_or(0.0)
    }

    fn load(&self) -> f64 {
        match self.load_rule {
            LoadRule::Sum if self.window_length > 0.0 => self.total_time() / self.window_length,
            LoadRule::Sum => 0.0,
            LoadRule::Peak => self.children.iter().map(|c| c.load()).fold(0.0, f64::max),
        }
    }

    fn children(&self) -> &[Box<dyn Statistic>] {
        &self.children
    }

    fn child_mut(&mut self, index: usize) -> Option<&mut dyn Statistic> {
        let child: &mut dyn Statistic = self.children.get_mut(index)?.as_mut();
        Some(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_window_load() {
        let mut stat = ExecutionStatistic::new("TASK 5");
        stat.init(0.0, 0.0, 100.0);
        stat.update(0.0, 100.0);
        stat.consolidate();

        assert_eq!(stat.total_time(), 100.0);
        assert_eq!(stat.load(), 1.0);
        assert_eq!(stat.count(), 1);
    }

    #[test]
    fn test_clipping_to_window() {
        let mut stat = ExecutionStatistic::new("TASK 1");
        stat.init(0.0, 10.0, 20.0);
        stat.update(5.0, 15.0);
        stat.consolidate();
        stat.update(30.0, 40.0);
        stat.consolidate();

        assert_eq!(stat.total_time(), 5.0);
        assert_eq!(stat.trace_time(), 20.0);
        assert_eq!(stat.count(), 1);
        assert_eq!(stat.max(), 10.0);
        assert_eq!(stat.load(), 0.5);
    }

    #[test]
    fn test_epochs_min_avg_max() {
        let mut stat = ExecutionStatistic::new("TASK 1");
        stat.init(0.0, 0.0, 100.0);
        for (start, end) in [(0.0, 2.0), (10.0, 14.0), (20.0, 26.0)] {
            stat.update(start, end);
            stat.consolidate();
        }

        assert_eq!(stat.min(), 2.0);
        assert_eq!(stat.avg(), 4.0);
        assert_eq!(stat.max(), 6.0);
    }

    #[test]
    fn test_no_epochs_reads_zero() {
        let mut stat = ExecutionStatistic::new("idle");
        stat.init(0.0, 0.0, 10.0);
        assert_eq!(stat.min(), 0.0);
        assert_eq!(stat.avg(), 0.0);
        assert_eq!(stat.max(), 0.0);
    }

    #[test]
    fn test_window_starts_at_first_sample() {
        let mut stat = ExecutionStatistic::new("TASK 1");
        stat.init(5.0, 0.0, 10.0);
        assert_eq!(stat.window_length(), 5.0);
    }

    #[test]
    fn test_interrupt_periods() {
        let mut stat = InterruptStatistic::new("ISR 1");
        stat.init(0.0, 0.0, 100.0);
        for start in [0.0, 10.0, 25.0] {
            stat.update(start, start + 1.0);
            stat.consolidate();
        }

        assert_eq!(stat.min_period(), 10.0);
        assert_eq!(stat.max_period(), 15.0);
        assert_eq!(stat.total_time(), 3.0);
    }

    #[test]
    fn test_counter_scaled_by_clock_rate() {
        let mut stat = CounterStatistic::new("CYCLES 0", 1000.0);
        stat.init(0.0, 0.0, 10.0);
        stat.update_counter(0.0, 10.0, 5000.0);
        stat.consolidate();

        assert_eq!(stat.total_time(), 5.0);
        assert_eq!(stat.load(), 0.5);
    }

    #[test]
    fn test_composite_aggregates_children() {
        let mut composite = CompositeStatistic::new("TASK");
        composite.push(Box::new(ExecutionStatistic::new("a")));
        composite.push(Box::new(ExecutionStatistic::new("b")));
        composite.init(0.0, 0.0, 10.0);

        let a = composite.child_mut(0).unwrap();
        a.update(0.0, 2.0);
        a.consolidate();
        let b = composite.child_mut(1).unwrap();
        b.update(2.0, 8.0);
        b.consolidate();

        assert_eq!(composite.total_time(), 8.0);
        assert_eq!(composite.count(), 2);
        assert_eq!(composite.min(), 2.0);
        assert_eq!(composite.max(), 6.0);
        assert_eq!(composite.avg(), 4.0);
        assert_eq!(composite.load(), 0.8);
    }

    #[test]
    fn test_peak_load_takes_busiest_child() {
        let mut owner = CompositeStatistic::new("CPU0").with_load_rule(LoadRule::Peak);
        owner.push(Box::new(ExecutionStatistic::new("TASK")));
        owner.push(Box::new(InterruptStatistic::new("ISR")));
        owner.init(0.0, 0.0, 10.0);

        for (index, end) in [(0, 10.0), (1, 4.0)] {
            let child = owner.child_mut(index).unwrap();
            child.update(0.0, end);
            child.consolidate();
        }

        assert_eq!(owner.total_time(), 14.0);
        assert_eq!(owner.load(), 1.0);
    }
}
