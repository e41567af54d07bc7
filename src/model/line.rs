//! One traced entity's time series and its reconstruction pass.
//!
//! A [`SampleLine`] only ever grows by appending samples in time order.
//! After ingestion, [`SampleLine::calculate`] runs exactly once: it links
//! every START/SUSPEND to the sample that closes it (TASK/ISR/AGENT),
//! unwraps 32-bit counters (CYCLES/MEM_CYCLES/VALUE), replays semaphore
//! counts, and appends the terminal END sample.

use super::kind::LineKind;
use super::sample::{Description, DescriptionContent, Sample, SampleKind, SampleValue};
use crate::utils::config::{COUNTER_WRAP, DEFAULT_COLOR};
use log::{debug, warn};

/// Address of a line inside a trace model: its section and position there
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRef {
    pub kind: LineKind,
    pub index: usize,
}

/// Producer/consumer pair joined by a PORT line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortLink {
    pub producer: Option<LineRef>,
    pub consumer: Option<LineRef>,
}

/// One activation of a stacked line, from START to its STOP
#[derive(Debug, Clone, PartialEq)]
pub struct Activation {
    pub start: f64,
    pub end: f64,
    /// Pieces during which the line was actually running
    pub running: Vec<(f64, f64)>,
}

impl Activation {
    /// Running time, excluding suspensions
    pub fn net_time(&self) -> f64 {
        self.running.iter().map(|(s, e)| e - s).sum()
    }
}

// Ingestion-time bookkeeping. ISR lines collapse suspend nesting into one
// SUSPEND/RESUME pair; other lines count STARTs still waiting for a STOP.
#[derive(Debug, Clone, Default)]
struct IngestState {
    suspended: u32,
    running: bool,
    open_starts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Frame {
    Start,
    Suspend,
}

/// Stack entry of the reconstruction pass
struct OpenInterval {
    index: usize,
    color: String,
}

/// Time series of one traced entity
#[derive(Debug, Clone)]
pub struct SampleLine {
    kind: LineKind,
    owner: u32,
    id: i64,
    name: String,
    samples: Vec<Sample>,
    descriptions: Vec<Description>,
    time_create: f64,
    time_delete: f64,
    max_sample_value: f64,
    max_sample_duration: f64,
    ingest: IngestState,
    port: Option<PortLink>,
    calculated: bool,
}

impl SampleLine {
    /// Create a line valid from `time_create` until deleted
    pub fn new(kind: LineKind, owner: u32, id: i64, time_create: f64) -> Self {
        Self {
            kind,
            owner,
            id,
            name: format!("{} {}", kind.label(), id),
            samples: Vec::new(),
            descriptions: Vec::new(),
            time_create,
            time_delete: f64::INFINITY,
            max_sample_value: 0.0,
            max_sample_duration: 0.0,
            ingest: IngestState::default(),
            port: None,
            calculated: false,
        }
    }

    pub fn kind(&self) -> LineKind {
        self.kind
    }

    pub fn owner(&self) -> u32 {
        self.owner
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn time_create(&self) -> f64 {
        self.time_create
    }

    pub fn time_delete(&self) -> f64 {
        self.time_delete
    }

    /// True if `time` lies in `[time_create, time_delete)`
    pub fn is_valid_at(&self, time: f64) -> bool {
        self.time_create <= time && time < self.time_delete
    }

    /// Close the validity window at `time`
    ///
    /// Returns `false` and leaves the window open when `time` does not lie
    /// after the creation time.
    pub fn close(&mut self, time: f64) -> bool {
        if time > self.time_create {
            self.time_delete = time;
            true
        } else {
            false
        }
    }

    pub fn port(&self) -> Option<&PortLink> {
        self.port.as_ref()
    }

    pub fn set_port(&mut self, link: PortLink) {
        self.port = Some(link);
    }

    pub fn is_calculated(&self) -> bool {
        self.calculated
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample at `index`
    ///
    /// # Panics
    /// If `index` is out of bounds.
    pub fn sample(&self, index: usize) -> &Sample {
        &self.samples[index]
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Description at `index`
    ///
    /// # Panics
    /// If `index` is out of bounds.
    pub fn description(&self, index: usize) -> &Description {
        &self.descriptions[index]
    }

    pub fn descriptions(&self) -> &[Description] {
        &self.descriptions
    }

    pub fn first_time(&self) -> Option<f64> {
        self.samples.first().map(|s| s.time)
    }

    pub fn last_time(&self) -> Option<f64> {
        self.samples.last().map(|s| s.time)
    }

    pub fn max_sample_value(&self) -> f64 {
        self.max_sample_value
    }

    pub fn max_sample_duration(&self) -> f64 {
        self.max_sample_duration
    }

    /// Append a sample, applying the kind-specific ingestion rules
    ///
    /// Returns false when the sample had no effect on the line: it was
    /// dropped, or it is a STOP that matches no open START.
    pub fn add_sample(&mut self, kind: SampleKind, time: f64, value: SampleValue) -> bool {
        if self.kind == LineKind::Isr {
            return self.add_isr_sample(kind, time, value);
        }

        let matched = match kind {
            SampleKind::Start => {
                self.ingest.open_starts += 1;
                true
            }
            SampleKind::Stop if self.ingest.open_starts == 0 => {
                debug!("{}: STOP at {} matches no START", self.name, time);
                false
            }
            SampleKind::Stop => {
                self.ingest.open_starts -= 1;
                true
            }
            _ => true,
        };
        self.push(kind, time, value);
        matched
    }

    /// ISR lines collapse nested suspensions into one SUSPEND/RESUME pair,
    /// drop unmatched STOP/RESUME and close a pending suspension before any
    /// other sample.
    fn add_isr_sample(&mut self, kind: SampleKind, time: f64, value: SampleValue) -> bool {
        match kind {
            SampleKind::Suspend => {
                if self.ingest.suspended == 0 {
                    self.push(kind, time, value);
                }
                self.ingest.suspended += 1;
                true
            }
            SampleKind::Resume => {
                if self.ingest.suspended == 0 {
                    debug!("{}: dropping unmatched RESUME at {}", self.name, time);
                    return false;
                }
                self.ingest.suspended -= 1;
                if self.ingest.suspended == 0 {
                    self.push(kind, time, value);
                }
                true
            }
            _ => {
                if kind == SampleKind::Stop && !self.ingest.running {
                    debug!("{}: dropping unmatched STOP at {}", self.name, time);
                    return false;
                }
                if self.ingest.suspended > 0 {
                    self.ingest.suspended = 0;
                    self.push(SampleKind::Resume, time, SampleValue::Absent);
                }
                match kind {
                    SampleKind::Start => self.ingest.running = true,
                    SampleKind::Stop => self.ingest.running = false,
                    _ => {}
                }
                self.push(kind, time, value);
                true
            }
        }
    }

    fn push(&mut self, kind: SampleKind, time: f64, value: SampleValue) {
        let time = match self.last_time() {
            Some(last) if time < last => {
                warn!(
                    "{}: sample at {} precedes previous sample at {}, clamping",
                    self.name, time, last
                );
                last
            }
            _ => time,
        };
        self.samples.push(Sample::new(kind, time, value));
    }

    /// Attach a description at the time of the latest sample
    ///
    /// `fallback_time` is used while the line has no samples yet.
    pub fn add_description(&mut self, fallback_time: f64, id: i64, content: DescriptionContent) {
        let time = self.last_time().unwrap_or(fallback_time);
        self.descriptions.push(Description { time, id, content });
    }

    /// Descriptions attached at exactly `time`
    pub fn descriptions_at(&self, time: f64) -> &[Description] {
        let lo = self.descriptions.partition_point(|d| d.time < time);
        let hi = self.descriptions.partition_point(|d| d.time <= time);
        &self.descriptions[lo..hi.max(lo)]
    }

    /// Color attached at `time`, or the default color
    pub fn color_at(&self, time: f64) -> String {
        self.descriptions_at(time)
            .iter()
            .rev()
            .find_map(|d| match &d.content {
                DescriptionContent::Color(color) => Some(color.clone()),
                _ => None,
            })
            .unwrap_or_else(|| DEFAULT_COLOR.to_string())
    }

    /// Move every time of this line by `-offset`
    pub fn shift_time(&mut self, offset: f64) {
        for sample in &mut self.samples {
            sample.time -= offset;
        }
        for description in &mut self.descriptions {
            description.time -= offset;
        }
        self.time_create -= offset;
        self.time_delete -= offset;
    }

    /// Index of the earliest sample with `time >= t`, or the last index if
    /// every sample precedes `t`
    ///
    /// Equal times resolve to the leftmost sample. An empty line yields 0.
    pub fn binary_search(&self, t: f64) -> usize {
        let index = self.samples.partition_point(|s| s.time < t);
        index.min(self.samples.len().saturating_sub(1))
    }

    /// True if the line has something to show in `[from, to)`
    pub fn has_samples(&self, from: f64, to: f64) -> bool {
        if self.samples.is_empty() {
            return false;
        }
        let first = self.binary_search(from);
        if first != self.binary_search(to) {
            return true;
        }

        let time = self.samples[first].time;
        if from <= time && time < to {
            return true;
        }
        if !self.kind.is_stacked() {
            return false;
        }

        // The window falls between two samples: it overlaps an interval if
        // the sample in effect at `from` opened one.
        let bracket = if time > from { first.checked_sub(1) } else { Some(first) };
        bracket.is_some_and(|i| {
            matches!(
                self.samples[i].kind,
                SampleKind::Start | SampleKind::Suspend | SampleKind::Resume
            )
        })
    }

    /// `(Δtime, Δvalue)` between the samples bracketing `[from, to]`
    pub fn counter_difference(&self, from: f64, to: f64) -> Option<(f64, f64)> {
        if self.samples.is_empty() {
            return None;
        }
        let first = self.binary_search(from);
        let last = self.binary_search(to);
        let dt = self.samples[last].time - self.samples[first].time;
        let dv = self.numeric_at(last) - self.numeric_at(first);
        Some((dt, dv))
    }

    // Latest numeric value at or before `index`
    fn numeric_at(&self, index: usize) -> f64 {
        self.samples[..=index]
            .iter()
            .rev()
            .find_map(|s| s.value.as_f64())
            .unwrap_or(0.0)
    }

    /// One-time reconstruction pass, closing everything still open at `end_time`
    pub fn calculate(&mut self, end_time: f64) {
        if self.calculated {
            warn!("{}: reconstruction already ran, skipping", self.name);
            return;
        }
        let end_time = self.last_time().map_or(end_time, |last| end_time.max(last));

        match self.kind {
            LineKind::Task | LineKind::Isr | LineKind::Agent => self.calculate_stacked(end_time),
            LineKind::Cycles | LineKind::MemCycles | LineKind::Value => self.calculate_counter(),
            LineKind::Semaphore => self.calculate_semaphore(),
            LineKind::Queue | LineKind::Event | LineKind::Note | LineKind::Port => {}
        }

        self.max_sample_value = self
            .samples
            .iter()
            .filter_map(|s| s.value.as_f64())
            .fold(None, |max: Option<f64>, v| Some(max.map_or(v, |m| m.max(v))))
            .unwrap_or(0.0);

        let last = self
            .samples
            .last()
            .map_or(SampleValue::Absent, |s| s.value.clone());
        self.samples.push(Sample::new(SampleKind::End, end_time, last));
        self.calculated = true;
    }

    fn calculate_stacked(&mut self, end_time: f64) {
        let mut stack: Vec<OpenInterval> = Vec::new();

        for i in 0..self.samples.len() {
            let Sample { kind, time, .. } = self.samples[i];
            match kind {
                SampleKind::Start => {
                    let color = self.color_at(time);
                    stack.push(OpenInterval { index: i, color });
                }
                SampleKind::Suspend => {
                    let color = stack
                        .last()
                        .map_or_else(|| DEFAULT_COLOR.to_string(), |open| open.color.clone());
                    stack.push(OpenInterval { index: i, color });
                }
                SampleKind::Resume
                    if stack
                        .last()
                        .is_some_and(|open| self.samples[open.index].kind == SampleKind::Start) =>
                {
                    debug!("{}: RESUME at {} has no suspension to close", self.name, time);
                }
                SampleKind::Stop
                    if !stack
                        .iter()
                        .any(|open| self.samples[open.index].kind == SampleKind::Start) =>
                {
                    debug!("{}: STOP at {} has no START to close", self.name, time);
                }
                SampleKind::Stop | SampleKind::Resume => match stack.pop() {
                    Some(open) => self.close_interval(open, i),
                    None => debug!("{}: {:?} at {} closes nothing", self.name, kind, time),
                },
                SampleKind::Event | SampleKind::End => {}
            }
        }

        while let Some(open) = stack.pop() {
            let closing = match self.samples[open.index].kind {
                SampleKind::Start => SampleKind::Stop,
                _ => SampleKind::Resume,
            };
            let index = self.samples.len();
            self.samples
                .push(Sample::new(closing, end_time, SampleValue::Absent));
            self.close_interval(open, index);
        }
    }

    fn close_interval(&mut self, open: OpenInterval, closing: usize) {
        self.samples[open.index].value = SampleValue::Link(closing);
        self.samples[closing].value = SampleValue::Color(open.color);
        if self.samples[closing].kind == SampleKind::Stop {
            let duration = self.samples[closing].time - self.samples[open.index].time;
            self.max_sample_duration = self.max_sample_duration.max(duration);
        }
    }

    fn calculate_counter(&mut self) {
        let mut base = 0.0;
        let mut previous: Option<f64> = None;

        for sample in &mut self.samples {
            let Some(raw) = sample.value.as_f64() else {
                continue;
            };
            let mut corrected = raw + base;
            if previous.is_some_and(|p| corrected < p) {
                corrected += COUNTER_WRAP;
                base += COUNTER_WRAP;
            }
            sample.value = SampleValue::Magnitude(corrected);
            previous = Some(corrected);
        }
    }

    fn calculate_semaphore(&mut self) {
        let mut count: u64 = 0;
        for sample in &mut self.samples {
            match sample.kind {
                SampleKind::Start => count += 1,
                SampleKind::Stop => count = count.saturating_sub(1),
                _ => continue,
            }
            sample.value = SampleValue::Magnitude(count as f64);
        }
    }

    /// Completed activations of a stacked line, in time order
    pub fn activations(&self) -> Vec<Activation> {
        let mut activations = Vec::new();
        let mut frames: Vec<Frame> = Vec::new();
        let mut current: Option<Activation> = None;
        let mut running_since: Option<f64> = None;

        for sample in &self.samples {
            let was_running = frames.last() == Some(&Frame::Start);
            match sample.kind {
                SampleKind::Start => {
                    frames.push(Frame::Start);
                    if current.is_none() {
                        current = Some(Activation {
                            start: sample.time,
                            end: sample.time,
                            running: Vec::new(),
                        });
                    }
                }
                SampleKind::Suspend => frames.push(Frame::Suspend),
                SampleKind::Resume if frames.last() == Some(&Frame::Start) => {}
                SampleKind::Stop if !frames.contains(&Frame::Start) => {}
                SampleKind::Stop | SampleKind::Resume => {
                    frames.pop();
                }
                SampleKind::Event | SampleKind::End => {}
            }
            let is_running = frames.last() == Some(&Frame::Start);

            if was_running && !is_running {
                if let (Some(activation), Some(since)) = (current.as_mut(), running_since.take()) {
                    activation.running.push((since, sample.time));
                }
            } else if !was_running && is_running {
                running_since = Some(sample.time);
            }

            if sample.kind == SampleKind::Stop && !frames.contains(&Frame::Start) {
                if let Some(mut activation) = current.take() {
                    activation.end = sample.time;
                    activations.push(activation);
                }
            }
        }
        activations
    }

    /// Periods during which a semaphore count stayed above zero
    pub fn busy_periods(&self) -> Vec<Activation> {
        let mut periods = Vec::new();
        let mut since: Option<f64> = None;

        for sample in &self.samples {
            let count = match (sample.kind, sample.value.as_f64()) {
                (SampleKind::Start | SampleKind::Stop, Some(count)) => count,
                (SampleKind::End, _) => 0.0,
                _ => continue,
            };
            match since {
                None if count > 0.0 => since = Some(sample.time),
                Some(start) if count <= 0.0 => {
                    periods.push(Activation {
                        start,
                        end: sample.time,
                        running: vec![(start, sample.time)],
                    });
                    since = None;
                }
                _ => {}
            }
        }
        periods
    }

    /// `(t0, t1, Δvalue)` for every pair of consecutive numeric samples
    pub fn counter_steps(&self) -> Vec<(f64, f64, f64)> {
        let points: Vec<(f64, f64)> = self
            .samples
            .iter()
            .filter_map(|s| s.value.as_f64().map(|v| (s.time, v)))
            .collect();
        points
            .windows(2)
            .map(|pair| (pair[0].0, pair[1].0, pair[1].1 - pair[0].1))
            .collect()
    }
}
