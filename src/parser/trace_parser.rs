//! Single-pass trace ingestion.
//!
//! Reads commands line by line, applies each one to a [`TraceModel`] through
//! a handler that receives the explicit [`ParseState`], then finalizes the
//! model (time-origin normalization, reconstruction, derived maxima).

use super::command::{Command, PortSpec};
use crate::model::{
    DescriptionContent, LineKind, LineRef, PortLink, SampleKind, SampleLine, SampleValue,
    TraceModel,
};
use crate::utils::config::{DEFAULT_OWNER_NAME, DEFAULT_TICKS_PER_SEC};
use crate::utils::error::ParseError;
use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Ingestion options
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Reject unexpected trailing tokens instead of ignoring them
    pub strict: bool,

    /// Checked between input lines; when set, ingestion stops
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            strict: true,
            cancel: None,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// True once the cancel flag has been raised
    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Context carried from one command to the next
#[derive(Debug, Clone)]
pub struct ParseState {
    /// Owner selected by the latest CPU command
    pub owner: Option<u32>,

    /// Latest normalized time seen on any timed command
    pub last_time: f64,

    /// Line touched by the latest line command, target of DSC
    pub last_line: Option<LineRef>,

    /// Divisor applied to raw times
    pub ticks_per_sec: f64,

    /// 1-based number of the line being applied
    pub line: usize,
}

impl Default for ParseState {
    fn default() -> Self {
        Self {
            owner: None,
            last_time: 0.0,
            last_line: None,
            ticks_per_sec: DEFAULT_TICKS_PER_SEC,
            line: 0,
        }
    }
}

impl ParseState {
    /// Convert a raw time and remember it as the latest time
    fn advance(&mut self, raw: f64) -> f64 {
        self.last_time = raw / self.ticks_per_sec;
        self.last_time
    }
}

/// Parse a trace and finalize the resulting model
///
/// **Public** - main entry point for ingestion
///
/// # Errors
/// * `ParseError::Read` - the reader failed
/// * `ParseError::Cancelled` - the cancel flag was raised
/// * any line-level `ParseError` for malformed or unknown commands
pub fn parse_trace<R: BufRead>(reader: R, options: &ParseOptions) -> Result<TraceModel, ParseError> {
    let mut model = TraceModel::new();
    let mut state = ParseState::default();

    for (index, text) in reader.lines().enumerate() {
        state.line = index + 1;
        if options.is_cancelled() {
            info!("Ingestion cancelled at line {}", state.line);
            return Err(ParseError::Cancelled { line: state.line });
        }

        let text = text?;
        let Some(command) = Command::parse(state.line, &text, options.strict)? else {
            continue;
        };
        if command == Command::End {
            debug!("END at line {}", state.line);
            break;
        }
        apply_command(&mut model, &mut state, command);
    }

    debug!("Ingested {} lines into {} sample lines", state.line, model.line_count());
    model.finalize();
    Ok(model)
}

/// Parse a trace held in memory
pub fn parse_str(text: &str, options: &ParseOptions) -> Result<TraceModel, ParseError> {
    parse_trace(text.as_bytes(), options)
}

/// Open and parse a trace file
///
/// # Errors
/// * `ParseError::Open` - the file could not be opened
pub fn parse_file(path: impl AsRef<Path>, options: &ParseOptions) -> Result<TraceModel, ParseError> {
    let path = path.as_ref();
    info!("Reading trace: {}", path.display());

    let file = File::open(path).map_err(|source| ParseError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    parse_trace(BufReader::new(file), options)
}

/// Apply one command to the model
pub fn apply_command(model: &mut TraceModel, state: &mut ParseState, command: Command) {
    match command {
        Command::Cpu { id, name } => {
            model.declare_owner(id, &name);
            state.owner = Some(id);
        }
        Command::Create { kind, id, time, port } => {
            let time = state.advance(time);
            handle_create(model, state, kind, id, time, port);
        }
        Command::Delete { kind, id, time } => {
            let time = state.advance(time);
            handle_delete(model, state, kind, id, time);
        }
        Command::Start { kind, id, time, value } => {
            let time = state.advance(time);
            let value = sample_value(kind, value.unwrap_or(1.0));
            handle_transition(model, state, kind, id, time, SampleKind::Start, value);
        }
        Command::Stop { kind, id, time, size } => {
            let time = state.advance(time);
            let value = match size {
                Some(size) => sample_value(kind, size),
                None if kind == LineKind::Queue => SampleValue::from_packed(0),
                None => SampleValue::Absent,
            };
            handle_transition(model, state, kind, id, time, SampleKind::Stop, value);
        }
        Command::Occurrence { kind, id, time } => {
            let time = state.advance(time);
            let line = resolve_or_create(model, state, kind, id, time);
            model
                .line_mut(line)
                .add_sample(SampleKind::Event, time, SampleValue::Absent);
            state.last_line = Some(line);
        }
        Command::Time { time } => {
            state.advance(time);
        }
        Command::Value { kind, id, value } => {
            let time = state.last_time;
            let line = resolve_or_create(model, state, kind, id, time);
            model
                .line_mut(line)
                .add_sample(SampleKind::Event, time, sample_value(kind, value));
            state.last_line = Some(line);
        }
        Command::Describe { id, content } => handle_describe(model, state, id, content),
        Command::Name { kind, id, name } => {
            let time = state.last_time;
            let line = resolve_or_create(model, state, kind, id, time);
            model.line_mut(line).set_name(name);
            state.last_line = Some(line);
        }
        Command::DescriptionName { id, name } => model.set_description_name(id, name),
        Command::TimeUnit { ticks_per_sec } => {
            state.ticks_per_sec = if ticks_per_sec > 0.0 {
                ticks_per_sec
            } else {
                DEFAULT_TICKS_PER_SEC
            };
        }
        Command::Speed { clocks_per_sec } => {
            let owner = current_owner(model, state);
            if let Some(owner) = model.owner_mut(owner) {
                owner.clocks_per_sec = clamp_rate(clocks_per_sec);
            }
        }
        Command::MemSpeed { clocks_per_sec } => {
            let owner = current_owner(model, state);
            if let Some(owner) = model.owner_mut(owner) {
                owner.mem_clocks_per_sec = clamp_rate(clocks_per_sec);
            }
        }
        Command::End => {}
    }
}

fn clamp_rate(rate: f64) -> u64 {
    rate.max(1.0) as u64
}

/// Queue values arrive packed (high 32 bits = filling level)
fn sample_value(kind: LineKind, raw: f64) -> SampleValue {
    match kind {
        LineKind::Queue => SampleValue::from_packed(raw.max(0.0) as u64),
        _ => SampleValue::Magnitude(raw),
    }
}

/// Owner selected by CPU, declaring the default owner on first use
fn current_owner(model: &mut TraceModel, state: &mut ParseState) -> u32 {
    match state.owner {
        Some(owner) => owner,
        None => {
            debug!("No CPU declared, using default owner 0");
            model.declare_owner(0, DEFAULT_OWNER_NAME);
            state.owner = Some(0);
            0
        }
    }
}

/// Line of `kind` valid at `time` for the current owner, created on demand
fn resolve_or_create(
    model: &mut TraceModel,
    state: &mut ParseState,
    kind: LineKind,
    id: i64,
    time: f64,
) -> LineRef {
    let owner = current_owner(model, state);
    if let Some(line) = model.get_line(kind, owner, id, time) {
        return line;
    }

    let section = model.sections().section(kind);
    let (create, next_create) = if section.has_key(owner, id) {
        (time, section.next_creation_after(owner, id, time))
    } else {
        (f64::NEG_INFINITY, None)
    };
    debug!(
        "line {}: creating {} {} on owner {} on first reference",
        state.line, kind, id, owner
    );

    let mut line = SampleLine::new(kind, owner, id, create);
    if let Some(next) = next_create {
        line.close(next);
    }
    model.add_line(line)
}

fn handle_create(
    model: &mut TraceModel,
    state: &mut ParseState,
    kind: LineKind,
    id: i64,
    time: f64,
    port: Option<PortSpec>,
) {
    let owner = current_owner(model, state);
    let kind = if port.is_some() { LineKind::Port } else { kind };

    if let Some(existing) = model.get_line(kind, owner, id, time) {
        let line = model.line_mut(existing);
        if !line.close(time) {
            warn!(
                "line {}: CRE {} {} at {} overlaps a line created at {}, reusing it",
                state.line,
                kind,
                id,
                time,
                line.time_create()
            );
            state.last_line = Some(existing);
            return;
        }
        debug!("line {}: CRE {} {} closes the previous line", state.line, kind, id);
    }

    let next_create = model
        .sections()
        .section(kind)
        .next_creation_after(owner, id, time);
    let mut line = SampleLine::new(kind, owner, id, time);
    if let Some(next) = next_create {
        line.close(next);
    }
    if let Some(spec) = port {
        line.set_port(resolve_port(model, owner, spec, time));
    }
    state.last_line = Some(model.add_line(line));
}

fn resolve_port(model: &TraceModel, owner: u32, spec: PortSpec, time: f64) -> PortLink {
    let endpoint = |id: i64, endpoint_owner: Option<u32>| {
        let endpoint_owner = endpoint_owner.unwrap_or(owner);
        let found = [LineKind::Task, LineKind::Isr, LineKind::Agent]
            .into_iter()
            .find_map(|kind| model.get_line(kind, endpoint_owner, id, time));
        if found.is_none() {
            warn!("Port endpoint {} on owner {} not found", id, endpoint_owner);
        }
        found
    };
    PortLink {
        producer: endpoint(spec.producer, spec.producer_owner),
        consumer: endpoint(spec.consumer, spec.consumer_owner),
    }
}

fn handle_delete(model: &mut TraceModel, state: &mut ParseState, kind: LineKind, id: i64, time: f64) {
    let owner = current_owner(model, state);
    let Some(existing) = model.get_line(kind, owner, id, time) else {
        warn!("line {}: DEL {} {} at {}: no such line", state.line, kind, id, time);
        return;
    };
    let line = model.line_mut(existing);
    if !line.close(time) {
        warn!(
            "line {}: DEL {} {} at {} rejected, line was created at {}",
            state.line,
            kind,
            id,
            time,
            line.time_create()
        );
    }
}

fn handle_transition(
    model: &mut TraceModel,
    state: &mut ParseState,
    kind: LineKind,
    id: i64,
    time: f64,
    sample: SampleKind,
    value: SampleValue,
) {
    let line = resolve_or_create(model, state, kind, id, time);
    let recorded = model.line_mut(line).add_sample(sample, time, value);

    if recorded && kind.preempts_peers() {
        let peer_sample = match sample {
            SampleKind::Start => SampleKind::Suspend,
            _ => SampleKind::Resume,
        };
        broadcast_preemption(model, line, peer_sample, time);
    }
    state.last_line = Some(line);
}

/// Give every other line of the same section and owner that is valid at
/// `time` a SUSPEND (on START) or RESUME (on STOP)
fn broadcast_preemption(model: &mut TraceModel, origin: LineRef, sample: SampleKind, time: f64) {
    let owner = model.line(origin).owner();
    let section = model.sections_mut().section_mut(origin.kind);
    let peers: Vec<usize> = section
        .owned_by(owner)
        .filter(|&i| i != origin.index && section.line(i).is_valid_at(time))
        .collect();

    for index in peers {
        section
            .line_mut(index)
            .add_sample(sample, time, SampleValue::Absent);
    }
}

fn handle_describe(model: &mut TraceModel, state: &mut ParseState, id: i64, content: DescriptionContent) {
    let Some(target) = state.last_line else {
        warn!("line {}: DSC {} has no preceding line to attach to", state.line, id);
        return;
    };

    let content = match content {
        DescriptionContent::Cycles(cycles) => {
            let owner = model.line(target).owner();
            let rate = model.owner(owner).map_or(1.0, |o| o.clocks_per_sec as f64);
            DescriptionContent::Cycles(cycles / rate)
        }
        other => other,
    };
    model
        .line_mut(target)
        .add_description(state.last_time, id, content);
}
