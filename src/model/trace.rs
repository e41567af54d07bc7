//! Top-level registry of a parsed trace.

use super::kind::LineKind;
use super::line::{LineRef, SampleLine};
use super::section::SectionList;
use crate::utils::config::DEFAULT_CLOCKS_PER_SEC;
use log::{debug, info};
use std::collections::HashMap;

/// Clock domain lines belong to ("CPU" in the trace protocol)
#[derive(Debug, Clone, PartialEq)]
pub struct Owner {
    pub id: u32,
    pub name: String,
    pub clocks_per_sec: u64,
    pub mem_clocks_per_sec: u64,
}

impl Owner {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            clocks_per_sec: DEFAULT_CLOCKS_PER_SEC,
            mem_clocks_per_sec: DEFAULT_CLOCKS_PER_SEC,
        }
    }

    /// Clock rate that converts a counter line's values into seconds
    pub fn clock_rate_for(&self, kind: LineKind) -> f64 {
        match kind {
            LineKind::Cycles => self.clocks_per_sec as f64,
            LineKind::MemCycles => self.mem_clocks_per_sec as f64,
            _ => 1.0,
        }
    }
}

/// Owners, sections and derived trace-wide values
///
/// Built by the parser, then frozen by [`TraceModel::finalize`]. Readers
/// should only ever see finalized models.
#[derive(Debug, Clone, Default)]
pub struct TraceModel {
    owners: Vec<Owner>,
    sections: SectionList,
    description_names: HashMap<i64, String>,
    end_time: f64,
    max_values: HashMap<LineKind, f64>,
    finalized: bool,
}

impl TraceModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owners(&self) -> &[Owner] {
        &self.owners
    }

    pub fn owner(&self, id: u32) -> Option<&Owner> {
        self.owners.iter().find(|o| o.id == id)
    }

    pub fn owner_mut(&mut self, id: u32) -> Option<&mut Owner> {
        self.owners.iter_mut().find(|o| o.id == id)
    }

    /// Register owner `id`, or rename it if it already exists
    pub fn declare_owner(&mut self, id: u32, name: &str) -> &mut Owner {
        let index = match self.owners.iter().position(|o| o.id == id) {
            Some(index) => {
                if self.owners[index].name != name {
                    debug!("Renaming owner {} to '{}'", id, name);
                    self.owners[index].name = name.to_string();
                }
                index
            }
            None => {
                debug!("New owner {} '{}'", id, name);
                self.owners.push(Owner::new(id, name));
                self.owners.len() - 1
            }
        };
        &mut self.owners[index]
    }

    pub fn sections(&self) -> &SectionList {
        &self.sections
    }

    pub fn sections_mut(&mut self) -> &mut SectionList {
        &mut self.sections
    }

    pub fn line(&self, line: LineRef) -> &SampleLine {
        self.sections.line(line)
    }

    pub fn line_mut(&mut self, line: LineRef) -> &mut SampleLine {
        self.sections.line_mut(line)
    }

    pub fn add_line(&mut self, line: SampleLine) -> LineRef {
        self.sections.section_mut(line.kind()).add(line)
    }

    /// Line of `kind` registered under `(owner, id)` and valid at `time`
    pub fn get_line(&self, kind: LineKind, owner: u32, id: i64, time: f64) -> Option<LineRef> {
        self.sections
            .section(kind)
            .find(owner, id, time)
            .map(|index| LineRef { kind, index })
    }

    /// Every line in section order, then discovery order
    pub fn lines(&self) -> impl Iterator<Item = (LineRef, &SampleLine)> {
        self.sections.all_lines()
    }

    pub fn line_count(&self) -> usize {
        self.sections.iter().map(|s| s.len()).sum()
    }

    pub fn set_description_name(&mut self, id: i64, name: impl Into<String>) {
        self.description_names.insert(id, name.into());
    }

    pub fn description_name(&self, id: i64) -> Option<&str> {
        self.description_names.get(&id).map(String::as_str)
    }

    /// Last sample time over all lines
    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    /// Largest sample magnitude seen on any line of `kind`
    pub fn max_sample_value(&self, kind: LineKind) -> f64 {
        self.max_values.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Earliest first-sample time over all lines
    pub fn first_sample_time(&self) -> Option<f64> {
        self.sections
            .all_lines()
            .filter_map(|(_, line)| line.first_time())
            .reduce(f64::min)
    }

    /// Normalise the time origin, reconstruct every line and derive the
    /// trace-wide maxima
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }

        let origin = self.first_sample_time().unwrap_or(0.0);
        if origin != 0.0 {
            debug!("Shifting time origin by {}", origin);
            for section in self.sections.iter_mut() {
                for line in section.lines_mut() {
                    line.shift_time(origin);
                }
            }
        }

        let end_time = self.compute_end_time();
        for section in self.sections.iter_mut() {
            for line in section.lines_mut() {
                line.calculate(end_time);
            }
        }

        self.end_time = self.compute_end_time();
        self.max_values.clear();
        for (line_ref, line) in self.sections.all_lines() {
            let max = self.max_values.entry(line_ref.kind).or_insert(0.0);
            *max = max.max(line.max_sample_value());
        }
        self.finalized = true;

        info!(
            "Trace finalized: {} lines, {} owners, end time {}",
            self.line_count(),
            self.owners.len(),
            self.end_time
        );
    }

    fn compute_end_time(&self) -> f64 {
        self.sections
            .all_lines()
            .filter_map(|(_, line)| line.last_time())
            .fold(0.0, f64::max)
    }
}
