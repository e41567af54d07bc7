//! Lines grouped by entity kind, resolvable by `(owner, id)` at a time.

use super::kind::LineKind;
use super::line::{LineRef, SampleLine};
use std::collections::HashMap;

/// All lines of one entity kind, in discovery order
#[derive(Debug, Clone)]
pub struct Section {
    kind: LineKind,
    lines: Vec<SampleLine>,
    index: HashMap<(u32, i64), Vec<usize>>,
}

impl Section {
    pub fn new(kind: LineKind) -> Self {
        Self {
            kind,
            lines: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn kind(&self) -> LineKind {
        self.kind
    }

    pub fn lines(&self) -> &[SampleLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line at `index`
    ///
    /// # Panics
    /// If `index` is out of bounds.
    pub fn line(&self, index: usize) -> &SampleLine {
        &self.lines[index]
    }

    pub fn line_mut(&mut self, index: usize) -> &mut SampleLine {
        &mut self.lines[index]
    }

    pub fn lines_mut(&mut self) -> impl Iterator<Item = &mut SampleLine> {
        self.lines.iter_mut()
    }

    /// Append a line and register it under its `(owner, id)` key
    pub fn add(&mut self, line: SampleLine) -> LineRef {
        let index = self.lines.len();
        self.index
            .entry((line.owner(), line.id()))
            .or_default()
            .push(index);
        self.lines.push(line);
        LineRef {
            kind: self.kind,
            index,
        }
    }

    /// Index of the line registered under `(owner, id)` that is valid at `time`
    pub fn find(&self, owner: u32, id: i64, time: f64) -> Option<usize> {
        self.index
            .get(&(owner, id))?
            .iter()
            .copied()
            .find(|&i| self.lines[i].is_valid_at(time))
    }

    /// Line registered under `(owner, id)` that is valid at `time`
    pub fn get_line(&self, owner: u32, id: i64, time: f64) -> Option<&SampleLine> {
        self.find(owner, id, time).map(|i| &self.lines[i])
    }

    /// True if any line was ever registered under `(owner, id)`
    pub fn has_key(&self, owner: u32, id: i64) -> bool {
        self.index.contains_key(&(owner, id))
    }

    /// Earliest creation time after `time` among lines registered under `(owner, id)`
    pub fn next_creation_after(&self, owner: u32, id: i64, time: f64) -> Option<f64> {
        self.index
            .get(&(owner, id))?
            .iter()
            .map(|&i| self.lines[i].time_create())
            .filter(|&create| create > time)
            .reduce(f64::min)
    }

    /// Indices of lines belonging to `owner`, in discovery order
    pub fn owned_by(&self, owner: u32) -> impl Iterator<Item = usize> + '_ {
        self.lines
            .iter()
            .enumerate()
            .filter(move |(_, line)| line.owner() == owner)
            .map(|(i, _)| i)
    }
}

/// One section per entity kind, in protocol order
#[derive(Debug, Clone)]
pub struct SectionList {
    sections: Vec<Section>,
}

impl Default for SectionList {
    fn default() -> Self {
        Self {
            sections: LineKind::ALL.iter().map(|k| Section::new(*k)).collect(),
        }
    }
}

impl SectionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(&self, kind: LineKind) -> &Section {
        &self.sections[kind.section_index()]
    }

    pub fn section_mut(&mut self, kind: LineKind) -> &mut Section {
        &mut self.sections[kind.section_index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Section> {
        self.sections.iter_mut()
    }

    pub fn line(&self, line: LineRef) -> &SampleLine {
        self.section(line.kind).line(line.index)
    }

    pub fn line_mut(&mut self, line: LineRef) -> &mut SampleLine {
        self.section_mut(line.kind).line_mut(line.index)
    }

    /// Every line of every section
    pub fn all_lines(&self) -> impl Iterator<Item = (LineRef, &SampleLine)> {
        self.sections.iter().flat_map(|section| {
            section.lines().iter().enumerate().map(move |(index, line)| {
                (
                    LineRef {
                        kind: section.kind(),
                        index,
                    },
                    line,
                )
            })
        })
    }
}
