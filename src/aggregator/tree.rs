//! Owner → section → line statistics tree of a trace model.

use super::replay::{new_statistic, replay_line};
use super::statistic::{CompositeStatistic, LoadRule, Statistic};
use crate::model::{LineRef, TraceModel};
use crate::utils::error::QueryError;
use log::{debug, info, warn};

/// Position of a line's leaf inside the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodePath {
    pub owner: usize,
    pub section: usize,
    pub line: usize,
}

/// Statistics of a whole trace, queried one window at a time
///
/// The tree mirrors the model: one composite per owner, one composite per
/// non-empty section of that owner, one leaf per line that has a statistic.
/// Section load sums its lines; owner and root load is the peak of their
/// children.
#[derive(Debug)]
pub struct StatisticsTree {
    root: CompositeStatistic,
    bindings: Vec<(LineRef, NodePath)>,
    window: Option<(f64, f64)>,
}

impl StatisticsTree {
    /// Build the node layout for `model`
    ///
    /// **Public** - call once per model, then `compute` per window
    pub fn build(model: &TraceModel) -> Self {
        let mut root = CompositeStatistic::new("trace").with_load_rule(LoadRule::Peak);
        let mut bindings = Vec::new();

        for owner in model.owners() {
            let mut owner_node =
                CompositeStatistic::new(owner.name.clone()).with_load_rule(LoadRule::Peak);
            let owner_index = root.len();

            for section in model.sections().iter() {
                let mut section_node = CompositeStatistic::new(section.kind().label());
                let section_index = owner_node.len();

                for index in section.owned_by(owner.id) {
                    let line = section.line(index);
                    let Some(statistic) = new_statistic(line, Some(owner)) else {
                        continue;
                    };
                    let path = NodePath {
                        owner: owner_index,
                        section: section_index,
                        line: section_node.push(statistic),
                    };
                    bindings.push((LineRef { kind: section.kind(), index }, path));
                }

                if !section_node.is_empty() {
                    owner_node.push(Box::new(section_node));
                }
            }
            root.push(Box::new(owner_node));
        }

        let unbound = model
            .lines()
            .filter(|(_, line)| model.owner(line.owner()).is_none())
            .count();
        if unbound > 0 {
            warn!("{} lines belong to undeclared owners and get no statistics", unbound);
        }
        debug!("Statistics tree: {} leaves", bindings.len());

        Self {
            root,
            bindings,
            window: None,
        }
    }

    /// Recompute every node for the window `[start, end)`
    ///
    /// # Errors
    /// * `QueryError::InvalidWindow` - a bound is NaN or infinite
    /// * `QueryError::EmptyWindow` - `end <= start`
    pub fn compute(&mut self, model: &TraceModel, start: f64, end: f64) -> Result<(), QueryError> {
        if !start.is_finite() || !end.is_finite() {
            return Err(QueryError::InvalidWindow);
        }
        if end <= start {
            return Err(QueryError::EmptyWindow { start, end });
        }
        if !model.is_finalized() {
            warn!("Computing statistics on a model that was not finalized");
        }

        info!("Computing statistics for window [{}, {})", start, end);
        let first_sample_time = model.first_sample_time().unwrap_or(start);
        self.root.init(first_sample_time, start, end);

        for &(line_ref, path) in &self.bindings {
            let node = self
                .root
                .child_mut(path.owner)
                .and_then(|owner| owner.child_mut(path.section))
                .and_then(|section| section.child_mut(path.line));
            match node {
                Some(node) => replay_line(model.line(line_ref), node),
                None => warn!("No statistics node for {:?}", line_ref),
            }
        }

        self.window = Some((start, end));
        Ok(())
    }

    pub fn root(&self) -> &CompositeStatistic {
        &self.root
    }

    /// Window of the latest successful `compute`
    pub fn window(&self) -> Option<(f64, f64)> {
        self.window
    }

    /// Lines that have a leaf, with the leaf position
    pub fn bindings(&self) -> &[(LineRef, NodePath)] {
        &self.bindings
    }

    /// Leaf statistic of `line`
    pub fn statistic(&self, line: LineRef) -> Option<&dyn Statistic> {
        let (_, path) = self.bindings.iter().find(|(bound, _)| *bound == line)?;
        self.node(*path)
    }

    pub fn node(&self, path: NodePath) -> Option<&dyn Statistic> {
        self.root
            .children()
            .get(path.owner)?
            .children()
            .get(path.section)?
            .children()
            .get(path.line)
            .map(|leaf| leaf.as_ref())
    }
}
