//! Aggregation of reconstructed lines into windowed statistics.
//!
//! This module turns a finalized trace model into:
//! - Per-line statistics (execution, interrupt, counter)
//! - Owner → section → line composites queried as one unit
//! - Load, total time and min/avg/max over activations for any window

pub mod replay;
pub mod statistic;
pub mod tree;

// Re-export main types and functions
pub use replay::{new_statistic, replay_line};
pub use statistic::{
    CompositeStatistic, CounterStatistic, ExecutionStatistic, InterruptStatistic, LoadRule,
    Statistic,
};
pub use tree::{NodePath, StatisticsTree};
