//! Entity and description kinds with their trace-protocol ordinals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a traced entity, one section per kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Task,
    Isr,
    Semaphore,
    Queue,
    Event,
    Value,
    Cycles,
    Note,
    Agent,
    MemCycles,
    Port,
}

impl LineKind {
    /// Section order of a trace model
    pub const ALL: [LineKind; 11] = [
        Self::Task,
        Self::Isr,
        Self::Semaphore,
        Self::Queue,
        Self::Event,
        Self::Value,
        Self::Cycles,
        Self::Note,
        Self::Agent,
        Self::MemCycles,
        Self::Port,
    ];

    /// Map a protocol ordinal to a kind
    ///
    /// Ordinal 10 (CHANNEL) is a deprecated alias of QUEUE.
    pub fn from_ordinal(ordinal: u32) -> Option<Self> {
        Some(match ordinal {
            0 => Self::Task,
            1 => Self::Isr,
            2 => Self::Semaphore,
            3 | 10 => Self::Queue,
            4 => Self::Event,
            5 => Self::Value,
            6 => Self::Cycles,
            7 => Self::Note,
            8 => Self::Agent,
            9 => Self::MemCycles,
            11 => Self::Port,
            _ => return None,
        })
    }

    /// Protocol ordinal (CHANNEL lines report QUEUE's)
    pub fn ordinal(self) -> u32 {
        match self {
            Self::Task => 0,
            Self::Isr => 1,
            Self::Semaphore => 2,
            Self::Queue => 3,
            Self::Event => 4,
            Self::Value => 5,
            Self::Cycles => 6,
            Self::Note => 7,
            Self::Agent => 8,
            Self::MemCycles => 9,
            Self::Port => 11,
        }
    }

    /// Position of this kind's section in [`LineKind::ALL`]
    pub fn section_index(self) -> usize {
        Self::ALL
            .iter()
            .position(|k| *k == self)
            .unwrap_or_default()
    }

    /// Kinds reconstructed into nested START/STOP/SUSPEND/RESUME intervals
    pub fn is_stacked(self) -> bool {
        matches!(self, Self::Task | Self::Isr | Self::Agent)
    }

    /// Kinds whose raw values are 32-bit wrapping counters
    pub fn is_counter(self) -> bool {
        matches!(self, Self::Cycles | Self::MemCycles | Self::Value)
    }

    /// Kinds whose START broadcasts preemption to their peers
    pub fn preempts_peers(self) -> bool {
        matches!(self, Self::Task | Self::Isr)
    }

    /// Short label used in names and reports
    pub fn label(self) -> &'static str {
        match self {
            Self::Task => "TASK",
            Self::Isr => "ISR",
            Self::Semaphore => "SEMAPHORE",
            Self::Queue => "QUEUE",
            Self::Event => "EVENT",
            Self::Value => "VALUE",
            Self::Cycles => "CYCLES",
            Self::Note => "NOTE",
            Self::Agent => "AGENT",
            Self::MemCycles => "MEM_CYCLES",
            Self::Port => "PORT",
        }
    }
}

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of a description attached to a sample time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionKind {
    String,
    Number,
    Cycles,
    Color,
}

impl DescriptionKind {
    pub fn from_ordinal(ordinal: u32) -> Option<Self> {
        Some(match ordinal {
            0 => Self::String,
            1 => Self::Number,
            2 => Self::Cycles,
            3 => Self::Color,
            _ => return None,
        })
    }
}
