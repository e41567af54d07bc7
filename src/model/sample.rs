//! Time-stamped samples and descriptions.
//!
//! A sample's payload depends on the line it belongs to and on whether the
//! reconstruction pass has run, so it is modelled as a tagged [`SampleValue`]
//! instead of one overloaded number.

use super::kind::DescriptionKind;
use serde::{Deserialize, Serialize};

/// What happened at a sample's time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    Start,
    Stop,
    Suspend,
    Resume,
    Event,
    End,
}

/// Payload of a sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleValue {
    /// No payload (OCC events, lines without samples)
    Absent,

    /// Raw magnitude, corrected counter value or semaphore count
    Magnitude(f64),

    /// Index of the sample that closes this START/SUSPEND
    Link(usize),

    /// Color of the interval this STOP/RESUME closes
    Color(String),

    /// Queue operation: filling level and the low 32 bits of the raw value
    Queue { depth: u32, size: u32 },
}

impl SampleValue {
    /// Split a packed queue value (high 32 bits = filling level)
    pub fn from_packed(raw: u64) -> Self {
        Self::Queue {
            depth: (raw >> 32) as u32,
            size: raw as u32,
        }
    }

    /// Numeric reading of the payload, if it has one
    ///
    /// Queue samples read as their filling level.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Magnitude(v) => Some(*v),
            Self::Queue { depth, .. } => Some(f64::from(*depth)),
            Self::Absent | Self::Link(_) | Self::Color(_) => None,
        }
    }

    pub fn link(&self) -> Option<usize> {
        match self {
            Self::Link(index) => Some(*index),
            _ => None,
        }
    }

    pub fn color(&self) -> Option<&str> {
        match self {
            Self::Color(color) => Some(color),
            _ => None,
        }
    }
}

/// One time-stamped data unit of a line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub kind: SampleKind,
    pub time: f64,
    pub value: SampleValue,
}

impl Sample {
    pub fn new(kind: SampleKind, time: f64, value: SampleValue) -> Self {
        Self { kind, time, value }
    }
}

/// Payload of a description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionContent {
    Text(String),
    Number(f64),
    /// Cycle count already divided by the owner's clock rate
    Cycles(f64),
    Color(String),
}

/// Annotation attached to the time of a line's most recent sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Description {
    pub time: f64,
    pub id: i64,
    pub content: DescriptionContent,
}

impl Description {
    pub fn kind(&self) -> DescriptionKind {
        match self.content {
            DescriptionContent::Text(_) => DescriptionKind::String,
            DescriptionContent::Number(_) => DescriptionKind::Number,
            DescriptionContent::Cycles(_) => DescriptionKind::Cycles,
            DescriptionContent::Color(_) => DescriptionKind::Color,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            DescriptionContent::Text(text) | DescriptionContent::Color(text) => Some(text),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self.content {
            DescriptionContent::Number(v) | DescriptionContent::Cycles(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_queue_value() {
        let value = SampleValue::from_packed((3u64 << 32) | 16);
        assert_eq!(value, SampleValue::Queue { depth: 3, size: 16 });
        assert_eq!(value.as_f64(), Some(3.0));
    }

    #[test]
    fn test_link_has_no_magnitude() {
        assert_eq!(SampleValue::Link(4).as_f64(), None);
        assert_eq!(SampleValue::Link(4).link(), Some(4));
    }

    #[test]
    fn test_description_accessors() {
        let d = Description {
            time: 1.0,
            id: 7,
            content: DescriptionContent::Color("red".to_string()),
        };
        assert_eq!(d.kind(), DescriptionKind::Color);
        assert_eq!(d.text(), Some("red"));
        assert_eq!(d.value(), None);
    }
}
