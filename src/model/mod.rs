//! In-memory model of an ingested trace.
//!
//! - `kind`: entity and description kinds with their protocol ordinals
//! - `sample`: samples and descriptions
//! - `line`: per-entity time series and the reconstruction pass
//! - `section`: lines grouped by kind, resolved by `(owner, id)` at a time
//! - `trace`: owners, sections and trace-wide derived values

pub mod kind;
pub mod line;
pub mod sample;
pub mod section;
pub mod trace;

// Re-export main types
pub use kind::{DescriptionKind, LineKind};
pub use line::{Activation, LineRef, PortLink, SampleLine};
pub use sample::{Description, DescriptionContent, Sample, SampleKind, SampleValue};
pub use section::{Section, SectionList};
pub use trace::{Owner, TraceModel};
