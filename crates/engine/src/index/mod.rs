//! Time-indexed storage of fragment manifests.

pub mod interval_tree;
mod segment_index;

pub use interval_tree::{Hit, IntervalTree};
pub use segment_index::{InsertOutcome, LookupError, ManifestRecord, SegmentManifestIndex};
