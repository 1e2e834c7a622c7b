//! Cohort grouping: segmentation and group materialization.

pub mod orchestrator;
pub mod segmenter;

pub use orchestrator::{GroupingOrchestrator, GroupingOutcome};
pub use segmenter::{segment, segment_seeded, DEFAULT_GROUP_SIZE};
