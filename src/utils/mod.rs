//! Shared utility functions for lessonforge.

pub mod json_extraction;

pub use json_extraction::extract_json;
