//! Command-line interface for lessonforge.
//!
//! Provides commands for task creation, variant generation, status repair,
//! feedback ingestion and profile inspection.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli, Commands};
