//! Prometheus-based monitoring.
//!
//! # Example
//!
//! ```ignore
//! use lessonforge::metrics::{export_metrics, init_metrics, MetricsCollector};
//!
//! init_metrics().expect("Failed to initialize metrics");
//!
//! let collector = MetricsCollector::new();
//! collector.record_generation_call("script", true);
//!
//! let metrics_text = export_metrics();
//! ```

pub mod collectors;
pub mod prometheus;

pub use collectors::MetricsCollector;
pub use prometheus::{export_metrics, init_metrics};

pub use prometheus::{
    ALERTS_TOTAL, FEEDBACK_SESSIONS_TOTAL, GENERATION_CALLS_TOTAL, PERFORMANCE_SCORE,
    QUESTION_COUNT_MISMATCH, REGISTRY, VARIANTS_TOTAL, VARIANT_DURATION,
};
