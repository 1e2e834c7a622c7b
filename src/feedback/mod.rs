//! Feedback pipeline: normalization, scoring and alerting.

pub mod alerts;
pub mod normalizer;
pub mod scorer;
pub mod vitals;

pub use alerts::{
    collect_alerts, Alert, AlertEvaluator, AlertSink, SinkError, SurveySink, TracingAlertSink,
};
pub use normalizer::{fatigue_slope, normalize};
pub use scorer::{
    compute_performance_score, PerformanceScorer, ProfileUpdate, EMA_ALPHA,
    FATIGUE_PENALTY_FACTOR, FATIGUE_PENALTY_THRESHOLD,
};
pub use vitals::VitalsProbe;
