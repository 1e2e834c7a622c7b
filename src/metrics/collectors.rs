//! High-level metric recording.
//!
//! `MetricsCollector` wraps the raw Prometheus metrics and provides
//! convenient methods for the hot paths. Every method is a no-op when
//! metrics have not been initialized, so library callers need no guards.

use std::time::Duration;

use super::prometheus::{
    ALERTS_TOTAL, FEEDBACK_SESSIONS_TOTAL, GENERATION_CALLS_TOTAL, PERFORMANCE_SCORE,
    QUESTION_COUNT_MISMATCH, VARIANTS_TOTAL, VARIANT_DURATION,
};

/// Metrics collector for lessonforge operational metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    pub fn new() -> Self {
        Self
    }

    /// Records a resolved variant.
    pub fn record_variant(&self, status: &str, kind: &str, combo: &str, duration: Duration) {
        if let Some(counter) = VARIANTS_TOTAL.get() {
            counter.with_label_values(&[status, kind, combo]).inc();
        }
        if let Some(histogram) = VARIANT_DURATION.get() {
            histogram
                .with_label_values(&[kind])
                .observe(duration.as_secs_f64());
        }
    }

    /// Records one generation backend call.
    pub fn record_generation_call(&self, step: &str, success: bool) {
        if let Some(counter) = GENERATION_CALLS_TOTAL.get() {
            let status = if success { "success" } else { "failure" };
            counter.with_label_values(&[step, status]).inc();
        }
    }

    /// Records a quiz question-count mismatch.
    pub fn record_question_count_mismatch(&self) {
        if let Some(counter) = QUESTION_COUNT_MISMATCH.get() {
            counter.inc();
        }
    }

    /// Records a processed feedback session and its derived score.
    pub fn record_feedback(&self, kind: &str, performance_score: f64) {
        if let Some(counter) = FEEDBACK_SESSIONS_TOTAL.get() {
            counter.with_label_values(&[kind]).inc();
        }
        if let Some(histogram) = PERFORMANCE_SCORE.get() {
            histogram.observe(performance_score);
        }
    }

    /// Records an emitted alert.
    pub fn record_alert(&self, kind: &str) {
        if let Some(counter) = ALERTS_TOTAL.get() {
            counter.with_label_values(&[kind]).inc();
        }
    }
}
