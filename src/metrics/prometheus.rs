//! Prometheus metrics registration and export.
//!
//! Defines all Prometheus metrics used by lessonforge and provides functions
//! for initializing, registering, and exporting them.

use prometheus::{
    Counter, CounterVec, Encoder, Histogram, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all lessonforge metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Total variants resolved, labeled by status, kind and combo.
pub static VARIANTS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Variant pipeline duration in seconds, labeled by kind.
pub static VARIANT_DURATION: OnceLock<HistogramVec> = OnceLock::new();

/// Generation backend calls, labeled by step and status.
pub static GENERATION_CALLS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Quiz variants whose returned question count differed from the request.
pub static QUESTION_COUNT_MISMATCH: OnceLock<Counter> = OnceLock::new();

/// Feedback sessions processed, labeled by kind.
pub static FEEDBACK_SESSIONS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Distribution of derived performance scores.
pub static PERFORMANCE_SCORE: OnceLock<Histogram> = OnceLock::new();

/// Alerts emitted, labeled by alert kind.
pub static ALERTS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Initialize all metrics and register them with the registry.
///
/// Call once at application startup; repeat calls are harmless.
///
/// # Errors
///
/// Returns a `prometheus::Error` if metric registration fails.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let registry = Registry::new();

    let variants_total = CounterVec::new(
        Opts::new("lessonforge_variants_total", "Total variants resolved"),
        &["status", "kind", "combo"],
    )?;

    let variant_duration = HistogramVec::new(
        prometheus::HistogramOpts::new(
            "lessonforge_variant_duration_seconds",
            "Variant pipeline duration in seconds",
        )
        .buckets(vec![5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["kind"],
    )?;

    let generation_calls_total = CounterVec::new(
        Opts::new(
            "lessonforge_generation_calls_total",
            "Generation backend calls",
        ),
        &["step", "status"],
    )?;

    let question_count_mismatch = Counter::new(
        "lessonforge_question_count_mismatch_total",
        "Quiz variants with a question count differing from the request",
    )?;

    let feedback_sessions_total = CounterVec::new(
        Opts::new(
            "lessonforge_feedback_sessions_total",
            "Feedback sessions processed",
        ),
        &["kind"],
    )?;

    let performance_score = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "lessonforge_performance_score",
            "Distribution of derived performance scores",
        )
        .buckets(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]),
    )?;

    let alerts_total = CounterVec::new(
        Opts::new("lessonforge_alerts_total", "Alerts emitted"),
        &["kind"],
    )?;

    registry.register(Box::new(variants_total.clone()))?;
    registry.register(Box::new(variant_duration.clone()))?;
    registry.register(Box::new(generation_calls_total.clone()))?;
    registry.register(Box::new(question_count_mismatch.clone()))?;
    registry.register(Box::new(feedback_sessions_total.clone()))?;
    registry.register(Box::new(performance_score.clone()))?;
    registry.register(Box::new(alerts_total.clone()))?;

    // If any of these fail, metrics were already initialized (idempotent).
    let _ = REGISTRY.set(registry);
    let _ = VARIANTS_TOTAL.set(variants_total);
    let _ = VARIANT_DURATION.set(variant_duration);
    let _ = GENERATION_CALLS_TOTAL.set(generation_calls_total);
    let _ = QUESTION_COUNT_MISMATCH.set(question_count_mismatch);
    let _ = FEEDBACK_SESSIONS_TOTAL.set(feedback_sessions_total);
    let _ = PERFORMANCE_SCORE.set(performance_score);
    let _ = ALERTS_TOTAL.set(alerts_total);

    tracing::info!("Prometheus metrics initialized");

    Ok(())
}

/// Export all registered metrics in Prometheus text format.
pub fn export_metrics() -> String {
    let Some(registry) = REGISTRY.get() else {
        return "# Metrics not initialized. Call init_metrics() first.\n".to_string();
    };

    let encoder = TextEncoder::new();
    let metric_families = registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return format!("# Error encoding metrics: {}\n", e);
    }

    String::from_utf8(buffer)
        .unwrap_or_else(|e| format!("# Error converting metrics to UTF-8: {}\n", e))
}
