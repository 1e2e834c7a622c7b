//! Feedback normalization.
//!
//! Converts a session's aggregated raw metrics into the six bounded semantic
//! signals. Each signal is a weighted blend of two or three sub-signals, every
//! component clamped to [0,1]. A missing sub-metric contributes a neutral 0.5
//! for its component instead of propagating absence.

use crate::model::{FatigueTrend, FeedbackSignals, SessionMetrics};

const NEUTRAL: f64 = 0.5;

/// Breathing rate above this is treated as elevated for the fatigue trend.
const FATIGUE_BREATHING_RATE_THRESHOLD: f64 = 20.0;

/// Breathing-rate variability above this nudges the fatigue trend upward.
const FATIGUE_BREATHING_STDDEV_THRESHOLD: f64 = 3.0;

/// Heart-rate variability above this nudges the fatigue trend upward.
const FATIGUE_HEART_STDDEV_THRESHOLD: f64 = 8.0;

/// Derives all normalized signals from one session's metrics.
pub fn normalize(metrics: &SessionMetrics) -> FeedbackSignals {
    FeedbackSignals {
        clarity: clarity(metrics),
        engagement: engagement(metrics),
        cognitive_load: cognitive_load(metrics),
        attention_span: attention_span(metrics),
        confidence: confidence(metrics),
        fatigue_trend: fatigue_trend(metrics),
        fatigue_slope: fatigue_slope(&metrics.breathing_samples),
    }
}

/// clarity = 0.4·focus + 0.4·capped thinking + 0.2·breathing steadiness.
fn clarity(m: &SessionMetrics) -> f64 {
    let focus = scaled(m.average_focus_score, 100.0);
    let thinking = m
        .average_thinking_intensity
        .map(|v| (v.min(80.0) / 80.0).clamp(0.0, 1.0))
        .unwrap_or(NEUTRAL);
    let breathing = inverse_variability(m.breathing_rate_std_dev, 5.0);

    (0.4 * focus + 0.4 * thinking + 0.2 * breathing).clamp(0.0, 1.0)
}

/// engagement = 0.6·engagement + 0.2·heart-rate band + 0.2·heart steadiness.
fn engagement(m: &SessionMetrics) -> f64 {
    let engagement = scaled(m.average_engagement_score, 100.0);
    let band = m
        .average_heart_rate
        .map(|hr| match hr {
            v if (70.0..=90.0).contains(&v) => 1.0,
            v if (60.0..70.0).contains(&v) || (90.0..=100.0).contains(&v) => 0.8,
            _ => 0.5,
        })
        .unwrap_or(NEUTRAL);
    let steadiness = inverse_variability(m.heart_rate_std_dev, 10.0);

    (0.6 * engagement + 0.2 * band + 0.2 * steadiness).clamp(0.0, 1.0)
}

/// cognitiveLoad = 0.7·thinking + 0.3·variability blend.
fn cognitive_load(m: &SessionMetrics) -> f64 {
    let thinking = scaled(m.average_thinking_intensity, 100.0);
    let heart_var = variability(m.heart_rate_std_dev, 10.0);
    let breathing_var = variability(m.breathing_rate_std_dev, 5.0);

    (0.7 * thinking + 0.3 * (0.5 * heart_var + 0.5 * breathing_var)).clamp(0.0, 1.0)
}

/// attentionSpan = 0.6·focus + 0.4·stability blend (heart and breathing
/// steadiness, equally weighted).
fn attention_span(m: &SessionMetrics) -> f64 {
    let focus = scaled(m.average_focus_score, 100.0);
    let heart_stability = inverse_variability(m.heart_rate_std_dev, 10.0);
    let breathing_stability = inverse_variability(m.breathing_rate_std_dev, 5.0);

    (0.6 * focus + 0.4 * (0.5 * heart_stability + 0.5 * breathing_stability)).clamp(0.0, 1.0)
}

/// confidence = 0.4·focus + 0.4·engagement + 0.2·thinking band.
fn confidence(m: &SessionMetrics) -> f64 {
    let focus = scaled(m.average_focus_score, 100.0);
    let engagement = scaled(m.average_engagement_score, 100.0);
    let band = m
        .average_thinking_intensity
        .map(|t| match t {
            v if (40.0..=70.0).contains(&v) => 1.0,
            v if (30.0..40.0).contains(&v) || (70.0..=80.0).contains(&v) => 0.8,
            _ => 0.5,
        })
        .unwrap_or(NEUTRAL);

    (0.4 * focus + 0.4 * engagement + 0.2 * band).clamp(0.0, 1.0)
}

/// Buckets a fatigue score built up from elevated/variable breathing and
/// heart-rate variability: >0.7 rising, <0.3 falling, else stable.
fn fatigue_trend(m: &SessionMetrics) -> FatigueTrend {
    let mut score = NEUTRAL;

    if let Some(breathing) = m.average_breathing_rate {
        if breathing > FATIGUE_BREATHING_RATE_THRESHOLD {
            score += 0.2;
        }
    }
    if let Some(std_dev) = m.breathing_rate_std_dev {
        if std_dev > FATIGUE_BREATHING_STDDEV_THRESHOLD {
            score += 0.1;
        }
    }
    if let Some(std_dev) = m.heart_rate_std_dev {
        if std_dev > FATIGUE_HEART_STDDEV_THRESHOLD {
            score += 0.1;
        }
    }

    if score > 0.7 {
        FatigueTrend::Rising
    } else if score < 0.3 {
        FatigueTrend::Falling
    } else {
        FatigueTrend::Stable
    }
}

/// Least-squares slope of the per-sample fatigue indicator over sample
/// index. Requires at least two samples; returns 0 otherwise.
pub fn fatigue_slope(samples: &[f64]) -> f64 {
    let n = samples.len();
    if n < 2 {
        return 0.0;
    }

    let n_f = n as f64;
    let mean_x = (n_f - 1.0) / 2.0;
    let mean_y = samples.iter().sum::<f64>() / n_f;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, y) in samples.iter().enumerate() {
        let dx = i as f64 - mean_x;
        numerator += dx * (y - mean_y);
        denominator += dx * dx;
    }

    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Scales a 0-`max` metric into [0,1]; missing gives the neutral 0.5.
fn scaled(value: Option<f64>, max: f64) -> f64 {
    value.map(|v| (v / max).clamp(0.0, 1.0)).unwrap_or(NEUTRAL)
}

/// Normalized variability in [0,1]: std-dev over its comfortable span.
fn variability(std_dev: Option<f64>, span: f64) -> f64 {
    std_dev
        .map(|v| (v / span).clamp(0.0, 1.0))
        .unwrap_or(NEUTRAL)
}

/// Steadiness complement of [`variability`], floored at zero.
fn inverse_variability(std_dev: Option<f64>, span: f64) -> f64 {
    std_dev
        .map(|v| (1.0 - v / span).max(0.0).clamp(0.0, 1.0))
        .unwrap_or(NEUTRAL)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> SessionMetrics {
        SessionMetrics::default()
    }

    #[test]
    fn test_clarity_blend() {
        let signals = normalize(&SessionMetrics {
            average_focus_score: Some(100.0),
            average_thinking_intensity: Some(60.0),
            breathing_rate_std_dev: Some(0.0),
            ..metrics()
        });
        // 0.4·1.0 + 0.4·(60/80) + 0.2·1.0
        assert!((signals.clarity - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_missing_metrics_are_neutral() {
        let signals = normalize(&metrics());
        assert!((signals.clarity - 0.5).abs() < 1e-9);
        assert!((signals.engagement - 0.5).abs() < 1e-9);
        assert!((signals.cognitive_load - 0.5).abs() < 1e-9);
        assert!((signals.attention_span - 0.5).abs() < 1e-9);
        assert!((signals.confidence - 0.5).abs() < 1e-9);
        assert_eq!(signals.fatigue_trend, FatigueTrend::Stable);
        assert_eq!(signals.fatigue_slope, 0.0);
    }

    #[test]
    fn test_outliers_stay_bounded() {
        let signals = normalize(&SessionMetrics {
            average_focus_score: Some(10_000.0),
            average_engagement_score: Some(9_999.0),
            average_thinking_intensity: Some(400.0),
            average_heart_rate: Some(260.0),
            average_breathing_rate: Some(90.0),
            heart_rate_std_dev: Some(120.0),
            breathing_rate_std_dev: Some(55.0),
            breathing_samples: vec![10.0, 90.0],
        });
        for value in [
            signals.clarity,
            signals.engagement,
            signals.cognitive_load,
            signals.attention_span,
            signals.confidence,
        ] {
            assert!((0.0..=1.0).contains(&value), "signal out of range: {}", value);
        }
    }

    #[test]
    fn test_engagement_heart_rate_bands() {
        let base = SessionMetrics {
            average_engagement_score: Some(100.0),
            heart_rate_std_dev: Some(0.0),
            ..metrics()
        };

        let in_band = normalize(&SessionMetrics {
            average_heart_rate: Some(80.0),
            ..base.clone()
        });
        let near_band = normalize(&SessionMetrics {
            average_heart_rate: Some(65.0),
            ..base.clone()
        });
        let out_of_band = normalize(&SessionMetrics {
            average_heart_rate: Some(130.0),
            ..base
        });

        assert!((in_band.engagement - 1.0).abs() < 1e-9);
        assert!((near_band.engagement - 0.96).abs() < 1e-9);
        assert!((out_of_band.engagement - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_thinking_bands() {
        let base = SessionMetrics {
            average_focus_score: Some(100.0),
            average_engagement_score: Some(100.0),
            ..metrics()
        };

        let comfortable = normalize(&SessionMetrics {
            average_thinking_intensity: Some(55.0),
            ..base.clone()
        });
        let edge = normalize(&SessionMetrics {
            average_thinking_intensity: Some(35.0),
            ..base.clone()
        });
        let extreme = normalize(&SessionMetrics {
            average_thinking_intensity: Some(95.0),
            ..base
        });

        assert!((comfortable.confidence - 1.0).abs() < 1e-9);
        assert!((edge.confidence - 0.96).abs() < 1e-9);
        assert!((extreme.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_fatigue_trend_rising() {
        let signals = normalize(&SessionMetrics {
            average_breathing_rate: Some(24.0),
            breathing_rate_std_dev: Some(4.0),
            heart_rate_std_dev: Some(9.0),
            ..metrics()
        });
        assert_eq!(signals.fatigue_trend, FatigueTrend::Rising);
    }

    #[test]
    fn test_fatigue_trend_stable_at_rest() {
        let signals = normalize(&SessionMetrics {
            average_breathing_rate: Some(14.0),
            breathing_rate_std_dev: Some(1.0),
            heart_rate_std_dev: Some(3.0),
            ..metrics()
        });
        assert_eq!(signals.fatigue_trend, FatigueTrend::Stable);
    }

    #[test]
    fn test_fatigue_slope_regression() {
        // Perfectly linear rise of 2 per sample.
        assert!((fatigue_slope(&[10.0, 12.0, 14.0, 16.0]) - 2.0).abs() < 1e-9);
        // Flat series.
        assert!(fatigue_slope(&[15.0, 15.0, 15.0]).abs() < 1e-9);
        // Declining series.
        assert!(fatigue_slope(&[20.0, 18.0, 16.0]) < 0.0);
    }

    #[test]
    fn test_fatigue_slope_needs_two_samples() {
        assert_eq!(fatigue_slope(&[]), 0.0);
        assert_eq!(fatigue_slope(&[17.0]), 0.0);
    }
}
