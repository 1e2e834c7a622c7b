//! Session feedback records and normalized signals.
//!
//! `SessionMetrics` is the raw aggregated output of the vitals probe; every
//! field is optional because biometric capture degrades gracefully.
//! `FeedbackSignals` is the bounded, pedagogically-named view derived from
//! those metrics. `SessionFeedback` is the immutable per-session record the
//! scoring and selection subsystems read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::{LengthBucket, TaskKind};

/// Aggregated raw metrics for one learner session, as supplied by the
/// vitals probe. All fields are nullable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetrics {
    pub average_focus_score: Option<f64>,
    pub average_engagement_score: Option<f64>,
    pub average_thinking_intensity: Option<f64>,
    pub average_heart_rate: Option<f64>,
    pub average_breathing_rate: Option<f64>,
    pub heart_rate_std_dev: Option<f64>,
    pub breathing_rate_std_dev: Option<f64>,
    /// Per-sample breathing-rate series, used for the fatigue slope.
    #[serde(default)]
    pub breathing_samples: Vec<f64>,
}

/// Direction of fatigue over the course of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FatigueTrend {
    Rising,
    Stable,
    Falling,
}

impl FatigueTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            FatigueTrend::Rising => "rising",
            FatigueTrend::Stable => "stable",
            FatigueTrend::Falling => "falling",
        }
    }
}

impl std::fmt::Display for FatigueTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized feedback signals, each score in [0,1].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSignals {
    pub clarity: f64,
    pub engagement: f64,
    pub cognitive_load: f64,
    pub attention_span: f64,
    pub confidence: f64,
    pub fatigue_trend: FatigueTrend,
    /// Signed, unit-less slope of the per-sample fatigue indicator.
    pub fatigue_slope: f64,
}

/// Task context carried by feedback events and used as part of the
/// performance-profile key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskContext {
    pub kind: TaskKind,
    pub topic: String,
    pub purpose: String,
    pub grade: String,
    pub subject: String,
    pub length_bucket: LengthBucket,
}

/// One completed learner session. Immutable once written; only the survey
/// submission id may be attached afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFeedback {
    pub id: Uuid,
    pub learner_id: Uuid,
    pub class_id: Uuid,
    pub context: TaskContext,
    /// Catalogue combo name resolved for the session's content.
    pub combo: String,
    /// Provider/model of the combo's primary role, denormalized for the
    /// selection history queries.
    pub provider: String,
    pub model: String,
    pub signals: FeedbackSignals,
    /// Raw metric snapshot (0-100 scales) kept for selection scoring.
    pub focus: Option<f64>,
    pub engagement: Option<f64>,
    pub thinking: Option<f64>,
    pub completed: bool,
    pub survey_submission_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SessionFeedback {
    /// Combined selection score: 0.4·focus + 0.4·engagement + 0.2·thinking,
    /// on the raw 0-100 scales. Missing components contribute zero.
    pub fn combined_score(&self) -> f64 {
        0.4 * self.focus.unwrap_or(0.0)
            + 0.4 * self.engagement.unwrap_or(0.0)
            + 0.2 * self.thinking.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feedback_with(focus: Option<f64>, engagement: Option<f64>, thinking: Option<f64>) -> SessionFeedback {
        SessionFeedback {
            id: Uuid::new_v4(),
            learner_id: Uuid::new_v4(),
            class_id: Uuid::new_v4(),
            context: TaskContext {
                kind: TaskKind::Lesson,
                topic: "Photosynthesis".to_string(),
                purpose: "introduction".to_string(),
                grade: "7".to_string(),
                subject: "biology".to_string(),
                length_bucket: LengthBucket::Medium,
            },
            combo: "gemini-flash".to_string(),
            provider: "google".to_string(),
            model: "gemini-2.5-flash".to_string(),
            signals: FeedbackSignals {
                clarity: 0.5,
                engagement: 0.5,
                cognitive_load: 0.5,
                attention_span: 0.5,
                confidence: 0.5,
                fatigue_trend: FatigueTrend::Stable,
                fatigue_slope: 0.0,
            },
            focus,
            engagement,
            thinking,
            completed: true,
            survey_submission_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_combined_score_weights() {
        let fb = feedback_with(Some(80.0), Some(60.0), Some(50.0));
        assert!((fb.combined_score() - (0.4 * 80.0 + 0.4 * 60.0 + 0.2 * 50.0)).abs() < 1e-9);
    }

    #[test]
    fn test_combined_score_missing_components() {
        let fb = feedback_with(Some(100.0), None, None);
        assert!((fb.combined_score() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_session_metrics_json_names() {
        let json = r#"{"averageFocusScore": 88.0, "heartRateStdDev": 4.2}"#;
        let metrics: SessionMetrics = serde_json::from_str(json).unwrap();
        assert_eq!(metrics.average_focus_score, Some(88.0));
        assert_eq!(metrics.heart_rate_std_dev, Some(4.2));
        assert!(metrics.average_heart_rate.is_none());
        assert!(metrics.breathing_samples.is_empty());
    }
}
