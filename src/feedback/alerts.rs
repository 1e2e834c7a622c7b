//! Alert evaluation.
//!
//! Stateless per-event checks over normalized feedback and profile deltas.
//! Alerts go to an external sink, fire-and-forget: sink failures are logged
//! and never propagate into the feedback pipeline that triggered them.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::metrics::MetricsCollector;
use crate::model::{FatigueTrend, SessionFeedback};

use super::scorer::ProfileUpdate;

/// Sessions that must precede an update before the regression check applies.
const REGRESSION_MIN_HISTORY: u64 = 5;

/// New score below this fraction of the previous score counts as a
/// regression.
const REGRESSION_RATIO: f64 = 0.8;

/// Errors from outbound sinks. Logged by callers, never propagated.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink request failed: {0}")]
    RequestFailed(String),

    #[error("Sink rejected payload: {0}")]
    Rejected(String),
}

/// Structured alert emitted to the external sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alert {
    /// Severely degraded session signals.
    VitalityCollapse {
        learner_id: Uuid,
        clarity: f64,
        engagement: f64,
        fatigue_trend: FatigueTrend,
    },
    /// One or more signals under their critical floor.
    CriticalThreshold {
        learner_id: Uuid,
        breached: Vec<String>,
    },
    /// A profile's score dropped sharply against its own history.
    Regression {
        profile_key: String,
        previous_score: f64,
        current_score: f64,
        session_count: u64,
    },
}

impl Alert {
    /// Metric label for this alert kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Alert::VitalityCollapse { .. } => "vitality_collapse",
            Alert::CriticalThreshold { .. } => "critical_threshold",
            Alert::Regression { .. } => "regression",
        }
    }
}

/// Fire-and-forget alert destination.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, alert: &Alert) -> Result<(), SinkError>;
}

/// Fire-and-forget survey submission. Returns the submission id assigned by
/// the external system.
#[async_trait]
pub trait SurveySink: Send + Sync {
    async fn submit(&self, feedback: &SessionFeedback) -> Result<String, SinkError>;
}

/// Sink that writes alerts to the log instead of an external service.
pub struct TracingAlertSink;

#[async_trait]
impl AlertSink for TracingAlertSink {
    async fn send(&self, alert: &Alert) -> Result<(), SinkError> {
        tracing::info!(kind = alert.kind(), alert = ?alert, "alert");
        Ok(())
    }
}

/// Evaluates each feedback event against the alert rules.
pub struct AlertEvaluator {
    sink: Arc<dyn AlertSink>,
    metrics: MetricsCollector,
}

impl AlertEvaluator {
    pub fn new(sink: Arc<dyn AlertSink>) -> Self {
        Self {
            sink,
            metrics: MetricsCollector::new(),
        }
    }

    /// Checks one event and emits any triggered alerts. Never fails: sink
    /// errors are logged and swallowed.
    pub async fn evaluate(&self, feedback: &SessionFeedback, update: Option<&ProfileUpdate>) {
        let alerts = collect_alerts(feedback, update);

        for alert in alerts {
            self.metrics.record_alert(alert.kind());
            if let Err(e) = self.sink.send(&alert).await {
                warn!(kind = alert.kind(), error = %e, "alert sink failed");
            }
        }
    }
}

/// All alerts triggered by one event, in check order.
pub fn collect_alerts(feedback: &SessionFeedback, update: Option<&ProfileUpdate>) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if let Some(alert) = check_vitality_collapse(feedback) {
        alerts.push(alert);
    }
    if let Some(alert) = check_critical_threshold(feedback) {
        alerts.push(alert);
    }
    if let Some(alert) = update.and_then(check_regression) {
        alerts.push(alert);
    }

    alerts
}

/// clarity < 0.3, engagement < 0.3, or rising fatigue with clarity < 0.4.
fn check_vitality_collapse(feedback: &SessionFeedback) -> Option<Alert> {
    let signals = &feedback.signals;
    let collapsed = signals.clarity < 0.3
        || signals.engagement < 0.3
        || (signals.fatigue_trend == FatigueTrend::Rising && signals.clarity < 0.4);

    collapsed.then(|| Alert::VitalityCollapse {
        learner_id: feedback.learner_id,
        clarity: signals.clarity,
        engagement: signals.engagement,
        fatigue_trend: signals.fatigue_trend,
    })
}

/// clarity < 0.25, engagement < 0.25 or confidence < 0.2, listing the
/// specific breached metrics.
fn check_critical_threshold(feedback: &SessionFeedback) -> Option<Alert> {
    let signals = &feedback.signals;
    let mut breached = Vec::new();

    if signals.clarity < 0.25 {
        breached.push(format!("clarity={:.2}", signals.clarity));
    }
    if signals.engagement < 0.25 {
        breached.push(format!("engagement={:.2}", signals.engagement));
    }
    if signals.confidence < 0.2 {
        breached.push(format!("confidence={:.2}", signals.confidence));
    }

    if breached.is_empty() {
        None
    } else {
        Some(Alert::CriticalThreshold {
            learner_id: feedback.learner_id,
            breached,
        })
    }
}

/// New score under 0.8x the previous score, with at least five sessions of
/// history before this update.
fn check_regression(update: &ProfileUpdate) -> Option<Alert> {
    let previous = update.previous_score?;
    let sessions_before = update.profile.session_count.saturating_sub(1);

    if sessions_before < REGRESSION_MIN_HISTORY {
        return None;
    }

    let current = update.profile.performance_score;
    (current < REGRESSION_RATIO * previous).then(|| Alert::Regression {
        profile_key: update.profile.key.storage_key(),
        previous_score: previous,
        current_score: current,
        session_count: update.profile.session_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        FeedbackSignals, LengthBucket, PerformanceProfile, ProfileKey, TaskContext, TaskKind,
    };
    use chrono::Utc;
    use tokio::sync::Mutex;

    struct RecordingSink {
        sent: Mutex<Vec<Alert>>,
        fail: bool,
    }

    impl RecordingSink {
        fn new(fail: bool) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl AlertSink for RecordingSink {
        async fn send(&self, alert: &Alert) -> Result<(), SinkError> {
            if self.fail {
                return Err(SinkError::RequestFailed("offline".to_string()));
            }
            self.sent.lock().await.push(alert.clone());
            Ok(())
        }
    }

    fn feedback_with(clarity: f64, engagement: f64, confidence: f64) -> SessionFeedback {
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
                clarity,
                engagement,
                cognitive_load: 0.5,
                attention_span: 0.5,
                confidence,
                fatigue_trend: FatigueTrend::Stable,
                fatigue_slope: 0.0,
            },
            focus: None,
            engagement: None,
            thinking: None,
            completed: true,
            survey_submission_id: None,
            created_at: Utc::now(),
        }
    }

    fn update_with(previous: Option<f64>, current: f64, sessions: u64) -> ProfileUpdate {
        let feedback = feedback_with(0.5, 0.5, 0.5);
        let mut profile = PerformanceProfile::first(
            ProfileKey::from_feedback(&feedback),
            &feedback,
        );
        profile.session_count = sessions;
        profile.performance_score = current;
        ProfileUpdate {
            profile,
            previous_score: previous,
        }
    }

    #[test]
    fn test_low_clarity_triggers_both_checks() {
        let alerts = collect_alerts(&feedback_with(0.2, 0.6, 0.5), None);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].kind(), "vitality_collapse");
        assert_eq!(alerts[1].kind(), "critical_threshold");
    }

    #[test]
    fn test_healthy_feedback_triggers_nothing() {
        let alerts = collect_alerts(&feedback_with(0.5, 0.6, 0.5), None);
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_rising_fatigue_lowers_collapse_bar() {
        let mut feedback = feedback_with(0.35, 0.6, 0.5);
        feedback.signals.fatigue_trend = FatigueTrend::Rising;
        let alerts = collect_alerts(&feedback, None);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind(), "vitality_collapse");
    }

    #[test]
    fn test_critical_threshold_lists_breached_metrics() {
        let alerts = collect_alerts(&feedback_with(0.2, 0.2, 0.1), None);
        let critical = alerts
            .iter()
            .find(|a| a.kind() == "critical_threshold")
            .unwrap();
        match critical {
            Alert::CriticalThreshold { breached, .. } => {
                assert_eq!(breached.len(), 3);
                assert!(breached[0].starts_with("clarity="));
            }
            _ => panic!("expected critical threshold alert"),
        }
    }

    #[test]
    fn test_regression_requires_history() {
        // 4 sessions before the update: no regression alert yet.
        let update = update_with(Some(0.8), 0.5, 5);
        assert!(check_regression(&update).is_none());

        // 5 sessions before the update: alert fires.
        let update = update_with(Some(0.8), 0.5, 6);
        let alert = check_regression(&update).unwrap();
        assert_eq!(alert.kind(), "regression");

        // Mild dip stays quiet.
        let update = update_with(Some(0.8), 0.7, 6);
        assert!(check_regression(&update).is_none());
    }

    #[tokio::test]
    async fn test_evaluator_sends_to_sink() {
        let sink = Arc::new(RecordingSink::new(false));
        let evaluator = AlertEvaluator::new(sink.clone());

        evaluator.evaluate(&feedback_with(0.2, 0.6, 0.5), None).await;
        assert_eq!(sink.sent.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_sink_failure_is_swallowed() {
        let sink = Arc::new(RecordingSink::new(true));
        let evaluator = AlertEvaluator::new(sink);

        // Must not panic or propagate.
        evaluator.evaluate(&feedback_with(0.1, 0.1, 0.1), None).await;
    }
}
