//! Top-level service composition.
//!
//! `PlatformService` wires the store, the generation backend and the outbound
//! sinks into the two flows the platform runs:
//!
//! - **Content**: create a parent task, group its class into cohorts, run one
//!   variant pipeline per cohort, reconcile the parent.
//! - **Feedback**: turn a completed session's raw metrics into normalized
//!   signals, update the performance profile and evaluate alerts.
//!
//! Task creation returns as soon as groups are persisted; the parent reports
//! `generating` while variants resolve. The feedback flow never fails the
//! session-completion request: scoring is an enrichment, failures are logged
//! and skipped.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::error::{GroupingError, VariantError};
use crate::feedback::{
    normalize, AlertEvaluator, AlertSink, PerformanceScorer, SurveySink,
};
use crate::generation::{
    aggregator, GenerationBackend, VariantConfig, VariantGenerator, VariantOutcome,
};
use crate::grouping::GroupingOrchestrator;
use crate::metrics::MetricsCollector;
use crate::model::{
    FeedbackSignals, LessonData, QuizData, SessionFeedback, SessionMetrics, Task, TaskContext,
    TaskKind, TaskPayload, TaskStatus,
};
use crate::selection::{ComboSelector, RecommendationCache};
use crate::storage::Store;

/// Request to create a parent task.
#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub class_id: Uuid,
    pub kind: TaskKind,
    pub topic: String,
    pub purpose: String,
    pub grade: String,
    pub subject: String,
    pub length_minutes: u32,
    /// Quiz tasks only; defaults to "MCQ".
    pub question_type: Option<String>,
    /// Quiz tasks only; defaults to 5.
    pub num_questions: Option<u32>,
}

/// Result of task creation, returned before any generation completes.
#[derive(Debug)]
pub struct CreatedTask {
    pub task: Task,
    pub group_count: usize,
    pub message: String,
}

/// One completed learner session, as reported by the session layer.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub learner_id: Uuid,
    pub class_id: Uuid,
    pub context: TaskContext,
    pub combo: String,
    pub provider: String,
    pub model: String,
    pub metrics: SessionMetrics,
}

/// Outcome of processing one session report.
#[derive(Debug)]
pub struct SessionOutcome {
    pub signals: FeedbackSignals,
    /// False when persistence failed and the event was skipped.
    pub recorded: bool,
    pub performance_score: Option<f64>,
}

/// Composed lessonforge service.
pub struct PlatformService {
    store: Arc<dyn Store>,
    grouping: GroupingOrchestrator,
    variants: VariantGenerator,
    scorer: PerformanceScorer,
    alerts: AlertEvaluator,
    survey: Option<Arc<dyn SurveySink>>,
    metrics: MetricsCollector,
}

impl PlatformService {
    pub fn new(
        store: Arc<dyn Store>,
        backend: Arc<dyn GenerationBackend>,
        alert_sink: Arc<dyn AlertSink>,
        config: &ServiceConfig,
    ) -> Self {
        let selector = Arc::new(ComboSelector::with_cache(
            store.clone(),
            RecommendationCache::new(config.cache_max_entries, config.cache_ttl),
        ));
        let grouping = GroupingOrchestrator::new(store.clone(), selector, config.group_size);
        let variants = VariantGenerator::new(
            store.clone(),
            backend,
            VariantConfig {
                max_concurrent_variants: config.max_concurrent_variants,
                call_timeout: config.call_timeout,
                speech_voice: config.speech_voice.clone(),
            },
        );
        let scorer = PerformanceScorer::new(store.clone());
        let alerts = AlertEvaluator::new(alert_sink);

        Self {
            store,
            grouping,
            variants,
            scorer,
            alerts,
            survey: None,
            metrics: MetricsCollector::new(),
        }
    }

    /// Attaches an outbound survey sink. Submissions are fire-and-forget.
    pub fn with_survey_sink(mut self, sink: Arc<dyn SurveySink>) -> Self {
        self.survey = Some(sink);
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Creates a parent task and its cohort groups. Returns immediately with
    /// the parent in `generating` status and the group count; variants are
    /// driven separately by [`Self::generate_variants`].
    pub async fn create_task(&self, request: TaskRequest) -> Result<CreatedTask, GroupingError> {
        let payload = match request.kind {
            TaskKind::Lesson => TaskPayload::Lesson(LessonData {
                status: TaskStatus::Generating,
                ..Default::default()
            }),
            TaskKind::Quiz => {
                let mut data = QuizData::new(
                    request.question_type.as_deref().unwrap_or("MCQ"),
                    request.num_questions.unwrap_or(5),
                );
                data.status = TaskStatus::Generating;
                TaskPayload::Quiz(data)
            }
        };

        let task = Task::new_parent(
            request.class_id,
            request.topic,
            request.purpose,
            request.grade,
            request.subject,
            request.length_minutes,
            payload,
        );
        self.store.insert_task(&task).await?;

        let outcome = self
            .grouping
            .create_groups_for_task(task.id, request.class_id)
            .await?;

        info!(
            task = %task.id,
            kind = %task.kind(),
            groups = outcome.groups.len(),
            "task created"
        );

        Ok(CreatedTask {
            task,
            group_count: outcome.groups.len(),
            message: outcome.message,
        })
    }

    /// Runs every pending variant of a parent task to a terminal state, then
    /// reconciles the parent from the full sibling set.
    pub async fn generate_variants(
        &self,
        task_id: Uuid,
    ) -> Result<Vec<VariantOutcome>, VariantError> {
        let outcomes = self.variants.run_variants(task_id).await?;
        aggregator::reconcile(&self.store, task_id).await?;
        Ok(outcomes)
    }

    /// Standalone repair path: re-derives a parent's status from its
    /// variants. Shares the aggregation rule with the inline hook.
    pub async fn reconcile(&self, task_id: Uuid) -> Result<TaskStatus, VariantError> {
        aggregator::reconcile(&self.store, task_id).await
    }

    /// Processes one completed session: normalize, persist, score, alert,
    /// submit survey. Never returns an error; failures downgrade the outcome
    /// and are logged.
    pub async fn complete_session(&self, report: SessionReport) -> SessionOutcome {
        let signals = normalize(&report.metrics);

        let feedback = SessionFeedback {
            id: Uuid::new_v4(),
            learner_id: report.learner_id,
            class_id: report.class_id,
            context: report.context,
            combo: report.combo,
            provider: report.provider,
            model: report.model,
            signals: signals.clone(),
            focus: report.metrics.average_focus_score,
            engagement: report.metrics.average_engagement_score,
            thinking: report.metrics.average_thinking_intensity,
            completed: true,
            survey_submission_id: None,
            created_at: Utc::now(),
        };

        if let Err(e) = self.store.insert_feedback(&feedback).await {
            warn!(learner = %feedback.learner_id, error = %e, "feedback not recorded, skipping");
            return SessionOutcome {
                signals,
                recorded: false,
                performance_score: None,
            };
        }

        let update = match self.scorer.update_profile(&feedback).await {
            Ok(update) => {
                self.metrics.record_feedback(
                    feedback.context.kind.as_str(),
                    update.profile.performance_score,
                );
                Some(update)
            }
            Err(e) => {
                warn!(error = %e, "profile update failed, feedback kept without scoring");
                None
            }
        };

        self.alerts.evaluate(&feedback, update.as_ref()).await;

        if let Some(sink) = &self.survey {
            match sink.submit(&feedback).await {
                Ok(submission_id) => {
                    if let Err(e) = self
                        .store
                        .set_feedback_survey_id(feedback.id, &submission_id)
                        .await
                    {
                        warn!(error = %e, "survey submission id not attached");
                    }
                }
                Err(e) => warn!(error = %e, "survey submission failed"),
            }
        }

        SessionOutcome {
            signals,
            recorded: true,
            performance_score: update.map(|u| u.profile.performance_score),
        }
    }
}
