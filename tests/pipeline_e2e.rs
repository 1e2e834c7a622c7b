//! End-to-end pipeline tests over the in-memory store and a scripted
//! generation backend: grouping, variant fan-out with partial failure,
//! parent aggregation, and the feedback loop into combo selection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use lessonforge::config::ServiceConfig;
use lessonforge::error::GenerationError;
use lessonforge::feedback::{Alert, AlertSink, SinkError, SurveySink, TracingAlertSink};
use lessonforge::model::SessionFeedback;
use lessonforge::generation::{
    GenerationBackend, QuizQuestionsResult, ScriptResult, SlideScript,
};
use lessonforge::model::{
    LengthBucket, QuizQuestion, SessionMetrics, TaskContext, TaskKind, TaskPayload, TaskStatus,
};
use lessonforge::service::{PlatformService, SessionReport, TaskRequest};
use lessonforge::storage::{MemoryStore, Store};

/// Scripted backend with switchable failure modes and call counters.
struct ScriptedBackend {
    fail_script: bool,
    fail_media: bool,
    fail_quiz_questions: bool,
    question_shortfall: u32,
    script_calls: AtomicUsize,
    image_calls: AtomicUsize,
    speech_calls: AtomicUsize,
}

impl ScriptedBackend {
    fn healthy() -> Self {
        Self {
            fail_script: false,
            fail_media: false,
            fail_quiz_questions: false,
            question_shortfall: 0,
            script_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
            speech_calls: AtomicUsize::new(0),
        }
    }

    fn broken_script() -> Self {
        Self {
            fail_script: true,
            ..Self::healthy()
        }
    }

    fn broken_media() -> Self {
        Self {
            fail_media: true,
            ..Self::healthy()
        }
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate_script(
        &self,
        topic: &str,
        length_minutes: u32,
        _provider: &str,
        _model: &str,
    ) -> Result<ScriptResult, GenerationError> {
        self.script_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_script {
            return Err(GenerationError::ApiError {
                code: 500,
                message: "script model unavailable".to_string(),
            });
        }
        let num_slides = (length_minutes / 2).max(3);
        Ok(ScriptResult {
            script: format!("Lesson about {}", topic),
            slides: (1..=num_slides)
                .map(|n| SlideScript {
                    slide_number: n,
                    script: format!("Slide {} about {}", n, topic),
                })
                .collect(),
        })
    }

    async fn generate_image(
        &self,
        _slide_script: &str,
        slide_number: u32,
        _topic: &str,
        _provider: &str,
        _model: &str,
    ) -> Result<String, GenerationError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_media {
            return Err(GenerationError::RequestFailed("image service down".to_string()));
        }
        Ok(format!("https://cdn.test/image-{}.png", slide_number))
    }

    async fn generate_speech(
        &self,
        _text: &str,
        _voice: Option<&str>,
    ) -> Result<String, GenerationError> {
        self.speech_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_media {
            return Err(GenerationError::RequestFailed("speech service down".to_string()));
        }
        Ok("https://cdn.test/speech.mp3".to_string())
    }

    async fn generate_quiz_prompt(
        &self,
        topic: &str,
        question_type: &str,
        num_questions: u32,
        _provider: &str,
        _model: &str,
    ) -> Result<String, GenerationError> {
        Ok(format!(
            "Generate {} {} questions about {}",
            num_questions, question_type, topic
        ))
    }

    async fn generate_quiz_questions(
        &self,
        _prompt: &str,
        topic: &str,
        question_type: &str,
        num_questions: u32,
        _provider: &str,
        _model: &str,
    ) -> Result<QuizQuestionsResult, GenerationError> {
        if self.fail_quiz_questions {
            return Err(GenerationError::ApiError {
                code: 429,
                message: "rate limited".to_string(),
            });
        }
        let count = num_questions.saturating_sub(self.question_shortfall);
        Ok(QuizQuestionsResult {
            questions: (1..=count)
                .map(|n| QuizQuestion {
                    question: format!("Q{} about {}?", n, topic),
                    question_type: question_type.to_string(),
                    options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                    correct_answer: "A".to_string(),
                    explanation: None,
                })
                .collect(),
        })
    }
}

struct RecordingAlertSink {
    alerts: tokio::sync::Mutex<Vec<Alert>>,
}

#[async_trait]
impl AlertSink for RecordingAlertSink {
    async fn send(&self, alert: &Alert) -> Result<(), SinkError> {
        self.alerts.lock().await.push(alert.clone());
        Ok(())
    }
}

async fn seeded_class(store: &MemoryStore, learners: usize) -> (Uuid, Vec<Uuid>) {
    let class_id = Uuid::new_v4();
    let ids: Vec<Uuid> = (0..learners).map(|_| Uuid::new_v4()).collect();
    store.upsert_enrollment(class_id, &ids).await.unwrap();
    (class_id, ids)
}

fn service_with(
    store: Arc<MemoryStore>,
    backend: Arc<ScriptedBackend>,
    group_size: usize,
) -> PlatformService {
    let config = ServiceConfig::default().with_group_size(group_size);
    PlatformService::new(store, backend, Arc::new(TracingAlertSink), &config)
}

fn lesson_request(class_id: Uuid) -> TaskRequest {
    TaskRequest {
        class_id,
        kind: TaskKind::Lesson,
        topic: "Photosynthesis".to_string(),
        purpose: "introduction".to_string(),
        grade: "7".to_string(),
        subject: "biology".to_string(),
        length_minutes: 12,
        question_type: None,
        num_questions: None,
    }
}

fn context() -> TaskContext {
    TaskContext {
        kind: TaskKind::Lesson,
        topic: "Photosynthesis".to_string(),
        purpose: "introduction".to_string(),
        grade: "7".to_string(),
        subject: "biology".to_string(),
        length_bucket: LengthBucket::Medium,
    }
}

#[tokio::test]
async fn lesson_flow_completes_and_promotes_content() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(ScriptedBackend::healthy());
    let service = service_with(store.clone(), backend.clone(), 6);
    let (class_id, _) = seeded_class(&store, 14).await;

    let created = service.create_task(lesson_request(class_id)).await.unwrap();
    assert_eq!(created.group_count, 3);
    assert_eq!(created.task.status(), TaskStatus::Generating);

    let outcomes = service.generate_variants(created.task.id).await.unwrap();
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|o| o.status == TaskStatus::Completed));

    // 3 variants x 6 slides: one image and one speech call per slide.
    assert_eq!(backend.script_calls.load(Ordering::SeqCst), 3);
    assert_eq!(backend.image_calls.load(Ordering::SeqCst), 18);
    assert_eq!(backend.speech_calls.load(Ordering::SeqCst), 18);

    let parent = store.get_task(created.task.id).await.unwrap().unwrap();
    assert_eq!(parent.status(), TaskStatus::Completed);

    // The promoted payload is the earliest completed variant's content.
    let variants = store.list_variants(created.task.id).await.unwrap();
    let earliest = &variants[0];
    match (&parent.payload, &earliest.payload) {
        (TaskPayload::Lesson(parent_data), TaskPayload::Lesson(variant_data)) => {
            assert_eq!(parent_data.script, variant_data.script);
            assert_eq!(parent_data.slides.len(), 6);
            assert!(parent_data.slides.iter().all(|s| s.image_url.is_some()));
        }
        _ => panic!("expected lesson payloads"),
    }

    // Every group points at its variant.
    for group in store.list_groups(created.task.id).await.unwrap() {
        assert!(group.variant_task_id.is_some());
    }
}

#[tokio::test]
async fn script_failure_fails_variants_and_parent() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(ScriptedBackend::broken_script());
    let service = service_with(store.clone(), backend.clone(), 6);
    let (class_id, _) = seeded_class(&store, 10).await;

    let created = service.create_task(lesson_request(class_id)).await.unwrap();
    let outcomes = service.generate_variants(created.task.id).await.unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.status == TaskStatus::Failed));
    // Script failed before any fan-out started.
    assert_eq!(backend.image_calls.load(Ordering::SeqCst), 0);
    assert_eq!(backend.speech_calls.load(Ordering::SeqCst), 0);

    let parent = store.get_task(created.task.id).await.unwrap().unwrap();
    assert_eq!(parent.status(), TaskStatus::Failed);

    // Slides stay unset on failed variants.
    for variant in store.list_variants(created.task.id).await.unwrap() {
        match &variant.payload {
            TaskPayload::Lesson(data) => {
                assert!(data.script.is_none());
                assert!(data.slides.is_empty());
            }
            _ => panic!("expected lesson payload"),
        }
    }
}

#[tokio::test]
async fn media_failures_degrade_slides_not_variants() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(ScriptedBackend::broken_media());
    let service = service_with(store.clone(), backend, 6);
    let (class_id, _) = seeded_class(&store, 6).await;

    let created = service.create_task(lesson_request(class_id)).await.unwrap();
    let outcomes = service.generate_variants(created.task.id).await.unwrap();
    assert!(outcomes.iter().all(|o| o.status == TaskStatus::Completed));

    let variants = store.list_variants(created.task.id).await.unwrap();
    for variant in &variants {
        match &variant.payload {
            TaskPayload::Lesson(data) => {
                assert!(data.script.is_some());
                assert_eq!(data.slides.len(), 6);
                for slide in &data.slides {
                    assert!(slide.image_url.is_none());
                    assert!(slide.speech_url.is_none());
                }
            }
            _ => panic!("expected lesson payload"),
        }
    }

    let parent = store.get_task(created.task.id).await.unwrap().unwrap();
    assert_eq!(parent.status(), TaskStatus::Completed);
}

#[tokio::test]
async fn quiz_flow_with_shortfall_completes() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(ScriptedBackend {
        question_shortfall: 2,
        ..ScriptedBackend::healthy()
    });
    let service = service_with(store.clone(), backend, 6);
    let (class_id, _) = seeded_class(&store, 6).await;

    let created = service
        .create_task(TaskRequest {
            kind: TaskKind::Quiz,
            question_type: Some("MCQ".to_string()),
            num_questions: Some(5),
            ..lesson_request(class_id)
        })
        .await
        .unwrap();

    let outcomes = service.generate_variants(created.task.id).await.unwrap();
    assert!(outcomes.iter().all(|o| o.status == TaskStatus::Completed));

    let parent = store.get_task(created.task.id).await.unwrap().unwrap();
    assert_eq!(parent.status(), TaskStatus::Completed);
    match &parent.payload {
        TaskPayload::Quiz(data) => {
            assert!(data.prompt.is_some());
            // Shortfall is reported, not failed.
            assert_eq!(data.questions.len(), 3);
        }
        _ => panic!("expected quiz payload"),
    }
}

#[tokio::test]
async fn quiz_question_failure_fails_variant() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(ScriptedBackend {
        fail_quiz_questions: true,
        ..ScriptedBackend::healthy()
    });
    let service = service_with(store.clone(), backend, 6);
    let (class_id, _) = seeded_class(&store, 6).await;

    let created = service
        .create_task(TaskRequest {
            kind: TaskKind::Quiz,
            question_type: Some("MCQ".to_string()),
            num_questions: Some(5),
            ..lesson_request(class_id)
        })
        .await
        .unwrap();

    let outcomes = service.generate_variants(created.task.id).await.unwrap();
    assert!(outcomes.iter().all(|o| o.status == TaskStatus::Failed));

    let parent = store.get_task(created.task.id).await.unwrap().unwrap();
    assert_eq!(parent.status(), TaskStatus::Failed);
}

#[tokio::test]
async fn reconcile_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(ScriptedBackend::healthy());
    let service = service_with(store.clone(), backend, 6);
    let (class_id, _) = seeded_class(&store, 6).await;

    let created = service.create_task(lesson_request(class_id)).await.unwrap();
    service.generate_variants(created.task.id).await.unwrap();

    let first = service.reconcile(created.task.id).await.unwrap();
    let second = service.reconcile(created.task.id).await.unwrap();
    assert_eq!(first, TaskStatus::Completed);
    assert_eq!(first, second);
}

#[tokio::test]
async fn feedback_shifts_future_selection() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(ScriptedBackend::healthy());
    let service = service_with(store.clone(), backend, 6);
    let (class_id, learners) = seeded_class(&store, 6).await;

    // Strong sessions for the anthropic lesson combo from every learner.
    for learner in &learners {
        for _ in 0..3 {
            let outcome = service
                .complete_session(SessionReport {
                    learner_id: *learner,
                    class_id,
                    context: context(),
                    combo: "claude-sonnet".to_string(),
                    provider: "anthropic".to_string(),
                    model: "claude-3-7-sonnet-20250219".to_string(),
                    metrics: SessionMetrics {
                        average_focus_score: Some(95.0),
                        average_engagement_score: Some(92.0),
                        average_thinking_intensity: Some(60.0),
                        average_heart_rate: Some(80.0),
                        average_breathing_rate: Some(14.0),
                        heart_rate_std_dev: Some(3.0),
                        breathing_rate_std_dev: Some(1.0),
                        breathing_samples: vec![13.0, 14.0, 14.5],
                    },
                })
                .await;
            assert!(outcome.recorded);
        }
    }

    // A new task for the same class now selects the voted combo.
    let created = service.create_task(lesson_request(class_id)).await.unwrap();
    let groups = store.list_groups(created.task.id).await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].combo, "claude-sonnet");

    // The learned profile exists and carries the EMA state.
    let profiles = store.list_profiles().await.unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].session_count, 18);
    assert!(profiles[0].performance_score > 0.7);
}

struct RecordingSurveySink {
    submissions: AtomicUsize,
}

#[async_trait]
impl SurveySink for RecordingSurveySink {
    async fn submit(&self, _feedback: &SessionFeedback) -> Result<String, SinkError> {
        let n = self.submissions.fetch_add(1, Ordering::SeqCst);
        Ok(format!("survey-{}", n))
    }
}

#[tokio::test]
async fn survey_submission_id_is_attached() {
    let store = Arc::new(MemoryStore::new());
    let sink = Arc::new(RecordingSurveySink {
        submissions: AtomicUsize::new(0),
    });
    let config = ServiceConfig::default();
    let service = PlatformService::new(
        store.clone(),
        Arc::new(ScriptedBackend::healthy()),
        Arc::new(TracingAlertSink),
        &config,
    )
    .with_survey_sink(sink.clone());

    let learner = Uuid::new_v4();
    let outcome = service
        .complete_session(SessionReport {
            learner_id: learner,
            class_id: Uuid::new_v4(),
            context: context(),
            combo: "gemini-flash".to_string(),
            provider: "google".to_string(),
            model: "gemini-2.5-flash".to_string(),
            metrics: SessionMetrics {
                average_focus_score: Some(80.0),
                ..SessionMetrics::default()
            },
        })
        .await;

    assert!(outcome.recorded);
    assert_eq!(sink.submissions.load(Ordering::SeqCst), 1);

    let sessions = store
        .learner_sessions(learner, TaskKind::Lesson, "7", "biology", 10)
        .await
        .unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].survey_submission_id.as_deref(), Some("survey-0"));
}

#[tokio::test]
async fn degraded_session_emits_alerts() {
    let store = Arc::new(MemoryStore::new());
    let sink = Arc::new(RecordingAlertSink {
        alerts: tokio::sync::Mutex::new(Vec::new()),
    });
    let config = ServiceConfig::default();
    let service = PlatformService::new(
        store.clone(),
        Arc::new(ScriptedBackend::healthy()),
        sink.clone(),
        &config,
    );

    let outcome = service
        .complete_session(SessionReport {
            learner_id: Uuid::new_v4(),
            class_id: Uuid::new_v4(),
            context: context(),
            combo: "gemini-flash".to_string(),
            provider: "google".to_string(),
            model: "gemini-2.5-flash".to_string(),
            metrics: SessionMetrics {
                // Hard zeros drive clarity and engagement through the floor.
                average_focus_score: Some(0.0),
                average_engagement_score: Some(0.0),
                average_thinking_intensity: Some(0.0),
                average_heart_rate: Some(130.0),
                average_breathing_rate: Some(25.0),
                heart_rate_std_dev: Some(20.0),
                breathing_rate_std_dev: Some(10.0),
                breathing_samples: vec![18.0, 22.0, 26.0],
            },
        })
        .await;

    assert!(outcome.recorded);
    assert!(outcome.signals.clarity < 0.3);

    let alerts = sink.alerts.lock().await;
    let kinds: Vec<&str> = alerts.iter().map(|a| a.kind()).collect();
    assert!(kinds.contains(&"vitality_collapse"));
    assert!(kinds.contains(&"critical_threshold"));
}
