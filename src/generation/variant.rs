//! Variant generation state machine.
//!
//! One variant task per group, driven `pending -> generating -> completed |
//! failed`. All variants of a task run concurrently and independently: a
//! failure in one never cancels its siblings. Within a lesson variant the
//! image fan and the speech fan run concurrently with each other, one call
//! per slide, and every per-slide call is individually caught so a partial
//! media failure degrades the slide, not the variant. Required steps (script,
//! quiz prompt, quiz questions) propagate and fail the variant. Terminal
//! states are final; retries belong to the generation backend, not here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{GenerationError, VariantError};
use crate::metrics::MetricsCollector;
use crate::model::{
    Combo, ComboRoles, Group, LessonData, QuizData, Slide, Task, TaskPayload, TaskStatus,
};
use crate::selection::catalogue;
use crate::storage::Store;

use super::backend::GenerationBackend;

/// Configuration for the variant generator.
#[derive(Debug, Clone)]
pub struct VariantConfig {
    /// Maximum number of variants generating at once.
    pub max_concurrent_variants: usize,
    /// Bound applied to every individual backend call; a timeout counts as
    /// a call failure.
    pub call_timeout: Duration,
    /// Narration voice override for speech generation.
    pub speech_voice: Option<String>,
}

impl Default for VariantConfig {
    fn default() -> Self {
        Self {
            max_concurrent_variants: 4,
            call_timeout: Duration::from_secs(180),
            speech_voice: None,
        }
    }
}

/// Result of driving one variant to a terminal state.
#[derive(Debug, Clone)]
pub struct VariantOutcome {
    pub variant_id: Uuid,
    pub group_number: u32,
    pub combo: String,
    pub status: TaskStatus,
    pub error: Option<String>,
    pub duration: Duration,
}

/// Drives variant tasks through their generation pipelines.
pub struct VariantGenerator {
    store: Arc<dyn Store>,
    backend: Arc<dyn GenerationBackend>,
    config: VariantConfig,
    limiter: Arc<Semaphore>,
    metrics: MetricsCollector,
}

impl VariantGenerator {
    pub fn new(
        store: Arc<dyn Store>,
        backend: Arc<dyn GenerationBackend>,
        config: VariantConfig,
    ) -> Self {
        let limiter = Arc::new(Semaphore::new(config.max_concurrent_variants.max(1)));
        Self {
            store,
            backend,
            config,
            limiter,
            metrics: MetricsCollector::new(),
        }
    }

    /// Creates a variant task for every group of `parent_id` that does not
    /// have one yet, then runs all of them to a terminal state. Siblings are
    /// attempted regardless of each other's outcome.
    ///
    /// # Errors
    ///
    /// Fails before any generation starts on precondition problems: unknown
    /// task, non-parent task, a group bound to a combo missing from the
    /// catalogue, or a persistence failure while materializing variants.
    pub async fn run_variants(&self, parent_id: Uuid) -> Result<Vec<VariantOutcome>, VariantError> {
        let parent = self
            .store
            .get_task(parent_id)
            .await?
            .ok_or(VariantError::TaskNotFound(parent_id))?;

        if !parent.is_parent() {
            return Err(VariantError::NotAParentTask(parent_id));
        }

        let groups = self.store.list_groups(parent_id).await?;
        let mut planned: Vec<(Group, Task, Combo)> = Vec::with_capacity(groups.len());

        for group in groups {
            let combo = catalogue::find(parent.kind(), &group.combo).ok_or_else(|| {
                VariantError::UnknownCombo {
                    name: group.combo.clone(),
                    kind: parent.kind().to_string(),
                }
            })?;

            // A group whose variant already exists is left alone; run_variants
            // is safe to call again after a crash.
            if group.variant_task_id.is_some() {
                continue;
            }

            let variant = Task::new_variant(&parent, group.id, &group.combo);
            self.store.insert_task(&variant).await?;
            self.store.set_group_variant(group.id, variant.id).await?;
            planned.push((group, variant, combo));
        }

        info!(parent = %parent_id, variants = planned.len(), "running variant pipelines");

        let outcomes = join_all(
            planned
                .iter()
                .map(|(group, variant, combo)| self.run_variant(&parent, group, variant, combo)),
        )
        .await;

        Ok(outcomes)
    }

    /// Runs a single variant to `completed` or `failed`. Never returns an
    /// error: failures are folded into the outcome so siblings keep running.
    async fn run_variant(
        &self,
        parent: &Task,
        group: &Group,
        variant: &Task,
        combo: &Combo,
    ) -> VariantOutcome {
        let started = Instant::now();
        let mut outcome = VariantOutcome {
            variant_id: variant.id,
            group_number: group.group_number,
            combo: combo.name.clone(),
            status: TaskStatus::Pending,
            error: None,
            duration: Duration::ZERO,
        };

        let _permit = self
            .limiter
            .acquire()
            .await
            .expect("variant limiter closed");

        if let Err(e) = self
            .store
            .update_task_status(variant.id, TaskStatus::Generating)
            .await
        {
            outcome.status = TaskStatus::Failed;
            outcome.error = Some(e.to_string());
            outcome.duration = started.elapsed();
            return outcome;
        }

        let result: Result<TaskPayload, VariantError> = match &combo.roles {
            ComboRoles::Lesson { script, image } => self
                .run_lesson_pipeline(parent, script, image)
                .await
                .map(TaskPayload::Lesson),
            ComboRoles::Quiz { prompt, questions } => self
                .run_quiz_pipeline(parent, variant, prompt, questions)
                .await
                .map(TaskPayload::Quiz),
        };

        outcome.duration = started.elapsed();

        match result {
            Ok(mut payload) => {
                payload.set_status(TaskStatus::Completed);
                match self.store.update_task_payload(variant.id, &payload).await {
                    Ok(()) => {
                        outcome.status = TaskStatus::Completed;
                        info!(
                            variant = %variant.id,
                            group = group.group_number,
                            combo = %combo.name,
                            "variant completed"
                        );
                    }
                    Err(e) => {
                        outcome.status = TaskStatus::Failed;
                        outcome.error = Some(e.to_string());
                        self.mark_failed(variant.id).await;
                    }
                }
            }
            Err(e) => {
                warn!(
                    variant = %variant.id,
                    group = group.group_number,
                    error = %e,
                    "variant failed"
                );
                outcome.status = TaskStatus::Failed;
                outcome.error = Some(e.to_string());
                self.mark_failed(variant.id).await;
            }
        }

        self.metrics.record_variant(
            outcome.status.as_str(),
            parent.kind().as_str(),
            &combo.name,
            outcome.duration,
        );

        outcome
    }

    async fn mark_failed(&self, variant_id: Uuid) {
        if let Err(e) = self
            .store
            .update_task_status(variant_id, TaskStatus::Failed)
            .await
        {
            error!(variant = %variant_id, error = %e, "failed to persist failed status");
        }
    }

    /// Lesson pipeline: one required script call, then per-slide image and
    /// speech fans settling independently.
    async fn run_lesson_pipeline(
        &self,
        parent: &Task,
        script_model: &crate::model::ModelRef,
        image_model: &crate::model::ModelRef,
    ) -> Result<LessonData, VariantError> {
        let script = self
            .timed(
                "script",
                self.backend.generate_script(
                    &parent.topic,
                    parent.length_minutes,
                    &script_model.provider,
                    &script_model.model,
                ),
            )
            .await?;

        let voice = self.config.speech_voice.as_deref();

        let image_fan = join_all(script.slides.iter().map(|slide| async move {
            match self
                .timed(
                    "image",
                    self.backend.generate_image(
                        &slide.script,
                        slide.slide_number,
                        &parent.topic,
                        &image_model.provider,
                        &image_model.model,
                    ),
                )
                .await
            {
                Ok(url) if !url.is_empty() => Some(url),
                Ok(_) => None,
                Err(e) => {
                    warn!(
                        slide = slide.slide_number,
                        error = %e,
                        "image generation failed, slide keeps no image"
                    );
                    None
                }
            }
        }));

        let speech_fan = join_all(script.slides.iter().map(|slide| async move {
            match self
                .timed("speech", self.backend.generate_speech(&slide.script, voice))
                .await
            {
                Ok(url) if !url.is_empty() => Some(url),
                Ok(_) => None,
                Err(e) => {
                    warn!(
                        slide = slide.slide_number,
                        error = %e,
                        "speech generation failed, slide keeps no audio"
                    );
                    None
                }
            }
        }));

        // The two fans run concurrently with each other; each settles every
        // slide regardless of individual failures.
        let (images, speeches) = tokio::join!(image_fan, speech_fan);

        let slides = script
            .slides
            .into_iter()
            .zip(images.into_iter().zip(speeches))
            .map(|(slide, (image_url, speech_url))| Slide {
                slide_number: slide.slide_number,
                script: slide.script,
                image_url,
                speech_url,
            })
            .collect();

        Ok(LessonData {
            status: TaskStatus::Generating,
            script: Some(script.script),
            slides,
        })
    }

    /// Quiz pipeline: prompt then questions, both required. A question count
    /// differing from the request is reported, not failed.
    async fn run_quiz_pipeline(
        &self,
        parent: &Task,
        variant: &Task,
        prompt_model: &crate::model::ModelRef,
        questions_model: &crate::model::ModelRef,
    ) -> Result<QuizData, VariantError> {
        let TaskPayload::Quiz(request) = &variant.payload else {
            // Catalogue lookup already pinned the combo to the task kind.
            unreachable!("quiz pipeline invoked for a non-quiz payload");
        };

        let prompt = self
            .timed(
                "quiz_prompt",
                self.backend.generate_quiz_prompt(
                    &parent.topic,
                    &request.question_type,
                    request.num_questions,
                    &prompt_model.provider,
                    &prompt_model.model,
                ),
            )
            .await?;

        let generated = self
            .timed(
                "quiz_questions",
                self.backend.generate_quiz_questions(
                    &prompt,
                    &parent.topic,
                    &request.question_type,
                    request.num_questions,
                    &questions_model.provider,
                    &questions_model.model,
                ),
            )
            .await?;

        if generated.questions.len() != request.num_questions as usize {
            warn!(
                variant = %variant.id,
                requested = request.num_questions,
                returned = generated.questions.len(),
                "quiz question count mismatch"
            );
            self.metrics.record_question_count_mismatch();
        }

        Ok(QuizData {
            status: TaskStatus::Generating,
            question_type: request.question_type.clone(),
            num_questions: request.num_questions,
            prompt: Some(prompt),
            questions: generated.questions,
        })
    }

    /// Applies the configured timeout to one backend call and records it.
    async fn timed<T>(
        &self,
        step: &str,
        call: impl std::future::Future<Output = Result<T, GenerationError>>,
    ) -> Result<T, GenerationError> {
        let result = match tokio::time::timeout(self.config.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout {
                seconds: self.config.call_timeout.as_secs(),
            }),
        };
        self.metrics.record_generation_call(step, result.is_ok());
        result
    }
}
