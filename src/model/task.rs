//! Task records and payloads.
//!
//! A task is one unit of instructional work requested for a class. A parent
//! task (`parent_id` = None) is the canonical, learner-facing record; each of
//! its variant tasks is a per-cohort execution bound to one group and one
//! model combo. The payload is a tagged union keyed by task kind so a lesson
//! task can never carry quiz fields and vice versa.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of instructional content a task produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Lesson,
    Quiz,
}

impl TaskKind {
    /// Stable string form used in storage keys and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Lesson => "lesson",
            TaskKind::Quiz => "quiz",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lesson" => Ok(TaskKind::Lesson),
            "quiz" => Ok(TaskKind::Quiz),
            other => Err(format!("unknown task kind '{}'", other)),
        }
    }
}

/// Status of a payload's generation pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Generating,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Generating => "generating",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Terminal states accept no further transitions at the variant layer.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "generating" => Ok(TaskStatus::Generating),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(format!("unknown task status '{}'", other)),
        }
    }
}

/// One slide of a generated lesson. Media URLs stay empty when the
/// corresponding generation call failed; a lesson with missing media is
/// still presentable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub slide_number: u32,
    pub script: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_url: Option<String>,
}

/// Lesson payload: full script plus per-slide scripts and media.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonData {
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default)]
    pub slides: Vec<Slide>,
}

/// One generated quiz question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Quiz payload: the request parameters plus generated prompt and questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizData {
    pub status: TaskStatus,
    pub question_type: String,
    pub num_questions: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
}

impl QuizData {
    /// Empty quiz payload carrying only the request parameters.
    pub fn new(question_type: impl Into<String>, num_questions: u32) -> Self {
        Self {
            status: TaskStatus::Pending,
            question_type: question_type.into(),
            num_questions,
            prompt: None,
            questions: Vec::new(),
        }
    }
}

/// Task payload, exactly one branch populated per task kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TaskPayload {
    Lesson(LessonData),
    Quiz(QuizData),
}

impl TaskPayload {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskPayload::Lesson(_) => TaskKind::Lesson,
            TaskPayload::Quiz(_) => TaskKind::Quiz,
        }
    }

    pub fn status(&self) -> TaskStatus {
        match self {
            TaskPayload::Lesson(data) => data.status,
            TaskPayload::Quiz(data) => data.status,
        }
    }

    pub fn set_status(&mut self, status: TaskStatus) {
        match self {
            TaskPayload::Lesson(data) => data.status = status,
            TaskPayload::Quiz(data) => data.status = status,
        }
    }

    /// True when no content has been generated into this payload yet.
    pub fn is_empty(&self) -> bool {
        match self {
            TaskPayload::Lesson(data) => data.script.is_none() && data.slides.is_empty(),
            TaskPayload::Quiz(data) => data.prompt.is_none() && data.questions.is_empty(),
        }
    }
}

/// Lesson length bucket used in scoring keys and selection contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthBucket {
    Short,
    Medium,
    Long,
}

impl LengthBucket {
    /// Buckets by spoken length: short up to 10 minutes, medium up to 30,
    /// long beyond that.
    pub fn from_minutes(minutes: u32) -> Self {
        match minutes {
            0..=10 => LengthBucket::Short,
            11..=30 => LengthBucket::Medium,
            _ => LengthBucket::Long,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LengthBucket::Short => "short",
            LengthBucket::Medium => "medium",
            LengthBucket::Long => "long",
        }
    }
}

impl std::fmt::Display for LengthBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One instructional task, parent or variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub class_id: Uuid,
    pub topic: String,
    /// Pedagogical purpose, e.g. "introduction" or "revision".
    pub purpose: String,
    pub grade: String,
    pub subject: String,
    pub length_minutes: u32,
    /// None marks the canonical parent task.
    pub parent_id: Option<Uuid>,
    /// Set on variants only: the cohort this execution serves.
    pub group_id: Option<Uuid>,
    /// Name of the combo that produced (or will produce) this payload.
    pub combo: Option<String>,
    pub payload: TaskPayload,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Creates a canonical parent task with an empty payload.
    pub fn new_parent(
        class_id: Uuid,
        topic: impl Into<String>,
        purpose: impl Into<String>,
        grade: impl Into<String>,
        subject: impl Into<String>,
        length_minutes: u32,
        payload: TaskPayload,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            class_id,
            topic: topic.into(),
            purpose: purpose.into(),
            grade: grade.into(),
            subject: subject.into(),
            length_minutes,
            parent_id: None,
            group_id: None,
            combo: None,
            payload,
            created_at: Utc::now(),
        }
    }

    /// Creates a variant of `parent` for one group, bound to a combo.
    pub fn new_variant(parent: &Task, group_id: Uuid, combo: impl Into<String>) -> Self {
        let mut payload = parent.payload.clone();
        payload.set_status(TaskStatus::Pending);
        // Variants never inherit generated content, only request parameters.
        if let TaskPayload::Lesson(data) = &mut payload {
            data.script = None;
            data.slides.clear();
        }
        if let TaskPayload::Quiz(data) = &mut payload {
            data.prompt = None;
            data.questions.clear();
        }
        Self {
            id: Uuid::new_v4(),
            class_id: parent.class_id,
            topic: parent.topic.clone(),
            purpose: parent.purpose.clone(),
            grade: parent.grade.clone(),
            subject: parent.subject.clone(),
            length_minutes: parent.length_minutes,
            parent_id: Some(parent.id),
            group_id: Some(group_id),
            combo: Some(combo.into()),
            payload,
            created_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.payload.kind()
    }

    pub fn is_parent(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn status(&self) -> TaskStatus {
        self.payload.status()
    }

    pub fn length_bucket(&self) -> LengthBucket {
        LengthBucket::from_minutes(self.length_minutes)
    }
}
