//! Generation backend capability.
//!
//! The variant pipelines consume generative AI through this trait. Calls may
//! take tens of seconds to minutes and may fail; callers apply their own
//! timeout and isolation policy (see the variant generator).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::model::QuizQuestion;

/// Per-slide script returned by script generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideScript {
    pub slide_number: u32,
    pub script: String,
}

/// Result of a script generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptResult {
    pub script: String,
    pub slides: Vec<SlideScript>,
}

/// Result of a quiz questions generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestionsResult {
    pub questions: Vec<QuizQuestion>,
}

/// Opaque generative AI capability.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generates a lesson script divided into slides.
    async fn generate_script(
        &self,
        topic: &str,
        length_minutes: u32,
        provider: &str,
        model: &str,
    ) -> Result<ScriptResult, GenerationError>;

    /// Generates an image for one slide, returning its URL. An empty URL is
    /// a valid degraded result.
    async fn generate_image(
        &self,
        slide_script: &str,
        slide_number: u32,
        topic: &str,
        provider: &str,
        model: &str,
    ) -> Result<String, GenerationError>;

    /// Converts text to speech, returning the audio URL.
    async fn generate_speech(
        &self,
        text: &str,
        voice: Option<&str>,
    ) -> Result<String, GenerationError>;

    /// Generates a quiz prompt detailed enough to drive question generation.
    async fn generate_quiz_prompt(
        &self,
        topic: &str,
        question_type: &str,
        num_questions: u32,
        provider: &str,
        model: &str,
    ) -> Result<String, GenerationError>;

    /// Generates quiz questions from a prompt.
    async fn generate_quiz_questions(
        &self,
        prompt: &str,
        topic: &str,
        question_type: &str,
        num_questions: u32,
        provider: &str,
        model: &str,
    ) -> Result<QuizQuestionsResult, GenerationError>;
}
