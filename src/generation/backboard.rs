//! Backboard gateway client.
//!
//! Reference [`GenerationBackend`] over an OpenAI-compatible HTTP gateway
//! that fronts every text model behind one API; images and speech hang off
//! sibling endpoints. Providers are addressed as `provider/model` in the
//! request body.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GenerationError;
use crate::utils::extract_json;

use super::backend::{GenerationBackend, QuizQuestionsResult, ScriptResult};

/// Default ElevenLabs-style narration voice.
pub const DEFAULT_VOICE: &str = "21m00Tcm4TlvDq8ikWAM";

const SCRIPT_SYSTEM_PROMPT: &str = "You are an expert educational content creator. \
Generate engaging, educational lesson scripts that are well-structured and \
appropriate for classroom use.";

const QUIZ_PROMPT_SYSTEM_PROMPT: &str = "You are an expert educational content creator. \
Generate comprehensive quiz prompts that are detailed enough to generate \
high-quality educational questions.";

const QUIZ_QUESTIONS_SYSTEM_PROMPT: &str = "You are an expert educational content creator. \
Generate high-quality quiz questions based on the provided prompt.";

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Serialize)]
struct ImageRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Serialize)]
struct SpeechRequest {
    text: String,
    voice: String,
}

#[derive(Debug, Deserialize)]
struct MediaResponse {
    #[serde(default)]
    url: String,
}

/// HTTP client for the Backboard gateway.
pub struct BackboardClient {
    api_base: String,
    api_key: String,
    http_client: Client,
}

impl BackboardClient {
    /// Creates a client with explicit configuration.
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            api_key: api_key.into(),
            http_client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// Creates a client from `BACKBOARD_API_BASE` and `BACKBOARD_API_KEY`.
    pub fn from_env() -> Result<Self, GenerationError> {
        let api_base = env::var("BACKBOARD_API_BASE").map_err(|_| GenerationError::MissingApiBase)?;
        let api_key = env::var("BACKBOARD_API_KEY").map_err(|_| GenerationError::MissingApiKey)?;
        Ok(Self::new(api_base, api_key))
    }

    async fn chat(
        &self,
        provider: &str,
        model: &str,
        system_prompt: &str,
        user_prompt: String,
    ) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: format!("{}/{}", provider, model),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::ApiError {
                code: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::ParseError(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        if content.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        debug!(model = %request.model, length = content.len(), "chat completion received");
        Ok(content)
    }
}

#[async_trait]
impl GenerationBackend for BackboardClient {
    async fn generate_script(
        &self,
        topic: &str,
        length_minutes: u32,
        provider: &str,
        model: &str,
    ) -> Result<ScriptResult, GenerationError> {
        let num_slides = (length_minutes / 2).max(3);
        let prompt = format!(
            r#"Create an educational lesson script about "{topic}" that is approximately {length_minutes} minutes long when spoken.

Break the script into {num_slides} slides (approximately 2 minutes per slide).

For each slide, provide:
1. A clear, engaging script that can be read aloud
2. Content that is educational and appropriate for students
3. Smooth transitions between slides

Format your response as JSON:
{{
  "script": "Full script text here",
  "slides": [
    {{
      "slideNumber": 1,
      "script": "Script content for slide 1"
    }}
  ]
}}"#
        );

        let content = self.chat(provider, model, SCRIPT_SYSTEM_PROMPT, prompt).await?;
        let json = extract_json(&content).ok_or_else(|| {
            GenerationError::ParseError("script response contained no JSON".to_string())
        })?;
        serde_json::from_str(&json).map_err(|e| GenerationError::ParseError(e.to_string()))
    }

    async fn generate_image(
        &self,
        slide_script: &str,
        slide_number: u32,
        topic: &str,
        provider: &str,
        model: &str,
    ) -> Result<String, GenerationError> {
        let request = ImageRequest {
            model: format!("{}/{}", provider, model),
            prompt: format!(
                "Create an educational illustration for slide {} of a lesson about {}. \
                 The slide covers: {}",
                slide_number, topic, slide_script
            ),
        };

        let response = self
            .http_client
            .post(format!("{}/images", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::ApiError {
                code: status.as_u16(),
                message,
            });
        }

        let body: MediaResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::ParseError(e.to_string()))?;
        Ok(body.url)
    }

    async fn generate_speech(
        &self,
        text: &str,
        voice: Option<&str>,
    ) -> Result<String, GenerationError> {
        let request = SpeechRequest {
            text: text.to_string(),
            voice: voice.unwrap_or(DEFAULT_VOICE).to_string(),
        };

        let response = self
            .http_client
            .post(format!("{}/speech", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::ApiError {
                code: status.as_u16(),
                message,
            });
        }

        let body: MediaResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::ParseError(e.to_string()))?;
        Ok(body.url)
    }

    async fn generate_quiz_prompt(
        &self,
        topic: &str,
        question_type: &str,
        num_questions: u32,
        provider: &str,
        model: &str,
    ) -> Result<String, GenerationError> {
        let prompt = format!(
            "Create a comprehensive quiz prompt for generating {num_questions} {question_type} \
             questions about {topic}. The prompt should be detailed enough to generate \
             high-quality educational questions."
        );

        self.chat(provider, model, QUIZ_PROMPT_SYSTEM_PROMPT, prompt)
            .await
    }

    async fn generate_quiz_questions(
        &self,
        prompt: &str,
        topic: &str,
        question_type: &str,
        num_questions: u32,
        provider: &str,
        model: &str,
    ) -> Result<QuizQuestionsResult, GenerationError> {
        let user_prompt = format!(
            r#"Topic: {topic}
Question Type: {question_type}
Number of Questions: {num_questions}

Quiz Prompt: {prompt}

Generate exactly {num_questions} {question_type} questions about {topic}. For each question:
1. Provide a clear, educational question
2. If MCQ: Provide 4 options (A, B, C, D) with one correct answer
3. If True/False: Provide the correct answer (True or False)
4. If Short Answer: Provide a sample correct answer
5. Include a brief explanation for the correct answer

Format your response as JSON with this structure:
{{
  "questions": [
    {{
      "question": "Question text here",
      "type": "{question_type}",
      "options": ["Option A", "Option B", "Option C", "Option D"],
      "correctAnswer": "Correct answer",
      "explanation": "Brief explanation"
    }}
  ]
}}"#
        );

        let content = self
            .chat(provider, model, QUIZ_QUESTIONS_SYSTEM_PROMPT, user_prompt)
            .await?;
        let json = extract_json(&content).ok_or_else(|| {
            GenerationError::ParseError("quiz questions response contained no JSON".to_string())
        })?;
        serde_json::from_str(&json).map_err(|e| GenerationError::ParseError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_requires_base_and_key() {
        std::env::remove_var("BACKBOARD_API_BASE");
        std::env::remove_var("BACKBOARD_API_KEY");
        assert!(matches!(
            BackboardClient::from_env(),
            Err(GenerationError::MissingApiBase)
        ));

        std::env::set_var("BACKBOARD_API_BASE", "http://localhost:4000");
        assert!(matches!(
            BackboardClient::from_env(),
            Err(GenerationError::MissingApiKey)
        ));

        std::env::set_var("BACKBOARD_API_KEY", "test-key");
        assert!(BackboardClient::from_env().is_ok());

        std::env::remove_var("BACKBOARD_API_BASE");
        std::env::remove_var("BACKBOARD_API_KEY");
    }
}
