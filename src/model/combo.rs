//! Model combos.
//!
//! A combo is a named bundle of provider/model choices for the generation
//! roles a task kind needs: script + image models for lessons, quiz-prompt +
//! quiz-questions models for quizzes. The role set is a tagged union so a
//! lesson combo cannot be applied to a quiz task by accident.

use serde::{Deserialize, Serialize};

use super::task::TaskKind;

/// One provider/model pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    pub provider: String,
    pub model: String,
}

impl ModelRef {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    /// Substring match on model names, used when mapping learner votes back
    /// onto catalogue entries (vote records and catalogue entries may carry
    /// differently qualified names for the same model).
    pub fn matches_model(&self, other_model: &str) -> bool {
        self.model.contains(other_model) || other_model.contains(&self.model)
    }
}

impl std::fmt::Display for ModelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// Role models for one task kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ComboRoles {
    Lesson {
        script: ModelRef,
        image: ModelRef,
    },
    Quiz {
        prompt: ModelRef,
        questions: ModelRef,
    },
}

/// A named set of provider/model pairs for one task kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combo {
    pub name: String,
    pub roles: ComboRoles,
}

impl Combo {
    pub fn lesson(name: impl Into<String>, script: ModelRef, image: ModelRef) -> Self {
        Self {
            name: name.into(),
            roles: ComboRoles::Lesson { script, image },
        }
    }

    pub fn quiz(name: impl Into<String>, prompt: ModelRef, questions: ModelRef) -> Self {
        Self {
            name: name.into(),
            roles: ComboRoles::Quiz { prompt, questions },
        }
    }

    pub fn kind(&self) -> TaskKind {
        match &self.roles {
            ComboRoles::Lesson { .. } => TaskKind::Lesson,
            ComboRoles::Quiz { .. } => TaskKind::Quiz,
        }
    }

    /// The role that produces the learner-facing content: the script model
    /// for lessons, the questions model for quizzes. Selection tiers match
    /// history against this role.
    pub fn primary_model(&self) -> &ModelRef {
        match &self.roles {
            ComboRoles::Lesson { script, .. } => script,
            ComboRoles::Quiz { questions, .. } => questions,
        }
    }
}
