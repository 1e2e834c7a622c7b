//! Static combo catalogue.
//!
//! The catalogue is the floor of the selection system: when no learned
//! recommendation exists, groups cycle deterministically through these
//! entries. Ordering is load-bearing for the round-robin tier; append new
//! combos at the end.

use crate::model::{Combo, ModelRef, TaskKind};

/// Catalogue of lesson combos (script + image roles).
pub fn lesson_catalogue() -> Vec<Combo> {
    vec![
        Combo::lesson(
            "gemini-flash",
            ModelRef::new("google", "gemini-2.5-flash"),
            ModelRef::new("google", "gemini-2.5-flash-image"),
        ),
        Combo::lesson(
            "gemini-pro",
            ModelRef::new("google", "gemini-2.5-pro"),
            ModelRef::new("google", "gemini-2.5-flash-image"),
        ),
        Combo::lesson(
            "gpt-4o",
            ModelRef::new("openai", "gpt-4o"),
            ModelRef::new("openai", "gpt-5-image-mini"),
        ),
        Combo::lesson(
            "gpt-5",
            ModelRef::new("openai", "gpt-5"),
            ModelRef::new("openai", "gpt-5-image"),
        ),
        Combo::lesson(
            "claude-sonnet",
            ModelRef::new("anthropic", "claude-3-7-sonnet-20250219"),
            ModelRef::new("google", "gemini-2.5-flash-image"),
        ),
    ]
}

/// Catalogue of quiz combos (prompt + questions roles).
pub fn quiz_catalogue() -> Vec<Combo> {
    vec![
        Combo::quiz(
            "gemini-flash",
            ModelRef::new("google", "gemini-2.5-flash-lite"),
            ModelRef::new("google", "gemini-2.5-flash"),
        ),
        Combo::quiz(
            "gpt-4o",
            ModelRef::new("openai", "gpt-5-mini"),
            ModelRef::new("openai", "gpt-4o"),
        ),
        Combo::quiz(
            "claude-sonnet",
            ModelRef::new("anthropic", "claude-3-7-sonnet-20250219"),
            ModelRef::new("anthropic", "claude-3-7-sonnet-20250219"),
        ),
        Combo::quiz(
            "gemini-pro",
            ModelRef::new("google", "gemini-2.5-flash-lite"),
            ModelRef::new("google", "gemini-2.5-pro"),
        ),
    ]
}

/// Catalogue entries for one task kind.
pub fn catalogue_for(kind: TaskKind) -> Vec<Combo> {
    match kind {
        TaskKind::Lesson => lesson_catalogue(),
        TaskKind::Quiz => quiz_catalogue(),
    }
}

/// Looks up a combo by kind and name.
pub fn find(kind: TaskKind, name: &str) -> Option<Combo> {
    catalogue_for(kind).into_iter().find(|c| c.name == name)
}
