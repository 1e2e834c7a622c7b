//! Performance profiles.
//!
//! A profile is the learned running-average record of how well one combo
//! performs for one context key. Profiles are created on first feedback for
//! a key, updated on every subsequent event, and only ever marked deprecated,
//! never deleted. The derived performance score is written exclusively by the
//! scorer; no other path sets it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::feedback::SessionFeedback;
use super::task::{LengthBucket, TaskKind};

/// Composite identity of a performance profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileKey {
    pub combo: String,
    pub topic: String,
    pub purpose: String,
    pub length_bucket: LengthBucket,
    pub kind: TaskKind,
    pub grade: String,
    pub subject: String,
}

impl ProfileKey {
    pub fn from_feedback(feedback: &SessionFeedback) -> Self {
        Self {
            combo: feedback.combo.clone(),
            topic: feedback.context.topic.clone(),
            purpose: feedback.context.purpose.clone(),
            length_bucket: feedback.context.length_bucket,
            kind: feedback.context.kind,
            grade: feedback.context.grade.clone(),
            subject: feedback.context.subject.clone(),
        }
    }

    /// Stable flattened form used as a storage key and lock-table key.
    pub fn storage_key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.combo,
            self.topic,
            self.purpose,
            self.length_bucket,
            self.kind,
            self.grade,
            self.subject
        )
    }
}

/// Lifecycle status of a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    #[default]
    Active,
    Deprecated,
    Experimental,
}

impl ProfileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileStatus::Active => "active",
            ProfileStatus::Deprecated => "deprecated",
            ProfileStatus::Experimental => "experimental",
        }
    }
}

impl std::str::FromStr for ProfileStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ProfileStatus::Active),
            "deprecated" => Ok(ProfileStatus::Deprecated),
            "experimental" => Ok(ProfileStatus::Experimental),
            other => Err(format!("unknown profile status '{}'", other)),
        }
    }
}

/// Running performance record for one (combo, context) key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceProfile {
    pub key: ProfileKey,
    /// Running averages, each in [0,1].
    pub clarity: f64,
    pub engagement: f64,
    pub confidence: f64,
    pub attention_span: f64,
    /// Signed fatigue slope, EMA-smoothed after the first sample.
    pub fatigue_slope: f64,
    pub session_count: u64,
    /// Derived; recomputed by the scorer on every mutation.
    pub performance_score: f64,
    pub status: ProfileStatus,
    pub updated_at: DateTime<Utc>,
}

impl PerformanceProfile {
    /// Seeds a profile from the first feedback event for its key: averages
    /// equal the event's scores, the slope is taken directly.
    pub fn first(key: ProfileKey, feedback: &SessionFeedback) -> Self {
        let signals = &feedback.signals;
        Self {
            key,
            clarity: signals.clarity,
            engagement: signals.engagement,
            confidence: signals.confidence,
            attention_span: signals.attention_span,
            fatigue_slope: signals.fatigue_slope,
            session_count: 0,
            performance_score: 0.0,
            status: ProfileStatus::Active,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_is_stable() {
        let key = ProfileKey {
            combo: "gemini-flash".to_string(),
            topic: "Photosynthesis".to_string(),
            purpose: "introduction".to_string(),
            length_bucket: LengthBucket::Medium,
            kind: TaskKind::Lesson,
            grade: "7".to_string(),
            subject: "biology".to_string(),
        };
        assert_eq!(
            key.storage_key(),
            "gemini-flash|Photosynthesis|introduction|medium|lesson|7|biology"
        );
        assert_eq!(key.storage_key(), key.clone().storage_key());
    }

    #[test]
    fn test_profile_status_round_trip() {
        for status in [
            ProfileStatus::Active,
            ProfileStatus::Deprecated,
            ProfileStatus::Experimental,
        ] {
            let parsed: ProfileStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }
}
