//! Performance scoring.
//!
//! Maintains the per-(combo, context) running profile. Updates apply an
//! exponential moving average with a fixed learning rate to the four bounded
//! averages, smooth the fatigue slope the same way after the first sample,
//! and recompute the derived performance score. This module is the sole
//! writer of the performance score. Concurrent updates to the same composite
//! key serialize through a per-key lock table so no running average is lost.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::FeedbackError;
use crate::model::{PerformanceProfile, ProfileKey, SessionFeedback};
use crate::storage::Store;

/// EMA learning rate.
pub const EMA_ALPHA: f64 = 0.2;

/// Fatigue slope above this discounts the performance score.
pub const FATIGUE_PENALTY_THRESHOLD: f64 = 0.1;

/// Multiplier applied to the performance score under rising fatigue.
pub const FATIGUE_PENALTY_FACTOR: f64 = 0.9;

/// Result of one profile update.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub profile: PerformanceProfile,
    /// Performance score before this update; `None` on profile creation.
    pub previous_score: Option<f64>,
}

/// Derived performance score: 0.3·clarity + 0.3·engagement + 0.2·confidence
/// + 0.2·attentionSpan, discounted under rising fatigue. No other path may
/// write this value.
pub fn compute_performance_score(profile: &PerformanceProfile) -> f64 {
    let base = 0.3 * profile.clarity
        + 0.3 * profile.engagement
        + 0.2 * profile.confidence
        + 0.2 * profile.attention_span;

    if profile.fatigue_slope > FATIGUE_PENALTY_THRESHOLD {
        base * FATIGUE_PENALTY_FACTOR
    } else {
        base
    }
}

/// Applies feedback events to performance profiles.
pub struct PerformanceScorer {
    store: Arc<dyn Store>,
    key_locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PerformanceScorer {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            key_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Finds or creates the profile for the feedback's composite key and
    /// applies the EMA update. The read-modify-write for one key runs under
    /// that key's lock.
    pub async fn update_profile(
        &self,
        feedback: &SessionFeedback,
    ) -> Result<ProfileUpdate, FeedbackError> {
        let key = ProfileKey::from_feedback(feedback);
        let lock = self.lock_for(&key.storage_key());
        let _guard = lock.lock().await;

        let existing = self.store.get_profile(&key).await?;
        let previous_score = existing.as_ref().map(|p| p.performance_score);

        let mut profile = match existing {
            Some(mut profile) => {
                let signals = &feedback.signals;
                profile.clarity = ema(profile.clarity, signals.clarity);
                profile.engagement = ema(profile.engagement, signals.engagement);
                profile.confidence = ema(profile.confidence, signals.confidence);
                profile.attention_span = ema(profile.attention_span, signals.attention_span);
                profile.fatigue_slope = ema(profile.fatigue_slope, signals.fatigue_slope);
                profile
            }
            None => PerformanceProfile::first(key, feedback),
        };

        profile.session_count += 1;
        profile.performance_score = compute_performance_score(&profile);
        profile.updated_at = Utc::now();

        self.store.upsert_profile(&profile).await?;

        debug!(
            key = %profile.key.storage_key(),
            sessions = profile.session_count,
            score = profile.performance_score,
            "profile updated"
        );

        Ok(ProfileUpdate {
            profile,
            previous_score,
        })
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().expect("key lock table poisoned");
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// One EMA step: new = (1-α)·old + α·sample.
fn ema(old: f64, sample: f64) -> f64 {
    (1.0 - EMA_ALPHA) * old + EMA_ALPHA * sample
}
