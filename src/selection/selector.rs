//! Combo selection.
//!
//! Three tiers, evaluated in order, first success wins:
//!
//! 1. **Per-learner vote** - each prospective group member votes for their
//!    personal best-performing model over their recent completed sessions.
//! 2. **Global recommendation** - system-wide recent history, mapped back to
//!    the catalogue by provider.
//! 3. **Round-robin fallback** - the group's index cycles through the static
//!    catalogue, so every group gets a combo even with zero history.
//!
//! Selection only reads historical session records; it never blocks on
//! generation and never reports an error to its caller. Store failures in
//! tiers 1-2 degrade to the next tier. Tally maps are insertion-ordered so
//! ties resolve to the first-encountered key.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::model::{Combo, TaskKind};
use crate::storage::Store;

use super::cache::RecommendationCache;
use super::catalogue;

/// Per-learner history window for the vote tier.
pub const LEARNER_HISTORY_LIMIT: usize = 50;

/// System-wide history window for the recommendation tier.
pub const GLOBAL_HISTORY_LIMIT: usize = 200;

/// Context for one selection call.
#[derive(Debug, Clone)]
pub struct SelectionContext<'a> {
    pub kind: TaskKind,
    pub grade: &'a str,
    pub subject: &'a str,
    /// Members of the prospective group (tier 1 voters).
    pub members: &'a [Uuid],
    /// Zero-based index of the group within its task (tier 3 cursor).
    pub group_index: usize,
}

/// Tiered combo selector.
pub struct ComboSelector {
    store: Arc<dyn Store>,
    cache: RecommendationCache,
}

impl ComboSelector {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_cache(store, RecommendationCache::new(256, Duration::from_secs(300)))
    }

    pub fn with_cache(store: Arc<dyn Store>, cache: RecommendationCache) -> Self {
        Self { store, cache }
    }

    pub fn cache(&self) -> &RecommendationCache {
        &self.cache
    }

    /// Selects a combo for one group. Total: tier 3 always produces a
    /// catalogue entry.
    pub async fn select(&self, ctx: &SelectionContext<'_>) -> Combo {
        if let Some(combo) = self.per_learner_vote(ctx).await {
            debug!(combo = %combo.name, "combo selected by learner vote");
            return combo;
        }

        if let Some(combo) = self.global_recommendation(ctx).await {
            debug!(combo = %combo.name, "combo selected by global recommendation");
            return combo;
        }

        let combo = self.round_robin(ctx);
        debug!(combo = %combo.name, group_index = ctx.group_index, "combo selected by round-robin");
        combo
    }

    /// Tier 1: tally each member's personal best (provider, model) and map
    /// the plurality winner onto the catalogue.
    async fn per_learner_vote(&self, ctx: &SelectionContext<'_>) -> Option<Combo> {
        let mut tally: Vec<((String, String), usize)> = Vec::new();

        for learner in ctx.members {
            let sessions = match self
                .store
                .learner_sessions(
                    *learner,
                    ctx.kind,
                    ctx.grade,
                    ctx.subject,
                    LEARNER_HISTORY_LIMIT,
                )
                .await
            {
                Ok(sessions) => sessions,
                Err(e) => {
                    warn!(learner = %learner, error = %e, "learner history unavailable, skipping vote");
                    continue;
                }
            };

            let Some(best) = personal_best(&sessions) else {
                continue;
            };

            match tally.iter_mut().find(|(key, _)| *key == best) {
                Some((_, count)) => *count += 1,
                None => tally.push((best, 1)),
            }
        }

        let ((provider, model), _votes) =
            tally
                .iter()
                .fold(None::<&((String, String), usize)>, |acc, entry| match acc {
                    Some((_, best)) if *best >= entry.1 => acc,
                    _ => Some(entry),
                })?;

        catalogue::catalogue_for(ctx.kind).into_iter().find(|combo| {
            let role = combo.primary_model();
            role.provider == *provider && role.matches_model(model)
        })
    }

    /// Tier 2: rank providers over recent system-wide history and map the
    /// winner onto the catalogue by provider alone. Results are memoized per
    /// context through the TTL cache.
    async fn global_recommendation(&self, ctx: &SelectionContext<'_>) -> Option<Combo> {
        let cache_key = RecommendationCache::context_key(ctx.kind, ctx.grade, ctx.subject);
        if let Some(name) = self.cache.get(&cache_key) {
            return catalogue::find(ctx.kind, &name);
        }

        let sessions = match self
            .store
            .recent_sessions(ctx.kind, ctx.grade, ctx.subject, GLOBAL_HISTORY_LIMIT)
            .await
        {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!(error = %e, "global history unavailable, falling through");
                return None;
            }
        };

        if sessions.is_empty() {
            return None;
        }

        let mut scores: Vec<(String, (f64, usize))> = Vec::new();
        for session in &sessions {
            match scores.iter_mut().find(|(p, _)| *p == session.provider) {
                Some((_, (sum, n))) => {
                    *sum += session.combined_score();
                    *n += 1;
                }
                None => scores.push((session.provider.clone(), (session.combined_score(), 1))),
            }
        }

        let winner = scores
            .iter()
            .map(|(provider, (sum, n))| (provider, sum / *n as f64))
            .fold(None::<(&String, f64)>, |acc, (provider, avg)| match acc {
                Some((_, best)) if best >= avg => acc,
                _ => Some((provider, avg)),
            })
            .map(|(provider, _)| provider.clone())?;

        let combo = catalogue::catalogue_for(ctx.kind)
            .into_iter()
            .find(|combo| combo.primary_model().provider == winner)?;

        self.cache.put(cache_key, combo.name.clone());
        Some(combo)
    }

    /// Tier 3: deterministic cycle through the catalogue by group index.
    fn round_robin(&self, ctx: &SelectionContext<'_>) -> Combo {
        let entries = catalogue::catalogue_for(ctx.kind);
        entries[ctx.group_index % entries.len()].clone()
    }
}

/// A learner's personal best (provider, model) by average combined score
/// over their recent sessions. Ties keep the first-encountered key.
fn personal_best(sessions: &[crate::model::SessionFeedback]) -> Option<(String, String)> {
    let mut scores: Vec<((String, String), (f64, usize))> = Vec::new();

    for session in sessions {
        let key = (session.provider.clone(), session.model.clone());
        match scores.iter_mut().find(|(k, _)| *k == key) {
            Some((_, (sum, n))) => {
                *sum += session.combined_score();
                *n += 1;
            }
            None => scores.push((key, (session.combined_score(), 1))),
        }
    }

    scores
        .iter()
        .map(|(key, (sum, n))| (key, sum / *n as f64))
        .fold(None::<(&(String, String), f64)>, |acc, (key, avg)| match acc {
            Some((_, best)) if best >= avg => acc,
            _ => Some((key, avg)),
        })
        .map(|(key, _)| key.clone())
}
