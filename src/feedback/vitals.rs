//! Vitals probe capability.
//!
//! Biometric signal extraction runs out of process; this trait is the only
//! surface the feedback pipeline sees. A probe supplies the aggregated
//! metrics for one completed session; every metric is optional.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::FeedbackError;
use crate::model::SessionMetrics;

/// Supplier of per-session aggregated biometric metrics.
#[async_trait]
pub trait VitalsProbe: Send + Sync {
    async fn session_metrics(&self, session_id: Uuid) -> Result<SessionMetrics, FeedbackError>;
}
