//! Parent status aggregation.
//!
//! Recomputes a parent task's displayed status and canonical content from the
//! set of its sibling variants. The rule is one pure function of (parent,
//! siblings), shared by the post-generation hook and the standalone repair
//! path, so the two can never drift apart. Running it twice on the same
//! sibling set yields the same answer; the only ordering it depends on is the
//! creation-time tie-break for content promotion.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::error::VariantError;
use crate::model::{Task, TaskPayload, TaskStatus};
use crate::storage::Store;

/// Update the aggregation rule wants applied to a parent task.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentUpdate {
    pub status: TaskStatus,
    /// Content promoted from the first completed variant, set only when the
    /// parent's own payload is still empty.
    pub promoted_payload: Option<TaskPayload>,
}

/// Derives the parent update from its sibling variants.
///
/// - Every variant completed (and at least one exists): parent `completed`,
///   plus promotion of the earliest-created completed variant's non-empty
///   content when the parent payload is empty.
/// - At least one failed and none generating: parent `failed`.
/// - At least one generating: parent `generating`.
/// - Otherwise: no change (`None`).
pub fn derive_parent_update(parent: &Task, siblings: &[Task]) -> Option<ParentUpdate> {
    if siblings.is_empty() {
        return None;
    }

    let any_generating = siblings
        .iter()
        .any(|v| v.status() == TaskStatus::Generating);
    let any_failed = siblings.iter().any(|v| v.status() == TaskStatus::Failed);
    let all_completed = siblings
        .iter()
        .all(|v| v.status() == TaskStatus::Completed);

    if all_completed {
        let promoted_payload = if parent.payload.is_empty() {
            // Siblings arrive ordered by creation time; first completed,
            // non-empty content wins.
            siblings
                .iter()
                .find(|v| v.status() == TaskStatus::Completed && !v.payload.is_empty())
                .map(|v| {
                    let mut payload = v.payload.clone();
                    payload.set_status(TaskStatus::Completed);
                    payload
                })
        } else {
            None
        };

        return Some(ParentUpdate {
            status: TaskStatus::Completed,
            promoted_payload,
        });
    }

    if any_failed && !any_generating {
        return Some(ParentUpdate {
            status: TaskStatus::Failed,
            promoted_payload: None,
        });
    }

    if any_generating {
        return Some(ParentUpdate {
            status: TaskStatus::Generating,
            promoted_payload: None,
        });
    }

    None
}

/// Applies the aggregation rule to a parent task from a fresh snapshot of its
/// variants. Safe to invoke at any time, including concurrently with in-flight
/// generation; invoked mid-generation it reports `generating` and should be
/// re-invoked later.
///
/// Returns the parent's status after reconciliation.
pub async fn reconcile(store: &Arc<dyn Store>, parent_id: Uuid) -> Result<TaskStatus, VariantError> {
    let parent = store
        .get_task(parent_id)
        .await?
        .ok_or(VariantError::TaskNotFound(parent_id))?;

    if !parent.is_parent() {
        return Err(VariantError::NotAParentTask(parent_id));
    }

    let siblings = store.list_variants(parent_id).await?;

    let Some(update) = derive_parent_update(&parent, &siblings) else {
        return Ok(parent.status());
    };

    if let Some(payload) = &update.promoted_payload {
        store.update_task_payload(parent_id, payload).await?;
    } else {
        store.update_task_status(parent_id, update.status).await?;
    }

    info!(
        parent = %parent_id,
        status = %update.status,
        promoted = update.promoted_payload.is_some(),
        "parent status reconciled"
    );

    Ok(update.status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LessonData, Slide};
    use chrono::Duration;

    fn parent() -> Task {
        Task::new_parent(
            Uuid::new_v4(),
            "Photosynthesis",
            "introduction",
            "7",
            "biology",
            12,
            TaskPayload::Lesson(LessonData::default()),
        )
    }

    fn variant_with_status(parent: &Task, status: TaskStatus, offset_secs: i64) -> Task {
        let mut variant = Task::new_variant(parent, Uuid::new_v4(), "gemini-flash");
        variant.created_at = parent.created_at + Duration::seconds(offset_secs);
        if status == TaskStatus::Completed {
            variant.payload = TaskPayload::Lesson(LessonData {
                status,
                script: Some(format!("script at +{}s", offset_secs)),
                slides: vec![Slide {
                    slide_number: 1,
                    script: "slide".to_string(),
                    image_url: None,
                    speech_url: None,
                }],
            });
        } else {
            variant.payload.set_status(status);
        }
        variant
    }

    #[test]
    fn test_no_variants_no_change() {
        assert!(derive_parent_update(&parent(), &[]).is_none());
    }

    #[test]
    fn test_any_generating_wins() {
        let parent = parent();
        let siblings = vec![
            variant_with_status(&parent, TaskStatus::Completed, 0),
            variant_with_status(&parent, TaskStatus::Completed, 1),
            variant_with_status(&parent, TaskStatus::Generating, 2),
        ];
        let update = derive_parent_update(&parent, &siblings).unwrap();
        assert_eq!(update.status, TaskStatus::Generating);
        assert!(update.promoted_payload.is_none());
    }

    #[test]
    fn test_failed_without_generating_fails_parent() {
        let parent = parent();
        let siblings = vec![
            variant_with_status(&parent, TaskStatus::Completed, 0),
            variant_with_status(&parent, TaskStatus::Failed, 1),
            variant_with_status(&parent, TaskStatus::Completed, 2),
        ];
        let update = derive_parent_update(&parent, &siblings).unwrap();
        assert_eq!(update.status, TaskStatus::Failed);
    }

    #[test]
    fn test_all_completed_promotes_earliest_content() {
        let parent = parent();
        let siblings = vec![
            variant_with_status(&parent, TaskStatus::Completed, 5),
            variant_with_status(&parent, TaskStatus::Completed, 1),
            variant_with_status(&parent, TaskStatus::Completed, 9),
        ];
        // The rule sees siblings in creation order, as the store returns them.
        let mut ordered = siblings.clone();
        ordered.sort_by_key(|v| v.created_at);

        let update = derive_parent_update(&parent, &ordered).unwrap();
        assert_eq!(update.status, TaskStatus::Completed);
        let payload = update.promoted_payload.unwrap();
        assert_eq!(payload.status(), TaskStatus::Completed);
        match payload {
            TaskPayload::Lesson(data) => {
                assert_eq!(data.script.as_deref(), Some("script at +1s"));
            }
            TaskPayload::Quiz(_) => panic!("expected lesson payload"),
        }
    }

    #[test]
    fn test_non_empty_parent_payload_is_not_overwritten() {
        let mut parent = parent();
        parent.payload = TaskPayload::Lesson(LessonData {
            status: TaskStatus::Generating,
            script: Some("already promoted".to_string()),
            slides: Vec::new(),
        });
        let siblings = vec![variant_with_status(&parent, TaskStatus::Completed, 0)];

        let update = derive_parent_update(&parent, &siblings).unwrap();
        assert_eq!(update.status, TaskStatus::Completed);
        assert!(update.promoted_payload.is_none());
    }

    #[test]
    fn test_all_pending_no_change() {
        let parent = parent();
        let siblings = vec![
            variant_with_status(&parent, TaskStatus::Pending, 0),
            variant_with_status(&parent, TaskStatus::Pending, 1),
        ];
        assert!(derive_parent_update(&parent, &siblings).is_none());
    }

    #[test]
    fn test_rule_is_idempotent() {
        let parent = parent();
        let siblings = vec![
            variant_with_status(&parent, TaskStatus::Completed, 0),
            variant_with_status(&parent, TaskStatus::Failed, 1),
        ];
        let first = derive_parent_update(&parent, &siblings);
        let second = derive_parent_update(&parent, &siblings);
        assert_eq!(first, second);
    }
}
