//! Grouping orchestration.
//!
//! Materializes persisted [`Group`] records for a parent task: loads the
//! class enrollment, segments it into cohorts, runs combo selection per
//! cohort and persists one group per cohort. All group writes must succeed
//! before the caller may spawn variants; a partial persistence failure
//! surfaces as an error.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::GroupingError;
use crate::model::Group;
use crate::selection::{ComboSelector, SelectionContext};
use crate::storage::Store;

use super::segmenter;

/// Result of a grouping run. Zero enrolled learners is a valid outcome, not
/// an error; `message` carries the operator-facing summary either way.
#[derive(Debug)]
pub struct GroupingOutcome {
    pub groups: Vec<Group>,
    pub message: String,
}

impl GroupingOutcome {
    fn empty(message: impl Into<String>) -> Self {
        Self {
            groups: Vec::new(),
            message: message.into(),
        }
    }
}

/// Creates cohort groups for parent tasks.
pub struct GroupingOrchestrator {
    store: Arc<dyn Store>,
    selector: Arc<ComboSelector>,
    group_size: usize,
}

impl GroupingOrchestrator {
    pub fn new(store: Arc<dyn Store>, selector: Arc<ComboSelector>, group_size: usize) -> Self {
        Self {
            store,
            selector,
            group_size: group_size.max(1),
        }
    }

    /// Creates and persists one group per cohort of the task's class.
    ///
    /// # Errors
    ///
    /// Fails on missing task/class or on any group persistence failure. A
    /// task whose grouping failed partway must not have variants spawned;
    /// already-persisted groups are left in place for inspection.
    pub async fn create_groups_for_task(
        &self,
        task_id: Uuid,
        class_id: Uuid,
    ) -> Result<GroupingOutcome, GroupingError> {
        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or(GroupingError::TaskNotFound(task_id))?;

        if !task.is_parent() {
            return Err(GroupingError::NotAParentTask(task_id));
        }

        let learners = self
            .store
            .get_enrollment(class_id)
            .await?
            .ok_or(GroupingError::ClassNotFound(class_id))?;

        if learners.is_empty() {
            warn!(class = %class_id, "no learners enrolled, skipping group creation");
            return Ok(GroupingOutcome::empty(
                "no learners enrolled; no groups created",
            ));
        }

        let segments = segmenter::segment(&learners, self.group_size);
        let mut groups = Vec::with_capacity(segments.len());

        for (index, members) in segments.into_iter().enumerate() {
            let combo = self
                .selector
                .select(&SelectionContext {
                    kind: task.kind(),
                    grade: &task.grade,
                    subject: &task.subject,
                    members: &members,
                    group_index: index,
                })
                .await;

            let group = Group::new(task_id, class_id, (index + 1) as u32, members, &combo.name);

            self.store.insert_group(&group).await.map_err(|source| {
                GroupingError::GroupPersistFailed {
                    group_number: group.group_number,
                    source,
                }
            })?;

            groups.push(group);
        }

        info!(
            task = %task_id,
            groups = groups.len(),
            "groups created"
        );

        let message = format!("created {} groups", groups.len());
        Ok(GroupingOutcome { groups, message })
    }
}
