//! Cohort groups.
//!
//! A group binds a fixed cohort of learners within one task to one model
//! combo. Groups are created once at task-creation time, updated exactly once
//! when their variant task is materialized, and never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A cohort of learners bound to one task and one combo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub task_id: Uuid,
    pub class_id: Uuid,
    /// 1-based, stable ordering within a task.
    pub group_number: u32,
    /// Unique within the group, disjoint across groups of the same task.
    pub member_ids: Vec<Uuid>,
    /// Name of the catalogue combo assigned to this cohort.
    pub combo: String,
    /// Set once when the variant task is created.
    pub variant_task_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn new(
        task_id: Uuid,
        class_id: Uuid,
        group_number: u32,
        member_ids: Vec<Uuid>,
        combo: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            class_id,
            group_number,
            member_ids,
            combo: combo.into(),
            variant_task_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn size(&self) -> usize {
        self.member_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_starts_without_variant() {
        let members = vec![Uuid::new_v4(), Uuid::new_v4()];
        let group = Group::new(Uuid::new_v4(), Uuid::new_v4(), 1, members, "gemini-flash");
        assert_eq!(group.group_number, 1);
        assert_eq!(group.size(), 2);
        assert!(group.variant_task_id.is_none());
    }
}
