//! In-memory store.
//!
//! Map-backed implementation of [`Store`] used by the demo command and the
//! test suite. All collections live behind one async `RwLock` so the status
//! aggregator always sees a consistent snapshot of a task's siblings.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::model::{
    Group, PerformanceProfile, ProfileKey, SessionFeedback, Task, TaskKind, TaskPayload,
    TaskStatus,
};

use super::{Store, StoreError};

#[derive(Default)]
struct Inner {
    enrollments: HashMap<Uuid, Vec<Uuid>>,
    tasks: HashMap<Uuid, Task>,
    groups: HashMap<Uuid, Group>,
    feedback: Vec<SessionFeedback>,
    profiles: HashMap<String, PerformanceProfile>,
}

/// In-process [`Store`] implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_enrollment(&self, class_id: Uuid) -> Result<Option<Vec<Uuid>>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.enrollments.get(&class_id).cloned())
    }

    async fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.tasks.get(&id).cloned())
    }

    async fn update_task_payload(&self, id: Uuid, payload: &TaskPayload) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let task = inner
            .tasks
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("task {}", id)))?;
        task.payload = payload.clone();
        Ok(())
    }

    async fn update_task_status(&self, id: Uuid, status: TaskStatus) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let task = inner
            .tasks
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("task {}", id)))?;
        task.payload.set_status(status);
        Ok(())
    }

    async fn list_variants(&self, parent_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let inner = self.inner.read().await;
        let mut variants: Vec<Task> = inner
            .tasks
            .values()
            .filter(|t| t.parent_id == Some(parent_id))
            .cloned()
            .collect();
        variants.sort_by_key(|t| t.created_at);
        Ok(variants)
    }

    async fn insert_group(&self, group: &Group) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.groups.insert(group.id, group.clone());
        Ok(())
    }

    async fn set_group_variant(&self, group_id: Uuid, variant_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let group = inner
            .groups
            .get_mut(&group_id)
            .ok_or_else(|| StoreError::NotFound(format!("group {}", group_id)))?;
        group.variant_task_id = Some(variant_id);
        Ok(())
    }

    async fn list_groups(&self, task_id: Uuid) -> Result<Vec<Group>, StoreError> {
        let inner = self.inner.read().await;
        let mut groups: Vec<Group> = inner
            .groups
            .values()
            .filter(|g| g.task_id == task_id)
            .cloned()
            .collect();
        groups.sort_by_key(|g| g.group_number);
        Ok(groups)
    }

    async fn insert_feedback(&self, feedback: &SessionFeedback) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.feedback.push(feedback.clone());
        Ok(())
    }

    async fn set_feedback_survey_id(
        &self,
        feedback_id: Uuid,
        submission_id: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let record = inner
            .feedback
            .iter_mut()
            .find(|f| f.id == feedback_id)
            .ok_or_else(|| StoreError::NotFound(format!("feedback {}", feedback_id)))?;
        record.survey_submission_id = Some(submission_id.to_string());
        Ok(())
    }

    async fn learner_sessions(
        &self,
        learner_id: Uuid,
        kind: TaskKind,
        grade: &str,
        subject: &str,
        limit: usize,
    ) -> Result<Vec<SessionFeedback>, StoreError> {
        let inner = self.inner.read().await;
        let mut sessions: Vec<SessionFeedback> = inner
            .feedback
            .iter()
            .filter(|f| {
                f.completed
                    && f.learner_id == learner_id
                    && f.context.kind == kind
                    && f.context.grade == grade
                    && f.context.subject == subject
            })
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions.truncate(limit);
        Ok(sessions)
    }

    async fn recent_sessions(
        &self,
        kind: TaskKind,
        grade: &str,
        subject: &str,
        limit: usize,
    ) -> Result<Vec<SessionFeedback>, StoreError> {
        let inner = self.inner.read().await;
        let mut sessions: Vec<SessionFeedback> = inner
            .feedback
            .iter()
            .filter(|f| {
                f.completed
                    && f.context.kind == kind
                    && f.context.grade == grade
                    && f.context.subject == subject
            })
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions.truncate(limit);
        Ok(sessions)
    }

    async fn get_profile(&self, key: &ProfileKey) -> Result<Option<PerformanceProfile>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.profiles.get(&key.storage_key()).cloned())
    }

    async fn upsert_profile(&self, profile: &PerformanceProfile) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .profiles
            .insert(profile.key.storage_key(), profile.clone());
        Ok(())
    }

    async fn list_profiles(&self) -> Result<Vec<PerformanceProfile>, StoreError> {
        let inner = self.inner.read().await;
        let mut profiles: Vec<PerformanceProfile> = inner.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| a.key.storage_key().cmp(&b.key.storage_key()));
        Ok(profiles)
    }

    async fn upsert_enrollment(&self, class_id: Uuid, learners: &[Uuid]) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.enrollments.insert(class_id, learners.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LessonData, TaskPayload};

    fn parent_task(class_id: Uuid) -> Task {
        Task::new_parent(
            class_id,
            "Photosynthesis",
            "introduction",
            "7",
            "biology",
            12,
            TaskPayload::Lesson(LessonData::default()),
        )
    }

    #[tokio::test]
    async fn test_unknown_class_is_distinct_from_empty_enrollment() {
        let store = MemoryStore::new();
        let class_id = Uuid::new_v4();
        assert!(store.get_enrollment(class_id).await.unwrap().is_none());

        store.upsert_enrollment(class_id, &[]).await.unwrap();
        assert_eq!(store.get_enrollment(class_id).await.unwrap(), Some(vec![]));
    }

    #[tokio::test]
    async fn test_variants_ordered_by_creation() {
        let store = MemoryStore::new();
        let parent = parent_task(Uuid::new_v4());
        store.insert_task(&parent).await.unwrap();

        let mut first = Task::new_variant(&parent, Uuid::new_v4(), "a");
        let mut second = Task::new_variant(&parent, Uuid::new_v4(), "b");
        // Force distinct, ordered timestamps.
        first.created_at = parent.created_at - chrono::Duration::seconds(1);
        second.created_at = parent.created_at + chrono::Duration::seconds(1);
        store.insert_task(&second).await.unwrap();
        store.insert_task(&first).await.unwrap();

        let variants = store.list_variants(parent.id).await.unwrap();
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].id, first.id);
        assert_eq!(variants[1].id, second.id);
    }

    #[tokio::test]
    async fn test_update_missing_task_fails() {
        let store = MemoryStore::new();
        let err = store
            .update_task_status(Uuid::new_v4(), TaskStatus::Failed)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
