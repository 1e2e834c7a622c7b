//! Core data model: tasks, groups, combos, profiles and feedback records.

pub mod combo;
pub mod feedback;
pub mod group;
pub mod profile;
pub mod task;

pub use combo::{Combo, ComboRoles, ModelRef};
pub use feedback::{FatigueTrend, FeedbackSignals, SessionFeedback, SessionMetrics, TaskContext};
pub use group::Group;
pub use profile::{PerformanceProfile, ProfileKey, ProfileStatus};
pub use task::{
    LengthBucket, LessonData, QuizData, QuizQuestion, Slide, Task, TaskKind, TaskPayload,
    TaskStatus,
};
