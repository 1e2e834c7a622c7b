//! Database schema constants.
//!
//! All SQL schema definitions for the PostgreSQL storage backend. Statements
//! use IF NOT EXISTS so the migration runner stays idempotent.

/// SQL schema for the tasks table. Payloads (including payload status) are
/// stored as JSONB; the denormalized status column serves the aggregation
/// queries.
pub const CREATE_TASKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
    id UUID PRIMARY KEY,
    class_id UUID NOT NULL,
    parent_id UUID REFERENCES tasks(id) ON DELETE CASCADE,
    group_id UUID,
    kind VARCHAR(16) NOT NULL,
    status VARCHAR(16) NOT NULL,
    topic VARCHAR(512) NOT NULL,
    purpose VARCHAR(255) NOT NULL,
    grade VARCHAR(32) NOT NULL,
    subject VARCHAR(255) NOT NULL,
    length_minutes INTEGER NOT NULL,
    combo VARCHAR(255),
    payload JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// SQL schema for the groups table.
pub const CREATE_GROUPS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS groups (
    id UUID PRIMARY KEY,
    task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    class_id UUID NOT NULL,
    group_number INTEGER NOT NULL,
    member_ids JSONB NOT NULL,
    combo VARCHAR(255) NOT NULL,
    variant_task_id UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE(task_id, group_number)
)
"#;

/// SQL schema for class enrollments.
pub const CREATE_ENROLLMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS enrollments (
    class_id UUID PRIMARY KEY,
    learner_ids JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// SQL schema for session feedback records.
pub const CREATE_SESSION_FEEDBACK_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS session_feedback (
    id UUID PRIMARY KEY,
    learner_id UUID NOT NULL,
    class_id UUID NOT NULL,
    kind VARCHAR(16) NOT NULL,
    topic VARCHAR(512) NOT NULL,
    purpose VARCHAR(255) NOT NULL,
    grade VARCHAR(32) NOT NULL,
    subject VARCHAR(255) NOT NULL,
    length_bucket VARCHAR(16) NOT NULL,
    combo VARCHAR(255) NOT NULL,
    provider VARCHAR(64) NOT NULL,
    model VARCHAR(255) NOT NULL,
    signals JSONB NOT NULL,
    focus DOUBLE PRECISION,
    engagement DOUBLE PRECISION,
    thinking DOUBLE PRECISION,
    completed BOOLEAN NOT NULL DEFAULT TRUE,
    survey_submission_id VARCHAR(255),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// SQL schema for performance profiles, keyed by the flattened composite key.
pub const CREATE_PERFORMANCE_PROFILES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS performance_profiles (
    storage_key VARCHAR(1024) PRIMARY KEY,
    key JSONB NOT NULL,
    clarity DOUBLE PRECISION NOT NULL,
    engagement DOUBLE PRECISION NOT NULL,
    confidence DOUBLE PRECISION NOT NULL,
    attention_span DOUBLE PRECISION NOT NULL,
    fatigue_slope DOUBLE PRECISION NOT NULL,
    session_count BIGINT NOT NULL,
    performance_score DOUBLE PRECISION NOT NULL,
    status VARCHAR(16) NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// SQL for creating all required indexes.
pub const CREATE_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_tasks_parent ON tasks(parent_id, created_at);
CREATE INDEX IF NOT EXISTS idx_groups_task ON groups(task_id, group_number);
CREATE INDEX IF NOT EXISTS idx_feedback_learner
    ON session_feedback(learner_id, kind, grade, subject, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_feedback_context
    ON session_feedback(kind, grade, subject, created_at DESC)
"#;

/// Every schema statement, in application order.
pub fn all_schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_TASKS_TABLE,
        CREATE_GROUPS_TABLE,
        CREATE_ENROLLMENTS_TABLE,
        CREATE_SESSION_FEEDBACK_TABLE,
        CREATE_PERFORMANCE_PROFILES_TABLE,
        CREATE_INDEXES,
    ]
}
