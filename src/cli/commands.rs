//! CLI command definitions for lessonforge.
//!
//! Provides commands for driving the task/variant pipeline and the feedback
//! loop: an offline demo over the in-memory store, plus database-backed
//! operations (task creation, reconciliation, feedback ingestion, profile
//! inspection).

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::error::{FeedbackError, GenerationError};
use crate::feedback::{TracingAlertSink, VitalsProbe};
use crate::generation::{
    BackboardClient, GenerationBackend, QuizQuestionsResult, ScriptResult, SlideScript,
};
use crate::metrics::{export_metrics, init_metrics};
use crate::model::{
    LengthBucket, QuizQuestion, SessionMetrics, TaskContext, TaskKind,
};
use crate::selection::catalogue;
use crate::service::{PlatformService, SessionReport, TaskRequest};
use crate::storage::{Database, MemoryStore, Store};

/// Adaptive lesson variant generator and feedback scorer.
#[derive(Parser)]
#[command(name = "lessonforge")]
#[command(about = "Generate per-cohort lesson and quiz variants, score them from biometric feedback")]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Print Prometheus metrics after the command completes.
    #[arg(long, global = true)]
    pub metrics: bool,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the full pipeline offline: groups, variants, feedback, profiles.
    Demo(DemoArgs),

    /// Seed a class enrollment with generated learner ids.
    Enroll(EnrollArgs),

    /// Create a task and run its variant pipelines against the database.
    #[command(name = "create-task")]
    CreateTask(CreateTaskArgs),

    /// Re-derive a parent task's status from its variants (repair path).
    Reconcile(ReconcileArgs),

    /// Ingest one session's raw metrics from a JSON file.
    Feedback(FeedbackArgs),

    /// List learned performance profiles.
    Profiles,
}

/// Arguments for `lessonforge demo`.
#[derive(Parser, Debug)]
pub struct DemoArgs {
    /// Number of learners to enroll in the demo class.
    #[arg(long, default_value = "14")]
    pub learners: usize,

    /// Lesson topic.
    #[arg(long, default_value = "Photosynthesis")]
    pub topic: String,

    /// Task kind (lesson or quiz).
    #[arg(long, default_value = "lesson")]
    pub kind: TaskKind,

    /// Cohort size.
    #[arg(long, default_value = "6")]
    pub group_size: usize,
}

/// Arguments for `lessonforge enroll`.
#[derive(Parser, Debug)]
pub struct EnrollArgs {
    /// Class to enroll into.
    #[arg(long)]
    pub class: Uuid,

    /// Number of learner ids to generate.
    #[arg(long, default_value = "24")]
    pub count: usize,
}

/// Arguments for `lessonforge create-task`.
#[derive(Parser, Debug)]
pub struct CreateTaskArgs {
    /// Class the task belongs to.
    #[arg(long)]
    pub class: Uuid,

    /// Task kind (lesson or quiz).
    #[arg(long, default_value = "lesson")]
    pub kind: TaskKind,

    /// Topic of the task.
    #[arg(long)]
    pub topic: String,

    /// Pedagogical purpose.
    #[arg(long, default_value = "introduction")]
    pub purpose: String,

    /// Grade level.
    #[arg(long, default_value = "7")]
    pub grade: String,

    /// Subject.
    #[arg(long, default_value = "general")]
    pub subject: String,

    /// Lesson length in minutes.
    #[arg(long, default_value = "12")]
    pub length_minutes: u32,

    /// Quiz question type.
    #[arg(long)]
    pub question_type: Option<String>,

    /// Quiz question count.
    #[arg(long)]
    pub num_questions: Option<u32>,
}

/// Arguments for `lessonforge reconcile`.
#[derive(Parser, Debug)]
pub struct ReconcileArgs {
    /// Parent task to reconcile.
    pub task_id: Uuid,
}

/// Arguments for `lessonforge feedback`.
#[derive(Parser, Debug)]
pub struct FeedbackArgs {
    /// JSON file with the session's aggregated metrics.
    pub file: PathBuf,

    /// Learner the session belongs to.
    #[arg(long)]
    pub learner: Uuid,

    /// Class the session belongs to.
    #[arg(long)]
    pub class: Uuid,

    /// Task kind of the session's content.
    #[arg(long, default_value = "lesson")]
    pub kind: TaskKind,

    /// Topic of the session's content.
    #[arg(long)]
    pub topic: String,

    /// Pedagogical purpose.
    #[arg(long, default_value = "introduction")]
    pub purpose: String,

    /// Grade level.
    #[arg(long, default_value = "7")]
    pub grade: String,

    /// Subject.
    #[arg(long, default_value = "general")]
    pub subject: String,

    /// Lesson length in minutes, bucketed for the profile key.
    #[arg(long, default_value = "12")]
    pub length_minutes: u32,

    /// Combo that produced the session's content.
    #[arg(long)]
    pub combo: String,

    /// Session id the metrics belong to.
    #[arg(long)]
    pub session: Option<Uuid>,
}

/// Parses CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Runs the CLI with parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    if let Err(e) = init_metrics() {
        tracing::warn!(error = %e, "metrics initialization failed");
    }

    let result = match cli.command {
        Commands::Demo(args) => run_demo(args).await,
        Commands::Enroll(args) => run_enroll(args).await,
        Commands::CreateTask(args) => run_create_task(args).await,
        Commands::Reconcile(args) => run_reconcile(args).await,
        Commands::Feedback(args) => run_feedback(args).await,
        Commands::Profiles => run_profiles().await,
    };

    if cli.metrics {
        println!("{}", export_metrics());
    }

    result
}

async fn run_demo(args: DemoArgs) -> anyhow::Result<()> {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let class_id = Uuid::new_v4();
    let learners: Vec<Uuid> = (0..args.learners).map(|_| Uuid::new_v4()).collect();
    store.upsert_enrollment(class_id, &learners).await?;

    let config = ServiceConfig::default().with_group_size(args.group_size);
    let service = PlatformService::new(
        store.clone(),
        Arc::new(CannedBackend),
        Arc::new(TracingAlertSink),
        &config,
    );

    let created = service
        .create_task(TaskRequest {
            class_id,
            kind: args.kind,
            topic: args.topic.clone(),
            purpose: "introduction".to_string(),
            grade: "7".to_string(),
            subject: "science".to_string(),
            length_minutes: 12,
            question_type: Some("MCQ".to_string()),
            num_questions: Some(5),
        })
        .await?;

    println!(
        "task {} created: {} ({} groups)",
        created.task.id, created.message, created.group_count
    );

    let outcomes = service.generate_variants(created.task.id).await?;
    for outcome in &outcomes {
        println!(
            "  group {} [{}] -> {} in {:.1}s",
            outcome.group_number,
            outcome.combo,
            outcome.status,
            outcome.duration.as_secs_f64()
        );
    }

    let parent = store
        .get_task(created.task.id)
        .await?
        .expect("demo task vanished");
    println!("parent status: {}", parent.status());

    // Feed one synthetic session per learner back into the scorer.
    let groups = store.list_groups(created.task.id).await?;
    for group in &groups {
        let combo = catalogue::find(args.kind, &group.combo).expect("catalogue combo");
        let primary = combo.primary_model();
        for learner in &group.member_ids {
            service
                .complete_session(SessionReport {
                    learner_id: *learner,
                    class_id,
                    context: TaskContext {
                        kind: args.kind,
                        topic: args.topic.clone(),
                        purpose: "introduction".to_string(),
                        grade: "7".to_string(),
                        subject: "science".to_string(),
                        length_bucket: LengthBucket::from_minutes(12),
                    },
                    combo: combo.name.clone(),
                    provider: primary.provider.clone(),
                    model: primary.model.clone(),
                    metrics: SessionMetrics {
                        average_focus_score: Some(70.0 + 5.0 * group.group_number as f64),
                        average_engagement_score: Some(65.0 + 5.0 * group.group_number as f64),
                        average_thinking_intensity: Some(55.0),
                        average_heart_rate: Some(78.0),
                        average_breathing_rate: Some(15.0),
                        heart_rate_std_dev: Some(4.0),
                        breathing_rate_std_dev: Some(1.5),
                        breathing_samples: vec![14.0, 15.0, 15.5, 16.0],
                    },
                })
                .await;
        }
    }

    println!("profiles after feedback:");
    for profile in store.list_profiles().await? {
        println!(
            "  {} -> score {:.3} over {} sessions",
            profile.key.storage_key(),
            profile.performance_score,
            profile.session_count
        );
    }

    Ok(())
}

async fn run_enroll(args: EnrollArgs) -> anyhow::Result<()> {
    let database = connect_database().await?;
    let learners: Vec<Uuid> = (0..args.count).map(|_| Uuid::new_v4()).collect();
    database.upsert_enrollment(args.class, &learners).await?;
    println!("enrolled {} learners in class {}", learners.len(), args.class);
    Ok(())
}

async fn run_create_task(args: CreateTaskArgs) -> anyhow::Result<()> {
    let service = database_service().await?;

    let created = service
        .create_task(TaskRequest {
            class_id: args.class,
            kind: args.kind,
            topic: args.topic,
            purpose: args.purpose,
            grade: args.grade,
            subject: args.subject,
            length_minutes: args.length_minutes,
            question_type: args.question_type,
            num_questions: args.num_questions,
        })
        .await?;

    println!(
        "task {} created: {} ({} groups)",
        created.task.id, created.message, created.group_count
    );

    let outcomes = service.generate_variants(created.task.id).await?;
    for outcome in &outcomes {
        match &outcome.error {
            Some(error) => println!(
                "  group {} [{}] -> {}: {}",
                outcome.group_number, outcome.combo, outcome.status, error
            ),
            None => println!(
                "  group {} [{}] -> {}",
                outcome.group_number, outcome.combo, outcome.status
            ),
        }
    }

    let status = service.reconcile(created.task.id).await?;
    println!("parent status: {}", status);
    Ok(())
}

async fn run_reconcile(args: ReconcileArgs) -> anyhow::Result<()> {
    let service = database_service().await?;
    let status = service.reconcile(args.task_id).await?;
    println!("task {} status: {}", args.task_id, status);
    Ok(())
}

async fn run_feedback(args: FeedbackArgs) -> anyhow::Result<()> {
    let probe = JsonFileProbe {
        path: args.file.clone(),
    };
    let session_id = args.session.unwrap_or_else(Uuid::new_v4);
    let metrics = probe.session_metrics(session_id).await?;

    let combo = catalogue::find(args.kind, &args.combo)
        .ok_or_else(|| anyhow::anyhow!("combo '{}' not in the {} catalogue", args.combo, args.kind))?;
    let primary = combo.primary_model();

    let service = database_service().await?;
    let outcome = service
        .complete_session(SessionReport {
            learner_id: args.learner,
            class_id: args.class,
            context: TaskContext {
                kind: args.kind,
                topic: args.topic,
                purpose: args.purpose,
                grade: args.grade,
                subject: args.subject,
                length_bucket: LengthBucket::from_minutes(args.length_minutes),
            },
            combo: combo.name.clone(),
            provider: primary.provider.clone(),
            model: primary.model.clone(),
            metrics,
        })
        .await;

    println!(
        "session recorded: {} (clarity {:.2}, engagement {:.2}, fatigue {})",
        outcome.recorded,
        outcome.signals.clarity,
        outcome.signals.engagement,
        outcome.signals.fatigue_trend
    );
    if let Some(score) = outcome.performance_score {
        println!("profile score: {:.3}", score);
    }
    Ok(())
}

async fn run_profiles() -> anyhow::Result<()> {
    let database = connect_database().await?;
    let profiles = database.list_profiles().await?;

    if profiles.is_empty() {
        println!("no profiles learned yet");
        return Ok(());
    }

    for profile in profiles {
        println!(
            "{} [{}] score {:.3}, sessions {}, slope {:+.3}",
            profile.key.storage_key(),
            profile.status.as_str(),
            profile.performance_score,
            profile.session_count,
            profile.fatigue_slope
        );
    }
    Ok(())
}

async fn connect_database() -> anyhow::Result<Database> {
    let config = ServiceConfig::from_env()?;
    let database = Database::connect(&config.database_url).await?;
    database.run_migrations().await?;
    Ok(database)
}

async fn database_service() -> anyhow::Result<PlatformService> {
    let config = ServiceConfig::from_env()?;
    let database = Arc::new(Database::connect(&config.database_url).await?);
    database.run_migrations().await?;

    let backend = Arc::new(BackboardClient::from_env()?);
    Ok(PlatformService::new(
        database,
        backend,
        Arc::new(TracingAlertSink),
        &config,
    ))
}

/// Vitals probe that reads a session's aggregated metrics from a JSON dump
/// written by the biometric service.
struct JsonFileProbe {
    path: PathBuf,
}

#[async_trait::async_trait]
impl VitalsProbe for JsonFileProbe {
    async fn session_metrics(&self, _session_id: Uuid) -> Result<SessionMetrics, FeedbackError> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| FeedbackError::ProbeFailed(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| FeedbackError::ProbeFailed(e.to_string()))
    }
}

/// Offline backend used by the demo command: deterministic canned content,
/// no network.
struct CannedBackend;

#[async_trait::async_trait]
impl GenerationBackend for CannedBackend {
    async fn generate_script(
        &self,
        topic: &str,
        length_minutes: u32,
        _provider: &str,
        _model: &str,
    ) -> Result<ScriptResult, GenerationError> {
        let num_slides = (length_minutes / 2).max(3);
        let slides: Vec<SlideScript> = (1..=num_slides)
            .map(|n| SlideScript {
                slide_number: n,
                script: format!("Slide {} of a lesson about {}.", n, topic),
            })
            .collect();
        Ok(ScriptResult {
            script: format!("A {}-minute lesson about {}.", length_minutes, topic),
            slides,
        })
    }

    async fn generate_image(
        &self,
        _slide_script: &str,
        slide_number: u32,
        _topic: &str,
        _provider: &str,
        _model: &str,
    ) -> Result<String, GenerationError> {
        Ok(format!("https://assets.local/images/slide-{}.png", slide_number))
    }

    async fn generate_speech(
        &self,
        _text: &str,
        _voice: Option<&str>,
    ) -> Result<String, GenerationError> {
        Ok("https://assets.local/speech/narration.mp3".to_string())
    }

    async fn generate_quiz_prompt(
        &self,
        topic: &str,
        question_type: &str,
        num_questions: u32,
        _provider: &str,
        _model: &str,
    ) -> Result<String, GenerationError> {
        Ok(format!(
            "Write {} {} questions about {}.",
            num_questions, question_type, topic
        ))
    }

    async fn generate_quiz_questions(
        &self,
        _prompt: &str,
        topic: &str,
        question_type: &str,
        num_questions: u32,
        _provider: &str,
        _model: &str,
    ) -> Result<QuizQuestionsResult, GenerationError> {
        let questions = (1..=num_questions)
            .map(|n| QuizQuestion {
                question: format!("Question {} about {}?", n, topic),
                question_type: question_type.to_string(),
                options: vec![
                    "Option A".to_string(),
                    "Option B".to_string(),
                    "Option C".to_string(),
                    "Option D".to_string(),
                ],
                correct_answer: "Option A".to_string(),
                explanation: Some("Canned explanation.".to_string()),
            })
            .collect();
        Ok(QuizQuestionsResult { questions })
    }
}
