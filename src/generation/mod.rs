//! Variant generation: backend capability, pipelines and aggregation.

pub mod aggregator;
pub mod backboard;
pub mod backend;
pub mod variant;

pub use aggregator::{derive_parent_update, reconcile, ParentUpdate};
pub use backboard::BackboardClient;
pub use backend::{GenerationBackend, QuizQuestionsResult, ScriptResult, SlideScript};
pub use variant::{VariantConfig, VariantGenerator, VariantOutcome};
