//! # Grant Pipeline
//!
//! Turns a completed anketa into a grant application package.
//!
//! ```text
//! Anketa → Researcher → 01_research.json
//!        → Writer     → 02_draft.md
//!        → (cooldown)
//!        → Auditor    → 03_audit.json
//! ```

pub mod agents;
pub mod backoff;
pub mod events;
pub mod export;
pub mod runner;
pub mod stage;

pub use agents::{Auditor, Researcher, Writer};
pub use backoff::BackoffPolicy;
pub use events::{PipelineEvent, PipelineEventKind};
pub use export::{AUDIT_ARTIFACT, DRAFT_ARTIFACT, RESEARCH_ARTIFACT, SUMMARY_ARTIFACT};
pub use runner::{GrantPipeline, PipelineConfig, PipelineResult, RunSummary, StageTiming};
pub use stage::{PipelineStage, StageMachine};
