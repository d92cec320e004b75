//! # Grantflow Skills
//!
//! Model-backed implementations of the collaborator traits.
//!
//! ```text
//! Interview:  InterviewerSkill (DecisionFunction), BlockAuditorSkill (BlockAuditor)
//! Pipeline:   ResearcherSkill → WriterSkill → AuditorSkill
//! ```
//!
//! Every skill retries its model call under the shared `BackoffPolicy`.

pub mod llm_helpers;
pub mod prompts;

// Interview
pub mod block_auditor_skill;
pub mod interviewer_skill;

// Pipeline stages
pub mod auditor_skill;
pub mod researcher_skill;
pub mod writer_skill;

pub use auditor_skill::{AuditIssue, AuditOutput, AuditorSkill};
pub use block_auditor_skill::BlockAuditorSkill;
pub use interviewer_skill::InterviewerSkill;
pub use researcher_skill::{ResearchFinding, ResearchOutput, ResearcherSkill};
pub use writer_skill::{DraftOutput, DraftSection, WriterSkill};
