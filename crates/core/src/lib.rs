//! # Grantflow Core
//!
//! Adaptive interviewing and grant application generation.
//!
//! ## Architecture
//!
//! - `interview/` - Reference point bank, conversation flow state machine and
//!   the interviewer agent that produces an anketa
//! - `pipeline/` - Research → Write → Audit runner with artifact export
//! - `skills/` - LLM-backed implementations of the collaborator traits
//! - `state/` - Runtime directory and SQLite persistence
//! - `models` / `config` - Provider selection and settings
//!
//! ## Usage
//!
//! ```rust,ignore
//! use grantflow_core::interview::{InteractiveInterviewerAgent, InterviewConfig, UserData};
//!
//! let agent = InteractiveInterviewerAgent::new(decider, InterviewConfig::default());
//! let result = agent.conduct_interview(&UserData::new("u-1"), &asker, &notifier).await?;
//!
//! let pipeline = GrantPipeline::new(researcher, writer, auditor, PipelineConfig::default());
//! let package = pipeline.run(&result.anketa, Path::new("out")).await?;
//! ```

pub mod config;
pub mod error;
pub mod interview;
pub mod models;
pub mod pipeline;
pub mod skills;
pub mod state;

pub use config::GrantflowConfig;
pub use error::{DecisionParseError, FlowFault, InterviewError, PipelineError};

/// Crate version, reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
