//! Error types for the interview and pipeline domains.
//!
//! Two families live here:
//!
//! - **Recovered locally**: [`DecisionParseError`] and [`FlowFault`]. The flow
//!   manager logs these and routes around them; they never reach a caller.
//! - **Surfaced**: [`InterviewError`] and [`PipelineError`], returned from
//!   `conduct_interview` and `GrantPipeline::run`.

use std::path::PathBuf;

use crate::pipeline::PipelineStage;

/// A decision payload from the decision function that failed validation
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum DecisionParseError {
    #[error("Decision payload is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Unknown next_action: {0}")]
    UnknownAction(String),

    #[error("answer_quality {0} outside 1..=10")]
    QualityOutOfRange(i64),

    #[error("completeness {0} outside 0..=1")]
    CompletenessOutOfRange(f64),

    #[error("Clarifying question text is empty")]
    EmptyClarification,

    #[error("Finalize requested after {asked} questions (minimum {min})")]
    PrematureFinalize { asked: u32, min: u32 },

    #[error("Finalize requested with {0} required reference point(s) uncovered")]
    RequiredPointsUncovered(usize),
}

/// Faults the flow manager absorbs while picking the next step
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum FlowFault {
    #[error("Malformed decision: {0}")]
    DecisionParse(#[from] DecisionParseError),

    #[error("Clarification cap reached for reference point '{point_id}'")]
    ClarificationCapExceeded { point_id: String },

    #[error("All reference points consumed after {questions_asked} questions")]
    CoverageStalemate { questions_asked: u32 },
}

/// Errors that abort `conduct_interview`
#[derive(Debug, thiserror::Error)]
pub enum InterviewError {
    #[error("Decision function failed on turn {turn}: {source}")]
    DecisionCall {
        turn: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("Question channel failed on turn {turn}: {source}")]
    Ask {
        turn: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to persist anketa: {0}")]
    Persistence(#[source] anyhow::Error),
}

/// Errors that abort `GrantPipeline::run`
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Stage {stage:?} failed ({} artifact(s) kept): {source}", .produced.len())]
    Stage {
        stage: PipelineStage,
        /// Artifacts written before the failure
        produced: Vec<PathBuf>,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to export {path:?}: {source}")]
    Export {
        path: PathBuf,
        produced: Vec<PathBuf>,
        #[source]
        source: anyhow::Error,
    },
}

impl PipelineError {
    /// Artifacts that were successfully written before the run aborted
    pub fn produced_artifacts(&self) -> &[PathBuf] {
        match self {
            Self::Stage { produced, .. } | Self::Export { produced, .. } => produced,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_fault_wraps_parse_error() {
        let fault: FlowFault = DecisionParseError::UnknownAction("dance".to_string()).into();
        assert!(fault.to_string().contains("Unknown next_action: dance"));
    }

    #[test]
    fn test_premature_finalize_message() {
        let err = DecisionParseError::PrematureFinalize { asked: 3, min: 8 };
        assert_eq!(
            err.to_string(),
            "Finalize requested after 3 questions (minimum 8)"
        );
    }

    #[test]
    fn test_stage_error_reports_produced_artifacts() {
        let err = PipelineError::Stage {
            stage: PipelineStage::Writing,
            produced: vec![PathBuf::from("out/01_research.json")],
            source: anyhow::anyhow!("writer exploded"),
        };
        assert_eq!(err.produced_artifacts().len(), 1);
        assert!(err.to_string().contains("Writing"));
        assert!(err.to_string().contains("1 artifact(s) kept"));
    }
}
