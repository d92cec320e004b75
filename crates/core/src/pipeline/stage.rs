//! # Pipeline Stages
//!
//! Defines the stages of the grant pipeline and the state machine that walks
//! through them.

use serde::{Deserialize, Serialize};

/// Stage of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Not started
    Pending,
    /// Researcher gathering context for the project
    Researching,
    /// Writer drafting the application
    Writing,
    /// Auditor reviewing the draft
    Auditing,
    /// Complete
    Complete,
    /// Failed
    Failed,
}

impl PipelineStage {
    /// Agent name used in logs and events
    pub fn agent(&self) -> &'static str {
        match self {
            Self::Researching => "researcher",
            Self::Writing => "writer",
            Self::Auditing => "auditor",
            Self::Pending | Self::Complete | Self::Failed => "pipeline",
        }
    }

    /// 1-based position of a working stage, used to prefix artifacts
    pub fn ordinal(&self) -> Option<u8> {
        match self {
            Self::Researching => Some(1),
            Self::Writing => Some(2),
            Self::Auditing => Some(3),
            _ => None,
        }
    }
}

/// The pipeline state machine
#[derive(Debug, Clone)]
pub struct StageMachine {
    /// Current stage
    pub stage: PipelineStage,
    /// Working stages finished so far, in order
    pub completed: Vec<PipelineStage>,
}

impl Default for StageMachine {
    fn default() -> Self {
        Self {
            stage: PipelineStage::Pending,
            completed: Vec::new(),
        }
    }
}

impl StageMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to the next stage
    pub fn advance(&mut self) {
        if self.stage.ordinal().is_some() {
            self.completed.push(self.stage);
        }
        self.stage = match self.stage {
            PipelineStage::Pending => PipelineStage::Researching,
            PipelineStage::Researching => PipelineStage::Writing,
            PipelineStage::Writing => PipelineStage::Auditing,
            PipelineStage::Auditing => PipelineStage::Complete,
            PipelineStage::Complete => PipelineStage::Complete,
            PipelineStage::Failed => PipelineStage::Failed,
        };
    }

    /// Fail the pipeline, returning the stage that was running
    pub fn fail(&mut self) -> PipelineStage {
        let failed_at = self.stage;
        self.stage = PipelineStage::Failed;
        failed_at
    }

    /// Check if pipeline is complete
    pub fn is_complete(&self) -> bool {
        matches!(self.stage, PipelineStage::Complete | PipelineStage::Failed)
    }

    /// Check if pipeline succeeded
    pub fn is_success(&self) -> bool {
        self.stage == PipelineStage::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_machine_advance() {
        let mut machine = StageMachine::new();
        assert_eq!(machine.stage, PipelineStage::Pending);

        machine.advance();
        assert_eq!(machine.stage, PipelineStage::Researching);
        machine.advance();
        assert_eq!(machine.stage, PipelineStage::Writing);
        machine.advance();
        assert_eq!(machine.stage, PipelineStage::Auditing);
        machine.advance();
        assert!(machine.is_success());
        assert_eq!(
            machine.completed,
            vec![
                PipelineStage::Researching,
                PipelineStage::Writing,
                PipelineStage::Auditing
            ]
        );
    }

    #[test]
    fn test_fail_is_terminal() {
        let mut machine = StageMachine::new();
        machine.advance();
        machine.advance();

        assert_eq!(machine.fail(), PipelineStage::Writing);
        assert!(machine.is_complete());
        assert!(!machine.is_success());

        machine.advance();
        assert_eq!(machine.stage, PipelineStage::Failed);
        assert_eq!(machine.completed, vec![PipelineStage::Researching]);
    }

    #[test]
    fn test_ordinals() {
        assert_eq!(PipelineStage::Researching.ordinal(), Some(1));
        assert_eq!(PipelineStage::Auditing.ordinal(), Some(3));
        assert_eq!(PipelineStage::Complete.ordinal(), None);
        assert_eq!(PipelineStage::Writing.agent(), "writer");
    }
}
