//! # Pipeline Events
//!
//! Progress events streamed to observers of a pipeline run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stage::PipelineStage;

/// Kind of pipeline event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineEventKind {
    /// Run started
    RunStarted,
    /// Stage agent started working
    StageStarted,
    /// Stage agent completed successfully
    StageCompleted,
    /// Stage agent failed
    StageFailed,
    /// Artifact written to the export directory
    ArtifactExported,
    /// Rate-limit pause between stages
    Cooldown,
    /// Run completed
    RunCompleted,
    /// Run failed
    RunFailed,
}

/// An event in a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// Unique event ID
    pub id: String,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Kind of event
    pub kind: PipelineEventKind,
    /// Agent that produced this event
    pub agent: String,
    /// Stage the event belongs to, if any
    #[serde(default)]
    pub stage: Option<PipelineStage>,
    /// Associated data (JSON)
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl PipelineEvent {
    /// Create a new event
    pub fn new(kind: PipelineEventKind, agent: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            agent: agent.to_string(),
            stage: None,
            data: None,
        }
    }

    /// Event attributed to a stage's agent
    pub fn for_stage(kind: PipelineEventKind, stage: PipelineStage) -> Self {
        Self::new(kind, stage.agent()).with_stage(stage)
    }

    /// Add data to the event
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach the stage
    pub fn with_stage(mut self, stage: PipelineStage) -> Self {
        self.stage = Some(stage);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = PipelineEvent::for_stage(PipelineEventKind::StageStarted, PipelineStage::Writing)
            .with_data(serde_json::json!({"attempt": 1}));

        assert_eq!(event.agent, "writer");
        assert_eq!(event.stage, Some(PipelineStage::Writing));
        assert!(!event.id.is_empty());
    }

    #[test]
    fn test_event_kind_serialization() {
        let json = serde_json::to_string(&PipelineEventKind::ArtifactExported).unwrap();
        assert_eq!(json, "\"artifact_exported\"");
    }
}
