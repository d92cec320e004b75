//! Embedded block audit.
//!
//! After every few answers the interviewer may ask an auditor to score the
//! latest block of dialogue. A low score turns into clarification pressure on
//! the weak points of that block.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::context::DialogueTurn;

/// Auditor verdict on one block of answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockAudit {
    /// 1..=10
    pub score: u8,
    /// Reference point ids the auditor considers under-covered
    #[serde(default)]
    pub weak_points: Vec<String>,
    #[serde(default)]
    pub feedback: String,
}

impl BlockAudit {
    /// Clamp the score into 1..=10; auditors are external and may drift
    pub fn normalized(mut self) -> Self {
        self.score = self.score.clamp(1, 10);
        self
    }
}

/// Scores a block of dialogue
#[async_trait]
pub trait BlockAuditor: Send + Sync {
    async fn audit_block(&self, block: &[DialogueTurn]) -> anyhow::Result<BlockAudit>;
}

/// Feedback recorded for the caller after each block audit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackItem {
    /// 1-based block number
    pub block: usize,
    pub score: u8,
    pub weak_points: Vec<String>,
    pub message: String,
    /// Follow-ups actually queued because of this audit
    pub clarifications_queued: usize,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_clamps_score() {
        let audit = BlockAudit {
            score: 0,
            weak_points: vec![],
            feedback: String::new(),
        };
        assert_eq!(audit.normalized().score, 1);

        let audit = BlockAudit {
            score: 42,
            weak_points: vec![],
            feedback: String::new(),
        };
        assert_eq!(audit.normalized().score, 10);
    }

    #[test]
    fn test_block_audit_deserializes_with_defaults() {
        let audit: BlockAudit = serde_json::from_str(r#"{"score": 7}"#).unwrap();
        assert_eq!(audit.score, 7);
        assert!(audit.weak_points.is_empty());
    }
}
