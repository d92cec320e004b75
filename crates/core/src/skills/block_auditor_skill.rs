//! # Block Auditor Skill
//!
//! Scores a block of interview answers with a model.

use async_trait::async_trait;
use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::interview::{BlockAudit, BlockAuditor, DialogueTurn};
use crate::models::ModelConfig;
use crate::pipeline::BackoffPolicy;
use crate::run_llm_function;
use crate::skills::llm_helpers::json_section;
use crate::skills::prompts;

/// Output from the block auditor skill
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct BlockAuditOutput {
    /// 1-10
    pub score: u32,
    #[serde(default)]
    pub weak_points: Vec<String>,
    #[serde(default)]
    pub feedback: String,
}

impl From<BlockAuditOutput> for BlockAudit {
    fn from(output: BlockAuditOutput) -> Self {
        BlockAudit {
            score: output.score.min(u8::MAX as u32) as u8,
            weak_points: output.weak_points,
            feedback: output.feedback,
        }
        .normalized()
    }
}

pub struct BlockAuditorSkill {
    config: ModelConfig,
    backoff: BackoffPolicy,
}

impl BlockAuditorSkill {
    pub fn new(config: ModelConfig, backoff: BackoffPolicy) -> Self {
        Self { config, backoff }
    }
}

#[async_trait]
impl BlockAuditor for BlockAuditorSkill {
    async fn audit_block(&self, block: &[DialogueTurn]) -> anyhow::Result<BlockAudit> {
        let prompt = json_section("Interview block", block)?;
        let config = &self.config;

        let output = self
            .backoff
            .retry("block_auditor", |_| {
                let prompt = prompt.clone();
                async move {
                    run_llm_function!(config, BlockAuditOutput, prompts::BLOCK_AUDITOR, prompt)
                }
            })
            .await?;

        Ok(output.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_is_normalized() {
        let audit: BlockAudit = BlockAuditOutput {
            score: 0,
            weak_points: vec!["budget".to_string()],
            feedback: "Add figures".to_string(),
        }
        .into();
        assert_eq!(audit.score, 1);

        let audit: BlockAudit = BlockAuditOutput {
            score: 300,
            weak_points: vec![],
            feedback: String::new(),
        }
        .into();
        assert_eq!(audit.score, 10);
    }
}
