//! # Interviewer Skill
//!
//! Model-backed [`DecisionFunction`]. The model fills a structured
//! [`InterviewerOutput`]; it is handed back to the flow as JSON text so that
//! validation stays in `TurnDecision::parse`.

use async_trait::async_trait;
use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::interview::{DecisionFunction, DecisionInput};
use crate::models::ModelConfig;
use crate::pipeline::BackoffPolicy;
use crate::run_llm_function;
use crate::skills::llm_helpers::json_section;
use crate::skills::prompts;

/// The model's assessment of the last answer
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct InterviewerAnalysis {
    /// 1-10
    pub answer_quality: f64,
    /// 0.0 - 1.0
    #[serde(default)]
    pub completeness: f64,
    #[serde(default)]
    pub missing_info: Vec<String>,
    /// Reference point ids covered in passing
    #[serde(default)]
    pub covered_questions: Vec<String>,
}

/// Output from the interviewer skill
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct InterviewerOutput {
    pub analysis: InterviewerAnalysis,
    /// "ask_from_bank", "ask_clarifying" or "finalize"
    pub next_action: String,
    /// Follow-up text, or the bank point id to ask next
    #[serde(default)]
    pub next_question: Option<String>,
}

pub struct InterviewerSkill {
    config: ModelConfig,
    backoff: BackoffPolicy,
}

impl InterviewerSkill {
    pub fn new(config: ModelConfig, backoff: BackoffPolicy) -> Self {
        Self { config, backoff }
    }

    fn build_prompt(input: &DecisionInput) -> anyhow::Result<String> {
        Ok(format!(
            "Decide the next step of the interview.\n\n{}",
            json_section("Interview state", input)?
        ))
    }
}

#[async_trait]
impl DecisionFunction for InterviewerSkill {
    async fn decide(&self, input: &DecisionInput) -> anyhow::Result<String> {
        let prompt = Self::build_prompt(input)?;
        let config = &self.config;

        let output = self
            .backoff
            .retry("interviewer", |_| {
                let prompt = prompt.clone();
                async move {
                    run_llm_function!(config, InterviewerOutput, prompts::INTERVIEWER, prompt)
                }
            })
            .await?;

        Ok(serde_json::to_string(&output)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::{ConversationContext, Decision, TurnDecision};

    #[test]
    fn test_structured_output_round_trips_through_parse() {
        let output = InterviewerOutput {
            analysis: InterviewerAnalysis {
                answer_quality: 4.0,
                completeness: 0.3,
                missing_info: vec!["number of beneficiaries".to_string()],
                covered_questions: vec![],
            },
            next_action: "ask_clarifying".to_string(),
            next_question: Some("How many people will take part?".to_string()),
        };

        let raw = serde_json::to_string(&output).unwrap();
        let decision = TurnDecision::parse(&raw).unwrap();
        assert_eq!(
            decision.action,
            Decision::AskClarifying("How many people will take part?".to_string())
        );
        assert_eq!(decision.analysis.answer_quality, 4);
    }

    #[test]
    fn test_prompt_embeds_interview_state() {
        let mut ctx = ConversationContext::new();
        ctx.record("What is the project called?", "Green Yard", "project_name", false);
        let input = DecisionInput::from_context(
            &ctx,
            vec!["project_essence".to_string()],
            Some("project_name".to_string()),
        );

        let prompt = InterviewerSkill::build_prompt(&input).unwrap();
        assert!(prompt.contains("Green Yard"));
        assert!(prompt.contains("project_essence"));
    }
}
