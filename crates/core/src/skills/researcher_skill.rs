//! # Researcher Skill
//!
//! First pipeline stage: builds the evidence base for the application from
//! the anketa.

use async_trait::async_trait;
use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::interview::Anketa;
use crate::models::ModelConfig;
use crate::pipeline::{BackoffPolicy, Researcher};
use crate::run_llm_function;
use crate::skills::llm_helpers::json_section;
use crate::skills::prompts;

/// A single research finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct ResearchFinding {
    pub topic: String,
    pub insight: String,
    /// Organization, report or statistic the insight comes from
    #[serde(default)]
    pub source: Option<String>,
}

/// Output from the researcher skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct ResearchOutput {
    pub summary: String,
    #[serde(default)]
    pub findings: Vec<ResearchFinding>,
    /// Grant programs and funders matching the project
    #[serde(default)]
    pub relevant_programs: Vec<String>,
    /// Facts from the anketa the writer must keep
    #[serde(default)]
    pub key_facts: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

pub struct ResearcherSkill {
    config: ModelConfig,
    backoff: BackoffPolicy,
}

impl ResearcherSkill {
    pub fn new(config: ModelConfig, backoff: BackoffPolicy) -> Self {
        Self { config, backoff }
    }
}

#[async_trait]
impl Researcher for ResearcherSkill {
    async fn research(&self, project: &Anketa) -> anyhow::Result<ResearchOutput> {
        let prompt = json_section("Questionnaire", project)?;
        let config = &self.config;

        self.backoff
            .retry("researcher", |_| {
                let prompt = prompt.clone();
                async move { run_llm_function!(config, ResearchOutput, prompts::RESEARCHER, prompt) }
            })
            .await
    }
}
