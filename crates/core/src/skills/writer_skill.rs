//! # Writer Skill
//!
//! Second pipeline stage: drafts the application from the anketa and the
//! complete research output.

use async_trait::async_trait;
use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::interview::Anketa;
use crate::models::ModelConfig;
use crate::pipeline::{BackoffPolicy, Writer};
use crate::run_llm_function;
use crate::skills::llm_helpers::json_section;
use crate::skills::prompts;
use crate::skills::researcher_skill::ResearchOutput;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct DraftSection {
    pub heading: String,
    pub body: String,
}

/// Output from the writer skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct DraftOutput {
    pub title: String,
    /// Short abstract
    pub summary: String,
    pub sections: Vec<DraftSection>,
    #[serde(default)]
    pub requested_amount: Option<String>,
}

impl DraftOutput {
    /// Render the draft as a Markdown document
    pub fn to_markdown(&self) -> String {
        let mut md = format!("# {}\n\n{}\n", self.title.trim(), self.summary.trim());
        if let Some(amount) = &self.requested_amount {
            md.push_str(&format!("\n**Requested amount:** {}\n", amount.trim()));
        }
        for section in &self.sections {
            md.push_str(&format!(
                "\n## {}\n\n{}\n",
                section.heading.trim(),
                section.body.trim()
            ));
        }
        md
    }
}

pub struct WriterSkill {
    config: ModelConfig,
    backoff: BackoffPolicy,
}

impl WriterSkill {
    pub fn new(config: ModelConfig, backoff: BackoffPolicy) -> Self {
        Self { config, backoff }
    }

    fn build_prompt(project: &Anketa, research: &ResearchOutput) -> anyhow::Result<String> {
        Ok(format!(
            "{}\n{}",
            json_section("Questionnaire", project)?,
            json_section("Research", research)?
        ))
    }
}

#[async_trait]
impl Writer for WriterSkill {
    async fn write(
        &self,
        project: &Anketa,
        research: &ResearchOutput,
    ) -> anyhow::Result<DraftOutput> {
        let prompt = Self::build_prompt(project, research)?;
        let config = &self.config;

        self.backoff
            .retry("writer", |_| {
                let prompt = prompt.clone();
                async move { run_llm_function!(config, DraftOutput, prompts::WRITER, prompt) }
            })
            .await
    }
}
