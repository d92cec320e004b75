//! # Auditor Skill
//!
//! Final pipeline stage: reviews the draft the way a funding committee would.

use async_trait::async_trait;
use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::interview::Anketa;
use crate::models::ModelConfig;
use crate::pipeline::{Auditor, BackoffPolicy};
use crate::run_llm_function;
use crate::skills::llm_helpers::json_section;
use crate::skills::prompts;
use crate::skills::writer_skill::DraftOutput;

/// A single issue raised by the auditor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct AuditIssue {
    /// Severity: "blocking", "major", "minor"
    pub severity: String,
    pub section: String,
    pub description: String,
    #[serde(default)]
    pub suggested_fix: Option<String>,
}

/// Output from the auditor skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct AuditOutput {
    /// 1-10
    pub overall_score: u32,
    /// "ready", "needs_revision" or "not_ready"
    pub verdict: String,
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub issues: Vec<AuditIssue>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl AuditOutput {
    pub fn blocking_issues(&self) -> impl Iterator<Item = &AuditIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity.eq_ignore_ascii_case("blocking"))
    }
}

pub struct AuditorSkill {
    config: ModelConfig,
    backoff: BackoffPolicy,
}

impl AuditorSkill {
    pub fn new(config: ModelConfig, backoff: BackoffPolicy) -> Self {
        Self { config, backoff }
    }
}

#[async_trait]
impl Auditor for AuditorSkill {
    async fn audit(&self, project: &Anketa, draft: &DraftOutput) -> anyhow::Result<AuditOutput> {
        let prompt = format!(
            "{}\n{}",
            json_section("Questionnaire", project)?,
            json_section("Draft application", draft)?
        );
        let config = &self.config;

        let mut output = self
            .backoff
            .retry("auditor", |_| {
                let prompt = prompt.clone();
                async move { run_llm_function!(config, AuditOutput, prompts::AUDITOR, prompt) }
            })
            .await?;

        output.overall_score = output.overall_score.clamp(1, 10);
        Ok(output)
    }
}
