//! # Configuration
//!
//! Top-level settings read from `<runtime>/config.json`. Every section has
//! defaults, so a missing file or a partial file is fine.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::interview::InterviewConfig;
use crate::models::{LlmProvider, ModelConfig, ModelRole};
use crate::pipeline::PipelineConfig;
use crate::state::io;

pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GrantflowConfig {
    pub interview: InterviewConfig,
    pub pipeline: PipelineConfig,
    /// Provider for every agent without an override
    pub global_provider: LlmProvider,
    /// Model for every agent without an override
    pub global_model: Option<String>,
    /// Base URL for OpenAI-compatible endpoints
    pub base_url: Option<String>,
    pub per_role_models: BTreeMap<ModelRole, String>,
    pub per_role_providers: BTreeMap<ModelRole, LlmProvider>,
    pub per_role_base_urls: BTreeMap<ModelRole, String>,
}

impl GrantflowConfig {
    /// Load from the runtime directory, falling back to defaults
    pub fn load() -> Result<Self> {
        let path = io::get_runtime_path().join(CONFIG_FILE);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid config: {:?}", path))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write config: {:?}", path))
    }

    /// Resolve the model for a role: per-role override, then global, then
    /// the provider's default
    pub fn model_for(&self, role: ModelRole) -> ModelConfig {
        let provider = self
            .per_role_providers
            .get(&role)
            .copied()
            .unwrap_or(self.global_provider);

        let model = self
            .per_role_models
            .get(&role)
            .or(self.global_model.as_ref())
            .cloned()
            .unwrap_or_else(|| provider.default_model().to_string());

        let base_url = if provider.supports_base_url() {
            self.per_role_base_urls
                .get(&role)
                .or(self.base_url.as_ref())
                .cloned()
        } else {
            None
        };

        ModelConfig {
            provider,
            model,
            base_url,
        }
    }
}
