//! # LLM Helpers
//!
//! Shared plumbing for the model-backed agents.

use serde::Serialize;

/// Run an `LlmFunction` producing `$output_type` against whichever provider
/// `$config` selects. Expands inside a function returning `anyhow::Result`.
#[macro_export]
macro_rules! run_llm_function {
    ($config:expr, $output_type:ty, $system_prompt:expr, $input:expr) => {{
        use radkit::agent::LlmFunction;
        use radkit::models::providers::{
            AnthropicLlm, DeepSeekLlm, GeminiLlm, GrokLlm, OpenAILlm, OpenRouterLlm,
        };
        use $crate::models::LlmProvider;

        let config: &$crate::models::ModelConfig = $config;
        let result: anyhow::Result<$output_type> = match config.provider {
            LlmProvider::Anthropic => {
                let llm = AnthropicLlm::from_env(&config.model)?;
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run($input)
                    .await
                    .map_err(Into::into)
            }
            LlmProvider::OpenAI => {
                let mut llm = OpenAILlm::from_env(&config.model)?;
                if let Some(base_url) = &config.base_url {
                    llm = llm.with_base_url(base_url);
                }
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run($input)
                    .await
                    .map_err(Into::into)
            }
            LlmProvider::Gemini => {
                let llm = GeminiLlm::from_env(&config.model)?;
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run($input)
                    .await
                    .map_err(Into::into)
            }
            LlmProvider::OpenRouter => {
                let llm = OpenRouterLlm::from_env(&config.model)?;
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run($input)
                    .await
                    .map_err(Into::into)
            }
            LlmProvider::Grok => {
                let llm = GrokLlm::from_env(&config.model)?;
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run($input)
                    .await
                    .map_err(Into::into)
            }
            LlmProvider::DeepSeek => {
                let llm = DeepSeekLlm::from_env(&config.model)?;
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run($input)
                    .await
                    .map_err(Into::into)
            }
        };
        result
    }};
}

/// Render a labelled JSON block for a user prompt
pub fn json_section<T: Serialize + ?Sized>(label: &str, value: &T) -> anyhow::Result<String> {
    let json = serde_json::to_string_pretty(value)?;
    Ok(format!("## {}\n```json\n{}\n```\n", label, json))
}
