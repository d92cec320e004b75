//! # Artifact Export
//!
//! Writes stage outputs into the run's export directory. File names carry the
//! stage ordinal so a directory listing shows them in execution order.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::fs;

use super::stage::PipelineStage;

pub const RESEARCH_ARTIFACT: &str = "01_research.json";
pub const DRAFT_ARTIFACT: &str = "02_draft.md";
pub const AUDIT_ARTIFACT: &str = "03_audit.json";
pub const SUMMARY_ARTIFACT: &str = "run_summary.json";

/// Artifact file name for a working stage
pub fn artifact_name(stage: PipelineStage) -> Option<&'static str> {
    match stage {
        PipelineStage::Researching => Some(RESEARCH_ARTIFACT),
        PipelineStage::Writing => Some(DRAFT_ARTIFACT),
        PipelineStage::Auditing => Some(AUDIT_ARTIFACT),
        _ => None,
    }
}

/// Write a text artifact, creating the directory if needed
pub async fn write_text(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create export directory: {:?}", dir))?;

    let path = dir.join(name);
    fs::write(&path, content)
        .await
        .with_context(|| format!("Failed to write artifact: {:?}", path))?;
    Ok(path)
}

/// Write a pretty-printed JSON artifact
pub async fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize artifact {}", name))?;
    write_text(dir, name, &json).await
}
