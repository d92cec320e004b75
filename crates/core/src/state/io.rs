//! # IO Utilities
//!
//! File system helpers for the `.grantflow` runtime directory and for anketa
//! files passed between the interview and the pipeline.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::interview::Anketa;

pub const RUNTIME_DIR: &str = ".grantflow";
pub const RUNTIME_ENV_VAR: &str = "GRANTFLOW_RUNTIME_PATH";

/// Get the runtime directory path (`.grantflow` under the working directory
/// unless `GRANTFLOW_RUNTIME_PATH` is set)
pub fn get_runtime_path() -> PathBuf {
    if let Ok(path) = std::env::var(RUNTIME_ENV_VAR) {
        return PathBuf::from(path);
    }

    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(RUNTIME_DIR)
}

/// Ensure the runtime directory exists
pub async fn ensure_runtime_dir() -> Result<PathBuf> {
    let path = get_runtime_path();
    fs::create_dir_all(&path)
        .await
        .with_context(|| format!("Failed to create runtime directory: {:?}", path))?;
    Ok(path)
}

/// Read an anketa saved as a JSON object of field → answer
pub async fn read_anketa(path: impl AsRef<Path>) -> Result<Anketa> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read anketa: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid anketa JSON: {:?}", path))
}

/// Write an anketa as pretty JSON, creating parent directories
pub async fn write_anketa(path: impl AsRef<Path>, anketa: &Anketa) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_string_pretty(anketa)?;
    fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write anketa: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_default_runtime_path() {
        if std::env::var(RUNTIME_ENV_VAR).is_err() {
            assert!(get_runtime_path().ends_with(RUNTIME_DIR));
        }
    }

    #[tokio::test]
    async fn test_anketa_file_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out").join("anketa.json");

        let mut fields = BTreeMap::new();
        fields.insert("project_name".to_string(), "Green Yard".to_string());
        let anketa = Anketa::from_fields(fields);

        write_anketa(&path, &anketa).await.unwrap();
        let read = read_anketa(&path).await.unwrap();
        assert_eq!(read, anketa);
    }

    #[tokio::test]
    async fn test_read_rejects_non_object() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        assert!(read_anketa(&path).await.is_err());
    }
}
