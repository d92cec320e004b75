//! # Anketa
//!
//! The structured record produced at the end of an interview: a map from
//! semantic field name to the final answer text.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::agent::UserData;
use super::context::DialogueTurn;
use super::reference_points::ReferencePointManager;

/// Immutable field → answer mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Anketa {
    fields: BTreeMap<String, String>,
}

impl Anketa {
    /// Fold the dialogue into fields through the point → field mapping.
    ///
    /// Follow-up answers are appended to their point's field in dialogue
    /// order. Turns for unknown points keep the point id as field name.
    pub fn assemble(history: &[DialogueTurn], points: &ReferencePointManager) -> Self {
        let mut fields: BTreeMap<String, String> = BTreeMap::new();

        for turn in history {
            let answer = turn.answer.trim();
            if answer.is_empty() {
                continue;
            }
            let field = points
                .get(&turn.point_id)
                .map(|p| p.field.clone())
                .unwrap_or_else(|| turn.point_id.clone());

            fields
                .entry(field)
                .and_modify(|existing| {
                    existing.push('\n');
                    existing.push_str(answer);
                })
                .or_insert_with(|| answer.to_string());
        }

        Self { fields }
    }

    /// Build from already-assembled fields (e.g. loaded from disk)
    pub fn from_fields(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Project name, if the interview captured one
    pub fn project_name(&self) -> Option<&str> {
        self.get("project_name")
    }

    /// Render as a markdown brief for prompts
    pub fn to_markdown(&self) -> String {
        self.fields
            .iter()
            .map(|(field, answer)| format!("## {}\n{}\n", field, answer))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Persistence collaborator: stores an anketa and hands back its id
#[async_trait]
pub trait AnketaStore: Send + Sync {
    async fn save(&self, anketa: &Anketa, user: &UserData) -> anyhow::Result<String>;
}
