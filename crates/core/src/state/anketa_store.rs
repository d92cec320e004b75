//! # Anketa Store
//!
//! SQLite-backed [`AnketaStore`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::db::GrantDb;
use crate::interview::{Anketa, AnketaStore, UserData};

/// A persisted anketa with its metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAnketa {
    pub id: String,
    pub user_id: String,
    pub display_name: Option<String>,
    pub project_name: Option<String>,
    pub anketa: Anketa,
    pub created_at: DateTime<Utc>,
}

pub struct SqliteAnketaStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAnketaStore {
    pub fn new(db: &GrantDb) -> Self {
        Self {
            conn: db.connection(),
        }
    }

    /// Insert an anketa and return its new id
    pub fn insert(&self, anketa: &Anketa, user: &UserData) -> Result<String> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let id = uuid::Uuid::new_v4().to_string();
        let fields_json = serde_json::to_string(anketa)?;

        conn.execute(
            r#"
            INSERT INTO anketas (id, user_id, display_name, project_name, fields_json, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                id,
                user.user_id,
                user.display_name,
                anketa.project_name(),
                fields_json,
                Utc::now().to_rfc3339(),
            ],
        )
        .context("Failed to insert anketa")?;

        tracing::debug!(anketa_id = %id, user_id = %user.user_id, "Anketa stored");
        Ok(id)
    }

    pub fn load(&self, id: &str) -> Result<StoredAnketa> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, display_name, project_name, fields_json, created_at
            FROM anketas WHERE id = ?1
            "#,
        )?;

        let stored = stmt
            .query_row(params![id], Self::row_to_stored)
            .with_context(|| format!("Anketa '{}' not found", id))?;
        Ok(stored)
    }

    /// Most recent anketas first
    pub fn list_recent(&self, limit: usize) -> Result<Vec<StoredAnketa>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, display_name, project_name, fields_json, created_at
            FROM anketas
            ORDER BY created_at DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt
            .query_map(params![limit as i64], Self::row_to_stored)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list anketas")?;
        Ok(rows)
    }

    fn row_to_stored(row: &rusqlite::Row) -> rusqlite::Result<StoredAnketa> {
        let fields_json: String = row.get(4)?;
        let created_at: String = row.get(5)?;

        let fields: BTreeMap<String, String> =
            serde_json::from_str(&fields_json).unwrap_or_default();
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(StoredAnketa {
            id: row.get(0)?,
            user_id: row.get(1)?,
            display_name: row.get(2)?,
            project_name: row.get(3)?,
            anketa: Anketa::from_fields(fields),
            created_at,
        })
    }
}

#[async_trait]
impl AnketaStore for SqliteAnketaStore {
    async fn save(&self, anketa: &Anketa, user: &UserData) -> anyhow::Result<String> {
        self.insert(anketa, user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anketa(name: &str) -> Anketa {
        let mut fields = BTreeMap::new();
        fields.insert("project_name".to_string(), name.to_string());
        fields.insert("budget".to_string(), "250 000".to_string());
        Anketa::from_fields(fields)
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let db = GrantDb::open_in_memory().unwrap();
        let store = SqliteAnketaStore::new(&db);
        let mut user = UserData::new("u-42");
        user.display_name = Some("Olga".to_string());

        let id = store.save(&anketa("Green Yard"), &user).await.unwrap();
        let stored = store.load(&id).unwrap();

        assert_eq!(stored.user_id, "u-42");
        assert_eq!(stored.display_name.as_deref(), Some("Olga"));
        assert_eq!(stored.project_name.as_deref(), Some("Green Yard"));
        assert_eq!(stored.anketa.get("budget"), Some("250 000"));
    }

    #[test]
    fn test_ids_are_unique_and_listed() {
        let db = GrantDb::open_in_memory().unwrap();
        let store = SqliteAnketaStore::new(&db);
        let user = UserData::new("u-1");

        let first = store.insert(&anketa("One"), &user).unwrap();
        let second = tokio_test::block_on(store.save(&anketa("Two"), &user)).unwrap();
        assert_ne!(first, second);

        let listed = store.list_recent(10).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(store.list_recent(1).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_id_is_an_error() {
        let db = GrantDb::open_in_memory().unwrap();
        let store = SqliteAnketaStore::new(&db);
        let err = store.load("nope").unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
