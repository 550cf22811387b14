//! Execution history and favorites
//!
//! Thin bookkeeping over `prompt_executions` and `favorite_prompts`.
//! Neither table is cached; both cascade away with their prompt row.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use rusqlite::params;
use tracing::{debug, info};

use crate::db::Database;
use crate::domain::{Execution, PromptSummary};
use crate::error::VaultResult;
use crate::prompts;

/// Records prompt runs and favorite marks
pub struct HistoryStore {
    db: Arc<Database>,
}

impl HistoryStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Record that a prompt was run
    pub async fn record_execution(&self, reference: &str) -> VaultResult<()> {
        let id = prompts::resolve_reference(&self.db, reference).await?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        self.db
            .execute(
                "INSERT INTO prompt_executions (prompt_id, execution_time) VALUES (?1, ?2)",
                params![id, now],
            )
            .await?;
        debug!(prompt_id = id, "Recorded execution");
        Ok(())
    }

    /// Most recently executed prompts, newest first, one row per prompt
    pub async fn recent(&self, limit: usize) -> VaultResult<Vec<Execution>> {
        self.db
            .query_all(
                "SELECT pe.id, pe.prompt_id, p.title, MAX(pe.execution_time)
                 FROM prompt_executions pe
                 JOIN prompts p ON pe.prompt_id = p.id
                 GROUP BY pe.prompt_id
                 ORDER BY MAX(pe.execution_time) DESC
                 LIMIT ?1",
                params![limit as i64],
                |row| {
                    Ok(Execution {
                        id: row.get(0)?,
                        prompt_id: row.get(1)?,
                        title: row.get(2)?,
                        executed_at: row.get(3)?,
                    })
                },
            )
            .await
    }

    /// Mark a prompt as a favorite; `false` if it already was one
    pub async fn add_favorite(&self, reference: &str) -> VaultResult<bool> {
        let id = prompts::resolve_reference(&self.db, reference).await?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let changed = self
            .db
            .execute(
                "INSERT OR IGNORE INTO favorite_prompts (prompt_id, timestamp) VALUES (?1, ?2)",
                params![id, now],
            )
            .await?;
        if changed > 0 {
            info!(prompt_id = id, "Added favorite");
        }
        Ok(changed > 0)
    }

    /// Unmark a favorite; `false` if it was not one
    pub async fn remove_favorite(&self, reference: &str) -> VaultResult<bool> {
        let id = prompts::resolve_reference(&self.db, reference).await?;
        let changed = self
            .db
            .execute("DELETE FROM favorite_prompts WHERE prompt_id = ?1", params![id])
            .await?;
        if changed > 0 {
            info!(prompt_id = id, "Removed favorite");
        }
        Ok(changed > 0)
    }

    pub async fn is_favorite(&self, reference: &str) -> VaultResult<bool> {
        let id = prompts::resolve_reference(&self.db, reference).await?;
        let count: Option<i64> = self
            .db
            .query_one(
                "SELECT COUNT(*) FROM favorite_prompts WHERE prompt_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .await?;
        Ok(count.unwrap_or(0) > 0)
    }

    /// Favorite prompts, most recently marked first
    pub async fn favorites(&self) -> VaultResult<Vec<PromptSummary>> {
        self.db
            .query_all(
                "SELECT p.id, p.title, p.primary_category, p.directory, COALESCE(p.one_line_description, '')
                 FROM favorite_prompts fp
                 JOIN prompts p ON fp.prompt_id = p.id
                 ORDER BY fp.timestamp DESC",
                [],
                |row| {
                    Ok(PromptSummary {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        primary_category: row.get(2)?,
                        directory: row.get(3)?,
                        one_line_description: row.get(4)?,
                        subcategories: Vec::new(),
                    })
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VaultError;
    use tempfile::TempDir;

    async fn seeded(temp: &TempDir) -> (HistoryStore, Arc<Database>) {
        let db = Arc::new(Database::new(temp.path().join("vault.db")));
        for (title, directory) in [("Alpha", "alpha"), ("Beta", "beta")] {
            db.execute(
                "INSERT INTO prompts (title, content, primary_category, directory) VALUES (?1, 'body', 'testing', ?2)",
                params![title, directory],
            )
            .await
            .unwrap();
        }
        (HistoryStore::new(db.clone()), db)
    }

    #[tokio::test]
    async fn test_record_execution_requires_prompt() {
        let temp = TempDir::new().unwrap();
        let (history, db) = seeded(&temp).await;

        history.record_execution("alpha").await.unwrap();
        let err = history.record_execution("absent").await.unwrap_err();
        assert!(matches!(err, VaultError::NotFound(_)));

        let count: Option<i64> = db
            .query_one("SELECT COUNT(*) FROM prompt_executions", [], |row| row.get(0))
            .await
            .unwrap();
        assert_eq!(count, Some(1));
    }

    #[tokio::test]
    async fn test_recent_groups_by_prompt_newest_first() {
        let temp = TempDir::new().unwrap();
        let (history, db) = seeded(&temp).await;

        // alpha ran twice, most recently after beta
        for (id, time) in [(1, "2026-01-01T10:00:00Z"), (2, "2026-01-01T11:00:00Z"), (1, "2026-01-01T12:00:00Z")] {
            db.execute(
                "INSERT INTO prompt_executions (prompt_id, execution_time) VALUES (?1, ?2)",
                params![id, time],
            )
            .await
            .unwrap();
        }

        let recent = history.recent(10).await.unwrap();
        let titles: Vec<&str> = recent.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Beta"]);
        assert_eq!(recent[0].executed_at, "2026-01-01T12:00:00Z");

        assert_eq!(history.recent(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_favorites_roundtrip() {
        let temp = TempDir::new().unwrap();
        let (history, _) = seeded(&temp).await;

        assert!(history.add_favorite("alpha").await.unwrap());
        // Adding again is a no-op, not an error
        assert!(!history.add_favorite("alpha").await.unwrap());
        assert!(history.is_favorite("alpha").await.unwrap());
        assert!(!history.is_favorite("beta").await.unwrap());

        let favorites = history.favorites().await.unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].directory, "alpha");

        assert!(history.remove_favorite("alpha").await.unwrap());
        assert!(!history.remove_favorite("alpha").await.unwrap());
        assert!(history.favorites().await.unwrap().is_empty());
    }
}
