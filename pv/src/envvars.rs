//! Environment variable store
//!
//! Named values that prompt variables can reference with `Env: NAME`.
//! Names are stored in their normalised form and matched
//! case-insensitively through the `UPPER(name)` unique index, so
//! `api-key`, `apiKey`, and `API_KEY` are all the same variable.

use std::sync::Arc;

use rusqlite::{OptionalExtension, params};
use tracing::{debug, info};

use crate::cache::{TtlCache, ttl};
use crate::db::Database;
use crate::domain::{EnvVar, Scope};
use crate::error::{VaultError, VaultResult};
use crate::names;

const KEY_ALL: &str = "variable_all";

const SELECT_COLUMNS: &str = "id, name, COALESCE(description, ''), COALESCE(value, ''), scope, prompt_id, is_secret";

/// CRUD over the `env_vars` table
pub struct EnvVarStore {
    db: Arc<Database>,
    cache: Arc<TtlCache>,
}

impl EnvVarStore {
    pub fn new(db: Arc<Database>, cache: Arc<TtlCache>) -> Self {
        Self { db, cache }
    }

    /// All env vars sorted by name, served from cache when fresh
    pub async fn list(&self) -> VaultResult<Vec<EnvVar>> {
        self.cache
            .get_or_compute(KEY_ALL, ttl::MEDIUM, || async {
                self.db
                    .query_all(
                        &format!("SELECT {} FROM env_vars ORDER BY name", SELECT_COLUMNS),
                        [],
                        env_var_from_row,
                    )
                    .await
            })
            .await
    }

    /// Case-insensitive fetch by name
    pub async fn get(&self, name: &str) -> VaultResult<Option<EnvVar>> {
        let normalized = names::normalize(name);
        self.db
            .query_one(
                &format!("SELECT {} FROM env_vars WHERE UPPER(name) = UPPER(?1)", SELECT_COLUMNS),
                params![normalized],
                env_var_from_row,
            )
            .await
    }

    /// Create or update by case-insensitive name, returning the stored row
    pub async fn set(&self, name: &str, value: &str, scope: Scope, prompt_id: Option<i64>) -> VaultResult<EnvVar> {
        let normalized = names::normalize(name);
        let value = value.to_string();
        let moved_name = normalized.clone();
        self.db
            .with_transaction(move |tx| {
                let existing: Option<i64> = tx
                    .query_row(
                        "SELECT id FROM env_vars WHERE UPPER(name) = UPPER(?1)",
                        params![moved_name],
                        |row| row.get(0),
                    )
                    .optional()?;
                match existing {
                    Some(id) => {
                        tx.execute(
                            "UPDATE env_vars SET value = ?1, scope = ?2, prompt_id = ?3 WHERE id = ?4",
                            params![value, scope.as_str(), prompt_id, id],
                        )?;
                        Ok(())
                    }
                    None => {
                        tx.execute(
                            "INSERT INTO env_vars (name, value, scope, prompt_id) VALUES (?1, ?2, ?3, ?4)",
                            params![moved_name, value, scope.as_str(), prompt_id],
                        )?;
                        Ok(())
                    }
                }
            })
            .await?;
        self.cache.remove(KEY_ALL);
        info!(name = %normalized, scope = %scope, "Set env var");

        self.get(&normalized)
            .await?
            .ok_or_else(|| VaultError::EnvVarNotFound(normalized))
    }

    /// Update the description and secret flag of an existing env var
    pub async fn set_details(&self, name: &str, description: Option<&str>, secret: Option<bool>) -> VaultResult<()> {
        let normalized = names::normalize(name);
        let current = self
            .get(&normalized)
            .await?
            .ok_or_else(|| VaultError::EnvVarNotFound(normalized.clone()))?;

        let description = description.map(String::from).unwrap_or(current.description);
        let secret = secret.unwrap_or(current.secret);
        self.db
            .execute(
                "UPDATE env_vars SET description = ?1, is_secret = ?2 WHERE id = ?3",
                params![description, secret, current.id],
            )
            .await?;
        self.cache.remove(KEY_ALL);
        debug!(name = %normalized, "Updated env var details");
        Ok(())
    }

    /// Delete by case-insensitive name
    pub async fn unset(&self, name: &str) -> VaultResult<()> {
        let normalized = names::normalize(name);
        let changed = self
            .db
            .execute(
                "DELETE FROM env_vars WHERE UPPER(name) = UPPER(?1)",
                params![normalized],
            )
            .await?;
        if changed == 0 {
            return Err(VaultError::EnvVarNotFound(normalized));
        }
        self.cache.remove(KEY_ALL);
        info!(name = %normalized, "Unset env var");
        Ok(())
    }
}

fn env_var_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EnvVar> {
    let scope: String = row.get(4)?;
    Ok(EnvVar {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        value: row.get(3)?,
        scope: Scope::parse(&scope),
        prompt_id: row.get(5)?,
        secret: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(temp: &TempDir) -> EnvVarStore {
        let db = Arc::new(Database::new(temp.path().join("vault.db")));
        EnvVarStore::new(db, Arc::new(TtlCache::new()))
    }

    #[tokio::test]
    async fn test_set_normalizes_and_upserts() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);

        let created = store.set("api-key", "one", Scope::Global, None).await.unwrap();
        assert_eq!(created.name, "API_KEY");
        assert_eq!(created.value, "one");

        // Same variable under a different spelling updates in place
        let updated = store.set("apiKey", "two", Scope::Global, None).await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.value, "two");

        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_is_case_insensitive() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);

        store.set("API_KEY", "secret", Scope::Global, None).await.unwrap();
        let found = store.get("api_key").await.unwrap().unwrap();
        assert_eq!(found.value, "secret");
        assert!(store.get("OTHER").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unset_missing_is_typed_error() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);

        let err = store.unset("GHOST").await.unwrap_err();
        assert!(matches!(err, VaultError::EnvVarNotFound(name) if name == "GHOST"));

        store.set("REAL", "x", Scope::Global, None).await.unwrap();
        store.unset("real").await.unwrap();
        assert!(store.get("REAL").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_cache_invalidated_by_writes() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);

        store.set("A", "1", Scope::Global, None).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);

        // The set after a cached list must show up immediately
        store.set("B", "2", Scope::Global, None).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_set_details_requires_existing() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);

        assert!(store.set_details("NOPE", Some("d"), None).await.is_err());

        store.set("TOKEN", "x", Scope::Global, None).await.unwrap();
        store.set_details("TOKEN", Some("ci token"), Some(true)).await.unwrap();
        let stored = store.get("TOKEN").await.unwrap().unwrap();
        assert_eq!(stored.description, "ci token");
        assert!(stored.secret);
    }
}
