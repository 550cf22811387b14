//! Database connection layer
//!
//! One lazily opened SQLite connection per [`Database`], shared behind an
//! async mutex so query helpers can be awaited from anywhere in the
//! process. Multi-statement writes go through [`Database::with_transaction`],
//! which is the mutual-exclusion boundary for the whole library: while a
//! transaction closure runs, no other query can touch the connection.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, Params, Row, Transaction};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::VaultResult;
use crate::schema;

/// Handle to the SQLite index
pub struct Database {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

impl Database {
    /// Create a handle; the connection opens on first use
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            conn: Mutex::new(None),
        }
    }

    /// Run a row-changing statement, returning the affected row count
    pub async fn execute<P: Params>(&self, sql: &str, params: P) -> VaultResult<usize> {
        self.with_conn(|conn| Ok(conn.execute(sql, params)?)).await
    }

    /// Run a query expected to yield at most one row; absent rows are `None`
    pub async fn query_one<T, P, F>(&self, sql: &str, params: P, map: F) -> VaultResult<Option<T>>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            Ok(stmt.query_row(params, map).optional()?)
        })
        .await
    }

    /// Run a query and map every row
    pub async fn query_all<T, P, F>(&self, sql: &str, params: P, map: F) -> VaultResult<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map(params, map)?;
            Ok(rows.collect::<rusqlite::Result<Vec<T>>>()?)
        })
        .await
    }

    /// Run `f` inside a transaction: commit on `Ok`, roll back on `Err`.
    ///
    /// A rollback failure is logged and the original error is returned.
    pub async fn with_transaction<T, F>(&self, f: F) -> VaultResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> VaultResult<T>,
    {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            match f(&tx) {
                Ok(value) => {
                    tx.commit()?;
                    Ok(value)
                }
                Err(err) => {
                    if let Err(rollback_err) = tx.rollback() {
                        warn!(%rollback_err, "Rollback failed after transaction error");
                    }
                    Err(err)
                }
            }
        })
        .await
    }

    /// Drop the connection; harmless if never opened or already closed
    pub async fn close(&self) {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.take()
            && let Err((_, err)) = conn.close()
        {
            warn!(%err, "Database did not close cleanly");
        }
    }

    async fn with_conn<T, F>(&self, f: F) -> VaultResult<T>
    where
        F: FnOnce(&mut Connection) -> VaultResult<T>,
    {
        let mut guard = self.conn.lock().await;
        let conn = match guard.take() {
            Some(conn) => conn,
            None => open_connection(&self.path)?,
        };
        f(guard.insert(conn))
    }
}

fn open_connection(path: &Path) -> VaultResult<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.execute_batch(schema::SCHEMA)?;
    debug!(path = %path.display(), "Opened database");
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;
    use tempfile::TempDir;

    fn test_db(temp: &TempDir) -> Database {
        Database::new(temp.path().join("vault.db"))
    }

    #[tokio::test]
    async fn test_lazy_open_and_roundtrip() {
        let temp = TempDir::new().unwrap();
        let db = test_db(&temp);

        let changed = db
            .execute(
                "INSERT INTO prompts (title, content, primary_category, directory) VALUES (?1, ?2, ?3, ?4)",
                params!["Title", "Body", "coding", "title_dir"],
            )
            .await
            .unwrap();
        assert_eq!(changed, 1);

        let title: Option<String> = db
            .query_one(
                "SELECT title FROM prompts WHERE directory = ?1",
                params!["title_dir"],
                |row| row.get(0),
            )
            .await
            .unwrap();
        assert_eq!(title.as_deref(), Some("Title"));
    }

    #[tokio::test]
    async fn test_query_one_absent_is_none() {
        let temp = TempDir::new().unwrap();
        let db = test_db(&temp);

        let row: Option<i64> = db
            .query_one("SELECT id FROM prompts WHERE directory = ?1", params!["nope"], |row| {
                row.get(0)
            })
            .await
            .unwrap();
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn test_transaction_rolls_back_on_error() {
        use crate::error::VaultError;

        let temp = TempDir::new().unwrap();
        let db = test_db(&temp);

        let result: VaultResult<()> = db
            .with_transaction(|tx| {
                tx.execute(
                    "INSERT INTO prompts (title, content, primary_category, directory) VALUES ('t', 'c', 'p', 'd')",
                    [],
                )?;
                Err(VaultError::NotFound("forced".to_string()))
            })
            .await;
        assert!(result.is_err());

        let count: Option<i64> = db
            .query_one("SELECT COUNT(*) FROM prompts", [], |row| row.get(0))
            .await
            .unwrap();
        assert_eq!(count, Some(0));
    }

    #[tokio::test]
    async fn test_foreign_keys_cascade() {
        let temp = TempDir::new().unwrap();
        let db = test_db(&temp);

        db.execute(
            "INSERT INTO prompts (title, content, primary_category, directory) VALUES ('t', 'c', 'p', 'd')",
            [],
        )
        .await
        .unwrap();
        db.execute(
            "INSERT INTO variables (prompt_id, name, role) VALUES (1, 'X', 'input')",
            [],
        )
        .await
        .unwrap();

        db.execute("DELETE FROM prompts WHERE id = 1", []).await.unwrap();

        let vars: Option<i64> = db
            .query_one("SELECT COUNT(*) FROM variables", [], |row| row.get(0))
            .await
            .unwrap();
        assert_eq!(vars, Some(0));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_reopens() {
        let temp = TempDir::new().unwrap();
        let db = test_db(&temp);

        // Close before ever opening
        db.close().await;
        db.close().await;

        db.execute(
            "INSERT INTO prompts (title, content, primary_category, directory) VALUES ('t', 'c', 'p', 'd')",
            [],
        )
        .await
        .unwrap();
        db.close().await;

        // Data survives a close and the handle reopens lazily
        let count: Option<i64> = db
            .query_one("SELECT COUNT(*) FROM prompts", [], |row| row.get(0))
            .await
            .unwrap();
        assert_eq!(count, Some(1));
    }
}
