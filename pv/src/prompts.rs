//! Prompt row persistence
//!
//! Writes to `prompts` and its child tables. The row-level helpers are
//! plain functions over a connection so the sync engine can run them
//! inside its one outer transaction; [`PromptStore`] wraps them in their
//! own transactions for standalone use.

use std::collections::HashMap;
use std::sync::Arc;

use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::cache::TtlCache;
use crate::catalog;
use crate::db::Database;
use crate::domain::PromptMetadata;
use crate::error::{VaultError, VaultResult};
use crate::names;

/// CRUD over prompt rows
pub struct PromptStore {
    db: Arc<Database>,
    cache: Arc<TtlCache>,
}

impl PromptStore {
    pub fn new(db: Arc<Database>, cache: Arc<TtlCache>) -> Self {
        Self { db, cache }
    }

    /// Map a numeric id or directory name to the canonical numeric id
    pub async fn resolve_ref(&self, reference: &str) -> VaultResult<i64> {
        resolve_reference(&self.db, reference).await
    }

    /// The template body stored for a prompt
    pub async fn content(&self, reference: &str) -> VaultResult<String> {
        let id = self.resolve_ref(reference).await?;
        let row: Option<String> = self
            .db
            .query_one("SELECT content FROM prompts WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .await?;
        row.ok_or_else(|| VaultError::NotFound(format!("prompt {}", id)))
    }

    /// Insert a new prompt with its child rows
    pub async fn create(&self, meta: &PromptMetadata, content: &str) -> VaultResult<i64> {
        meta.validate().map_err(|reason| VaultError::Metadata {
            directory: meta.directory.clone(),
            reason,
        })?;
        if meta.directory.trim().is_empty() {
            return Err(VaultError::Metadata {
                directory: String::new(),
                reason: "missing required field: directory".to_string(),
            });
        }

        let meta = meta.clone();
        let content = content.to_string();
        let id = self
            .db
            .with_transaction(move |tx| insert_prompt(tx, &meta, &content))
            .await?;
        catalog::invalidate_aggregates(&self.cache);
        info!(id, "Created prompt");
        Ok(id)
    }

    /// Rewrite a prompt and its child rows, carrying stored variable
    /// values forward
    pub async fn update(&self, reference: &str, meta: &PromptMetadata, content: &str) -> VaultResult<()> {
        meta.validate().map_err(|reason| VaultError::Metadata {
            directory: meta.directory.clone(),
            reason,
        })?;
        let id = self.resolve_ref(reference).await?;

        let meta = meta.clone();
        let content = content.to_string();
        self.db
            .with_transaction(move |tx| update_prompt(tx, id, &meta, &content))
            .await?;
        catalog::invalidate_prompt(&self.cache, id);
        info!(id, "Updated prompt");
        Ok(())
    }

    /// Delete a prompt; child rows cascade
    pub async fn delete(&self, reference: &str) -> VaultResult<()> {
        let id = self.resolve_ref(reference).await?;
        self.db
            .with_transaction(move |tx| {
                tx.execute("DELETE FROM prompts WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await?;
        catalog::invalidate_prompt(&self.cache, id);
        info!(id, "Deleted prompt");
        Ok(())
    }

    /// Assign a value to one of a prompt's variables. The value may be a
    /// literal, an `Env: NAME` reference, or a `Fragment: cat/name`
    /// reference; empty unsets the variable.
    pub async fn set_variable_value(&self, reference: &str, name: &str, value: &str) -> VaultResult<()> {
        let id = self.resolve_ref(reference).await?;
        let normalized = names::normalize(name);
        let stored: Option<String> = (!value.is_empty()).then(|| value.to_string());
        let changed = self
            .db
            .execute(
                "UPDATE variables SET value = ?1 WHERE prompt_id = ?2 AND name = ?3",
                params![stored, id, normalized],
            )
            .await?;
        if changed == 0 {
            return Err(VaultError::NotFound(format!(
                "variable '{}' on prompt {}",
                normalized, id
            )));
        }
        catalog::invalidate_prompt(&self.cache, id);
        debug!(id, name = %normalized, "Set variable value");
        Ok(())
    }
}

/// Resolve a prompt reference to its canonical numeric id: an all-digit
/// reference is tried as an id, anything else as a directory name.
pub(crate) async fn resolve_reference(db: &Database, reference: &str) -> VaultResult<i64> {
    let reference = reference.trim().to_string();
    if let Ok(id) = reference.parse::<i64>() {
        let found: Option<i64> = db
            .query_one("SELECT id FROM prompts WHERE id = ?1", params![id], |row| row.get(0))
            .await?;
        return found.ok_or_else(|| VaultError::NotFound(format!("prompt {}", id)));
    }
    let found: Option<i64> = db
        .query_one(
            "SELECT id FROM prompts WHERE directory = ?1",
            params![reference],
            |row| row.get(0),
        )
        .await?;
    found.ok_or_else(|| VaultError::NotFound(format!("prompt '{}'", reference)))
}

pub(crate) fn find_id_by_directory(conn: &Connection, directory: &str) -> VaultResult<Option<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM prompts WHERE directory = ?1")?;
    Ok(stmt.query_row(params![directory], |row| row.get(0)).optional()?)
}

pub(crate) fn insert_prompt(conn: &Connection, meta: &PromptMetadata, content: &str) -> VaultResult<i64> {
    conn.execute(
        "INSERT INTO prompts (title, content, primary_category, directory, one_line_description, description, content_hash, tags)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            meta.title,
            content,
            meta.primary_category,
            meta.directory,
            meta.one_line_description,
            meta.description,
            meta.content_hash,
            meta.tags.join(","),
        ],
    )?;
    let id = conn.last_insert_rowid();
    insert_children(conn, id, meta, &HashMap::new())?;
    debug!(id, directory = %meta.directory, "Inserted prompt row");
    Ok(id)
}

pub(crate) fn update_prompt(conn: &Connection, id: i64, meta: &PromptMetadata, content: &str) -> VaultResult<()> {
    conn.execute(
        "UPDATE prompts SET title = ?1, content = ?2, primary_category = ?3, one_line_description = ?4,
         description = ?5, content_hash = ?6, tags = ?7, updated_at = CURRENT_TIMESTAMP
         WHERE id = ?8",
        params![
            meta.title,
            content,
            meta.primary_category,
            meta.one_line_description,
            meta.description,
            meta.content_hash,
            meta.tags.join(","),
            id,
        ],
    )?;

    let existing = stored_variable_values(conn, id)?;
    delete_children(conn, id)?;
    insert_children(conn, id, meta, &existing)?;
    debug!(id, directory = %meta.directory, "Updated prompt row");
    Ok(())
}

/// Values already assigned to a prompt's variables, keyed by normalised
/// name. Unset (NULL) values are omitted.
pub(crate) fn stored_variable_values(conn: &Connection, id: i64) -> VaultResult<HashMap<String, String>> {
    let mut stmt = conn.prepare("SELECT name, value FROM variables WHERE prompt_id = ?1")?;
    let rows = stmt.query_map(params![id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
    })?;

    let mut values = HashMap::new();
    for row in rows {
        let (name, value) = row?;
        if let Some(value) = value {
            values.insert(names::normalize(&name), value);
        }
    }
    Ok(values)
}

fn delete_children(conn: &Connection, id: i64) -> VaultResult<()> {
    conn.execute("DELETE FROM subcategories WHERE prompt_id = ?1", params![id])?;
    conn.execute("DELETE FROM variables WHERE prompt_id = ?1", params![id])?;
    conn.execute("DELETE FROM fragments WHERE prompt_id = ?1", params![id])?;
    Ok(())
}

fn insert_children(
    conn: &Connection,
    id: i64,
    meta: &PromptMetadata,
    existing: &HashMap<String, String>,
) -> VaultResult<()> {
    for subcategory in &meta.subcategories {
        let trimmed = subcategory.trim();
        if trimmed.is_empty() {
            continue;
        }
        conn.execute(
            "INSERT INTO subcategories (prompt_id, name) VALUES (?1, ?2)",
            params![id, trimmed],
        )?;
    }

    for variable in &meta.variables {
        if variable.name.trim().is_empty() {
            continue;
        }
        let name = names::normalize(&variable.name);
        // A value assigned through the library wins over one in the YAML
        let value = existing
            .get(&name)
            .cloned()
            .or_else(|| (!variable.value.is_empty()).then(|| variable.value.clone()));
        conn.execute(
            "INSERT INTO variables (prompt_id, name, role, optional_for_user, value) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, name, variable.role, variable.optional_for_user, value],
        )?;
    }

    for fragment in &meta.fragments {
        conn.execute(
            "INSERT INTO fragments (prompt_id, category, name, variable) VALUES (?1, ?2, ?3, ?4)",
            params![id, fragment.category, fragment.name, names::normalize(&fragment.variable)],
        )?;
    }
    Ok(())
}
