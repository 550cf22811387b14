//! Metadata assembly
//!
//! Builds denormalised prompt records and listing aggregates out of the
//! four index tables, with a TTL cache in front of every read. Cache keys
//! are namespaced constants so writers can invalidate precisely: one key
//! per prompt record plus two aggregate keys.

use std::collections::BTreeMap;
use std::sync::Arc;

use rusqlite::params;
use tracing::debug;

use crate::cache::{TtlCache, ttl};
use crate::db::Database;
use crate::domain::{FragmentLink, Prompt, PromptSummary, Variable};
use crate::error::{VaultError, VaultResult};
use crate::prompts;

pub(crate) const KEY_CATEGORIES: &str = "all_prompts_by_category";
pub(crate) const KEY_ALL_PROMPTS: &str = "all_prompts_list";

pub(crate) fn prompt_key(id: i64) -> String {
    format!("prompt_metadata_{}", id)
}

/// Drop one prompt's cached record and both aggregates
pub(crate) fn invalidate_prompt(cache: &TtlCache, id: i64) {
    cache.remove(&prompt_key(id));
    cache.remove(KEY_CATEGORIES);
    cache.remove(KEY_ALL_PROMPTS);
    debug!(id, "Invalidated prompt cache entries");
}

/// Drop only the two aggregate keys; per-prompt records stay
pub(crate) fn invalidate_aggregates(cache: &TtlCache) {
    cache.remove(KEY_CATEGORIES);
    cache.remove(KEY_ALL_PROMPTS);
    debug!("Invalidated aggregate cache entries");
}

/// Cached read access to assembled prompt records
pub struct PromptCatalog {
    db: Arc<Database>,
    cache: Arc<TtlCache>,
}

impl PromptCatalog {
    pub fn new(db: Arc<Database>, cache: Arc<TtlCache>) -> Self {
        Self { db, cache }
    }

    /// Assemble the full record for a prompt, by numeric id or directory
    /// name.
    ///
    /// With `clean_variables` the cache is bypassed in both directions
    /// and every variable value comes back blank; callers use this to
    /// inspect a template without the values currently assigned to it.
    pub async fn prompt(&self, reference: &str, clean_variables: bool) -> VaultResult<Prompt> {
        let id = prompts::resolve_reference(&self.db, reference).await?;
        if clean_variables {
            let mut record = self.assemble(id).await?;
            for variable in &mut record.variables {
                variable.value.clear();
            }
            return Ok(record);
        }
        self.cache
            .get_or_compute(&prompt_key(id), ttl::DEFAULT, || self.assemble(id))
            .await
    }

    /// All prompts grouped by primary category, each group sorted by
    /// title. Prompts with an empty category land under `uncategorized`.
    pub async fn categories(&self) -> VaultResult<BTreeMap<String, Vec<PromptSummary>>> {
        self.cache
            .get_or_compute(KEY_CATEGORIES, ttl::MEDIUM, || self.build_categories())
            .await
    }

    /// Every prompt, sorted by title
    pub async fn all_prompts(&self) -> VaultResult<Vec<PromptSummary>> {
        self.cache
            .get_or_compute(KEY_ALL_PROMPTS, ttl::MEDIUM, || async {
                let categories = self.categories().await?;
                let mut all: Vec<PromptSummary> = categories.into_values().flatten().collect();
                all.sort_by(|a, b| a.title.cmp(&b.title));
                Ok(all)
            })
            .await
    }

    /// Case-insensitive substring search over title, body, category, and
    /// tags. Uncached.
    pub async fn search(&self, term: &str) -> VaultResult<Vec<PromptSummary>> {
        let pattern = format!("%{}%", term.to_lowercase());
        self.db
            .query_all(
                "SELECT p.id, p.title, p.primary_category, p.directory,
                        COALESCE(p.one_line_description, ''), COALESCE(p.description, ''),
                        GROUP_CONCAT(DISTINCT s.name)
                 FROM prompts p
                 LEFT JOIN subcategories s ON p.id = s.prompt_id
                 WHERE LOWER(p.title) LIKE ?1 OR LOWER(p.content) LIKE ?1
                    OR LOWER(p.primary_category) LIKE ?1 OR LOWER(p.tags) LIKE ?1
                 GROUP BY p.id
                 ORDER BY p.title",
                params![pattern],
                summary_from_row,
            )
            .await
    }

    /// Drop one prompt's cached record and both aggregates
    pub fn invalidate(&self, id: i64) {
        invalidate_prompt(&self.cache, id);
    }

    /// Drop only the aggregate listings
    pub fn invalidate_aggregates(&self) {
        invalidate_aggregates(&self.cache);
    }

    async fn assemble(&self, id: i64) -> VaultResult<Prompt> {
        let base = self
            .db
            .query_one(
                "SELECT id, title, primary_category, directory,
                        COALESCE(one_line_description, ''), COALESCE(description, ''),
                        COALESCE(content_hash, ''), COALESCE(tags, '')
                 FROM prompts WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Prompt {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        primary_category: row.get(2)?,
                        directory: row.get(3)?,
                        one_line_description: row.get(4)?,
                        description: row.get(5)?,
                        content_hash: row.get(6)?,
                        tags: split_tags(&row.get::<_, String>(7)?),
                        subcategories: Vec::new(),
                        variables: Vec::new(),
                        fragments: Vec::new(),
                    })
                },
            )
            .await?;
        let mut record = base.ok_or_else(|| VaultError::NotFound(format!("prompt {}", id)))?;

        record.subcategories = self
            .db
            .query_all(
                "SELECT name FROM subcategories WHERE prompt_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .await?;

        record.variables = self
            .db
            .query_all(
                "SELECT name, role, optional_for_user, COALESCE(value, '')
                 FROM variables WHERE prompt_id = ?1",
                params![id],
                |row| {
                    Ok(Variable {
                        name: row.get(0)?,
                        role: row.get(1)?,
                        optional_for_user: row.get(2)?,
                        value: row.get(3)?,
                    })
                },
            )
            .await?;

        record.fragments = self
            .db
            .query_all(
                "SELECT category, name, variable FROM fragments WHERE prompt_id = ?1",
                params![id],
                |row| {
                    Ok(FragmentLink {
                        category: row.get(0)?,
                        name: row.get(1)?,
                        variable: row.get(2)?,
                    })
                },
            )
            .await?;

        debug!(id, "Assembled prompt record");
        Ok(record)
    }

    async fn build_categories(&self) -> VaultResult<BTreeMap<String, Vec<PromptSummary>>> {
        let summaries = self
            .db
            .query_all(
                "SELECT p.id, p.title, p.primary_category, p.directory,
                        COALESCE(p.one_line_description, ''), COALESCE(p.description, ''),
                        GROUP_CONCAT(DISTINCT s.name)
                 FROM prompts p
                 LEFT JOIN subcategories s ON p.id = s.prompt_id
                 GROUP BY p.id
                 ORDER BY p.id",
                [],
                summary_from_row,
            )
            .await?;

        let mut categories: BTreeMap<String, Vec<PromptSummary>> = BTreeMap::new();
        for summary in summaries {
            categories
                .entry(summary.primary_category.clone())
                .or_default()
                .push(summary);
        }
        for group in categories.values_mut() {
            group.sort_by(|a, b| a.title.cmp(&b.title));
        }
        debug!(categories = categories.len(), "Built category aggregate");
        Ok(categories)
    }
}

fn summary_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PromptSummary> {
    let primary_category: String = row.get(2)?;
    let one_line: String = row.get(4)?;
    let description: String = row.get(5)?;
    let subcategories: Option<String> = row.get(6)?;
    Ok(PromptSummary {
        id: row.get(0)?,
        title: row.get(1)?,
        primary_category: if primary_category.is_empty() {
            "uncategorized".to_string()
        } else {
            primary_category
        },
        directory: row.get(3)?,
        one_line_description: if one_line.is_empty() { description } else { one_line },
        subcategories: subcategories
            .map(|s| split_tags(&s))
            .unwrap_or_default(),
    })
}

fn split_tags(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}
