//! Filesystem reconciliation
//!
//! The library directory on disk is the source of truth. A sync pass
//! scans its immediate subdirectories, upserts an index row per
//! directory, and removes rows whose directory is gone. Every write of
//! the pass happens inside one transaction: a directory that cannot be
//! synced rolls the whole pass back, so the index never holds a
//! half-applied scan. Directories missing their prompt or metadata file
//! are skipped with a warning instead; they still count as present on
//! disk and are never swept as orphans.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use rusqlite::{Transaction, params};
use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::cache::TtlCache;
use crate::catalog;
use crate::db::Database;
use crate::domain::PromptMetadata;
use crate::error::{VaultError, VaultResult};
use crate::prompts;

/// Template body file inside each prompt directory
pub const PROMPT_FILE: &str = "prompt.md";
/// Structured metadata file inside each prompt directory
pub const METADATA_FILE: &str = "metadata.yml";

/// Counts from a full reconciliation pass
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct SyncReport {
    /// Directories inserted or updated
    pub synced: usize,
    /// Directories skipped for missing files
    pub skipped: Vec<String>,
    /// Orphaned index rows removed
    pub removed: usize,
}

enum DirOutcome {
    Ready(Box<PromptMetadata>, String),
    Skip(String),
    Failed(String),
}

/// Reconciles the library directory with the prompt index
pub struct SyncEngine {
    db: Arc<Database>,
    cache: Arc<TtlCache>,
    library_dir: PathBuf,
}

impl SyncEngine {
    pub fn new(db: Arc<Database>, cache: Arc<TtlCache>, library_dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            cache,
            library_dir: library_dir.into(),
        }
    }

    /// Reconcile every prompt directory in one transaction.
    ///
    /// An empty or absent library directory is valid and yields an empty
    /// index. Any directory that fails to sync aborts the pass with
    /// nothing committed; the error names the first failing directory.
    pub async fn sync_all(&self) -> VaultResult<SyncReport> {
        fs::create_dir_all(&self.library_dir).await?;
        let dirs = self.scan()?;
        info!(count = dirs.len(), path = %self.library_dir.display(), "Scanning prompt directories");

        // All file reads fan out before the first write
        let outcomes = join_all(dirs.iter().map(|dir| self.read_dir(dir))).await;

        let mut report = SyncReport::default();
        let mut work: Vec<(&str, DirOutcome)> = Vec::new();
        for (directory, outcome) in dirs.iter().zip(outcomes) {
            if let DirOutcome::Skip(reason) = &outcome {
                warn!(directory = %directory, %reason, "Skipping prompt directory");
                report.skipped.push(directory.clone());
            } else {
                work.push((directory, outcome));
            }
        }

        let (synced, removed) = self
            .db
            .with_transaction(|tx| {
                let mut synced: Vec<i64> = Vec::new();
                let mut failures: Vec<(String, String)> = Vec::new();

                for (directory, outcome) in &work {
                    match outcome {
                        DirOutcome::Ready(meta, content) => match upsert(tx, meta, content) {
                            Ok(id) => {
                                debug!(directory = %directory, id, "Synced prompt directory");
                                synced.push(id);
                            }
                            Err(err) => {
                                warn!(directory = %directory, error = %err, "Failed to sync prompt directory");
                                failures.push((directory.to_string(), err.to_string()));
                            }
                        },
                        DirOutcome::Failed(reason) => {
                            warn!(directory = %directory, %reason, "Failed to sync prompt directory");
                            failures.push((directory.to_string(), reason.clone()));
                        }
                        DirOutcome::Skip(_) => {}
                    }
                }

                if let Some((directory, reason)) = failures.into_iter().next() {
                    return Err(VaultError::SyncFailed { directory, reason });
                }

                let removed = remove_orphans(tx, &dirs)?;
                Ok((synced, removed))
            })
            .await?;

        for id in &synced {
            self.cache.remove(&catalog::prompt_key(*id));
        }
        catalog::invalidate_aggregates(&self.cache);

        report.synced = synced.len();
        report.removed = removed;
        info!(
            synced = report.synced,
            skipped = report.skipped.len(),
            removed = report.removed,
            "Prompt sync complete"
        );
        Ok(report)
    }

    /// Re-sync a single known directory without an orphan sweep.
    ///
    /// Unlike a full pass, missing files here are an error: the caller
    /// named the directory, so there is nothing to fall back to.
    pub async fn sync_one(&self, directory: &str) -> VaultResult<i64> {
        let (meta, content) = match self.read_dir(directory).await {
            DirOutcome::Ready(meta, content) => (meta, content),
            DirOutcome::Skip(reason) | DirOutcome::Failed(reason) => {
                return Err(VaultError::SyncFailed {
                    directory: directory.to_string(),
                    reason,
                });
            }
        };

        let id = self.db.with_transaction(|tx| upsert(tx, &meta, &content)).await?;
        catalog::invalidate_prompt(&self.cache, id);
        info!(directory, id, "Synced prompt directory");
        Ok(id)
    }

    /// Immediate subdirectory names of the library root, sorted
    fn scan(&self) -> VaultResult<Vec<String>> {
        let mut dirs = Vec::new();
        for entry in WalkDir::new(&self.library_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry.file_type().is_dir() {
                dirs.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        Ok(dirs)
    }

    /// Read and parse one prompt directory, classifying the result
    async fn read_dir(&self, directory: &str) -> DirOutcome {
        let dir_path = self.library_dir.join(directory);
        let prompt_path = dir_path.join(PROMPT_FILE);
        let metadata_path = dir_path.join(METADATA_FILE);

        let has_prompt = fs::try_exists(&prompt_path).await.unwrap_or(false);
        let has_metadata = fs::try_exists(&metadata_path).await.unwrap_or(false);
        if !has_prompt || !has_metadata {
            return DirOutcome::Skip(format!("missing {} or {}", PROMPT_FILE, METADATA_FILE));
        }

        let content = match fs::read_to_string(&prompt_path).await {
            Ok(content) => content,
            Err(err) => return DirOutcome::Failed(format!("cannot read {}: {}", PROMPT_FILE, err)),
        };
        let raw = match fs::read_to_string(&metadata_path).await {
            Ok(raw) => raw,
            Err(err) => return DirOutcome::Failed(format!("cannot read {}: {}", METADATA_FILE, err)),
        };

        let mut meta: PromptMetadata = match serde_yaml::from_str(&raw) {
            Ok(meta) => meta,
            Err(err) => return DirOutcome::Failed(format!("invalid {}: {}", METADATA_FILE, err)),
        };
        if let Err(reason) = meta.validate() {
            return DirOutcome::Failed(reason);
        }

        // The folder name is authoritative, whatever the YAML says
        meta.directory = directory.to_string();
        meta.content_hash = content_hash(&content);
        DirOutcome::Ready(Box::new(meta), content)
    }
}

fn upsert(tx: &Transaction<'_>, meta: &PromptMetadata, content: &str) -> VaultResult<i64> {
    match prompts::find_id_by_directory(tx, &meta.directory)? {
        Some(id) => {
            prompts::update_prompt(tx, id, meta, content)?;
            Ok(id)
        }
        None => prompts::insert_prompt(tx, meta, content),
    }
}

/// Delete index rows whose directory was not found on disk
fn remove_orphans(tx: &Transaction<'_>, on_disk: &[String]) -> VaultResult<usize> {
    let orphans: Vec<(i64, String)> = {
        let mut stmt = tx.prepare("SELECT id, directory FROM prompts")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<rusqlite::Result<Vec<(i64, String)>>>()?
            .into_iter()
            .filter(|(_, directory)| !on_disk.contains(directory))
            .collect()
    };

    for (id, directory) in &orphans {
        tx.execute("DELETE FROM prompts WHERE id = ?1", params![id])?;
        info!(id, directory = %directory, "Removed orphaned prompt");
    }
    Ok(orphans.len())
}

/// Fingerprint for change detection, not a cryptographic hash
pub(crate) fn content_hash(content: &str) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}
