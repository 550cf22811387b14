//! PromptVault - a filesystem-first prompt template library
//!
//! Prompts live on disk as one directory per template, each holding the
//! template body and its metadata. A SQLite index mirrors the tree for
//! fast lookup and is rebuilt from disk by the sync engine, never the
//! other way around.
//!
//! # Layout
//!
//! ```text
//! prompts/
//! └── {directory}/
//!     ├── prompt.md        # template body with {{VARIABLE}} slots
//!     └── metadata.yml     # title, category, variables, fragments
//! fragments/
//! └── {category}/
//!     └── {name}.md        # reusable text addressed as category/name
//! ```
//!
//! # Example
//!
//! ```ignore
//! use promptvault::{Config, Vault};
//!
//! let config = Config::load(None)?;
//! let vault = Vault::open(&config).await?;
//! vault.sync.sync_all().await?;
//! let prompt = vault.catalog.prompt("code-review", false).await?;
//! ```

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod envvars;
pub mod error;
pub mod history;
pub mod names;
pub mod prompts;
pub mod resolve;
pub mod schema;
pub mod sync;
pub mod template;

use std::sync::Arc;

pub use cache::{TtlCache, ttl};
pub use catalog::PromptCatalog;
pub use config::Config;
pub use db::Database;
pub use domain::{EnvVar, Execution, FragmentLink, Prompt, PromptMetadata, PromptSummary, Scope, Variable};
pub use envvars::EnvVarStore;
pub use error::{VaultError, VaultResult};
pub use history::HistoryStore;
pub use prompts::PromptStore;
pub use resolve::Resolver;
pub use sync::{SyncEngine, SyncReport};

use fragstore::FragmentStore;

/// Every store wired to one database handle and one cache
pub struct Vault {
    pub db: Arc<Database>,
    pub cache: Arc<TtlCache>,
    pub catalog: PromptCatalog,
    pub prompts: PromptStore,
    pub env: Arc<EnvVarStore>,
    pub history: HistoryStore,
    pub sync: SyncEngine,
    pub fragments: Arc<FragmentStore>,
    pub resolver: Resolver,
}

impl Vault {
    /// Open the stores named by a config, creating directories as needed
    pub async fn open(config: &Config) -> eyre::Result<Self> {
        let db = Arc::new(Database::new(&config.db_path));
        let cache = Arc::new(TtlCache::new());
        let fragments = Arc::new(FragmentStore::open(&config.fragments_dir).await?);
        let env = Arc::new(EnvVarStore::new(db.clone(), cache.clone()));

        Ok(Self {
            catalog: PromptCatalog::new(db.clone(), cache.clone()),
            prompts: PromptStore::new(db.clone(), cache.clone()),
            history: HistoryStore::new(db.clone()),
            sync: SyncEngine::new(db.clone(), cache.clone(), &config.library_dir),
            resolver: Resolver::new(env.clone(), fragments.clone()),
            env,
            fragments,
            db,
            cache,
        })
    }

    /// Release the database connection
    pub async fn close(&self) {
        self.db.close().await;
    }
}
