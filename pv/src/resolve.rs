//! Reference resolution
//!
//! A stored variable value may be literal text or a prefixed reference:
//! `Fragment: category/name` pulls in a fragment body, `Env: NAME` reads
//! an env var, `file:path` reads a file. Env var values may themselves
//! hold fragment or env references, which are followed until a terminal
//! value; a file reference inside an env var stays literal. Resolution
//! of a value map never fails as a whole: a broken reference becomes an
//! inline `<Error: ...>` placeholder for that one key.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use fragstore::FragmentStore;
use futures::future::join_all;
use tokio::fs;
use tracing::{debug, warn};

use crate::domain::EnvVar;
use crate::envvars::EnvVarStore;
use crate::error::{VaultError, VaultResult};
use crate::names;

/// Marks a value referencing a fragment body
pub const FRAGMENT_PREFIX: &str = "Fragment: ";
/// Marks a value referencing an env var
pub const ENV_PREFIX: &str = "Env: ";
/// Marks a value referencing a file's contents
pub const FILE_PREFIX: &str = "file:";

/// Expands prefixed references into their terminal text
pub struct Resolver {
    env: Arc<EnvVarStore>,
    fragments: Arc<FragmentStore>,
}

impl Resolver {
    pub fn new(env: Arc<EnvVarStore>, fragments: Arc<FragmentStore>) -> Self {
        Self { env, fragments }
    }

    /// Resolve a single value, propagating failures as typed errors
    pub async fn resolve_value(&self, value: &str) -> VaultResult<String> {
        let env_vars = self.env.list().await?;
        self.resolve_with_env(value, &env_vars).await
    }

    /// Resolve every value of a map concurrently.
    ///
    /// The output always carries the same keys as the input; a value
    /// that fails to resolve is replaced by its diagnostic placeholder.
    pub async fn resolve_inputs(&self, inputs: &HashMap<String, String>) -> VaultResult<HashMap<String, String>> {
        let env_vars = match self.env.list().await {
            Ok(vars) => vars,
            Err(err) => {
                warn!(error = %err, "Could not load env vars, resolving against an empty set");
                Vec::new()
            }
        };

        let tasks = inputs.iter().map(|(key, value)| {
            let env_vars = &env_vars;
            async move {
                let resolved = match self.resolve_with_env(value, env_vars).await {
                    Ok(resolved) => resolved,
                    Err(err) => {
                        warn!(key = %key, error = %err, "Value did not resolve");
                        err.placeholder()
                    }
                };
                (key.clone(), resolved)
            }
        });
        Ok(join_all(tasks).await.into_iter().collect())
    }

    async fn resolve_with_env(&self, value: &str, env_vars: &[EnvVar]) -> VaultResult<String> {
        let mut current = value.to_string();
        // Env var names already followed in this chain
        let mut visited: HashSet<String> = HashSet::new();

        loop {
            if let Some(path) = current.strip_prefix(FRAGMENT_PREFIX) {
                let mut parts = path.split('/');
                let category = parts.next().unwrap_or_default().trim();
                let name = parts.next().unwrap_or_default().trim();
                if category.is_empty() || name.is_empty() {
                    return Err(VaultError::MalformedReference(current.clone()));
                }
                return self
                    .fragments
                    .content(category, name)
                    .await
                    .map_err(|_| VaultError::NotFound(format!("fragment {}/{}", category, name)));
            }

            if let Some(name_ref) = current.strip_prefix(ENV_PREFIX) {
                let normalized = names::normalize(name_ref);
                if !visited.insert(normalized.clone()) {
                    return Err(VaultError::CycleDetected(normalized));
                }
                let var = env_vars
                    .iter()
                    .find(|var| names::normalize(&var.name) == normalized)
                    .ok_or_else(|| VaultError::EnvVarNotFound(name_ref.trim().to_string()))?;

                current = var.value.clone();
                if current.starts_with(ENV_PREFIX) || current.starts_with(FRAGMENT_PREFIX) {
                    debug!(name = %normalized, "Following nested reference in env var");
                    continue;
                }
                return Ok(current);
            }

            if let Some(path) = current.strip_prefix(FILE_PREFIX) {
                return match fs::read_to_string(path).await {
                    Ok(content) => Ok(content),
                    Err(source) => Err(VaultError::FileRead {
                        path: path.to_string(),
                        source,
                    }),
                };
            }

            return Ok(current);
        }
    }
}
