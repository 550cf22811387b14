//! Core FragmentStore implementation

use eyre::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// A fragment's identity within the store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FragmentRef {
    /// Category directory the fragment lives in
    pub category: String,
    /// Fragment name (file stem, without extension)
    pub name: String,
}

impl std::fmt::Display for FragmentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

/// The main fragment store
pub struct FragmentStore {
    /// Base path for fragment categories
    base_path: PathBuf,
}

impl FragmentStore {
    /// Open or create a fragment store at the given path
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)
            .await
            .context("Failed to create fragment directory")?;
        debug!(?base_path, "Opened fragment store");
        Ok(Self { base_path })
    }

    /// List all fragments, sorted by category then name
    pub async fn list(&self) -> Result<Vec<FragmentRef>> {
        let mut fragments = Vec::new();

        let mut categories = fs::read_dir(&self.base_path).await?;
        while let Some(entry) = categories.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(category) = entry.file_name().to_str().map(String::from) else {
                continue;
            };

            let mut files = fs::read_dir(entry.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let path = file.path();
                if path.extension().map(|e| e == crate::FRAGMENT_EXT).unwrap_or(false)
                    && let Some(name) = path.file_stem().and_then(|s| s.to_str())
                {
                    fragments.push(FragmentRef {
                        category: category.clone(),
                        name: name.to_string(),
                    });
                }
            }
        }

        fragments.sort();
        Ok(fragments)
    }

    /// List category names that contain at least one fragment
    pub async fn categories(&self) -> Result<Vec<String>> {
        let mut categories: Vec<String> = self
            .list()
            .await?
            .into_iter()
            .map(|f| f.category)
            .collect();
        categories.dedup();
        Ok(categories)
    }

    /// Get the body of a fragment
    pub async fn content(&self, category: &str, name: &str) -> Result<String> {
        let path = self.fragment_path(category, name);
        fs::read_to_string(&path)
            .await
            .context(format!("Fragment not found: {}/{}", category, name))
    }

    /// Create a new fragment; fails if it already exists
    pub async fn add(&self, category: &str, name: &str, body: &str) -> Result<()> {
        let path = self.fragment_path(category, name);
        if fs::try_exists(&path).await? {
            return Err(eyre::eyre!("Fragment already exists: {}/{}", category, name));
        }
        self.write_fragment(&path, category, name, body).await
    }

    /// Overwrite an existing fragment; fails if it does not exist
    pub async fn update(&self, category: &str, name: &str, body: &str) -> Result<()> {
        let path = self.fragment_path(category, name);
        if !fs::try_exists(&path).await? {
            return Err(eyre::eyre!("Fragment not found: {}/{}", category, name));
        }
        self.write_fragment(&path, category, name, body).await
    }

    /// Delete a fragment, pruning its category directory if it becomes empty
    pub async fn remove(&self, category: &str, name: &str) -> Result<()> {
        let path = self.fragment_path(category, name);
        if !fs::try_exists(&path).await? {
            return Err(eyre::eyre!("Fragment not found: {}/{}", category, name));
        }
        fs::remove_file(&path)
            .await
            .context(format!("Failed to delete fragment: {}/{}", category, name))?;
        info!(category, name, "Deleted fragment");

        let category_dir = self.base_path.join(sanitize(category));
        let mut entries = fs::read_dir(&category_dir).await?;
        if entries.next_entry().await?.is_none() {
            fs::remove_dir(&category_dir).await?;
            debug!(category, "Pruned empty category directory");
        }
        Ok(())
    }

    async fn write_fragment(&self, path: &Path, category: &str, name: &str, body: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create category directory")?;
        }
        fs::write(path, body)
            .await
            .context(format!("Failed to write fragment: {}/{}", category, name))?;
        info!(category, name, bytes = body.len(), "Stored fragment");
        Ok(())
    }

    fn fragment_path(&self, category: &str, name: &str) -> PathBuf {
        self.base_path
            .join(sanitize(category))
            .join(format!("{}.{}", sanitize(name), crate::FRAGMENT_EXT))
    }
}

/// Replace path-hostile characters so category/name pairs cannot escape the store
fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_add_and_content() {
        let temp = TempDir::new().unwrap();
        let store = FragmentStore::open(temp.path()).await.unwrap();

        store.add("common", "greeting", "Hello there").await.unwrap();

        let body = store.content("common", "greeting").await.unwrap();
        assert_eq!(body, "Hello there");

        // A second add with the same identity is refused
        assert!(store.add("common", "greeting", "again").await.is_err());
    }

    #[tokio::test]
    async fn test_update_requires_existing() {
        let temp = TempDir::new().unwrap();
        let store = FragmentStore::open(temp.path()).await.unwrap();

        assert!(store.update("common", "missing", "body").await.is_err());

        store.add("common", "present", "v1").await.unwrap();
        store.update("common", "present", "v2").await.unwrap();
        assert_eq!(store.content("common", "present").await.unwrap(), "v2");
    }

    #[tokio::test]
    async fn test_list_and_categories_sorted() {
        let temp = TempDir::new().unwrap();
        let store = FragmentStore::open(temp.path()).await.unwrap();

        store.add("writing", "tone", "formal").await.unwrap();
        store.add("coding", "style", "terse").await.unwrap();
        store.add("coding", "language", "rust").await.unwrap();

        let all = store.list().await.unwrap();
        let names: Vec<String> = all.iter().map(|f| f.to_string()).collect();
        assert_eq!(names, vec!["coding/language", "coding/style", "writing/tone"]);

        assert_eq!(store.categories().await.unwrap(), vec!["coding", "writing"]);
    }

    #[tokio::test]
    async fn test_remove_prunes_empty_category() {
        let temp = TempDir::new().unwrap();
        let store = FragmentStore::open(temp.path()).await.unwrap();

        store.add("solo", "only", "body").await.unwrap();
        store.remove("solo", "only").await.unwrap();

        assert!(!temp.path().join("solo").exists());
        assert!(store.remove("solo", "only").await.is_err());
    }

    #[tokio::test]
    async fn test_sanitizes_path_components() {
        let temp = TempDir::new().unwrap();
        let store = FragmentStore::open(temp.path()).await.unwrap();

        store.add("../escape", "na/me", "body").await.unwrap();

        assert!(temp.path().join(".._escape").join("na_me.md").exists());
        assert_eq!(store.content("../escape", "na/me").await.unwrap(), "body");
    }
}
