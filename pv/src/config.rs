//! Configuration for promptvault

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one subdirectory per prompt
    #[serde(default = "default_library_dir")]
    pub library_dir: PathBuf,

    /// Directory holding fragment files, one per category/name
    #[serde(default = "default_fragments_dir")]
    pub fragments_dir: PathBuf,

    /// SQLite index file
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Log level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn base_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("promptvault")
}

fn default_library_dir() -> PathBuf {
    base_dir().join("prompts")
}

fn default_fragments_dir() -> PathBuf {
    base_dir().join("fragments")
}

fn default_db_path() -> PathBuf {
    base_dir().join("prompts.sqlite")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            library_dir: default_library_dir(),
            fragments_dir: default_fragments_dir(),
            db_path: default_db_path(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            return Ok(config);
        }

        // Try default locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("promptvault").join("config.yml")),
            Some(PathBuf::from("promptvault.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let config: Config = serde_yaml::from_str(&content)?;
                return Ok(config);
            }
        }

        Ok(Config::default())
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yml");
        std::fs::write(&path, "library_dir: /srv/vault/prompts\nlog_level: debug\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.library_dir, PathBuf::from("/srv/vault/prompts"));
        assert_eq!(config.log_level, "debug");
        // Unspecified fields fall back to defaults
        assert_eq!(config.db_path, default_db_path());
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let missing = PathBuf::from("/nonexistent/promptvault.yml");
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_save_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("saved.yml");

        let config = Config {
            library_dir: temp.path().join("prompts"),
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.library_dir, config.library_dir);
    }
}
