//! Domain types for the vault
//!
//! `PromptMetadata` mirrors the on-disk `metadata.yml` shape; `Prompt` and
//! `PromptSummary` are the assembled records served out of the index.

use serde::{Deserialize, Serialize};

/// A variable slot declared by a prompt template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    /// Placeholder name as it appears in `{{NAME}}`
    pub name: String,
    /// What the variable is for
    #[serde(default)]
    pub role: String,
    /// Whether the user may leave it unset
    #[serde(default)]
    pub optional_for_user: bool,
    /// Assigned value: a literal, `Env: NAME`, or `Fragment: cat/name`.
    /// Empty when unset.
    #[serde(default)]
    pub value: String,
}

/// A fragment wired into one of a prompt's variables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentLink {
    pub category: String,
    pub name: String,
    /// The variable the fragment body feeds
    pub variable: String,
}

/// The `metadata.yml` document stored next to each `prompt.md`.
///
/// Every field defaults so a partial file still parses; `title` and
/// `primary_category` are validated as non-empty when the directory is
/// synced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub primary_category: String,
    /// Always overwritten with the actual directory name at sync time
    #[serde(default)]
    pub directory: String,
    #[serde(default)]
    pub one_line_description: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub subcategories: Vec<String>,
    /// Accepts either a list or a comma-joined string in the YAML
    #[serde(default, deserialize_with = "list_or_comma_string")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub fragments: Vec<FragmentLink>,
    #[serde(default)]
    pub content_hash: String,
}

impl PromptMetadata {
    /// Check the fields every stored prompt must have
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("missing required field: title".to_string());
        }
        if self.primary_category.trim().is_empty() {
            return Err("missing required field: primary_category".to_string());
        }
        Ok(())
    }
}

fn list_or_comma_string<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::List(items) => items,
        Raw::Joined(joined) => joined
            .split(',')
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect(),
    })
}

/// Fully assembled prompt record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub id: i64,
    pub title: String,
    pub primary_category: String,
    pub directory: String,
    pub one_line_description: String,
    pub description: String,
    pub content_hash: String,
    pub tags: Vec<String>,
    pub subcategories: Vec<String>,
    pub variables: Vec<Variable>,
    pub fragments: Vec<FragmentLink>,
}

/// One line of a listing, grouped under its primary category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSummary {
    pub id: i64,
    pub title: String,
    pub primary_category: String,
    pub directory: String,
    pub one_line_description: String,
    pub subcategories: Vec<String>,
}

/// Visibility of an env var
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    #[default]
    Global,
    /// Tied to a single prompt
    Prompt,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Prompt => "prompt",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "prompt" => Self::Prompt,
            _ => Self::Global,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored environment variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvVar {
    pub id: i64,
    /// Stored uppercase; matched case-insensitively
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub value: String,
    pub scope: Scope,
    pub prompt_id: Option<i64>,
    /// Masked in listings when set
    #[serde(default)]
    pub secret: bool,
}

/// A prompt execution record joined with its title
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: i64,
    pub prompt_id: i64,
    pub title: String,
    pub executed_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_parses_with_missing_fields() {
        let yaml = "title: Greeter\nprimary_category: writing\n";
        let meta: PromptMetadata = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(meta.title, "Greeter");
        assert_eq!(meta.primary_category, "writing");
        assert!(meta.subcategories.is_empty());
        assert!(meta.variables.is_empty());
    }

    #[test]
    fn test_metadata_full_document() {
        let yaml = r#"
title: Code Review
primary_category: coding
one_line_description: Review a diff
subcategories:
  - quality
tags:
  - review
  - rust
variables:
  - name: DIFF
    role: the change to review
  - name: STYLE
    role: review style
    optional_for_user: true
fragments:
  - category: coding
    name: review_checklist
    variable: STYLE
"#;
        let meta: PromptMetadata = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(meta.tags, vec!["review", "rust"]);
        assert_eq!(meta.variables.len(), 2);
        assert!(meta.variables[1].optional_for_user);
        assert_eq!(meta.fragments[0].variable, "STYLE");
    }

    #[test]
    fn test_tags_accept_comma_string() {
        let yaml = "title: T\nprimary_category: c\ntags: review, rust , \n";
        let meta: PromptMetadata = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(meta.tags, vec!["review", "rust"]);
    }

    #[test]
    fn test_scope_str_roundtrip() {
        assert_eq!(Scope::parse("prompt"), Scope::Prompt);
        assert_eq!(Scope::parse("global"), Scope::Global);
        assert_eq!(Scope::parse("anything-else"), Scope::Global);
        assert_eq!(Scope::Prompt.to_string(), "prompt");
    }
}
