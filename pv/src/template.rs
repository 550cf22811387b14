//! Template placeholder handling
//!
//! Prompt bodies mark their variables as `{{UPPER_SNAKE}}` placeholders.
//! Substitution is a flat, single-pass string replace: substituted text
//! is never re-scanned for further placeholders.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::warn;

use crate::domain::Variable;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("placeholder pattern is valid"));

static DECLARED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Z0-9_]+)\}\}").expect("declared pattern is valid"));

/// Variables a template declares, in first-appearance order, deduplicated
pub fn extract_variables(content: &str) -> Vec<Variable> {
    let mut seen = BTreeSet::new();
    let mut variables = Vec::new();
    for caps in DECLARED.captures_iter(content) {
        let name = &caps[1];
        if seen.insert(name.to_string()) {
            variables.push(Variable {
                name: name.to_string(),
                role: format!("Value for {}", name.to_lowercase().replace('_', " ")),
                optional_for_user: false,
                value: String::new(),
            });
        }
    }
    variables
}

/// Substitute `{{NAME}}` placeholders from a value map.
///
/// Keys are matched case-insensitively and may carry braces; unknown
/// placeholders are left in place and reported once.
pub fn apply_variables(content: &str, variables: &HashMap<String, String>) -> String {
    for (key, value) in variables {
        if value.starts_with('<') && value.ends_with('>') {
            warn!(key = %key, value = %value, "Substituting a diagnostic placeholder");
        }
    }

    let replaced = PLACEHOLDER.replace_all(content, |caps: &Captures<'_>| {
        match lookup(variables, &caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        }
    });

    let leftover: BTreeSet<&str> = DECLARED
        .captures_iter(&replaced)
        .map(|caps| caps.get(1).map_or("", |m| m.as_str()))
        .collect();
    if !leftover.is_empty() {
        let names: Vec<&str> = leftover.into_iter().collect();
        warn!(variables = %names.join(", "), "Placeholders left unsubstituted");
    }

    replaced.into_owned()
}

fn lookup<'a>(variables: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    variables.iter().find_map(|(key, value)| {
        let key = key.trim_matches(|c| c == '{' || c == '}');
        key.eq_ignore_ascii_case(name).then_some(value.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_dedupes_in_order() {
        let content = "{{DIFF}} then {{STYLE}} then {{DIFF}} again";
        let variables = extract_variables(content);
        let names: Vec<&str> = variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["DIFF", "STYLE"]);
        assert_eq!(variables[0].role, "Value for diff");
    }

    #[test]
    fn test_extract_ignores_lowercase_placeholders() {
        assert!(extract_variables("{{not_upper}} and {{ SPACED }}").is_empty());
    }

    #[test]
    fn test_apply_is_case_insensitive_and_flat() {
        let content = "Hello {{NAME}}, {{ NAME }}!";
        let variables = HashMap::from([("name".to_string(), "{{AGAIN}}".to_string())]);

        // The substituted value is not re-expanded
        assert_eq!(apply_variables(content, &variables), "Hello {{AGAIN}}, {{AGAIN}}!");
    }

    #[test]
    fn test_apply_accepts_braced_keys() {
        let content = "Hi {{WHO}}";
        let variables = HashMap::from([("{{WHO}}".to_string(), "you".to_string())]);
        assert_eq!(apply_variables(content, &variables), "Hi you");
    }

    #[test]
    fn test_apply_leaves_unknown_placeholders() {
        let content = "{{KNOWN}} and {{UNKNOWN}}";
        let variables = HashMap::from([("KNOWN".to_string(), "yes".to_string())]);
        assert_eq!(apply_variables(content, &variables), "yes and {{UNKNOWN}}");
    }
}
