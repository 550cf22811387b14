//! Name normalisation
//!
//! Variable names arrive in every shape users type them: `{{apiKey}}`,
//! `api-key`, `API KEY`. One normal form (UPPER_SNAKE) backs storage,
//! case-insensitive lookup, and carry-forward matching, so all three see
//! the same key.

/// Convert to lower snake_case: braces stripped, camelCase split,
/// spaces and hyphens folded to underscores, runs collapsed.
pub fn snake_case(text: &str) -> String {
    let trimmed = text.trim().trim_start_matches('_');

    let mut out = String::with_capacity(trimmed.len() + 4);
    let mut prev_lower = false;
    for c in trimmed.chars() {
        match c {
            '{' | '}' => continue,
            '-' => {
                out.push('_');
                prev_lower = false;
            }
            c if c.is_whitespace() => {
                out.push('_');
                prev_lower = false;
            }
            c if c.is_ascii_uppercase() => {
                if prev_lower {
                    out.push('_');
                }
                out.push(c.to_ascii_lowercase());
                prev_lower = false;
            }
            c => {
                out.extend(c.to_lowercase());
                prev_lower = c.is_ascii_lowercase();
            }
        }
    }

    let mut collapsed = String::with_capacity(out.len());
    let mut prev_underscore = false;
    for c in out.chars() {
        if c == '_' {
            if !prev_underscore {
                collapsed.push('_');
            }
            prev_underscore = true;
        } else {
            collapsed.push(c);
            prev_underscore = false;
        }
    }
    collapsed.trim_matches('_').to_string()
}

/// Storage form of a variable name: snake_case, uppercased
pub fn normalize(name: &str) -> String {
    snake_case(name).to_uppercase()
}

/// Human form of a category or directory name: underscores and hyphens
/// become spaces, each word capitalised. Empty input displays as "Unknown".
pub fn title_case(text: &str) -> String {
    if text.is_empty() {
        return "Unknown".to_string();
    }
    text.split(['_', '-'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_snake_case_forms() {
        assert_eq!(snake_case("apiKey"), "api_key");
        assert_eq!(snake_case("{{API_KEY}}"), "api_key");
        assert_eq!(snake_case("  user name  "), "user_name");
        assert_eq!(snake_case("some-mixed Name"), "some_mixed_name");
        assert_eq!(snake_case("__private"), "private");
        assert_eq!(snake_case("a__b___c"), "a_b_c");
        assert_eq!(snake_case("HTMLParser"), "htmlparser");
        assert_eq!(snake_case(""), "");
    }

    #[test]
    fn test_normalize_is_storage_form() {
        assert_eq!(normalize("apiKey"), "API_KEY");
        assert_eq!(normalize("{{ api key }}"), "API_KEY");
        assert_eq!(normalize("API_KEY"), "API_KEY");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("prompt_engineering"), "Prompt Engineering");
        assert_eq!(title_case("code-review"), "Code Review");
        assert_eq!(title_case(""), "Unknown");
    }

    proptest! {
        #[test]
        fn prop_normalize_idempotent(name in ".{0,40}") {
            let once = normalize(&name);
            prop_assert_eq!(normalize(&once), once.clone());
        }

        #[test]
        fn prop_normalize_ascii_identifiers(name in "[a-zA-Z0-9_{} -]{0,40}") {
            let normal = normalize(&name);
            prop_assert!(normal.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'));
            prop_assert!(!normal.starts_with('_'));
            prop_assert!(!normal.ends_with('_'));
        }
    }
}
