//! Scope-overlap detection between selected features.
//!
//! Tokenizes feature names into lowercase keywords against a small
//! vocabulary and warns when two or more selected features share one.
//! Best-effort: shared wording is a hint that two line items may describe
//! the same scope, not proof.
//!
//! The vocabulary is configuration data, not code: callers pass the
//! active list and may replace it wholesale via `bp config set`.

use serde::{Deserialize, Serialize};

/// Built-in overlap vocabulary used when the config does not override it.
pub fn default_vocabulary() -> Vec<String> {
    [
        "auth",
        "login",
        "user",
        "account",
        "payment",
        "billing",
        "search",
        "report",
        "dashboard",
        "notification",
        "upload",
        "export",
        "import",
        "admin",
        "profile",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Heuristic flag that two or more selected features may duplicate scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapWarning {
    /// The shared vocabulary keyword
    pub keyword: String,

    /// Names of the features sharing it, in selection order
    pub features: Vec<String>,

    /// Generic remediation suggestion
    pub suggestion: String,
}

/// Detect vocabulary keywords shared by two or more feature names.
///
/// Matching is word-boundary based: a name contains a keyword only when one
/// of its whitespace-separated words equals it after stripping punctuation.
/// One warning is emitted per shared keyword, naming every sharer.
pub fn detect_overlaps(feature_names: &[String], vocabulary: &[String]) -> Vec<OverlapWarning> {
    let mut warnings = Vec::new();

    for keyword in vocabulary {
        let keyword_lower = keyword.to_lowercase();
        let sharers: Vec<String> = feature_names
            .iter()
            .filter(|name| {
                name.to_lowercase()
                    .split_whitespace()
                    .any(|w| w.trim_matches(|c: char| !c.is_alphanumeric()) == keyword_lower)
            })
            .cloned()
            .collect();

        if sharers.len() >= 2 {
            warnings.push(OverlapWarning {
                keyword: keyword_lower,
                features: sharers,
                suggestion: "These features share wording; consider merging or clarifying scope."
                    .to_string(),
            });
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_overlap_for_distinct_names() {
        let warnings = detect_overlaps(
            &names(&["CRUD endpoints", "websocket sync"]),
            &default_vocabulary(),
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_shared_keyword_warns_once() {
        let warnings = detect_overlaps(
            &names(&["user login", "login audit", "billing export"]),
            &default_vocabulary(),
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].keyword, "login");
        assert_eq!(warnings[0].features, names(&["user login", "login audit"]));
    }

    #[test]
    fn test_three_sharers_named_together() {
        let warnings = detect_overlaps(
            &names(&["auth flow", "admin auth", "auth tokens"]),
            &default_vocabulary(),
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].features.len(), 3);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let warnings = detect_overlaps(
            &names(&["User Profile", "USER settings"]),
            &default_vocabulary(),
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].keyword, "user");
    }

    #[test]
    fn test_word_boundary_prevents_substring_hits() {
        // "username" contains "user" as a substring but not as a word
        let warnings = detect_overlaps(
            &names(&["username validation", "user dashboard"]),
            &default_vocabulary(),
        );
        assert!(warnings.iter().all(|w| w.keyword != "user"));
    }

    #[test]
    fn test_punctuation_stripped_at_boundaries() {
        let warnings = detect_overlaps(
            &names(&["login, remember-me", "social login"]),
            &default_vocabulary(),
        );
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_custom_vocabulary() {
        let vocab = vec!["sync".to_string()];
        let warnings = detect_overlaps(
            &names(&["calendar sync", "contact sync", "user login"]),
            &vocab,
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].keyword, "sync");
        assert_eq!(warnings[0].features.len(), 2);
    }

    #[test]
    fn test_empty_selection_is_quiet() {
        assert!(detect_overlaps(&[], &default_vocabulary()).is_empty());
    }
}
