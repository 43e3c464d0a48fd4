//! Package-pattern matching in the language's native `list` notation.
//!
//! A pattern is an exact import path, a `prefix/...` form meaning "the
//! package and all its descendants", or one of the bare forms `...` and
//! `./...` meaning "all packages". The same rules serve both pattern
//! resolution in the loader and the `-exclude` option.

/// Whether `path` matches a single pattern.
pub fn match_pattern(pattern: &str, path: &str) -> bool {
    if pattern == "./..." || pattern == "..." {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix("/...") {
        return path == prefix || path.starts_with(&format!("{prefix}/"));
    }
    pattern == path
}

/// Whether `path` matches any of the given patterns.
pub fn match_any(patterns: &[String], path: &str) -> bool {
    patterns.iter().any(|p| match_pattern(p, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_forms_match_everything() {
        assert!(match_pattern("./...", "example.com/app"));
        assert!(match_pattern("...", "anything/at/all"));
    }

    #[test]
    fn test_subtree() {
        assert!(match_pattern("example.com/app/...", "example.com/app"));
        assert!(match_pattern("example.com/app/...", "example.com/app/lib"));
        assert!(!match_pattern("example.com/app/...", "example.com/apple"));
    }

    #[test]
    fn test_exact() {
        assert!(match_pattern("example.com/app", "example.com/app"));
        assert!(!match_pattern("example.com/app", "example.com/app/lib"));
    }

    #[test]
    fn test_match_any() {
        let patterns = vec!["a/...".to_string(), "b".to_string()];
        assert!(match_any(&patterns, "a/x"));
        assert!(match_any(&patterns, "b"));
        assert!(!match_any(&patterns, "c"));
    }
}
