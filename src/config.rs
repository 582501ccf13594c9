//! Root-local configuration file.
//!
//! A directory being ingested may carry a `.gitingest` TOML file:
//!
//! ```toml
//! [config]
//! ignore_patterns = ["*.csv", "fixtures/"]
//! ```
//!
//! `ignore_patterns` may be a single string or a list. Problems with this
//! file are never fatal: a malformed document is ignored and bad entries are
//! dropped, each with a warning.

use std::path::Path;

use serde::Deserialize;

use crate::pattern::parse_pattern;

/// Name of the configuration file looked up at the traversal root.
pub const CONFIG_FILE_NAME: &str = ".gitingest";

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    config: Option<ConfigSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigSection {
    #[serde(default)]
    ignore_patterns: Option<toml::Value>,
}

/// Read extra ignore patterns from `<root>/.gitingest`.
///
/// Returns an empty list when the file is absent or unusable.
pub fn load_ignore_patterns(root: &Path) -> Vec<String> {
    let path = root.join(CONFIG_FILE_NAME);
    if !path.is_file() {
        return Vec::new();
    }

    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "cannot read config file, ignoring it"
            );
            return Vec::new();
        }
    };

    parse_ignore_patterns(&text, &path)
}

fn parse_ignore_patterns(text: &str, path: &Path) -> Vec<String> {
    let parsed: ConfigFile = match toml::from_str(text) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "malformed config file, ignoring it"
            );
            return Vec::new();
        }
    };

    let Some(value) = parsed.config.and_then(|c| c.ignore_patterns) else {
        return Vec::new();
    };

    let entries = match value {
        toml::Value::String(s) => vec![toml::Value::String(s)],
        toml::Value::Array(items) => items,
        other => {
            tracing::warn!(
                path = %path.display(),
                found = other.type_str(),
                "config.ignore_patterns must be a string or a list of strings, ignoring it"
            );
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .filter_map(|entry| match entry {
            toml::Value::String(raw) => match parse_pattern(&raw) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "dropping ignore pattern");
                    None
                }
            },
            other => {
                tracing::warn!(
                    path = %path.display(),
                    found = other.type_str(),
                    "dropping non-string ignore pattern"
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(text: &str) -> Vec<String> {
        parse_ignore_patterns(text, Path::new(".gitingest"))
    }

    #[test]
    fn test_list_of_patterns() {
        let patterns = parse("[config]\nignore_patterns = [\"*.csv\", \"/fixtures/\"]\n");
        assert_eq!(patterns, vec!["*.csv".to_string(), "fixtures".to_string()]);
    }

    #[test]
    fn test_single_string_pattern() {
        assert_eq!(parse("[config]\nignore_patterns = \"*.bin\"\n"), vec!["*.bin".to_string()]);
    }

    #[test]
    fn test_non_string_entries_dropped() {
        let patterns = parse("[config]\nignore_patterns = [\"*.csv\", 42, true]\n");
        assert_eq!(patterns, vec!["*.csv".to_string()]);
    }

    #[test]
    fn test_wrong_type_ignored() {
        assert!(parse("[config]\nignore_patterns = 7\n").is_empty());
    }

    #[test]
    fn test_malformed_document_ignored() {
        assert!(parse("[config\nignore_patterns = ").is_empty());
        assert!(parse("config = 3\n").is_empty());
    }

    #[test]
    fn test_invalid_pattern_dropped() {
        assert_eq!(
            parse("[config]\nignore_patterns = [\"a b\", \"ok\"]\n"),
            vec!["ok".to_string()]
        );
    }

    #[test]
    fn test_missing_section() {
        assert!(parse("[other]\nkey = 1\n").is_empty());
    }

    #[test]
    fn test_load_from_root() {
        let dir = TempDir::new().unwrap();
        assert!(load_ignore_patterns(dir.path()).is_empty());

        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[config]\nignore_patterns = [\"secret.txt\"]\n",
        )
        .unwrap();
        assert_eq!(load_ignore_patterns(dir.path()), vec!["secret.txt".to_string()]);
    }
}
