//! Include/exclude pattern matching.
//!
//! Patterns are shell-style globs evaluated against paths relative to the
//! traversal root. Matching is anchored (the whole relative path must match)
//! and `*` crosses path separators, so `*.py` matches `src/app/main.py`.

use std::collections::BTreeSet;
use std::path::{Component, Path};

use glob::{MatchOptions, Pattern};
use thiserror::Error;

/// Errors raised while validating user-supplied patterns.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("invalid pattern {pattern:?}: only alphanumerics and `- _ . / + * @` are allowed")]
    InvalidPattern { pattern: String },
}

/// Patterns excluded from every ingestion unless explicitly re-included.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    // Python
    "*.pyc",
    "*.pyo",
    "*.pyd",
    "__pycache__",
    ".pytest_cache",
    ".coverage",
    ".tox",
    ".nox",
    ".mypy_cache",
    ".ruff_cache",
    ".hypothesis",
    "poetry.lock",
    "Pipfile.lock",
    // JavaScript / Node
    "node_modules",
    "bower_components",
    "package-lock.json",
    "yarn.lock",
    ".npm",
    ".yarn",
    ".pnpm-store",
    "bun.lock",
    "bun.lockb",
    // Java / JVM
    "*.class",
    "*.jar",
    "*.war",
    "*.ear",
    "*.nar",
    ".gradle",
    "gradle-app.setting",
    // C / C++
    "*.o",
    "*.obj",
    "*.dll",
    "*.dylib",
    "*.exe",
    "*.lib",
    "*.out",
    "*.a",
    "*.pdb",
    // Swift / Xcode
    ".build",
    "*.xcodeproj",
    "*.xcworkspace",
    "*.pbxuser",
    "*.xcuserstate",
    "xcuserdata",
    ".swiftpm",
    // Ruby
    "*.gem",
    ".bundle",
    "vendor/bundle",
    "Gemfile.lock",
    ".ruby-version",
    ".ruby-gemset",
    ".rvmrc",
    // Rust
    "Cargo.lock",
    "*.rs.bk",
    // .NET
    "*.suo",
    "*.user",
    "*.nupkg",
    // Version control
    ".git",
    ".svn",
    ".hg",
    ".gitignore",
    ".gitattributes",
    ".gitmodules",
    // Media and documents
    "*.svg",
    "*.png",
    "*.jpg",
    "*.jpeg",
    "*.gif",
    "*.ico",
    "*.pdf",
    "*.mov",
    "*.mp4",
    "*.mp3",
    "*.wav",
    // Virtual environments
    "venv",
    ".venv",
    "env",
    ".env",
    "virtualenv",
    // IDE and editor metadata
    ".idea",
    ".vscode",
    ".vs",
    "*.swo",
    "*.swn",
    ".settings",
    ".project",
    ".classpath",
    "*.sublime-*",
    // Temporary and cache files
    "*.log",
    "*.bak",
    "*.swp",
    "*.tmp",
    "*.temp",
    ".cache",
    ".sass-cache",
    ".eslintcache",
    ".DS_Store",
    "Thumbs.db",
    "desktop.ini",
    // Build output
    "build",
    "dist",
    "target",
    "out",
    "*.egg-info",
    "*.egg",
    "*.whl",
    "*.so",
    "site-packages",
    ".docusaurus",
    ".next",
    ".nuxt",
    // Minified and generated assets
    "*.min.js",
    "*.min.css",
    "*.map",
    ".terraform",
    "*.tfstate*",
    "vendor",
    // Our own default output
    "digest.txt",
];

/// The built-in exclude set as owned strings.
pub fn default_ignore_patterns() -> BTreeSet<String> {
    DEFAULT_IGNORE_PATTERNS.iter().map(|p| p.to_string()).collect()
}

/// Strip leading/trailing path separators and collapse runs of `*`.
///
/// `*` already matches across separators, so `**` adds nothing and is
/// rejected by the glob compiler when it is not a whole path component.
pub fn normalize(pattern: &str) -> String {
    let trimmed = pattern.trim_matches(|c| c == '/' || c == '\\');
    let mut out = String::with_capacity(trimmed.len());
    let mut prev_star = false;
    for c in trimmed.chars() {
        if c == '*' && prev_star {
            continue;
        }
        prev_star = c == '*';
        out.push(c);
    }
    out
}

/// Reject patterns containing characters outside the allowed set.
pub fn validate(pattern: &str) -> Result<(), PatternError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || "-_./+*@".contains(c);
    if pattern.is_empty() || !pattern.chars().all(allowed) {
        return Err(PatternError::InvalidPattern {
            pattern: pattern.to_string(),
        });
    }
    Ok(())
}

/// Normalize then validate a caller-supplied pattern.
pub fn parse_pattern(raw: &str) -> Result<String, PatternError> {
    let pattern = normalize(raw);
    validate(&pattern).map_err(|_| PatternError::InvalidPattern {
        pattern: raw.to_string(),
    })?;
    Ok(pattern)
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// A compiled set of glob patterns.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Compile a set of pattern strings. Patterns the glob compiler rejects
    /// are dropped with a warning.
    pub fn new<'a>(patterns: impl IntoIterator<Item = &'a String>) -> Self {
        let patterns = patterns
            .into_iter()
            .filter_map(|raw| match Pattern::new(&normalize(raw)) {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!(pattern = %raw, error = %e, "dropping uncompilable pattern");
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True if any pattern matches the relative path string.
    pub fn matches(&self, relative: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_with(relative, MATCH_OPTIONS))
    }
}

/// Compute `path` relative to `root` as a `/`-separated string.
///
/// Returns `None` when the path escapes the root, either because it does not
/// live under it or because it climbs out through `..`.
pub fn relative_path(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy()),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts.join("/"))
}

/// Whether `path` is excluded by any pattern in `exclude`.
///
/// Paths escaping `root` are always excluded. Directories are also tested
/// with a trailing `/` so patterns like `vendor/` apply to them.
pub fn is_excluded(path: &Path, root: &Path, exclude: &PatternSet) -> bool {
    let Some(rel) = relative_path(path, root) else {
        return true;
    };
    if exclude.matches(&rel) {
        return true;
    }
    path.is_dir() && exclude.matches(&format!("{rel}/"))
}

/// Whether `path` is admitted by at least one pattern in `include`.
///
/// Paths escaping `root` are never included.
pub fn is_included(path: &Path, root: &Path, include: &PatternSet) -> bool {
    match relative_path(path, root) {
        Some(rel) => include.matches(&rel),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn set(patterns: &[&str]) -> PatternSet {
        let owned: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        PatternSet::new(&owned)
    }

    #[test]
    fn test_normalize_strips_separators() {
        assert_eq!(normalize("/src/"), "src");
        assert_eq!(normalize("docs/*.md"), "docs/*.md");
        assert_eq!(normalize("**/*.rs"), "*/*.rs");
    }

    #[test]
    fn test_validate() {
        assert!(validate("src/*.py").is_ok());
        assert!(validate("@scope/pkg+extra_1-2").is_ok());
        assert!(validate("a b").is_err());
        assert!(validate("src/[ab].py").is_err());
        assert!(validate("").is_err());
    }

    #[test]
    fn test_parse_pattern_reports_raw_input() {
        let err = parse_pattern("/bad pattern/").unwrap_err();
        assert_eq!(
            err,
            PatternError::InvalidPattern {
                pattern: "/bad pattern/".into()
            }
        );
        assert_eq!(parse_pattern("/build/").unwrap(), "build");
    }

    #[test]
    fn test_star_crosses_separators() {
        let s = set(&["*.py"]);
        assert!(s.matches("main.py"));
        assert!(s.matches("src/app/main.py"));
        assert!(!s.matches("main.pyc"));
    }

    #[test]
    fn test_matching_is_anchored() {
        let s = set(&["build"]);
        assert!(s.matches("build"));
        assert!(!s.matches("src/build"));
        assert!(!s.matches("builder"));
    }

    #[test]
    fn test_question_mark() {
        let s = set(&["file?.txt"]);
        assert!(s.matches("file1.txt"));
        assert!(!s.matches("file12.txt"));
    }

    #[test]
    fn test_relative_path_escape() {
        let root = Path::new("/repo");
        assert_eq!(relative_path(Path::new("/repo/a/b.rs"), root).as_deref(), Some("a/b.rs"));
        assert_eq!(relative_path(Path::new("/other/b.rs"), root), None);
        assert_eq!(relative_path(Path::new("/repo/../etc/passwd"), root), None);
    }

    #[test]
    fn test_is_excluded_directory_trailing_separator() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("vendor")).unwrap();
        fs::write(dir.path().join("vendor.txt"), "x").unwrap();

        let s = set(&["vendor/"]);
        assert!(is_excluded(&dir.path().join("vendor"), dir.path(), &s));
        assert!(!is_excluded(&dir.path().join("vendor.txt"), dir.path(), &s));
    }

    #[test]
    fn test_escaping_path_is_excluded_and_not_included() {
        let root = Path::new("/repo");
        let outside = Path::new("/elsewhere/file.rs");
        assert!(is_excluded(outside, root, &PatternSet::default()));
        assert!(!is_included(outside, root, &set(&["*"])));
    }

    #[test]
    fn test_is_included() {
        let root = Path::new("/repo");
        let s = set(&["src/*.rs"]);
        assert!(is_included(Path::new("/repo/src/lib.rs"), root, &s));
        assert!(!is_included(Path::new("/repo/README.md"), root, &s));
    }

    #[test]
    fn test_defaults_are_valid() {
        for pattern in DEFAULT_IGNORE_PATTERNS {
            assert!(validate(pattern).is_ok(), "{pattern}");
        }
        assert_eq!(
            PatternSet::new(&default_ignore_patterns()).len(),
            DEFAULT_IGNORE_PATTERNS.len()
        );
    }
}
