//! Query construction.
//!
//! A [`Query`] is the read-only description of what to ingest: where, under
//! which filters, and within which budgets. It is built with
//! [`QueryBuilder`], which validates patterns and applies the
//! exclude/include merge policy up front so traversal never sees an invalid
//! pattern.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use serde::Serialize;

use crate::pattern::{default_ignore_patterns, parse_pattern, PatternError};

/// Default per-file size ceiling (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
/// Default maximum directory depth below the root.
pub const DEFAULT_MAX_DEPTH: usize = 20;
/// Default maximum number of files admitted into one digest.
pub const DEFAULT_MAX_FILES: usize = 10_000;
/// Default ceiling on the summed size of admitted files (500 MiB).
pub const DEFAULT_MAX_TOTAL_SIZE: u64 = 500 * 1024 * 1024;

/// Traversal-wide budgets.
///
/// Passed explicitly with each query so concurrent ingestions can run with
/// different ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Limits {
    pub max_depth: usize,
    pub max_files: usize,
    pub max_total_size: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_files: DEFAULT_MAX_FILES,
            max_total_size: DEFAULT_MAX_TOTAL_SIZE,
        }
    }
}

/// Whether the query targets a single file or a directory tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    File,
    #[default]
    Tree,
}

/// Resolved description of one ingestion.
#[derive(Debug, Clone)]
pub struct Query {
    /// Local location the subpath is resolved against.
    pub local_path: PathBuf,
    /// Subpath below `local_path`; `/` means the whole location.
    pub subpath: String,
    pub resource: ResourceType,
    pub max_file_size: u64,
    /// Effective exclude set (defaults merged, re-included patterns removed).
    pub exclude: BTreeSet<String>,
    /// Include set; empty means "everything not excluded".
    pub include: BTreeSet<String>,
    pub limits: Limits,
    /// Display name for local roots.
    pub slug: String,
    pub user_name: Option<String>,
    pub repo_name: Option<String>,
    pub branch: Option<String>,
    pub commit: Option<String>,
    /// Checked once per directory entry; set it to abandon the ingestion.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Query {
    /// Start building a query for a local path.
    pub fn builder(local_path: impl Into<PathBuf>) -> QueryBuilder {
        QueryBuilder::new(local_path)
    }

    /// The path traversal starts from: `local_path` joined with the subpath.
    pub fn root_path(&self) -> PathBuf {
        let sub = self.subpath.trim_matches('/');
        if sub.is_empty() {
            self.local_path.clone()
        } else {
            self.local_path.join(sub)
        }
    }

    /// `owner/repo` when both identity fields are known.
    pub fn repository(&self) -> Option<String> {
        match (&self.user_name, &self.repo_name) {
            (Some(user), Some(repo)) => Some(format!("{user}/{repo}")),
            _ => None,
        }
    }
}

/// Builder for [`Query`].
///
/// # Examples
///
/// ```no_run
/// use treedigest::query::Query;
///
/// let query = Query::builder("./project")
///     .exclude(["*.log"])
///     .include(["src/*"])
///     .build()
///     .unwrap();
/// assert!(!query.exclude.contains("src/*"));
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    local_path: PathBuf,
    subpath: String,
    resource: Option<ResourceType>,
    max_file_size: u64,
    exclude: Vec<String>,
    include: Vec<String>,
    use_default_excludes: bool,
    limits: Limits,
    slug: Option<String>,
    user_name: Option<String>,
    repo_name: Option<String>,
    branch: Option<String>,
    commit: Option<String>,
    cancel: Option<Arc<AtomicBool>>,
}

impl QueryBuilder {
    pub fn new(local_path: impl Into<PathBuf>) -> Self {
        Self {
            local_path: local_path.into(),
            subpath: "/".to_string(),
            resource: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            exclude: Vec::new(),
            include: Vec::new(),
            use_default_excludes: true,
            limits: Limits::default(),
            slug: None,
            user_name: None,
            repo_name: None,
            branch: None,
            commit: None,
            cancel: None,
        }
    }

    /// Restrict ingestion to a subpath of the local path.
    pub fn subpath(mut self, subpath: impl Into<String>) -> Self {
        let sub = subpath.into();
        self.subpath = format!("/{}", sub.trim_matches('/'));
        self
    }

    /// Force the resource type instead of inferring it from the filesystem.
    pub fn resource(mut self, resource: ResourceType) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Add exclude patterns on top of the defaults.
    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Add include patterns. A pattern textually equal to an exclude pattern
    /// removes it from the effective exclude set.
    pub fn include<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Start from an empty exclude set instead of the built-in defaults.
    pub fn default_excludes(mut self, enabled: bool) -> Self {
        self.use_default_excludes = enabled;
        self
    }

    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// Identify the ingested location as `owner/repo`.
    pub fn repository(mut self, user: impl Into<String>, repo: impl Into<String>) -> Self {
        self.user_name = Some(user.into());
        self.repo_name = Some(repo.into());
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = Some(commit.into());
        self
    }

    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Validate patterns and produce the query.
    pub fn build(self) -> Result<Query, PatternError> {
        let include = self
            .include
            .iter()
            .map(|p| parse_pattern(p))
            .collect::<Result<BTreeSet<_>, _>>()?;

        let mut exclude = if self.use_default_excludes {
            default_ignore_patterns()
        } else {
            BTreeSet::new()
        };
        for raw in &self.exclude {
            exclude.insert(parse_pattern(raw)?);
        }
        // Literal removal only; glob-equivalent spellings are not reconciled.
        exclude.retain(|p| !include.contains(p));

        let resource = self.resource.unwrap_or_else(|| {
            if self.local_path.is_file() {
                ResourceType::File
            } else {
                ResourceType::Tree
            }
        });

        let slug = self.slug.unwrap_or_else(|| default_slug(&self.local_path));

        Ok(Query {
            local_path: self.local_path,
            subpath: self.subpath,
            resource,
            max_file_size: self.max_file_size,
            exclude,
            include,
            limits: self.limits,
            slug,
            user_name: self.user_name,
            repo_name: self.repo_name,
            branch: self.branch,
            commit: self.commit,
            cancel: self.cancel,
        })
    }
}

/// Derive a display slug from the last component of a path, resolving `.`
/// and similar through the filesystem when possible.
fn default_slug(path: &std::path::Path) -> String {
    let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| resolved.to_string_lossy().into_owned())
}
