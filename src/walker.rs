//! Directory traversal.
//!
//! Walks a directory depth-first in filesystem order and builds a [`Node`]
//! tree, applying pattern filters and budgets as it goes. Each call owns its
//! own traversal state (visited set and running counters), so concurrent
//! ingestions never share budgets.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::decode;
use crate::notebook::NotebookError;
use crate::pattern::{is_excluded, is_included, PatternSet};
use crate::query::{Limits, Query, DEFAULT_MAX_FILE_SIZE};
use crate::tree::Node;

/// Errors that abort a traversal.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("not a file: {path}")]
    NotAFile { path: PathBuf },

    #[error("not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("file has no content: {path}")]
    EmptyResource { path: PathBuf },

    #[error("unsupported entry kind (neither file nor directory): {path}")]
    UnsupportedEntryKind { path: PathBuf },

    #[error("cannot transcode notebook {path}: {source}")]
    Notebook {
        path: PathBuf,
        #[source]
        source: NotebookError,
    },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ingestion cancelled")]
    Cancelled,
}

impl WalkError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            WalkError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            WalkError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    fn notebook(path: &Path, source: NotebookError) -> Self {
        WalkError::Notebook {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Options for one traversal.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub limits: Limits,
    /// Files larger than this are skipped without being counted.
    pub max_file_size: u64,
    pub exclude: PatternSet,
    /// Empty means every non-excluded file is admitted.
    pub include: PatternSet,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            exclude: PatternSet::default(),
            include: PatternSet::default(),
            cancel: None,
        }
    }
}

impl WalkOptions {
    /// Derive options from a query, adding extra exclude patterns (for
    /// example from a root-local config file).
    pub fn from_query(query: &Query, extra_excludes: &[String]) -> Self {
        Self {
            limits: query.limits,
            max_file_size: query.max_file_size,
            exclude: PatternSet::new(query.exclude.iter().chain(extra_excludes)),
            include: PatternSet::new(&query.include),
            cancel: query.cancel.clone(),
        }
    }
}

/// Build a node for a single file.
///
/// Fails if the path is missing, is not a regular file, decodes to empty
/// content, or is a notebook with an unknown cell or output type.
pub fn build_file_node(path: &Path) -> Result<Node, WalkError> {
    let metadata = fs::metadata(path).map_err(|e| WalkError::io(path, e))?;
    if !metadata.is_file() {
        return Err(WalkError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    let name = file_name(path);
    let content = decode::read_content(path).map_err(|e| WalkError::notebook(path, e))?;
    if content.is_empty() {
        return Err(WalkError::EmptyResource {
            path: path.to_path_buf(),
        });
    }

    let abs_path = path.canonicalize().map_err(|e| WalkError::io(path, e))?;
    Ok(Node::file(&name, &name, abs_path, metadata.len(), 0, content))
}

/// Build the complete tree below a directory.
///
/// # Examples
///
/// ```no_run
/// use treedigest::walker::{build_tree, WalkOptions};
/// use std::path::Path;
///
/// let tree = build_tree(Path::new("./project"), &WalkOptions::default()).unwrap();
/// println!("Files: {}", tree.file_count);
/// ```
pub fn build_tree(root: &Path, options: &WalkOptions) -> Result<Node, WalkError> {
    let canonical_root = root.canonicalize().map_err(|e| WalkError::io(root, e))?;
    if !canonical_root.is_dir() {
        return Err(WalkError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let mut traversal = Traversal {
        options,
        root: canonical_root.clone(),
        visited: HashSet::from([canonical_root.clone()]),
        file_count: 0,
        total_size: 0,
    };

    let name = file_name(&canonical_root);
    let root_node = Node::directory(name, PathBuf::new(), canonical_root, 0);
    let tree = traversal.walk_directory(root_node)?;

    tracing::debug!(
        files = traversal.file_count,
        bytes = traversal.total_size,
        dirs = tree.dir_count,
        "traversal finished"
    );
    Ok(tree)
}

fn file_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.to_string_lossy().into_owned(),
        |n| n.to_string_lossy().into_owned(),
    )
}

/// Per-call traversal state.
struct Traversal<'a> {
    options: &'a WalkOptions,
    /// Canonical traversal root; symlink targets must stay inside it.
    root: PathBuf,
    /// Canonical paths already seen. Guards against symlink cycles and aliases.
    visited: HashSet<PathBuf>,
    file_count: usize,
    total_size: u64,
}

impl Traversal<'_> {
    fn budget_exhausted(&self, depth: usize) -> bool {
        let limits = &self.options.limits;
        depth > limits.max_depth
            || self.file_count >= limits.max_files
            || self.total_size >= limits.max_total_size
    }

    fn check_cancelled(&self) -> Result<(), WalkError> {
        match &self.options.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(WalkError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Pattern filters, evaluated on the entry's location relative to the root.
    ///
    /// Directories are not subject to the include set: they are walked and
    /// dropped afterwards if nothing inside them was included.
    fn admits(&self, rel: &Path) -> bool {
        let path = self.root.join(rel);
        if is_excluded(&path, &self.root, &self.options.exclude) {
            return false;
        }
        if self.options.include.is_empty() || path.is_dir() {
            return true;
        }
        is_included(&path, &self.root, &self.options.include)
    }

    fn walk_directory(&mut self, mut node: Node) -> Result<Node, WalkError> {
        if self.budget_exhausted(node.depth) {
            tracing::debug!(
                path = %node.path.display(),
                depth = node.depth,
                "budget exhausted, not descending"
            );
            return Ok(node);
        }

        let entries = fs::read_dir(&node.abs_path).map_err(|e| WalkError::io(&node.abs_path, e))?;
        for entry in entries {
            self.check_cancelled()?;
            let entry = entry.map_err(|e| WalkError::io(&node.abs_path, e))?;
            let entry_path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let rel = node.path.join(&name);

            let is_symlink = entry
                .file_type()
                .map_err(|e| WalkError::io(&entry_path, e))?
                .is_symlink();

            let real = match entry_path.canonicalize() {
                Ok(real) => real,
                Err(e) if is_symlink => {
                    tracing::warn!(
                        path = %entry_path.display(),
                        error = %e,
                        "skipping broken symlink"
                    );
                    continue;
                }
                Err(e) => return Err(WalkError::io(&entry_path, e)),
            };

            if is_symlink && !real.starts_with(&self.root) {
                tracing::warn!(
                    path = %entry_path.display(),
                    target = %real.display(),
                    "skipping symlink pointing outside the root"
                );
                continue;
            }

            if !self.visited.insert(real.clone()) {
                tracing::debug!(path = %entry_path.display(), "already visited, skipping");
                continue;
            }

            if !self.admits(&rel) {
                tracing::debug!(path = %rel.display(), "filtered out by patterns");
                continue;
            }

            let metadata = fs::metadata(&real).map_err(|e| WalkError::io(&real, e))?;
            let depth = node.depth + 1;

            if metadata.is_file() {
                if let Some(child) = self.admit_file(name, rel, real, metadata.len(), depth)? {
                    node.add_child(child);
                }
            } else if metadata.is_dir() {
                let child = self.walk_directory(Node::directory(name, rel, real, depth))?;
                if self.options.include.is_empty() || child.file_count > 0 {
                    node.add_child(child);
                }
            } else {
                return Err(WalkError::UnsupportedEntryKind { path: entry_path });
            }
        }

        node.sort_children();
        Ok(node)
    }

    /// Admit a file if it fits every budget, then read its content.
    ///
    /// All checks run before counting, so a rejected file never consumes
    /// budget and a later, smaller file may still be admitted.
    fn admit_file(
        &mut self,
        name: String,
        rel: PathBuf,
        real: PathBuf,
        size: u64,
        depth: usize,
    ) -> Result<Option<Node>, WalkError> {
        let limits = &self.options.limits;
        if size > self.options.max_file_size {
            tracing::debug!(path = %rel.display(), size, "file exceeds per-file size limit");
            return Ok(None);
        }
        if self.file_count >= limits.max_files {
            tracing::debug!(path = %rel.display(), "file count limit reached");
            return Ok(None);
        }
        if self.total_size + size > limits.max_total_size {
            tracing::debug!(path = %rel.display(), size, "file would exceed total size limit");
            return Ok(None);
        }

        self.file_count += 1;
        self.total_size += size;
        let content = decode::read_content(&real).map_err(|e| WalkError::notebook(&real, e))?;
        Ok(Some(Node::file(name, rel, real, size, depth, content)))
    }
}
