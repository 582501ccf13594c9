//! Ingestion entry points.
//!
//! Function-style API tying the pieces together: resolve the root, load the
//! root-local config, traverse, then format.

use std::path::Path;

use crate::config;
use crate::errors::IngestError;
use crate::output::{format_digest, Digest};
use crate::query::{Query, ResourceType};
use crate::tree::Node;
use crate::walker::{build_file_node, build_tree, WalkOptions};

/// Ingest the location described by `query` into a digest.
///
/// # Examples
///
/// ```no_run
/// use treedigest::ingest::ingest;
/// use treedigest::query::Query;
///
/// let query = Query::builder("./project").exclude(["*.csv"]).build().unwrap();
/// let digest = ingest(&query).unwrap();
/// println!("{}", digest.summary);
/// ```
pub fn ingest(query: &Query) -> Result<Digest, IngestError> {
    let root = query.root_path();
    tracing::info!(root = %root.display(), "ingesting");

    let tree = ingest_tree(query, &root)?;
    let digest = format_digest(&tree, query);

    tracing::info!(
        files = tree.file_count,
        bytes = tree.size,
        tokens = digest.estimated_tokens(),
        "digest ready"
    );
    Ok(digest)
}

/// Build the node tree for `root` under the query's filters and budgets.
///
/// A single file yields one file node; a directory is traversed after
/// merging the patterns from its `.gitingest` file into the exclude set.
pub fn ingest_tree(query: &Query, root: &Path) -> Result<Node, IngestError> {
    if query.resource == ResourceType::File || root.is_file() {
        return Ok(build_file_node(root)?);
    }

    let extra_excludes = config::load_ignore_patterns(root);
    if !extra_excludes.is_empty() {
        tracing::debug!(patterns = ?extra_excludes, "merged ignore patterns from config file");
    }
    let options = WalkOptions::from_query(query, &extra_excludes);
    Ok(build_tree(root, &options)?)
}

/// Ingest a local path with default filters and budgets.
pub fn ingest_path(path: impl AsRef<Path>) -> Result<Digest, IngestError> {
    let query = Query::builder(path.as_ref()).build()?;
    ingest(&query)
}
