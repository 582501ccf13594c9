//! Digest formatting.
//!
//! Turns a finished [`Node`] tree and its [`Query`] into the three-part
//! digest: a short summary, an ASCII directory tree, and the concatenated
//! file contents.

use serde::Serialize;

use crate::query::Query;
use crate::tokens::{estimate_tokens_joined, format_token_count};
use crate::tree::{render_tree, Node, NodeKind};

/// Rule printed above and below each file heading.
pub const SEPARATOR: &str = "================================================";

/// Branch names that are not worth mentioning in the summary.
const DEFAULT_BRANCHES: &[&str] = &["main", "master"];

/// The rendered digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Digest {
    pub summary: String,
    pub tree: String,
    pub content: String,
}

impl Digest {
    /// Tree followed by content, the form written to digest files.
    pub fn to_text(&self) -> String {
        format!("{}\n{}", self.tree, self.content)
    }

    /// Estimated token count of the tree and content.
    pub fn estimated_tokens(&self) -> usize {
        estimate_tokens_joined(&[self.tree.as_str(), self.content.as_str()])
    }
}

/// Format a complete digest.
pub fn format_digest(root: &Node, query: &Query) -> Digest {
    let tree = format_tree(root);
    let content = format_content(root);
    let summary = format_summary(root, query, &tree, &content);
    Digest {
        summary,
        tree,
        content,
    }
}

/// Summary block: identity, revision, scope and size.
pub fn format_summary(root: &Node, query: &Query, tree: &str, content: &str) -> String {
    let mut lines = Vec::new();

    match query.repository() {
        Some(repo) => lines.push(format!("Repository: {repo}")),
        None => lines.push(format!("Directory: {}", query.slug)),
    }

    if let Some(commit) = &query.commit {
        lines.push(format!("Commit: {commit}"));
    } else if let Some(branch) = query
        .branch
        .as_deref()
        .filter(|b| !DEFAULT_BRANCHES.contains(b))
    {
        lines.push(format!("Branch: {branch}"));
    }

    match &root.kind {
        NodeKind::Directory => {
            if query.subpath != "/" {
                lines.push(format!("Subpath: {}", query.subpath));
            }
            lines.push(format!("Files analyzed: {}", root.file_count));
        }
        NodeKind::File { content } => {
            lines.push(format!("File: {}", root.name));
            lines.push(format!("Lines: {}", count_lines(content)));
        }
    }

    let mut summary = lines.join("\n");
    summary.push('\n');

    if !tree.is_empty() || !content.is_empty() {
        let tokens = estimate_tokens_joined(&[tree, content]);
        summary.push_str(&format!("\nEstimated tokens: {}", format_token_count(tokens)));
    }
    summary
}

/// Tree block with its heading.
pub fn format_tree(root: &Node) -> String {
    format!("Directory structure:\n{}", render_tree(root))
}

/// Concatenated file blocks in depth-first display order.
pub fn format_content(root: &Node) -> String {
    let mut output = String::with_capacity(8192);
    push_content(&mut output, root);
    output
}

fn push_content(output: &mut String, node: &Node) {
    match &node.kind {
        NodeKind::Directory => {
            for child in node.children() {
                push_content(output, child);
            }
        }
        NodeKind::File { content } => push_file_block(output, node, content),
    }
}

fn push_file_block(output: &mut String, node: &Node, content: &str) {
    let fence = "`".repeat(longest_backtick_run(content).max(2) + 1);

    output.push_str(SEPARATOR);
    output.push_str("\nFILE: ");
    output.push_str(&node.display_path());
    output.push('\n');
    output.push_str(SEPARATOR);
    output.push('\n');

    output.push_str(&fence);
    output.push_str(node.extension().unwrap_or_default());
    output.push('\n');
    output.push_str(content);
    if !content.is_empty() && !content.ends_with('\n') {
        output.push('\n');
    }
    output.push_str(&fence);
    output.push_str("\n\n");
}

fn longest_backtick_run(text: &str) -> usize {
    text.split(|c| c != '`').map(str::len).max().unwrap_or(0)
}

/// Number of lines, counting a final unterminated line.
fn count_lines(text: &str) -> usize {
    let newlines = bytecount::count(text.as_bytes(), b'\n');
    if text.is_empty() || text.ends_with('\n') {
        newlines
    } else {
        newlines + 1
    }
}
