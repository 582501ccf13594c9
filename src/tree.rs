//! Node tree representation and rendering.
//!
//! Provides the [`Node`] type produced by traversal, the display sort order
//! for siblings, and rendering with box-drawing characters.

use std::path::{Path, PathBuf};

/// The type of a filesystem node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    /// A file together with its decoded (or placeholder) content.
    File { content: String },
}

impl NodeKind {
    /// Check if this is a directory.
    pub fn is_directory(&self) -> bool {
        matches!(self, NodeKind::Directory)
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, NodeKind::File { .. })
    }
}

/// A node in the ingested tree.
///
/// Aggregates (`size`, `file_count`, `dir_count`) cover exactly the
/// descendants retained in `children`; `dir_count` excludes the node itself.
#[derive(Debug, Clone)]
pub struct Node {
    /// File or directory name (not full path).
    pub name: String,
    /// Path relative to the traversal root.
    pub path: PathBuf,
    /// Absolute location content is read from.
    pub abs_path: PathBuf,
    pub kind: NodeKind,
    pub size: u64,
    pub file_count: usize,
    pub dir_count: usize,
    /// Depth below the traversal root (root = 0).
    pub depth: usize,
    children: Vec<Node>,
}

impl Node {
    /// Create an empty directory node.
    pub fn directory(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        abs_path: impl Into<PathBuf>,
        depth: usize,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            abs_path: abs_path.into(),
            kind: NodeKind::Directory,
            size: 0,
            file_count: 0,
            dir_count: 0,
            depth,
            children: Vec::new(),
        }
    }

    /// Create a file node with its content already resolved.
    pub fn file(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        abs_path: impl Into<PathBuf>,
        size: u64,
        depth: usize,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            abs_path: abs_path.into(),
            kind: NodeKind::File {
                content: content.into(),
            },
            size,
            file_count: 1,
            dir_count: 0,
            depth,
            children: Vec::new(),
        }
    }

    /// Check if this is a directory.
    pub fn is_directory(&self) -> bool {
        self.kind.is_directory()
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Append a finished child and fold its aggregates into this node.
    pub fn add_child(&mut self, child: Node) {
        self.size += child.size;
        self.file_count += child.file_count;
        if child.is_directory() {
            self.dir_count += 1 + child.dir_count;
        }
        self.children.push(child);
    }

    /// Get child nodes.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// File content, `None` for directories.
    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::File { content } => Some(content),
            NodeKind::Directory => None,
        }
    }

    /// File extension as written, without the dot.
    pub fn extension(&self) -> Option<&str> {
        match self.kind {
            NodeKind::File { .. } => Path::new(&self.name).extension().and_then(|e| e.to_str()),
            NodeKind::Directory => None,
        }
    }

    /// Name as shown in the tree: directories get a trailing `/`.
    pub fn display_name(&self) -> String {
        if self.is_directory() {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }

    /// Relative path with `/` separators, stable across platforms.
    pub fn display_path(&self) -> String {
        self.path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn sort_rank(&self) -> u8 {
        let hidden = self.name.starts_with('.');
        match (&self.kind, hidden) {
            (NodeKind::File { .. }, _) if self.name.eq_ignore_ascii_case("readme.md") => 0,
            (NodeKind::File { .. }, false) => 1,
            (NodeKind::File { .. }, true) => 2,
            (NodeKind::Directory, false) => 3,
            (NodeKind::Directory, true) => 4,
        }
    }

    /// Sort this node's children into display order.
    ///
    /// README.md first, then files, hidden files, directories, hidden
    /// directories; case-insensitive by name within each group. Not
    /// recursive: each directory is sorted once when its subtree is done.
    pub fn sort_children(&mut self) {
        self.children
            .sort_by_cached_key(|c| (c.sort_rank(), c.name.to_lowercase(), c.name.clone()));
    }
}

/// Box-drawing characters for tree rendering.
const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const VERTICAL: &str = "│   ";
const SPACE: &str = "    ";

/// Render a tree with box-drawing characters.
///
/// The root is drawn as the last (only) entry of an invisible parent, so
/// every line carries a branch marker.
///
/// # Examples
///
/// ```
/// use treedigest::tree::{Node, render_tree};
///
/// let mut root = Node::directory("project", "", "/tmp/project", 0);
/// root.add_child(Node::file("main.rs", "main.rs", "/tmp/project/main.rs", 12, 1, "fn main() {}"));
/// root.sort_children();
///
/// assert_eq!(render_tree(&root), "└── project/\n    └── main.rs\n");
/// ```
pub fn render_tree(root: &Node) -> String {
    let mut output = String::with_capacity(4096);
    render_node(&mut output, root, "", true);
    output
}

fn render_node(output: &mut String, node: &Node, prefix: &str, is_last: bool) {
    output.push_str(prefix);
    output.push_str(if is_last { LAST_BRANCH } else { BRANCH });
    output.push_str(&node.display_name());
    output.push('\n');

    let child_prefix = format!("{}{}", prefix, if is_last { SPACE } else { VERTICAL });
    let child_count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        render_node(output, child, &child_prefix, i + 1 == child_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, size: u64) -> Node {
        Node::file(name, name, format!("/r/{name}"), size, 1, "x")
    }

    fn dir(name: &str) -> Node {
        Node::directory(name, name, format!("/r/{name}"), 1)
    }

    #[test]
    fn test_directory_node() {
        let node = dir("src");
        assert!(node.is_directory());
        assert!(!node.is_file());
        assert_eq!(node.display_name(), "src/");
        assert_eq!(node.content(), None);
    }

    #[test]
    fn test_file_node() {
        let node = file("main.rs", 1024);
        assert!(node.is_file());
        assert_eq!(node.extension(), Some("rs"));
        assert_eq!(node.file_count, 1);
        assert_eq!(node.dir_count, 0);
        assert_eq!(node.content(), Some("x"));
    }

    #[test]
    fn test_aggregates_fold_on_add() {
        let mut root = Node::directory("root", "", "/r", 0);
        root.add_child(file("a.rs", 100));

        let mut sub = dir("sub");
        sub.add_child(file("b.rs", 20));
        let mut inner = dir("inner");
        inner.add_child(file("c.rs", 3));
        sub.add_child(inner);
        root.add_child(sub);
        root.add_child(dir("empty"));

        assert_eq!(root.size, 123);
        assert_eq!(root.file_count, 3);
        assert_eq!(root.dir_count, 3);
        assert_eq!(root.children()[1].dir_count, 1);
    }

    #[test]
    fn test_sort_order() {
        let mut root = Node::directory("root", "", "/r", 0);
        root.add_child(dir(".git"));
        root.add_child(file(".env", 1));
        root.add_child(dir("src"));
        root.add_child(file("b.txt", 1));
        root.add_child(file("README.md", 1));
        root.sort_children();

        let names: Vec<_> = root.children().iter().map(Node::display_name).collect();
        assert_eq!(names, ["README.md", "b.txt", ".env", "src/", ".git/"]);
    }

    #[test]
    fn test_sort_case_insensitive() {
        let mut root = Node::directory("root", "", "/r", 0);
        root.add_child(file("beta.rs", 1));
        root.add_child(file("Alpha.rs", 1));
        root.add_child(file("alpha.rs", 1));
        root.sort_children();

        let names: Vec<_> = root.children().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Alpha.rs", "alpha.rs", "beta.rs"]);
    }

    #[test]
    fn test_display_path() {
        let node = Node::file("b.py", Path::new("sub").join("b.py"), "/r/sub/b.py", 1, 2, "");
        assert_eq!(node.display_path(), "sub/b.py");
    }

    #[test]
    fn test_render_nested() {
        let mut root = Node::directory("root", "", "/r", 0);
        let mut sub = dir("sub");
        sub.add_child(file("b.py", 1));
        sub.sort_children();
        root.add_child(sub);
        root.add_child(file("a.md", 1));
        root.add_child(file("c.md", 1));
        root.sort_children();

        let expected = "\
└── root/
    ├── a.md
    ├── c.md
    └── sub/
        └── b.py
";
        assert_eq!(render_tree(&root), expected);
    }

    #[test]
    fn test_render_vertical_continuation() {
        let mut root = Node::directory("root", "", "/r", 0);
        let mut first = dir("first");
        first.add_child(file("x.rs", 1));
        root.add_child(first);
        root.add_child(dir("second"));
        root.sort_children();

        let output = render_tree(&root);
        assert!(output.contains("    ├── first/\n    │   └── x.rs\n    └── second/\n"));
    }
}
