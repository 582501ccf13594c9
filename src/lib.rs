//! Treedigest - turn a directory or file into a text digest for LLMs.
//!
//! Treedigest walks a local directory (or reads a single file), filters
//! entries with glob patterns, enforces size and count budgets, and renders
//! a deterministic three-part digest: a summary, an ASCII directory tree,
//! and the concatenated file contents.
//!
//! # Quick Start
//!
//! ```no_run
//! use treedigest::{ingest, Query};
//!
//! let query = Query::builder("./my-project")
//!     .exclude(["*.csv"])
//!     .build()
//!     .unwrap();
//!
//! let digest = ingest(&query).unwrap();
//! println!("{}", digest.summary);
//! println!("{}", digest.to_text());
//! ```
//!
//! # Modules
//!
//! - [`pattern`] - Pattern normalization, validation and matching
//! - [`query`] - Query construction and budgets
//! - [`config`] - Root-local `.gitingest` file
//! - [`decode`] - Binary detection and text decoding
//! - [`notebook`] - Jupyter notebook transcoding
//! - [`tree`] - Node tree and tree rendering
//! - [`walker`] - Bounded directory traversal
//! - [`tokens`] - Token estimation
//! - [`output`] - Digest formatting
//! - [`ingest`] - Entry points

pub mod config;
pub mod decode;
pub mod errors;
pub mod ingest;
pub mod notebook;
pub mod output;
pub mod pattern;
pub mod query;
pub mod tokens;
pub mod tree;
pub mod walker;

// Re-export key types at crate root for convenience
pub use errors::IngestError;
pub use ingest::{ingest, ingest_path, ingest_tree};
pub use notebook::NotebookError;
pub use output::Digest;
pub use pattern::PatternError;
pub use query::{Limits, Query, QueryBuilder, ResourceType};
pub use tree::{Node, NodeKind};
pub use walker::{WalkError, WalkOptions};
