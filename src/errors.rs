//! Error types for treedigest.

use crate::pattern::PatternError;
use crate::walker::WalkError;

/// Top-level error type for ingestion.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("pattern error: {0}")]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Map an error to its exit code.
pub fn exit_code(error: &IngestError) -> i32 {
    match error {
        IngestError::Pattern(_) => 2,
        IngestError::Walk(walk) => match walk {
            WalkError::NotFound { .. } => 3,
            WalkError::NotAFile { .. } | WalkError::NotADirectory { .. } => 4,
            WalkError::EmptyResource { .. } => 5,
            WalkError::UnsupportedEntryKind { .. } => 6,
            WalkError::Notebook { .. } => 7,
            WalkError::Cancelled => 130,
            WalkError::Io { .. } => 1,
        },
        IngestError::Io(_) => 1,
    }
}
