//! Error types for document observation and control activation.

use thiserror::Error;

/// Errors that can occur on the page side.
#[derive(Debug, Error)]
pub enum Error {
    /// A candidate selector is not valid CSS.
    #[error("Invalid selector: {0:?}")]
    InvalidSelector(String),

    /// An insertion that would make a node its own ancestor.
    #[error("Cannot insert a node under its own descendant")]
    HierarchyRequest,

    /// The document was torn down before it became ready.
    #[error("Document closed")]
    DocumentClosed,

    /// `attach` was called on an observer that is already observing.
    #[error("Observer is already observing")]
    AlreadyObserving,

    /// The clipboard rejected the write.
    #[error("Clipboard error: {0}")]
    Clipboard(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
