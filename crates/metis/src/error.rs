//! Error types for extraction runs.
//!
//! Errors come in two tiers:
//!
//! - **`Error`**: failures that halt a run outright. In practice that is
//!   only an inability to start the language server at all, or a broken
//!   workspace root.
//! - **`ScanError`**: per-file and per-method failures that are collected
//!   into the report and never halt the run. A file that won't read or a
//!   method whose reference lookup fails costs exactly its own chunks and
//!   edges; everything else in the run still comes out.

use thiserror::Error;

use crate::lsp::LspError;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures that end a run.
#[derive(Debug, Error)]
pub enum Error {
    /// Language server communication or startup failure.
    #[error("language server error: {0}")]
    Lsp(#[from] LspError),

    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization of results failed.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration or arguments.
    #[error("configuration error: {0}")]
    Config(String),
}

/// A non-fatal failure recorded against one file or method during a run.
#[derive(Debug, Clone)]
pub struct ScanError {
    /// The file path or `Class::method` the failure belongs to.
    pub subject: String,
    /// Category of the failure.
    pub kind: ScanErrorKind,
    /// Human-readable error message.
    pub message: String,
}

/// Categorization of non-fatal scan failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanErrorKind {
    /// A source file could not be read or addressed.
    ReadFailed,
    /// The document symbol request for a file failed.
    SymbolsFailed,
    /// The reference lookup for a method failed.
    ReferencesFailed,
}

impl std::fmt::Display for ScanErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadFailed => write!(f, "read failed"),
            Self::SymbolsFailed => write!(f, "symbol query failed"),
            Self::ReferencesFailed => write!(f, "reference query failed"),
        }
    }
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({})", self.subject, self.message, self.kind)
    }
}

impl std::error::Error for ScanError {}

impl ScanError {
    /// Create a new scan error.
    #[must_use]
    pub fn new(subject: impl Into<String>, kind: ScanErrorKind, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            kind,
            message: message.into(),
        }
    }

    /// A file that could not be read or addressed.
    #[must_use]
    pub fn read_failed(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(subject, ScanErrorKind::ReadFailed, message)
    }

    /// A failed document symbol query.
    #[must_use]
    pub fn symbols_failed(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(subject, ScanErrorKind::SymbolsFailed, message)
    }

    /// A failed reference query.
    #[must_use]
    pub fn references_failed(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(subject, ScanErrorKind::ReferencesFailed, message)
    }
}
