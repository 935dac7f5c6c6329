//! Error types for LSP operations.

use thiserror::Error;

/// Errors that can occur while talking to the language server.
#[derive(Debug, Error)]
pub enum LspError {
    /// Failed to spawn the language server process.
    #[error("failed to spawn language server '{command}': {source}")]
    SpawnFailed {
        /// The command that failed to spawn.
        command: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Language server executable not found.
    #[error("{command} not found\n\n{install_hint}")]
    NotFound {
        /// The command that was not found.
        command: String,
        /// Installation instructions for the missing command.
        install_hint: String,
    },

    /// The server installation directory is unusable (missing launcher jar,
    /// missing configuration directory).
    #[error("language server installation problem: {0}")]
    Launcher(String),

    /// I/O error on the server's pipes.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize an outgoing message to JSON.
    #[error("failed to serialize request: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Failed to deserialize a response payload from JSON.
    #[error("failed to deserialize response: {0}")]
    Deserialize(#[source] serde_json::Error),

    /// The server returned an error envelope for a specific request.
    #[error("server error {code}: {message}")]
    ServerError {
        /// The JSON-RPC error code.
        code: i64,
        /// The error message from the server.
        message: String,
    },

    /// The server's output stream closed while a request was in flight,
    /// or a request was issued after the session shut down.
    #[error("language server exited with requests pending")]
    ServerExited,

    /// Invalid file path for an LSP operation.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

impl LspError {
    /// Create a "not found" error with an install hint.
    #[must_use]
    pub fn not_found(command: &str, install_hint: &str) -> Self {
        Self::NotFound {
            command: command.to_string(),
            install_hint: install_hint.to_string(),
        }
    }

    /// Create a spawn failed error.
    #[must_use]
    pub fn spawn_failed(command: &str, source: std::io::Error) -> Self {
        Self::SpawnFailed {
            command: command.to_string(),
            source,
        }
    }

    /// Create a server error from a JSON-RPC error envelope.
    #[must_use]
    pub fn server_error(code: i64, message: impl Into<String>) -> Self {
        Self::ServerError {
            code,
            message: message.into(),
        }
    }
}
