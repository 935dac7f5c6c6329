//! LSP client infrastructure: framing, correlation, transport, launch.
//!
//! This module is a JSON-RPC client for language servers speaking the
//! Language Server Protocol over stdio. It is deliberately thin: protocol
//! payloads are `lsp-types` structures serialized through `serde_json`,
//! and the interesting work is in reassembling the server's byte stream
//! into messages ([`framing`]) and matching asynchronous responses back
//! to their requests ([`transport`]).
//!
//! ## Usage
//!
//! ```no_run
//! use metis::lsp::{JdtLauncher, Session};
//! use serde_json::json;
//! use std::path::Path;
//!
//! let launcher = JdtLauncher::from_env()?;
//! let mut session = Session::start(&launcher, Path::new("/path/to/project"))?;
//!
//! let result = session.request("initialize", json!({"processId": null}))?;
//! session.notify("initialized", json!({}))?;
//!
//! session.shutdown()?;
//! # Ok::<(), metis::lsp::LspError>(())
//! ```

mod error;
mod framing;
mod launcher;
mod message;
mod transport;
mod uri;

pub use error::LspError;
pub use framing::MessageFramer;
pub use launcher::{JDT_LS_PATH_VAR, JdtLauncher, ServerLauncher};
pub use message::{CONTENT_TYPE, Message, RequestId, ResponseError};
pub use transport::{Connection, Session};
pub use uri::path_to_uri;

/// Result type for LSP operations.
pub type Result<T> = std::result::Result<T, LspError>;
