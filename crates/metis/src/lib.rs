//! # Metis: method chunks and call edges from the Java language server
//!
//! Metis drives the Eclipse JDT language server over JSON-RPC to recover,
//! for a Java workspace, a flat catalogue of method-level chunks
//! annotated with inbound call edges: which methods call a given method.
//!
//! ## Design Philosophy
//!
//! - **Client, not analyzer** - the language server does the semantic
//!   work; Metis frames the protocol and cross-references the results
//! - **Partial success is success** - a file or method that fails costs
//!   only its own chunks and edges, never the run
//! - **Lexical call edges** - callers are found by containment of
//!   reference locations in method ranges, not dynamic dispatch
//! - **Embeddable** - library first, CLI second
//!
//! ## Quick Start
//!
//! ```no_run
//! use metis::Metis;
//! use metis::lsp::JdtLauncher;
//! use std::path::Path;
//!
//! let launcher = JdtLauncher::from_env()?;
//! let metis = Metis::start(&launcher, Path::new("/path/to/java/project"))?;
//!
//! let report = metis.extract_chunks()?;
//! for chunk in &report.chunks {
//!     println!("{}::{} called by {:?}", chunk.class_name, chunk.method_name, chunk.called_by);
//! }
//!
//! metis.stop()?;
//! # Ok::<(), metis::Error>(())
//! ```

mod error;
pub mod extract;
pub mod lsp;
mod types;
mod workspace;

pub use error::{Error, Result, ScanError, ScanErrorKind};
pub use types::{Chunk, ScanReport};
pub use workspace::discover_java_files;

use std::path::{Path, PathBuf};

use lsp_types::{
    ClientCapabilities, ClientInfo, DocumentSymbolClientCapabilities, InitializeParams,
    InitializeResult, ReferenceClientCapabilities, SymbolKind, SymbolKindCapability,
    TextDocumentClientCapabilities, TextDocumentSyncClientCapabilities, TraceValue,
    WindowClientCapabilities, WorkspaceClientCapabilities, WorkspaceFolder,
};
use serde_json::json;
use tracing::debug;

use lsp::{Connection, LspError, ServerLauncher, Session};

/// A running extraction client: one language server session scoped to one
/// workspace.
pub struct Metis {
    session: Session,
    workspace_root: PathBuf,
}

impl Metis {
    /// Start the language server for a workspace and perform the
    /// initialize handshake.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace root does not exist, the server
    /// cannot be spawned, or the handshake fails. Spawn failure is the
    /// one fatal condition of a run.
    pub fn start(launcher: &dyn ServerLauncher, workspace_root: &Path) -> Result<Self> {
        let workspace_root = workspace_root.canonicalize().map_err(|e| {
            Error::Config(format!(
                "workspace root not found: {} ({e})",
                workspace_root.display()
            ))
        })?;

        let session = Session::start(launcher, &workspace_root)?;
        initialize(session.connection(), &workspace_root)?;

        Ok(Self {
            session,
            workspace_root,
        })
    }

    /// Extract method chunks with inbound call edges from the workspace.
    ///
    /// # Errors
    ///
    /// Returns an error only when the workspace cannot be walked;
    /// per-file and per-method failures are collected into the report.
    pub fn extract_chunks(&self) -> Result<ScanReport> {
        extract::extract(self.session.connection(), &self.workspace_root)
    }

    /// The canonicalized workspace root this session is scoped to.
    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Shut the language server down gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown round trip fails; the process is
    /// killed on drop regardless.
    pub fn stop(mut self) -> Result<()> {
        self.session.shutdown()?;
        Ok(())
    }
}

/// Perform the LSP initialize handshake.
///
/// The capability surface matches what the extraction pipeline actually
/// uses: hierarchical document symbols and reference queries.
#[allow(deprecated)] // root_uri is deprecated but JDT LS still reads it
fn initialize(connection: &Connection, workspace_root: &Path) -> lsp::Result<()> {
    let root_uri = lsp::path_to_uri(workspace_root)?;
    let folder_name = workspace_root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("workspace")
        .to_string();

    let capabilities = ClientCapabilities {
        workspace: Some(WorkspaceClientCapabilities {
            apply_edit: Some(true),
            workspace_folders: Some(true),
            configuration: Some(true),
            ..Default::default()
        }),
        text_document: Some(TextDocumentClientCapabilities {
            synchronization: Some(TextDocumentSyncClientCapabilities {
                dynamic_registration: Some(true),
                will_save: Some(true),
                will_save_wait_until: Some(true),
                did_save: Some(true),
            }),
            references: Some(ReferenceClientCapabilities {
                dynamic_registration: Some(true),
            }),
            document_symbol: Some(DocumentSymbolClientCapabilities {
                dynamic_registration: Some(true),
                hierarchical_document_symbol_support: Some(true),
                symbol_kind: Some(SymbolKindCapability {
                    value_set: Some(all_symbol_kinds()),
                }),
                tag_support: None,
            }),
            ..Default::default()
        }),
        // Accepting progress reporting keeps servers that insist on it
        // from stalling while they load the workspace.
        window: Some(WindowClientCapabilities {
            work_done_progress: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    };

    let params = InitializeParams {
        process_id: Some(std::process::id()),
        root_uri: Some(root_uri.clone()),
        capabilities,
        initialization_options: Some(json!({
            "settings": {
                "java": {
                    "configuration": { "updateBuildConfiguration": "automatic" },
                    "format": { "enabled": true },
                }
            }
        })),
        client_info: Some(ClientInfo {
            name: "metis".to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }),
        trace: Some(TraceValue::Off),
        workspace_folders: Some(vec![WorkspaceFolder {
            uri: root_uri,
            name: folder_name,
        }]),
        ..Default::default()
    };

    let result = connection.request(
        "initialize",
        serde_json::to_value(params).map_err(LspError::Serialize)?,
    )?;
    let result: InitializeResult =
        serde_json::from_value(result).map_err(LspError::Deserialize)?;
    debug!(server_info = ?result.server_info, "language server initialized");

    connection.notify("initialized", json!({}))?;
    Ok(())
}

fn all_symbol_kinds() -> Vec<SymbolKind> {
    vec![
        SymbolKind::FILE,
        SymbolKind::MODULE,
        SymbolKind::NAMESPACE,
        SymbolKind::PACKAGE,
        SymbolKind::CLASS,
        SymbolKind::METHOD,
        SymbolKind::PROPERTY,
        SymbolKind::FIELD,
        SymbolKind::CONSTRUCTOR,
        SymbolKind::ENUM,
        SymbolKind::INTERFACE,
        SymbolKind::FUNCTION,
        SymbolKind::VARIABLE,
        SymbolKind::CONSTANT,
        SymbolKind::STRING,
        SymbolKind::NUMBER,
        SymbolKind::BOOLEAN,
        SymbolKind::ARRAY,
        SymbolKind::OBJECT,
        SymbolKind::KEY,
        SymbolKind::NULL,
        SymbolKind::ENUM_MEMBER,
        SymbolKind::STRUCT,
        SymbolKind::EVENT,
        SymbolKind::OPERATOR,
        SymbolKind::TYPE_PARAMETER,
    ]
}
