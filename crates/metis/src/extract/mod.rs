//! The two-pass chunk extraction pipeline.
//!
//! Pass one walks the workspace in discovery order, opens each Java file
//! on the server, and flattens its symbol tree into method records and
//! partial chunks. Pass two queries references for every method and turns
//! containment into inbound call edges, which are then joined back onto
//! the chunks.
//!
//! The pipeline is deliberately tolerant: a file that fails to read or
//! query costs only its own chunks, a method whose reference lookup fails
//! keeps an empty `called_by`, and every such failure is recorded in the
//! report rather than aborting the run.

mod references;
mod symbols;

pub use references::{attribute_callers, find_references};
pub use symbols::{FlatMethod, collect_methods};

use std::path::Path;
use std::time::Instant;

use lsp_types::{
    DidOpenTextDocumentParams, DocumentSymbol, DocumentSymbolParams, DocumentSymbolResponse,
    PartialResultParams, TextDocumentIdentifier, TextDocumentItem, Uri, WorkDoneProgressParams,
};
use tracing::{debug, warn};

use crate::error::{Result, ScanError};
use crate::lsp::{Connection, LspError};
use crate::types::{Chunk, ScanReport};
use crate::workspace;

/// Run the full extraction pipeline over a workspace.
///
/// # Errors
///
/// Returns an error only when the workspace itself cannot be walked.
/// Everything below that granularity is collected into the report.
pub fn extract(connection: &Connection, workspace_root: &Path) -> Result<ScanReport> {
    let start = Instant::now();
    let files = workspace::discover_java_files(workspace_root)?;
    debug!(files = files.len(), "discovered Java files");

    let mut errors: Vec<ScanError> = Vec::new();
    let mut methods: Vec<FlatMethod> = Vec::new();
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut files_scanned = 0;
    let mut files_skipped = 0;

    // First pass: open every document and flatten its symbol tree.
    for path in &files {
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "cannot read file, skipping");
                errors.push(ScanError::read_failed(path.display().to_string(), e.to_string()));
                files_skipped += 1;
                continue;
            }
        };

        let uri = match crate::lsp::path_to_uri(path) {
            Ok(uri) => uri,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "cannot address file, skipping");
                errors.push(ScanError::read_failed(path.display().to_string(), e.to_string()));
                files_skipped += 1;
                continue;
            }
        };

        match open_and_collect(connection, &uri, &source) {
            Ok((file_methods, file_chunks)) => {
                methods.extend(file_methods);
                chunks.extend(file_chunks);
                files_scanned += 1;
            }
            Err(e) => {
                warn!(uri = %uri.as_str(), error = %e, "symbol query failed, skipping file");
                errors.push(ScanError::symbols_failed(path.display().to_string(), e.to_string()));
                files_skipped += 1;
            }
        }
    }

    let methods_found = methods.len();
    debug!(methods_found, "collected method symbols, starting reference pass");

    // Second pass: resolve references into inbound call edges and join
    // them onto the matching chunk. The join key includes the method code
    // to keep same-named overloads apart.
    for method in &methods {
        let locations = match find_references(connection, method) {
            Ok(locations) => locations,
            Err(e) => {
                warn!(
                    method = %method.qualified_name(),
                    error = %e,
                    "reference query failed, leaving called_by empty"
                );
                errors.push(ScanError::references_failed(
                    method.qualified_name(),
                    e.to_string(),
                ));
                continue;
            }
        };

        let called_by = attribute_callers(method, &locations, &methods);
        if let Some(chunk) = chunks.iter_mut().find(|c| {
            c.class_name == method.class_name
                && c.method_name == method.symbol.name
                && c.method_code == method.method_code
        }) {
            chunk.called_by = called_by.into_iter().collect();
        }
    }

    Ok(ScanReport {
        chunks,
        files_scanned,
        files_skipped,
        methods_found,
        duration: start.elapsed(),
        errors,
    })
}

/// Announce a document to the server and flatten its symbol tree.
fn open_and_collect(
    connection: &Connection,
    uri: &Uri,
    source: &str,
) -> crate::lsp::Result<(Vec<FlatMethod>, Vec<Chunk>)> {
    open_document(connection, uri, source)?;
    let tree = document_symbols(connection, uri)?;
    Ok(collect_methods(uri, &tree, source))
}

fn open_document(connection: &Connection, uri: &Uri, text: &str) -> crate::lsp::Result<()> {
    let params = DidOpenTextDocumentParams {
        text_document: TextDocumentItem {
            uri: uri.clone(),
            language_id: "java".to_string(),
            version: 1,
            text: text.to_string(),
        },
    };
    connection.notify(
        "textDocument/didOpen",
        serde_json::to_value(params).map_err(LspError::Serialize)?,
    )
}

fn document_symbols(connection: &Connection, uri: &Uri) -> crate::lsp::Result<Vec<DocumentSymbol>> {
    let params = DocumentSymbolParams {
        text_document: TextDocumentIdentifier { uri: uri.clone() },
        work_done_progress_params: WorkDoneProgressParams::default(),
        partial_result_params: PartialResultParams::default(),
    };

    let result = connection.request(
        "textDocument/documentSymbol",
        serde_json::to_value(params).map_err(LspError::Serialize)?,
    )?;
    let response: Option<DocumentSymbolResponse> =
        serde_json::from_value(result).map_err(LspError::Deserialize)?;

    Ok(match response {
        Some(DocumentSymbolResponse::Nested(tree)) => tree,
        Some(DocumentSymbolResponse::Flat(_)) => {
            // We only advertise hierarchical support; a flat reply has no
            // reliable container information to anchor chunks to.
            warn!(uri = %uri.as_str(), "server returned flat symbols, skipping file");
            Vec::new()
        }
        None => Vec::new(),
    })
}
