//! Domain types for chunk extraction.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// A method-level chunk: one method's source text and signature plus the
/// inbound edges of the call graph.
///
/// `called_by` holds `Class::method` identifiers of the methods whose
/// bodies contain a reference to this one. It never contains the chunk's
/// own identifier; a method calling itself contributes no edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Name of the enclosing class, interface, or enum.
    pub class_name: String,
    /// Method name as reported by the symbol tree.
    pub method_name: String,
    /// Return type parsed from the symbol detail; `void` when the detail
    /// carries none.
    pub return_type: String,
    /// Parameter declarations parsed textually from the symbol detail.
    pub parameters: Vec<String>,
    /// `Class::method` identifiers of methods that call this one.
    pub called_by: Vec<String>,
    /// The method's full source text, line-inclusive over its range.
    pub method_code: String,
}

/// Outcome of one extraction run: the chunks, plus enough bookkeeping to
/// see what was skipped along the way.
///
/// A run completes with as many chunks and edges as could be determined;
/// failures on individual files and methods land in `errors` instead of
/// aborting the run.
#[derive(Debug)]
pub struct ScanReport {
    /// Extracted chunks in file discovery order, then symbol traversal
    /// order within each file.
    pub chunks: Vec<Chunk>,
    /// Files whose symbols were collected.
    pub files_scanned: usize,
    /// Files skipped because they could not be read or queried.
    pub files_skipped: usize,
    /// Method symbols found across all files.
    pub methods_found: usize,
    /// Wall-clock duration of the run.
    pub duration: Duration,
    /// Non-fatal failures collected along the way.
    pub errors: Vec<ScanError>,
}
