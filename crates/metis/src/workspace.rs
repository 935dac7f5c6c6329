//! Workspace file discovery.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::Result;

/// Find every Java source file under the workspace root.
///
/// Hidden directories and common build output directories are skipped.
/// Results are sorted so discovery order, and with it chunk output order,
/// is stable across runs.
///
/// # Errors
///
/// Returns an error only if the root itself cannot be walked; unreadable
/// subdirectories are logged and skipped.
pub fn discover_java_files(workspace_root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk_dir(workspace_root, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(
                directory = %dir.display(),
                error = %e,
                "cannot read directory, skipping"
            );
            return Ok(());
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(
                    directory = %dir.display(),
                    error = %e,
                    "failed to read directory entry, skipping"
                );
                continue;
            }
        };

        let path = entry.path();

        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.starts_with('.') || (path.is_dir() && is_excluded_dir(name)) {
                continue;
            }
        }

        if path.is_dir() {
            walk_dir(&path, files)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("java") {
            files.push(path);
        }
    }

    Ok(())
}

/// Build-output and dependency directories that never hold project
/// sources worth scanning.
fn is_excluded_dir(name: &str) -> bool {
    matches!(
        name,
        "target" | "build" | "bin" | "out" | "node_modules" | "classes"
    )
}
