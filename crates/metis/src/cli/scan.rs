//! `metis scan` command implementation.

use std::path::{Path, PathBuf};

use metis::Metis;
use metis::lsp::JdtLauncher;

use super::display;

/// Run the scan command.
pub fn run(workspace: &Path, server_home: Option<PathBuf>, json: bool) -> Result<(), metis::Error> {
    let launcher = match server_home {
        Some(home) => JdtLauncher::new(home),
        None => JdtLauncher::from_env()?,
    };

    let metis = Metis::start(&launcher, workspace)?;
    let report = metis.extract_chunks();
    // Stop the server even when extraction failed, then surface the
    // extraction error first: it is the one the user cares about.
    let stopped = metis.stop();
    let report = report?;
    stopped?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.chunks)?);
    } else {
        display::print_summary(&report);
    }

    Ok(())
}
