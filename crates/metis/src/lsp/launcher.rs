//! Locating and configuring the language server executable.
//!
//! The Eclipse JDT language server ships as an OSGi application: a
//! `plugins/` directory holding an equinox launcher jar, plus one
//! configuration directory per platform. Launching it means finding the
//! jar, picking the right `config_*` directory, and assembling a `java`
//! argument vector.

use std::path::{Path, PathBuf};

use super::Result;
use super::error::LspError;

/// Environment variable naming the JDT LS installation directory.
pub const JDT_LS_PATH_VAR: &str = "JDT_LS_PATH";

const INSTALL_HINT: &str = "Download the JDT language server from \
https://download.eclipse.org/jdtls/milestones/ and point JDT_LS_PATH (or \
--server-home) at the extracted directory.";

/// Configuration for spawning a language server process.
///
/// Implementations decide which executable to run and with which
/// arguments; the transport layer stays server-agnostic.
pub trait ServerLauncher {
    /// The command to spawn (e.g. `java`).
    fn command(&self) -> &str;

    /// Command-line arguments for a given workspace root.
    ///
    /// # Errors
    ///
    /// Returns an error if the server installation is incomplete and the
    /// argument vector cannot be assembled.
    fn args(&self, workspace_root: &Path) -> Result<Vec<String>>;

    /// Installation instructions shown when the server cannot be started.
    fn install_hint(&self) -> &str {
        "Please install the language server and ensure it's reachable."
    }
}

/// Launcher for the Eclipse JDT language server.
#[derive(Debug, Clone)]
pub struct JdtLauncher {
    server_home: PathBuf,
}

impl JdtLauncher {
    /// Create a launcher for a JDT LS installation directory.
    #[must_use]
    pub fn new(server_home: impl Into<PathBuf>) -> Self {
        Self {
            server_home: server_home.into(),
        }
    }

    /// Resolve the installation directory from the `JDT_LS_PATH`
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`LspError::NotFound`] with an install hint when the
    /// variable is unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(JDT_LS_PATH_VAR) {
            Some(home) => Ok(Self::new(PathBuf::from(home))),
            None => Err(LspError::not_found("JDT language server", INSTALL_HINT)),
        }
    }

    /// Find the equinox launcher jar under `plugins/`.
    ///
    /// Installations can carry several versioned jars; the
    /// lexicographically last one is picked so the choice is stable and
    /// favors the newest version.
    fn find_launcher_jar(&self) -> Result<PathBuf> {
        let plugins_dir = self.server_home.join("plugins");
        let entries = std::fs::read_dir(&plugins_dir).map_err(|e| {
            LspError::Launcher(format!(
                "cannot read plugins directory '{}': {e}",
                plugins_dir.display()
            ))
        })?;

        let mut jars: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|name| {
                        name.starts_with("org.eclipse.equinox.launcher_") && name.ends_with(".jar")
                    })
            })
            .collect();
        jars.sort();

        jars.pop().ok_or_else(|| {
            LspError::Launcher(format!(
                "no equinox launcher jar found in '{}'",
                plugins_dir.display()
            ))
        })
    }

    /// The per-platform configuration directory bundled with the server.
    fn config_dir(&self) -> Result<PathBuf> {
        let platform = if cfg!(target_os = "windows") {
            "win"
        } else if cfg!(target_os = "macos") {
            "mac"
        } else {
            "linux"
        };

        let config_dir = self.server_home.join(format!("config_{platform}"));
        if !config_dir.is_dir() {
            return Err(LspError::Launcher(format!(
                "missing configuration directory '{}'",
                config_dir.display()
            )));
        }
        Ok(config_dir)
    }
}

impl ServerLauncher for JdtLauncher {
    fn command(&self) -> &str {
        "java"
    }

    fn args(&self, workspace_root: &Path) -> Result<Vec<String>> {
        let launcher_jar = self.find_launcher_jar()?;
        let config_dir = self.config_dir()?;
        // Server-side workspace metadata lives next to the sources but out
        // of the way of the scan itself.
        let data_dir = workspace_root.join(".metis-jdt-data");

        Ok(vec![
            "-Declipse.application=org.eclipse.jdt.ls.core.id1".to_string(),
            "-Dosgi.bundles.defaultStartLevel=4".to_string(),
            "-Declipse.product=org.eclipse.jdt.ls.core.product".to_string(),
            "-Xmx1G".to_string(),
            "--add-modules=ALL-SYSTEM".to_string(),
            "--add-opens".to_string(),
            "java.base/java.util=ALL-UNNAMED".to_string(),
            "--add-opens".to_string(),
            "java.base/java.lang=ALL-UNNAMED".to_string(),
            "-jar".to_string(),
            launcher_jar.display().to_string(),
            "-configuration".to_string(),
            config_dir.display().to_string(),
            "-data".to_string(),
            data_dir.display().to_string(),
        ])
    }

    fn install_hint(&self) -> &str {
        INSTALL_HINT
    }
}
