//! Module-name to file-path resolution.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tracing::debug;

use crate::io::manifest::Manifest;

/// Resolve a dotted module name (`Page.Home`) to a source file under one of
/// the manifest's source directories.
///
/// Directories are searched in declared order and the first match wins, so
/// resolution is deterministic when the same module exists in several
/// directories. Fails naming the module when no directory contains it.
pub fn module_file_path(root: &Path, manifest: &Manifest, module_name: &str) -> Result<PathBuf> {
    let relative = format!("{}.elm", module_name.replace('.', "/"));
    for source_dir in &manifest.source_directories {
        let candidate = root.join(source_dir).join(&relative);
        if candidate.is_file() {
            debug!(module = module_name, path = %candidate.display(), "resolved module");
            return Ok(candidate);
        }
    }
    bail!(
        "could not find module `{module_name}` in any source directory ({})",
        manifest.source_directories.join(", ")
    );
}
