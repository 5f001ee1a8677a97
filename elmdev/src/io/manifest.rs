//! The `elm.json` manifest.
//!
//! Read once from the project root to learn the source directories, and
//! regenerated transiently inside each configuration sandbox with a
//! dependency set that differs only in whether the published `DevElm`
//! package or a local override module is declared.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Fixed manifest path, relative to the project root.
pub const MANIFEST_FILE: &str = "elm.json";

/// Published package injected into configuration sandboxes.
const DEVELM_PACKAGE: (&str, &str) = ("opvasger/develm", "5.0.0");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    #[serde(rename = "type")]
    pub project_type: String,
    #[serde(rename = "source-directories", default = "default_source_directories")]
    pub source_directories: Vec<String>,
    #[serde(rename = "elm-version")]
    pub elm_version: String,
    #[serde(default)]
    pub dependencies: Dependencies,
    #[serde(rename = "test-dependencies", default)]
    pub test_dependencies: Dependencies,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dependencies {
    #[serde(default)]
    pub direct: BTreeMap<String, String>,
    #[serde(default)]
    pub indirect: BTreeMap<String, String>,
}

fn default_source_directories() -> Vec<String> {
    vec!["src".to_string()]
}

/// Read the project manifest from `root`.
pub fn load_manifest(root: &Path) -> Result<Manifest> {
    let path = root.join(MANIFEST_FILE);
    let contents =
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let manifest: Manifest =
        serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    Ok(manifest)
}

/// Write `manifest` as pretty-printed JSON with a trailing newline.
pub fn write_manifest(path: &Path, manifest: &Manifest) -> Result<()> {
    let mut payload = serde_json::to_string_pretty(manifest).context("serialize manifest")?;
    payload.push('\n');
    fs::write(path, payload).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Manifest materialized inside a configuration sandbox.
///
/// With `dev_override` set, the published DevElm package is left out and the
/// caller copies a local override module in beside the driver instead.
pub fn sandbox_manifest(dev_override: bool) -> Manifest {
    let mut direct = BTreeMap::from([
        ("elm/core".to_string(), "1.0.5".to_string()),
        ("elm/json".to_string(), "1.1.3".to_string()),
    ]);
    if !dev_override {
        let (name, version) = DEVELM_PACKAGE;
        direct.insert(name.to_string(), version.to_string());
    }

    Manifest {
        project_type: "application".to_string(),
        source_directories: vec![".".to_string()],
        elm_version: "0.19.1".to_string(),
        dependencies: Dependencies {
            direct,
            indirect: BTreeMap::new(),
        },
        test_dependencies: Dependencies::default(),
    }
}
