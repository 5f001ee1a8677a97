//! Configuration loading.
//!
//! The user's configuration is an Elm value, so reading it means compiling
//! it: a sandbox gets the fixed RunMain driver, a generated manifest and a
//! copy of the user's `Dev` module; the compiled driver then publishes the
//! encoded task tree over the bridge.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::io::bridge::{self, BridgeProgram};
use crate::io::compiler::ElmCompiler;
use crate::io::manifest::{MANIFEST_FILE, load_manifest, sandbox_manifest, write_manifest};
use crate::io::modules::module_file_path;
use crate::io::sandbox::with_sandbox;
use crate::templates;
use crate::tree::{Mode, TaskTree};

/// Fixed logical name of the user's configuration module.
pub const CONFIG_MODULE: &str = "Dev";

/// Compile and decode the task tree from the project's `Dev` module.
///
/// `dev_override` swaps the published DevElm dependency for a local source
/// file copied into the sandbox; this is how the package itself is developed
/// against an unreleased version.
#[instrument(skip_all, fields(dev_override = dev_override.is_some()))]
pub fn load_configuration(
    compiler: &impl ElmCompiler,
    root: &Path,
    dev_override: Option<&Path>,
) -> Result<TaskTree> {
    let manifest = load_manifest(root)?;

    with_sandbox("elmdev", |sandbox| {
        // Resolution happens before anything is compiled, so a missing
        // module never reaches the compiler.
        let config_path = module_file_path(root, &manifest, CONFIG_MODULE)?;
        debug!(config = %config_path.display(), "materializing configuration sandbox");

        // The three sandbox files have no ordering dependency among each
        // other; all must exist before the compile starts.
        let driver_path = sandbox.join("RunMain.elm");
        fs::write(&driver_path, templates::RUN_MAIN)
            .with_context(|| format!("write {}", driver_path.display()))?;
        write_manifest(
            &sandbox.join(MANIFEST_FILE),
            &sandbox_manifest(dev_override.is_some()),
        )?;
        fs::copy(&config_path, sandbox.join("Dev.elm"))
            .with_context(|| format!("copy {}", config_path.display()))?;
        if let Some(override_path) = dev_override {
            fs::copy(override_path, sandbox.join("DevElm.elm"))
                .with_context(|| format!("copy {}", override_path.display()))?;
        }

        let compiled_path = sandbox.join("main.js");
        compiler.compile(&driver_path, Mode::Optimize, sandbox, &compiled_path)?;

        let value = bridge::run_once(&BridgeProgram {
            sandbox,
            compiled_path: &compiled_path,
            module_name: "Main",
            flags: None,
        })?;

        let tree: TaskTree =
            serde_json::from_value(value).context("decode configuration")?;
        info!("configuration loaded");
        Ok(tree)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedCompiler, TestProject};

    #[test]
    fn missing_dev_module_fails_without_invoking_the_compiler() {
        let project = TestProject::new(&["src"]).expect("project");
        let compiler = ScriptedCompiler::new();

        let err = load_configuration(&compiler, project.root(), None).unwrap_err();
        assert!(err.to_string().contains("could not find module `Dev`"));
        assert_eq!(compiler.calls(), 0);
    }

    #[test]
    fn missing_manifest_fails_before_sandbox_work() {
        let temp = tempfile::tempdir().expect("tempdir");
        let compiler = ScriptedCompiler::new();

        let err = load_configuration(&compiler, temp.path(), None).unwrap_err();
        assert!(err.to_string().contains("elm.json"));
        assert_eq!(compiler.calls(), 0);
    }

    #[test]
    fn compiler_failure_propagates_verbatim() {
        let project = TestProject::new(&["src"]).expect("project");
        project
            .write_module("src/Dev.elm", "module Dev exposing (config)")
            .expect("write");
        let compiler = ScriptedCompiler::new();
        compiler.push_failure("-- TYPE MISMATCH ----------- Dev.elm");

        let err = load_configuration(&compiler, project.root(), None).unwrap_err();
        assert!(err.to_string().contains("TYPE MISMATCH"));
        assert_eq!(compiler.calls(), 1);
    }
}
