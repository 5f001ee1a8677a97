//! The build pipeline: compile, rewrite, minify, persist.
//!
//! Compilation happens into a sandbox so a failed build can never leave a
//! stale or partial artifact behind; the output file is only written after
//! every transformation has succeeded.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::console::{Color, paint};
use crate::io::compiler::ElmCompiler;
use crate::io::manifest::load_manifest;
use crate::io::modules::module_file_path;
use crate::io::sandbox::with_sandbox;
use crate::minify;
use crate::tree::{BuildFlags, Format, Mode};

/// Build the module and persist the artifact when an output path is set.
#[instrument(skip_all, fields(module = %flags.module_name, mode = ?flags.mode))]
pub fn run(compiler: &impl ElmCompiler, root: &Path, flags: &BuildFlags) -> Result<()> {
    let artifact = make_compiled_source(compiler, root, flags)?;
    if let Some(output_path) = &flags.output_path {
        persist_artifact(&root.join(output_path), &artifact)?;
        println!(
            "{} built {} from {}.{}",
            paint(Color::Green, "+"),
            paint(Color::Green, output_path),
            flags.module_name,
            paint(Color::Blue, "main"),
        );
        info!(output = output_path, "artifact written");
    }
    Ok(())
}

/// Compile the module and apply the format/mode transformations, returning
/// the artifact text. Used directly by the development server, which keeps
/// no artifact cache and rebuilds per request.
pub fn make_compiled_source(
    compiler: &impl ElmCompiler,
    root: &Path,
    flags: &BuildFlags,
) -> Result<String> {
    let manifest = load_manifest(root)?;
    let module_path = module_file_path(root, &manifest, &flags.module_name)?;

    let compiled = with_sandbox("elmdev-build", |sandbox| {
        let output = sandbox.join("main.js");
        compiler.compile(&module_path, flags.mode, root, &output)?;
        fs::read_to_string(&output).with_context(|| format!("read {}", output.display()))
    })?;
    debug!(bytes = compiled.len(), "compiled module");

    let mut artifact = compiled;
    if flags.format == Format::Esm {
        artifact = export_compiled_source(&artifact);
    }
    if flags.mode == Mode::Optimize {
        artifact = minify::minify(&artifact).map_err(anyhow::Error::msg)?;
        debug!(bytes = artifact.len(), "minified artifact");
    }
    Ok(artifact)
}

/// Rewrite a side-effecting script into an importable module: the program
/// installs itself on a private scope object instead of the ambient one,
/// and the scope's namespace is re-exported.
fn export_compiled_source(compiled: &str) -> String {
    format!(
        "const scope = {{}};\n{}\nexport const Elm = scope.Elm;\n",
        compiled.replacen("(this)", "(scope)", 1)
    )
}

fn persist_artifact(path: &Path, artifact: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    fs::write(path, artifact).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedCompiler, TestProject};

    const COMPILED: &str = "(function(scope){scope.Elm={Main:{}};}(this));";

    fn flags(format: Format, mode: Mode, output_path: Option<&str>) -> BuildFlags {
        BuildFlags {
            module_name: "Main".to_string(),
            output_path: output_path.map(str::to_string),
            format,
            mode,
        }
    }

    fn project_with_main() -> TestProject {
        let project = TestProject::new(&["src"]).expect("project");
        project
            .write_module("src/Main.elm", "module Main exposing (main)")
            .expect("write module");
        project
    }

    #[test]
    fn esm_format_wraps_the_script_in_an_export_scaffold() {
        let project = project_with_main();
        let compiler = ScriptedCompiler::new();
        compiler.push_success(COMPILED);

        let artifact = make_compiled_source(
            &compiler,
            project.root(),
            &flags(Format::Esm, Mode::Develop, None),
        )
        .expect("build");

        assert!(artifact.starts_with("const scope = {};\n"));
        assert!(artifact.ends_with("export const Elm = scope.Elm;\n"));
        assert!(artifact.contains("(scope));"));
        assert!(!artifact.contains("(this));"));
    }

    #[test]
    fn iife_format_keeps_the_ambient_binding() {
        let project = project_with_main();
        let compiler = ScriptedCompiler::new();
        compiler.push_success(COMPILED);

        let artifact = make_compiled_source(
            &compiler,
            project.root(),
            &flags(Format::Iife, Mode::Develop, None),
        )
        .expect("build");
        assert_eq!(artifact, COMPILED);
    }

    #[test]
    fn success_writes_artifact_creating_parent_directories() {
        let project = project_with_main();
        let compiler = ScriptedCompiler::new();
        compiler.push_success(COMPILED);

        run(
            &compiler,
            project.root(),
            &flags(Format::Iife, Mode::Develop, Some("build/nested/main.js")),
        )
        .expect("build");

        let written =
            fs::read_to_string(project.root().join("build/nested/main.js")).expect("read");
        assert_eq!(written, COMPILED);
    }

    #[test]
    fn compiler_failure_writes_nothing() {
        let project = project_with_main();
        let compiler = ScriptedCompiler::new();
        compiler.push_failure("-- NAMING ERROR ------------ Main.elm");

        let err = run(
            &compiler,
            project.root(),
            &flags(Format::Iife, Mode::Develop, Some("build/main.js")),
        )
        .unwrap_err();

        assert!(err.to_string().contains("NAMING ERROR"));
        assert!(!project.root().join("build/main.js").exists());
    }

    #[test]
    fn minifier_failure_writes_nothing_and_surfaces_unchanged() {
        let project = project_with_main();
        let compiler = ScriptedCompiler::new();
        compiler.push_success("var s = \"unterminated");

        let err = run(
            &compiler,
            project.root(),
            &flags(Format::Iife, Mode::Optimize, Some("build/main.js")),
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "unterminated string literal");
        assert!(!project.root().join("build/main.js").exists());
    }

    #[test]
    fn optimize_mode_minifies_the_artifact() {
        let project = project_with_main();
        let compiler = ScriptedCompiler::new();
        compiler.push_success("var a = 1; // compiled\nvar  b = 2;");

        let artifact = make_compiled_source(
            &compiler,
            project.root(),
            &flags(Format::Iife, Mode::Optimize, None),
        )
        .expect("build");
        assert_eq!(artifact, "var a = 1;\nvar b = 2;");
    }

    #[test]
    fn unknown_module_fails_before_compiling() {
        let project = TestProject::new(&["src"]).expect("project");
        let compiler = ScriptedCompiler::new();

        let err = run(
            &compiler,
            project.root(),
            &flags(Format::Iife, Mode::Develop, None),
        )
        .unwrap_err();
        assert!(err.to_string().contains("could not find module `Main`"));
        assert_eq!(compiler.calls(), 0);
    }
}
