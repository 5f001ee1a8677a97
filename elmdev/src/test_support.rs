//! Shared test scaffolding.
//!
//! Scripted fakes for the compiler and action seams plus tree and project
//! builders. Available to integration tests through the `test-support`
//! feature.

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use tempfile::TempDir;

use crate::interpret::ActionRunner;
use crate::io::compiler::ElmCompiler;
use crate::io::manifest::{Dependencies, MANIFEST_FILE, Manifest, write_manifest};
use crate::tree::{
    BenchmarkFlags, BuildFlags, LogFlags, Mode, ServeFlags, TaskTree, TestFlags,
};

pub fn batch(children: Vec<TaskTree>) -> TaskTree {
    TaskTree::Batch(children)
}

pub fn sequence(children: Vec<TaskTree>) -> TaskTree {
    TaskTree::Sequence(children)
}

pub fn one_of(branches: Vec<(&str, TaskTree)>) -> TaskTree {
    TaskTree::OneOf(
        branches
            .into_iter()
            .map(|(label, tree)| (label.to_string(), tree))
            .collect(),
    )
}

pub fn log_text(text: &str) -> TaskTree {
    TaskTree::Log(LogFlags::Text(text.to_string()))
}

/// Serve flags with a localhost binding and a css content-type mapping.
pub fn serve_flags(module_name: &str) -> ServeFlags {
    ServeFlags {
        module_name: module_name.to_string(),
        hostname: "localhost".to_string(),
        port: 8080,
        mode: Mode::Develop,
        output_path: "build/main.js".to_string(),
        document_path: None,
        headers: BTreeMap::new(),
        content_types: BTreeMap::from([("css".to_string(), "text/css".to_string())]),
    }
}

/// [`ActionRunner`] that records each dispatch as a label like `log:hello`
/// or `build:Main`, optionally failing on one configured label.
#[derive(Debug, Default)]
pub struct RecordingActions {
    invoked: Mutex<Vec<String>>,
    fail_on: Option<String>,
}

impl RecordingActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every dispatch but fail when `label` comes up.
    pub fn failing_on(label: &str) -> Self {
        Self {
            invoked: Mutex::new(Vec::new()),
            fail_on: Some(label.to_string()),
        }
    }

    /// Labels dispatched so far, in dispatch order.
    pub fn invoked(&self) -> Vec<String> {
        self.invoked.lock().expect("actions lock").clone()
    }

    fn record(&self, label: String) -> Result<()> {
        self.invoked.lock().expect("actions lock").push(label.clone());
        if self.fail_on.as_deref() == Some(&label) {
            bail!("scripted failure for {label}");
        }
        Ok(())
    }
}

impl ActionRunner for RecordingActions {
    fn log(&self, flags: &LogFlags) -> Result<()> {
        match flags {
            LogFlags::Text(text) => self.record(format!("log:{text}")),
            LogFlags::Version => self.record("log:version".to_string()),
        }
    }

    fn build(&self, flags: &BuildFlags) -> Result<()> {
        self.record(format!("build:{}", flags.module_name))
    }

    fn serve(&self, flags: &ServeFlags) -> Result<()> {
        self.record(format!("serve:{}", flags.module_name))
    }

    fn test(&self, flags: &TestFlags) -> Result<()> {
        self.record(format!("test:{}", flags.module_name))
    }

    fn benchmark(&self, flags: &BenchmarkFlags) -> Result<()> {
        self.record(format!("benchmark:{}", flags.module_name))
    }
}

enum Outcome {
    Success(String),
    Failure(String),
}

/// [`ElmCompiler`] driven by a queue of scripted outcomes.
///
/// A success writes the scripted text to the requested output path; an empty
/// queue writes a placeholder so tests that only count calls need no setup.
#[derive(Default)]
pub struct ScriptedCompiler {
    outcomes: Mutex<VecDeque<Outcome>>,
    calls: Mutex<usize>,
}

impl ScriptedCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_success(&self, compiled: &str) {
        self.outcomes
            .lock()
            .expect("compiler lock")
            .push_back(Outcome::Success(compiled.to_string()));
    }

    pub fn push_failure(&self, diagnostic: &str) {
        self.outcomes
            .lock()
            .expect("compiler lock")
            .push_back(Outcome::Failure(diagnostic.to_string()));
    }

    /// Number of compile invocations so far.
    pub fn calls(&self) -> usize {
        *self.calls.lock().expect("compiler lock")
    }
}

impl ElmCompiler for ScriptedCompiler {
    fn compile(&self, _entry: &Path, _mode: Mode, _cwd: &Path, output: &Path) -> Result<()> {
        *self.calls.lock().expect("compiler lock") += 1;
        let outcome = self.outcomes.lock().expect("compiler lock").pop_front();
        match outcome {
            Some(Outcome::Failure(diagnostic)) => bail!("{diagnostic}"),
            Some(Outcome::Success(compiled)) => {
                fs::write(output, compiled)
                    .with_context(|| format!("write {}", output.display()))?;
                Ok(())
            }
            None => {
                fs::write(output, "// compiled\n")
                    .with_context(|| format!("write {}", output.display()))?;
                Ok(())
            }
        }
    }
}

/// A temporary project directory with an `elm.json` naming the given source
/// directories.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn new(source_directories: &[&str]) -> Result<Self> {
        let dir = tempfile::tempdir().context("create project directory")?;
        let manifest = Manifest {
            project_type: "application".to_string(),
            source_directories: source_directories
                .iter()
                .map(|directory| directory.to_string())
                .collect(),
            elm_version: "0.19.1".to_string(),
            dependencies: Dependencies::default(),
            test_dependencies: Dependencies::default(),
        };
        write_manifest(&dir.path().join(MANIFEST_FILE), &manifest)?;
        for directory in source_directories {
            fs::create_dir_all(dir.path().join(directory))
                .with_context(|| format!("create {directory}"))?;
        }
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the project root, creating parents.
    pub fn write_module(&self, relative: &str, contents: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}
