//! Task tree decoded from the user's `Dev.config` value.
//!
//! The RunMain driver publishes the configuration as externally tagged JSON
//! (`{"type": ..., "value": ...}`). The tree is immutable once decoded; the
//! interpreter only walks it alongside a cursor into the CLI arguments.

use std::collections::BTreeMap;

use serde::Deserialize;

/// A node of the task tree.
///
/// `Batch`, `Sequence` and `OneOf` structure execution; the remaining
/// variants are leaf actions carrying the flags their action needs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value")]
pub enum TaskTree {
    /// Run all children concurrently with the same arguments.
    Batch(Vec<TaskTree>),
    /// Run children one after another; order is significant.
    Sequence(Vec<TaskTree>),
    /// Consume one argument to pick a branch. Keys arrive sorted (Elm `Dict`).
    OneOf(BTreeMap<String, TaskTree>),
    Log(LogFlags),
    Build(BuildFlags),
    Serve(ServeFlags),
    Test(TestFlags),
    Benchmark(BenchmarkFlags),
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value")]
pub enum LogFlags {
    /// Print the given text.
    Text(String),
    /// Print the elmdev version.
    Version,
}

/// Output shape of a built artifact.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Side-effecting script that installs `Elm` on its scope.
    Iife,
    /// Importable module exporting the `Elm` namespace.
    Esm,
}

/// Optimization level passed to the compiler.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Develop,
    Debug,
    Optimize,
}

impl Mode {
    /// Compiler flag for this mode. `develop` passes no flag.
    pub fn compiler_flag(self) -> Option<&'static str> {
        match self {
            Mode::Develop => None,
            Mode::Debug => Some("--debug"),
            Mode::Optimize => Some("--optimize"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BuildFlags {
    pub module_name: String,
    /// When `None` the artifact is kept in memory for the caller.
    pub output_path: Option<String>,
    pub format: Format,
    pub mode: Mode,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServeFlags {
    pub module_name: String,
    pub hostname: String,
    pub port: u16,
    pub mode: Mode,
    pub output_path: String,
    /// Static document served for the root path instead of the generated one.
    pub document_path: Option<String>,
    /// Extra headers attached to every response.
    pub headers: BTreeMap<String, String>,
    /// File-extension to MIME-type mapping for static assets.
    pub content_types: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestFlags {
    /// Fuzzer seed; drawn at random (and echoed) when absent.
    pub seed: Option<u32>,
    pub fuzz: u32,
    pub module_name: String,
    pub test_name: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkFlags {
    pub module_name: String,
    pub benchmark_name: String,
}
