//! Test and benchmark execution.
//!
//! A generated driver wraps the user's test or benchmark value, gets
//! compiled in a sandbox and runs under the streaming bridge. Unlike
//! configuration loading, the driver publishes repeatedly: each record
//! carries the report text so far plus running totals, and the host keeps
//! reading until a terminal record arrives.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::console::{Color, paint};
use crate::io::bridge::{self, BridgeProgram};
use crate::io::compiler::ElmCompiler;
use crate::io::sandbox::with_sandbox;
use crate::templates;
use crate::tree::{BenchmarkFlags, Mode, TestFlags};

/// A test suite finished with a non-zero exit code.
///
/// Carried as a typed error so the CLI root can mirror the suite's exit
/// code instead of the generic failure code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuiteFailure {
    pub exit_code: i32,
}

impl fmt::Display for SuiteFailure {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "test suite failed with exit code {}", self.exit_code)
    }
}

impl std::error::Error for SuiteFailure {}

/// One streamed record from the test driver.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    /// Report text so far; expected to grow monotonically across records.
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub passed: u64,
    #[serde(default)]
    pub failed: u64,
    /// Terminal exit code; `None` while the run is still pending.
    #[serde(default)]
    pub exit_code: Option<i32>,
}

/// Incrementally printed aggregation of test records.
#[derive(Debug, Default)]
pub struct TestReport {
    printed: usize,
    pub passed: u64,
    pub failed: u64,
}

/// Print whatever part of `message` has not been printed yet.
///
/// Messages come from an external runtime and are expected to grow
/// monotonically, but that is not enforced there: a message that does not
/// extend the previous one (shorter, or diverging inside a multi-byte
/// character) is printed whole instead of byte-sliced.
fn write_unseen(printed: &mut usize, message: &str, out: &mut impl Write) -> io::Result<()> {
    if message.len() <= *printed {
        return Ok(());
    }
    match message.get(*printed..) {
        Some(tail) => out.write_all(tail.as_bytes())?,
        None => out.write_all(message.as_bytes())?,
    }
    out.flush()?;
    *printed = message.len();
    Ok(())
}

impl TestReport {
    /// Absorb one record: print the unseen tail of the message, take over
    /// the running totals, and stop on a terminal exit code.
    pub fn absorb(
        &mut self,
        record: &TestRecord,
        out: &mut impl Write,
    ) -> io::Result<ControlFlow<i32>> {
        write_unseen(&mut self.printed, &record.message, out)?;
        self.passed = record.passed;
        self.failed = record.failed;
        Ok(match record.exit_code {
            Some(exit_code) => ControlFlow::Break(exit_code),
            None => ControlFlow::Continue(()),
        })
    }
}

/// Effective fuzzer seed: the caller's when given, random otherwise.
///
/// The chosen seed is always echoed so a run can be reproduced by
/// re-supplying it.
pub fn resolve_seed(seed: Option<u32>) -> u32 {
    seed.unwrap_or_else(rand::random)
}

fn write_seed_echo(out: &mut impl Write, flags: &TestFlags, seed: u32) -> io::Result<()> {
    writeln!(
        out,
        "{} running {}.{} with seed {seed} and {} fuzz iterations",
        paint(Color::Blue, "▶"),
        flags.module_name,
        flags.test_name,
        flags.fuzz,
    )
}

/// Compile and run the test driver, returning the suite's exit code.
#[instrument(skip_all, fields(module = %flags.module_name, test = %flags.test_name))]
pub fn run_tests(compiler: &impl ElmCompiler, root: &Path, flags: &TestFlags) -> Result<i32> {
    with_sandbox("elmdev-test", |sandbox| {
        let driver_path = sandbox.join("RunTest.elm");
        fs::write(
            &driver_path,
            templates::render_run_test(&flags.module_name, &flags.test_name)?,
        )
        .with_context(|| format!("write {}", driver_path.display()))?;

        let compiled_path = sandbox.join("runTest.js");
        compiler.compile(&driver_path, Mode::Develop, root, &compiled_path)?;

        let seed = resolve_seed(flags.seed);
        let mut report = TestReport::default();
        let mut stdout = io::stdout();
        write_seed_echo(&mut stdout, flags, seed)?;
        let exit_code = bridge::run_streaming(
            &BridgeProgram {
                sandbox,
                compiled_path: &compiled_path,
                module_name: "RunTest",
                flags: Some(json!({ "seed": seed, "fuzz": flags.fuzz })),
            },
            |record: TestRecord| Ok(report.absorb(&record, &mut stdout)?),
        )?;

        info!(
            passed = report.passed,
            failed = report.failed,
            exit_code,
            "test run finished"
        );
        Ok(exit_code)
    })
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BenchmarkStatus {
    Running,
    Done,
}

/// One streamed record from the benchmark driver. Benchmarks have no
/// pass/fail notion, so there is no exit code, only a done marker.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkRecord {
    #[serde(default)]
    pub message: String,
    pub status: BenchmarkStatus,
}

/// Incrementally printed aggregation of benchmark records.
#[derive(Debug, Default)]
pub struct BenchmarkReport {
    printed: usize,
}

impl BenchmarkReport {
    pub fn absorb(
        &mut self,
        record: &BenchmarkRecord,
        out: &mut impl Write,
    ) -> io::Result<ControlFlow<()>> {
        write_unseen(&mut self.printed, &record.message, out)?;
        Ok(match record.status {
            BenchmarkStatus::Done => ControlFlow::Break(()),
            BenchmarkStatus::Running => ControlFlow::Continue(()),
        })
    }
}

/// Compile and run the benchmark driver until it reports done.
#[instrument(skip_all, fields(module = %flags.module_name, benchmark = %flags.benchmark_name))]
pub fn run_benchmark(
    compiler: &impl ElmCompiler,
    root: &Path,
    flags: &BenchmarkFlags,
) -> Result<()> {
    with_sandbox("elmdev-benchmark", |sandbox| {
        let driver_path = sandbox.join("RunBenchmark.elm");
        fs::write(
            &driver_path,
            templates::render_run_benchmark(&flags.module_name, &flags.benchmark_name)?,
        )
        .with_context(|| format!("write {}", driver_path.display()))?;

        let compiled_path = sandbox.join("runBenchmark.js");
        compiler.compile(&driver_path, Mode::Develop, root, &compiled_path)?;

        let mut report = BenchmarkReport::default();
        let mut stdout = io::stdout();
        bridge::run_streaming(
            &BridgeProgram {
                sandbox,
                compiled_path: &compiled_path,
                module_name: "RunBenchmark",
                flags: None,
            },
            |record: BenchmarkRecord| Ok(report.absorb(&record, &mut stdout)?),
        )?;

        println!(
            "\n{} ran with the node javascript runtime",
            paint(Color::Green, "▶"),
        );
        info!("benchmark run finished");
        Ok(())
    })
}
