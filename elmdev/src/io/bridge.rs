//! Execution bridge for compiled programs.
//!
//! A compiled driver is a side-effecting script expecting to install itself
//! on the ambient scope and publish values over its `output` port. Instead
//! of evaluating it in-process, the bridge rewrites it against a private
//! scope object, appends a bootstrap tail that forwards every port message
//! to stdout as one JSON line, and runs the whole thing under `node` in the
//! sandbox. Each invocation is its own subprocess, so nothing leaks between
//! runs.

use std::io::{BufRead, BufReader, Read};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;

use anyhow::{Context, Result, anyhow, bail};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::templates;

/// A compiled program ready to run under the bridge.
pub struct BridgeProgram<'a> {
    /// Sandbox the program was compiled in; also the working directory.
    pub sandbox: &'a Path,
    /// Compiled script emitted by the compiler.
    pub compiled_path: &'a Path,
    /// Elm module to initialize (`Main`, `RunTest`, ...).
    pub module_name: &'a str,
    /// Init flags, or `None` for flagless programs.
    pub flags: Option<Value>,
}

/// Run the program and return the first value it publishes.
///
/// At most one value is ever read; anything the program publishes after the
/// first message is discarded and the child is reaped. If the program fails
/// to load or evaluate (the child exits before publishing), that failure is
/// a programming-error class and propagates as the child's stderr text.
pub fn run_once(program: &BridgeProgram) -> Result<Value> {
    run_streaming(program, |value: Value| Ok(ControlFlow::Break(value)))
}

/// Run the program, feeding every published record to `on_record` until it
/// breaks with a final value.
///
/// This is the repeating-message variant used by tests and benchmarks: the
/// host stays alive across any number of asynchronous messages and only
/// stops reading when `on_record` observes a terminal one. A child that
/// exits before a terminal record is an error.
#[instrument(skip_all, fields(module = program.module_name))]
pub fn run_streaming<T, B>(
    program: &BridgeProgram,
    mut on_record: impl FnMut(T) -> Result<ControlFlow<B>>,
) -> Result<B>
where
    T: DeserializeOwned,
{
    let entry = write_entry(program)?;
    let mut child = spawn_runtime(program.sandbox, &entry)?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;
    let stderr_handle = thread::spawn(move || {
        let mut buf = String::new();
        let mut reader = stderr;
        let _ = reader.read_to_string(&mut buf);
        buf
    });

    let mut reader = BufReader::new(stdout);
    let mut line = String::new();
    loop {
        line.clear();
        let read = reader.read_line(&mut line).context("read bridge output")?;
        if read == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record: T = serde_json::from_str(trimmed)
            .with_context(|| format!("decode bridge record: {trimmed}"))?;
        if let ControlFlow::Break(value) = on_record(record)? {
            // Terminal record observed; the program may keep publishing but
            // nothing further is read.
            let _ = child.kill();
            let _ = child.wait();
            debug!("bridge finished on terminal record");
            return Ok(value);
        }
    }

    // The child ended without a terminal record.
    let status = child.wait().context("wait for runtime")?;
    let stderr_text = stderr_handle.join().unwrap_or_default();
    if !status.success() {
        bail!("failed to evaluate compiled program:\n{stderr_text}");
    }
    bail!("compiled program exited without publishing a terminal message");
}

/// Materialize the runnable entry script in the sandbox.
///
/// Layout: private scope declaration, the compiled script with its ambient
/// `(this)` binding redirected to that scope, then the bootstrap tail.
fn write_entry(program: &BridgeProgram) -> Result<PathBuf> {
    let compiled = std::fs::read_to_string(program.compiled_path)
        .with_context(|| format!("read {}", program.compiled_path.display()))?;

    let flags_json = match &program.flags {
        Some(value) => Some(serde_json::to_string(value).context("serialize init flags")?),
        None => None,
    };

    let mut source = String::with_capacity(compiled.len() + 256);
    source.push_str("const scope = {};\n");
    source.push_str(&compiled.replacen("(this)", "(scope)", 1));
    source.push('\n');
    source.push_str(&templates::render_bootstrap(
        program.module_name,
        flags_json.as_deref(),
    )?);

    let entry = program.sandbox.join("run.js");
    std::fs::write(&entry, source).with_context(|| format!("write {}", entry.display()))?;
    Ok(entry)
}

fn spawn_runtime(sandbox: &Path, entry: &Path) -> Result<Child> {
    let mut cmd = Command::new("node");
    cmd.arg(entry)
        .current_dir(sandbox)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    debug!(entry = %entry.display(), "spawning javascript runtime");
    cmd.spawn().context("spawn node")
}
