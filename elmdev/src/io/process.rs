//! Helper for running child processes with piped output.
//!
//! There is deliberately no timeout anywhere: a hung compiler or runtime
//! hangs the enclosing operation. The human re-invoking the tool is the
//! retry mechanism.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, instrument};

/// Run `cmd` to completion, capturing stdout and stderr.
///
/// Returns the stdout text on a zero exit status; stderr chatter from a
/// successful process is ignored. A non-zero exit fails with the captured
/// stderr text verbatim, so compiler diagnostics pass through untouched.
#[instrument(skip_all, fields(program = ?cmd.get_program()))]
pub fn run_piped(mut cmd: Command) -> Result<String> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = cmd.spawn().context("spawn command")?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    // Both pipes are drained concurrently so neither side can deadlock on a
    // full pipe buffer.
    let stdout_handle = thread::spawn(move || read_to_end(stdout));
    let stderr_handle = thread::spawn(move || read_to_end(stderr));

    let status = child.wait().context("wait for command")?;
    let stdout = join_reader(stdout_handle).context("join stdout")?;
    let stderr = join_reader(stderr_handle).context("join stderr")?;

    debug!(exit_code = ?status.code(), "command finished");
    if !status.success() {
        bail!("{}", String::from_utf8_lossy(&stderr));
    }
    Ok(String::from_utf8_lossy(&stdout).into_owned())
}

fn join_reader(handle: thread::JoinHandle<Result<Vec<u8>>>) -> Result<Vec<u8>> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_to_end<R: Read>(mut reader: R) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).context("read output")?;
    Ok(buf)
}
