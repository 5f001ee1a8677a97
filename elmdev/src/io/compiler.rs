//! Compiler boundary.
//!
//! The [`ElmCompiler`] trait decouples the pipelines from the actual `elm`
//! binary so tests can script compiled output and failures without the
//! compiler installed. A compile failure is always fatal to the calling
//! operation; there is no partial or incremental compilation.

use std::path::Path;
use std::process::Command;

use anyhow::Result;
use tracing::{debug, instrument};

use crate::io::process::run_piped;
use crate::tree::Mode;

/// Abstraction over compiler invocation.
pub trait ElmCompiler: Sync {
    /// Compile `entry` with `cwd` as the working directory, writing the
    /// compiled script to `output`. Fails with the compiler's diagnostic
    /// text when the process exits non-zero.
    fn compile(&self, entry: &Path, mode: Mode, cwd: &Path, output: &Path) -> Result<()>;
}

/// The real `elm make` invocation.
pub struct ElmBinary;

impl ElmCompiler for ElmBinary {
    #[instrument(skip_all, fields(entry = %entry.display(), mode = ?mode))]
    fn compile(&self, entry: &Path, mode: Mode, cwd: &Path, output: &Path) -> Result<()> {
        let mut cmd = Command::new("elm");
        cmd.arg("make");
        if let Some(flag) = mode.compiler_flag() {
            cmd.arg(flag);
        }
        cmd.arg(format!("--output={}", output.display()))
            .arg(entry)
            .current_dir(cwd);

        run_piped(cmd)?;
        debug!(output = %output.display(), "compiled");
        Ok(())
    }
}
