//! Production [`ActionRunner`].
//!
//! Binds the interpreter's leaf actions to the real pipelines. Each action
//! receives only its flags; the compiler handle and project root are fixed
//! at construction.

use std::path::PathBuf;

use anyhow::Result;

use crate::build;
use crate::check::{self, SuiteFailure};
use crate::interpret::ActionRunner;
use crate::io::compiler::ElmCompiler;
use crate::serve;
use crate::tree::{BenchmarkFlags, BuildFlags, LogFlags, ServeFlags, TestFlags};

pub struct DevActions<C> {
    compiler: C,
    root: PathBuf,
}

impl<C: ElmCompiler> DevActions<C> {
    pub fn new(compiler: C, root: PathBuf) -> Self {
        Self { compiler, root }
    }
}

impl<C: ElmCompiler> ActionRunner for DevActions<C> {
    fn log(&self, flags: &LogFlags) -> Result<()> {
        match flags {
            LogFlags::Text(text) => println!("{text}"),
            LogFlags::Version => println!("{}", env!("CARGO_PKG_VERSION")),
        }
        Ok(())
    }

    fn build(&self, flags: &BuildFlags) -> Result<()> {
        build::run(&self.compiler, &self.root, flags)
    }

    fn serve(&self, flags: &ServeFlags) -> Result<()> {
        serve::run(&self.compiler, &self.root, flags)
    }

    fn test(&self, flags: &TestFlags) -> Result<()> {
        let exit_code = check::run_tests(&self.compiler, &self.root, flags)?;
        if exit_code != 0 {
            return Err(SuiteFailure { exit_code }.into());
        }
        Ok(())
    }

    fn benchmark(&self, flags: &BenchmarkFlags) -> Result<()> {
        check::run_benchmark(&self.compiler, &self.root, flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedCompiler;

    #[test]
    fn log_actions_never_fail() {
        let actions = DevActions::new(ScriptedCompiler::new(), PathBuf::from("."));
        actions.log(&LogFlags::Text("hello".to_string())).expect("log");
        actions.log(&LogFlags::Version).expect("log");
    }
}
