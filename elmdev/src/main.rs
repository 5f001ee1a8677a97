use std::env;
use std::path::{Path, PathBuf};

use anyhow::Result;

use elmdev::actions::DevActions;
use elmdev::check::SuiteFailure;
use elmdev::io::compiler::ElmBinary;
use elmdev::{exit_codes, interpret, load, logging};

/// Points at a local `DevElm.elm` to develop against an unreleased package.
const DEV_OVERRIDE_VAR: &str = "ELMDEV_DEV_PATH";

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        let exit_code = match err.downcast_ref::<SuiteFailure>() {
            Some(failure) => failure.exit_code,
            None => exit_codes::FAILURE,
        };
        std::process::exit(exit_code);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let root = Path::new(".");
    let dev_override = env::var_os(DEV_OVERRIDE_VAR).map(PathBuf::from);

    let compiler = ElmBinary;
    let tree = load::load_configuration(&compiler, root, dev_override.as_deref())?;
    let actions = DevActions::new(compiler, root.to_path_buf());
    interpret::run(&tree, &args, &actions)
}
