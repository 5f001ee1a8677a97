//! Driver-program and HTML templates.
//!
//! The test/benchmark drivers are rendered structurally (the user's module
//! and value names are template parameters) instead of spliced into the
//! source with string replacement, so a module or test name containing an
//! anchor token cannot corrupt the generated program.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use minijinja::{Environment, context};

/// Fixed driver compiled in configuration sandboxes; publishes the encoded
/// task tree as its single output message.
pub const RUN_MAIN: &str = include_str!("templates/RunMain.elm");

const RUN_TEST: &str = include_str!("templates/RunTest.elm.jinja");
const RUN_BENCHMARK: &str = include_str!("templates/RunBenchmark.elm.jinja");
const BOOTSTRAP: &str = include_str!("templates/bootstrap.js.jinja");
const DOCUMENT: &str = include_str!("templates/document.html");
const ERROR_PAGE: &str = include_str!("templates/error.html");

static ENGINE: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.add_template("RunTest.elm", RUN_TEST)
        .expect("test driver template should be valid");
    env.add_template("RunBenchmark.elm", RUN_BENCHMARK)
        .expect("benchmark driver template should be valid");
    // No extension: the flags payload is spliced verbatim and must not be
    // re-escaped by the extension-based auto-escape default.
    env.add_template("bootstrap", BOOTSTRAP)
        .expect("bootstrap template should be valid");
    env.add_template("document.html", DOCUMENT)
        .expect("document template should be valid");
    env.add_template("error.html", ERROR_PAGE)
        .expect("error page template should be valid");
    env
});

/// Driver importing the user's module and running `module.test`.
pub fn render_run_test(module: &str, test: &str) -> Result<String> {
    let rendered = ENGINE
        .get_template("RunTest.elm")?
        .render(context! { module => module, test => test })
        .context("render test driver")?;
    Ok(rendered)
}

/// Driver importing the user's module and running `module.benchmark`.
pub fn render_run_benchmark(module: &str, benchmark: &str) -> Result<String> {
    let rendered = ENGINE
        .get_template("RunBenchmark.elm")?
        .render(context! { module => module, benchmark => benchmark })
        .context("render benchmark driver")?;
    Ok(rendered)
}

/// JS tail that initializes the compiled program against the private scope
/// and forwards every port message to stdout as one JSON line.
///
/// `flags` is pre-serialized JSON; `None` initializes without flags.
pub fn render_bootstrap(module: &str, flags: Option<&str>) -> Result<String> {
    let rendered = ENGINE
        .get_template("bootstrap")?
        .render(context! { module => module, flags => flags })
        .context("render bootstrap")?;
    Ok(rendered)
}

/// Generated HTML document that loads and boots the built artifact.
pub fn render_document(module: &str, output_path: &str) -> Result<String> {
    let rendered = ENGINE
        .get_template("document.html")?
        .render(context! { module => module, output_path => output_path })
        .context("render document")?;
    Ok(rendered)
}

/// Error page wrapping an already-escaped diagnostic body.
pub fn render_error_page(diagnostic_html: &str) -> Result<String> {
    let rendered = ENGINE
        .get_template("error.html")?
        .render(context! { diagnostic => diagnostic_html })
        .context("render error page")?;
    Ok(rendered)
}
