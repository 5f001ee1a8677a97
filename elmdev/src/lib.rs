//! Development tool for Elm projects.
//!
//! The user configures elmdev in Elm itself: a `Dev` module exports a
//! `config` value describing a tree of tasks. elmdev compiles that module in
//! a throwaway sandbox, decodes the published tree and interprets it against
//! the CLI arguments. The architecture separates:
//!
//! - **Pure logic** ([`tree`], [`interpret`], [`minify`]): decoding,
//!   argument dispatch and source transforms, testable without any process
//!   or filesystem work.
//! - **[`io`]**: the compiler, the node evaluation bridge, sandboxes and the
//!   manifest. Behind traits where tests need to script outcomes.
//! - **Pipelines** ([`load`], [`build`], [`serve`], [`check`]): coordinate
//!   the two to implement the leaf actions.

pub mod actions;
pub mod build;
pub mod check;
pub mod console;
pub mod exit_codes;
pub mod interpret;
pub mod io;
pub mod load;
pub mod logging;
pub mod minify;
pub mod serve;
pub mod templates;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tree;
