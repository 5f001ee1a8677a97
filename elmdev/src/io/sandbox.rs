//! Ephemeral working directories for compile-and-run cycles.
//!
//! A sandbox is bound to exactly one operation: created immediately before
//! use, removed recursively afterward on both the success and failure path,
//! never reused and never nested.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

/// Run `body` inside a fresh unique temporary directory.
///
/// The directory is removed after `body` returns, whatever the outcome. A
/// failing body has its error re-raised after cleanup. A failing cleanup
/// propagates on the success path; when both fail, the body's error wins and
/// the cleanup failure is only logged.
pub fn with_sandbox<T>(prefix: &str, body: impl FnOnce(&Path) -> Result<T>) -> Result<T> {
    let dir = tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .context("create sandbox directory")?;
    debug!(path = %dir.path().display(), "sandbox created");

    match body(dir.path()) {
        Ok(value) => {
            dir.close().context("remove sandbox directory")?;
            Ok(value)
        }
        Err(err) => {
            if let Err(cleanup) = dir.close() {
                tracing::warn!(err = %cleanup, "sandbox cleanup failed");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn sandbox_is_removed_on_success() {
        let mut seen = PathBuf::new();
        let value = with_sandbox("elmdev-test", |path| {
            seen = path.to_path_buf();
            assert!(path.is_dir());
            fs::write(path.join("scratch.txt"), "data")?;
            Ok(42)
        })
        .expect("sandbox");

        assert_eq!(value, 42);
        assert!(!seen.exists());
    }

    #[test]
    fn sandbox_is_removed_on_failure_and_error_propagates() {
        let mut seen = PathBuf::new();
        let err = with_sandbox::<()>("elmdev-test", |path| {
            seen = path.to_path_buf();
            fs::write(path.join("scratch.txt"), "data")?;
            Err(anyhow!("body failed"))
        })
        .unwrap_err();

        assert_eq!(err.to_string(), "body failed");
        assert!(!seen.exists());
    }

    #[test]
    fn sandboxes_never_share_a_path() {
        with_sandbox("elmdev-test", |outer| {
            let outer = outer.to_path_buf();
            with_sandbox("elmdev-test", |inner| {
                assert_ne!(outer, inner);
                Ok(())
            })
        })
        .expect("sandbox");
    }

    #[test]
    fn prefix_hint_is_honored() {
        with_sandbox("elmdev-prefix", |path| {
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default();
            assert!(name.starts_with("elmdev-prefix"));
            Ok(())
        })
        .expect("sandbox");
    }
}
