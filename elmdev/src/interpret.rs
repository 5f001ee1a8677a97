//! Task tree interpreter.
//!
//! Walks the decoded tree against the CLI argument list. Only `OneOf` nodes
//! consume arguments; leaves dispatch to an [`ActionRunner`] and ignore any
//! trailing arguments. The tree shape is author-controlled, so every failure
//! here must be an `Err`, never a panic.

use std::thread;

use anyhow::{Result, anyhow, bail};
use tracing::debug;

use crate::tree::{BenchmarkFlags, BuildFlags, LogFlags, ServeFlags, TaskTree, TestFlags};

/// Dispatch target for leaf actions.
///
/// The interpreter is generic over this trait so tests can script actions
/// without compiling anything or binding sockets. `Sync` because `Batch`
/// children run on scoped threads sharing one runner.
pub trait ActionRunner: Sync {
    fn log(&self, flags: &LogFlags) -> Result<()>;
    fn build(&self, flags: &BuildFlags) -> Result<()>;
    fn serve(&self, flags: &ServeFlags) -> Result<()>;
    fn test(&self, flags: &TestFlags) -> Result<()>;
    fn benchmark(&self, flags: &BenchmarkFlags) -> Result<()>;
}

/// Interpret `tree` against `args`, dispatching leaves to `actions`.
///
/// - `Batch`: children run concurrently with the same `args`. Every child is
///   started and runs to completion; siblings of a failed child are not
///   cancelled. The reported failure is the first failed child in declared
///   order.
/// - `Sequence`: children run strictly in order; the first failure aborts
///   the remainder.
/// - `OneOf`: `args[0]` selects the branch; unknown (or missing) labels fail
///   with the valid labels enumerated in key order.
pub fn run<A: ActionRunner>(tree: &TaskTree, args: &[String], actions: &A) -> Result<()> {
    match tree {
        TaskTree::Batch(children) => {
            debug!(children = children.len(), "running batch");
            let results: Vec<Result<()>> = thread::scope(|scope| {
                let handles: Vec<_> = children
                    .iter()
                    .map(|child| scope.spawn(move || run(child, args, actions)))
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| {
                        handle
                            .join()
                            .unwrap_or_else(|_| Err(anyhow!("batch task panicked")))
                    })
                    .collect()
            });
            for result in results {
                result?;
            }
            Ok(())
        }
        TaskTree::Sequence(children) => {
            debug!(children = children.len(), "running sequence");
            for child in children {
                run(child, args, actions)?;
            }
            Ok(())
        }
        TaskTree::OneOf(branches) => {
            let expected = || {
                branches
                    .keys()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let Some(label) = args.first() else {
                bail!("missing argument: expected one of {}", expected());
            };
            let Some(subtree) = branches.get(label) else {
                bail!("unrecognized argument `{label}`: expected one of {}", expected());
            };
            run(subtree, &args[1..], actions)
        }
        TaskTree::Log(flags) => actions.log(flags),
        TaskTree::Build(flags) => actions.build(flags),
        TaskTree::Serve(flags) => actions.serve(flags),
        TaskTree::Test(flags) => actions.test(flags),
        TaskTree::Benchmark(flags) => actions.benchmark(flags),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingActions, batch, log_text, one_of, sequence};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn leaf_ignores_trailing_arguments() {
        let actions = RecordingActions::new();
        let tree = one_of(vec![("build", log_text("built"))]);

        run(&tree, &args(&["build", "ignored-extra"]), &actions).expect("run");
        assert_eq!(actions.invoked(), vec!["log:built"]);
    }

    #[test]
    fn one_of_unknown_label_enumerates_valid_keys() {
        let actions = RecordingActions::new();
        let tree = one_of(vec![("build", log_text("b")), ("test", log_text("t"))]);

        let err = run(&tree, &args(&["deploy"]), &actions).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unrecognized argument `deploy`: expected one of build, test"
        );
        assert!(actions.invoked().is_empty());
    }

    #[test]
    fn one_of_missing_argument_enumerates_valid_keys() {
        let actions = RecordingActions::new();
        let tree = one_of(vec![("build", log_text("b")), ("test", log_text("t"))]);

        let err = run(&tree, &[], &actions).unwrap_err();
        assert_eq!(err.to_string(), "missing argument: expected one of build, test");
    }

    #[test]
    fn nested_one_of_consumes_arguments_left_to_right() {
        let actions = RecordingActions::new();
        let tree = one_of(vec![(
            "check",
            one_of(vec![("fast", log_text("fast")), ("slow", log_text("slow"))]),
        )]);

        run(&tree, &args(&["check", "slow"]), &actions).expect("run");
        assert_eq!(actions.invoked(), vec!["log:slow"]);
    }

    #[test]
    fn sequence_aborts_on_first_failure() {
        let actions = RecordingActions::failing_on("log:second");
        let tree = sequence(vec![
            log_text("first"),
            log_text("second"),
            log_text("third"),
        ]);

        let err = run(&tree, &[], &actions).unwrap_err();
        assert!(err.to_string().contains("log:second"));
        // Earlier children completed, later ones never started.
        assert_eq!(actions.invoked(), vec!["log:first", "log:second"]);
    }

    #[test]
    fn batch_starts_every_child_even_when_one_fails() {
        let actions = RecordingActions::failing_on("log:bad");
        let tree = batch(vec![log_text("a"), log_text("bad"), log_text("b")]);

        let err = run(&tree, &[], &actions).unwrap_err();
        assert!(err.to_string().contains("log:bad"));
        let mut invoked = actions.invoked();
        invoked.sort();
        assert_eq!(invoked, vec!["log:a", "log:b", "log:bad"]);
    }

    #[test]
    fn batch_children_share_the_same_arguments() {
        let actions = RecordingActions::new();
        let tree = batch(vec![
            one_of(vec![("go", log_text("left"))]),
            one_of(vec![("go", log_text("right"))]),
        ]);

        run(&tree, &args(&["go"]), &actions).expect("run");
        let mut invoked = actions.invoked();
        invoked.sort();
        assert_eq!(invoked, vec!["log:left", "log:right"]);
    }

    #[test]
    fn deeply_nested_tree_interprets_without_overflow() {
        let actions = RecordingActions::new();
        let mut tree = log_text("leaf");
        for _ in 0..500 {
            tree = sequence(vec![tree]);
        }

        run(&tree, &[], &actions).expect("run");
        assert_eq!(actions.invoked(), vec!["log:leaf"]);
    }
}
