//! Stable exit codes for the elmdev CLI.
//!
//! Test runs are the exception to the table below: a failing suite exits
//! with whatever code the test driver reported.

/// Every dispatched task succeeded.
pub const OK: i32 = 0;
/// Configuration loading, interpretation or a task failed.
pub const FAILURE: i32 = 1;
