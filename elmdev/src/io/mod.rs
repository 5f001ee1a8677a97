//! Side-effecting helpers: sandboxes, child processes, the compiler
//! boundary and the execution bridge.

pub mod bridge;
pub mod compiler;
pub mod manifest;
pub mod modules;
pub mod process;
pub mod sandbox;
