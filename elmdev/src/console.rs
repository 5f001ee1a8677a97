//! ANSI color helpers for user-facing report lines.
//!
//! Diagnostics go through tracing; these are for the product output the
//! user reads (build confirmations, seed echoes, benchmark footers).

#[derive(Debug, Clone, Copy)]
pub enum Color {
    Green = 32,
    Blue = 34,
}

/// Wrap `text` in the ANSI escape for `color`.
pub fn paint(color: Color, text: &str) -> String {
    format!("\u{001b}[{}m{text}\u{001b}[0m", color as u8)
}
