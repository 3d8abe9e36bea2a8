//! Operator-facing output.
//!
//! Colored progress and result reporting on the terminal. JSON reports are
//! written by the binary.

pub mod console;

pub use console::ConsoleOutput;
