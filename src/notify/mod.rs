//! Console output for the crawler, auditor and inspector.

pub mod console;

pub use console::ConsoleOutput;
