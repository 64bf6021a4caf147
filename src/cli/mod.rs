//! Command-line interface for eta-export.

mod commands;
pub mod progress;

pub use commands::{is_verbose, run};
