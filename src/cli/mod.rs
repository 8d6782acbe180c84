//! Command-line interface for jobharvest.

mod commands;

pub use commands::{is_verbose, run};
