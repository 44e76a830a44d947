//! Library half of the `medai` binary: argument parsing, commands, console.

pub mod cli;
pub mod commands;
pub mod console;
pub mod telemetry;

pub use cli::{Cli, Command};
