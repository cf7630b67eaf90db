//! Command-line interface for charter
//!
//! - `args`: clap definitions
//! - `run`: entry point and dispatch
//! - `commands`: one module per subcommand

pub mod args;
mod commands;
mod run;

pub use args::{Cli, Commands, ProjectArgs, RunArgs};
pub use run::run;
