//! CLI command implementations.

mod common;
mod config;
mod discover;
mod health;
mod run;

pub use config::execute_config_command;
pub use discover::execute_discover_command;
pub use health::execute_health_command;
pub use run::execute_run_command;
