//! CLI entry point and dispatch
//!
//! `run()` parses arguments, discovers configuration, builds the tokio
//! runtime, dispatches to a command and prints every error itself.

use anyhow::Result;
use clap::Parser;

use charter_config::{CliArgs, Config};
use charter_utils::error::{CharterError, ConfigError};
use charter_utils::exit_codes::ExitCode;
use charter_utils::logging::init_tracing;
use charter_utils::redaction::redact_error_message;

use super::args::{Cli, Commands};
use super::commands;

/// Main CLI execution function.
///
/// Returns `Err(code)` after printing the error; main.rs only exits with it.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("✗ Failed to initialize logging: {e}");
    }

    let cli_args = build_cli_args(&cli);
    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => {
            match err.downcast_ref::<ConfigError>() {
                Some(config_err) => {
                    eprintln!("{}", CharterError::Config(config_err.clone()).display_for_user());
                }
                None => eprintln!("✗ {}", redact_error_message(&format!("{err:#}"))),
            }
            return Err(ExitCode::CLI_ARGS);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let result = rt.block_on(async move {
        match cli.command {
            Commands::Run(args) => commands::execute_run_command(&args, config).await,
            Commands::Discover { project, json } => {
                commands::execute_discover_command(&project, json, config).await
            }
            Commands::Health { json } => commands::execute_health_command(json, config).await,
            Commands::Config => commands::execute_config_command(&config),
        }
    });

    match result {
        Ok(code) if code == ExitCode::SUCCESS => Ok(()),
        Ok(code) => Err(code),
        Err(error) => Err(report_error(&error)),
    }
}

/// Flags that shape process-wide configuration. Per-run choices (backend
/// preference, pinning, fallback, concurrency) travel as run overrides.
fn build_cli_args(cli: &Cli) -> CliArgs {
    let (strictness, output_dir) = match &cli.command {
        Commands::Run(args) => (args.strictness.map(Into::into), args.output_dir.clone()),
        _ => (None, None),
    };
    CliArgs {
        config_path: cli.config.clone(),
        strictness,
        output_dir,
        ..CliArgs::default()
    }
}

fn report_error(error: &anyhow::Error) -> ExitCode {
    if let Some(charter_error) = error.downcast_ref::<CharterError>() {
        eprintln!("{}", charter_error.display_for_user());
        return charter_error.to_exit_code();
    }

    eprintln!("✗ Unexpected error: {}", redact_error_message(&format!("{error:#}")));
    eprintln!("\n  Run with --verbose for more detailed output");
    ExitCode::INTERNAL
}
