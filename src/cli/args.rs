//! CLI argument definitions
//!
//! The `Cli` struct and its subcommands, parsed with clap derive.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use charter_config::{PrivacyStrictness, ProviderPreference};
use charter_utils::types::ProviderKind;

/// charter - privacy-gated project documentation pipeline
#[derive(Parser, Debug)]
#[command(name = "charter")]
#[command(about = "Turn a project description into a researched set of planning documents")]
#[command(long_about = r#"
charter discovers research agents for a project description, scans it for
sensitive content, asks for approval, then researches and writes fifteen
planning documents in dependency-ordered batches.

EXAMPLES:
  # Full run with an interactive approval prompt
  charter run --name "Clinic Intake" --description "A web intake form for a rural clinic"

  # Approve automatically, sending the sanitized text
  charter run --name "Clinic Intake" --description "..." --yes --sanitized

  # Only discovery and the privacy scan, no provider calls
  charter discover --name "Clinic Intake" --description "..."

  # Check both generation backends
  charter health

CONFIGURATION:
  Precedence: CLI flags > config file > defaults
  The config file is $CHARTER_HOME/config.toml or the nearest .charter/config.toml
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a run, approve it and wait for the documents
    Run(RunArgs),

    /// Run discovery and the privacy scan without calling any provider
    Discover {
        #[command(flatten)]
        project: ProjectArgs,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Health-check both generation backends
    Health {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration and where each value came from
    Config,
}

/// Project description shared by `run` and `discover`.
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Project name
    #[arg(long)]
    pub name: String,

    /// Project description (10 to 10000 characters)
    #[arg(long)]
    pub description: String,

    /// Additional context appended to the description
    #[arg(long)]
    pub context: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Approve without prompting
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Send the sanitized text instead of the original
    #[arg(long)]
    pub sanitized: bool,

    /// Pin generation to one backend, skipping health checks
    #[arg(long, value_enum)]
    pub pinned: Option<BackendArg>,

    /// Backend health-checked first
    #[arg(long, value_enum)]
    pub prefer: Option<BackendArg>,

    /// Fail instead of falling over to the other backend
    #[arg(long)]
    pub no_fallback: bool,

    /// Behaviour when the privacy scanner fails
    #[arg(long, value_enum)]
    pub strictness: Option<StrictnessArg>,

    /// Root directory for filesystem output
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Maximum concurrent generation calls per batch (1-10)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Emit the final status as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendArg {
    Local,
    Remote,
}

impl From<BackendArg> for ProviderKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Local => ProviderKind::Local,
            BackendArg::Remote => ProviderKind::Remote,
        }
    }
}

impl From<BackendArg> for ProviderPreference {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Local => ProviderPreference::Local,
            BackendArg::Remote => ProviderPreference::Remote,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrictnessArg {
    Strict,
    Permissive,
}

impl From<StrictnessArg> for PrivacyStrictness {
    fn from(arg: StrictnessArg) -> Self {
        match arg {
            StrictnessArg::Strict => PrivacyStrictness::Strict,
            StrictnessArg::Permissive => PrivacyStrictness::Permissive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_flags_parse() {
        let cli = Cli::try_parse_from([
            "charter",
            "run",
            "--name",
            "Clinic Intake",
            "--description",
            "A web intake form for a rural clinic",
            "--yes",
            "--sanitized",
            "--pinned",
            "remote",
            "--no-fallback",
        ])
        .unwrap();

        match cli.command {
            Commands::Run(args) => {
                assert!(args.yes && args.sanitized && args.no_fallback);
                assert_eq!(args.pinned, Some(BackendArg::Remote));
                assert_eq!(args.project.name, "Clinic Intake");
                assert!(args.project.context.is_none());
            }
            other => panic!("Expected Run, got {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["charter", "health", "-v", "--config", "c.toml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(
            Cli::try_parse_from([
                "charter",
                "run",
                "--name",
                "x",
                "--description",
                "long enough text",
                "--pinned",
                "cloud",
            ])
            .is_err()
        );
    }
}
