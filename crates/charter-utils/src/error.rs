use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::types::ProjectPhase;

/// Library-level error type with user-friendly reporting.
///
/// `CharterError` is what the orchestrator facade returns to presentation
/// layers. Component errors convert into it with `?`.
///
/// # Exit Code Mapping
///
/// | Exit Code | Error Type |
/// |-----------|------------|
/// | 2 | Configuration errors, invalid input, gate misuse |
/// | 3 | Privacy scan unavailable in strict mode |
/// | 10 | Provider timeout |
/// | 70 | Provider failures |
/// | 1 | Other errors |
///
/// Library code returns `CharterError` and never calls `std::process::exit()`.
#[derive(Error, Debug)]
pub enum CharterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Phase execution error: {0}")]
    Phase(#[from] PhaseError),

    #[error("LLM provider error: {0}")]
    Llm(#[from] LlmError),

    #[error("Approval gate error: {0}")]
    Gate(#[from] GateError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("{what} is not available for run {run_id} in phase {phase}")]
    NotAvailable {
        run_id: String,
        what: String,
        phase: ProjectPhase,
    },

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Run {run_id} is not awaiting approval (phase {phase})")]
    RunNotAwaitingApproval { run_id: String, phase: ProjectPhase },
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    PhaseExecution,
    ProviderIntegration,
    Privacy,
    FileSystem,
    Validation,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::PhaseExecution => write!(f, "Phase Execution"),
            Self::ProviderIntegration => write!(f, "Provider Integration"),
            Self::Privacy => write!(f, "Privacy"),
            Self::FileSystem => write!(f, "File System"),
            Self::Validation => write!(f, "Validation"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(msg) => format!("Configuration file is invalid: {msg}"),
            Self::MissingRequired(key) => format!("Required setting '{key}' is missing"),
            Self::InvalidValue { key, value } => {
                format!("Setting '{key}' has an invalid value: {value}")
            }
            Self::NotFound { path } => format!("No configuration file at {path}"),
        }
    }

    fn context(&self) -> Option<String> {
        Some(
            "Configuration is read from --config, $CHARTER_HOME/config.toml, or the nearest .charter/config.toml."
                .to_string(),
        )
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax of the configuration file".to_string(),
                "Run 'charter config' to print the effective configuration".to_string(),
            ],
            Self::MissingRequired(key) => vec![format!("Add '{key}' to the configuration file")],
            Self::InvalidValue { key, .. } => vec![
                format!("Correct the value of '{key}'"),
                "Remove the key to fall back to the default".to_string(),
            ],
            Self::NotFound { .. } => vec![
                "Check the path passed with --config".to_string(),
                "Create .charter/config.toml in the project directory".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// LLM provider errors.
///
/// The first three variants are per-call and are absorbed by the owning
/// component's per-unit failure policy. `NoProviderAvailable` ends the phase.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Backend unreachable or returning 5xx after retries
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Call exceeded its configured duration
    #[error("Provider timed out after {duration:?}")]
    ProviderTimeout { duration: Duration },

    /// Backend rejected the request (validation, content policy, auth, rate limit)
    #[error("Provider rejected request: {0}")]
    ProviderRejected(String),

    /// Preferred backend unhealthy and fallback disabled
    #[error("No provider available: {0}")]
    NoProviderAvailable(String),

    /// Backend could not be constructed from configuration
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),
}

impl LlmError {
    /// Whether this error should end the whole phase rather than one unit.
    #[must_use]
    pub const fn is_phase_terminal(&self) -> bool {
        matches!(self, Self::NoProviderAvailable(_) | Self::Misconfiguration(_))
    }
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        match self {
            Self::ProviderUnavailable(msg) => format!("LLM provider could not be reached: {msg}"),
            Self::ProviderTimeout { duration } => {
                format!("LLM call timed out after {} seconds", duration.as_secs())
            }
            Self::ProviderRejected(msg) => format!("LLM provider rejected the request: {msg}"),
            Self::NoProviderAvailable(msg) => format!("No generation provider is available: {msg}"),
            Self::Misconfiguration(msg) => format!("LLM configuration error: {msg}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::ProviderUnavailable(_) => Some(
                "The backend refused the connection or kept returning server errors.".to_string(),
            ),
            Self::ProviderTimeout { .. } => {
                Some("Each provider call carries its own timeout.".to_string())
            }
            Self::ProviderRejected(_) => Some(
                "Rejections include invalid requests, authentication failures and rate limits."
                    .to_string(),
            ),
            Self::NoProviderAvailable(_) => Some(
                "The preferred backend failed its health check and fallback is disabled."
                    .to_string(),
            ),
            Self::Misconfiguration(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::ProviderUnavailable(_) => vec![
                "Check that the provider endpoint is reachable".to_string(),
                "Run 'charter health' to probe both backends".to_string(),
            ],
            Self::ProviderTimeout { .. } => vec![
                "Increase call_timeout_secs in the configuration".to_string(),
                "Lower max_tokens to shorten responses".to_string(),
            ],
            Self::ProviderRejected(_) => vec![
                "Verify the API key environment variable is set and valid".to_string(),
                "Wait and retry if the provider is rate limiting".to_string(),
            ],
            Self::NoProviderAvailable(_) => vec![
                "Start the local inference server".to_string(),
                "Set generation.fallback_enabled = true to allow the remote backend".to_string(),
                "Pin a backend with --pinned local|remote".to_string(),
            ],
            Self::Misconfiguration(_) => vec![
                "Check the [providers] section of the configuration".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Misconfiguration(_) => ErrorCategory::Configuration,
            _ => ErrorCategory::ProviderIntegration,
        }
    }
}

/// Approval gate errors. Misuse variants never touch run state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("A decision has already been recorded for run {run_id}")]
    AlreadyDecided { run_id: String },

    #[error("Invalid approval decision: {0}")]
    InvalidDecision(String),

    #[error("Sensitivity scan unavailable: {0}")]
    ScanUnavailable(String),

    #[error("Run {run_id} has not been scanned")]
    NotScanned { run_id: String },

    #[error("Run {run_id} has no approving decision")]
    NotApproved { run_id: String },
}

impl UserFriendlyError for GateError {
    fn user_message(&self) -> String {
        match self {
            Self::AlreadyDecided { run_id } => {
                format!("Run {run_id} has already been approved or denied")
            }
            Self::InvalidDecision(msg) => format!("The approval decision is inconsistent: {msg}"),
            Self::ScanUnavailable(msg) => format!("The privacy scan could not run: {msg}"),
            Self::NotScanned { run_id } => format!("Run {run_id} has no privacy scan yet"),
            Self::NotApproved { run_id } => {
                format!("Run {run_id} cannot proceed without approval")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::ScanUnavailable(_) => Some(
                "In strict mode no research or generation call is made without a scan.".to_string(),
            ),
            Self::InvalidDecision(_) => Some(
                "Findings at or above the confidence threshold must be overridden or sanitized."
                    .to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::ScanUnavailable(_) => vec![
                "Retry the run".to_string(),
                "Set privacy.strictness = \"permissive\" to continue without findings".to_string(),
            ],
            Self::InvalidDecision(_) => vec![
                "Approve with the sanitized text".to_string(),
                "Override each blocking finding explicitly".to_string(),
            ],
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Privacy
    }
}

/// Phase-level errors that drive a run to `failed`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PhaseError {
    #[error("all {failed} agents in the first research batch failed ({reason})")]
    AgentBatchExhausted { failed: usize, reason: String },

    #[error("document batch {batch} produced no documents ({reason})")]
    DocumentBatchExhausted { batch: usize, reason: String },

    #[error("invalid phase transition from {from} to {to}")]
    InvalidTransition { from: ProjectPhase, to: ProjectPhase },

    #[error("invalid agent graph: {0}")]
    InvalidAgentGraph(String),

    #[error("run cancelled during {phase}")]
    Cancelled { phase: ProjectPhase },

    #[error(transparent)]
    Provider(#[from] LlmError),
}

impl UserFriendlyError for PhaseError {
    fn user_message(&self) -> String {
        match self {
            Self::Provider(err) => err.user_message(),
            other => other.to_string(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::AgentBatchExhausted { .. } => Some(
                "Without any first-batch research there is no context to build on.".to_string(),
            ),
            Self::DocumentBatchExhausted { .. } => Some(
                "Later batches read earlier ones, so an empty batch stops generation.".to_string(),
            ),
            Self::Provider(err) => err.context(),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Provider(err) => err.suggestions(),
            Self::AgentBatchExhausted { .. } | Self::DocumentBatchExhausted { .. } => vec![
                "Run 'charter health' to check provider availability".to_string(),
                "Inspect the log output for per-unit failures".to_string(),
            ],
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Provider(err) => err.category(),
            _ => ErrorCategory::PhaseExecution,
        }
    }
}

/// Output destination errors. One destination failing never blocks another.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OutputError {
    #[error("{destination}: failed to write {path}: {reason}")]
    Write {
        destination: String,
        path: String,
        reason: String,
    },

    #[error("{destination}: command '{command}' failed: {reason}")]
    Command {
        destination: String,
        command: String,
        reason: String,
    },

    #[error("{destination}: request failed: {reason}")]
    Http { destination: String, reason: String },

    #[error("{destination}: not configured: {reason}")]
    Misconfigured { destination: String, reason: String },
}

impl UserFriendlyError for OutputError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        Some("Generated documents remain available from the run result.".to_string())
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Write { .. } => vec!["Check permissions on the output directory".to_string()],
            Self::Command { .. } => vec!["Check that git is installed and on PATH".to_string()],
            Self::Http { .. } => vec!["Verify the wiki API URL and key".to_string()],
            Self::Misconfigured { .. } => vec!["Check the [output] section".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::FileSystem
    }
}

impl UserFriendlyError for CharterError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.user_message(),
            Self::Phase(e) => e.user_message(),
            Self::Llm(e) => e.user_message(),
            Self::Gate(e) => e.user_message(),
            Self::Output(e) => e.user_message(),
            Self::Io(e) => format!("File system error: {e}"),
            other => other.to_string(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(e) => e.context(),
            Self::Phase(e) => e.context(),
            Self::Llm(e) => e.context(),
            Self::Gate(e) => e.context(),
            Self::Output(e) => e.context(),
            Self::NotAvailable { .. } => {
                Some("Results are projections of the run's current phase.".to_string())
            }
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(e) => e.suggestions(),
            Self::Phase(e) => e.suggestions(),
            Self::Llm(e) => e.suggestions(),
            Self::Gate(e) => e.suggestions(),
            Self::Output(e) => e.suggestions(),
            Self::InvalidInput { field, .. } => vec![format!("Correct the {field} and resubmit")],
            Self::NotAvailable { .. } => vec!["Poll the run status and retry later".to_string()],
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(e) => e.category(),
            Self::Phase(e) => e.category(),
            Self::Llm(e) => e.category(),
            Self::Gate(e) => e.category(),
            Self::Output(e) => e.category(),
            Self::Io(_) => ErrorCategory::FileSystem,
            _ => ErrorCategory::Validation,
        }
    }
}

impl CharterError {
    /// Get a user-friendly error message with context and actionable suggestions.
    ///
    /// Credentials are redacted from the rendered text.
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error: {}\n", self.user_message()));

        if let Some(ctx) = self.context() {
            output.push_str(&format!("\nContext: {}\n", ctx));
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in suggestions {
                output.push_str(&format!("  • {}\n", suggestion));
            }
        }

        crate::redaction::redact_error_message(&output)
    }

    /// Map this error to the CLI exit code.
    #[must_use]
    pub fn to_exit_code(&self) -> crate::exit_codes::ExitCode {
        use crate::exit_codes::ExitCode;

        match self {
            CharterError::Config(_) => ExitCode::CLI_ARGS,
            CharterError::InvalidInput { .. } => ExitCode::CLI_ARGS,
            CharterError::RunNotFound { .. } => ExitCode::CLI_ARGS,
            CharterError::RunNotAwaitingApproval { .. } => ExitCode::CLI_ARGS,

            CharterError::Gate(GateError::ScanUnavailable(_)) => ExitCode::PRIVACY_BLOCKED,
            CharterError::Gate(_) => ExitCode::CLI_ARGS,

            CharterError::Phase(PhaseError::InvalidTransition { .. }) => ExitCode::CLI_ARGS,
            CharterError::Phase(PhaseError::Provider(llm)) => llm_exit_code(llm),
            CharterError::Phase(_) => ExitCode::RUN_FAILED,

            CharterError::Llm(llm) => llm_exit_code(llm),

            _ => ExitCode::INTERNAL,
        }
    }
}

fn llm_exit_code(err: &LlmError) -> crate::exit_codes::ExitCode {
    use crate::exit_codes::ExitCode;
    match err {
        LlmError::ProviderTimeout { .. } => ExitCode::PROVIDER_TIMEOUT,
        LlmError::Misconfiguration(_) => ExitCode::CLI_ARGS,
        LlmError::ProviderUnavailable(_)
        | LlmError::ProviderRejected(_)
        | LlmError::NoProviderAvailable(_) => ExitCode::PROVIDER_FAILURE,
    }
}
