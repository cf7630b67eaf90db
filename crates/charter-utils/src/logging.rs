//! Structured logging for the pipeline.
//!
//! All phase events carry `run_id` and `phase` fields so a single run can be
//! followed through interleaved output from concurrent runs.

use tracing::{Level, error, info, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::redaction::redact_error_message;

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise charter crates log at `info`
/// (`debug` when verbose) and dependencies at `warn`. Logs go to stderr so
/// command output on stdout stays machine-readable.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("charter=debug,info")
            } else {
                EnvFilter::try_new("charter=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Span wrapping one phase of one run.
pub fn phase_span(run_id: &str, phase: &str) -> tracing::Span {
    span!(Level::INFO, "phase", run_id = %run_id, phase = %phase)
}

pub fn log_phase_start(run_id: &str, phase: &str) {
    info!(run_id = %run_id, phase = %phase, "Starting phase");
}

pub fn log_phase_complete(run_id: &str, phase: &str, duration_ms: u128) {
    info!(
        run_id = %run_id,
        phase = %phase,
        duration_ms = %duration_ms,
        "Phase completed"
    );
}

/// Error text is redacted before it is emitted.
pub fn log_phase_error(run_id: &str, phase: &str, error: &str, duration_ms: u128) {
    let sanitized = redact_error_message(error);
    error!(
        run_id = %run_id,
        phase = %phase,
        duration_ms = %duration_ms,
        error = %sanitized,
        "Phase failed"
    );
}
