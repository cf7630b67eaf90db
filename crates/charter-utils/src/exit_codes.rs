//! Exit code constants for the charter CLI.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Run completed |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid arguments, input or configuration |
//! | 3 | `PRIVACY_BLOCKED` | Approval denied or scan unavailable in strict mode |
//! | 4 | `RUN_FAILED` | Run ended in the `failed` phase |
//! | 10 | `PROVIDER_TIMEOUT` | Provider call timed out |
//! | 70 | `PROVIDER_FAILURE` | Provider unreachable, rejected, or none available |

/// Exit codes matching the table above.
///
/// ```rust
/// use charter_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::from_i32(70), ExitCode::PROVIDER_FAILURE);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - run completed
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments, input or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Privacy blocked - approval denied or scanner unavailable under strict policy
    pub const PRIVACY_BLOCKED: ExitCode = ExitCode(3);

    /// Run failed - the pipeline reached the failed phase
    pub const RUN_FAILED: ExitCode = ExitCode(4);

    /// Provider timeout - a provider call exceeded its timeout
    pub const PROVIDER_TIMEOUT: ExitCode = ExitCode(10);

    /// Provider failure - backend unavailable, rejected, or none selectable
    pub const PROVIDER_FAILURE: ExitCode = ExitCode(70);

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values_are_stable() {
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
        assert_eq!(ExitCode::INTERNAL.as_i32(), 1);
        assert_eq!(ExitCode::CLI_ARGS.as_i32(), 2);
        assert_eq!(ExitCode::PRIVACY_BLOCKED.as_i32(), 3);
        assert_eq!(ExitCode::RUN_FAILED.as_i32(), 4);
        assert_eq!(ExitCode::PROVIDER_TIMEOUT.as_i32(), 10);
        assert_eq!(ExitCode::PROVIDER_FAILURE.as_i32(), 70);
        assert_eq!(i32::from(ExitCode::RUN_FAILED), 4);
    }
}
