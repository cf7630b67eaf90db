//! Privacy scanning and the human approval gate.

mod decision;
mod gate;
mod sanitize;
mod scanner;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use decision::{ApprovalDecision, FindingOverride};
pub use gate::{PrivacyGate, ScanSnapshot};
pub use sanitize::sanitize;
pub use scanner::{
    DEFAULT_PRIVACY_PATTERNS, PrivacyPatternDef, RegexScanner, ScanError, SensitivityScanner,
};
