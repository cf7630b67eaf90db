use serde::{Deserialize, Serialize};

/// Per-finding override in an approval decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingOverride {
    /// Index into the scan's findings.
    pub index: usize,
    /// `true` keeps the original span, `false` replaces it.
    pub keep_original: bool,
}

/// The human decision recorded at the approval gate.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub approved: bool,
    pub use_sanitized: bool,
    #[serde(default)]
    pub overrides: Vec<FindingOverride>,
}

impl ApprovalDecision {
    /// Proceed with the text as submitted.
    #[must_use]
    pub fn approve_original() -> Self {
        Self {
            approved: true,
            use_sanitized: false,
            overrides: Vec::new(),
        }
    }

    /// Proceed with every finding replaced by its placeholder.
    #[must_use]
    pub fn approve_sanitized() -> Self {
        Self {
            approved: true,
            use_sanitized: true,
            overrides: Vec::new(),
        }
    }

    /// Proceed with the original text, keeping each listed finding.
    #[must_use]
    pub fn approve_keeping(indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            approved: true,
            use_sanitized: false,
            overrides: indices
                .into_iter()
                .map(|index| FindingOverride {
                    index,
                    keep_original: true,
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn deny() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_override(mut self, index: usize, keep_original: bool) -> Self {
        self.overrides.push(FindingOverride {
            index,
            keep_original,
        });
        self
    }

    pub(crate) fn override_for(&self, index: usize) -> Option<bool> {
        self.overrides
            .iter()
            .find(|o| o.index == index)
            .map(|o| o.keep_original)
    }

    /// Whether finding `index` is replaced in the resolved text.
    pub(crate) fn replaces(&self, index: usize) -> bool {
        match self.override_for(index) {
            Some(keep) => !keep,
            None => self.use_sanitized,
        }
    }
}
