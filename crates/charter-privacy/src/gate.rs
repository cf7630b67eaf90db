//! The approval gate.
//!
//! A run is scanned once. The scan is the authoritative snapshot for that run
//! and downstream phases read project text only through
//! [`PrivacyGate::resolved_text`], which refuses to answer until an approving
//! decision exists.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{info, warn};

use charter_config::{PrivacyConfig, PrivacyStrictness};
use charter_utils::error::GateError;
use charter_utils::types::{PrivacyFinding, RunId};

use crate::decision::ApprovalDecision;
use crate::sanitize::sanitize;
use crate::scanner::SensitivityScanner;

/// Result of scanning one run's text.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSnapshot {
    pub findings: Vec<PrivacyFinding>,
    /// Indices of findings at or above the confidence threshold.
    pub blocking: Vec<usize>,
    /// The scanner failed and permissive mode substituted zero findings.
    pub degraded: bool,
}

#[derive(Debug)]
struct GateRecord {
    text: String,
    snapshot: ScanSnapshot,
    decision: Option<ApprovalDecision>,
}

pub struct PrivacyGate {
    scanner: Arc<dyn SensitivityScanner>,
    strictness: PrivacyStrictness,
    threshold: f64,
    scan_timeout: Duration,
    records: Mutex<HashMap<RunId, GateRecord>>,
}

impl PrivacyGate {
    pub fn new(scanner: Arc<dyn SensitivityScanner>, config: &PrivacyConfig) -> Self {
        Self {
            scanner,
            strictness: config.strictness,
            threshold: config.confidence_threshold,
            scan_timeout: Duration::from_secs(config.scan_timeout_secs),
            records: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn records(&self) -> MutexGuard<'_, HashMap<RunId, GateRecord>> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Scan `text` for `run_id`.
    ///
    /// A run that already has a snapshot gets it back unchanged.
    ///
    /// # Errors
    ///
    /// `GateError::ScanUnavailable` when the scanner fails or times out in
    /// strict mode.
    pub async fn scan(&self, run_id: &RunId, text: &str) -> Result<ScanSnapshot, GateError> {
        if let Some(existing) = self.records().get(run_id) {
            return Ok(existing.snapshot.clone());
        }

        let outcome = match tokio::time::timeout(self.scan_timeout, self.scanner.scan(text)).await
        {
            Ok(Ok(findings)) => Ok(findings),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "scanner did not answer within {}s",
                self.scan_timeout.as_secs_f64()
            )),
        };

        let (findings, degraded) = match outcome {
            Ok(findings) => (valid_findings(text, findings), false),
            Err(reason) => match self.strictness {
                PrivacyStrictness::Strict => {
                    warn!(run_id = %run_id, reason = %reason, "Privacy scan unavailable, blocking run");
                    return Err(GateError::ScanUnavailable(reason));
                }
                PrivacyStrictness::Permissive => {
                    warn!(
                        run_id = %run_id,
                        reason = %reason,
                        "Privacy scan unavailable, continuing with zero findings"
                    );
                    (Vec::new(), true)
                }
            },
        };

        let blocking = findings
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_blocking(self.threshold))
            .map(|(i, _)| i)
            .collect::<Vec<_>>();

        info!(
            run_id = %run_id,
            findings = findings.len(),
            blocking = blocking.len(),
            degraded,
            "Privacy scan complete"
        );

        let snapshot = ScanSnapshot {
            findings,
            blocking,
            degraded,
        };
        self.records().insert(
            run_id.clone(),
            GateRecord {
                text: text.to_string(),
                snapshot: snapshot.clone(),
                decision: None,
            },
        );
        Ok(snapshot)
    }

    /// Record the human decision for `run_id`. Misuse leaves the record
    /// untouched.
    ///
    /// # Errors
    ///
    /// - `NotScanned` if the run has no snapshot
    /// - `AlreadyDecided` on a second call
    /// - `InvalidDecision` for inconsistent decisions
    pub fn record_decision(
        &self,
        run_id: &RunId,
        decision: ApprovalDecision,
    ) -> Result<(), GateError> {
        let mut records = self.records();
        let record = records.get_mut(run_id).ok_or_else(|| GateError::NotScanned {
            run_id: run_id.to_string(),
        })?;

        if record.decision.is_some() {
            return Err(GateError::AlreadyDecided {
                run_id: run_id.to_string(),
            });
        }

        validate_decision(&decision, &record.snapshot)?;

        info!(
            run_id = %run_id,
            approved = decision.approved,
            sanitized = decision.use_sanitized,
            overrides = decision.overrides.len(),
            "Approval decision recorded"
        );
        record.decision = Some(decision);
        Ok(())
    }

    /// The project text downstream phases are allowed to see.
    ///
    /// # Errors
    ///
    /// `NotScanned` without a snapshot, `NotApproved` without an approving
    /// decision.
    pub fn resolved_text(&self, run_id: &RunId) -> Result<String, GateError> {
        let records = self.records();
        let record = records.get(run_id).ok_or_else(|| GateError::NotScanned {
            run_id: run_id.to_string(),
        })?;

        match &record.decision {
            Some(decision) if decision.approved => Ok(sanitize(
                &record.text,
                &record.snapshot.findings,
                |i| decision.replaces(i),
            )),
            _ => Err(GateError::NotApproved {
                run_id: run_id.to_string(),
            }),
        }
    }

    #[must_use]
    pub fn snapshot(&self, run_id: &RunId) -> Option<ScanSnapshot> {
        self.records().get(run_id).map(|r| r.snapshot.clone())
    }

    #[must_use]
    pub fn decision(&self, run_id: &RunId) -> Option<ApprovalDecision> {
        self.records().get(run_id).and_then(|r| r.decision.clone())
    }
}

fn valid_findings(text: &str, findings: Vec<PrivacyFinding>) -> Vec<PrivacyFinding> {
    findings
        .into_iter()
        .filter(|f| {
            let ok = f.start < f.end
                && f.end <= text.len()
                && text.is_char_boundary(f.start)
                && text.is_char_boundary(f.end)
                && (0.0..=1.0).contains(&f.confidence);
            if !ok {
                warn!(start = f.start, end = f.end, "Discarding malformed finding");
            }
            ok
        })
        .collect()
}

fn validate_decision(decision: &ApprovalDecision, snapshot: &ScanSnapshot) -> Result<(), GateError> {
    if !decision.approved {
        if decision.use_sanitized || !decision.overrides.is_empty() {
            return Err(GateError::InvalidDecision(
                "a denial cannot carry sanitization or overrides".to_string(),
            ));
        }
        return Ok(());
    }

    let count = snapshot.findings.len();
    let mut seen = Vec::with_capacity(decision.overrides.len());
    for o in &decision.overrides {
        if o.index >= count {
            return Err(GateError::InvalidDecision(format!(
                "override index {} is out of range ({count} findings)",
                o.index
            )));
        }
        if seen.contains(&o.index) {
            return Err(GateError::InvalidDecision(format!(
                "finding {} is overridden more than once",
                o.index
            )));
        }
        seen.push(o.index);
    }

    if !decision.use_sanitized
        && let Some(&index) = snapshot
            .blocking
            .iter()
            .find(|&&i| decision.override_for(i).is_none())
    {
        return Err(GateError::InvalidDecision(format!(
            "finding {index} ({}) is above the confidence threshold and needs an override",
            snapshot.findings[index].category
        )));
    }

    Ok(())
}
