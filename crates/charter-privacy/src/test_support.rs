//! Scanner doubles for tests.

use async_trait::async_trait;
use std::time::Duration;

use charter_utils::types::PrivacyFinding;

use crate::scanner::{ScanError, SensitivityScanner};

/// Always errors.
pub struct FailingScanner;

#[async_trait]
impl SensitivityScanner for FailingScanner {
    async fn scan(&self, _text: &str) -> Result<Vec<PrivacyFinding>, ScanError> {
        Err(ScanError("detector offline".to_string()))
    }
}

/// Sleeps before answering with zero findings.
pub struct SlowScanner(pub Duration);

#[async_trait]
impl SensitivityScanner for SlowScanner {
    async fn scan(&self, _text: &str) -> Result<Vec<PrivacyFinding>, ScanError> {
        tokio::time::sleep(self.0).await;
        Ok(Vec::new())
    }
}

/// Returns a fixed list of findings.
pub struct StaticScanner(pub Vec<PrivacyFinding>);

#[async_trait]
impl SensitivityScanner for StaticScanner {
    async fn scan(&self, _text: &str) -> Result<Vec<PrivacyFinding>, ScanError> {
        Ok(self.0.clone())
    }
}
