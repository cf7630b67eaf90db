//! Output destinations for a generated document set.
//!
//! Every destination implements [`OutputDestination`]. Destinations are
//! independent: the orchestrator calls each one and records its
//! [`DestinationReport`] or [`OutputError`] without letting one failure
//! stop the others.

mod filesystem;
mod git;
mod vault;
mod wiki;

pub use filesystem::{FilesystemDestination, sanitize_project_name};
pub use git::GitDestination;
pub use vault::{VaultDestination, convert_links, frontmatter};
pub use wiki::WikiDestination;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use charter_config::{DestinationKind, OutputConfig};
use charter_utils::documents::GeneratedDocument;
use charter_utils::error::OutputError;
use charter_utils::types::RunId;

/// What a destination needs to know about the run it is writing.
#[derive(Debug, Clone)]
pub struct OutputRun {
    pub run_id: RunId,
    pub project_name: String,
    pub created_at: DateTime<Utc>,
}

impl OutputRun {
    #[must_use]
    pub fn new(run_id: RunId, project_name: impl Into<String>) -> Self {
        Self {
            run_id,
            project_name: project_name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Result of one successful destination write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationReport {
    pub destination: DestinationKind,
    pub documents_written: usize,
    /// Directory, repository or collection URL the documents went to.
    pub location: String,
}

#[async_trait]
pub trait OutputDestination: Send + Sync {
    fn kind(&self) -> DestinationKind;

    /// Write the successful documents of `documents`. Failed slots are skipped.
    async fn write(
        &self,
        run: &OutputRun,
        documents: &[Arc<GeneratedDocument>],
    ) -> Result<DestinationReport, OutputError>;
}

/// Build one destination per configured kind.
///
/// A destination whose settings are incomplete is still returned as an
/// error so the orchestrator records it against the run.
#[must_use]
pub fn destinations_from_config(
    config: &OutputConfig,
) -> Vec<Result<Arc<dyn OutputDestination>, OutputError>> {
    config
        .destinations
        .iter()
        .map(|kind| destination_for(*kind, config))
        .collect()
}

fn destination_for(
    kind: DestinationKind,
    config: &OutputConfig,
) -> Result<Arc<dyn OutputDestination>, OutputError> {
    let missing = |key: &str| OutputError::Misconfigured {
        destination: kind.to_string(),
        reason: format!("output.{key} is not set"),
    };
    Ok(match kind {
        DestinationKind::Filesystem => Arc::new(FilesystemDestination::new(path_of(
            kind,
            &config.output_dir,
        )?)),
        DestinationKind::Vault => {
            let path = config.vault_path.as_ref().ok_or_else(|| missing("vault_path"))?;
            Arc::new(VaultDestination::new(path_of(kind, path)?))
        }
        DestinationKind::Git => {
            let path = config.git_path.as_ref().ok_or_else(|| missing("git_path"))?;
            Arc::new(GitDestination::new(path_of(kind, path)?))
        }
        DestinationKind::Wiki => {
            let wiki = config.wiki.as_ref().ok_or_else(|| missing("wiki"))?;
            Arc::new(WikiDestination::new(&wiki.api_url, &wiki.api_key_env)?)
        }
    })
}

fn path_of(
    kind: DestinationKind,
    path: &std::path::Path,
) -> Result<camino::Utf8PathBuf, OutputError> {
    camino::Utf8PathBuf::from_path_buf(path.to_path_buf()).map_err(|p| {
        OutputError::Misconfigured {
            destination: kind.to_string(),
            reason: format!("path is not valid UTF-8: {}", p.display()),
        }
    })
}

/// Successful documents in a stable order.
pub(crate) fn writable(documents: &[Arc<GeneratedDocument>]) -> Vec<&GeneratedDocument> {
    let mut docs: Vec<&GeneratedDocument> = documents
        .iter()
        .filter(|d| d.succeeded())
        .map(AsRef::as_ref)
        .collect();
    docs.sort_by_key(|d| d.doc_type);
    docs
}

#[cfg(test)]
pub(crate) mod test_docs {
    use super::*;
    use charter_utils::documents::DocumentType;
    use charter_utils::types::ProviderKind;

    pub fn set() -> Vec<Arc<GeneratedDocument>> {
        vec![
            Arc::new(GeneratedDocument::success(
                DocumentType::Readme,
                0,
                "# Project Overview\n\nSee the [brief](Project-Brief.md).\n".to_string(),
                ProviderKind::Local,
                false,
            )),
            Arc::new(GeneratedDocument::success(
                DocumentType::InitialBudget,
                2,
                "# Initial Budget\n\nTotal: $10,000.\n".to_string(),
                ProviderKind::Remote,
                false,
            )),
            Arc::new(GeneratedDocument::failure(
                DocumentType::Glossary,
                0,
                None,
                "timed out",
            )),
        ]
    }

    pub fn run() -> OutputRun {
        OutputRun::new(RunId::from_string("run-test"), "Clinic Intake: Phase 1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charter_config::WikiConfig;

    #[test]
    fn test_missing_paths_become_misconfigured() {
        let config = OutputConfig {
            destinations: vec![
                DestinationKind::Filesystem,
                DestinationKind::Vault,
                DestinationKind::Git,
                DestinationKind::Wiki,
            ],
            ..OutputConfig::default()
        };
        let built = destinations_from_config(&config);
        assert_eq!(built.len(), 4);
        assert!(built[0].is_ok());
        for result in &built[1..] {
            match result {
                Err(OutputError::Misconfigured { reason, .. }) => {
                    assert!(reason.contains("is not set"), "{reason}");
                }
                other => panic!("Expected Misconfigured, got {:?}", other.as_ref().map(|d| d.kind())),
            }
        }
    }

    #[test]
    fn test_configured_destinations_report_their_kind() {
        let config = OutputConfig {
            destinations: vec![DestinationKind::Vault, DestinationKind::Wiki],
            vault_path: Some("vault".into()),
            wiki: Some(WikiConfig {
                api_url: "https://wiki.example.org".to_string(),
                api_key_env: "CHARTER_TEST_WIKI_KEY".to_string(),
            }),
            ..OutputConfig::default()
        };
        let kinds: Vec<_> = destinations_from_config(&config)
            .into_iter()
            .map(|r| r.map(|d| d.kind()))
            .collect();
        assert_eq!(kinds, vec![Ok(DestinationKind::Vault), Ok(DestinationKind::Wiki)]);
    }

    #[test]
    fn test_writable_skips_failures_and_orders_by_type() {
        let docs = test_docs::set();
        let kept: Vec<_> = writable(&docs).iter().map(|d| d.doc_type).collect();
        assert_eq!(
            kept,
            vec![
                charter_utils::documents::DocumentType::Readme,
                charter_utils::documents::DocumentType::InitialBudget
            ]
        );
    }
}
