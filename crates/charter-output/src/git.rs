use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use std::path::Path;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info};

use charter_config::DestinationKind;
use charter_utils::documents::GeneratedDocument;
use charter_utils::error::OutputError;

use crate::filesystem::write_tree;
use crate::{DestinationReport, OutputDestination, OutputRun};

const FALLBACK_NAME: &str = "charter";
const FALLBACK_EMAIL: &str = "charter@localhost";

/// Filesystem write into a repository followed by one commit.
#[derive(Debug, Clone)]
pub struct GitDestination {
    repo: Utf8PathBuf,
}

struct GitOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

impl GitDestination {
    #[must_use]
    pub fn new(repo: impl Into<Utf8PathBuf>) -> Self {
        Self { repo: repo.into() }
    }

    fn command_error(&self, command: &str, reason: impl Into<String>) -> OutputError {
        OutputError::Command {
            destination: self.kind().to_string(),
            command: command.to_string(),
            reason: reason.into(),
        }
    }

    async fn git(&self, git: &Path, args: &[&str]) -> Result<GitOutput, OutputError> {
        let rendered = format!("git {}", args.join(" "));
        debug!(repo = %self.repo, command = %rendered, "Running git");
        let output = Command::new(git)
            .args(args)
            .current_dir(self.repo.as_std_path())
            .output()
            .await
            .map_err(|e| self.command_error(&rendered, e.to_string()))?;
        Ok(GitOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn git_checked(&self, git: &Path, args: &[&str]) -> Result<GitOutput, OutputError> {
        let output = self.git(git, args).await?;
        if output.success {
            Ok(output)
        } else {
            Err(self.command_error(&format!("git {}", args.join(" ")), output.stderr.trim()))
        }
    }

    async fn ensure_repository(&self, git: &Path) -> Result<(), OutputError> {
        std::fs::create_dir_all(self.repo.as_std_path())
            .map_err(|e| self.command_error("git init", e.to_string()))?;
        if !is_repository(&self.repo) {
            self.git_checked(git, &["init"]).await?;
            info!(repo = %self.repo, "Initialized git repository");
        }
        Ok(())
    }

    async fn commit(&self, git: &Path, message: &str) -> Result<(), OutputError> {
        let has_identity = self.git(git, &["config", "user.email"]).await?.success;
        let name = format!("user.name={FALLBACK_NAME}");
        let email = format!("user.email={FALLBACK_EMAIL}");
        let mut args: Vec<&str> = Vec::new();
        if !has_identity {
            args.extend(["-c", name.as_str(), "-c", email.as_str()]);
        }
        args.extend(["commit", "-m", message]);

        let output = self.git(git, &args).await?;
        if output.success || output.stdout.contains("nothing to commit") {
            return Ok(());
        }
        Err(self.command_error("git commit", output.stderr.trim()))
    }
}

fn is_repository(path: &Utf8Path) -> bool {
    path.join(".git").exists()
}

#[async_trait]
impl OutputDestination for GitDestination {
    fn kind(&self) -> DestinationKind {
        DestinationKind::Git
    }

    async fn write(
        &self,
        run: &OutputRun,
        documents: &[Arc<GeneratedDocument>],
    ) -> Result<DestinationReport, OutputError> {
        let git = which::which("git")
            .map_err(|e| self.command_error("git", format!("git not found on PATH: {e}")))?;

        self.ensure_repository(&git).await?;
        let (_, written) = write_tree(self.kind(), &self.repo, run, documents, |d| d.body.clone())?;

        self.git_checked(&git, &["add", "."]).await?;
        let message = format!(
            "Generated {written} documents for: {}",
            run.project_name
        );
        self.commit(&git, &message).await?;

        info!(run_id = %run.run_id, repo = %self.repo, written, "Documents committed");
        Ok(DestinationReport {
            destination: self.kind(),
            documents_written: written,
            location: self.repo.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_docs;
    use tempfile::TempDir;

    fn git_available() -> bool {
        which::which("git").is_ok()
    }

    #[tokio::test]
    async fn test_initializes_and_commits() {
        if !git_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let repo = Utf8PathBuf::from_path_buf(temp.path().join("docs-repo")).unwrap();
        let dest = GitDestination::new(repo.clone());

        let report = dest.write(&test_docs::run(), &test_docs::set()).await.unwrap();
        assert_eq!(report.documents_written, 2);
        assert!(repo.join(".git").exists());

        let log = std::process::Command::new("git")
            .args(["log", "-1", "--format=%s"])
            .current_dir(repo.as_std_path())
            .output()
            .unwrap();
        assert_eq!(
            String::from_utf8_lossy(&log.stdout).trim(),
            "Generated 2 documents for: Clinic Intake: Phase 1"
        );
    }

    #[tokio::test]
    async fn test_rewriting_identical_documents_is_not_an_error() {
        if !git_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let repo = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let dest = GitDestination::new(repo);

        dest.write(&test_docs::run(), &test_docs::set()).await.unwrap();
        let again = dest.write(&test_docs::run(), &test_docs::set()).await.unwrap();
        assert_eq!(again.documents_written, 2);
    }
}
