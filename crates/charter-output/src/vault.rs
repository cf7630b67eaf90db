use async_trait::async_trait;
use camino::Utf8PathBuf;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use charter_config::DestinationKind;
use charter_utils::documents::GeneratedDocument;
use charter_utils::error::OutputError;

use crate::filesystem::write_tree;
use crate::{DestinationReport, OutputDestination, OutputRun};

static MARKDOWN_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)\s]+\.md)\)").expect("valid regex"));

const TAGS: &[&str] = &["charter", "generated"];

#[derive(Serialize)]
struct Frontmatter<'a> {
    title: &'a str,
    project: &'a str,
    created: String,
    tags: &'a [&'a str],
}

/// YAML frontmatter block for one vault note.
pub fn frontmatter(doc: &GeneratedDocument, run: &OutputRun) -> Result<String, serde_yaml::Error> {
    let yaml = serde_yaml::to_string(&Frontmatter {
        title: &doc.title,
        project: &run.project_name,
        created: run.created_at.to_rfc3339(),
        tags: TAGS,
    })?;
    Ok(format!("---\n{yaml}---\n\n"))
}

/// Rewrite `[text](file.md)` as `[[file|text]]`. Absolute URLs are left alone.
#[must_use]
pub fn convert_links(body: &str) -> String {
    MARKDOWN_LINK
        .replace_all(body, |c: &Captures<'_>| {
            let target = &c[2];
            if target.contains("://") {
                return c[0].to_string();
            }
            format!("[[{}|{}]]", target.trim_end_matches(".md"), &c[1])
        })
        .into_owned()
}

/// Notes in a Markdown vault, with frontmatter and wiki-style links.
#[derive(Debug, Clone)]
pub struct VaultDestination {
    root: Utf8PathBuf,
}

impl VaultDestination {
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn render(&self, doc: &GeneratedDocument, run: &OutputRun) -> Result<String, OutputError> {
        let header = frontmatter(doc, run).map_err(|e| OutputError::Write {
            destination: self.kind().to_string(),
            path: doc.relative_path(),
            reason: format!("frontmatter: {e}"),
        })?;
        Ok(format!("{header}{}", convert_links(&doc.body)))
    }
}

#[async_trait]
impl OutputDestination for VaultDestination {
    fn kind(&self) -> DestinationKind {
        DestinationKind::Vault
    }

    async fn write(
        &self,
        run: &OutputRun,
        documents: &[Arc<GeneratedDocument>],
    ) -> Result<DestinationReport, OutputError> {
        let rendered: Vec<Arc<GeneratedDocument>> = documents
            .iter()
            .filter(|d| d.succeeded())
            .map(|d| {
                let mut note = GeneratedDocument::clone(d);
                note.body = self.render(d, run)?;
                Ok(Arc::new(note))
            })
            .collect::<Result<_, OutputError>>()?;

        let (dir, written) = write_tree(self.kind(), &self.root, run, &rendered, |d| d.body.clone())?;
        info!(run_id = %run.run_id, dir = %dir, written, "Documents written to vault");
        Ok(DestinationReport {
            destination: self.kind(),
            documents_written: written,
            location: dir.to_string(),
        })
    }
}
