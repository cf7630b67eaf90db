use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use charter_config::DestinationKind;
use charter_utils::atomic_write::write_file_atomic;
use charter_utils::documents::GeneratedDocument;
use charter_utils::error::OutputError;

use crate::{DestinationReport, OutputDestination, OutputRun, writable};

const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Directory-safe form of a project name.
///
/// Reserved characters become `_`. Names that would escape or collapse the
/// project directory fall back to `project`.
#[must_use]
pub fn sanitize_project_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if INVALID_CHARS.contains(&c) || c.is_control() { '_' } else { c })
        .collect();
    let sanitized = sanitized.trim();
    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        "project".to_string()
    } else {
        sanitized.to_string()
    }
}

/// Write each document to `<root>/<project>/<folder>/<file>` using `render`.
pub(crate) fn write_tree(
    kind: DestinationKind,
    root: &Utf8Path,
    run: &OutputRun,
    documents: &[Arc<GeneratedDocument>],
    render: impl Fn(&GeneratedDocument) -> String,
) -> Result<(Utf8PathBuf, usize), OutputError> {
    let project_dir = root.join(sanitize_project_name(&run.project_name));
    let mut written = 0;
    for doc in writable(documents) {
        let path = project_dir.join(doc.doc_type.folder()).join(doc.doc_type.filename());
        let bytes = write_file_atomic(&path, &render(doc)).map_err(|e| OutputError::Write {
            destination: kind.to_string(),
            path: path.to_string(),
            reason: format!("{e:#}"),
        })?;
        debug!(destination = %kind, path = %path, bytes, "Wrote document");
        written += 1;
    }
    Ok((project_dir, written))
}

/// Plain Markdown files under an output directory.
#[derive(Debug, Clone)]
pub struct FilesystemDestination {
    root: Utf8PathBuf,
}

impl FilesystemDestination {
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl OutputDestination for FilesystemDestination {
    fn kind(&self) -> DestinationKind {
        DestinationKind::Filesystem
    }

    async fn write(
        &self,
        run: &OutputRun,
        documents: &[Arc<GeneratedDocument>],
    ) -> Result<DestinationReport, OutputError> {
        let (dir, written) =
            write_tree(self.kind(), &self.root, run, documents, |d| d.body.clone())?;
        info!(run_id = %run.run_id, dir = %dir, written, "Documents written to filesystem");
        Ok(DestinationReport {
            destination: self.kind(),
            documents_written: written,
            location: dir.to_string(),
        })
    }
}
