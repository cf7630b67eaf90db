use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use charter_config::DestinationKind;
use charter_utils::documents::GeneratedDocument;
use charter_utils::error::OutputError;
use charter_utils::redaction::redact_error_message;

use crate::{DestinationReport, OutputDestination, OutputRun, writable};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Collection {
    id: String,
    url_id: String,
}

#[derive(Debug, Deserialize)]
struct Document {
    id: String,
}

/// Outline-compatible wiki: one collection per run, one page per document.
#[derive(Debug, Clone)]
pub struct WikiDestination {
    client: Client,
    api_url: String,
    api_key_env: String,
    api_key: Option<String>,
}

impl WikiDestination {
    /// The key is read from `api_key_env` at write time.
    pub fn new(api_url: &str, api_key_env: &str) -> Result<Self, OutputError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| OutputError::Misconfigured {
                destination: DestinationKind::Wiki.to_string(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key_env: api_key_env.to_string(),
            api_key: None,
        })
    }

    /// Use `key` instead of reading the environment.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn api_key(&self) -> Result<String, OutputError> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| OutputError::Misconfigured {
                destination: self.kind().to_string(),
                reason: format!("environment variable {} is not set", self.api_key_env),
            })
    }

    fn http_error(&self, reason: impl AsRef<str>) -> OutputError {
        OutputError::Http {
            destination: self.kind().to_string(),
            reason: redact_error_message(reason.as_ref()),
        }
    }

    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        key: &str,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, OutputError> {
        let url = format!("{}/api/{method}", self.api_url);
        debug!(url = %url, "Calling wiki API");
        let response = self
            .client
            .post(&url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.http_error(format!("{method}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let excerpt: String = text.chars().take(200).collect();
            return Err(self.http_error(format!("{method} returned {status}: {excerpt}")));
        }
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| self.http_error(format!("{method}: invalid response: {e}")))?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl OutputDestination for WikiDestination {
    fn kind(&self) -> DestinationKind {
        DestinationKind::Wiki
    }

    async fn write(
        &self,
        run: &OutputRun,
        documents: &[Arc<GeneratedDocument>],
    ) -> Result<DestinationReport, OutputError> {
        let key = self.api_key()?;

        let collection: Collection = self
            .call(
                &key,
                "collections.create",
                json!({
                    "name": run.project_name,
                    "description": format!("Generated project documents ({})", run.run_id),
                    "permission": "read_write",
                }),
            )
            .await?;

        let mut written = 0;
        for doc in writable(documents) {
            let page: Document = self
                .call(
                    &key,
                    "documents.create",
                    json!({
                        "title": doc.title,
                        "text": doc.body,
                        "collectionId": collection.id,
                        "publish": true,
                    }),
                )
                .await?;
            debug!(doc = %doc.doc_type, page = %page.id, "Published wiki page");
            written += 1;
        }

        let location = format!("{}/collection/{}", self.api_url, collection.url_id);
        info!(run_id = %run.run_id, location = %location, written, "Documents published to wiki");
        Ok(DestinationReport {
            destination: self.kind(),
            documents_written: written,
            location,
        })
    }
}
