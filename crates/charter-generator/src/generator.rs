use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use charter_config::RunSettings;
use charter_llm::{GenerationParams, ProviderSelector, generate_with_timeout};
use charter_research::ResearchBrief;
use charter_utils::documents::{DocumentType, GeneratedDocument};
use charter_utils::error::{LlmError, PhaseError};
use charter_utils::types::{ProviderKind, RunId};

use crate::ledger::DocumentLedger;
use crate::prompt::build_generation_prompt;
use crate::truncation::detect_truncation;

/// Everything generation reads for one run.
#[derive(Debug, Clone, Copy)]
pub struct GenerationInput<'a> {
    pub run_id: &'a RunId,
    pub brief: &'a ResearchBrief,
    /// Approved (possibly sanitized) project text.
    pub project_context: &'a str,
    pub settings: &'a RunSettings,
}

/// How the generation phase ended when it did not fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub cancelled: bool,
    pub succeeded: usize,
    pub failed: usize,
    /// Backend that served the most recent successful call.
    pub provider: Option<ProviderKind>,
}

/// Generates the document set batch by batch.
pub struct DocumentBatchGenerator {
    selector: Arc<ProviderSelector>,
}

impl DocumentBatchGenerator {
    #[must_use]
    pub fn new(selector: Arc<ProviderSelector>) -> Self {
        Self { selector }
    }

    /// Fill every slot of `input.settings.batches` into `ledger`.
    ///
    /// A provider is selected once before the first batch so that an
    /// unavailable backend with fallback disabled fails the phase before any
    /// document is attempted. Each call then selects again.
    pub async fn execute(
        &self,
        input: &GenerationInput<'_>,
        ledger: &DocumentLedger,
        cancel: &AtomicBool,
    ) -> Result<GenerationOutcome, PhaseError> {
        let run_id = input.run_id;
        let plan = &input.settings.batches;
        ledger.set_total(plan.total_documents());

        let preflight = self
            .selector
            .select_for_generation(run_id, input.settings)
            .await?;
        debug!(run_id = %run_id, backend = %preflight.kind, "Generation preflight selected backend");

        let semaphore = Arc::new(Semaphore::new(input.settings.generation_concurrency.max(1)));
        let mut outcome = GenerationOutcome::default();

        for (ordinal, batch) in plan.batches().iter().enumerate() {
            if cancel.load(Ordering::SeqCst) {
                info!(run_id = %run_id, batch = ordinal, "Generation cancelled before batch");
                outcome.cancelled = true;
                return Ok(outcome);
            }

            let started = Instant::now();
            let previous = ledger.successful_before(ordinal);
            let mut set = JoinSet::new();
            let mut task_doc = HashMap::with_capacity(batch.len());

            for &doc in batch {
                let prompt = build_generation_prompt(
                    doc,
                    input.project_context,
                    &input.brief.slice_for(doc),
                    &previous,
                );
                let selector = Arc::clone(&self.selector);
                let semaphore = Arc::clone(&semaphore);
                let run_id = run_id.clone();
                let settings = input.settings.clone();
                let handle = set.spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return Err(LlmError::ProviderUnavailable(
                            "generation scheduler closed".to_string(),
                        ));
                    };
                    generate_document(&selector, &run_id, doc, ordinal, &prompt, &settings).await
                });
                task_doc.insert(handle.id(), doc);
            }

            let mut settled: Vec<GeneratedDocument> = Vec::with_capacity(batch.len());
            let mut terminal: Option<LlmError> = None;
            while let Some(joined) = set.join_next_with_id().await {
                let (id, result) = match joined {
                    Ok((id, result)) => (id, result),
                    Err(join_err) => (
                        join_err.id(),
                        Err(LlmError::ProviderUnavailable(format!(
                            "generation task aborted: {join_err}"
                        ))),
                    ),
                };
                let Some(&doc) = task_doc.get(&id) else {
                    continue;
                };
                ledger.mark_settled();

                match result {
                    Ok(document) => {
                        info!(
                            run_id = %run_id,
                            document = %doc,
                            backend = ?document.provider,
                            words = document.word_count,
                            truncated = document.truncated,
                            "Document generated"
                        );
                        outcome.provider = document.provider;
                        settled.push(document);
                    }
                    Err(err) => {
                        warn!(run_id = %run_id, document = %doc, error = %err, "Document generation failed");
                        if err.is_phase_terminal() && terminal.is_none() {
                            terminal = Some(err.clone());
                        }
                        settled.push(GeneratedDocument::failure(doc, ordinal, None, err.to_string()));
                    }
                }
            }

            settled.sort_by_key(|d| batch.iter().position(|b| *b == d.doc_type));
            let succeeded = settled.iter().filter(|d| d.succeeded()).count();
            let last_error = settled
                .iter()
                .rev()
                .find_map(|d| d.error.clone())
                .unwrap_or_default();
            outcome.succeeded += succeeded;
            outcome.failed += settled.len() - succeeded;
            ledger.append_batch(settled);

            info!(
                run_id = %run_id,
                batch = ordinal,
                succeeded,
                failed = batch.len() - succeeded,
                duration_ms = %started.elapsed().as_millis(),
                "Document batch settled"
            );

            if let Some(err) = terminal {
                return Err(PhaseError::Provider(err));
            }
            if succeeded == 0 && !batch.is_empty() {
                return Err(PhaseError::DocumentBatchExhausted {
                    batch: ordinal + 1,
                    reason: last_error,
                });
            }
        }

        Ok(outcome)
    }

    /// Regenerate one document outside the batch schedule.
    ///
    /// The prompt reads the successful documents of earlier batches. On
    /// success the slot is replaced with the next revision; on failure the
    /// ledger is left untouched.
    pub async fn regenerate_one(
        &self,
        input: &GenerationInput<'_>,
        doc: DocumentType,
        ledger: &DocumentLedger,
    ) -> Result<Arc<GeneratedDocument>, LlmError> {
        let current = ledger.get(doc);
        let batch = current
            .as_ref()
            .map(|d| d.batch)
            .or_else(|| input.settings.batches.batch_of(doc))
            .unwrap_or_default();
        let revision = current.as_ref().map_or(1, |d| d.revision + 1);

        let prompt = build_generation_prompt(
            doc,
            input.project_context,
            &input.brief.slice_for(doc),
            &ledger.successful_before(batch),
        );
        let mut document = generate_document(
            &self.selector,
            input.run_id,
            doc,
            batch,
            &prompt,
            input.settings,
        )
        .await?;
        document.revision = revision;

        info!(run_id = %input.run_id, document = %doc, revision, "Document regenerated");
        ledger.replace(document);
        ledger
            .get(doc)
            .ok_or_else(|| LlmError::ProviderRejected(format!("{doc} vanished from the ledger")))
    }
}

/// Generate one document, re-requesting truncated output.
///
/// The last response is kept, flagged as truncated, once retries run out.
async fn generate_document(
    selector: &ProviderSelector,
    run_id: &RunId,
    doc: DocumentType,
    batch: usize,
    prompt: &str,
    settings: &RunSettings,
) -> Result<GeneratedDocument, LlmError> {
    let params = GenerationParams::new(settings.generation_max_tokens, settings.generation_temperature);
    let mut attempt = 0;

    loop {
        let selected = selector.select_for_generation(run_id, settings).await?;
        let body = generate_with_timeout(
            selected.client.as_ref(),
            prompt,
            params,
            settings.generation_call_timeout,
        )
        .await?;

        let Some(reason) = detect_truncation(&body) else {
            return Ok(GeneratedDocument::success(doc, batch, body, selected.kind, false));
        };

        if attempt >= settings.truncation_retries {
            if body.trim().is_empty() {
                return Err(LlmError::ProviderRejected(format!(
                    "{doc} came back empty after {} attempts",
                    attempt + 1
                )));
            }
            warn!(
                run_id = %run_id,
                document = %doc,
                attempts = attempt + 1,
                reason = %reason,
                "Keeping truncated document"
            );
            return Ok(GeneratedDocument::success(doc, batch, body, selected.kind, true));
        }

        attempt += 1;
        warn!(
            run_id = %run_id,
            document = %doc,
            attempt,
            reason = %reason,
            "Document looks truncated, retrying"
        );
    }
}
