use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use charter_utils::documents::{DocumentType, GeneratedDocument};

/// Append-only record of a run's frozen documents.
///
/// Batches are appended whole after their barrier. The only in-place change
/// is [`DocumentLedger::replace`], which swaps one slot for a newer revision.
#[derive(Debug, Default)]
pub struct DocumentLedger {
    documents: RwLock<Vec<Arc<GeneratedDocument>>>,
    settled: AtomicUsize,
    total: AtomicUsize,
}

impl DocumentLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots the current plan will fill.
    pub fn set_total(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// Count one settled slot, success or failure.
    pub fn mark_settled(&self) {
        self.settled.fetch_add(1, Ordering::SeqCst);
    }

    #[must_use]
    pub fn settled(&self) -> usize {
        self.settled.load(Ordering::SeqCst)
    }

    /// Freeze a finished batch into the ledger.
    pub fn append_batch(&self, batch: Vec<GeneratedDocument>) {
        let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        documents.extend(batch.into_iter().map(Arc::new));
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<GeneratedDocument>> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn get(&self, doc_type: DocumentType) -> Option<Arc<GeneratedDocument>> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|d| d.doc_type == doc_type)
            .cloned()
    }

    /// Successful documents from batches strictly before `batch`.
    #[must_use]
    pub fn successful_before(&self, batch: usize) -> Vec<Arc<GeneratedDocument>> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|d| d.batch < batch && d.succeeded())
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn succeeded_count(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|d| d.succeeded())
            .count()
    }

    /// Swap the slot for `document.doc_type`, returning the previous one.
    ///
    /// Readers holding the old `Arc` keep seeing the old document.
    pub fn replace(&self, document: GeneratedDocument) -> Option<Arc<GeneratedDocument>> {
        let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        let new = Arc::new(document);
        match documents.iter_mut().find(|d| d.doc_type == new.doc_type) {
            Some(slot) => Some(std::mem::replace(slot, new)),
            None => {
                documents.push(new);
                None
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charter_utils::types::ProviderKind;

    fn ok(doc: DocumentType, batch: usize) -> GeneratedDocument {
        GeneratedDocument::success(doc, batch, format!("# {}\n\nBody.", doc.title()), ProviderKind::Local, false)
    }

    #[test]
    fn test_successful_before_excludes_current_batch_and_failures() {
        let ledger = DocumentLedger::new();
        ledger.append_batch(vec![
            ok(DocumentType::Readme, 0),
            GeneratedDocument::failure(DocumentType::Glossary, 0, None, "timeout"),
        ]);
        ledger.append_batch(vec![ok(DocumentType::StakeholderNotes, 1)]);

        let earlier: Vec<_> = ledger
            .successful_before(1)
            .iter()
            .map(|d| d.doc_type)
            .collect();
        assert_eq!(earlier, vec![DocumentType::Readme]);
        assert_eq!(ledger.successful_before(0).len(), 0);
        assert_eq!(ledger.succeeded_count(), 2);
    }

    #[test]
    fn test_replace_keeps_old_arc_alive() {
        let ledger = DocumentLedger::new();
        ledger.append_batch(vec![ok(DocumentType::Readme, 0)]);
        let before = ledger.get(DocumentType::Readme).unwrap();

        let mut newer = ok(DocumentType::Readme, 0);
        newer.revision = 2;
        let previous = ledger.replace(newer).unwrap();

        assert_eq!(previous.revision, 1);
        assert_eq!(before.revision, 1);
        assert_eq!(ledger.get(DocumentType::Readme).unwrap().revision, 2);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_progress_counters() {
        let ledger = DocumentLedger::new();
        ledger.set_total(15);
        ledger.mark_settled();
        ledger.mark_settled();
        assert_eq!((ledger.settled(), ledger.total()), (2, 15));
    }
}
