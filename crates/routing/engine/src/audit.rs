//! Audit trail: append-only record of every attempted action
//!
//! The engine writes one `ActionTaken` per submitted action, whatever its
//! outcome. Sink failures are reported back as `AuditError` and logged by
//! the caller; they never undo the action itself. A capped log drops a
//! document's oldest records to make room, never the newest.

use parking_lot::RwLock;
use routing_types::{ActionTaken, DocumentId, PrincipalId};
use std::collections::{HashMap, VecDeque};

/// Audit sink errors
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Audit backend error: {0}")]
    Backend(String),
}

/// Where action-taken records go
pub trait AuditSink: Send + Sync {
    fn record(&self, action: ActionTaken) -> Result<(), AuditError>;
}

/// In-memory audit log, grouped by document
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    records: RwLock<HashMap<DocumentId, VecDeque<ActionTaken>>>,
    /// Records kept per document; 0 means unbounded
    max_per_document: usize,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity_per_document(mut self, max: usize) -> Self {
        self.max_per_document = max;
        self
    }

    // ── Query methods ────────────────────────────────────────────────

    /// All records for a document, oldest first
    pub fn records_for(&self, document_id: &DocumentId) -> Vec<ActionTaken> {
        self.records
            .read()
            .get(document_id)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn count_for(&self, document_id: &DocumentId) -> usize {
        self.records
            .read()
            .get(document_id)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    /// Records for a document attributed to one principal
    pub fn records_by(&self, document_id: &DocumentId, principal: &PrincipalId) -> Vec<ActionTaken> {
        self.records_for(document_id)
            .into_iter()
            .filter(|r| &r.principal == principal)
            .collect()
    }

    pub fn total_records(&self) -> usize {
        self.records.read().values().map(|v| v.len()).sum()
    }
}

impl AuditSink for InMemoryAuditLog {
    fn record(&self, action: ActionTaken) -> Result<(), AuditError> {
        let mut records = self.records.write();
        let entries = records.entry(action.document_id.clone()).or_default();
        if self.max_per_document > 0 {
            while entries.len() >= self.max_per_document {
                if let Some(evicted) = entries.pop_front() {
                    tracing::debug!(
                        document_id = %evicted.document_id,
                        action_taken = %evicted.id,
                        limit = self.max_per_document,
                        "Oldest audit record evicted"
                    );
                }
            }
        }
        tracing::trace!(
            document_id = %action.document_id,
            principal = %action.principal,
            action = %action.action,
            "Action recorded"
        );
        entries.push_back(action);
        Ok(())
    }
}

/// Sink that discards everything, used when auditing is disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _action: ActionTaken) -> Result<(), AuditError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routing_types::{ActionOutcome, ActionTakenId, ActionType};

    fn make_action(doc: &str, principal: &str, outcome: ActionOutcome) -> ActionTaken {
        ActionTaken::new(
            ActionTakenId::generate(),
            DocumentId::new(doc),
            PrincipalId::new(principal),
            ActionType::Approve,
            outcome,
        )
    }

    #[test]
    fn test_records_grouped_by_document() {
        let log = InMemoryAuditLog::new();
        log.record(make_action("doc-1", "bmcgough", ActionOutcome::NoOp))
            .unwrap();
        log.record(make_action(
            "doc-1",
            "temay",
            ActionOutcome::Rejected {
                reason: "not authorized".into(),
            },
        ))
        .unwrap();
        log.record(make_action("doc-2", "bmcgough", ActionOutcome::NoOp))
            .unwrap();

        let doc1 = DocumentId::new("doc-1");
        assert_eq!(log.count_for(&doc1), 2);
        assert_eq!(log.total_records(), 3);
        assert_eq!(log.records_by(&doc1, &PrincipalId::new("temay")).len(), 1);
        assert!(log.records_for(&doc1)[1].outcome.is_rejected());
    }

    #[test]
    fn test_capacity_keeps_newest() {
        let log = InMemoryAuditLog::new().with_capacity_per_document(2);
        for principal in ["a", "b", "c"] {
            log.record(make_action("doc-1", principal, ActionOutcome::NoOp))
                .unwrap();
        }

        let doc1 = DocumentId::new("doc-1");
        let kept: Vec<String> = log
            .records_for(&doc1)
            .iter()
            .map(|r| r.principal.to_string())
            .collect();
        assert_eq!(kept, vec!["b", "c"]);
        assert!(log.records_by(&doc1, &PrincipalId::new("a")).is_empty());

        // Other documents are unaffected
        log.record(make_action("doc-2", "a", ActionOutcome::NoOp))
            .unwrap();
        assert_eq!(log.count_for(&DocumentId::new("doc-2")), 1);
        assert_eq!(log.total_records(), 3);
    }
}
