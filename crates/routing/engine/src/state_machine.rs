//! Document state machine: document-level status transitions
//!
//! `INITIATED → ENROUTE → PROCESSED → FINAL`, with `DISAPPROVED` and
//! `CANCELED` reachable from any non-terminal state. Status only changes
//! through this module; every change is recorded in the header history.

use crate::record::DocumentRecord;
use routing_types::{DocumentStatus, RoutingError, RoutingResult};

/// Drives document status from the record's request and instance state
#[derive(Clone, Debug, Default)]
pub struct DocumentStateMachine;

impl DocumentStateMachine {
    pub fn new() -> Self {
        Self
    }

    /// `INITIATED → ENROUTE`
    pub fn route(&self, record: &mut DocumentRecord) -> RoutingResult<()> {
        let status = record.header.status;
        if status != DocumentStatus::Initiated {
            return Err(RoutingError::InvalidState {
                document_id: record.header.document_id.clone(),
                status,
                reason: "document has already been routed".into(),
            });
        }
        self.transition(record, DocumentStatus::Enroute);
        Ok(())
    }

    /// Apply the completion transitions the record now qualifies for.
    ///
    /// A document with nothing outstanding passes through `PROCESSED` to
    /// `FINAL` in one call, recording both steps. Returns the final status.
    pub fn evaluate(&self, record: &mut DocumentRecord) -> DocumentStatus {
        if record.header.status == DocumentStatus::Enroute
            && record.traversal_finished()
            && !record.has_pending_blocking_requests()
        {
            self.transition(record, DocumentStatus::Processed);
        }
        if record.header.status == DocumentStatus::Processed
            && record.traversal_finished()
            && !record.has_pending_requests()
        {
            self.transition(record, DocumentStatus::Final);
        }
        record.header.status
    }

    /// End routing as `DISAPPROVED` or `CANCELED`.
    ///
    /// Every pending request is deactivated and every active instance is
    /// switched off; waiting joins are left as the audit trail shows them.
    /// Returns how many requests were deactivated.
    pub fn terminate(
        &self,
        record: &mut DocumentRecord,
        to: DocumentStatus,
    ) -> RoutingResult<usize> {
        let status = record.header.status;
        if status.is_terminal() {
            return Err(RoutingError::InvalidState {
                document_id: record.header.document_id.clone(),
                status,
                reason: "document is already in a terminal state".into(),
            });
        }
        if !matches!(to, DocumentStatus::Disapproved | DocumentStatus::Canceled) {
            return Err(RoutingError::InvalidState {
                document_id: record.header.document_id.clone(),
                status,
                reason: format!("{} is not a terminating status", to),
            });
        }

        let mut deactivated = 0;
        for request in record.requests.iter_mut().filter(|r| r.is_pending()) {
            request.deactivate();
            deactivated += 1;
        }
        for instance in record.instances.iter_mut().filter(|i| i.active) {
            instance.deactivate();
        }

        self.transition(record, to);
        Ok(deactivated)
    }

    fn transition(&self, record: &mut DocumentRecord, to: DocumentStatus) {
        let from = record.header.status;
        record.header.transition(to);
        tracing::info!(
            document_id = %record.header.document_id,
            from = %from,
            to = %to,
            route_level = record.header.route_level,
            "Document status changed"
        );
    }
}
