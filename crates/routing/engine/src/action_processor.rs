//! Action processor: applies one principal's action to a document
//!
//! The processor works on a record the caller owns exclusively. It either
//! returns an outcome with the record updated, or an error with the
//! record in an unspecified state; callers discard the working copy on
//! error, so a failed action never reaches the committed record.

use crate::directory::{addresses, PrincipalDirectory};
use crate::record::DocumentRecord;
use crate::state_machine::DocumentStateMachine;
use crate::traversal::{RouteTraversal, TraversalReport};
use chrono::Utc;
use routing_types::{
    ActionOutcome, ActionRequestId, ActionTakenId, ActionType, DocumentId, DocumentStatus,
    PrincipalId, RequestResolution, RoutingError, RoutingResult,
};
use serde::{Deserialize, Serialize};

/// An action submitted against a document
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCommand {
    pub document_id: DocumentId,
    pub principal: PrincipalId,
    pub action: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    /// Header version the caller last saw; stale versions are rejected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
}

impl ActionCommand {
    pub fn new(
        document_id: DocumentId,
        principal: impl Into<String>,
        action: ActionType,
    ) -> Self {
        Self {
            document_id,
            principal: PrincipalId::new(principal),
            action,
            annotation: None,
            expected_version: None,
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    pub fn with_expected_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Result of a successfully processed action
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    pub outcome: ActionOutcome,
    pub resolved: Vec<ActionRequestId>,
    /// Requests deactivated by a disapproval or cancellation
    pub deactivated: usize,
    pub traversal: TraversalReport,
    pub status_before: DocumentStatus,
    pub status_after: DocumentStatus,
}

impl ProcessOutcome {
    fn new(outcome: ActionOutcome, status_before: DocumentStatus) -> Self {
        Self {
            outcome,
            resolved: Vec::new(),
            deactivated: 0,
            traversal: TraversalReport::default(),
            status_before,
            status_after: status_before,
        }
    }

    /// Whether the record changed and must be committed
    pub fn changed(&self) -> bool {
        self.outcome.is_applied()
    }
}

/// Resolves requests, advances nodes, and re-evaluates document status
#[derive(Clone, Debug, Default)]
pub struct ActionProcessor {
    traversal: RouteTraversal,
    state_machine: DocumentStateMachine,
}

impl ActionProcessor {
    pub fn new(traversal: RouteTraversal, state_machine: DocumentStateMachine) -> Self {
        Self {
            traversal,
            state_machine,
        }
    }

    pub fn traversal(&self) -> &RouteTraversal {
        &self.traversal
    }

    pub fn state_machine(&self) -> &DocumentStateMachine {
        &self.state_machine
    }

    /// Apply a command to a record
    pub fn process(
        &self,
        record: &mut DocumentRecord,
        command: &ActionCommand,
        action_taken: &ActionTakenId,
        directory: &dyn PrincipalDirectory,
    ) -> RoutingResult<ProcessOutcome> {
        if let Some(expected) = command.expected_version {
            if expected != record.header.version {
                return Err(RoutingError::ConcurrentModification {
                    document_id: record.header.document_id.clone(),
                    reason: format!(
                        "expected version {}, found {}",
                        expected, record.header.version
                    ),
                });
            }
        }

        let outcome = match command.action {
            ActionType::Route => self.route(record, command, directory)?,
            ActionType::Cancel => self.cancel(record, command, directory)?,
            ActionType::Approve
            | ActionType::Acknowledge
            | ActionType::Fyi
            | ActionType::Disapprove => self.respond(record, command, action_taken, directory)?,
        };

        tracing::info!(
            document_id = %record.header.document_id,
            principal = %command.principal,
            action = %command.action,
            resolved = outcome.resolved.len(),
            status = %outcome.status_after,
            "Action processed"
        );
        Ok(outcome)
    }

    fn route(
        &self,
        record: &mut DocumentRecord,
        command: &ActionCommand,
        directory: &dyn PrincipalDirectory,
    ) -> RoutingResult<ProcessOutcome> {
        let before = record.header.status;
        if !record.header.is_initiator(&command.principal) {
            return Err(not_authorized(
                record,
                command,
                "only the initiator may route a document",
            ));
        }
        self.state_machine.route(record)?;
        // Documents from the engine already have these; activation skips them
        self.traversal.store().activate_initial_nodes(record);

        let mut outcome = ProcessOutcome::new(ActionOutcome::Applied { resolved_requests: 0 }, before);
        outcome.traversal = self.traversal.run(record, directory)?;
        outcome.status_after = self.state_machine.evaluate(record);
        Ok(outcome)
    }

    fn cancel(
        &self,
        record: &mut DocumentRecord,
        command: &ActionCommand,
        directory: &dyn PrincipalDirectory,
    ) -> RoutingResult<ProcessOutcome> {
        let before = record.header.status;
        ensure_not_terminal(record)?;

        let initiator_may_cancel = record.header.is_initiator(&command.principal)
            && before == DocumentStatus::Initiated;
        if !initiator_may_cancel && !is_superuser(record, &command.principal, directory) {
            return Err(not_authorized(
                record,
                command,
                "only the initiator of an unrouted document or a superuser may cancel",
            ));
        }

        let mut outcome = ProcessOutcome::new(ActionOutcome::Applied { resolved_requests: 0 }, before);
        outcome.deactivated = self
            .state_machine
            .terminate(record, DocumentStatus::Canceled)?;
        outcome.status_after = record.header.status;
        Ok(outcome)
    }

    /// Approve, acknowledge, FYI, or disapprove
    fn respond(
        &self,
        record: &mut DocumentRecord,
        command: &ActionCommand,
        action_taken: &ActionTakenId,
        directory: &dyn PrincipalDirectory,
    ) -> RoutingResult<ProcessOutcome> {
        let before = record.header.status;
        let principal = &command.principal;
        let action = command.action;

        let matching: Vec<usize> = record
            .requests
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                r.is_activated()
                    && action.satisfies(r.action_requested)
                    && addresses(directory, &r.recipient, principal)
            })
            .map(|(i, _)| i)
            .collect();

        if matching.is_empty()
            && record
                .requests
                .iter()
                .any(|r| r.resolved_by(principal, action))
        {
            tracing::debug!(
                document_id = %record.header.document_id,
                principal = %principal,
                action = %action,
                "Action already applied, nothing to do"
            );
            return Ok(ProcessOutcome::new(ActionOutcome::NoOp, before));
        }

        ensure_not_terminal(record)?;

        if matching.is_empty() {
            if action == ActionType::Disapprove && is_superuser(record, principal, directory) {
                let mut outcome = ProcessOutcome::new(
                    ActionOutcome::Applied { resolved_requests: 0 },
                    before,
                );
                outcome.deactivated = self
                    .state_machine
                    .terminate(record, DocumentStatus::Disapproved)?;
                outcome.status_after = record.header.status;
                return Ok(outcome);
            }
            if before == DocumentStatus::Initiated {
                return Err(RoutingError::InvalidState {
                    document_id: record.header.document_id.clone(),
                    status: before,
                    reason: "document has not been routed".into(),
                });
            }
            return Err(not_authorized(
                record,
                command,
                "no activated request for this principal and action",
            ));
        }

        let now = Utc::now();
        let mut resolved = Vec::with_capacity(matching.len());
        for index in matching {
            let request = &mut record.requests[index];
            let resolution = RequestResolution {
                principal: principal.clone(),
                action,
                action_taken: action_taken.clone(),
                resolved_at: now,
            };
            if request.resolve(resolution) {
                tracing::debug!(
                    document_id = %request.document_id,
                    request_id = %request.id,
                    node = %request.node_name,
                    "Action request resolved"
                );
                resolved.push(request.id.clone());
            }
        }

        let mut outcome = ProcessOutcome::new(
            ActionOutcome::Applied {
                resolved_requests: resolved.len(),
            },
            before,
        );
        outcome.resolved = resolved;

        if action.is_terminating() {
            outcome.deactivated = self
                .state_machine
                .terminate(record, DocumentStatus::Disapproved)?;
        } else {
            outcome.traversal = self.traversal.run(record, directory)?;
            self.state_machine.evaluate(record);
        }
        outcome.status_after = record.header.status;
        Ok(outcome)
    }
}

fn ensure_not_terminal(record: &DocumentRecord) -> RoutingResult<()> {
    let status = record.header.status;
    if status.is_terminal() {
        return Err(RoutingError::InvalidState {
            document_id: record.header.document_id.clone(),
            status,
            reason: "document is already in a terminal state".into(),
        });
    }
    Ok(())
}

fn not_authorized(record: &DocumentRecord, command: &ActionCommand, reason: &str) -> RoutingError {
    RoutingError::NotAuthorized {
        document_id: record.header.document_id.clone(),
        principal: command.principal.clone(),
        action: command.action,
        reason: reason.to_string(),
    }
}

/// Whether a principal is a superuser of the record's document type
pub fn is_superuser(
    record: &DocumentRecord,
    principal: &PrincipalId,
    directory: &dyn PrincipalDirectory,
) -> bool {
    record
        .graph()
        .document_type()
        .superusers
        .iter()
        .any(|s| addresses(directory, s, principal))
}
