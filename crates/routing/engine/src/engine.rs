//! Routing engine: the entry point for documents and actions
//!
//! The engine ties the pieces together:
//! 1. Creates documents from the latest version of their document type
//! 2. Accepts ad hoc routes and actions, one document critical section each
//! 3. Commits through the route header store, then writes the audit trail
//! 4. Answers state, request, route-path, and inbox queries
//!
//! Collaborators (definitions, directory, persistence, audit) are trait
//! objects so embedding applications can supply their own.

use crate::action_list;
use crate::action_processor::{is_superuser, ActionCommand, ActionProcessor, ProcessOutcome};
use crate::arena::DocumentArena;
use crate::audit::{AuditSink, InMemoryAuditLog, NoopAuditSink};
use crate::config::EngineConfig;
use crate::definition_registry::DefinitionSource;
use crate::directory::PrincipalDirectory;
use crate::instance_store::{NodeInstanceStore, RoutePathEntry};
use crate::record::{AdHocRoute, DocumentRecord, DocumentSnapshot};
use crate::request_generator::RequestGenerator;
use crate::state_machine::DocumentStateMachine;
use crate::store::{InMemoryRouteHeaderStore, RouteHeaderStore};
use crate::traversal::RouteTraversal;
use routing_types::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What `submit_action` hands back
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_taken: ActionTakenId,
    pub outcome: ProcessOutcome,
    pub route_level: u32,
    /// Header version after the action
    pub version: u64,
}

impl ActionResult {
    pub fn status(&self) -> DocumentStatus {
        self.outcome.status_after
    }
}

/// The document routing engine
pub struct RoutingEngine {
    config: EngineConfig,
    definitions: Arc<dyn DefinitionSource>,
    directory: Arc<dyn PrincipalDirectory>,
    store: Arc<dyn RouteHeaderStore>,
    audit: Arc<dyn AuditSink>,
    arena: DocumentArena,
    processor: ActionProcessor,
}

impl RoutingEngine {
    /// Create an engine with in-memory persistence and audit
    pub fn new(
        config: EngineConfig,
        definitions: Arc<dyn DefinitionSource>,
        directory: Arc<dyn PrincipalDirectory>,
    ) -> Self {
        let audit: Arc<dyn AuditSink> = if config.audit.enabled {
            Arc::new(
                InMemoryAuditLog::new()
                    .with_capacity_per_document(config.audit.max_records_per_document),
            )
        } else {
            Arc::new(NoopAuditSink)
        };
        let processor = ActionProcessor::new(
            RouteTraversal::new(
                NodeInstanceStore::new(),
                RequestGenerator::new(config.require_known_principals),
            ),
            DocumentStateMachine::new(),
        );

        Self {
            arena: DocumentArena::new(config.lock_timeout()),
            config,
            definitions,
            directory,
            store: Arc::new(InMemoryRouteHeaderStore::new()),
            audit,
            processor,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn RouteHeaderStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn document_count(&self) -> usize {
        self.arena.len()
    }

    // ── Document Lifecycle ───────────────────────────────────────────

    /// Create a document of the latest version of a document type.
    ///
    /// The document starts INITIATED at route level 0 with its initial
    /// nodes active. No requests exist until the initiator routes it.
    pub fn create_document(
        &self,
        type_name: &str,
        initiator: impl Into<String>,
        title: impl Into<String>,
    ) -> RoutingResult<DocumentRouteHeader> {
        let initiator = PrincipalId::new(initiator);
        if self.config.require_known_principals && !self.directory.resolve_principal(&initiator) {
            return Err(RoutingError::UnknownPrincipal(initiator));
        }

        let graph = self.definitions.get_definition(type_name)?;
        let header = DocumentRouteHeader::new(
            DocumentId::generate(),
            graph.name(),
            graph.document_type().id.clone(),
            graph.version(),
            initiator,
        )
        .with_title(title);

        let mut record = DocumentRecord::new(header, graph);
        self.processor
            .traversal()
            .store()
            .activate_initial_nodes(&mut record);
        let header = record.header.clone();
        self.store.save(&record.snapshot())?;
        self.arena.insert(record)?;

        tracing::info!(
            document_id = %header.document_id,
            document_type = %header.document_type,
            version = header.document_type_version,
            initiator = %header.initiator,
            "Document created"
        );
        Ok(header)
    }

    /// Queue an ad hoc request for the document's ad hoc node.
    ///
    /// Only the initiator may add routes, and only before routing.
    pub fn add_adhoc_route(
        &self,
        document_id: &DocumentId,
        principal: &PrincipalId,
        route: AdHocRoute,
    ) -> RoutingResult<()> {
        if let Recipient::Principal(p) = &route.recipient {
            if self.config.require_known_principals && !self.directory.resolve_principal(p) {
                return Err(RoutingError::UnknownPrincipal(p.clone()));
            }
        }

        self.arena.mutate(
            document_id,
            |snapshot| self.store.save(snapshot),
            |record| {
                if !record.header.is_initiator(principal) {
                    return Err(RoutingError::NotAuthorized {
                        document_id: document_id.clone(),
                        principal: principal.clone(),
                        action: ActionType::Route,
                        reason: "only the initiator may add ad hoc routes".into(),
                    });
                }
                if record.header.status != DocumentStatus::Initiated {
                    return Err(RoutingError::InvalidState {
                        document_id: document_id.clone(),
                        status: record.header.status,
                        reason: "ad hoc routes can only be added before routing".into(),
                    });
                }
                let has_adhoc_node = record
                    .graph()
                    .document_type()
                    .nodes
                    .iter()
                    .any(|n| n.node_type == NodeType::AdHoc);
                if !has_adhoc_node {
                    return Err(RoutingError::InvalidState {
                        document_id: document_id.clone(),
                        status: record.header.status,
                        reason: format!(
                            "document type '{}' has no ad hoc node",
                            record.header.document_type
                        ),
                    });
                }
                tracing::debug!(
                    document_id = %document_id,
                    recipient = ?route.recipient,
                    action = %route.action,
                    "Ad hoc route added"
                );
                record.adhoc_routes.push(route);
                Ok(((), true))
            },
        )
    }

    /// Process an action. An audit record is written whatever the result.
    pub fn submit_action(&self, command: ActionCommand) -> RoutingResult<ActionResult> {
        let action_taken = ActionTakenId::generate();
        let mut status_before = None;

        let result = self.arena.mutate(
            &command.document_id,
            |snapshot| self.store.save(snapshot),
            |record| {
                status_before = Some(record.header.status);
                let outcome =
                    self.processor
                        .process(record, &command, &action_taken, self.directory.as_ref())?;
                let changed = outcome.changed();
                let result = ActionResult {
                    action_taken: action_taken.clone(),
                    route_level: record.header.route_level,
                    version: record.header.version + u64::from(changed),
                    outcome,
                };
                Ok((result, changed))
            },
        );

        let (outcome, status_after) = match &result {
            Ok(r) => (r.outcome.outcome.clone(), Some(r.outcome.status_after)),
            Err(e) => {
                tracing::info!(
                    document_id = %command.document_id,
                    principal = %command.principal,
                    action = %command.action,
                    error = %e,
                    "Action rejected"
                );
                (
                    ActionOutcome::Rejected {
                        reason: e.to_string(),
                    },
                    status_before,
                )
            }
        };
        self.write_audit(
            ActionTaken::new(
                action_taken,
                command.document_id.clone(),
                command.principal.clone(),
                command.action,
                outcome,
            )
            .with_annotation(command.annotation.clone())
            .with_statuses(status_before, status_after),
        );

        result
    }

    /// Route a document on behalf of its initiator
    pub fn route_document(
        &self,
        document_id: &DocumentId,
        principal: impl Into<String>,
    ) -> RoutingResult<ActionResult> {
        self.submit_action(ActionCommand::new(
            document_id.clone(),
            principal,
            ActionType::Route,
        ))
    }

    fn write_audit(&self, action: ActionTaken) {
        let document_id = action.document_id.clone();
        if let Err(e) = self.audit.record(action) {
            tracing::warn!(document_id = %document_id, error = %e, "Audit record not written");
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn get_state(&self, document_id: &DocumentId) -> RoutingResult<DocumentStatus> {
        self.arena.read(document_id, |r| r.header.status)
    }

    pub fn get_route_level(&self, document_id: &DocumentId) -> RoutingResult<u32> {
        self.arena.read(document_id, |r| r.header.route_level)
    }

    /// Names of the nodes the document is currently sitting at
    pub fn get_active_node_names(&self, document_id: &DocumentId) -> RoutingResult<Vec<String>> {
        self.arena.read(document_id, |r| r.active_node_names())
    }

    /// Every request ever generated for the document, in creation order
    pub fn get_action_requests(&self, document_id: &DocumentId) -> RoutingResult<Vec<ActionRequest>> {
        self.arena.read(document_id, |r| r.requests.clone())
    }

    pub fn get_pending_requests(
        &self,
        document_id: &DocumentId,
    ) -> RoutingResult<Vec<ActionRequest>> {
        self.arena
            .read(document_id, |r| r.pending_requests().into_iter().cloned().collect())
    }

    pub fn get_route_header(&self, document_id: &DocumentId) -> RoutingResult<DocumentRouteHeader> {
        self.arena.read(document_id, |r| r.header.clone())
    }

    pub fn route_path(&self, document_id: &DocumentId) -> RoutingResult<Vec<RoutePathEntry>> {
        let store = self.processor.traversal().store();
        self.arena.read(document_id, |r| store.route_path(r))
    }

    pub fn snapshot(&self, document_id: &DocumentId) -> RoutingResult<DocumentSnapshot> {
        self.arena.read(document_id, |r| r.snapshot())
    }

    /// Whether a principal is a superuser of the document's type
    pub fn is_superuser(
        &self,
        document_id: &DocumentId,
        principal: &PrincipalId,
    ) -> RoutingResult<bool> {
        self.arena
            .read(document_id, |r| is_superuser(r, principal, self.directory.as_ref()))
    }

    /// A principal's inbox across all documents, oldest assignment first
    pub fn action_list(&self, principal: &PrincipalId) -> RoutingResult<Vec<ActionItem>> {
        let mut items = Vec::new();
        for id in self.arena.ids() {
            let mut found = self.arena.read(&id, |r| {
                action_list::for_principal(r, principal, self.directory.as_ref())
            })?;
            items.append(&mut found);
        }
        items.sort_by(|a, b| a.assigned_at.cmp(&b.assigned_at));
        Ok(items)
    }
}
