//! Shared fixtures for routing integration tests.

#![allow(dead_code)]

use routing_engine::{
    ActionCommand, ActionResult, DefinitionRegistry, EngineConfig, InMemoryAuditLog,
    InMemoryDirectory, RoutingEngine,
};
use routing_types::*;
use std::sync::Arc;

pub struct Harness {
    pub engine: RoutingEngine,
    pub registry: Arc<DefinitionRegistry>,
    pub audit: Arc<InMemoryAuditLog>,
}

pub fn make_directory() -> InMemoryDirectory {
    InMemoryDirectory::new()
        .with_principals(["ewestfal", "bmcgough", "rkirkend", "temay", "jhopf", "admin"])
        .with_group("finance", ["xqi", "natjohns"])
}

/// AdHoc → WorkflowDocument (approve) → Acknowledge1 → Acknowledge2
pub fn sequential_type() -> DocumentType {
    DocumentType::new("SeqDocType")
        .with_label("Sequential Document")
        .with_superuser(Recipient::principal("admin"))
        .with_node(RouteNodeDefinition::adhoc("AdHoc").then("WorkflowDocument"))
        .unwrap()
        .with_node(
            RouteNodeDefinition::approve("WorkflowDocument", ResponderRule::principal("bmcgough"))
                .then("Acknowledge1"),
        )
        .unwrap()
        .with_node(
            RouteNodeDefinition::acknowledge("Acknowledge1", ResponderRule::principal("temay"))
                .then("Acknowledge2"),
        )
        .unwrap()
        .with_node(RouteNodeDefinition::acknowledge(
            "Acknowledge2",
            ResponderRule::principal("jhopf"),
        ))
        .unwrap()
}

/// AdHoc → Split → {Left (bmcgough), Right (rkirkend)} → Join → Final (temay)
pub fn parallel_type(name: &str, join: RouteNodeDefinition) -> DocumentType {
    DocumentType::new(name)
        .with_superuser(Recipient::group("finance"))
        .with_node(RouteNodeDefinition::adhoc("AdHoc").then("Split"))
        .unwrap()
        .with_node(RouteNodeDefinition::split("Split").then("Left").then("Right"))
        .unwrap()
        .with_node(
            RouteNodeDefinition::approve("Left", ResponderRule::principal("bmcgough")).then("Join"),
        )
        .unwrap()
        .with_node(
            RouteNodeDefinition::approve("Right", ResponderRule::principal("rkirkend")).then("Join"),
        )
        .unwrap()
        .with_node(join.then("Final"))
        .unwrap()
        .with_node(RouteNodeDefinition::approve(
            "Final",
            ResponderRule::principal("temay"),
        ))
        .unwrap()
}

pub fn make_harness(types: Vec<DocumentType>) -> Harness {
    make_harness_with(EngineConfig::default(), types)
}

pub fn make_harness_with(config: EngineConfig, types: Vec<DocumentType>) -> Harness {
    let registry = Arc::new(DefinitionRegistry::new());
    for dt in types {
        registry.version_and_save(dt).unwrap();
    }
    let audit = Arc::new(InMemoryAuditLog::new());
    let engine = RoutingEngine::new(config, registry.clone(), Arc::new(make_directory()))
        .with_audit_sink(audit.clone());
    Harness {
        engine,
        registry,
        audit,
    }
}

impl Harness {
    /// Create a document as ewestfal and route it
    pub fn create_and_route(&self, type_name: &str) -> DocumentId {
        let header = self
            .engine
            .create_document(type_name, "ewestfal", "Test document")
            .unwrap();
        self.engine
            .route_document(&header.document_id, "ewestfal")
            .unwrap();
        header.document_id
    }

    pub fn act(
        &self,
        id: &DocumentId,
        principal: &str,
        action: ActionType,
    ) -> RoutingResult<ActionResult> {
        self.engine
            .submit_action(ActionCommand::new(id.clone(), principal, action))
    }

    pub fn state(&self, id: &DocumentId) -> DocumentStatus {
        self.engine.get_state(id).unwrap()
    }

    pub fn active_nodes(&self, id: &DocumentId) -> Vec<String> {
        self.engine.get_active_node_names(id).unwrap()
    }

    pub fn pending_for(&self, id: &DocumentId, principal: &str) -> Vec<ActionRequest> {
        self.engine
            .get_pending_requests(id)
            .unwrap()
            .into_iter()
            .filter(|r| r.recipient == Recipient::principal(principal))
            .collect()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
