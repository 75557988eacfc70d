//! Document records: everything the engine mutates for one document
//!
//! A record bundles the route header, the append-only instance list, the
//! canonical action requests, and the pinned routing graph. The arena
//! hands out a working copy per action and commits it only on success.

use crate::graph::RouteGraph;
use routing_types::{
    ActionRequest, ActionRequestedType, DocumentRouteHeader, NodeInstanceId, Recipient,
    RouteNodeInstance, RoutingError, RoutingResult,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A request added by the initiator before routing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdHocRoute {
    pub recipient: Recipient,
    pub action: ActionRequestedType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

impl AdHocRoute {
    pub fn new(recipient: Recipient, action: ActionRequestedType) -> Self {
        Self {
            recipient,
            action,
            annotation: None,
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }
}

/// Serializable view of a record, handed to persistence
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub header: DocumentRouteHeader,
    pub instances: Vec<RouteNodeInstance>,
    pub requests: Vec<ActionRequest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adhoc_routes: Vec<AdHocRoute>,
}

/// The mutable routing state of one document
#[derive(Clone, Debug)]
pub struct DocumentRecord {
    pub header: DocumentRouteHeader,
    pub instances: Vec<RouteNodeInstance>,
    pub requests: Vec<ActionRequest>,
    /// Routes waiting for the ad hoc node to process them
    pub adhoc_routes: Vec<AdHocRoute>,
    graph: Arc<RouteGraph>,
}

impl DocumentRecord {
    pub fn new(header: DocumentRouteHeader, graph: Arc<RouteGraph>) -> Self {
        Self {
            header,
            instances: Vec::new(),
            requests: Vec::new(),
            adhoc_routes: Vec::new(),
            graph,
        }
    }

    pub fn graph(&self) -> &RouteGraph {
        &self.graph
    }

    pub fn graph_arc(&self) -> Arc<RouteGraph> {
        Arc::clone(&self.graph)
    }

    // ── Instances ────────────────────────────────────────────────────

    pub fn instance(&self, id: NodeInstanceId) -> RoutingResult<&RouteNodeInstance> {
        self.instances
            .get(id.index())
            .ok_or_else(|| self.missing_instance(id))
    }

    pub fn instance_mut(&mut self, id: NodeInstanceId) -> RoutingResult<&mut RouteNodeInstance> {
        if id.index() >= self.instances.len() {
            return Err(self.missing_instance(id));
        }
        Ok(&mut self.instances[id.index()])
    }

    fn missing_instance(&self, id: NodeInstanceId) -> RoutingError {
        RoutingError::InvalidState {
            document_id: self.header.document_id.clone(),
            status: self.header.status,
            reason: format!("node instance {} does not exist", id),
        }
    }

    /// The instance created for a node definition, if any.
    ///
    /// The graph is acyclic, so each definition is instantiated at most
    /// once per document.
    pub fn instance_for_node(&self, node_name: &str) -> Option<NodeInstanceId> {
        self.instances
            .iter()
            .find(|i| i.node_name == node_name)
            .map(|i| i.id)
    }

    pub fn next_instance_id(&self) -> NodeInstanceId {
        NodeInstanceId(self.instances.len())
    }

    pub fn active_instances(&self) -> Vec<&RouteNodeInstance> {
        self.instances.iter().filter(|i| i.active).collect()
    }

    pub fn waiting_instances(&self) -> Vec<&RouteNodeInstance> {
        self.instances.iter().filter(|i| i.is_waiting()).collect()
    }

    pub fn active_node_names(&self) -> Vec<String> {
        self.instances
            .iter()
            .filter(|i| i.active)
            .map(|i| i.node_name.clone())
            .collect()
    }

    // ── Requests ─────────────────────────────────────────────────────

    pub fn requests_for_instance(&self, id: NodeInstanceId) -> Vec<&ActionRequest> {
        self.requests
            .iter()
            .filter(|r| r.node_instance == id)
            .collect()
    }

    /// Whether an instance still has unresolved approve requests
    pub fn has_pending_blocking(&self, id: NodeInstanceId) -> bool {
        self.requests
            .iter()
            .any(|r| r.node_instance == id && r.is_pending() && r.is_blocking())
    }

    pub fn pending_requests(&self) -> Vec<&ActionRequest> {
        self.requests.iter().filter(|r| r.is_pending()).collect()
    }

    pub fn has_pending_requests(&self) -> bool {
        self.requests.iter().any(|r| r.is_pending())
    }

    pub fn has_pending_blocking_requests(&self) -> bool {
        self.requests.iter().any(|r| r.is_pending() && r.is_blocking())
    }

    /// Nothing left to traverse: no active or waiting instances
    pub fn traversal_finished(&self) -> bool {
        !self.instances.iter().any(|i| i.active || i.is_waiting())
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            header: self.header.clone(),
            instances: self.instances.clone(),
            requests: self.requests.clone(),
            adhoc_routes: self.adhoc_routes.clone(),
        }
    }
}
