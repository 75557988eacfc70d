//! Route node instances: runtime occurrences of route nodes for one document
//!
//! Instances live in a per-document append-only list. Predecessor and
//! successor links are indices into that list, so the instance graph never
//! owns itself and the audit trail can be walked in either direction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Index of an instance within its document's instance list
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeInstanceId(pub usize);

impl NodeInstanceId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeInstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A live instantiation of a route node definition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteNodeInstance {
    pub id: NodeInstanceId,
    /// Name of the node definition this instance was created from
    pub node_name: String,
    /// Sequential depth at which this instance was reached
    pub route_level: u32,
    /// Awaiting action at this node
    pub active: bool,
    /// Traversal has moved past this node
    pub complete: bool,
    /// Requests (or the auto-complete decision) have been produced
    pub requests_generated: bool,
    /// Instances whose completion led here, in arrival order
    pub predecessors: Vec<NodeInstanceId>,
    /// Instances created when traversal moved past this node
    pub successors: Vec<NodeInstanceId>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl RouteNodeInstance {
    /// A new, not yet active instance
    pub fn new(id: NodeInstanceId, node_name: impl Into<String>, route_level: u32) -> Self {
        Self {
            id,
            node_name: node_name.into(),
            route_level,
            active: false,
            complete: false,
            requests_generated: false,
            predecessors: Vec::new(),
            successors: Vec::new(),
            created_at: Utc::now(),
            activated_at: None,
            completed_at: None,
        }
    }

    pub fn activate(&mut self) {
        self.active = true;
        self.activated_at = Some(Utc::now());
    }

    pub fn mark_complete(&mut self) {
        self.active = false;
        self.complete = true;
        self.completed_at = Some(Utc::now());
    }

    /// Stop waiting without completing (disapproval or cancellation)
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_initial(&self) -> bool {
        self.predecessors.is_empty()
    }

    /// Created by an earlier branch but still waiting for the rest to arrive
    pub fn is_waiting(&self) -> bool {
        !self.active && !self.complete && !self.predecessors.is_empty()
    }

    pub fn active_duration_secs(&self) -> Option<i64> {
        let start = self.activated_at?;
        let end = self.completed_at.unwrap_or_else(Utc::now);
        Some((end - start).num_seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_lifecycle() {
        let mut inst = RouteNodeInstance::new(NodeInstanceId(0), "AdHoc", 0);
        assert!(inst.is_initial());
        assert!(!inst.active);

        inst.activate();
        assert!(inst.active);
        assert!(inst.activated_at.is_some());

        inst.mark_complete();
        assert!(!inst.active);
        assert!(inst.complete);
        assert!(inst.active_duration_secs().is_some());
    }

    #[test]
    fn test_waiting_join_instance() {
        let mut join = RouteNodeInstance::new(NodeInstanceId(4), "Join", 2);
        join.predecessors.push(NodeInstanceId(2));
        assert!(join.is_waiting());

        join.activate();
        assert!(!join.is_waiting());
    }
}
