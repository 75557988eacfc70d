//! Action requests: obligations raised at a route node
//!
//! One canonical request exists per (node instance, recipient, requested
//! action). A request addressed to a group is resolved by whichever member
//! acts first; member copies are derived for inbox display only.

use crate::{ActionTakenId, ActionType, DocumentId, NodeInstanceId, PrincipalId, Recipient};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for an action request
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionRequestId(pub String);

impl ActionRequestId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ActionRequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The action a request asks for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionRequestedType {
    Approve,
    Acknowledge,
    Fyi,
}

impl ActionRequestedType {
    /// Blocking requests hold their node instance open until resolved
    pub fn is_blocking(&self) -> bool {
        matches!(self, ActionRequestedType::Approve)
    }

    pub fn code(&self) -> &'static str {
        match self {
            ActionRequestedType::Approve => "A",
            ActionRequestedType::Acknowledge => "K",
            ActionRequestedType::Fyi => "F",
        }
    }
}

impl std::fmt::Display for ActionRequestedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionRequestedType::Approve => write!(f, "approve"),
            ActionRequestedType::Acknowledge => write!(f, "acknowledge"),
            ActionRequestedType::Fyi => write!(f, "fyi"),
        }
    }
}

/// Lifecycle of an action request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionRequestStatus {
    Initialized,
    Activated,
    Done,
    /// Superseded without being individually resolved
    Deactivated,
}

impl ActionRequestStatus {
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            ActionRequestStatus::Initialized | ActionRequestStatus::Activated
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            ActionRequestStatus::Initialized => "I",
            ActionRequestStatus::Activated => "A",
            ActionRequestStatus::Done => "D",
            ActionRequestStatus::Deactivated => "X",
        }
    }
}

/// How a request was resolved
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestResolution {
    pub principal: PrincipalId,
    pub action: ActionType,
    pub action_taken: ActionTakenId,
    pub resolved_at: DateTime<Utc>,
}

/// An obligation for a principal or group to act before a node completes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub id: ActionRequestId,
    pub document_id: DocumentId,
    /// The node instance that raised this request
    pub node_instance: NodeInstanceId,
    pub node_name: String,
    pub recipient: Recipient,
    pub action_requested: ActionRequestedType,
    pub route_level: u32,
    pub status: ActionRequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<RequestResolution>,
}

impl ActionRequest {
    pub fn new(
        document_id: DocumentId,
        node_instance: NodeInstanceId,
        node_name: impl Into<String>,
        recipient: Recipient,
        action_requested: ActionRequestedType,
        route_level: u32,
    ) -> Self {
        Self {
            id: ActionRequestId::generate(),
            document_id,
            node_instance,
            node_name: node_name.into(),
            recipient,
            action_requested,
            route_level,
            status: ActionRequestStatus::Initialized,
            annotation: None,
            created_at: Utc::now(),
            resolution: None,
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    pub fn activate(&mut self) {
        if self.status == ActionRequestStatus::Initialized {
            self.status = ActionRequestStatus::Activated;
        }
    }

    /// Mark done. Already resolved requests are left untouched.
    pub fn resolve(&mut self, resolution: RequestResolution) -> bool {
        if !self.status.is_pending() {
            return false;
        }
        self.status = ActionRequestStatus::Done;
        self.resolution = Some(resolution);
        true
    }

    pub fn deactivate(&mut self) {
        if self.status.is_pending() {
            self.status = ActionRequestStatus::Deactivated;
        }
    }

    pub fn is_activated(&self) -> bool {
        self.status == ActionRequestStatus::Activated
    }

    pub fn is_pending(&self) -> bool {
        self.status.is_pending()
    }

    pub fn is_blocking(&self) -> bool {
        self.action_requested.is_blocking()
    }

    /// Whether `principal` resolved this request with `action`
    pub fn resolved_by(&self, principal: &PrincipalId, action: ActionType) -> bool {
        self.resolution
            .as_ref()
            .map(|r| &r.principal == principal && r.action == action)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_request() -> ActionRequest {
        ActionRequest::new(
            DocumentId::new("doc-1"),
            NodeInstanceId(1),
            "WorkflowDocument",
            Recipient::principal("bmcgough"),
            ActionRequestedType::Approve,
            1,
        )
    }

    fn resolution() -> RequestResolution {
        RequestResolution {
            principal: PrincipalId::new("bmcgough"),
            action: ActionType::Approve,
            action_taken: ActionTakenId::generate(),
            resolved_at: Utc::now(),
        }
    }

    #[test]
    fn test_request_lifecycle() {
        let mut req = make_request();
        assert_eq!(req.status, ActionRequestStatus::Initialized);
        assert!(req.is_pending());

        req.activate();
        assert!(req.is_activated());

        assert!(req.resolve(resolution()));
        assert_eq!(req.status, ActionRequestStatus::Done);
        assert!(req.resolved_by(&PrincipalId::new("bmcgough"), ActionType::Approve));
        assert!(!req.resolved_by(&PrincipalId::new("bmcgough"), ActionType::Acknowledge));
    }

    #[test]
    fn test_resolve_twice_is_noop() {
        let mut req = make_request();
        req.activate();
        assert!(req.resolve(resolution()));
        let first = req.resolution.clone();

        assert!(!req.resolve(resolution()));
        assert_eq!(req.resolution, first);
    }

    #[test]
    fn test_deactivate_only_pending() {
        let mut req = make_request();
        req.activate();
        req.deactivate();
        assert_eq!(req.status, ActionRequestStatus::Deactivated);

        let mut done = make_request();
        done.activate();
        done.resolve(resolution());
        done.deactivate();
        assert_eq!(done.status, ActionRequestStatus::Done);
    }

    #[test]
    fn test_blocking_table() {
        assert!(ActionRequestedType::Approve.is_blocking());
        assert!(!ActionRequestedType::Acknowledge.is_blocking());
        assert!(!ActionRequestedType::Fyi.is_blocking());
        assert_eq!(ActionRequestedType::Acknowledge.code(), "K");
    }
}
