//! Actions taken by principals, their audit records, and inbox items

use crate::{
    ActionRequestId, ActionRequestedType, DocumentId, DocumentStatus, GroupId, PrincipalId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Action Type ──────────────────────────────────────────────────────

/// An action a principal can take against a document
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Submit the document for routing
    Route,
    Approve,
    Acknowledge,
    /// Clear an FYI request
    Fyi,
    Disapprove,
    Cancel,
}

impl ActionType {
    /// Whether taking this action resolves a request of the given type
    pub fn satisfies(&self, requested: ActionRequestedType) -> bool {
        use ActionRequestedType as R;
        match self {
            ActionType::Approve => matches!(requested, R::Approve | R::Acknowledge | R::Fyi),
            ActionType::Acknowledge => matches!(requested, R::Acknowledge | R::Fyi),
            ActionType::Fyi => requested == R::Fyi,
            ActionType::Disapprove => requested == R::Approve,
            ActionType::Route | ActionType::Cancel => false,
        }
    }

    /// Actions that end routing for the whole document
    pub fn is_terminating(&self) -> bool {
        matches!(self, ActionType::Disapprove | ActionType::Cancel)
    }

    pub fn code(&self) -> &'static str {
        match self {
            ActionType::Route => "O",
            ActionType::Approve => "A",
            ActionType::Acknowledge => "K",
            ActionType::Fyi => "F",
            ActionType::Disapprove => "D",
            ActionType::Cancel => "X",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActionType::Route => "route",
            ActionType::Approve => "approve",
            ActionType::Acknowledge => "acknowledge",
            ActionType::Fyi => "fyi",
            ActionType::Disapprove => "disapprove",
            ActionType::Cancel => "cancel",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "route" => Ok(ActionType::Route),
            "approve" => Ok(ActionType::Approve),
            "acknowledge" | "ack" => Ok(ActionType::Acknowledge),
            "fyi" => Ok(ActionType::Fyi),
            "disapprove" => Ok(ActionType::Disapprove),
            "cancel" => Ok(ActionType::Cancel),
            other => Err(format!("unknown action type: {}", other)),
        }
    }
}

// ── Action Taken (audit) ─────────────────────────────────────────────

/// Unique identifier for an audit record
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionTakenId(pub String);

impl ActionTakenId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for ActionTakenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What an attempted action amounted to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// Requests were resolved or the document changed
    Applied { resolved_requests: usize },
    /// A retry of an action that had already been applied
    NoOp,
    Rejected { reason: String },
}

impl ActionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ActionOutcome::Applied { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, ActionOutcome::Rejected { .. })
    }
}

/// Append-only audit record of an attempted action
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionTaken {
    pub id: ActionTakenId,
    pub document_id: DocumentId,
    pub principal: PrincipalId,
    pub action: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    pub outcome: ActionOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_before: Option<DocumentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_after: Option<DocumentStatus>,
    pub taken_at: DateTime<Utc>,
}

impl ActionTaken {
    pub fn new(
        id: ActionTakenId,
        document_id: DocumentId,
        principal: PrincipalId,
        action: ActionType,
        outcome: ActionOutcome,
    ) -> Self {
        Self {
            id,
            document_id,
            principal,
            action,
            annotation: None,
            outcome,
            status_before: None,
            status_after: None,
            taken_at: Utc::now(),
        }
    }

    pub fn with_annotation(mut self, annotation: Option<String>) -> Self {
        self.annotation = annotation;
        self
    }

    pub fn with_statuses(
        mut self,
        before: Option<DocumentStatus>,
        after: Option<DocumentStatus>,
    ) -> Self {
        self.status_before = before;
        self.status_after = after;
        self
    }
}

// ── Action Items (inbox projection) ──────────────────────────────────

/// A read-only inbox entry derived from an activated request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub document_id: DocumentId,
    pub document_label: String,
    /// The canonical request this item was derived from
    pub request_id: ActionRequestId,
    pub principal: PrincipalId,
    /// Set when the item is a member copy of a group request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via_group: Option<GroupId>,
    pub action_requested: ActionRequestedType,
    pub node_name: String,
    pub route_level: u32,
    pub assigned_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_satisfaction_table() {
        use ActionRequestedType as R;
        assert!(ActionType::Approve.satisfies(R::Approve));
        assert!(ActionType::Approve.satisfies(R::Acknowledge));
        assert!(ActionType::Acknowledge.satisfies(R::Fyi));
        assert!(!ActionType::Acknowledge.satisfies(R::Approve));
        assert!(!ActionType::Fyi.satisfies(R::Acknowledge));
        assert!(ActionType::Disapprove.satisfies(R::Approve));
        assert!(!ActionType::Disapprove.satisfies(R::Acknowledge));
        assert!(!ActionType::Route.satisfies(R::Approve));
    }

    #[test]
    fn test_parse_action_type() {
        assert_eq!("APPROVE".parse::<ActionType>(), Ok(ActionType::Approve));
        assert_eq!("ack".parse::<ActionType>(), Ok(ActionType::Acknowledge));
        assert!("blanket".parse::<ActionType>().is_err());
    }

    #[test]
    fn test_outcome_serde() {
        let json = serde_json::to_value(ActionOutcome::Applied {
            resolved_requests: 2,
        })
        .unwrap();
        assert_eq!(json["outcome"], "applied");
        assert_eq!(json["resolved_requests"], 2);
    }
}
