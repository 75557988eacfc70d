//! Document route headers: the runtime record of a routed document

use crate::{DocumentTypeId, NodeInstanceId, PrincipalId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Document Identifier ──────────────────────────────────────────────

/// Unique identifier for a document
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Document Status ──────────────────────────────────────────────────

/// Overall routing state of a document
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Initiated,
    Enroute,
    /// Approvals complete; acknowledgements may be outstanding
    Processed,
    Final,
    Disapproved,
    Canceled,
}

impl DocumentStatus {
    /// No further actions change a terminal document
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DocumentStatus::Final | DocumentStatus::Disapproved | DocumentStatus::Canceled
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            DocumentStatus::Initiated => "I",
            DocumentStatus::Enroute => "R",
            DocumentStatus::Processed => "P",
            DocumentStatus::Final => "F",
            DocumentStatus::Disapproved => "D",
            DocumentStatus::Canceled => "X",
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DocumentStatus::Initiated => "INITIATED",
            DocumentStatus::Enroute => "ENROUTE",
            DocumentStatus::Processed => "PROCESSED",
            DocumentStatus::Final => "FINAL",
            DocumentStatus::Disapproved => "DISAPPROVED",
            DocumentStatus::Canceled => "CANCELED",
        };
        write!(f, "{}", s)
    }
}

/// One recorded status transition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: DocumentStatus,
    pub to: DocumentStatus,
    pub at: DateTime<Utc>,
}

// ── Route Header ─────────────────────────────────────────────────────

/// The document's runtime routing record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentRouteHeader {
    pub document_id: DocumentId,
    pub document_type: String,
    /// The document type version pinned for this document
    pub document_type_id: DocumentTypeId,
    pub document_type_version: u32,
    pub initiator: PrincipalId,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    pub status: DocumentStatus,
    /// Highest sequential depth reached; never decreases
    pub route_level: u32,
    /// Entry points into the instance graph
    pub initial_instances: Vec<NodeInstanceId>,
    /// Incremented on every committed mutation
    pub version: u64,
    pub status_history: Vec<StatusChange>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentRouteHeader {
    pub fn new(
        document_id: DocumentId,
        document_type: impl Into<String>,
        document_type_id: DocumentTypeId,
        document_type_version: u32,
        initiator: PrincipalId,
    ) -> Self {
        let now = Utc::now();
        Self {
            document_id,
            document_type: document_type.into(),
            document_type_id,
            document_type_version,
            initiator,
            title: String::new(),
            status: DocumentStatus::Initiated,
            route_level: 0,
            initial_instances: Vec::new(),
            version: 0,
            status_history: Vec::new(),
            created_at: now,
            routed_at: None,
            finished_at: None,
            updated_at: now,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Move to a new status, recording the change
    pub fn transition(&mut self, to: DocumentStatus) {
        if self.status == to {
            return;
        }
        let now = Utc::now();
        self.status_history.push(StatusChange {
            from: self.status,
            to,
            at: now,
        });
        self.status = to;
        if to == DocumentStatus::Enroute && self.routed_at.is_none() {
            self.routed_at = Some(now);
        }
        if to.is_terminal() {
            self.finished_at = Some(now);
        }
        self.updated_at = now;
    }

    /// Raise the route level; lower values are ignored
    pub fn raise_route_level(&mut self, level: u32) {
        if level > self.route_level {
            self.route_level = level;
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_initiator(&self, principal: &PrincipalId) -> bool {
        &self.initiator == principal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_header() -> DocumentRouteHeader {
        DocumentRouteHeader::new(
            DocumentId::new("doc-1"),
            "SeqDocType",
            DocumentTypeId::new("dt-1"),
            1,
            PrincipalId::new("ewestfal"),
        )
    }

    #[test]
    fn test_new_header_is_initiated() {
        let header = make_header();
        assert_eq!(header.status, DocumentStatus::Initiated);
        assert_eq!(header.route_level, 0);
        assert!(header.is_initiator(&PrincipalId::new("ewestfal")));
        assert!(!header.is_terminal());
    }

    #[test]
    fn test_transition_records_history() {
        let mut header = make_header();
        header.transition(DocumentStatus::Enroute);
        header.transition(DocumentStatus::Enroute);
        header.transition(DocumentStatus::Processed);
        header.transition(DocumentStatus::Final);

        assert_eq!(header.status_history.len(), 3);
        assert_eq!(header.status_history[0].from, DocumentStatus::Initiated);
        assert!(header.routed_at.is_some());
        assert!(header.finished_at.is_some());
        assert!(header.is_terminal());
    }

    #[test]
    fn test_route_level_never_decreases() {
        let mut header = make_header();
        header.raise_route_level(3);
        header.raise_route_level(1);
        assert_eq!(header.route_level, 3);
    }

    #[test]
    fn test_status_serde_uses_upper_case() {
        let json = serde_json::to_string(&DocumentStatus::Disapproved).unwrap();
        assert_eq!(json, "\"DISAPPROVED\"");
        assert_eq!(DocumentStatus::Enroute.to_string(), "ENROUTE");
    }
}
