//! Error types for the routing layer

use crate::{ActionType, DocumentId, DocumentStatus, PrincipalId};

/// Malformed document type definitions, rejected when a type is compiled
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    #[error("Document type '{0}' has no route nodes")]
    EmptyDefinition(String),

    #[error("Duplicate route node: {0}")]
    DuplicateNode(String),

    #[error("Route node '{node}' references unknown successor '{successor}'")]
    UnknownSuccessor { node: String, successor: String },

    #[error("Route node '{node}' lists successor '{successor}' more than once")]
    DuplicateEdge { node: String, successor: String },

    #[error("Cycle detected in routing graph: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("Invalid document type name: {0:?}")]
    InvalidName(String),
}

/// Errors that can occur in routing operations
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("Definition error: {0}")]
    Definition(#[from] DefinitionError),

    #[error("Document type not found: {0}")]
    DocumentTypeNotFound(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    #[error("Principal '{principal}' may not {action} document {document_id}: {reason}")]
    NotAuthorized {
        document_id: DocumentId,
        principal: PrincipalId,
        action: ActionType,
        reason: String,
    },

    #[error("Document {document_id} is {status}: {reason}")]
    InvalidState {
        document_id: DocumentId,
        status: DocumentStatus,
        reason: String,
    },

    #[error("Concurrent modification of document {document_id}: {reason}")]
    ConcurrentModification {
        document_id: DocumentId,
        reason: String,
    },

    #[error("Unknown principal: {0}")]
    UnknownPrincipal(PrincipalId),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RoutingError {
    /// Whether the caller should retry the whole action
    pub fn is_retryable(&self) -> bool {
        matches!(self, RoutingError::ConcurrentModification { .. })
    }
}

/// Result type alias for routing operations
pub type RoutingResult<T> = Result<T, RoutingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_path() {
        let err = DefinitionError::Cycle {
            path: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(err.to_string(), "Cycle detected in routing graph: A -> B -> A");
    }

    #[test]
    fn test_retryable() {
        let err = RoutingError::ConcurrentModification {
            document_id: DocumentId::new("d"),
            reason: "lock timeout".into(),
        };
        assert!(err.is_retryable());
        assert!(!RoutingError::DocumentTypeNotFound("x".into()).is_retryable());
    }
}
