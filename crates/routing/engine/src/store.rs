//! Route header persistence seam
//!
//! The engine commits a document only after the store has accepted the
//! new snapshot. Business-object persistence is out of scope; this only
//! covers the routing state.

use crate::record::DocumentSnapshot;
use dashmap::DashMap;
use routing_types::{DocumentId, RoutingResult};
use std::sync::Arc;

/// Storage for committed document routing state
pub trait RouteHeaderStore: Send + Sync {
    /// Persist a snapshot. An error aborts the commit.
    fn save(&self, snapshot: &DocumentSnapshot) -> RoutingResult<()>;

    fn load(&self, document_id: &DocumentId) -> RoutingResult<Option<DocumentSnapshot>>;
}

/// In-memory store for development and testing.
pub struct InMemoryRouteHeaderStore {
    snapshots: Arc<DashMap<DocumentId, DocumentSnapshot>>,
}

impl InMemoryRouteHeaderStore {
    pub fn new() -> Self {
        Self {
            snapshots: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn clear(&self) {
        self.snapshots.clear();
    }
}

impl Default for InMemoryRouteHeaderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteHeaderStore for InMemoryRouteHeaderStore {
    fn save(&self, snapshot: &DocumentSnapshot) -> RoutingResult<()> {
        self.snapshots
            .insert(snapshot.header.document_id.clone(), snapshot.clone());
        Ok(())
    }

    fn load(&self, document_id: &DocumentId) -> RoutingResult<Option<DocumentSnapshot>> {
        Ok(self.snapshots.get(document_id).map(|s| s.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routing_types::{DocumentRouteHeader, DocumentTypeId, PrincipalId};

    fn make_snapshot(id: &str, version: u64) -> DocumentSnapshot {
        let mut header = DocumentRouteHeader::new(
            DocumentId::new(id),
            "Travel",
            DocumentTypeId::new("dt"),
            1,
            PrincipalId::new("ewestfal"),
        );
        header.version = version;
        DocumentSnapshot {
            header,
            instances: Vec::new(),
            requests: Vec::new(),
            adhoc_routes: Vec::new(),
        }
    }

    #[test]
    fn test_save_and_load() {
        let store = InMemoryRouteHeaderStore::new();
        assert!(store.is_empty());
        store.save(&make_snapshot("doc-1", 1)).unwrap();
        store.save(&make_snapshot("doc-1", 2)).unwrap();
        store.save(&make_snapshot("doc-2", 1)).unwrap();

        assert_eq!(store.len(), 2);
        let loaded = store.load(&DocumentId::new("doc-1")).unwrap().unwrap();
        assert_eq!(loaded.header.version, 2);
        assert!(store.load(&DocumentId::new("doc-3")).unwrap().is_none());
    }

    #[test]
    fn test_snapshot_json_roundtrip() {
        let snapshot = make_snapshot("doc-1", 4);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"INITIATED\""));
        let back: DocumentSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
