//! Document arena: per-document critical sections
//!
//! Each document record sits behind its own mutex, keyed by document ID.
//! Mutations run against a working copy; the copy replaces the committed
//! record only after the closure succeeds and the persistence callback
//! accepts the snapshot. Documents never share a lock.

use crate::record::{DocumentRecord, DocumentSnapshot};
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use routing_types::{DocumentId, RoutingError, RoutingResult};
use std::sync::Arc;
use std::time::Duration;

type Slot = Arc<Mutex<DocumentRecord>>;

/// All live document records
pub struct DocumentArena {
    documents: DashMap<DocumentId, Slot>,
    lock_timeout: Duration,
}

impl DocumentArena {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            documents: DashMap::new(),
            lock_timeout,
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Add a freshly created document
    pub fn insert(&self, record: DocumentRecord) -> RoutingResult<()> {
        let id = record.header.document_id.clone();
        match self.documents.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(entry) => Err(RoutingError::InvalidState {
                document_id: entry.key().clone(),
                status: record.header.status,
                reason: "a document with this ID already exists".into(),
            }),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(Arc::new(Mutex::new(record)));
                Ok(())
            }
        }
    }

    pub fn contains(&self, id: &DocumentId) -> bool {
        self.documents.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn ids(&self) -> Vec<DocumentId> {
        self.documents.iter().map(|e| e.key().clone()).collect()
    }

    /// Clone the slot out so the map shard is not held while waiting
    fn slot(&self, id: &DocumentId) -> RoutingResult<Slot> {
        self.documents
            .get(id)
            .map(|s| Arc::clone(s.value()))
            .ok_or_else(|| RoutingError::DocumentNotFound(id.clone()))
    }

    fn lock_failed(&self, id: &DocumentId) -> RoutingError {
        tracing::warn!(
            document_id = %id,
            timeout_ms = self.lock_timeout.as_millis() as u64,
            "Document lock not acquired"
        );
        RoutingError::ConcurrentModification {
            document_id: id.clone(),
            reason: format!(
                "document is busy; lock not acquired within {}ms",
                self.lock_timeout.as_millis()
            ),
        }
    }

    /// Run a read-only closure against the committed record
    pub fn read<T>(&self, id: &DocumentId, f: impl FnOnce(&DocumentRecord) -> T) -> RoutingResult<T> {
        let slot = self.slot(id)?;
        let guard = slot
            .try_lock_for(self.lock_timeout)
            .ok_or_else(|| self.lock_failed(id))?;
        Ok(f(&guard))
    }

    /// Run a mutation inside the document's critical section.
    ///
    /// The closure returns its result and whether it changed the record.
    /// Changed records get their version bumped, are handed to `persist`,
    /// and are committed only if that succeeds. On any error the committed
    /// record is untouched.
    pub fn mutate<T>(
        &self,
        id: &DocumentId,
        persist: impl FnOnce(&DocumentSnapshot) -> RoutingResult<()>,
        f: impl FnOnce(&mut DocumentRecord) -> RoutingResult<(T, bool)>,
    ) -> RoutingResult<T> {
        let slot = self.slot(id)?;
        let mut guard = slot
            .try_lock_for(self.lock_timeout)
            .ok_or_else(|| self.lock_failed(id))?;

        let mut working = guard.clone();
        let (result, changed) = f(&mut working)?;
        if changed {
            working.header.version += 1;
            working.header.updated_at = Utc::now();
            persist(&working.snapshot())?;
            *guard = working;
        }
        Ok(result)
    }
}

impl Default for DocumentArena {
    fn default() -> Self {
        Self::new(Duration::from_millis(5000))
    }
}
