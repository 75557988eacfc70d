//! Definition registry: stores and retrieves versioned document types
//!
//! Document types are immutable once registered. Saving a type whose name
//! already exists creates a new version linked to the previous one. The
//! registry tracks all versions; documents keep the version they were
//! created with.

use crate::graph::RouteGraph;
use parking_lot::RwLock;
use routing_types::{DocumentType, DocumentTypeId, RoutingError, RoutingResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Where the engine looks up document type definitions
pub trait DefinitionSource: Send + Sync {
    /// Latest compiled version of a document type
    fn get_definition(&self, type_name: &str) -> RoutingResult<Arc<RouteGraph>>;

    /// A specific version, if it is still known
    fn get_version(&self, id: &DocumentTypeId) -> Option<Arc<RouteGraph>>;
}

#[derive(Debug, Default)]
struct RegistryInner {
    /// All registered versions, keyed by ID
    definitions: HashMap<DocumentTypeId, Arc<RouteGraph>>,
    /// Index by name → version IDs, oldest first
    by_name: HashMap<String, Vec<DocumentTypeId>>,
}

/// Registry of compiled document types
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    inner: RwLock<RegistryInner>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and store a document type as the newest version of its name.
    ///
    /// The version number and previous-version link are assigned here;
    /// whatever the caller put in those fields is overwritten.
    pub fn version_and_save(&self, mut document_type: DocumentType) -> RoutingResult<Arc<RouteGraph>> {
        let mut inner = self.inner.write();

        let previous = inner
            .by_name
            .get(&document_type.name)
            .and_then(|ids| ids.last())
            .and_then(|id| inner.definitions.get(id))
            .map(|g| (g.document_type().id.clone(), g.version()));

        match previous {
            Some((prev_id, prev_version)) => {
                document_type.version = prev_version + 1;
                document_type.previous_version = Some(prev_id);
            }
            None => {
                document_type.version = 1;
                document_type.previous_version = None;
            }
        }
        if inner.definitions.contains_key(&document_type.id) {
            document_type.id = DocumentTypeId::generate();
        }

        let graph = Arc::new(RouteGraph::compile(document_type)?);
        let id = graph.document_type().id.clone();
        let name = graph.name().to_string();

        inner.definitions.insert(id.clone(), Arc::clone(&graph));
        inner.by_name.entry(name.clone()).or_default().push(id.clone());

        tracing::info!(
            document_type = %name,
            version = graph.version(),
            id = %id,
            "Document type registered"
        );
        Ok(graph)
    }

    /// Latest version of a document type by name
    pub fn find_by_name(&self, name: &str) -> Option<Arc<RouteGraph>> {
        let inner = self.inner.read();
        inner
            .by_name
            .get(name)
            .and_then(|ids| ids.last())
            .and_then(|id| inner.definitions.get(id))
            .cloned()
    }

    pub fn get(&self, id: &DocumentTypeId) -> Option<Arc<RouteGraph>> {
        self.inner.read().definitions.get(id).cloned()
    }

    /// All versions of a document type, oldest first
    pub fn versions(&self, name: &str) -> Vec<Arc<RouteGraph>> {
        let inner = self.inner.read();
        inner
            .by_name
            .get(name)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.definitions.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every version except the latest, oldest first
    pub fn find_previous_instances(&self, name: &str) -> Vec<Arc<RouteGraph>> {
        let mut versions = self.versions(name);
        versions.pop();
        versions
    }

    /// Copy the latest version's label and description onto every earlier
    /// version. Routing graphs are left untouched. Returns how many
    /// versions were updated.
    pub fn apply_retroactively(&self, name: &str) -> RoutingResult<usize> {
        let mut inner = self.inner.write();
        let ids = inner
            .by_name
            .get(name)
            .cloned()
            .ok_or_else(|| RoutingError::DocumentTypeNotFound(name.to_string()))?;

        let Some((latest_id, earlier)) = ids.split_last() else {
            return Ok(0);
        };
        let (label, description) = match inner.definitions.get(latest_id) {
            Some(g) => (
                g.document_type().label.clone(),
                g.document_type().description.clone(),
            ),
            None => return Err(RoutingError::DocumentTypeNotFound(name.to_string())),
        };

        let mut updated = 0;
        for id in earlier {
            if let Some(graph) = inner.definitions.get(id) {
                let mut document_type = graph.document_type().clone();
                document_type.label = label.clone();
                document_type.description = description.clone();
                let recompiled = Arc::new(RouteGraph::compile(document_type)?);
                inner.definitions.insert(id.clone(), recompiled);
                updated += 1;
            }
        }

        tracing::info!(document_type = %name, updated, "Display fields applied retroactively");
        Ok(updated)
    }

    pub fn count(&self) -> usize {
        self.inner.read().definitions.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().by_name.contains_key(name)
    }
}

impl DefinitionSource for DefinitionRegistry {
    fn get_definition(&self, type_name: &str) -> RoutingResult<Arc<RouteGraph>> {
        self.find_by_name(type_name)
            .ok_or_else(|| RoutingError::DocumentTypeNotFound(type_name.to_string()))
    }

    fn get_version(&self, id: &DocumentTypeId) -> Option<Arc<RouteGraph>> {
        self.get(id)
    }
}
