//! Route traversal: drives active instances until routing must wait
//!
//! Each step picks the shallowest active instance that can make progress.
//! An instance without requests gets them generated; an instance with no
//! pending approve requests is advanced. The loop ends when every active
//! instance is blocked on an approval, or nothing is active.

use crate::directory::PrincipalDirectory;
use crate::instance_store::NodeInstanceStore;
use crate::record::DocumentRecord;
use crate::request_generator::RequestGenerator;
use routing_types::{ActionRequestId, NodeInstanceId, RoutingResult};
use serde::{Deserialize, Serialize};

/// What one traversal run did
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalReport {
    pub generated: Vec<ActionRequestId>,
    pub advanced: Vec<NodeInstanceId>,
    pub activated: Vec<NodeInstanceId>,
    /// Request-bearing nodes completed because nobody had to respond
    pub auto_completed: Vec<String>,
}

impl TraversalReport {
    pub fn is_empty(&self) -> bool {
        self.generated.is_empty() && self.advanced.is_empty() && self.activated.is_empty()
    }
}

/// Runs the generate/advance loop over a document record
#[derive(Clone, Debug)]
pub struct RouteTraversal {
    store: NodeInstanceStore,
    generator: RequestGenerator,
}

impl RouteTraversal {
    pub fn new(store: NodeInstanceStore, generator: RequestGenerator) -> Self {
        Self { store, generator }
    }

    pub fn store(&self) -> &NodeInstanceStore {
        &self.store
    }

    pub fn generator(&self) -> &RequestGenerator {
        &self.generator
    }

    /// Run until no active instance can make progress
    pub fn run(
        &self,
        record: &mut DocumentRecord,
        directory: &dyn PrincipalDirectory,
    ) -> RoutingResult<TraversalReport> {
        let mut report = TraversalReport::default();

        while !record.header.is_terminal() {
            let Some((id, generated)) = self.next_ready(record) else {
                break;
            };

            if !generated {
                let created = self.generator.generate(record, id, directory)?;
                if created.is_empty() {
                    let instance = record.instance(id)?;
                    let is_control_flow = record
                        .graph()
                        .node(&instance.node_name)
                        .map(|n| n.is_control_flow())
                        .unwrap_or(false);
                    if !is_control_flow {
                        tracing::debug!(
                            document_id = %record.header.document_id,
                            node = %instance.node_name,
                            "No responders, node auto-completes"
                        );
                        report.auto_completed.push(instance.node_name.clone());
                    }
                }
                report.generated.extend(created);
                continue;
            }

            let activated = self.store.advance(record, id)?;
            report.advanced.push(id);
            report.activated.extend(activated);
        }

        Ok(report)
    }

    /// The shallowest active instance that can move, with whether its
    /// requests already exist
    fn next_ready(&self, record: &DocumentRecord) -> Option<(NodeInstanceId, bool)> {
        record
            .instances
            .iter()
            .filter(|i| i.active)
            .filter(|i| !i.requests_generated || !record.has_pending_blocking(i.id))
            .min_by_key(|i| (i.route_level, i.id))
            .map(|i| (i.id, i.requests_generated))
    }
}

impl Default for RouteTraversal {
    fn default() -> Self {
        Self::new(NodeInstanceStore::new(), RequestGenerator::default())
    }
}
