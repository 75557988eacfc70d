//! Route node instance store: creates, links, and advances node instances
//!
//! Links between instances are append-only. Advancing an instance marks it
//! complete and either creates its successors or, when a successor was
//! already created by a sibling branch, only records the new predecessor.
//! Join readiness follows the successor's join policy.

use crate::record::DocumentRecord;
use routing_types::{JoinPolicy, NodeInstanceId, RouteNodeInstance, RoutingResult};
use serde::{Deserialize, Serialize};

/// One step of a document's route, with its branch structure
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePathEntry {
    pub instance: NodeInstanceId,
    pub node_name: String,
    pub route_level: u32,
    pub active: bool,
    pub complete: bool,
    pub predecessors: Vec<String>,
    pub successors: Vec<String>,
}

/// Instance graph operations over a document record
#[derive(Clone, Debug, Default)]
pub struct NodeInstanceStore;

impl NodeInstanceStore {
    pub fn new() -> Self {
        Self
    }

    /// Create one active instance per initial node definition, at level 0
    pub fn activate_initial_nodes(&self, record: &mut DocumentRecord) -> Vec<NodeInstanceId> {
        let names: Vec<String> = record
            .graph()
            .initial_nodes()
            .iter()
            .map(|n| n.name.clone())
            .collect();

        let mut created = Vec::with_capacity(names.len());
        for name in names {
            if record.instance_for_node(&name).is_some() {
                continue;
            }
            let id = record.next_instance_id();
            let mut instance = RouteNodeInstance::new(id, name, 0);
            instance.activate();
            tracing::debug!(
                document_id = %record.header.document_id,
                node = %instance.node_name,
                "Initial node activated"
            );
            record.instances.push(instance);
            record.header.initial_instances.push(id);
            created.push(id);
        }
        created
    }

    /// Complete an active instance and move past it.
    ///
    /// Returns the instances that became active as a result. Advancing an
    /// instance that is not active (already complete, or still waiting on a
    /// join) changes nothing.
    pub fn advance(
        &self,
        record: &mut DocumentRecord,
        id: NodeInstanceId,
    ) -> RoutingResult<Vec<NodeInstanceId>> {
        let (node_name, was_active) = {
            let instance = record.instance(id)?;
            (instance.node_name.clone(), instance.active)
        };
        if !was_active {
            return Ok(Vec::new());
        }
        record.instance_mut(id)?.mark_complete();

        let graph = record.graph_arc();
        let mut activated = Vec::new();

        for successor in graph.successors_of(&node_name) {
            let policy = graph.join_policy(&successor.name);
            let required = graph.incoming_count(&successor.name);

            let target = match record.instance_for_node(&successor.name) {
                Some(existing) => existing,
                None => {
                    let new_id = record.next_instance_id();
                    record
                        .instances
                        .push(RouteNodeInstance::new(new_id, successor.name.clone(), 0));
                    new_id
                }
            };

            record.instance_mut(target)?.predecessors.push(id);
            record.instance_mut(id)?.successors.push(target);

            if self.join_ready(record, target, policy, required)? {
                let level = self.level_for(record, target)?;
                let instance = record.instance_mut(target)?;
                instance.route_level = level;
                instance.activate();
                record.header.raise_route_level(level);
                tracing::debug!(
                    document_id = %record.header.document_id,
                    node = %successor.name,
                    route_level = level,
                    "Node activated"
                );
                activated.push(target);
            } else {
                tracing::debug!(
                    document_id = %record.header.document_id,
                    node = %successor.name,
                    arrived = record.instance(target)?.predecessors.len(),
                    required,
                    "Branch arrived at join"
                );
            }
        }

        Ok(activated)
    }

    /// Whether a not-yet-activated instance may activate now
    fn join_ready(
        &self,
        record: &DocumentRecord,
        target: NodeInstanceId,
        policy: JoinPolicy,
        required: usize,
    ) -> RoutingResult<bool> {
        let instance = record.instance(target)?;
        if instance.active || instance.complete {
            return Ok(false);
        }
        let mut completed = 0;
        for pred in &instance.predecessors {
            if record.instance(*pred)?.complete {
                completed += 1;
            }
        }
        Ok(match policy {
            JoinPolicy::All => completed >= required,
            JoinPolicy::Any => completed >= 1,
        })
    }

    /// One deeper than the deepest predecessor
    fn level_for(&self, record: &DocumentRecord, target: NodeInstanceId) -> RoutingResult<u32> {
        let mut deepest = 0;
        for pred in &record.instance(target)?.predecessors {
            deepest = deepest.max(record.instance(*pred)?.route_level);
        }
        Ok(deepest + 1)
    }

    /// Currently active instances
    pub fn active_instances<'a>(&self, record: &'a DocumentRecord) -> Vec<&'a RouteNodeInstance> {
        record.active_instances()
    }

    /// Every instance the document passed through, in creation order
    pub fn route_path(&self, record: &DocumentRecord) -> Vec<RoutePathEntry> {
        let name_of = |id: &NodeInstanceId| {
            record
                .instances
                .get(id.index())
                .map(|i| i.node_name.clone())
                .unwrap_or_default()
        };
        record
            .instances
            .iter()
            .map(|i| RoutePathEntry {
                instance: i.id,
                node_name: i.node_name.clone(),
                route_level: i.route_level,
                active: i.active,
                complete: i.complete,
                predecessors: i.predecessors.iter().map(name_of).collect(),
                successors: i.successors.iter().map(name_of).collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RouteGraph;
    use routing_types::{
        DocumentId, DocumentRouteHeader, DocumentType, DocumentTypeId, PrincipalId,
        ResponderRule, RouteNodeDefinition,
    };
    use std::sync::Arc;

    fn make_record(dt: DocumentType) -> DocumentRecord {
        let graph = Arc::new(RouteGraph::compile(dt).unwrap());
        let header = DocumentRouteHeader::new(
            DocumentId::new("doc-1"),
            graph.name(),
            DocumentTypeId::new("dt"),
            1,
            PrincipalId::new("initiator"),
        );
        DocumentRecord::new(header, graph)
    }

    fn diamond(join: RouteNodeDefinition) -> DocumentType {
        DocumentType::new("Diamond")
            .with_node(RouteNodeDefinition::split("Split").then("Left").then("Right"))
            .unwrap()
            .with_node(
                RouteNodeDefinition::approve("Left", ResponderRule::principal("alice"))
                    .then("Join"),
            )
            .unwrap()
            .with_node(
                RouteNodeDefinition::approve("Right", ResponderRule::principal("bob")).then("Join"),
            )
            .unwrap()
            .with_node(join.then("After"))
            .unwrap()
            .with_node(RouteNodeDefinition::approve("After", ResponderRule::principal("carol")))
            .unwrap()
    }

    #[test]
    fn test_sequential_advance_links_and_levels() {
        let dt = DocumentType::new("Seq")
            .with_node(RouteNodeDefinition::adhoc("A").then("B"))
            .unwrap()
            .with_node(RouteNodeDefinition::approve("B", ResponderRule::principal("x")))
            .unwrap();
        let mut record = make_record(dt);
        let store = NodeInstanceStore::new();

        let initial = store.activate_initial_nodes(&mut record);
        assert_eq!(initial, vec![NodeInstanceId(0)]);
        assert_eq!(record.header.initial_instances, initial);

        let activated = store.advance(&mut record, NodeInstanceId(0)).unwrap();
        assert_eq!(activated, vec![NodeInstanceId(1)]);

        let a = record.instance(NodeInstanceId(0)).unwrap();
        assert!(a.complete && !a.active);
        assert_eq!(a.successors, vec![NodeInstanceId(1)]);

        let b = record.instance(NodeInstanceId(1)).unwrap();
        assert!(b.active);
        assert!(b.successors.is_empty());
        assert_eq!(b.predecessors, vec![NodeInstanceId(0)]);
        assert_eq!(b.route_level, 1);
        assert_eq!(record.header.route_level, 1);
    }

    #[test]
    fn test_advance_inactive_is_noop() {
        let dt = DocumentType::new("Seq")
            .with_node(RouteNodeDefinition::adhoc("A").then("B"))
            .unwrap()
            .with_node(RouteNodeDefinition::approve("B", ResponderRule::principal("x")))
            .unwrap();
        let mut record = make_record(dt);
        let store = NodeInstanceStore::new();
        store.activate_initial_nodes(&mut record);
        store.advance(&mut record, NodeInstanceId(0)).unwrap();

        // Second advance of the completed instance creates nothing new
        assert!(store.advance(&mut record, NodeInstanceId(0)).unwrap().is_empty());
        assert_eq!(record.instances.len(), 2);
        assert_eq!(
            record.instance(NodeInstanceId(0)).unwrap().successors.len(),
            1
        );
    }

    #[test]
    fn test_and_join_waits_for_all_branches() {
        let mut record = make_record(diamond(RouteNodeDefinition::join("Join")));
        let store = NodeInstanceStore::new();
        store.activate_initial_nodes(&mut record);

        let branches = store.advance(&mut record, NodeInstanceId(0)).unwrap();
        assert_eq!(branches.len(), 2);
        // Parallel branches share a route level
        let levels: Vec<u32> = branches
            .iter()
            .map(|id| record.instance(*id).unwrap().route_level)
            .collect();
        assert_eq!(levels, vec![1, 1]);

        let first = store.advance(&mut record, branches[0]).unwrap();
        assert!(first.is_empty());
        let join = record.instance_for_node("Join").unwrap();
        assert!(record.instance(join).unwrap().is_waiting());
        assert_eq!(record.header.route_level, 1);

        let second = store.advance(&mut record, branches[1]).unwrap();
        assert_eq!(second, vec![join]);
        let join_instance = record.instance(join).unwrap();
        assert!(join_instance.active);
        assert_eq!(join_instance.predecessors, branches);
        assert_eq!(join_instance.route_level, 2);
        // Only one join instance was ever created
        assert_eq!(
            record.instances.iter().filter(|i| i.node_name == "Join").count(),
            1
        );
    }

    #[test]
    fn test_or_join_activates_on_first_branch() {
        let mut record = make_record(diamond(RouteNodeDefinition::or_join("Join")));
        let store = NodeInstanceStore::new();
        store.activate_initial_nodes(&mut record);
        let branches = store.advance(&mut record, NodeInstanceId(0)).unwrap();

        let first = store.advance(&mut record, branches[0]).unwrap();
        let join = record.instance_for_node("Join").unwrap();
        assert_eq!(first, vec![join]);

        let after = store.advance(&mut record, join).unwrap();
        assert_eq!(after.len(), 1);

        // The late branch is linked but does not re-trigger the join
        let late = store.advance(&mut record, branches[1]).unwrap();
        assert!(late.is_empty());
        assert_eq!(record.instance(join).unwrap().predecessors.len(), 2);
        assert_eq!(
            record.instances.iter().filter(|i| i.node_name == "After").count(),
            1
        );
    }

    #[test]
    fn test_route_path() {
        let mut record = make_record(diamond(RouteNodeDefinition::join("Join")));
        let store = NodeInstanceStore::new();
        store.activate_initial_nodes(&mut record);
        let branches = store.advance(&mut record, NodeInstanceId(0)).unwrap();
        for b in branches {
            store.advance(&mut record, b).unwrap();
        }

        let path = store.route_path(&record);
        assert_eq!(path[0].node_name, "Split");
        assert_eq!(path[0].successors, vec!["Left", "Right"]);
        let join = path.iter().find(|e| e.node_name == "Join").unwrap();
        assert_eq!(join.predecessors, vec!["Left", "Right"]);
        assert!(join.active);
    }
}
