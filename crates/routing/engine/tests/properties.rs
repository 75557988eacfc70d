//! Property tests: graph compilation and route-level bookkeeping over
//! randomly generated routing graphs.

use proptest::prelude::*;
use routing_engine::{
    ActionCommand, DefinitionRegistry, EngineConfig, InMemoryDirectory, RouteGraph, RoutingEngine,
};
use routing_types::*;
use std::collections::BTreeSet;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A DAG over `n` nodes: edges only ever point from lower to higher index.
fn arb_dag() -> impl Strategy<Value = (usize, BTreeSet<(usize, usize)>)> {
    (2usize..9).prop_flat_map(|n| {
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .collect();
        let len = pairs.len();
        (
            Just(n),
            proptest::collection::vec(any::<bool>(), len).prop_map(move |keep| {
                pairs
                    .iter()
                    .zip(keep)
                    .filter(|(_, k)| *k)
                    .map(|(p, _)| *p)
                    .collect::<BTreeSet<_>>()
            }),
        )
    })
}

fn node_name(i: usize) -> String {
    format!("N{}", i)
}

fn build_type(name: &str, n: usize, edges: &BTreeSet<(usize, usize)>) -> DocumentType {
    let mut dt = DocumentType::new(name);
    for i in 0..n {
        let mut node =
            RouteNodeDefinition::approve(node_name(i), ResponderRule::principal(format!("p{}", i)));
        for (_, j) in edges.iter().filter(|(from, _)| *from == i) {
            node = node.then(node_name(*j));
        }
        dt.add_node(node).unwrap();
    }
    dt
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// Every acyclic definition compiles, and the topological order respects every edge.
    #[test]
    fn valid_dags_always_compile((n, edges) in arb_dag()) {
        let graph = RouteGraph::compile(build_type("Dag", n, &edges)).unwrap();
        let order = graph.topological_order();
        prop_assert_eq!(order.len(), n);
        for (i, j) in &edges {
            let from = order.iter().position(|o| *o == node_name(*i)).unwrap();
            let to = order.iter().position(|o| *o == node_name(*j)).unwrap();
            prop_assert!(from < to);
        }
        prop_assert!(!graph.initial_nodes().is_empty());
    }

    /// Closing any chain into a loop is always rejected as a cycle.
    #[test]
    fn cycles_are_always_rejected((n, mut edges) in arb_dag(), len in 2usize..9) {
        let k = len.min(n);
        for i in 0..k - 1 {
            edges.insert((i, i + 1));
        }
        let mut dt = build_type("Cyclic", n, &edges);
        dt.nodes[k - 1] = dt.nodes[k - 1].clone().then(node_name(0));

        let result = RouteGraph::compile(dt);
        let is_cycle = matches!(result, Err(DefinitionError::Cycle { .. }));
        prop_assert!(is_cycle);
    }

    /// Approving in any order: route level never decreases, each instance
    /// sits one level below its deepest predecessor, and routing finishes.
    #[test]
    fn route_level_is_monotonic(
        (n, edges) in arb_dag(),
        picks in proptest::collection::vec(any::<prop::sample::Index>(), 0..32),
    ) {
        let registry = Arc::new(DefinitionRegistry::new());
        registry.version_and_save(build_type("Random", n, &edges)).unwrap();
        let directory = Arc::new(
            InMemoryDirectory::new()
                .with_principals((0..n).map(|i| format!("p{}", i)).chain(["init".to_string()])),
        );
        let engine = RoutingEngine::new(EngineConfig::default(), registry, directory);
        let id = engine.create_document("Random", "init", "").unwrap().document_id;
        engine.route_document(&id, "init").unwrap();

        let mut level = engine.get_route_level(&id).unwrap();
        let mut picks = picks.into_iter();
        loop {
            let pending = engine.get_pending_requests(&id).unwrap();
            if pending.is_empty() {
                break;
            }
            let chosen = match picks.next() {
                Some(ix) => &pending[ix.index(pending.len())],
                None => &pending[0],
            };
            let Recipient::Principal(p) = &chosen.recipient else {
                unreachable!("only principals are routed to");
            };
            engine
                .submit_action(ActionCommand::new(id.clone(), p.as_str(), ActionType::Approve))
                .unwrap();

            let now = engine.get_route_level(&id).unwrap();
            prop_assert!(now >= level);
            level = now;
        }

        prop_assert_eq!(engine.get_state(&id).unwrap(), DocumentStatus::Final);
        let path = engine.route_path(&id).unwrap();
        prop_assert_eq!(path.len(), n);
        for entry in &path {
            let expected = entry
                .predecessors
                .iter()
                .map(|p| path.iter().find(|e| &e.node_name == p).unwrap().route_level + 1)
                .max()
                .unwrap_or(0);
            prop_assert_eq!(entry.route_level, expected);
        }
        let deepest = path.iter().map(|e| e.route_level).max().unwrap_or(0);
        prop_assert_eq!(level, deepest);
    }
}
