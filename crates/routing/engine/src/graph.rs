//! Route node graph: compiles a document type into a traversable DAG
//!
//! Compilation checks structure once, when the type is registered, so
//! routing never encounters a malformed graph. Every acyclic definition
//! whose successor names resolve compiles.

use routing_types::{DefinitionError, DocumentType, JoinPolicy, RouteNodeDefinition};
use std::collections::HashMap;

/// A compiled, immutable routing graph for one document type version
#[derive(Clone, Debug)]
pub struct RouteGraph {
    document_type: DocumentType,
    /// Node name → index into `document_type.nodes`
    index: HashMap<String, usize>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
    initial: Vec<usize>,
    topological: Vec<usize>,
}

/// DFS colouring for cycle detection
#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

impl RouteGraph {
    /// Compile a document type definition
    pub fn compile(document_type: DocumentType) -> Result<Self, DefinitionError> {
        if document_type.name.trim().is_empty() {
            return Err(DefinitionError::InvalidName(document_type.name.clone()));
        }
        if document_type.nodes.is_empty() {
            return Err(DefinitionError::EmptyDefinition(document_type.name.clone()));
        }

        let mut index = HashMap::with_capacity(document_type.nodes.len());
        for (i, node) in document_type.nodes.iter().enumerate() {
            if index.insert(node.name.clone(), i).is_some() {
                return Err(DefinitionError::DuplicateNode(node.name.clone()));
            }
        }

        let n = document_type.nodes.len();
        let mut successors = vec![Vec::new(); n];
        let mut predecessors = vec![Vec::new(); n];
        for (i, node) in document_type.nodes.iter().enumerate() {
            for next in &node.next {
                let target = *index
                    .get(next)
                    .ok_or_else(|| DefinitionError::UnknownSuccessor {
                        node: node.name.clone(),
                        successor: next.clone(),
                    })?;
                if successors[i].contains(&target) {
                    return Err(DefinitionError::DuplicateEdge {
                        node: node.name.clone(),
                        successor: next.clone(),
                    });
                }
                successors[i].push(target);
                predecessors[target].push(i);
            }
        }

        let topological = Self::topological_sort(&document_type.nodes, &successors)?;
        let initial = (0..n).filter(|&i| predecessors[i].is_empty()).collect();

        tracing::debug!(
            document_type = %document_type.name,
            nodes = n,
            "Routing graph compiled"
        );

        Ok(Self {
            document_type,
            index,
            successors,
            predecessors,
            initial,
            topological,
        })
    }

    /// Depth-first topological sort; reports the first cycle found.
    ///
    /// Iterative, so chain length is bounded by heap rather than stack.
    /// `path` holds the current DFS branch as (node, next successor slot).
    fn topological_sort(
        nodes: &[RouteNodeDefinition],
        successors: &[Vec<usize>],
    ) -> Result<Vec<usize>, DefinitionError> {
        let n = nodes.len();
        let mut marks = vec![Mark::Unvisited; n];
        let mut order = Vec::with_capacity(n);
        let mut path: Vec<(usize, usize)> = Vec::new();

        for root in 0..n {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::InProgress;
            path.push((root, 0));

            while let Some(frame) = path.last_mut() {
                let (node, slot) = *frame;
                let Some(&next) = successors[node].get(slot) else {
                    path.pop();
                    marks[node] = Mark::Done;
                    order.push(node);
                    continue;
                };
                frame.1 += 1;

                match marks[next] {
                    Mark::Done => {}
                    Mark::InProgress => {
                        let start = path.iter().position(|&(s, _)| s == next).unwrap_or(0);
                        let mut cycle: Vec<String> =
                            path[start..].iter().map(|&(i, _)| nodes[i].name.clone()).collect();
                        cycle.push(nodes[next].name.clone());
                        return Err(DefinitionError::Cycle { path: cycle });
                    }
                    Mark::Unvisited => {
                        marks[next] = Mark::InProgress;
                        path.push((next, 0));
                    }
                }
            }
        }

        order.reverse();
        Ok(order)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn document_type(&self) -> &DocumentType {
        &self.document_type
    }

    pub fn name(&self) -> &str {
        &self.document_type.name
    }

    pub fn version(&self) -> u32 {
        self.document_type.version
    }

    pub fn node(&self, name: &str) -> Option<&RouteNodeDefinition> {
        self.index.get(name).map(|&i| &self.document_type.nodes[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Nodes with no incoming edge, in declaration order
    pub fn initial_nodes(&self) -> Vec<&RouteNodeDefinition> {
        self.initial
            .iter()
            .map(|&i| &self.document_type.nodes[i])
            .collect()
    }

    pub fn successors_of(&self, name: &str) -> Vec<&RouteNodeDefinition> {
        self.index
            .get(name)
            .map(|&i| {
                self.successors[i]
                    .iter()
                    .map(|&s| &self.document_type.nodes[s])
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn predecessors_of(&self, name: &str) -> Vec<&RouteNodeDefinition> {
        self.index
            .get(name)
            .map(|&i| {
                self.predecessors[i]
                    .iter()
                    .map(|&p| &self.document_type.nodes[p])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of branches that arrive at a node
    pub fn incoming_count(&self, name: &str) -> usize {
        self.index
            .get(name)
            .map(|&i| self.predecessors[i].len())
            .unwrap_or(0)
    }

    /// How a node merges arriving branches (AND unless tagged otherwise)
    pub fn join_policy(&self, name: &str) -> JoinPolicy {
        self.node(name)
            .map(|n| n.node_type.join_policy())
            .unwrap_or_default()
    }

    /// Node names ordered so that every edge points forward
    pub fn topological_order(&self) -> Vec<&str> {
        self.topological
            .iter()
            .map(|&i| self.document_type.nodes[i].name.as_str())
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.document_type.nodes.len()
    }
}
