//! Document types: the blueprint for routing a document
//!
//! A DocumentType is a directed graph where:
//! - Nodes are route node definitions (ad hoc, approve, acknowledge, split, join)
//! - Edges are the `next` lists of each node
//!
//! The routing graph is immutable once versioned. To modify it, register a
//! new version; the previous version stays reachable through
//! `previous_version` for audit.

use crate::{ActionRequestedType, DefinitionError, Recipient};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ── Identifiers ──────────────────────────────────────────────────────

/// Unique identifier for one version of a document type
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentTypeId(pub String);

impl DocumentTypeId {
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

impl Default for DocumentTypeId {
    fn default() -> Self {
        Self::generate()
    }
}

impl std::fmt::Display for DocumentTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Document Type ────────────────────────────────────────────────────

/// A named, versioned routing definition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentType {
    /// Unique identifier of this version
    #[serde(default)]
    pub id: DocumentTypeId,
    /// Name shared by all versions
    pub name: String,
    /// Display label (may be propagated retroactively to older versions)
    #[serde(default)]
    pub label: String,
    /// Display description (may be propagated retroactively)
    #[serde(default)]
    pub description: String,
    /// Version number, assigned by the registry
    #[serde(default = "first_version")]
    pub version: u32,
    /// The version this one replaced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<DocumentTypeId>,
    /// Route node definitions, in declaration order
    pub nodes: Vec<RouteNodeDefinition>,
    /// Recipients allowed to disapprove or cancel at any time
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub superusers: Vec<Recipient>,
    /// When this version was created
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

fn first_version() -> u32 {
    1
}

impl DocumentType {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: DocumentTypeId::generate(),
            label: name.clone(),
            name,
            description: String::new(),
            version: 1,
            previous_version: None,
            nodes: Vec::new(),
            superusers: Vec::new(),
            created_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_superuser(mut self, recipient: Recipient) -> Self {
        self.superusers.push(recipient);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Add a node definition; names must be unique within the type
    pub fn add_node(&mut self, node: RouteNodeDefinition) -> Result<(), DefinitionError> {
        if self.nodes.iter().any(|n| n.name == node.name) {
            return Err(DefinitionError::DuplicateNode(node.name));
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Builder form of [`add_node`](Self::add_node)
    pub fn with_node(mut self, node: RouteNodeDefinition) -> Result<Self, DefinitionError> {
        self.add_node(node)?;
        Ok(self)
    }

    /// Get a node definition by name
    pub fn node(&self, name: &str) -> Option<&RouteNodeDefinition> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.next.len()).sum()
    }
}

// ── Route Node Definition ────────────────────────────────────────────

/// A step in a document type's routing graph
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteNodeDefinition {
    /// Unique name within the document type
    pub name: String,
    pub node_type: NodeType,
    /// Names of the successor nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next: Vec<String>,
    /// Who must respond at this node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<ResponderRule>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl RouteNodeDefinition {
    pub fn new(name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            name: name.into(),
            node_type,
            next: Vec::new(),
            rule: None,
            description: String::new(),
        }
    }

    /// Ad hoc node: requests come from routes added by the initiator
    pub fn adhoc(name: impl Into<String>) -> Self {
        Self::new(name, NodeType::AdHoc)
    }

    pub fn approve(name: impl Into<String>, rule: ResponderRule) -> Self {
        Self::new(name, NodeType::Approve).with_rule(rule)
    }

    pub fn acknowledge(name: impl Into<String>, rule: ResponderRule) -> Self {
        Self::new(name, NodeType::Acknowledge).with_rule(rule)
    }

    pub fn split(name: impl Into<String>) -> Self {
        Self::new(name, NodeType::Split)
    }

    /// AND-join: waits for every incoming branch
    pub fn join(name: impl Into<String>) -> Self {
        Self::new(
            name,
            NodeType::Join {
                policy: JoinPolicy::All,
            },
        )
    }

    /// OR-join: the first arriving branch activates it
    pub fn or_join(name: impl Into<String>) -> Self {
        Self::new(
            name,
            NodeType::Join {
                policy: JoinPolicy::Any,
            },
        )
    }

    pub fn then(mut self, next: impl Into<String>) -> Self {
        self.next.push(next.into());
        self
    }

    pub fn with_rule(mut self, rule: ResponderRule) -> Self {
        self.rule = Some(rule);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn is_control_flow(&self) -> bool {
        self.node_type.is_control_flow()
    }
}

// ── Node Type ────────────────────────────────────────────────────────

/// The type of a route node
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// Requests are the ad hoc routes added before routing
    AdHoc,
    /// Responders receive approve requests unless the rule says otherwise
    Approve,
    /// Responders receive acknowledge requests unless the rule says otherwise
    Acknowledge,
    /// Fans out to every successor
    Split,
    /// Merges incoming branches according to its policy
    Join {
        #[serde(default)]
        policy: JoinPolicy,
    },
}

impl NodeType {
    /// Requested action for responders that don't name one
    pub fn default_requested_action(&self) -> Option<ActionRequestedType> {
        match self {
            NodeType::Approve => Some(ActionRequestedType::Approve),
            NodeType::Acknowledge => Some(ActionRequestedType::Acknowledge),
            NodeType::AdHoc | NodeType::Split | NodeType::Join { .. } => None,
        }
    }

    /// Control flow nodes never generate requests
    pub fn is_control_flow(&self) -> bool {
        matches!(self, NodeType::Split | NodeType::Join { .. })
    }

    /// Join policy when several branches arrive at a node of this type
    pub fn join_policy(&self) -> JoinPolicy {
        match self {
            NodeType::Join { policy } => *policy,
            _ => JoinPolicy::All,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeType::AdHoc => "adhoc",
            NodeType::Approve => "approve",
            NodeType::Acknowledge => "acknowledge",
            NodeType::Split => "split",
            NodeType::Join { .. } => "join",
        }
    }
}

/// When a join node activates relative to its incoming branches
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicy {
    /// AND-join: every incoming branch must complete
    #[default]
    All,
    /// OR-join: any one incoming branch suffices
    Any,
}

// ── Responder Rules ──────────────────────────────────────────────────

/// Describes who must respond at a node
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponderRule {
    /// A fixed list of responders
    Responders { responders: Vec<Responder> },
    /// Everyone the directory lists for a role
    Role {
        role: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        action: Option<ActionRequestedType>,
    },
}

impl ResponderRule {
    pub fn principal(id: impl Into<String>) -> Self {
        Self::responders(vec![Responder::new(Recipient::principal(id))])
    }

    pub fn group(id: impl Into<String>) -> Self {
        Self::responders(vec![Responder::new(Recipient::group(id))])
    }

    pub fn role(role: impl Into<String>) -> Self {
        ResponderRule::Role {
            role: role.into(),
            action: None,
        }
    }

    pub fn responders(responders: Vec<Responder>) -> Self {
        ResponderRule::Responders { responders }
    }

    /// A rule with nobody to respond
    pub fn nobody() -> Self {
        Self::responders(Vec::new())
    }
}

/// One (recipient, requested action) pair of a rule
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Responder {
    pub recipient: Recipient,
    /// Overrides the node type's default requested action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionRequestedType>,
}

impl Responder {
    pub fn new(recipient: Recipient) -> Self {
        Self {
            recipient,
            action: None,
        }
    }

    pub fn with_action(mut self, action: ActionRequestedType) -> Self {
        self.action = Some(action);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_sequential_type() -> DocumentType {
        DocumentType::new("SeqDocType")
            .with_node(RouteNodeDefinition::adhoc("AdHoc").then("WorkflowDocument"))
            .unwrap()
            .with_node(
                RouteNodeDefinition::approve("WorkflowDocument", ResponderRule::principal("bmcgough"))
                    .then("Acknowledge1"),
            )
            .unwrap()
            .with_node(RouteNodeDefinition::acknowledge(
                "Acknowledge1",
                ResponderRule::principal("temay"),
            ))
            .unwrap()
    }

    #[test]
    fn test_create_document_type() {
        let dt = make_sequential_type();
        assert_eq!(dt.name, "SeqDocType");
        assert_eq!(dt.label, "SeqDocType");
        assert_eq!(dt.version, 1);
        assert_eq!(dt.node_count(), 3);
        assert_eq!(dt.edge_count(), 2);
        assert!(dt.node("WorkflowDocument").is_some());
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut dt = make_sequential_type();
        let result = dt.add_node(RouteNodeDefinition::split("AdHoc"));
        assert!(matches!(result, Err(DefinitionError::DuplicateNode(n)) if n == "AdHoc"));
    }

    #[test]
    fn test_node_type_behavior_table() {
        assert_eq!(
            NodeType::Approve.default_requested_action(),
            Some(ActionRequestedType::Approve)
        );
        assert_eq!(
            NodeType::Acknowledge.default_requested_action(),
            Some(ActionRequestedType::Acknowledge)
        );
        assert!(NodeType::AdHoc.default_requested_action().is_none());
        assert!(NodeType::Split.is_control_flow());
        assert_eq!(NodeType::Approve.join_policy(), JoinPolicy::All);
        assert_eq!(
            RouteNodeDefinition::or_join("j").node_type.join_policy(),
            JoinPolicy::Any
        );
    }

    #[test]
    fn test_document_type_json_defaults() {
        let json = r#"{
            "name": "Minimal",
            "nodes": [
                { "name": "Review", "node_type": "approve",
                  "rule": { "kind": "role", "role": "reviewers" } },
                { "name": "Merge", "node_type": { "join": {} } }
            ]
        }"#;
        let dt: DocumentType = serde_json::from_str(json).unwrap();
        assert_eq!(dt.version, 1);
        assert!(!dt.id.0.is_empty());
        assert_eq!(dt.nodes[1].node_type.join_policy(), JoinPolicy::All);
        assert_eq!(dt.nodes[0].rule, Some(ResponderRule::role("reviewers")));
    }
}
