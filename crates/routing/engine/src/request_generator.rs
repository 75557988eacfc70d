//! Action request generator: turns a node's responder rule into requests
//!
//! The rule resolves to (recipient, requested action) pairs. Each distinct
//! pair becomes one activated request at the instance's route level.
//! Group requests stay canonical; member visibility is a projection built
//! by the action list.

use crate::directory::PrincipalDirectory;
use crate::record::DocumentRecord;
use routing_types::{
    ActionRequest, ActionRequestId, ActionRequestedType, NodeInstanceId, NodeType, Recipient,
    ResponderRule, RoutingError, RoutingResult,
};

/// A resolved responder, before validation
#[derive(Clone, Debug, PartialEq, Eq)]
struct Pending {
    recipient: Recipient,
    action: ActionRequestedType,
    annotation: Option<String>,
}

/// Generates action requests for active node instances
#[derive(Clone, Debug)]
pub struct RequestGenerator {
    /// Reject unknown principals instead of skipping them
    require_known_principals: bool,
}

impl RequestGenerator {
    pub fn new(require_known_principals: bool) -> Self {
        Self {
            require_known_principals,
        }
    }

    /// Generate requests for one instance.
    ///
    /// Runs at most once per instance. Returns the created request IDs; an
    /// empty result means the node has nobody to respond and can be
    /// completed straight away.
    pub fn generate(
        &self,
        record: &mut DocumentRecord,
        id: NodeInstanceId,
        directory: &dyn PrincipalDirectory,
    ) -> RoutingResult<Vec<ActionRequestId>> {
        let (node_name, route_level, already) = {
            let instance = record.instance(id)?;
            (
                instance.node_name.clone(),
                instance.route_level,
                instance.requests_generated,
            )
        };
        if already {
            return Ok(Vec::new());
        }

        let graph = record.graph_arc();
        let node = graph.node(&node_name).ok_or_else(|| RoutingError::InvalidState {
            document_id: record.header.document_id.clone(),
            status: record.header.status,
            reason: format!("node '{}' is not part of the routing graph", node_name),
        })?;

        let candidates = match &node.node_type {
            NodeType::Split | NodeType::Join { .. } => Vec::new(),
            NodeType::AdHoc => {
                let mut pairs: Vec<Pending> = record
                    .adhoc_routes
                    .drain(..)
                    .map(|r| Pending {
                        recipient: r.recipient,
                        action: r.action,
                        annotation: r.annotation,
                    })
                    .collect();
                pairs.extend(self.from_rule(
                    node.rule.as_ref(),
                    ActionRequestedType::Approve,
                    directory,
                ));
                pairs
            }
            node_type => {
                let default = node_type
                    .default_requested_action()
                    .unwrap_or(ActionRequestedType::Approve);
                self.from_rule(node.rule.as_ref(), default, directory)
            }
        };

        let mut accepted: Vec<Pending> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !self.is_reachable(&candidate.recipient, directory)? {
                tracing::warn!(
                    document_id = %record.header.document_id,
                    node = %node_name,
                    recipient = ?candidate.recipient,
                    "Recipient dropped, nobody to route to"
                );
                continue;
            }
            let duplicate = accepted
                .iter()
                .any(|a| a.recipient == candidate.recipient && a.action == candidate.action);
            if !duplicate {
                accepted.push(candidate);
            }
        }

        let document_id = record.header.document_id.clone();
        let mut created = Vec::with_capacity(accepted.len());
        for pending in accepted {
            let mut request = ActionRequest::new(
                document_id.clone(),
                id,
                node_name.clone(),
                pending.recipient,
                pending.action,
                route_level,
            );
            if let Some(annotation) = pending.annotation {
                request = request.with_annotation(annotation);
            }
            request.activate();
            tracing::debug!(
                document_id = %document_id,
                node = %node_name,
                request_id = %request.id,
                action = %request.action_requested,
                route_level,
                "Action request generated"
            );
            created.push(request.id.clone());
            record.requests.push(request);
        }

        record.instance_mut(id)?.requests_generated = true;
        Ok(created)
    }

    fn from_rule(
        &self,
        rule: Option<&ResponderRule>,
        default: ActionRequestedType,
        directory: &dyn PrincipalDirectory,
    ) -> Vec<Pending> {
        match rule {
            None => Vec::new(),
            Some(ResponderRule::Responders { responders }) => responders
                .iter()
                .map(|r| Pending {
                    recipient: r.recipient.clone(),
                    action: r.action.unwrap_or(default),
                    annotation: None,
                })
                .collect(),
            Some(ResponderRule::Role { role, action }) => directory
                .role_members(role)
                .into_iter()
                .map(|recipient| Pending {
                    recipient,
                    action: action.unwrap_or(default),
                    annotation: None,
                })
                .collect(),
        }
    }

    /// Whether a recipient can receive a request at all
    fn is_reachable(
        &self,
        recipient: &Recipient,
        directory: &dyn PrincipalDirectory,
    ) -> RoutingResult<bool> {
        match recipient {
            Recipient::Principal(p) => {
                if directory.resolve_principal(p) {
                    Ok(true)
                } else if self.require_known_principals {
                    Err(RoutingError::UnknownPrincipal(p.clone()))
                } else {
                    Ok(false)
                }
            }
            Recipient::Group(g) => Ok(!directory.members_of(g).is_empty()),
        }
    }
}

impl Default for RequestGenerator {
    fn default() -> Self {
        Self::new(true)
    }
}
