//! Action list: per-principal inbox derived from canonical requests
//!
//! Items are computed on demand from activated requests and never stored.
//! A group request shows up once for each member; as soon as any member
//! resolves it, every member's copy disappears with it.

use crate::directory::PrincipalDirectory;
use crate::record::DocumentRecord;
use routing_types::{ActionItem, ActionRequest, PrincipalId, Recipient};

/// Every inbox item a document currently contributes
pub fn project(record: &DocumentRecord, directory: &dyn PrincipalDirectory) -> Vec<ActionItem> {
    record
        .requests
        .iter()
        .filter(|r| r.is_activated())
        .flat_map(|r| items_for_request(record, r, directory))
        .collect()
}

/// Inbox items of one principal on one document
pub fn for_principal(
    record: &DocumentRecord,
    principal: &PrincipalId,
    directory: &dyn PrincipalDirectory,
) -> Vec<ActionItem> {
    project(record, directory)
        .into_iter()
        .filter(|item| &item.principal == principal)
        .collect()
}

fn items_for_request(
    record: &DocumentRecord,
    request: &ActionRequest,
    directory: &dyn PrincipalDirectory,
) -> Vec<ActionItem> {
    let label = document_label(record);
    let item = |principal: PrincipalId, via_group| ActionItem {
        document_id: record.header.document_id.clone(),
        document_label: label.clone(),
        request_id: request.id.clone(),
        principal,
        via_group,
        action_requested: request.action_requested,
        node_name: request.node_name.clone(),
        route_level: request.route_level,
        assigned_at: request.created_at,
    };

    match &request.recipient {
        Recipient::Principal(p) => vec![item(p.clone(), None)],
        Recipient::Group(g) => directory
            .members_of(g)
            .into_iter()
            .map(|member| item(member, Some(g.clone())))
            .collect(),
    }
}

fn document_label(record: &DocumentRecord) -> String {
    if record.header.title.is_empty() {
        record.graph().document_type().label.clone()
    } else {
        record.header.title.clone()
    }
}
