//! Principal directory: identity and group membership lookups
//!
//! Identity management lives outside the engine. The engine only needs to
//! know whether a principal exists, who belongs to a group, and who holds
//! a role. Group membership is expanded one level deep.

use parking_lot::RwLock;
use routing_types::{GroupId, PrincipalId, Recipient};
use std::collections::{HashMap, HashSet};

/// Lookups the engine performs against the identity system
pub trait PrincipalDirectory: Send + Sync {
    fn resolve_principal(&self, id: &PrincipalId) -> bool;

    fn members_of(&self, group: &GroupId) -> Vec<PrincipalId>;

    /// Recipients holding a role; empty when the role is unknown
    fn role_members(&self, _role: &str) -> Vec<Recipient> {
        Vec::new()
    }

    fn is_member(&self, group: &GroupId, principal: &PrincipalId) -> bool {
        self.members_of(group).iter().any(|m| m == principal)
    }
}

/// Whether a request addressed to `recipient` may be acted on by `principal`
pub fn addresses(
    directory: &dyn PrincipalDirectory,
    recipient: &Recipient,
    principal: &PrincipalId,
) -> bool {
    match recipient {
        Recipient::Principal(p) => p == principal,
        Recipient::Group(g) => directory.is_member(g, principal),
    }
}

#[derive(Debug, Default)]
struct DirectoryInner {
    principals: HashSet<PrincipalId>,
    groups: HashMap<GroupId, Vec<PrincipalId>>,
    roles: HashMap<String, Vec<Recipient>>,
}

/// In-memory directory for development and testing
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    inner: RwLock<DirectoryInner>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_principals<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            self.add_principal(PrincipalId::new(id));
        }
        self
    }

    pub fn with_group<I, S>(self, group: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let members = members.into_iter().map(PrincipalId::new).collect();
        self.set_group(GroupId::new(group), members);
        self
    }

    pub fn with_role(self, role: impl Into<String>, recipients: Vec<Recipient>) -> Self {
        self.inner.write().roles.insert(role.into(), recipients);
        self
    }

    pub fn add_principal(&self, id: PrincipalId) {
        self.inner.write().principals.insert(id);
    }

    /// Replace a group's members; members are registered as principals too
    pub fn set_group(&self, group: GroupId, members: Vec<PrincipalId>) {
        let mut inner = self.inner.write();
        for m in &members {
            inner.principals.insert(m.clone());
        }
        inner.groups.insert(group, members);
    }
}

impl PrincipalDirectory for InMemoryDirectory {
    fn resolve_principal(&self, id: &PrincipalId) -> bool {
        self.inner.read().principals.contains(id)
    }

    fn members_of(&self, group: &GroupId) -> Vec<PrincipalId> {
        self.inner
            .read()
            .groups
            .get(group)
            .cloned()
            .unwrap_or_default()
    }

    fn role_members(&self, role: &str) -> Vec<Recipient> {
        self.inner.read().roles.get(role).cloned().unwrap_or_default()
    }
}
