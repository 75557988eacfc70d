//! Principals, groups, and the recipients that requests are addressed to

use serde::{Deserialize, Serialize};

/// An individual user identity
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrincipalId(pub String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named collection of principals
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who an action request is addressed to
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    Principal(PrincipalId),
    Group(GroupId),
}

impl Recipient {
    pub fn principal(id: impl Into<String>) -> Self {
        Recipient::Principal(PrincipalId::new(id))
    }

    pub fn group(id: impl Into<String>) -> Self {
        Recipient::Group(GroupId::new(id))
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Recipient::Group(_))
    }
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recipient::Principal(p) => write!(f, "principal:{}", p),
            Recipient::Group(g) => write!(f, "group:{}", g),
        }
    }
}
