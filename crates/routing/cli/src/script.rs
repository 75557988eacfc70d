//! Routing scripts: a directory plus an ordered list of steps
//!
//! Documents are referred to by a script-local alias so that steps can be
//! written before the engine assigns real document IDs.

use routing_engine::InMemoryDirectory;
use routing_types::{ActionRequestedType, ActionType, DocumentStatus, Recipient};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A parsed simulation script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub directory: ScriptDirectory,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Principals, groups and roles known while the script runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptDirectory {
    #[serde(default)]
    pub principals: Vec<String>,
    #[serde(default)]
    pub groups: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub roles: HashMap<String, Vec<Recipient>>,
}

impl ScriptDirectory {
    /// Build the directory; group members count as known principals
    pub fn build(&self) -> InMemoryDirectory {
        let mut directory = InMemoryDirectory::new().with_principals(self.principals.iter().cloned());
        for (group, members) in &self.groups {
            directory = directory
                .with_principals(members.iter().cloned())
                .with_group(group.clone(), members.iter().cloned());
        }
        for (role, recipients) in &self.roles {
            directory = directory.with_role(role.clone(), recipients.clone());
        }
        directory
    }
}

/// One scripted operation against a document alias
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Create {
        document: String,
        document_type: String,
        initiator: String,
        #[serde(default)]
        title: String,
    },
    Adhoc {
        document: String,
        principal: String,
        recipient: Recipient,
        action: ActionRequestedType,
        #[serde(default)]
        annotation: Option<String>,
    },
    Route {
        document: String,
        principal: String,
    },
    Act {
        document: String,
        principal: String,
        action: ActionType,
        #[serde(default)]
        annotation: Option<String>,
        /// The step passes only if the engine refuses the action
        #[serde(default)]
        expect_rejected: bool,
    },
    /// Assertions on the document's current state
    Expect {
        document: String,
        #[serde(default)]
        status: Option<DocumentStatus>,
        #[serde(default)]
        active_nodes: Option<Vec<String>>,
        #[serde(default)]
        route_level: Option<u32>,
    },
}

impl Step {
    pub fn document(&self) -> &str {
        match self {
            Step::Create { document, .. }
            | Step::Adhoc { document, .. }
            | Step::Route { document, .. }
            | Step::Act { document, .. }
            | Step::Expect { document, .. } => document,
        }
    }

    /// Short human description for reports
    pub fn describe(&self) -> String {
        match self {
            Step::Create {
                document_type,
                initiator,
                ..
            } => format!("{} creates {}", initiator, document_type),
            Step::Adhoc {
                principal,
                recipient,
                action,
                ..
            } => format!("{} adds {} request for {}", principal, action, recipient),
            Step::Route { principal, .. } => format!("{} routes", principal),
            Step::Act {
                principal, action, ..
            } => format!("{} takes {}", principal, action),
            Step::Expect { .. } => "check state".to_string(),
        }
    }
}
