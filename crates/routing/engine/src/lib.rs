//! Document Routing Engine
//!
//! Routes documents through a compiled graph of route nodes, generates
//! action requests at each node, resolves them as principals act, and
//! moves each document through its status lifecycle.
//!
//! # Architecture
//!
//! The [`RoutingEngine`] composes specialized components:
//!
//! - [`RouteGraph`]: Compiles a document type into a checked DAG
//! - [`DefinitionRegistry`]: Stores versioned document types
//! - [`NodeInstanceStore`]: Creates, links, and advances node instances
//! - [`RequestGenerator`]: Turns responder rules into action requests
//! - [`RouteTraversal`]: Generates and advances until routing must wait
//! - [`DocumentStateMachine`]: Applies document status transitions
//! - [`ActionProcessor`]: Resolves requests for one submitted action
//! - [`DocumentArena`]: Per-document critical sections and commits
//!
//! # Example
//!
//! ```rust
//! use routing_engine::{
//!     ActionCommand, DefinitionRegistry, EngineConfig, InMemoryDirectory, RoutingEngine,
//! };
//! use routing_types::*;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(DefinitionRegistry::new());
//! registry
//!     .version_and_save(
//!         DocumentType::new("Travel")
//!             .with_node(RouteNodeDefinition::adhoc("AdHoc").then("Review"))
//!             .unwrap()
//!             .with_node(RouteNodeDefinition::approve("Review", ResponderRule::principal("bob")))
//!             .unwrap(),
//!     )
//!     .unwrap();
//! let directory = Arc::new(InMemoryDirectory::new().with_principals(["alice", "bob"]));
//! let engine = RoutingEngine::new(EngineConfig::default(), registry, directory);
//!
//! let doc = engine.create_document("Travel", "alice", "Conference trip").unwrap();
//! engine.route_document(&doc.document_id, "alice").unwrap();
//! assert_eq!(engine.get_active_node_names(&doc.document_id).unwrap(), vec!["Review"]);
//!
//! let result = engine
//!     .submit_action(ActionCommand::new(doc.document_id.clone(), "bob", ActionType::Approve))
//!     .unwrap();
//! assert_eq!(result.status(), DocumentStatus::Final);
//! ```

#![deny(unsafe_code)]

pub mod action_list;
pub mod action_processor;
pub mod arena;
pub mod audit;
pub mod config;
pub mod definition_registry;
pub mod directory;
pub mod engine;
pub mod graph;
pub mod instance_store;
pub mod record;
pub mod request_generator;
pub mod state_machine;
pub mod store;
pub mod traversal;

// Re-export main types
pub use action_processor::{ActionCommand, ActionProcessor, ProcessOutcome};
pub use arena::DocumentArena;
pub use audit::{AuditError, AuditSink, InMemoryAuditLog, NoopAuditSink};
pub use config::{AuditConfig, EngineConfig, LoggingConfig};
pub use definition_registry::{DefinitionRegistry, DefinitionSource};
pub use directory::{InMemoryDirectory, PrincipalDirectory};
pub use engine::{ActionResult, RoutingEngine};
pub use graph::RouteGraph;
pub use instance_store::{NodeInstanceStore, RoutePathEntry};
pub use record::{AdHocRoute, DocumentRecord, DocumentSnapshot};
pub use request_generator::RequestGenerator;
pub use state_machine::DocumentStateMachine;
pub use store::{InMemoryRouteHeaderStore, RouteHeaderStore};
pub use traversal::{RouteTraversal, TraversalReport};
