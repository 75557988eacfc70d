//! Document Routing Domain Types
//!
//! Documents move through a directed graph of route nodes. At each node
//! the engine addresses **action requests** to principals or groups, and
//! the actions those principals take drive the document through its
//! lifecycle (initiated, enroute, processed, final, or disapproved).
//!
//! # Key Concepts
//!
//! - **DocumentType**: A versioned blueprint (graph) of route node
//!   definitions. Immutable once registered; edits create a new version.
//! - **RouteNodeInstance**: The runtime occurrence of a node for one
//!   document, linked to its predecessors and successors by index.
//! - **ActionRequest**: An obligation (approve, acknowledge, FYI) addressed
//!   to a principal or group, tagged with the route level it was raised at.
//! - **DocumentRouteHeader**: The document's runtime record: status,
//!   route level, initial node instances, and status history.
//! - **ActionTaken**: The append-only audit record of every attempted action.
//!
//! # Design Principles
//!
//! 1. Node and action behavior are tagged variants with small behavior
//!    tables, never a type hierarchy.
//! 2. Instance links are indices into an append-only list. Nothing is
//!    ever unlinked.
//! 3. Group requests are one canonical record; member copies are derived.

#![deny(unsafe_code)]

mod action;
mod document_type;
mod errors;
mod header;
mod instance;
mod principal;
mod request;

pub use action::*;
pub use document_type::*;
pub use errors::*;
pub use header::*;
pub use instance::*;
pub use principal::*;
pub use request::*;
