//! # Tandem Core
//!
//! Core primitives for the Tandem assembly planner:
//! - [`Graph`] - generic arena-backed directed graph
//! - [`AssemblyGraph`] - the typed AND/OR assembly graph and its factory
//! - [`Configuration`] - agents, action costs, subassembly reachability
//! - [`TandemError`] - workspace-wide error type

pub mod assembly;
pub mod config;
pub mod error;
pub mod graph;

// Re-exports for convenience
pub use assembly::{AssemblyGraph, AssemblyNode, NodeKind};
pub use config::{ActionSpec, Agent, Configuration, Reach, SubassemblySpec};
pub use error::{Result, TandemError};
pub use graph::{Edge, EdgeId, Graph, Node, NodeId};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::assembly::{AssemblyGraph, AssemblyNode, NodeKind};
    pub use crate::config::{ActionSpec, Agent, Configuration, Reach, SubassemblySpec};
    pub use crate::error::{Result, TandemError};
    pub use crate::graph::{Edge, EdgeId, Graph, Node, NodeId};
}
