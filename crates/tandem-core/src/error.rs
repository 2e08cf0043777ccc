//! Error types shared across the Tandem workspace.

use thiserror::Error;

use crate::graph::NodeId;

/// Main error type for Tandem operations.
#[derive(Error, Debug)]
pub enum TandemError {
    /// A node identifier did not resolve to a live node.
    #[error("node {id} not in graph")]
    NodeNotFound { id: NodeId },

    /// A node identifier was inserted twice into the same graph.
    #[error("node id {id} already in graph")]
    DuplicateNode { id: NodeId },

    /// No edge connects the given endpoints.
    #[error("no edge from node {from} to node {target}")]
    EdgeNotFound { from: NodeId, target: NodeId },

    /// An edge identifier did not resolve to a live edge.
    #[error("edge {id} not in graph")]
    EdgeIdNotFound { id: crate::graph::EdgeId },

    /// An indexed edge accessor ran past a node's degree.
    #[error("edge index {index} out of range for node {id} (degree {degree})")]
    EdgeIndexOutOfRange {
        id: NodeId,
        index: usize,
        degree: usize,
    },

    /// An edge referenced a node name the factory has never seen.
    #[error("unknown node '{name}' referenced by edge")]
    UnknownEndpoint { name: String },

    /// The designated root name is not a known node.
    #[error("unknown root node '{name}'")]
    UnknownRoot { name: String },

    /// No root was designated before validation or planning.
    #[error("assembly graph has no root")]
    MissingRoot,

    /// The designated root is not a subassembly.
    #[error("root node '{name}' is not a subassembly")]
    RootNotSubassembly { name: String },

    /// An edge connects two nodes of the same bipartite side.
    #[error("not an AND/OR graph: edge between '{from}' and '{target}' joins same-kind nodes")]
    AlternationViolation { from: String, target: String },

    /// A cycle was found while validating the assembly graph.
    #[error("assembly graph contains a cycle through '{name}'")]
    CyclicGraph { name: String },

    /// The configuration lists no agents.
    #[error("configuration lists no agents")]
    EmptyRoster,

    /// An action has no cost entry for some agent.
    #[error("cost of '{action}' for agent '{agent}' is missing")]
    MissingCost { action: String, agent: String },

    /// A subassembly has no reachability entry for some agent.
    #[error("agent '{agent}' reach is missing in reachability map of '{subassembly}'")]
    MissingReach { subassembly: String, agent: String },

    /// Malformed input detected while parsing, with element context.
    #[error("malformed <{element}>: {message}")]
    MalformedInput { element: String, message: String },

    /// Low-level XML error.
    #[error("XML error: {0}")]
    Xml(String),

    /// Filesystem error at the I/O boundary.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The search expanded more states than the configured limit.
    #[error("search exceeded the expansion limit of {limit} states")]
    SearchLimitExceeded { limit: usize },

    /// Planning was cancelled cooperatively.
    #[error("planning was cancelled")]
    Cancelled,
}

impl TandemError {
    /// Returns true for errors raised while validating parsed input,
    /// i.e. before any search work starts.
    ///
    /// A search that merely finds no plan is not an error at all; it is
    /// reported through the planner's outcome type.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TandemError::MissingRoot
                | TandemError::RootNotSubassembly { .. }
                | TandemError::AlternationViolation { .. }
                | TandemError::CyclicGraph { .. }
                | TandemError::EmptyRoster
                | TandemError::MissingCost { .. }
                | TandemError::MissingReach { .. }
        )
    }
}

/// Convenience Result type for Tandem operations.
pub type Result<T> = std::result::Result<T, TandemError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert!(TandemError::EmptyRoster.is_validation());
        assert!(TandemError::MissingRoot.is_validation());
        assert!(!TandemError::Cancelled.is_validation());
        assert!(!TandemError::SearchLimitExceeded { limit: 10 }.is_validation());
    }

    #[test]
    fn test_error_display_carries_context() {
        let err = TandemError::MissingCost {
            action: "screw".to_string(),
            agent: "r1".to_string(),
        };
        assert_eq!(err.to_string(), "cost of 'screw' for agent 'r1' is missing");
    }
}
