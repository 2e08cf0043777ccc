//! Payload types of the lazily expanded search graph.

use std::collections::BTreeMap;

use tandem_core::{AssemblyGraph, Graph, NodeId, Result, TandemError};

use crate::combinator::Assignment;

/// The search graph: search states connected by assignment transitions.
pub type SearchGraph = Graph<SearchState, SearchEdge>;

/// One state of the search: the OR-frontier still to resolve, the AND
/// actions reachable from it, and the A* bookkeeping.
#[derive(Debug, Clone)]
pub struct SearchState {
    /// The current OR-frontier: subassembly name to assembly-graph id.
    pub subassemblies: BTreeMap<String, NodeId>,
    /// The current AND-frontier: action name to assembly-graph id. Filled
    /// in when the state is expanded.
    pub actions: BTreeMap<String, NodeId>,
    /// Cumulative parallel cost from the root.
    pub g_score: f64,
    /// Heuristic estimate to a goal.
    pub h_score: f64,
    /// `g_score + h_score`.
    pub f_score: f64,
    /// Minimum per-action cost observed along the path so far.
    pub minimum_cost_action: f64,
    /// Set once the state has been popped from the open set.
    pub marked: bool,
}

impl SearchState {
    /// A state with the given frontier and no scores yet.
    pub fn with_frontier(subassemblies: BTreeMap<String, NodeId>) -> Self {
        Self {
            subassemblies,
            actions: BTreeMap::new(),
            g_score: 0.0,
            h_score: 0.0,
            f_score: 0.0,
            minimum_cost_action: f64::MAX,
            marked: false,
        }
    }

    /// The initial state: a frontier holding only the assembly root.
    pub fn root_of(assembly: &AssemblyGraph) -> Result<Self> {
        let root = assembly.root().ok_or(TandemError::MissingRoot)?;
        let name = assembly.name(root)?.to_string();
        Ok(Self::with_frontier(BTreeMap::from([(name, root)])))
    }
}

/// One transition of the search: the multi-agent assignment chosen at it and
/// its parallel (max over agents) cost.
#[derive(Debug, Clone)]
pub struct SearchEdge {
    /// Per-agent action assignments executed simultaneously.
    pub assignments: Vec<Assignment>,
    /// Parallel cost of the transition.
    pub cost: f64,
}
