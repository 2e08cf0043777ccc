//! A* best-first search over the lazily expanded search graph.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::{debug, trace};

use tandem_core::{AssemblyGraph, EdgeId, NodeId, Result, TandemError};

use crate::expander::NodeExpander;
use crate::planner::{CancelFlag, PlannerConfig};
use crate::search::{SearchGraph, SearchState};

/// How a search run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchVerdict {
    /// A goal state was reached; the cheapest one found.
    Goal(NodeId),
    /// The open set drained without reaching a goal; carries the last
    /// popped state.
    Exhausted(NodeId),
}

/// Entry of the open set: min-heap on `f_score`, ties broken by insertion
/// order.
#[derive(Debug)]
struct OpenEntry {
    f_score: f64,
    seq: u64,
    node: NodeId,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap; earlier insertion wins ties.
        other
            .f_score
            .total_cmp(&self.f_score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

/// The A* search algorithm over a search graph, expanding states through a
/// [`NodeExpander`].
#[derive(Debug)]
pub struct AStarSearch<'a> {
    assembly: &'a AssemblyGraph,
}

impl<'a> AStarSearch<'a> {
    /// Create a search over the given assembly graph.
    pub fn new(assembly: &'a AssemblyGraph) -> Self {
        Self { assembly }
    }

    /// A state is a goal when no frontier subassembly has any ACTION
    /// successor left in the assembly graph.
    pub fn is_goal(&self, state: &SearchState) -> Result<bool> {
        for &sub in state.subassemblies.values() {
            if self.assembly.has_successors(sub)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// `h = log₂(max frontier name length) · minimum_cost_action`.
    ///
    /// An empty frontier (already a goal) gets 0 rather than the poisoned
    /// `log₂(0)` product.
    fn h_score(&self, state: &SearchState) -> Result<f64> {
        let mut max_len = 0usize;
        for &sub in state.subassemblies.values() {
            max_len = max_len.max(self.assembly.name(sub)?.len());
        }
        if max_len == 0 {
            return Ok(0.0);
        }
        Ok((max_len as f64).log2() * state.minimum_cost_action)
    }

    /// Run the search from `root`, expanding lazily, until a goal is popped
    /// or the open set drains. No closed set is kept: the search graph is a
    /// tree over unique frontier signatures, so no state is reachable twice.
    pub fn search(
        &self,
        graph: &mut SearchGraph,
        root: NodeId,
        expander: &mut NodeExpander,
        config: &PlannerConfig,
        cancel: Option<&CancelFlag>,
    ) -> Result<SearchVerdict> {
        let mut open = BinaryHeap::new();
        let mut seq = 0u64;
        let mut popped = 0usize;

        expander.expand(graph, root)?;
        let h = self.h_score(&graph.node(root)?.data)?;
        {
            let state = &mut graph.node_mut(root)?.data;
            state.h_score = h;
            state.f_score = state.g_score + h;
        }
        open.push(OpenEntry {
            f_score: graph.node(root)?.data.f_score,
            seq,
            node: root,
        });
        seq += 1;

        let mut last = root;
        while let Some(entry) = open.pop() {
            if let Some(flag) = cancel {
                if flag.is_cancelled() {
                    return Err(TandemError::Cancelled);
                }
            }
            popped += 1;
            if popped > config.max_expanded_states {
                return Err(TandemError::SearchLimitExceeded {
                    limit: config.max_expanded_states,
                });
            }

            let current = entry.node;
            last = current;
            trace!(state = current, f_score = entry.f_score, "popped state");

            if self.is_goal(&graph.node(current)?.data)? {
                debug!(
                    state = current,
                    cost = graph.node(current)?.data.g_score,
                    popped,
                    "goal state reached"
                );
                return Ok(SearchVerdict::Goal(current));
            }
            graph.node_mut(current)?.data.marked = true;

            let parent_g = graph.node(current)?.data.g_score;
            let outgoing: Vec<EdgeId> = graph.node(current)?.outgoing().to_vec();
            for edge_id in outgoing {
                let edge = graph.edge(edge_id)?;
                let (child, edge_cost) = (edge.target(), edge.data.cost);
                expander.expand(graph, child)?;

                let g = parent_g + edge_cost;
                graph.node_mut(child)?.data.g_score = g;
                let h = self.h_score(&graph.node(child)?.data)?;
                {
                    let state = &mut graph.node_mut(child)?.data;
                    state.h_score = h;
                    state.f_score = g + h;
                }
                open.push(OpenEntry {
                    f_score: g + h,
                    seq,
                    node: child,
                });
                seq += 1;
            }
        }

        debug!(popped, "open set drained without reaching a goal");
        Ok(SearchVerdict::Exhausted(last))
    }
}
