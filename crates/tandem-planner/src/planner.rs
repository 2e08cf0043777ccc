//! Planner facade and configuration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tandem_core::{AssemblyGraph, Configuration, Result};

use crate::astar::{AStarSearch, SearchVerdict};
use crate::expander::NodeExpander;
use crate::plan::AssemblyPlan;
use crate::search::{SearchGraph, SearchState};

/// How a planning run ended.
///
/// A search that drains its frontier without reaching a goal is a
/// legitimate outcome, not a failure: it stays in the success channel so
/// callers can distinguish "no plan exists for these agents" from input,
/// validation, or resource errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanOutcome {
    /// The cheapest plan found.
    Plan(AssemblyPlan),
    /// No assignment sequence reaches a goal state.
    NoPlan,
}

impl PlanOutcome {
    /// True when the search found no plan.
    pub fn is_no_plan(&self) -> bool {
        matches!(self, PlanOutcome::NoPlan)
    }

    /// The plan, if one was found.
    pub fn into_plan(self) -> Option<AssemblyPlan> {
        match self {
            PlanOutcome::Plan(plan) => Some(plan),
            PlanOutcome::NoPlan => None,
        }
    }
}

/// Configuration for the planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Maximum number of states popped from the open set before the search
    /// gives up.
    pub max_expanded_states: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_expanded_states: 100_000,
        }
    }
}

/// Cooperative cancellation flag, checked between pops of the open set.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The assembly planner: validates its inputs, runs the A* search over a
/// fresh search graph, and traces the cheapest goal into an
/// [`AssemblyPlan`].
///
/// The search graph and all combination buffers are owned by the call and
/// released on every exit path.
#[derive(Debug, Default)]
pub struct Planner {
    config: PlannerConfig,
    cancel: Option<CancelFlag>,
}

impl Planner {
    /// Create a planner with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a planner with custom configuration.
    pub fn with_config(config: PlannerConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Install a cancellation flag; callers keep a clone to trip it.
    pub fn set_cancel_flag(&mut self, flag: CancelFlag) {
        self.cancel = Some(flag);
    }

    /// Compute a minimum-parallel-cost plan for the assembly graph.
    ///
    /// Validates graph and configuration first; planning aborts before any
    /// search work on validation failure. A drained search is reported as
    /// [`PlanOutcome::NoPlan`], not as an error.
    pub fn plan(&self, assembly: &AssemblyGraph, config: &Configuration) -> Result<PlanOutcome> {
        assembly.validate(config)?;

        let mut search = SearchGraph::new();
        let root = search.push_node(SearchState::root_of(assembly)?);
        let mut expander = NodeExpander::new(assembly, config);
        let astar = AStarSearch::new(assembly);

        info!(
            agents = config.agents.len(),
            nodes = assembly.nodes().count(),
            "planning started"
        );

        match astar.search(
            &mut search,
            root,
            &mut expander,
            &self.config,
            self.cancel.as_ref(),
        )? {
            SearchVerdict::Goal(goal) => {
                let plan = AssemblyPlan::trace(&search, goal)?;
                info!(
                    steps = plan.len(),
                    total_cost = plan.total_cost,
                    states = search.node_count(),
                    "plan found"
                );
                Ok(PlanOutcome::Plan(plan))
            }
            SearchVerdict::Exhausted(_) => {
                warn!(
                    states = search.node_count(),
                    "search exhausted without a goal"
                );
                Ok(PlanOutcome::NoPlan)
            }
        }
    }
}
