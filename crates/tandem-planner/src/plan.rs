//! The assembled plan: the goal state traced back to the root.

use serde::{Deserialize, Serialize};

use tandem_core::{AssemblyGraph, NodeId, Result};

use crate::combinator::Assignment;
use crate::search::SearchGraph;

/// One step of the plan: the assignments executed simultaneously at one
/// search transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Distance from the root state; steps are ordered root to goal.
    pub depth: usize,
    /// Per-agent action assignments of this step.
    pub assignments: Vec<Assignment>,
    /// Parallel cost of the step.
    pub cost: f64,
}

/// A complete assembly plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyPlan {
    /// Plan steps in execution order.
    pub steps: Vec<PlanStep>,
    /// Total parallel cost: the goal state's `g_score`.
    pub total_cost: f64,
}

impl AssemblyPlan {
    /// Trace the plan by walking predecessor edges from the goal state back
    /// to the root. Every search state has at most one incoming edge, so
    /// the walk is a simple chain.
    pub fn trace(search: &SearchGraph, goal: NodeId) -> Result<Self> {
        let total_cost = search.node(goal)?.data.g_score;

        let mut collected = Vec::new();
        let mut current = goal;
        loop {
            let node = search.node(current)?;
            let Some(&edge_id) = node.incoming().first() else {
                break;
            };
            let edge = search.edge(edge_id)?;
            collected.push((edge.data.assignments.clone(), edge.data.cost));
            current = edge.source();
        }
        collected.reverse();

        let steps = collected
            .into_iter()
            .enumerate()
            .map(|(depth, (assignments, cost))| PlanStep {
                depth,
                assignments,
                cost,
            })
            .collect();

        Ok(Self { steps, total_cost })
    }

    /// Number of steps in the plan.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True when the root was already a goal.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Stamp each chosen action's agent into the assembly graph, for the
    /// plan writers.
    pub fn annotate(&self, assembly: &mut AssemblyGraph) -> Result<()> {
        for step in &self.steps {
            for assignment in &step.assignments {
                assembly.set_assigned_agent(assignment.action_node, &assignment.agent)?;
            }
        }
        Ok(())
    }

    /// All assignments of the plan in execution order.
    pub fn assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.steps.iter().flat_map(|step| step.assignments.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{SearchEdge, SearchState};
    use std::collections::BTreeMap;

    fn assignment(agent: &str, action: &str, node: NodeId) -> Assignment {
        Assignment {
            agent: agent.to_string(),
            action: action.to_string(),
            action_node: node,
        }
    }

    /// Hand-build a two-step chain root -> mid -> goal.
    fn chain() -> (SearchGraph, NodeId) {
        let mut search = SearchGraph::new();
        let root = search.push_node(SearchState::with_frontier(BTreeMap::new()));
        let mid = search.push_node(SearchState::with_frontier(BTreeMap::new()));
        let goal = search.push_node(SearchState::with_frontier(BTreeMap::new()));
        search
            .insert_edge(
                SearchEdge {
                    assignments: vec![assignment("a1", "split", 10)],
                    cost: 2.0,
                },
                root,
                mid,
            )
            .unwrap();
        search
            .insert_edge(
                SearchEdge {
                    assignments: vec![assignment("a1", "join", 11), assignment("a2", "bolt", 12)],
                    cost: 3.0,
                },
                mid,
                goal,
            )
            .unwrap();
        search.node_mut(goal).unwrap().data.g_score = 5.0;
        (search, goal)
    }

    #[test]
    fn test_trace_orders_steps_root_to_goal() {
        let (search, goal) = chain();
        let plan = AssemblyPlan::trace(&search, goal).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.total_cost, 5.0);
        assert_eq!(plan.steps[0].depth, 0);
        assert_eq!(plan.steps[0].assignments[0].action, "split");
        assert_eq!(plan.steps[1].depth, 1);
        assert_eq!(plan.steps[1].assignments.len(), 2);
        assert_eq!(plan.steps[1].cost, 3.0);
    }

    #[test]
    fn test_trace_of_goal_root_is_empty() {
        let mut search = SearchGraph::new();
        let root = search.push_node(SearchState::with_frontier(BTreeMap::new()));
        let plan = AssemblyPlan::trace(&search, root).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.total_cost, 0.0);
    }

    #[test]
    fn test_annotate_stamps_agents() {
        let mut assembly = AssemblyGraph::new();
        assembly.insert_or("product");
        let build = assembly.insert_and("build");
        assembly.insert_edge("product", "build").unwrap();

        let plan = AssemblyPlan {
            steps: vec![PlanStep {
                depth: 0,
                assignments: vec![assignment("r1", "build", build)],
                cost: 1.0,
            }],
            total_cost: 1.0,
        };
        plan.annotate(&mut assembly).unwrap();
        assert_eq!(
            assembly.node(build).unwrap().assigned_agent.as_deref(),
            Some("r1")
        );
    }

    #[test]
    fn test_plan_serializes() {
        let (search, goal) = chain();
        let plan = AssemblyPlan::trace(&search, goal).unwrap();
        let json = serde_json::to_string(&plan).unwrap();
        let back: AssemblyPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(back, plan);
    }
}
