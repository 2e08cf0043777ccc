//! Enumeration of multi-agent action assignments.
//!
//! Given the OR-frontier of a search state, the combinator produces every
//! legal-by-shape assignment of agents to simultaneously chosen actions,
//! as the Cartesian composition of three stages: one action choice per
//! frontier subassembly, a subset of the agent roster, and an injection of
//! that subset into the chosen actions.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tandem_core::{AssemblyGraph, Configuration, NodeId, Result};

/// One (agent, action) pairing within an assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Acting agent.
    pub agent: String,
    /// Action name.
    pub action: String,
    /// Identifier of the action node in the assembly graph.
    pub action_node: NodeId,
}

/// Generates agent-action assignments for frontier states.
///
/// The intermediate combination buffers are struct fields so repeated
/// invocations reuse their allocations.
#[derive(Debug)]
pub struct Combinator {
    roster: Vec<String>,
    action_combinations: Vec<Vec<(String, NodeId)>>,
    agent_combinations: Vec<Vec<String>>,
    assignments: Vec<Vec<Assignment>>,
}

impl Combinator {
    /// Create a combinator over the configuration's agent roster. Roster
    /// order is the configuration's (sorted) iteration order and fixes the
    /// canonical agent order within every emitted subset.
    pub fn new(config: &Configuration) -> Self {
        Self {
            roster: config.agent_names().map(String::from).collect(),
            action_combinations: Vec::new(),
            agent_combinations: Vec::new(),
            assignments: Vec::new(),
        }
    }

    /// Enumerate every assignment over the given frontier.
    ///
    /// For a frontier of size `n`, roster of size `m`, and per-subassembly
    /// branching factors `|Aᵢ|`, the result holds
    /// `Σ_{k=1..min(n,m)} C(m,k) · P(n,k) · ∏|Aᵢ|` assignments. A frontier
    /// subassembly with no action successor is a dead end: nothing is
    /// emitted.
    ///
    /// The returned slice borrows the combinator's internal buffer and is
    /// valid until the next invocation.
    pub fn assignments(
        &mut self,
        assembly: &AssemblyGraph,
        frontier: &[NodeId],
    ) -> Result<&[Vec<Assignment>]> {
        self.generate_action_combinations(assembly, frontier)?;
        self.assignments.clear();

        let l = frontier.len().min(self.roster.len());
        for k in 1..=l {
            self.generate_agent_combinations(k);
            for agents_idx in 0..self.agent_combinations.len() {
                for actions_idx in 0..self.action_combinations.len() {
                    Self::assign_agents_to_actions(
                        &mut self.assignments,
                        &self.agent_combinations[agents_idx],
                        &self.action_combinations[actions_idx],
                    );
                }
            }
        }

        debug!(
            frontier = frontier.len(),
            tuples = self.action_combinations.len(),
            assignments = self.assignments.len(),
            "enumerated agent-action assignments"
        );
        Ok(&self.assignments)
    }

    /// Stage 1: the Cartesian product of the frontier's action-successor
    /// lists, in odometer order (rightmost index advances first).
    fn generate_action_combinations(
        &mut self,
        assembly: &AssemblyGraph,
        frontier: &[NodeId],
    ) -> Result<()> {
        self.action_combinations.clear();

        let n = frontier.len();
        if n == 0 {
            return Ok(());
        }
        let mut lists: Vec<Vec<(String, NodeId)>> = Vec::with_capacity(n);
        for &sub in frontier {
            let mut actions = Vec::new();
            for succ in assembly.successors(sub)? {
                actions.push((assembly.name(succ)?.to_string(), succ));
            }
            if actions.is_empty() {
                // Dead-end subassembly: no tuple can be formed.
                return Ok(());
            }
            lists.push(actions);
        }

        let mut indices = vec![0usize; n];
        loop {
            self.action_combinations.push(
                indices
                    .iter()
                    .enumerate()
                    .map(|(i, &j)| lists[i][j].clone())
                    .collect(),
            );
            // Advance the rightmost index that still has elements left.
            let mut next = n;
            while next > 0 && indices[next - 1] + 1 >= lists[next - 1].len() {
                next -= 1;
            }
            if next == 0 {
                break;
            }
            indices[next - 1] += 1;
            for index in indices.iter_mut().skip(next) {
                *index = 0;
            }
        }
        Ok(())
    }

    /// Stage 2: every size-k subset of the roster, agents in roster order.
    fn generate_agent_combinations(&mut self, k: usize) {
        self.agent_combinations.clear();
        for combo in (0..self.roster.len()).combinations(k) {
            self.agent_combinations
                .push(combo.into_iter().map(|i| self.roster[i].clone()).collect());
        }
    }

    /// Stage 3: every injection of the agent subset into the action tuple's
    /// positions, i.e. the k-permutations of `0..n`.
    fn assign_agents_to_actions(
        out: &mut Vec<Vec<Assignment>>,
        agents: &[String],
        actions: &[(String, NodeId)],
    ) {
        let n = actions.len();
        let k = agents.len();
        for selector in (0..n).permutations(k) {
            out.push(
                selector
                    .iter()
                    .enumerate()
                    .map(|(i, &position)| Assignment {
                        agent: agents[i].clone(),
                        action: actions[position].0.clone(),
                        action_node: actions[position].1,
                    })
                    .collect(),
            );
        }
    }
}
