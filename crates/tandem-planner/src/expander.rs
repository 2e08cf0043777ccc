//! Node expansion: turning one search state into its successor states.

use std::collections::BTreeMap;

use tracing::debug;

use tandem_core::{AssemblyGraph, Configuration, EdgeId, NodeId, Result, TandemError};

use crate::combinator::{Assignment, Combinator};
use crate::search::{SearchEdge, SearchGraph, SearchState};

/// Expands search states by materialising every legal multi-agent
/// assignment over the state's action frontier as an outgoing edge.
#[derive(Debug)]
pub struct NodeExpander<'a> {
    assembly: &'a AssemblyGraph,
    config: &'a Configuration,
    combinator: Combinator,
}

impl<'a> NodeExpander<'a> {
    /// Create an expander over an immutable assembly graph and
    /// configuration.
    pub fn new(assembly: &'a AssemblyGraph, config: &'a Configuration) -> Self {
        Self {
            assembly,
            config,
            combinator: Combinator::new(config),
        }
    }

    /// Expand one search state: compute its action frontier, enumerate
    /// assignments, filter illegal ones, and insert one child state and
    /// edge per surviving assignment. Returns the created edge ids.
    pub fn expand(&mut self, search: &mut SearchGraph, id: NodeId) -> Result<Vec<EdgeId>> {
        let assembly = self.assembly;
        let config = self.config;

        let parent_subs = search.node(id)?.data.subassemblies.clone();
        let parent_min = search.node(id)?.data.minimum_cost_action;

        // Action frontier: the union of the ACTION successors of every
        // frontier subassembly.
        let mut action_frontier = BTreeMap::new();
        for &sub in parent_subs.values() {
            for succ in assembly.successors(sub)? {
                action_frontier.insert(assembly.name(succ)?.to_string(), succ);
            }
        }
        search.node_mut(id)?.data.actions = action_frontier;

        let frontier_ids: Vec<NodeId> = parent_subs.values().copied().collect();
        let assignments = self.combinator.assignments(assembly, &frontier_ids)?;

        let mut edges = Vec::new();
        let mut skipped = 0usize;
        for assignment in assignments {
            let Some((edge_cost, min_cost)) =
                legal_costs(assembly, config, &parent_subs, assignment)?
            else {
                skipped += 1;
                continue;
            };

            // Child frontier: drop what the chosen actions consume, add
            // what they produce.
            let mut child_subs = parent_subs.clone();
            for triple in assignment {
                for pred in assembly.predecessors(triple.action_node)? {
                    child_subs.remove(assembly.name(pred)?);
                }
                for succ in assembly.successors(triple.action_node)? {
                    child_subs.insert(assembly.name(succ)?.to_string(), succ);
                }
            }

            let mut child = SearchState::with_frontier(child_subs);
            child.minimum_cost_action = parent_min.min(min_cost);
            let child_id = search.push_node(child);
            edges.push(search.insert_edge(
                SearchEdge {
                    assignments: assignment.clone(),
                    cost: edge_cost,
                },
                id,
                child_id,
            )?);
        }

        debug!(
            state = id,
            children = edges.len(),
            skipped,
            "expanded search state"
        );
        Ok(edges)
    }
}

/// Legality filter. Returns the (parallel cost, minimum cost) of the
/// assignment, or `None` when any triple is illegal: a non-finite cost, or
/// an agent acting on a subassembly it cannot reach without the required
/// interaction appearing elsewhere in the assignment.
fn legal_costs(
    assembly: &AssemblyGraph,
    config: &Configuration,
    frontier: &BTreeMap<String, NodeId>,
    assignment: &[Assignment],
) -> Result<Option<(f64, f64)>> {
    let mut max_cost = f64::NEG_INFINITY;
    let mut min_cost = f64::INFINITY;

    for triple in assignment {
        let cost = config
            .cost_of(&triple.action, &triple.agent)
            .ok_or_else(|| TandemError::MissingCost {
                action: triple.action.clone(),
                agent: triple.agent.clone(),
            })?;
        if !cost.is_finite() {
            return Ok(None);
        }
        max_cost = max_cost.max(cost);
        min_cost = min_cost.min(cost);

        for pred in assembly.predecessors(triple.action_node)? {
            let subassembly = assembly.name(pred)?;
            if !frontier.contains_key(subassembly) {
                continue;
            }
            let reach = config
                .reach_of(subassembly, &triple.agent)
                .ok_or_else(|| TandemError::MissingReach {
                    subassembly: subassembly.to_string(),
                    agent: triple.agent.clone(),
                })?;
            if reach.reachable {
                continue;
            }
            let satisfied = reach
                .interaction
                .as_deref()
                .is_some_and(|required| assignment.iter().any(|other| other.action == required));
            if !satisfied {
                return Ok(None);
            }
        }
    }

    Ok(Some((max_cost, min_cost)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;
    use tandem_core::{ActionSpec, Agent, Reach, SubassemblySpec};

    fn agent(name: &str) -> (String, Agent) {
        (
            name.to_string(),
            Agent {
                name: name.to_string(),
                host: "localhost".to_string(),
                port: "7001".to_string(),
            },
        )
    }

    fn action(name: &str, costs: &[(&str, f64)]) -> (String, ActionSpec) {
        (
            name.to_string(),
            ActionSpec {
                name: name.to_string(),
                costs: costs
                    .iter()
                    .map(|(agent, cost)| (agent.to_string(), *cost))
                    .collect(),
            },
        )
    }

    fn reachable_sub(name: &str, agents: &[&str]) -> (String, SubassemblySpec) {
        (
            name.to_string(),
            SubassemblySpec {
                name: name.to_string(),
                reachability: agents
                    .iter()
                    .map(|agent| (agent.to_string(), Reach::reachable()))
                    .collect(),
            },
        )
    }

    /// product --{fast|slow}--> half; both agents can do everything.
    fn two_way_fixture() -> (AssemblyGraph, Configuration) {
        let mut assembly = AssemblyGraph::new();
        assembly.insert_or("product");
        assembly.insert_and("fast");
        assembly.insert_and("slow");
        assembly.insert_or("half");
        assembly.insert_edge("product", "fast").unwrap();
        assembly.insert_edge("product", "slow").unwrap();
        assembly.insert_edge("fast", "half").unwrap();
        assembly.insert_edge("slow", "half").unwrap();
        assembly.set_root("product").unwrap();

        let config = Configuration {
            agents: Map::from([agent("h1"), agent("r1")]),
            actions: Map::from([
                action("fast", &[("h1", 2.0), ("r1", 4.0)]),
                action("slow", &[("h1", 7.0), ("r1", 9.0)]),
            ]),
            subassemblies: Map::from([
                reachable_sub("product", &["h1", "r1"]),
                reachable_sub("half", &["h1", "r1"]),
            ]),
        };
        (assembly, config)
    }

    fn expand_root(
        assembly: &AssemblyGraph,
        config: &Configuration,
    ) -> (SearchGraph, NodeId, Vec<EdgeId>) {
        let mut search = SearchGraph::new();
        let root = search.push_node(SearchState::root_of(assembly).unwrap());
        let mut expander = NodeExpander::new(assembly, config);
        let edges = expander.expand(&mut search, root).unwrap();
        (search, root, edges)
    }

    #[test]
    fn test_expand_fills_action_frontier() {
        let (assembly, config) = two_way_fixture();
        let (search, root, _) = expand_root(&assembly, &config);
        let actions = &search.node(root).unwrap().data.actions;
        assert_eq!(actions.len(), 2);
        assert!(actions.contains_key("fast"));
        assert!(actions.contains_key("slow"));
    }

    #[test]
    fn test_edge_cost_is_parallel_max_and_children_fold_frontier() {
        let (assembly, config) = two_way_fixture();
        let (search, root, edges) = expand_root(&assembly, &config);
        // One frontier slot, two actions, two agents, k = 1: 4 children.
        assert_eq!(edges.len(), 4);

        for edge_id in edges {
            let edge = search.edge(edge_id).unwrap();
            assert_eq!(edge.source(), root);
            let triple = &edge.data.assignments[0];
            assert_eq!(
                edge.data.cost,
                config.cost_of(&triple.action, &triple.agent).unwrap()
            );

            let child = &search.node(edge.target()).unwrap().data;
            // product consumed, half produced.
            assert!(!child.subassemblies.contains_key("product"));
            assert!(child.subassemblies.contains_key("half"));
            assert_eq!(child.minimum_cost_action, edge.data.cost);
        }
    }

    #[test]
    fn test_infinite_cost_assignments_are_skipped() {
        let (assembly, mut config) = two_way_fixture();
        config
            .actions
            .get_mut("slow")
            .unwrap()
            .costs
            .insert("r1".to_string(), f64::INFINITY);
        let (_, _, edges) = expand_root(&assembly, &config);
        // The r1->slow child disappears, the other three survive.
        assert_eq!(edges.len(), 3);
    }

    #[test]
    fn test_unreachable_without_interaction_is_skipped() {
        let (assembly, mut config) = two_way_fixture();
        config
            .subassemblies
            .get_mut("product")
            .unwrap()
            .reachability
            .insert("r1".to_string(), Reach::via("handover"));
        let (_, _, edges) = expand_root(&assembly, &config);
        // No assignment can contain "handover": both r1 children vanish.
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn test_unreachable_with_co_assigned_interaction_survives() {
        // Two frontier subassemblies: "handover" under one of them makes
        // the other reachable for r1.
        let mut assembly = AssemblyGraph::new();
        assembly.insert_or("root");
        assembly.insert_and("split");
        assembly.insert_or("bolt");
        assembly.insert_or("panel");
        assembly.insert_and("tighten");
        assembly.insert_and("handover");
        assembly.insert_edge("root", "split").unwrap();
        assembly.insert_edge("split", "bolt").unwrap();
        assembly.insert_edge("split", "panel").unwrap();
        assembly.insert_edge("bolt", "tighten").unwrap();
        assembly.insert_edge("panel", "handover").unwrap();
        assembly.set_root("root").unwrap();

        let config = Configuration {
            agents: Map::from([agent("h1"), agent("r1")]),
            actions: Map::from([
                action("split", &[("h1", 1.0), ("r1", 1.0)]),
                action("tighten", &[("h1", f64::INFINITY), ("r1", 2.0)]),
                action("handover", &[("h1", 1.0), ("r1", f64::INFINITY)]),
            ]),
            subassemblies: Map::from([
                reachable_sub("root", &["h1", "r1"]),
                (
                    "bolt".to_string(),
                    SubassemblySpec {
                        name: "bolt".to_string(),
                        reachability: Map::from([
                            ("h1".to_string(), Reach::reachable()),
                            ("r1".to_string(), Reach::via("handover")),
                        ]),
                    },
                ),
                reachable_sub("panel", &["h1", "r1"]),
            ]),
        };

        let mut search = SearchGraph::new();
        let frontier = Map::from([
            ("bolt".to_string(), assembly.id_of("bolt").unwrap()),
            ("panel".to_string(), assembly.id_of("panel").unwrap()),
        ]);
        let root = search.push_node(SearchState::with_frontier(frontier));
        let mut expander = NodeExpander::new(&assembly, &config);
        let edges = expander.expand(&mut search, root).unwrap();

        // r1 can only act on bolt when h1 hands the panel over in the same
        // step; the surviving two-agent assignment pairs them up.
        let paired: Vec<_> = edges
            .iter()
            .map(|&e| search.edge(e).unwrap())
            .filter(|edge| edge.data.assignments.len() == 2)
            .collect();
        assert_eq!(paired.len(), 1);
        let names: Vec<_> = paired[0]
            .data
            .assignments
            .iter()
            .map(|a| (a.agent.as_str(), a.action.as_str()))
            .collect();
        assert!(names.contains(&("r1", "tighten")));
        assert!(names.contains(&("h1", "handover")));
        assert_eq!(paired[0].data.cost, 2.0);
    }

    #[test]
    fn test_goal_state_expands_to_nothing() {
        let (assembly, config) = two_way_fixture();
        let mut search = SearchGraph::new();
        let half = assembly.id_of("half").unwrap();
        let root = search.push_node(SearchState::with_frontier(Map::from([(
            "half".to_string(),
            half,
        )])));
        let mut expander = NodeExpander::new(&assembly, &config);
        assert!(expander.expand(&mut search, root).unwrap().is_empty());
    }
}
