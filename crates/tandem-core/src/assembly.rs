//! The typed AND/OR assembly graph and its factory.
//!
//! Nodes alternate between SUBASSEMBLY (OR, a choice among decompositions)
//! and ACTION (AND, an operation that jointly produces its successors).
//! The INTERACTION and INTERASSEMBLY kinds tag auxiliary handoff nodes.

use serde::{Deserialize, Serialize};

use crate::config::Configuration;
use crate::error::{Result, TandemError};
use crate::graph::{Edge, Graph, Node, NodeId};

/// The closed set of assembly-node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A primitive assembly operation (AND).
    Action,
    /// A (possibly partial) product (OR).
    Subassembly,
    /// An auxiliary handoff action (AND side).
    Interaction,
    /// An auxiliary handoff product (OR side).
    Interassembly,
}

impl NodeKind {
    /// True for the AND side of the bipartition.
    pub fn is_and(self) -> bool {
        matches!(self, NodeKind::Action | NodeKind::Interaction)
    }

    /// True for the OR side of the bipartition.
    pub fn is_or(self) -> bool {
        !self.is_and()
    }
}

/// Payload of one assembly-graph node.
#[derive(Debug, Clone)]
pub struct AssemblyNode {
    /// Node kind.
    pub kind: NodeKind,
    /// Node name, unique within the graph.
    pub name: String,
    /// Agent chosen for an ACTION node; filled in after planning.
    pub assigned_agent: Option<String>,
    /// Interaction wiring used when tracing handoffs.
    pub interaction_prev: Option<NodeId>,
    pub interaction_or: Option<NodeId>,
    pub interaction_next: Option<NodeId>,
}

impl AssemblyNode {
    fn new(kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            assigned_agent: None,
            interaction_prev: None,
            interaction_or: None,
            interaction_next: None,
        }
    }
}

/// The AND/OR assembly graph: a [`Graph`] specialised with assembly payloads,
/// a name index, and a designated root subassembly.
///
/// The factory methods are idempotent by name: inserting a known name returns
/// the existing identifier.
#[derive(Debug, Clone, Default)]
pub struct AssemblyGraph {
    graph: Graph<AssemblyNode, ()>,
    index: std::collections::HashMap<String, NodeId>,
    root: Option<NodeId>,
}

impl AssemblyGraph {
    /// Create an empty assembly graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a SUBASSEMBLY (OR) node, or return the existing id.
    pub fn insert_or(&mut self, name: &str) -> NodeId {
        self.insert(NodeKind::Subassembly, name)
    }

    /// Insert an ACTION (AND) node, or return the existing id.
    pub fn insert_and(&mut self, name: &str) -> NodeId {
        self.insert(NodeKind::Action, name)
    }

    /// Insert a node of an arbitrary kind, or return the existing id.
    pub fn insert(&mut self, kind: NodeKind, name: &str) -> NodeId {
        if let Some(id) = self.index.get(name) {
            return *id;
        }
        let id = self.graph.push_node(AssemblyNode::new(kind, name));
        self.index.insert(name.to_string(), id);
        id
    }

    /// Insert a directed edge between two named nodes.
    pub fn insert_edge(&mut self, from: &str, to: &str) -> Result<()> {
        let source = self.id_of(from).ok_or_else(|| TandemError::UnknownEndpoint {
            name: from.to_string(),
        })?;
        let target = self.id_of(to).ok_or_else(|| TandemError::UnknownEndpoint {
            name: to.to_string(),
        })?;
        self.graph.insert_edge((), source, target)?;
        Ok(())
    }

    /// Designate the root subassembly by name.
    pub fn set_root(&mut self, name: &str) -> Result<()> {
        let id = self.id_of(name).ok_or_else(|| TandemError::UnknownRoot {
            name: name.to_string(),
        })?;
        self.root = Some(id);
        Ok(())
    }

    /// The designated root, if any.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Resolve a name to its node id.
    pub fn id_of(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    /// Borrow a node's payload.
    pub fn node(&self, id: NodeId) -> Result<&AssemblyNode> {
        Ok(&self.graph.node(id)?.data)
    }

    /// A node's name.
    pub fn name(&self, id: NodeId) -> Result<&str> {
        Ok(self.node(id)?.name.as_str())
    }

    /// A node's kind.
    pub fn kind(&self, id: NodeId) -> Result<NodeKind> {
        Ok(self.node(id)?.kind)
    }

    /// Successor node ids, in edge-insertion order.
    pub fn successors(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.graph.successor_nodes(id)?.collect())
    }

    /// Predecessor node ids, in edge-insertion order.
    pub fn predecessors(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.graph.predecessor_nodes(id)?.collect())
    }

    /// Whether a node has any successor.
    pub fn has_successors(&self, id: NodeId) -> Result<bool> {
        Ok(self.graph.out_degree(id)? > 0)
    }

    /// Record the agent chosen for an action node.
    pub fn set_assigned_agent(&mut self, id: NodeId, agent: &str) -> Result<()> {
        self.graph.node_mut(id)?.data.assigned_agent = Some(agent.to_string());
        Ok(())
    }

    /// Iterate all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &Node<AssemblyNode>> {
        self.graph.nodes()
    }

    /// Iterate all edges.
    pub fn edges(&self) -> impl Iterator<Item = &Edge<()>> {
        self.graph.edges()
    }

    /// Validate the graph against the configuration. Run once after
    /// construction; planning aborts on any failure.
    ///
    /// Checks, in order: configuration completeness, a designated
    /// SUBASSEMBLY root, bipartite alternation on every edge, acyclicity,
    /// and a cost/reachability entry for every graph node that needs one.
    pub fn validate(&self, config: &Configuration) -> Result<()> {
        config.validate()?;

        let root = self.root.ok_or(TandemError::MissingRoot)?;
        let root_node = self.node(root)?;
        if root_node.kind != NodeKind::Subassembly {
            return Err(TandemError::RootNotSubassembly {
                name: root_node.name.clone(),
            });
        }

        for node in self.graph.nodes() {
            for successor in self.graph.successor_nodes(node.id)? {
                let succ = self.node(successor)?;
                if node.data.kind.is_and() == succ.kind.is_and() {
                    return Err(TandemError::AlternationViolation {
                        from: node.data.name.clone(),
                        target: succ.name.clone(),
                    });
                }
            }
        }

        self.check_acyclic()?;

        for node in self.graph.nodes() {
            match node.data.kind {
                NodeKind::Action | NodeKind::Interaction => {
                    for agent in config.agents.keys() {
                        if config.cost_of(&node.data.name, agent).is_none() {
                            return Err(TandemError::MissingCost {
                                action: node.data.name.clone(),
                                agent: agent.clone(),
                            });
                        }
                    }
                }
                NodeKind::Subassembly | NodeKind::Interassembly => {
                    for agent in config.agents.keys() {
                        if config.reach_of(&node.data.name, agent).is_none() {
                            return Err(TandemError::MissingReach {
                                subassembly: node.data.name.clone(),
                                agent: agent.clone(),
                            });
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn check_acyclic(&self) -> Result<()> {
        // Iterative DFS with three colours; a back edge is a cycle.
        #[derive(Clone, Copy, PartialEq)]
        enum Colour {
            White,
            Grey,
            Black,
        }
        let mut colour: std::collections::HashMap<NodeId, Colour> = self
            .graph
            .nodes()
            .map(|n| (n.id, Colour::White))
            .collect();

        for start in self.graph.nodes().map(|n| n.id).collect::<Vec<_>>() {
            if colour[&start] != Colour::White {
                continue;
            }
            let mut stack = vec![(start, false)];
            while let Some((id, children_done)) = stack.pop() {
                if children_done {
                    colour.insert(id, Colour::Black);
                    continue;
                }
                colour.insert(id, Colour::Grey);
                stack.push((id, true));
                for succ in self.graph.successor_nodes(id)? {
                    match colour[&succ] {
                        Colour::Grey => {
                            return Err(TandemError::CyclicGraph {
                                name: self.name(succ)?.to_string(),
                            });
                        }
                        Colour::White => stack.push((succ, false)),
                        Colour::Black => {}
                    }
                }
            }
        }
        Ok(())
    }
}
