//! Generic directed-graph substrate.
//!
//! Nodes and edges live in arenas owned by the graph; every cross-reference
//! is an identifier into those arenas, never a pointer. Erasing a node
//! releases the node and every incident edge. Identifiers are allocated
//! monotonically and never reused within a graph instance.

use std::collections::BTreeMap;

use crate::error::{Result, TandemError};

/// Stable identifier of a node within one graph instance.
pub type NodeId = usize;

/// Stable identifier of an edge within one graph instance.
pub type EdgeId = usize;

/// A node: payload plus the identifiers of its incident edges.
#[derive(Debug, Clone)]
pub struct Node<N> {
    /// Identifier of this node.
    pub id: NodeId,
    /// Payload data.
    pub data: N,
    incoming: Vec<EdgeId>,
    outgoing: Vec<EdgeId>,
}

impl<N> Node<N> {
    /// Edges whose destination is this node, in insertion order.
    pub fn incoming(&self) -> &[EdgeId] {
        &self.incoming
    }

    /// Edges whose source is this node, in insertion order.
    pub fn outgoing(&self) -> &[EdgeId] {
        &self.outgoing
    }
}

/// An edge: payload plus its endpoint identifiers.
#[derive(Debug, Clone)]
pub struct Edge<E> {
    /// Identifier of this edge.
    pub id: EdgeId,
    /// Payload data.
    pub data: E,
    source: NodeId,
    target: NodeId,
}

impl<E> Edge<E> {
    /// The node this edge originates from.
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// The node this edge points to.
    pub fn target(&self) -> NodeId {
        self.target
    }
}

/// A directed graph parametric over node and edge payloads.
///
/// All lookups by a non-existent identifier return a diagnostic
/// [`TandemError`], never a silent success and never a panic.
#[derive(Debug, Clone)]
pub struct Graph<N, E> {
    nodes: BTreeMap<NodeId, Node<N>>,
    edges: BTreeMap<EdgeId, Edge<E>>,
    next_node: NodeId,
    next_edge: EdgeId,
}

impl<N, E> Default for Graph<N, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, E> Graph<N, E> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            next_node: 0,
            next_edge: 0,
        }
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether `id` resolves to a live node.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Borrow a node.
    pub fn node(&self, id: NodeId) -> Result<&Node<N>> {
        self.nodes
            .get(&id)
            .ok_or(TandemError::NodeNotFound { id })
    }

    /// Mutably borrow a node.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node<N>> {
        self.nodes
            .get_mut(&id)
            .ok_or(TandemError::NodeNotFound { id })
    }

    /// Borrow an edge by its identifier.
    pub fn edge(&self, id: EdgeId) -> Result<&Edge<E>> {
        self.edges.get(&id).ok_or(TandemError::EdgeIdNotFound { id })
    }

    /// Insert a node under a caller-chosen identifier.
    ///
    /// Inserting an identifier that is already live is an error; identifiers
    /// are never reused within a graph instance.
    pub fn insert_node(&mut self, id: NodeId, data: N) -> Result<NodeId> {
        if self.nodes.contains_key(&id) {
            return Err(TandemError::DuplicateNode { id });
        }
        self.nodes.insert(
            id,
            Node {
                id,
                data,
                incoming: Vec::new(),
                outgoing: Vec::new(),
            },
        );
        self.next_node = self.next_node.max(id + 1);
        Ok(id)
    }

    /// Insert a node under the next fresh identifier.
    pub fn push_node(&mut self, data: N) -> NodeId {
        let id = self.next_node;
        self.next_node += 1;
        self.nodes.insert(
            id,
            Node {
                id,
                data,
                incoming: Vec::new(),
                outgoing: Vec::new(),
            },
        );
        id
    }

    /// Insert a directed edge between two live nodes.
    pub fn insert_edge(&mut self, data: E, source: NodeId, target: NodeId) -> Result<EdgeId> {
        if !self.nodes.contains_key(&target) {
            return Err(TandemError::NodeNotFound { id: target });
        }
        let id = self.next_edge;
        self.nodes
            .get_mut(&source)
            .ok_or(TandemError::NodeNotFound { id: source })?
            .outgoing
            .push(id);
        self.nodes
            .get_mut(&target)
            .ok_or(TandemError::NodeNotFound { id: target })?
            .incoming
            .push(id);
        self.next_edge += 1;
        self.edges.insert(
            id,
            Edge {
                id,
                data,
                source,
                target,
            },
        );
        Ok(id)
    }

    /// Search for an edge between two live nodes.
    ///
    /// Linear scan over the edge arena; returns `Ok(None)` when both
    /// endpoints are live but no edge connects them.
    pub fn find_edge(&self, source: NodeId, target: NodeId) -> Result<Option<EdgeId>> {
        if !self.nodes.contains_key(&source) {
            return Err(TandemError::NodeNotFound { id: source });
        }
        if !self.nodes.contains_key(&target) {
            return Err(TandemError::NodeNotFound { id: target });
        }
        Ok(self
            .edges
            .values()
            .find(|e| e.source == source && e.target == target)
            .map(|e| e.id))
    }

    /// Erase the first edge from `source` to `target`.
    pub fn erase_edge(&mut self, source: NodeId, target: NodeId) -> Result<()> {
        let id = self
            .find_edge(source, target)?
            .ok_or(TandemError::EdgeNotFound { from: source, target })?;
        self.detach_edge(id);
        self.edges.remove(&id);
        Ok(())
    }

    /// Erase a node and every incident edge.
    pub fn erase_node(&mut self, id: NodeId) -> Result<()> {
        let node = self
            .nodes
            .remove(&id)
            .ok_or(TandemError::NodeNotFound { id })?;
        for edge_id in node.incoming.iter().chain(node.outgoing.iter()) {
            if let Some(edge) = self.edges.remove(edge_id) {
                // The erased node's own lists are already gone; unhook the
                // surviving endpoint. A self-loop appears in both lists and
                // was removed from the arena on the first pass.
                if let Some(src) = self.nodes.get_mut(&edge.source) {
                    src.outgoing.retain(|e| *e != edge.id);
                }
                if let Some(dst) = self.nodes.get_mut(&edge.target) {
                    dst.incoming.retain(|e| *e != edge.id);
                }
            }
        }
        Ok(())
    }

    /// Number of edges originating from a node.
    pub fn out_degree(&self, id: NodeId) -> Result<usize> {
        Ok(self.node(id)?.outgoing.len())
    }

    /// Number of edges incident to a node.
    pub fn in_degree(&self, id: NodeId) -> Result<usize> {
        Ok(self.node(id)?.incoming.len())
    }

    /// The j'th edge originating from a node.
    pub fn edge_from_node(&self, id: NodeId, j: usize) -> Result<&Edge<E>> {
        let node = self.node(id)?;
        let edge_id = *node
            .outgoing
            .get(j)
            .ok_or(TandemError::EdgeIndexOutOfRange {
                id,
                index: j,
                degree: node.outgoing.len(),
            })?;
        self.edge(edge_id)
    }

    /// The j'th edge incident to a node.
    pub fn edge_to_node(&self, id: NodeId, j: usize) -> Result<&Edge<E>> {
        let node = self.node(id)?;
        let edge_id = *node
            .incoming
            .get(j)
            .ok_or(TandemError::EdgeIndexOutOfRange {
                id,
                index: j,
                degree: node.incoming.len(),
            })?;
        self.edge(edge_id)
    }

    /// Iterate the edges originating from a node, in insertion order.
    pub fn successor_edges(&self, id: NodeId) -> Result<impl Iterator<Item = &Edge<E>>> {
        let node = self.node(id)?;
        Ok(node.outgoing.iter().filter_map(|e| self.edges.get(e)))
    }

    /// Iterate the edges incident to a node, in insertion order.
    pub fn predecessor_edges(&self, id: NodeId) -> Result<impl Iterator<Item = &Edge<E>>> {
        let node = self.node(id)?;
        Ok(node.incoming.iter().filter_map(|e| self.edges.get(e)))
    }

    /// Identifiers of the nodes reachable over one outgoing edge.
    pub fn successor_nodes(&self, id: NodeId) -> Result<impl Iterator<Item = NodeId> + '_> {
        Ok(self.successor_edges(id)?.map(|e| e.target))
    }

    /// Identifiers of the nodes reaching this node over one edge.
    pub fn predecessor_nodes(&self, id: NodeId) -> Result<impl Iterator<Item = NodeId> + '_> {
        Ok(self.predecessor_edges(id)?.map(|e| e.source))
    }

    /// Iterate all live nodes in identifier order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node<N>> {
        self.nodes.values()
    }

    /// Iterate all live edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge<E>> {
        self.edges.values()
    }

    fn detach_edge(&mut self, id: EdgeId) {
        let (source, target) = match self.edges.get(&id) {
            Some(e) => (e.source, e.target),
            None => return,
        };
        if let Some(src) = self.nodes.get_mut(&source) {
            src.outgoing.retain(|e| *e != id);
        }
        if let Some(dst) = self.nodes.get_mut(&target) {
            dst.incoming.retain(|e| *e != id);
        }
    }
}
