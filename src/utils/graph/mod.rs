//! Graph abstractions shared by the control-flow graph and the algorithms that run on it.
//!
//! Algorithms such as dominance and traversal are written against the small trait
//! family below instead of a concrete graph type:
//!
//! - [`GraphBase`] - node count and node enumeration
//! - [`Successors`] - outgoing adjacency
//! - [`Predecessors`] - incoming adjacency
//! - [`RootedGraph`] - a designated entry node
//!
//! All adjacency queries are total: asking for the neighbours of a node that does not
//! exist yields an empty iterator.

pub mod algorithms;
mod node;

pub use node::NodeId;

/// Basic information about a graph's node set.
pub trait GraphBase {
    /// Number of nodes. Node ids are dense in `0..node_count()`.
    fn node_count(&self) -> usize;

    /// Iterates over all node ids in creation order.
    fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.node_count()).map(NodeId::new)
    }

    /// Returns `true` if `node` names an existing node.
    fn contains_node(&self, node: NodeId) -> bool {
        node.index() < self.node_count()
    }
}

/// Outgoing adjacency.
pub trait Successors: GraphBase {
    /// Nodes reachable from `node` over a single edge.
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_;
}

/// Incoming adjacency.
pub trait Predecessors: GraphBase {
    /// Nodes with an edge into `node`.
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_;
}

/// A graph with a single designated entry node.
pub trait RootedGraph: GraphBase {
    /// The entry node. Only meaningful when the graph is non-empty.
    fn entry(&self) -> NodeId;
}
