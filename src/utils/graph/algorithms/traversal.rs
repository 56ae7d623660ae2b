//! Depth-first traversal and reachability.

use crate::utils::{
    graph::{NodeId, Successors},
    BitSet,
};

/// Depth-first search iterator over graph nodes.
///
/// Performs an iterative (non-recursive) pre-order traversal from a start node, visiting
/// each reachable node exactly once. Successors are visited in adjacency order.
pub struct DfsIterator<'g, G: Successors> {
    graph: &'g G,
    stack: Vec<NodeId>,
    visited: BitSet,
}

impl<'g, G: Successors> DfsIterator<'g, G> {
    fn new(graph: &'g G, start: NodeId) -> Self {
        let mut visited = BitSet::new(graph.node_count());
        let mut stack = Vec::new();
        if graph.contains_node(start) {
            visited.insert(start.index());
            stack.push(start);
        }
        DfsIterator {
            graph,
            stack,
            visited,
        }
    }
}

impl<G: Successors> Iterator for DfsIterator<'_, G> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;

        // Reverse so the first successor is popped first
        let successors: Vec<NodeId> = self.graph.successors(node).collect();
        for &succ in successors.iter().rev() {
            if self.visited.insert(succ.index()) {
                self.stack.push(succ);
            }
        }

        Some(node)
    }
}

/// Returns a depth-first pre-order iterator starting at `start`.
///
/// A start node that does not exist in the graph yields an empty traversal.
///
/// # Examples
///
/// ```rust
/// use flowscope::prelude::*;
/// use flowscope::utils::graph::algorithms::dfs;
///
/// let mut builder = CfgBuilder::new();
/// let a = builder.add_block();
/// let b = builder.add_block();
/// let _orphan = builder.add_block();
/// builder.add_edge(a, b);
/// let cfg = builder.build()?;
///
/// assert_eq!(dfs(&cfg, a).collect::<Vec<_>>(), vec![a, b]);
/// # Ok::<(), flowscope::Error>(())
/// ```
pub fn dfs<G: Successors>(graph: &G, start: NodeId) -> DfsIterator<'_, G> {
    DfsIterator::new(graph, start)
}

/// Returns the set of node indices reachable from `start`, including `start` itself.
#[must_use]
pub fn reachable<G: Successors>(graph: &G, start: NodeId) -> BitSet {
    let mut set = BitSet::new(graph.node_count());
    for node in dfs(graph, start) {
        set.insert(node.index());
    }
    set
}
