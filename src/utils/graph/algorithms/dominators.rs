//! Dominator sets computed by iterative dataflow.
//!
//! A node `d` **dominates** a node `n` if every path from the entry node to `n` passes
//! through `d`. Every node dominates itself. The **immediate dominator** of `n` is the
//! strict dominator of `n` that is closest to it: every other strict dominator of `n`
//! also dominates it.
//!
//! # Algorithm
//!
//! The entry's set starts as `{entry}` and every other set starts as the universe of all
//! nodes. Each round recomputes, for every non-entry node in creation order,
//!
//! ```text
//! dom(n) = {n} ∪ ⋂ dom(p) for p in preds(n)
//! ```
//!
//! until no set changes. Sets only ever shrink, so the loop terminates without a cap.
//!
//! Nodes that are not reachable from the entry are never refined and keep the universe as
//! their set. That universe means "not yet proven dominated", so every query here treats
//! an unreachable node as dominated by itself only.

use crate::utils::{
    graph::{algorithms::reachable, NodeId, Predecessors, RootedGraph, Successors},
    BitSet,
};

/// The dominance relation of a rooted graph.
///
/// # Examples
///
/// ```rust
/// use flowscope::prelude::*;
///
/// // B0 -> B1 -> B2 -> B1
/// let mut builder = CfgBuilder::new();
/// let b0 = builder.add_block();
/// let b1 = builder.add_block();
/// let b2 = builder.add_block();
/// builder.add_edge(b0, b1);
/// builder.add_edge(b1, b2);
/// builder.add_edge(b2, b1);
/// let cfg = builder.build()?;
///
/// let doms = Dominators::compute(&cfg);
/// assert!(doms.dominates(b1, b2));
/// assert_eq!(doms.immediate_dominator(b2), Some(b1));
/// assert_eq!(doms.dominators_of(b2), vec![b0, b1, b2]);
/// # Ok::<(), flowscope::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Dominators {
    entry: NodeId,
    sets: Vec<BitSet>,
    reachable: BitSet,
    idom: Vec<Option<NodeId>>,
    rounds: usize,
}

impl Dominators {
    /// Computes the dominance relation of `graph`.
    ///
    /// An empty graph yields an empty relation for which every query answers "no
    /// information".
    #[must_use]
    pub fn compute<G>(graph: &G) -> Self
    where
        G: RootedGraph + Successors + Predecessors,
    {
        let node_count = graph.node_count();
        if node_count == 0 {
            return Self::default();
        }

        let entry = graph.entry();
        let mut sets: Vec<BitSet> = (0..node_count)
            .map(|index| {
                if index == entry.index() {
                    BitSet::from_indices(node_count, [index])
                } else {
                    BitSet::full(node_count)
                }
            })
            .collect();

        let mut rounds = 0;
        let mut changed = true;
        while changed {
            changed = false;
            rounds += 1;

            for node in graph.node_ids() {
                if node == entry {
                    continue;
                }

                let mut next = BitSet::full(node_count);
                for pred in graph.predecessors(node) {
                    next.intersect_with(&sets[pred.index()]);
                }
                next.insert(node.index());

                if next != sets[node.index()] {
                    sets[node.index()] = next;
                    changed = true;
                }
            }
        }

        let reachable = reachable(graph, entry);
        let idom = (0..node_count)
            .map(|index| Self::closest_strict_dominator(&sets, &reachable, entry, index))
            .collect();

        Dominators {
            entry,
            sets,
            reachable,
            idom,
            rounds,
        }
    }

    fn closest_strict_dominator(
        sets: &[BitSet],
        reachable: &BitSet,
        entry: NodeId,
        index: usize,
    ) -> Option<NodeId> {
        if index == entry.index() || !reachable.contains(index) {
            return None;
        }

        let strict: Vec<usize> = sets[index].iter().filter(|&d| d != index).collect();
        strict
            .iter()
            .copied()
            .find(|&candidate| {
                strict
                    .iter()
                    .all(|&other| other == candidate || sets[candidate].contains(other))
            })
            .map(NodeId::new)
    }

    /// The entry node the relation was computed from.
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Number of nodes covered by the relation.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.sets.len()
    }

    /// Number of refinement rounds the fixpoint needed, including the final stable round.
    #[must_use]
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Returns `true` if `node` can be reached from the entry.
    #[must_use]
    pub fn is_reachable(&self, node: NodeId) -> bool {
        self.reachable.contains(node.index())
    }

    /// Returns `true` if `a` dominates `b`.
    ///
    /// A node always dominates itself. An unreachable `b` is dominated by nothing else.
    /// Unknown nodes are dominated by nothing.
    #[must_use]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        if b.index() >= self.sets.len() {
            return false;
        }
        if a == b {
            return true;
        }
        self.is_reachable(b) && self.sets[b.index()].contains(a.index())
    }

    /// Returns `true` if `a` dominates `b` and `a != b`.
    #[must_use]
    pub fn strictly_dominates(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// All dominators of `node` in ascending id order, including `node` itself.
    ///
    /// Returns an empty vector for unknown nodes and `[node]` for unreachable ones.
    #[must_use]
    pub fn dominators_of(&self, node: NodeId) -> Vec<NodeId> {
        match self.sets.get(node.index()) {
            None => Vec::new(),
            Some(_) if !self.is_reachable(node) => vec![node],
            Some(set) => set.iter().map(NodeId::new).collect(),
        }
    }

    /// The immediate dominator of `node`.
    ///
    /// `None` for the entry, for unreachable nodes and for unknown nodes.
    #[must_use]
    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        self.idom.get(node.index()).copied().flatten()
    }

    /// Nodes whose immediate dominator is `node`, in ascending id order.
    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.idom
            .iter()
            .enumerate()
            .filter(|(_, idom)| **idom == Some(node))
            .map(|(index, _)| NodeId::new(index))
            .collect()
    }

    /// Depth of `node` in the dominator tree. The entry, unreachable and unknown nodes have depth 0.
    #[must_use]
    pub fn depth(&self, node: NodeId) -> usize {
        let mut depth = 0;
        let mut current = node;
        while let Some(parent) = self.immediate_dominator(current) {
            depth += 1;
            current = parent;
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::cfg::{CfgBuilder, ControlFlowGraph};
    use crate::utils::graph::GraphBase;

    fn graph(blocks: usize, edges: &[(usize, usize)]) -> ControlFlowGraph {
        let mut builder = CfgBuilder::new();
        for _ in 0..blocks {
            builder.add_block();
        }
        for &(from, to) in edges {
            builder.add_edge(NodeId::new(from), NodeId::new(to));
        }
        builder.build().unwrap()
    }

    fn n(index: usize) -> NodeId {
        NodeId::new(index)
    }

    #[test]
    fn test_empty_graph() {
        let doms = Dominators::compute(&graph(0, &[]));
        assert_eq!(doms.node_count(), 0);
        assert!(doms.dominators_of(n(0)).is_empty());
        assert!(!doms.dominates(n(0), n(0)));
        assert_eq!(doms.immediate_dominator(n(0)), None);
    }

    #[test]
    fn test_diamond() {
        //     0
        //    / \
        //   1   2
        //    \ /
        //     3
        let doms = Dominators::compute(&graph(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]));

        assert!(doms.dominates(n(0), n(3)));
        assert!(!doms.dominates(n(1), n(3)));
        assert!(!doms.dominates(n(2), n(3)));
        assert_eq!(doms.immediate_dominator(n(3)), Some(n(0)));
        assert_eq!(doms.immediate_dominator(n(1)), Some(n(0)));
        assert_eq!(doms.immediate_dominator(n(0)), None);
        assert_eq!(doms.children(n(0)), vec![n(1), n(2), n(3)]);
        assert_eq!(doms.depth(n(3)), 1);
    }

    #[test]
    fn test_chain_idom_is_closest() {
        let doms = Dominators::compute(&graph(4, &[(0, 1), (1, 2), (2, 3)]));

        assert_eq!(doms.immediate_dominator(n(3)), Some(n(2)));
        assert_eq!(doms.dominators_of(n(3)), vec![n(0), n(1), n(2), n(3)]);
        assert_eq!(doms.depth(n(3)), 3);
        assert!(doms.strictly_dominates(n(1), n(3)));
        assert!(!doms.strictly_dominates(n(3), n(3)));
    }

    #[test]
    fn test_unreachable_is_not_dominated() {
        // 2 is unreachable but has an edge into the loop
        let doms = Dominators::compute(&graph(3, &[(0, 1), (2, 1)]));

        assert!(!doms.is_reachable(n(2)));
        assert!(doms.dominates(n(2), n(2)));
        assert!(!doms.dominates(n(0), n(2)));
        assert!(!doms.dominates(n(1), n(2)));
        assert_eq!(doms.dominators_of(n(2)), vec![n(2)]);
        assert_eq!(doms.immediate_dominator(n(2)), None);

        // The unreachable predecessor does not weaken dominance of 1
        assert_eq!(doms.immediate_dominator(n(1)), Some(n(0)));
    }

    #[test]
    fn test_every_reachable_block_dominated_by_entry() {
        let g = graph(6, &[(0, 1), (1, 2), (2, 1), (1, 3), (3, 4), (4, 3), (3, 5)]);
        let doms = Dominators::compute(&g);

        for node in g.node_ids() {
            assert!(doms.dominates(n(0), node));
            assert!(doms.dominates(node, node));
        }
        assert!(doms.rounds() >= 1);
    }
}
