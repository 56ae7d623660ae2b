//! Node identifiers for graph structures.
//!
//! A [`NodeId`] is the dense index of a node in a graph. In a control-flow graph it is
//! the basic block id: the builder hands them out sequentially starting at `0`, which is
//! always the entry block. Because the ids are dense, per-block facts live in plain
//! vectors indexed by [`NodeId::index`] rather than in hash maps.

use std::fmt;

/// Dense identifier of a graph node (a basic block, in a control-flow graph).
///
/// `NodeId`s are ordered by creation, so iterating `0..node_count` visits blocks in
/// declaration order.
///
/// # Examples
///
/// ```rust
/// use flowscope::NodeId;
///
/// let block = NodeId::new(2);
/// assert_eq!(block.index(), 2);
/// assert_eq!(block.to_string(), "B2");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Creates a node identifier from a raw index.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Returns the raw index of this node.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

impl From<usize> for NodeId {
    #[inline]
    fn from(index: usize) -> Self {
        NodeId(index)
    }
}

impl From<NodeId> for usize {
    #[inline]
    fn from(node: NodeId) -> Self {
        node.0
    }
}
