//! Back-edge detection and natural-loop construction.
//!
//! A **back edge** is an edge `source -> header` where `header` dominates `source`. The
//! **natural loop** of a back edge is `header` plus every block that can reach `source`
//! without passing through `header`. Back edges sharing a header describe the same loop,
//! so they are merged into one [`NaturalLoop`] with several back-edge sources. Two
//! back edges into the same header therefore yield one loop, not an inner and an outer
//! one: [`LoopAnalysis::loops_containing`] reports it once and
//! [`LoopAnalysis::outermost_loops`] treats it as a single top-level loop.
//!
//! # Algorithm
//!
//! 1. Compute the dominance relation ([`Dominators`]).
//! 2. For every edge whose source is reachable from the entry, test whether the target
//!    dominates the source. Edges out of unreachable blocks are never back edges, since
//!    nothing has been proven about their dominators.
//! 3. For each back edge, seed the body with the header and walk predecessors backwards
//!    from the source, never expanding the header itself. Unreachable predecessors are
//!    left out, so every body block is dominated by its header.
//! 4. Derive nesting: a loop's parent is the smallest other loop whose body contains its
//!    header.
//!
//! Bodies only grow during construction. Once [`LoopAnalysis::analyze`] returns, every
//! loop is immutable.
//!
//! # Examples
//!
//! ```rust
//! use flowscope::prelude::*;
//!
//! // B0 -> B1 -> B2 -> B1, B1 -> B3
//! let mut b = CfgBuilder::new();
//! let (b0, b1, b2, b3) = (b.add_block(), b.add_block(), b.add_block(), b.add_block());
//! b.add_edge(b0, b1).add_edge(b1, b2).add_edge(b2, b1).add_edge(b1, b3);
//! let cfg = b.build()?;
//!
//! let loops = LoopAnalysis::analyze(&cfg);
//! assert_eq!(loops.len(), 1);
//! assert!(loops.is_loop_header(b1));
//!
//! let inner = &loops.loops()[0];
//! assert_eq!(inner.body().iter().copied().collect::<Vec<_>>(), vec![b1, b2]);
//! assert_eq!(inner.back_edge_sources().iter().copied().collect::<Vec<_>>(), vec![b2]);
//! assert_eq!(inner.exit_blocks(), vec![b3]);
//! # Ok::<(), flowscope::Error>(())
//! ```

use std::collections::BTreeSet;

use tracing::debug;

use crate::utils::graph::{algorithms::Dominators, NodeId, Predecessors, RootedGraph, Successors};

/// A natural loop: a header, its body and the sources of its back edges.
///
/// Invariant: the header dominates every block of the body, and the body contains the
/// header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaturalLoop {
    header: NodeId,
    body: BTreeSet<NodeId>,
    back_edge_sources: BTreeSet<NodeId>,
    exits: BTreeSet<NodeId>,
    preheader: Option<NodeId>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    depth: usize,
}

impl NaturalLoop {
    fn new(header: NodeId) -> Self {
        NaturalLoop {
            header,
            body: BTreeSet::from([header]),
            back_edge_sources: BTreeSet::new(),
            exits: BTreeSet::new(),
            preheader: None,
            parent: None,
            children: Vec::new(),
            depth: 1,
        }
    }

    /// The loop header, the single entry of the loop.
    #[must_use]
    pub fn header(&self) -> NodeId {
        self.header
    }

    /// All member blocks, header included, in ascending id order.
    #[must_use]
    pub fn body(&self) -> &BTreeSet<NodeId> {
        &self.body
    }

    /// Sources of the back edges into the header (the latches).
    #[must_use]
    pub fn back_edge_sources(&self) -> &BTreeSet<NodeId> {
        &self.back_edge_sources
    }

    /// Returns `true` if `block` is a member of the loop.
    #[must_use]
    pub fn contains(&self, block: NodeId) -> bool {
        self.body.contains(&block)
    }

    /// Number of member blocks.
    #[must_use]
    pub fn size(&self) -> usize {
        self.body.len()
    }

    /// Returns `true` for a single block that branches to itself.
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.body.len() == 1 && self.back_edge_sources.contains(&self.header)
    }

    /// Blocks outside the loop that some member jumps to, in ascending id order.
    #[must_use]
    pub fn exit_blocks(&self) -> Vec<NodeId> {
        self.exits.iter().copied().collect()
    }

    /// The unique predecessor of the header outside the loop, if there is exactly one.
    #[must_use]
    pub fn preheader(&self) -> Option<NodeId> {
        self.preheader
    }

    /// Header of the smallest enclosing loop.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Headers of the loops immediately nested in this one.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Nesting depth: `1` for a loop with no enclosing loop.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns `true` if no other loop is nested inside this one.
    #[must_use]
    pub fn is_innermost(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns `true` if this loop is not nested inside another.
    #[must_use]
    pub fn is_outermost(&self) -> bool {
        self.parent.is_none()
    }
}

/// Dominance relation plus every natural loop of a graph.
#[derive(Debug, Clone, Default)]
pub struct LoopAnalysis {
    dominators: Dominators,
    loops: Vec<NaturalLoop>,
    back_edges: Vec<(NodeId, NodeId)>,
    block_count: usize,
}

impl LoopAnalysis {
    /// Computes dominators and natural loops for `graph`.
    ///
    /// The result is deterministic: loops are ordered by header id and bodies are sorted.
    #[must_use]
    pub fn analyze<G>(graph: &G) -> Self
    where
        G: RootedGraph + Successors + Predecessors,
    {
        let dominators = Dominators::compute(graph);

        let mut back_edges = Vec::new();
        let mut loops: Vec<NaturalLoop> = Vec::new();
        for source in graph.node_ids() {
            if !dominators.is_reachable(source) {
                continue;
            }
            for target in graph.successors(source) {
                if !dominators.dominates(target, source) {
                    continue;
                }
                back_edges.push((source, target));

                let index = match loops.iter().position(|l| l.header == target) {
                    Some(index) => index,
                    None => {
                        loops.push(NaturalLoop::new(target));
                        loops.len() - 1
                    }
                };
                let natural = &mut loops[index];
                natural.back_edge_sources.insert(source);
                expand_loop_body(graph, &dominators, natural, source);
            }
        }

        for natural in &mut loops {
            compute_exits(graph, natural);
            compute_preheader(graph, natural);
        }
        loops.sort_by_key(|l| l.header);
        compute_nesting(&mut loops);

        debug!(
            blocks = graph.node_count(),
            back_edges = back_edges.len(),
            loops = loops.len(),
            "loop analysis finished"
        );

        LoopAnalysis {
            dominators,
            loops,
            back_edges,
            block_count: graph.node_count(),
        }
    }

    /// The dominance relation the loops were derived from.
    #[must_use]
    pub fn dominators(&self) -> &Dominators {
        &self.dominators
    }

    /// All loops, ordered by header id.
    #[must_use]
    pub fn loops(&self) -> &[NaturalLoop] {
        &self.loops
    }

    /// Number of loops.
    #[must_use]
    pub fn len(&self) -> usize {
        self.loops.len()
    }

    /// Returns `true` if the graph has no loops.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Every back edge as `(source, header)`, in source-block order.
    #[must_use]
    pub fn back_edges(&self) -> &[(NodeId, NodeId)] {
        &self.back_edges
    }

    /// Returns `true` if `block` is the header of some loop.
    #[must_use]
    pub fn is_loop_header(&self, block: NodeId) -> bool {
        self.loop_for_header(block).is_some()
    }

    /// The loop headed by `header`.
    #[must_use]
    pub fn loop_for_header(&self, header: NodeId) -> Option<&NaturalLoop> {
        self.loops.iter().find(|l| l.header == header)
    }

    /// Every loop whose body contains `block`, outermost first.
    #[must_use]
    pub fn loops_containing(&self, block: NodeId) -> Vec<&NaturalLoop> {
        let mut containing: Vec<&NaturalLoop> =
            self.loops.iter().filter(|l| l.contains(block)).collect();
        containing.sort_by_key(|l| (l.depth, l.header));
        containing
    }

    /// The smallest loop containing `block`.
    #[must_use]
    pub fn innermost_loop(&self, block: NodeId) -> Option<&NaturalLoop> {
        self.loops
            .iter()
            .filter(|l| l.contains(block))
            .min_by_key(|l| (l.size(), std::cmp::Reverse(l.depth)))
    }

    /// Number of loops containing `block`; `0` outside any loop.
    #[must_use]
    pub fn loop_depth(&self, block: NodeId) -> usize {
        self.loops.iter().filter(|l| l.contains(block)).count()
    }

    /// Loops whose body is not a strict subset of another loop's body.
    #[must_use]
    pub fn outermost_loops(&self) -> Vec<&NaturalLoop> {
        self.loops
            .iter()
            .filter(|candidate| {
                !self.loops.iter().any(|other| {
                    other.body.len() > candidate.body.len()
                        && candidate.body.is_subset(&other.body)
                })
            })
            .collect()
    }

    /// The loops immediately nested in the loop headed by `header`.
    #[must_use]
    pub fn children(&self, header: NodeId) -> Vec<&NaturalLoop> {
        self.loop_for_header(header)
            .map(|parent| {
                parent
                    .children
                    .iter()
                    .filter_map(|&child| self.loop_for_header(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of blocks in the analysed graph.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.block_count
    }
}

/// Adds to `natural` every block that reaches `source` without passing through the header.
fn expand_loop_body<G>(graph: &G, dominators: &Dominators, natural: &mut NaturalLoop, source: NodeId)
where
    G: Predecessors,
{
    let mut worklist = vec![source];
    while let Some(block) = worklist.pop() {
        // The header is seeded up front, so it stops the walk here
        if natural.body.insert(block) {
            worklist.extend(
                graph
                    .predecessors(block)
                    .filter(|&pred| dominators.is_reachable(pred)),
            );
        }
    }
}

fn compute_exits<G>(graph: &G, natural: &mut NaturalLoop)
where
    G: Successors,
{
    for &block in &natural.body {
        for succ in graph.successors(block) {
            if !natural.body.contains(&succ) {
                natural.exits.insert(succ);
            }
        }
    }
}

fn compute_preheader<G>(graph: &G, natural: &mut NaturalLoop)
where
    G: Predecessors,
{
    let mut outside = graph
        .predecessors(natural.header)
        .filter(|pred| !natural.body.contains(pred));
    natural.preheader = match (outside.next(), outside.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    };
}

fn compute_nesting(loops: &mut [NaturalLoop]) {
    let count = loops.len();

    for i in 0..count {
        let header = loops[i].header;
        let parent = (0..count)
            .filter(|&j| j != i && loops[j].body.contains(&header))
            .min_by_key(|&j| loops[j].size())
            .map(|j| loops[j].header);
        loops[i].parent = parent;
    }

    for i in 0..count {
        if let Some(parent) = loops[i].parent {
            let child = loops[i].header;
            if let Some(owner) = loops.iter_mut().find(|l| l.header == parent) {
                owner.children.push(child);
            }
        }
    }

    for i in 0..count {
        let mut depth = 1;
        let mut current = loops[i].parent;
        while let Some(parent) = current {
            if depth > count {
                break;
            }
            depth += 1;
            current = loops.iter().find(|l| l.header == parent).and_then(|l| l.parent);
        }
        loops[i].depth = depth;
    }
}
