//! The control-flow graph consumed by every analysis.

use std::{fmt::Write, sync::OnceLock};

use crate::{
    analysis::cfg::LoopAnalysis,
    ir::{InstrId, Instruction, VarId},
    utils::{
        escape_dot,
        graph::{algorithms::Dominators, GraphBase, NodeId, Predecessors, RootedGraph, Successors},
    },
};

/// A basic block: a straight-line run of instructions with a single entry and exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    pub(crate) id: NodeId,
    pub(crate) instructions: Vec<Instruction>,
}

impl BasicBlock {
    /// The id of this block within its graph.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The instructions of this block, in execution order.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// The final instruction, if the block is not empty.
    #[must_use]
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last()
    }

    /// Number of instructions in the block.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` if the block has no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// A control-flow graph over [`BasicBlock`]s.
///
/// Blocks are stored densely and addressed by [`NodeId`]; block `0` is the entry. Exits
/// are the blocks without successors. Adjacency is stored in both directions so forward
/// and backward analyses walk it equally cheaply.
///
/// The graph is immutable once built. It is `Sync`, so any number of analyses may read
/// one graph concurrently. Dominance and loop information are computed lazily on first
/// access and cached, using [`OnceLock`] for thread-safe initialization.
///
/// Every query is total: unknown block ids have no neighbours and no instructions.
///
/// # Examples
///
/// ```rust
/// use flowscope::prelude::*;
///
/// let mut builder = CfgBuilder::new();
/// let entry = builder.add_block();
/// let exit = builder.add_block();
/// let x = builder.var("x");
/// builder.assign(entry, x, 1);
/// builder.ret(exit, Some(x.into()));
/// builder.add_edge(entry, exit);
/// let cfg = builder.build()?;
///
/// assert_eq!(cfg.block_count(), 2);
/// assert_eq!(cfg.exits(), &[exit]);
/// assert_eq!(cfg.predecessors(exit).collect::<Vec<_>>(), vec![entry]);
/// # Ok::<(), flowscope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    blocks: Vec<BasicBlock>,
    successors: Vec<Vec<NodeId>>,
    predecessors: Vec<Vec<NodeId>>,
    exits: Vec<NodeId>,
    variables: Vec<String>,
    instruction_count: usize,
    /// Lazily computed dominance and loop information.
    loops: OnceLock<LoopAnalysis>,
}

impl ControlFlowGraph {
    pub(crate) fn from_parts(
        blocks: Vec<BasicBlock>,
        successors: Vec<Vec<NodeId>>,
        predecessors: Vec<Vec<NodeId>>,
        variables: Vec<String>,
    ) -> Self {
        let exits = successors
            .iter()
            .enumerate()
            .filter(|(_, succs)| succs.is_empty())
            .map(|(index, _)| NodeId::new(index))
            .collect();
        let instruction_count = blocks.iter().map(BasicBlock::len).sum();

        ControlFlowGraph {
            blocks,
            successors,
            predecessors,
            exits,
            variables,
            instruction_count,
            loops: OnceLock::new(),
        }
    }

    /// The entry block. Only meaningful when the graph is not empty.
    #[must_use]
    pub fn entry(&self) -> NodeId {
        NodeId::new(0)
    }

    /// Blocks without successors.
    #[must_use]
    pub fn exits(&self) -> &[NodeId] {
        &self.exits
    }

    /// Number of basic blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if the graph has no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Looks up a block by id.
    #[must_use]
    pub fn block(&self, id: NodeId) -> Option<&BasicBlock> {
        self.blocks.get(id.index())
    }

    /// All blocks in declaration order.
    pub fn blocks(&self) -> impl DoubleEndedIterator<Item = &BasicBlock> + ExactSizeIterator + '_ {
        self.blocks.iter()
    }

    /// Successor ids of `id`, in edge insertion order.
    pub fn successors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.successors
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .copied()
    }

    /// Predecessor ids of `id`, in edge insertion order.
    pub fn predecessors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.predecessors
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .copied()
    }

    /// Every edge as a `(source, target)` pair, grouped by source in block order.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.successors.iter().enumerate().flat_map(|(index, succs)| {
            succs.iter().map(move |&succ| (NodeId::new(index), succ))
        })
    }

    /// Total number of instructions. Instruction ids are dense in `0..instruction_count()`.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.instruction_count
    }

    /// All instructions, in block order then execution order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> + '_ {
        self.blocks.iter().flat_map(|block| block.instructions.iter())
    }

    /// Finds the block holding `instr` and its index within that block.
    #[must_use]
    pub fn locate(&self, instr: InstrId) -> Option<(NodeId, usize)> {
        self.blocks.iter().find_map(|block| {
            block
                .instructions
                .iter()
                .position(|candidate| candidate.id() == instr)
                .map(|index| (block.id, index))
        })
    }

    /// Number of distinct variables. Variable ids are dense in `0..variable_count()`.
    #[must_use]
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// The source name of `var`, or `"?"` for unknown ids.
    #[must_use]
    pub fn variable_name(&self, var: VarId) -> &str {
        self.variables.get(var.index()).map_or("?", String::as_str)
    }

    /// Looks up a variable by name.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<VarId> {
        self.variables
            .iter()
            .position(|candidate| candidate == name)
            .map(VarId::new)
    }

    /// The dominance relation, computed on first access.
    #[must_use]
    pub fn dominators(&self) -> &Dominators {
        self.loops().dominators()
    }

    /// Loop information, computed on first access.
    #[must_use]
    pub fn loops(&self) -> &LoopAnalysis {
        self.loops.get_or_init(|| LoopAnalysis::analyze(self))
    }

    /// Returns `true` if `dominator` dominates `dominated`.
    #[must_use]
    pub fn dominates(&self, dominator: NodeId, dominated: NodeId) -> bool {
        self.dominators().dominates(dominator, dominated)
    }

    /// Returns `true` if the graph contains at least one natural loop.
    #[must_use]
    pub fn has_loops(&self) -> bool {
        !self.loops().is_empty()
    }

    /// Renders the graph as text: one header per block, followed by its instructions.
    ///
    /// ```text
    /// B0 -> [B1]
    ///     i0: x = 1
    /// ```
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            let succs: Vec<String> = self.successors(block.id).map(|s| s.to_string()).collect();
            let _ = writeln!(out, "{} -> [{}]", block.id, succs.join(", "));
            for instr in &block.instructions {
                let _ = writeln!(out, "    {}: {}", instr.id(), instr.display(self));
            }
        }
        out
    }

    /// Renders the graph in Graphviz DOT format.
    ///
    /// The entry is filled green and exits red. Loop headers get a bold outline and
    /// back edges are dashed.
    ///
    /// ```rust
    /// use flowscope::prelude::*;
    ///
    /// let mut b = CfgBuilder::new();
    /// let b0 = b.add_block();
    /// let b1 = b.add_block();
    /// b.add_edge(b0, b1).add_edge(b1, b1);
    /// let cfg = b.build()?;
    ///
    /// let dot = cfg.to_dot(Some("spin"));
    /// assert!(dot.contains("B1 -> B1 [style=dashed];"));
    /// # Ok::<(), flowscope::Error>(())
    /// ```
    #[must_use]
    pub fn to_dot(&self, title: Option<&str>) -> String {
        let loops = self.loops();
        let mut dot = String::new();

        dot.push_str("digraph CFG {\n");
        if let Some(name) = title {
            let _ = writeln!(dot, "    label=\"CFG: {}\";", escape_dot(name));
        }
        dot.push_str("    labelloc=t;\n");
        dot.push_str("    node [shape=box, fontname=\"Courier\", fontsize=10];\n\n");

        for block in &self.blocks {
            let is_entry = block.id == self.entry();
            let is_exit = self.exits.contains(&block.id);

            let mut label = block.id.to_string();
            if is_entry {
                label.push_str(" (entry)");
            }
            if is_exit {
                label.push_str(" (exit)");
            }
            label.push_str("\\l");
            for instr in &block.instructions {
                let text = instr.display(self).to_string();
                let _ = write!(label, "{}: {}\\l", instr.id(), escape_dot(&text));
            }

            let mut style = Vec::new();
            if is_entry {
                style.push("style=filled, fillcolor=lightgreen");
            } else if is_exit {
                style.push("style=filled, fillcolor=lightcoral");
            }
            if loops.is_loop_header(block.id) {
                style.push("penwidth=2");
            }
            let style = if style.is_empty() {
                String::new()
            } else {
                format!(", {}", style.join(", "))
            };
            let _ = writeln!(dot, "    {} [label=\"{label}\"{style}];", block.id);
        }

        dot.push('\n');
        for (from, to) in self.edges() {
            if loops.back_edges().contains(&(from, to)) {
                let _ = writeln!(dot, "    {from} -> {to} [style=dashed];");
            } else {
                let _ = writeln!(dot, "    {from} -> {to};");
            }
        }
        dot.push_str("}\n");
        dot
    }
}

impl GraphBase for ControlFlowGraph {
    fn node_count(&self) -> usize {
        self.blocks.len()
    }
}

impl Successors for ControlFlowGraph {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        ControlFlowGraph::successors(self, node)
    }
}

impl Predecessors for ControlFlowGraph {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        ControlFlowGraph::predecessors(self, node)
    }
}

impl RootedGraph for ControlFlowGraph {
    fn entry(&self) -> NodeId {
        ControlFlowGraph::entry(self)
    }
}
