//! Incremental construction of a [`ControlFlowGraph`].

use std::collections::{HashMap, HashSet};

use crate::{
    analysis::cfg::{BasicBlock, ControlFlowGraph},
    ir::{Expr, InstrId, InstrKind, Instruction, Operand, VarId},
    utils::graph::NodeId,
    Result,
};

/// Builds a [`ControlFlowGraph`] block by block.
///
/// The builder is the producer side of the graph contract: it hands out dense block,
/// variable and instruction ids so that analyses can store facts in plain vectors.
/// Instruction ids are assigned at [`build`](Self::build) time in block order, then
/// execution order.
///
/// Mistakes such as adding an edge to a block that was never created are recorded and
/// reported by `build`, so construction code can stay free of error plumbing.
///
/// # Examples
///
/// ```rust
/// use flowscope::prelude::*;
///
/// // if (c) { x = 1 } else { x = 2 }; return x
/// let mut b = CfgBuilder::new();
/// let (entry, then, other, join) = (b.add_block(), b.add_block(), b.add_block(), b.add_block());
/// let c = b.var("c");
/// let x = b.var("x");
/// b.branch(entry, c);
/// b.assign(then, x, 1).jump(then);
/// b.assign(other, x, 2).jump(other);
/// b.ret(join, Some(x.into()));
/// b.add_edge(entry, then).add_edge(entry, other);
/// b.add_edge(then, join).add_edge(other, join);
///
/// let cfg = b.build()?;
/// assert_eq!(cfg.instruction_count(), 6);
/// # Ok::<(), flowscope::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct CfgBuilder {
    blocks: Vec<Vec<InstrKind>>,
    edges: Vec<(NodeId, NodeId)>,
    variables: Vec<String>,
    variable_ids: HashMap<String, VarId>,
    problems: Vec<String>,
}

impl CfgBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new, empty block and returns its id. The first block is the entry.
    pub fn add_block(&mut self) -> NodeId {
        self.blocks.push(Vec::new());
        NodeId::new(self.blocks.len() - 1)
    }

    /// Interns a variable name. Asking twice for the same name returns the same id.
    pub fn var(&mut self, name: &str) -> VarId {
        if let Some(&id) = self.variable_ids.get(name) {
            return id;
        }
        let id = VarId::new(self.variables.len());
        self.variables.push(name.to_string());
        self.variable_ids.insert(name.to_string(), id);
        id
    }

    /// Appends an instruction of any shape to `block`.
    pub fn push(&mut self, block: NodeId, kind: InstrKind) -> &mut Self {
        match self.blocks.get_mut(block.index()) {
            Some(instructions) => instructions.push(kind),
            None => self
                .problems
                .push(format!("instruction added to unknown block {block}")),
        }
        self
    }

    /// Appends `dest = value` to `block`.
    pub fn assign(&mut self, block: NodeId, dest: VarId, value: impl Into<Expr>) -> &mut Self {
        self.push(
            block,
            InstrKind::Assign {
                dest,
                value: value.into(),
            },
        )
    }

    /// Appends a call to `callee` with `args` arguments.
    pub fn call(&mut self, block: NodeId, callee: &str, args: usize) -> &mut Self {
        self.push(
            block,
            InstrKind::Call {
                callee: callee.to_string(),
                args,
            },
        )
    }

    /// Appends a conditional branch on `cond`.
    pub fn branch(&mut self, block: NodeId, cond: impl Into<Operand>) -> &mut Self {
        self.push(block, InstrKind::Branch { cond: cond.into() })
    }

    /// Appends an unconditional jump.
    pub fn jump(&mut self, block: NodeId) -> &mut Self {
        self.push(block, InstrKind::Jump)
    }

    /// Appends a return, optionally with a value.
    pub fn ret(&mut self, block: NodeId, value: Option<Operand>) -> &mut Self {
        self.push(block, InstrKind::Return { value })
    }

    /// Adds the edge `from -> to`. Duplicate edges are kept only once, in the order of
    /// their first insertion.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> &mut Self {
        self.edges.push((from, to));
        self
    }

    /// Finishes the graph.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if an edge or an instruction referenced a block
    /// that does not exist.
    pub fn build(self) -> Result<ControlFlowGraph> {
        if let Some(problem) = self.problems.first() {
            return Err(malformed_error!("{}", problem));
        }

        let block_count = self.blocks.len();
        let mut successors = vec![Vec::new(); block_count];
        let mut predecessors = vec![Vec::new(); block_count];
        let mut seen = HashSet::with_capacity(self.edges.len());
        for (from, to) in self.edges {
            if !seen.insert((from, to)) {
                continue;
            }
            if from.index() >= block_count || to.index() >= block_count {
                return Err(malformed_error!(
                    "edge {} -> {} references a block outside 0..{}",
                    from,
                    to,
                    block_count
                ));
            }
            successors[from.index()].push(to);
            predecessors[to.index()].push(from);
        }

        let mut next_id = 0;
        let blocks = self
            .blocks
            .into_iter()
            .enumerate()
            .map(|(index, kinds)| BasicBlock {
                id: NodeId::new(index),
                instructions: kinds
                    .into_iter()
                    .map(|kind| {
                        let instr = Instruction::new(InstrId::new(next_id), kind);
                        next_id += 1;
                        instr
                    })
                    .collect(),
            })
            .collect();

        Ok(ControlFlowGraph::from_parts(
            blocks,
            successors,
            predecessors,
            self.variables,
        ))
    }
}
