//! Data flow analysis framework trait, direction and results.
//!
//! Any concrete analysis (reaching definitions, liveness, constant propagation)
//! implements [`DataFlowAnalysis`]: it names a lattice, a direction, a seed value and a
//! per-instruction transfer function. The solver in [`super::solver`] owns iteration and
//! produces an [`AnalysisResults`].

use std::fmt::Write;

use strum::{Display, EnumIter, IntoStaticStr};

use crate::{
    analysis::{
        cfg::ControlFlowGraph,
        dataflow::{lattice::MeetSemiLattice, Strategy},
    },
    ir::{InstrId, Instruction},
    utils::graph::NodeId,
};

/// Direction of data flow analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    /// Information flows from entry to exit.
    ///
    /// A block's `in` is the meet of its predecessors' `out`, and instructions are
    /// visited first to last.
    ///
    /// Examples: reaching definitions, constant propagation.
    Forward,

    /// Information flows from exit to entry.
    ///
    /// A block's `out` is the meet of its successors' `in`, and instructions are visited
    /// last to first.
    ///
    /// Examples: live variables.
    Backward,
}

/// A data flow analysis over a [`ControlFlowGraph`].
///
/// Implementations supply the lattice and the local semantics; the solver handles
/// scheduling and convergence.
///
/// # Contract
///
/// - `initial_value` seeds every block and instruction. It must be the identity of
///   `meet`, so that merging with a not-yet-computed neighbour changes nothing.
/// - `meet` must be commutative, associative and idempotent.
/// - `transfer` must be pure and monotone. A non-monotone transfer function may keep
///   the solver from converging, which is reported as
///   [`Error::NonConvergence`](crate::Error::NonConvergence).
///
/// # Examples
///
/// A forward analysis collecting every variable that may have been assigned:
///
/// ```rust
/// use flowscope::prelude::*;
/// use flowscope::utils::BitSet;
///
/// struct Assigned;
///
/// impl DataFlowAnalysis for Assigned {
///     type Lattice = BitSet;
///     const DIRECTION: Direction = Direction::Forward;
///
///     fn initial_value(&self) -> BitSet {
///         BitSet::new(0)
///     }
///
///     fn transfer(&self, instr: &Instruction, input: &BitSet) -> BitSet {
///         let mut out = input.clone();
///         if let Some(var) = instr.def() {
///             out.insert(var.index());
///         }
///         out
///     }
/// }
///
/// let mut b = CfgBuilder::new();
/// let b0 = b.add_block();
/// let x = b.var("x");
/// b.assign(b0, x, 1);
/// let cfg = b.build()?;
///
/// let results = DataFlowSolver::new(Assigned).solve(&cfg)?;
/// assert!(results.out_state(b0).contains(x.index()));
/// # Ok::<(), flowscope::Error>(())
/// ```
pub trait DataFlowAnalysis {
    /// The lattice of facts attached to each program point.
    type Lattice: MeetSemiLattice;

    /// The direction in which facts propagate.
    const DIRECTION: Direction;

    /// Returns `true` for forward analyses.
    fn is_forward(&self) -> bool {
        Self::DIRECTION == Direction::Forward
    }

    /// The seed value of every program point, and the answer for unknown keys.
    fn initial_value(&self) -> Self::Lattice;

    /// Combines facts from two merging paths. Defaults to the lattice's meet.
    fn meet(&self, a: &Self::Lattice, b: &Self::Lattice) -> Self::Lattice {
        a.meet(b)
    }

    /// The local effect of one instruction.
    ///
    /// For forward analyses `input` is the fact before the instruction and the result
    /// the fact after it; for backward analyses it is the other way round.
    fn transfer(&self, instr: &Instruction, input: &Self::Lattice) -> Self::Lattice;

    /// A short name used in logs and errors.
    fn name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

impl<A: DataFlowAnalysis + ?Sized> DataFlowAnalysis for &A {
    type Lattice = A::Lattice;
    const DIRECTION: Direction = A::DIRECTION;

    fn initial_value(&self) -> Self::Lattice {
        (**self).initial_value()
    }

    fn meet(&self, a: &Self::Lattice, b: &Self::Lattice) -> Self::Lattice {
        (**self).meet(a, b)
    }

    fn transfer(&self, instr: &Instruction, input: &Self::Lattice) -> Self::Lattice {
        (**self).transfer(instr, input)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// The fixpoint of one analysis run.
///
/// Facts are stored densely by block id and instruction id. Every query is total:
/// asking about a block or instruction the graph does not contain returns the
/// analysis's initial value.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResults<L> {
    pub(crate) initial: L,
    pub(crate) block_in: Vec<L>,
    pub(crate) block_out: Vec<L>,
    pub(crate) instr_in: Vec<L>,
    pub(crate) instr_out: Vec<L>,
    pub(crate) direction: Direction,
    pub(crate) strategy: Strategy,
    pub(crate) iterations: usize,
}

impl<L> AnalysisResults<L> {
    /// The fact at the entry of `block`.
    #[must_use]
    pub fn in_state(&self, block: NodeId) -> &L {
        self.block_in.get(block.index()).unwrap_or(&self.initial)
    }

    /// The fact at the exit of `block`.
    #[must_use]
    pub fn out_state(&self, block: NodeId) -> &L {
        self.block_out.get(block.index()).unwrap_or(&self.initial)
    }

    /// The fact immediately before `instr` executes.
    #[must_use]
    pub fn instr_in(&self, instr: InstrId) -> &L {
        self.instr_in.get(instr.index()).unwrap_or(&self.initial)
    }

    /// The fact immediately after `instr` executes.
    #[must_use]
    pub fn instr_out(&self, instr: InstrId) -> &L {
        self.instr_out.get(instr.index()).unwrap_or(&self.initial)
    }

    /// The initial value of the analysis, which unknown keys resolve to.
    #[must_use]
    pub fn initial_value(&self) -> &L {
        &self.initial
    }

    /// Number of blocks covered.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.block_in.len()
    }

    /// Direction of the analysis that produced these facts.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The strategy that reached the fixpoint.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Sweeps (naive) or block visits (worklist) needed to reach the fixpoint.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Returns `true` if both runs reached the same facts at every program point,
    /// regardless of how they got there.
    #[must_use]
    pub fn same_facts(&self, other: &Self) -> bool
    where
        L: PartialEq,
    {
        self.block_in == other.block_in
            && self.block_out == other.block_out
            && self.instr_in == other.instr_in
            && self.instr_out == other.instr_out
    }

    /// Renders a human-readable dump of the facts of every block and instruction.
    ///
    /// `render` formats one fact; use it to print variable names instead of indices.
    ///
    /// ```text
    /// == live variables ==
    /// B0
    ///   in:  {}
    ///     i0: x = 1    {x}
    ///   out: {x}
    /// ```
    #[must_use]
    pub fn report(
        &self,
        cfg: &ControlFlowGraph,
        title: &str,
        render: impl Fn(&L) -> String,
    ) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "== {title} ==");
        for block in cfg.blocks() {
            let _ = writeln!(out, "{}", block.id());
            let _ = writeln!(out, "  in:  {}", render(self.in_state(block.id())));
            for instr in block.instructions() {
                let fact = match self.direction {
                    Direction::Forward => self.instr_out(instr.id()),
                    Direction::Backward => self.instr_in(instr.id()),
                };
                let _ = writeln!(
                    out,
                    "    {}: {}    {}",
                    instr.id(),
                    instr.display(cfg),
                    render(fact)
                );
            }
            let _ = writeln!(out, "  out: {}", render(self.out_state(block.id())));
        }
        out
    }
}
