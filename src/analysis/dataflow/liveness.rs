//! Live variable analysis.
//!
//! A variable is live at a program point if its current value may be read on some path
//! from that point before being overwritten. Liveness drives dead-store detection and
//! register allocation.
//!
//! # Algorithm
//!
//! Liveness is a backward analysis. Per instruction:
//!
//! - `GEN` = variables read by the instruction
//! - `KILL` = the variable written by the instruction
//! - `IN` = `GEN ∪ (OUT - KILL)`
//!
//! Meet is union: a variable is live after a block if it is live at the entry of any
//! successor. Literals are never live.

use crate::{
    analysis::{
        cfg::ControlFlowGraph,
        dataflow::{
            framework::{AnalysisResults, DataFlowAnalysis, Direction},
            lattice::MeetSemiLattice,
        },
    },
    ir::{InstrId, Instruction, VarId},
    utils::BitSet,
};

/// Live variable analysis.
///
/// # Example
///
/// ```rust
/// use flowscope::prelude::*;
///
/// // x = 1; x = 2; return x
/// let mut b = CfgBuilder::new();
/// let b0 = b.add_block();
/// let x = b.var("x");
/// b.assign(b0, x, 1).assign(b0, x, 2).ret(b0, Some(x.into()));
/// let cfg = b.build()?;
///
/// let results = DataFlowSolver::new(LiveVariables::new(&cfg)).solve(&cfg)?;
/// let first = cfg.block(b0).unwrap().instructions()[0].id();
///
/// // The first store is dead: x is overwritten before it is read
/// assert!(!results.instr_out(first).is_live(x));
/// # Ok::<(), flowscope::Error>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LiveVariables {
    num_vars: usize,
}

impl LiveVariables {
    /// Creates a liveness analysis for the variables of `cfg`.
    #[must_use]
    pub fn new(cfg: &ControlFlowGraph) -> Self {
        Self {
            num_vars: cfg.variable_count(),
        }
    }

    /// Returns the number of variables being tracked.
    #[must_use]
    pub const fn num_variables(&self) -> usize {
        self.num_vars
    }

    /// Variables read by `instr`.
    #[must_use]
    pub fn gen(&self, instr: &Instruction) -> BitSet {
        BitSet::from_indices(self.num_vars, instr.uses().map(VarId::index))
    }

    /// The variable written by `instr`, as a set.
    #[must_use]
    pub fn kill(&self, instr: &Instruction) -> BitSet {
        BitSet::from_indices(self.num_vars, instr.def().map(VarId::index))
    }

    /// Variables live immediately after `instr`.
    #[must_use]
    pub fn live_after<'r>(
        &self,
        results: &'r AnalysisResults<LivenessResult>,
        instr: InstrId,
    ) -> &'r LivenessResult {
        results.instr_out(instr)
    }

    /// Variables live immediately before `instr`.
    #[must_use]
    pub fn live_before<'r>(
        &self,
        results: &'r AnalysisResults<LivenessResult>,
        instr: InstrId,
    ) -> &'r LivenessResult {
        results.instr_in(instr)
    }

    /// Renders per-block facts with variable names.
    #[must_use]
    pub fn report(&self, cfg: &ControlFlowGraph, results: &AnalysisResults<LivenessResult>) -> String {
        results.report(cfg, "live variables", |fact| {
            let names: Vec<&str> = fact.variables().map(|v| cfg.variable_name(v)).collect();
            format!("{{{}}}", names.join(", "))
        })
    }
}

impl DataFlowAnalysis for LiveVariables {
    type Lattice = LivenessResult;
    const DIRECTION: Direction = Direction::Backward;

    fn initial_value(&self) -> Self::Lattice {
        LivenessResult::new(self.num_vars)
    }

    fn transfer(&self, instr: &Instruction, input: &Self::Lattice) -> Self::Lattice {
        let mut live = input.live.clone();
        if let Some(def) = instr.def() {
            live.remove(def.index());
        }
        for used in instr.uses() {
            live.insert(used.index());
        }
        LivenessResult { live }
    }
}

/// The set of variables live at one program point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LivenessResult {
    live: BitSet,
}

impl LivenessResult {
    /// Creates an empty set sized for `num_vars` variables.
    #[must_use]
    pub fn new(num_vars: usize) -> Self {
        Self {
            live: BitSet::new(num_vars),
        }
    }

    /// Returns `true` if `var` is live.
    #[must_use]
    pub fn is_live(&self, var: VarId) -> bool {
        self.live.contains(var.index())
    }

    /// Iterates over the live variables, in id order.
    pub fn variables(&self) -> impl Iterator<Item = VarId> + '_ {
        self.live.iter().map(VarId::new)
    }

    /// Number of live variables.
    #[must_use]
    pub fn count(&self) -> usize {
        self.live.count()
    }

    /// Returns `true` if no variable is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Marks `var` as live.
    pub fn add(&mut self, var: VarId) {
        self.live.insert(var.index());
    }

    /// The underlying bit set, indexed by [`VarId`].
    #[must_use]
    pub fn as_bitset(&self) -> &BitSet {
        &self.live
    }
}

impl MeetSemiLattice for LivenessResult {
    fn meet(&self, other: &Self) -> Self {
        Self {
            live: self.live.meet(&other.live),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{cfg::CfgBuilder, dataflow::DataFlowSolver},
        ir::{BinaryOp, Expr},
        utils::graph::NodeId,
    };

    #[test]
    fn test_liveness_meet() {
        let mut a = LivenessResult::new(4);
        let mut b = LivenessResult::new(4);
        a.add(VarId::new(0));
        b.add(VarId::new(3));

        let merged = a.meet(&b);
        assert_eq!(merged.variables().collect::<Vec<_>>(), vec![VarId::new(0), VarId::new(3)]);
    }

    #[test]
    fn test_gen_kill() {
        let mut b = CfgBuilder::new();
        let b0 = b.add_block();
        let x = b.var("x");
        let y = b.var("y");
        b.assign(b0, x, Expr::binary(BinaryOp::Add, x, y));
        let cfg = b.build().unwrap();

        let analysis = LiveVariables::new(&cfg);
        let instr = &cfg.block(b0).unwrap().instructions()[0];
        assert_eq!(analysis.gen(instr).iter().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(analysis.kill(instr).iter().collect::<Vec<_>>(), vec![0]);

        // x is both read and written: it stays live before the instruction
        let results = DataFlowSolver::new(analysis).solve(&cfg).unwrap();
        assert!(results.in_state(b0).is_live(x));
        assert!(results.in_state(b0).is_live(y));
        assert!(results.out_state(b0).is_empty());
    }

    #[test]
    fn test_liveness_across_loop() {
        // B0: i = 0 ; B1: br i ; B2: i = i - 1 ; B3: ret
        let mut b = CfgBuilder::new();
        let (b0, b1, b2, b3) = (b.add_block(), b.add_block(), b.add_block(), b.add_block());
        let i = b.var("i");
        let unused = b.var("unused");
        b.assign(b0, i, 10).assign(b0, unused, 1);
        b.branch(b1, i);
        b.assign(b2, i, Expr::binary(BinaryOp::Sub, i, 1));
        b.ret(b3, None);
        b.add_edge(b0, b1).add_edge(b1, b2).add_edge(b2, b1).add_edge(b1, b3);
        let cfg = b.build().unwrap();

        let analysis = LiveVariables::new(&cfg);
        let results = DataFlowSolver::new(&analysis).solve(&cfg).unwrap();

        assert!(results.out_state(b0).is_live(i));
        assert!(!results.out_state(b0).is_live(unused));
        assert!(results.out_state(b2).is_live(i));
        assert!(results.in_state(b3).is_empty());
        assert!(results.in_state(b0).is_empty());

        let store = cfg.block(b0).unwrap().instructions()[1].id();
        assert!(!analysis.live_after(&results, store).is_live(unused));
        assert!(analysis.live_before(&results, store).is_live(i));
    }

    #[test]
    fn test_unknown_block_is_empty() {
        let mut b = CfgBuilder::new();
        b.add_block();
        let cfg = b.build().unwrap();
        let results = DataFlowSolver::new(LiveVariables::new(&cfg)).solve(&cfg).unwrap();
        assert!(results.in_state(NodeId::new(40)).is_empty());
    }
}
