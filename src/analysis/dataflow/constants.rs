//! Conditional constant propagation.
//!
//! Tracks, for every variable at every program point, whether it is known to hold a
//! single compile-time constant.
//!
//! # Lattice
//!
//! ```text
//!          Undefined          (no information yet)
//!        /     |     \
//!   Const(1) Const(2) ...     (exactly one known value)
//!        \     |     /
//!         NotConstant         (conflicting or computed values)
//! ```
//!
//! Values only move down: `Undefined` may become a constant or `NotConstant`, and a
//! constant may only become `NotConstant`. A program point maps every variable to one
//! [`LatticeValue`]; variables absent from the map are `Undefined`.
//!
//! # Transfer
//!
//! - `x = c` sets `x` to `Constant(c)`
//! - `x = y` copies the value of `y`; while `y` is still `Undefined`, `x` keeps its
//!   current value
//! - any other right-hand side leaves `x` unchanged, unless folding is enabled with
//!   [`ConstantPropagation::with_folding`]
//!
//! With folding, unary and binary expressions over known constants are evaluated. A
//! `NotConstant` operand or a failed evaluation (division by zero, overflow, type
//! mismatch) yields `NotConstant`. A still-`Undefined` operand leaves `x` unchanged.

use std::fmt;

use crate::{
    analysis::{
        cfg::{BasicBlock, ControlFlowGraph},
        dataflow::{
            framework::{AnalysisResults, DataFlowAnalysis, Direction},
            lattice::MeetSemiLattice,
        },
    },
    ir::{ConstValue, Expr, InstrKind, Instruction, Operand, VarId},
    utils::graph::NodeId,
};

static UNDEFINED: LatticeValue = LatticeValue::Undefined;

/// The constant-propagation lattice for a single variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum LatticeValue {
    /// No information yet.
    #[default]
    Undefined,
    /// Known to hold exactly this value.
    Constant(ConstValue),
    /// Provably not a single constant.
    NotConstant,
}

impl LatticeValue {
    /// Returns `true` for [`LatticeValue::Undefined`].
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Returns `true` for [`LatticeValue::Constant`].
    #[must_use]
    pub fn is_constant(&self) -> bool {
        matches!(self, Self::Constant(_))
    }

    /// Returns `true` for [`LatticeValue::NotConstant`].
    #[must_use]
    pub fn is_not_constant(&self) -> bool {
        matches!(self, Self::NotConstant)
    }

    /// The known value, if any.
    #[must_use]
    pub fn as_constant(&self) -> Option<&ConstValue> {
        match self {
            Self::Constant(value) => Some(value),
            _ => None,
        }
    }
}

impl MeetSemiLattice for LatticeValue {
    fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (a, b) if a == b => a.clone(),
            (Self::NotConstant, _) | (_, Self::NotConstant) => Self::NotConstant,
            (Self::Undefined, x) | (x, Self::Undefined) => x.clone(),
            (Self::Constant(_), Self::Constant(_)) => Self::NotConstant,
        }
    }
}

impl fmt::Display for LatticeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Constant(value) => write!(f, "{value}"),
            Self::NotConstant => write!(f, "not-constant"),
        }
    }
}

/// Per-variable lattice values at one program point.
///
/// Stored densely by [`VarId`]. Entries past the end are `Undefined`, and equality
/// treats trailing `Undefined` entries as absent.
#[derive(Debug, Clone, Default)]
pub struct ConstantState {
    values: Vec<LatticeValue>,
}

impl ConstantState {
    /// Creates a state in which every variable is `Undefined`.
    #[must_use]
    pub fn new(num_vars: usize) -> Self {
        Self {
            values: vec![LatticeValue::Undefined; num_vars],
        }
    }

    /// The value of `var`.
    #[must_use]
    pub fn get(&self, var: VarId) -> &LatticeValue {
        self.values.get(var.index()).unwrap_or(&UNDEFINED)
    }

    /// Sets the value of `var`.
    pub fn set(&mut self, var: VarId, value: LatticeValue) {
        if var.index() >= self.values.len() {
            if value.is_undefined() {
                return;
            }
            self.values.resize(var.index() + 1, LatticeValue::Undefined);
        }
        self.values[var.index()] = value;
    }

    /// Variables with a value other than `Undefined`, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (VarId, &LatticeValue)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, value)| !value.is_undefined())
            .map(|(index, value)| (VarId::new(index), value))
    }

    /// Variables known to be constant, with their values.
    pub fn constants(&self) -> impl Iterator<Item = (VarId, &ConstValue)> + '_ {
        self.iter()
            .filter_map(|(var, value)| value.as_constant().map(|c| (var, c)))
    }

    /// Resolves an operand: literals are constants, variables are looked up.
    #[must_use]
    pub fn operand(&self, operand: &Operand) -> LatticeValue {
        match operand {
            Operand::Const(value) => LatticeValue::Constant(value.clone()),
            Operand::Var(var) => self.get(*var).clone(),
        }
    }
}

impl PartialEq for ConstantState {
    fn eq(&self, other: &Self) -> bool {
        let longest = self.values.len().max(other.values.len());
        (0..longest).all(|index| {
            let var = VarId::new(index);
            self.get(var) == other.get(var)
        })
    }
}

impl MeetSemiLattice for ConstantState {
    fn meet(&self, other: &Self) -> Self {
        let longest = self.values.len().max(other.values.len());
        let values = (0..longest)
            .map(|index| {
                let var = VarId::new(index);
                self.get(var).meet(other.get(var))
            })
            .collect();
        Self { values }
    }
}

/// Conditional constant propagation.
///
/// # Example
///
/// ```rust
/// use flowscope::prelude::*;
///
/// // x = 5; y = x; z = y
/// let mut b = CfgBuilder::new();
/// let b0 = b.add_block();
/// let (x, y, z) = (b.var("x"), b.var("y"), b.var("z"));
/// b.assign(b0, x, 5).assign(b0, y, x).assign(b0, z, y);
/// let cfg = b.build()?;
///
/// let results = DataFlowSolver::new(ConstantPropagation::new(&cfg)).solve(&cfg)?;
/// assert_eq!(results.constant_value_out(z, b0), Some(&ConstValue::Int(5)));
/// # Ok::<(), flowscope::Error>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ConstantPropagation {
    num_vars: usize,
    fold: bool,
}

impl ConstantPropagation {
    /// Creates the analysis for the variables of `cfg`, with folding disabled.
    #[must_use]
    pub fn new(cfg: &ControlFlowGraph) -> Self {
        Self {
            num_vars: cfg.variable_count(),
            fold: false,
        }
    }

    /// Enables or disables folding of unary and binary expressions.
    #[must_use]
    pub fn with_folding(mut self, fold: bool) -> Self {
        self.fold = fold;
        self
    }

    /// Returns `true` if expressions over known constants are folded.
    #[must_use]
    pub fn folds(&self) -> bool {
        self.fold
    }

    /// Evaluates a right-hand side under `state`.
    ///
    /// Returns `None` when the target should keep its current value: the expression
    /// shape is not handled, or the result is still `Undefined`. A target that holds a
    /// constant never falls back to `Undefined`.
    #[must_use]
    pub fn evaluate(&self, expr: &Expr, state: &ConstantState) -> Option<LatticeValue> {
        let value = match expr {
            Expr::Operand(operand) => Some(state.operand(operand)),
            Expr::Unary { op, operand } if self.fold => {
                Some(fold_with(&[state.operand(operand)], |args| op.apply(&args[0])))
            }
            Expr::Binary { op, lhs, rhs } if self.fold => Some(fold_with(
                &[state.operand(lhs), state.operand(rhs)],
                |args| op.apply(&args[0], &args[1]),
            )),
            Expr::Unary { .. } | Expr::Binary { .. } => None,
        };
        value.filter(|v| !v.is_undefined())
    }

    /// Decides a block's terminating branch from the facts at the branch.
    ///
    /// Returns `Some(true)` or `Some(false)` when the condition is a known boolean or
    /// integer (non-zero is true), and `None` when the block does not end in a branch or
    /// the condition is not a known constant.
    #[must_use]
    pub fn branch_outcome(
        &self,
        results: &AnalysisResults<ConstantState>,
        block: &BasicBlock,
    ) -> Option<bool> {
        let terminator = block.terminator()?;
        let InstrKind::Branch { cond } = terminator.kind() else {
            return None;
        };
        results
            .instr_in(terminator.id())
            .operand(cond)
            .as_constant()
            .and_then(ConstValue::truthiness)
    }

    /// Renders per-block facts with variable names.
    #[must_use]
    pub fn report(&self, cfg: &ControlFlowGraph, results: &AnalysisResults<ConstantState>) -> String {
        results.report(cfg, "constant propagation", |fact| {
            let entries: Vec<String> = fact
                .iter()
                .map(|(var, value)| format!("{}={}", cfg.variable_name(var), value))
                .collect();
            format!("{{{}}}", entries.join(", "))
        })
    }
}

fn fold_with(
    operands: &[LatticeValue],
    apply: impl FnOnce(&[ConstValue]) -> Option<ConstValue>,
) -> LatticeValue {
    if operands.iter().any(LatticeValue::is_not_constant) {
        return LatticeValue::NotConstant;
    }
    let known: Option<Vec<ConstValue>> = operands.iter().map(|v| v.as_constant().cloned()).collect();
    match known {
        None => LatticeValue::Undefined,
        Some(args) => apply(&args).map_or(LatticeValue::NotConstant, LatticeValue::Constant),
    }
}

impl DataFlowAnalysis for ConstantPropagation {
    type Lattice = ConstantState;
    const DIRECTION: Direction = Direction::Forward;

    fn initial_value(&self) -> Self::Lattice {
        ConstantState::new(self.num_vars)
    }

    fn transfer(&self, instr: &Instruction, input: &Self::Lattice) -> Self::Lattice {
        let mut output = input.clone();
        if let InstrKind::Assign { dest, value } = instr.kind() {
            if let Some(result) = self.evaluate(value, input) {
                output.set(*dest, result);
            }
        }
        output
    }
}

impl AnalysisResults<ConstantState> {
    /// The value of `var` at the entry of `block`.
    #[must_use]
    pub fn value_at(&self, var: VarId, block: NodeId) -> &LatticeValue {
        self.in_state(block).get(var)
    }

    /// The value of `var` at the exit of `block`.
    #[must_use]
    pub fn value_at_exit(&self, var: VarId, block: NodeId) -> &LatticeValue {
        self.out_state(block).get(var)
    }

    /// Returns `true` if `var` is a known constant at the entry of `block`.
    #[must_use]
    pub fn is_constant(&self, var: VarId, block: NodeId) -> bool {
        self.value_at(var, block).is_constant()
    }

    /// The constant value of `var` at the entry of `block`.
    #[must_use]
    pub fn constant_value(&self, var: VarId, block: NodeId) -> Option<&ConstValue> {
        self.value_at(var, block).as_constant()
    }

    /// Returns `true` if `var` is provably not constant at the entry of `block`.
    #[must_use]
    pub fn is_not_constant(&self, var: VarId, block: NodeId) -> bool {
        self.value_at(var, block).is_not_constant()
    }

    /// Returns `true` if `var` is a known constant at the exit of `block`.
    #[must_use]
    pub fn is_constant_out(&self, var: VarId, block: NodeId) -> bool {
        self.value_at_exit(var, block).is_constant()
    }

    /// The constant value of `var` at the exit of `block`.
    #[must_use]
    pub fn constant_value_out(&self, var: VarId, block: NodeId) -> Option<&ConstValue> {
        self.value_at_exit(var, block).as_constant()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{cfg::CfgBuilder, dataflow::DataFlowSolver},
        ir::{BinaryOp, UnaryOp},
    };

    fn c(value: i64) -> LatticeValue {
        LatticeValue::Constant(ConstValue::Int(value))
    }

    #[test]
    fn test_meet_single() {
        use LatticeValue::{NotConstant, Undefined};

        assert_eq!(Undefined.meet(&Undefined), Undefined);
        assert_eq!(Undefined.meet(&c(1)), c(1));
        assert_eq!(c(1).meet(&Undefined), c(1));
        assert_eq!(c(1).meet(&c(1)), c(1));
        assert_eq!(c(1).meet(&c(2)), NotConstant);
        assert_eq!(NotConstant.meet(&Undefined), NotConstant);
        assert_eq!(c(3).meet(&NotConstant), NotConstant);
        assert_ne!(Undefined, NotConstant);
    }

    #[test]
    fn test_state_meet_unions_keys() {
        let mut a = ConstantState::new(0);
        let mut b = ConstantState::new(0);
        a.set(VarId::new(0), c(1));
        b.set(VarId::new(2), c(7));
        b.set(VarId::new(0), c(1));

        let merged = a.meet(&b);
        assert_eq!(merged.get(VarId::new(0)), &c(1));
        assert_eq!(merged.get(VarId::new(2)), &c(7));
        assert_eq!(merged.get(VarId::new(1)), &LatticeValue::Undefined);
        assert_eq!(merged.get(VarId::new(99)), &LatticeValue::Undefined);
    }

    #[test]
    fn test_state_equality_ignores_trailing_undefined() {
        let mut short = ConstantState::new(1);
        short.set(VarId::new(0), c(4));
        let mut long = ConstantState::new(10);
        long.set(VarId::new(0), c(4));
        assert_eq!(short, long);

        long.set(VarId::new(8), LatticeValue::NotConstant);
        assert_ne!(short, long);
    }

    #[test]
    fn test_conflicting_merge() {
        // B0: br c ; B1: x = 1 ; B2: x = 2 ; B3: ret x
        let mut b = CfgBuilder::new();
        let (b0, b1, b2, b3) = (b.add_block(), b.add_block(), b.add_block(), b.add_block());
        let cond = b.var("c");
        let x = b.var("x");
        b.branch(b0, cond);
        b.assign(b1, x, 1);
        b.assign(b2, x, 2);
        b.ret(b3, Some(x.into()));
        b.add_edge(b0, b1).add_edge(b0, b2).add_edge(b1, b3).add_edge(b2, b3);
        let cfg = b.build().unwrap();

        let results = DataFlowSolver::new(ConstantPropagation::new(&cfg)).solve(&cfg).unwrap();
        assert!(results.is_not_constant(x, b3));
        assert!(results.is_constant_out(x, b1));
        assert_eq!(results.value_at(cond, b3), &LatticeValue::Undefined);
    }

    #[test]
    fn test_agreeing_merge_stays_constant() {
        let mut b = CfgBuilder::new();
        let (b0, b1, b2, b3) = (b.add_block(), b.add_block(), b.add_block(), b.add_block());
        let x = b.var("x");
        b.assign(b1, x, 4);
        b.assign(b2, x, 4);
        b.add_edge(b0, b1).add_edge(b0, b2).add_edge(b1, b3).add_edge(b2, b3);
        let cfg = b.build().unwrap();

        let results = DataFlowSolver::new(ConstantPropagation::new(&cfg)).solve(&cfg).unwrap();
        assert_eq!(results.constant_value(x, b3), Some(&ConstValue::Int(4)));
    }

    #[test]
    fn test_arithmetic_left_unchanged_without_folding() {
        let mut b = CfgBuilder::new();
        let b0 = b.add_block();
        let x = b.var("x");
        let y = b.var("y");
        b.assign(b0, x, 2).assign(b0, y, 1).assign(b0, y, Expr::binary(BinaryOp::Add, x, 3));
        let cfg = b.build().unwrap();

        let results = DataFlowSolver::new(ConstantPropagation::new(&cfg)).solve(&cfg).unwrap();
        assert_eq!(results.constant_value_out(y, b0), Some(&ConstValue::Int(1)));
    }

    #[test]
    fn test_folding() {
        let mut b = CfgBuilder::new();
        let b0 = b.add_block();
        let (x, y, z, w, u, p) = (b.var("x"), b.var("y"), b.var("z"), b.var("w"), b.var("u"), b.var("p"));
        b.assign(b0, x, 6)
            .assign(b0, y, Expr::binary(BinaryOp::Mul, x, 7))
            .assign(b0, z, Expr::binary(BinaryOp::Div, y, 0))
            .assign(b0, w, Expr::unary(UnaryOp::Neg, y))
            .assign(b0, u, Expr::binary(BinaryOp::Add, p, 1));
        let cfg = b.build().unwrap();

        let analysis = ConstantPropagation::new(&cfg).with_folding(true);
        assert!(analysis.folds());
        let results = DataFlowSolver::new(analysis).solve(&cfg).unwrap();

        assert_eq!(results.constant_value_out(y, b0), Some(&ConstValue::Int(42)));
        assert!(results.value_at_exit(z, b0).is_not_constant());
        assert_eq!(results.constant_value_out(w, b0), Some(&ConstValue::Int(-42)));
        // p is never assigned, so u has no information yet
        assert!(results.value_at_exit(u, b0).is_undefined());
    }

    #[test]
    fn test_undefined_source_keeps_target() {
        let mut b = CfgBuilder::new();
        b.add_block();
        let (x, y) = (b.var("x"), b.var("y"));
        let cfg = b.build().unwrap();
        let analysis = ConstantPropagation::new(&cfg).with_folding(true);

        let mut state = ConstantState::new(2);
        state.set(x, c(1));
        assert_eq!(analysis.evaluate(&Expr::from(y), &state), None);
        assert_eq!(analysis.evaluate(&Expr::binary(BinaryOp::Add, y, 1), &state), None);
        assert_eq!(analysis.evaluate(&Expr::from(x), &state), Some(c(1)));

        state.set(y, LatticeValue::NotConstant);
        assert_eq!(
            analysis.evaluate(&Expr::binary(BinaryOp::Add, y, 1), &state),
            Some(LatticeValue::NotConstant)
        );
    }

    #[test]
    fn test_branch_outcome() {
        let mut b = CfgBuilder::new();
        let (b0, b1, b2) = (b.add_block(), b.add_block(), b.add_block());
        let flag = b.var("flag");
        let unknown = b.var("unknown");
        b.assign(b0, flag, true).branch(b0, flag);
        b.branch(b1, unknown);
        b.add_edge(b0, b1).add_edge(b0, b2).add_edge(b1, b2);
        let cfg = b.build().unwrap();

        let analysis = ConstantPropagation::new(&cfg);
        let results = DataFlowSolver::new(&analysis).solve(&cfg).unwrap();

        assert_eq!(analysis.branch_outcome(&results, cfg.block(b0).unwrap()), Some(true));
        assert_eq!(analysis.branch_outcome(&results, cfg.block(b1).unwrap()), None);
        assert_eq!(analysis.branch_outcome(&results, cfg.block(b2).unwrap()), None);
    }
}
