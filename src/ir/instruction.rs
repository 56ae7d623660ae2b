//! Instructions and right-hand-side expressions.

use std::fmt;

use strum::{Display, EnumIter, IntoStaticStr};

use crate::{
    analysis::cfg::ControlFlowGraph,
    ir::{ConstValue, Operand, VarId},
};

/// Dense identity of an instruction within one control-flow graph.
///
/// Ids are assigned by the builder in block order, then instruction order, starting at
/// `0`, so per-instruction facts live in vectors indexed by [`InstrId::index`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstrId(pub(crate) usize);

impl InstrId {
    /// Creates an instruction identifier from a raw index.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        InstrId(index)
    }

    /// Returns the raw index of this instruction.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

impl fmt::Display for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

/// Binary operators, displayed as their source token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
pub enum BinaryOp {
    /// Integer addition, or string concatenation.
    #[strum(serialize = "+")]
    Add,
    /// Integer subtraction.
    #[strum(serialize = "-")]
    Sub,
    /// Integer multiplication.
    #[strum(serialize = "*")]
    Mul,
    /// Integer division.
    #[strum(serialize = "/")]
    Div,
    /// Integer remainder.
    #[strum(serialize = "%")]
    Mod,
    /// Less than.
    #[strum(serialize = "<")]
    Lt,
    /// Less than or equal.
    #[strum(serialize = "<=")]
    Le,
    /// Greater than.
    #[strum(serialize = ">")]
    Gt,
    /// Greater than or equal.
    #[strum(serialize = ">=")]
    Ge,
    /// Structural equality.
    #[strum(serialize = "==")]
    Eq,
    /// Structural inequality.
    #[strum(serialize = "!=")]
    Ne,
    /// Boolean conjunction.
    #[strum(serialize = "&&")]
    And,
    /// Boolean disjunction.
    #[strum(serialize = "||")]
    Or,
}

impl BinaryOp {
    /// Evaluates the operator on two literals.
    ///
    /// Returns `None` when the operands have the wrong types or the operation is
    /// undefined (division by zero, overflow).
    #[must_use]
    pub fn apply(self, lhs: &ConstValue, rhs: &ConstValue) -> Option<ConstValue> {
        use ConstValue::{Bool, Int, Str};

        match (self, lhs, rhs) {
            (Self::Add, Int(a), Int(b)) => a.checked_add(*b).map(Int),
            (Self::Add, Str(a), Str(b)) => Some(Str(format!("{a}{b}"))),
            (Self::Sub, Int(a), Int(b)) => a.checked_sub(*b).map(Int),
            (Self::Mul, Int(a), Int(b)) => a.checked_mul(*b).map(Int),
            (Self::Div, Int(a), Int(b)) => a.checked_div(*b).map(Int),
            (Self::Mod, Int(a), Int(b)) => a.checked_rem(*b).map(Int),
            (Self::Lt, Int(a), Int(b)) => Some(Bool(a < b)),
            (Self::Le, Int(a), Int(b)) => Some(Bool(a <= b)),
            (Self::Gt, Int(a), Int(b)) => Some(Bool(a > b)),
            (Self::Ge, Int(a), Int(b)) => Some(Bool(a >= b)),
            (Self::Eq, a, b) if std::mem::discriminant(a) == std::mem::discriminant(b) => {
                Some(Bool(a == b))
            }
            (Self::Ne, a, b) if std::mem::discriminant(a) == std::mem::discriminant(b) => {
                Some(Bool(a != b))
            }
            (Self::And, Bool(a), Bool(b)) => Some(Bool(*a && *b)),
            (Self::Or, Bool(a), Bool(b)) => Some(Bool(*a || *b)),
            _ => None,
        }
    }
}

/// Unary operators, displayed as their source token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
pub enum UnaryOp {
    /// Integer negation.
    #[strum(serialize = "-")]
    Neg,
    /// Boolean negation.
    #[strum(serialize = "!")]
    Not,
}

impl UnaryOp {
    /// Evaluates the operator on a literal. `None` on type mismatch or overflow.
    #[must_use]
    pub fn apply(self, operand: &ConstValue) -> Option<ConstValue> {
        match (self, operand) {
            (Self::Neg, ConstValue::Int(v)) => v.checked_neg().map(ConstValue::Int),
            (Self::Not, ConstValue::Bool(v)) => Some(ConstValue::Bool(!v)),
            _ => None,
        }
    }
}

/// The right-hand side of an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// A bare operand: `x = 5` or the copy `x = y`.
    Operand(Operand),
    /// `x = op a`
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The single operand.
        operand: Operand,
    },
    /// `x = a op b`
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Operand,
        /// Right operand.
        rhs: Operand,
    },
}

impl Expr {
    /// Builds `lhs op rhs`.
    pub fn binary(op: BinaryOp, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Self {
        Self::Binary {
            op,
            lhs: lhs.into(),
            rhs: rhs.into(),
        }
    }

    /// Builds `op operand`.
    pub fn unary(op: UnaryOp, operand: impl Into<Operand>) -> Self {
        Self::Unary {
            op,
            operand: operand.into(),
        }
    }

    /// The operands of this expression, left to right.
    pub fn operands(&self) -> impl Iterator<Item = &Operand> + '_ {
        let (first, second) = match self {
            Self::Operand(operand) | Self::Unary { operand, .. } => (Some(operand), None),
            Self::Binary { lhs, rhs, .. } => (Some(lhs), Some(rhs)),
        };
        first.into_iter().chain(second)
    }
}

impl From<Operand> for Expr {
    fn from(value: Operand) -> Self {
        Self::Operand(value)
    }
}

impl From<VarId> for Expr {
    fn from(value: VarId) -> Self {
        Self::Operand(value.into())
    }
}

impl From<ConstValue> for Expr {
    fn from(value: ConstValue) -> Self {
        Self::Operand(value.into())
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Self::Operand(value.into())
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Self::Operand(value.into())
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Self::Operand(value.into())
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Self::Operand(value.into())
    }
}

/// The classified shape of an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InstrKind {
    /// `dest = value`
    Assign {
        /// The variable written.
        dest: VarId,
        /// The right-hand side.
        value: Expr,
    },
    /// A call to `callee` with `args` arguments. Results are not modelled.
    Call {
        /// Name of the called function.
        callee: String,
        /// Number of arguments passed.
        args: usize,
    },
    /// Conditional jump on `cond`; the targets are the block's successors.
    Branch {
        /// The condition read by the branch.
        cond: Operand,
    },
    /// Unconditional jump to the block's single successor.
    Jump,
    /// Function return, optionally with a value.
    Return {
        /// The returned operand, if any.
        value: Option<Operand>,
    },
}

/// One IR instruction with its graph-wide identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    id: InstrId,
    kind: InstrKind,
}

impl Instruction {
    /// Wraps `kind` with an explicit identity.
    ///
    /// Graphs assign ids themselves; this constructor is for driving transfer functions
    /// directly.
    #[must_use]
    pub fn new(id: InstrId, kind: InstrKind) -> Self {
        Instruction { id, kind }
    }

    /// The identity of this instruction.
    #[must_use]
    pub fn id(&self) -> InstrId {
        self.id
    }

    /// The classified shape of this instruction.
    #[must_use]
    pub fn kind(&self) -> &InstrKind {
        &self.kind
    }

    /// The variable this instruction writes, if any.
    #[must_use]
    pub fn def(&self) -> Option<VarId> {
        match &self.kind {
            InstrKind::Assign { dest, .. } => Some(*dest),
            _ => None,
        }
    }

    /// The variables this instruction reads, in operand order.
    ///
    /// A variable read twice (as in `x + x`) is yielded twice.
    pub fn uses(&self) -> impl Iterator<Item = VarId> + '_ {
        let (first, second): (Option<&Operand>, Option<&Operand>) = match &self.kind {
            InstrKind::Assign { value, .. } => {
                let mut operands = value.operands();
                (operands.next(), operands.next())
            }
            InstrKind::Branch { cond } => (Some(cond), None),
            InstrKind::Return { value } => (value.as_ref(), None),
            InstrKind::Call { .. } | InstrKind::Jump => (None, None),
        };
        first.into_iter().chain(second).filter_map(Operand::as_var)
    }

    /// Returns `true` for assignments.
    #[must_use]
    pub fn is_assignment(&self) -> bool {
        matches!(self.kind, InstrKind::Assign { .. })
    }

    /// Returns `true` for calls.
    #[must_use]
    pub fn is_call(&self) -> bool {
        matches!(self.kind, InstrKind::Call { .. })
    }

    /// Renders the instruction with the variable names of `cfg`.
    #[must_use]
    pub fn display<'a>(&'a self, cfg: &'a ControlFlowGraph) -> InstructionDisplay<'a> {
        InstructionDisplay { instr: self, cfg }
    }
}

/// Helper returned by [`Instruction::display`].
pub struct InstructionDisplay<'a> {
    instr: &'a Instruction,
    cfg: &'a ControlFlowGraph,
}

impl InstructionDisplay<'_> {
    fn operand(&self, f: &mut fmt::Formatter<'_>, operand: &Operand) -> fmt::Result {
        match operand {
            Operand::Var(var) => f.write_str(self.cfg.variable_name(*var)),
            Operand::Const(value) => write!(f, "{value}"),
        }
    }
}

impl fmt::Display for InstructionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instr.kind() {
            InstrKind::Assign { dest, value } => {
                write!(f, "{} = ", self.cfg.variable_name(*dest))?;
                match value {
                    Expr::Operand(operand) => self.operand(f, operand),
                    Expr::Unary { op, operand } => {
                        write!(f, "{op}")?;
                        self.operand(f, operand)
                    }
                    Expr::Binary { op, lhs, rhs } => {
                        self.operand(f, lhs)?;
                        write!(f, " {op} ")?;
                        self.operand(f, rhs)
                    }
                }
            }
            InstrKind::Call { callee, args } => write!(f, "call {callee}/{args}"),
            InstrKind::Branch { cond } => {
                f.write_str("br ")?;
                self.operand(f, cond)
            }
            InstrKind::Jump => f.write_str("jmp"),
            InstrKind::Return { value: None } => f.write_str("ret"),
            InstrKind::Return { value: Some(value) } => {
                f.write_str("ret ")?;
                self.operand(f, value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assign(dest: usize, value: Expr) -> Instruction {
        Instruction::new(
            InstrId::new(0),
            InstrKind::Assign {
                dest: VarId::new(dest),
                value,
            },
        )
    }

    #[test]
    fn test_def_and_uses() {
        let x = VarId::new(0);
        let y = VarId::new(1);

        let instr = assign(2, Expr::binary(BinaryOp::Add, x, y));
        assert_eq!(instr.def(), Some(VarId::new(2)));
        assert_eq!(instr.uses().collect::<Vec<_>>(), vec![x, y]);

        let instr = assign(0, Expr::from(5));
        assert_eq!(instr.uses().count(), 0);

        let ret = Instruction::new(InstrId::new(1), InstrKind::Return { value: Some(y.into()) });
        assert_eq!(ret.def(), None);
        assert_eq!(ret.uses().collect::<Vec<_>>(), vec![y]);

        let call = Instruction::new(
            InstrId::new(2),
            InstrKind::Call {
                callee: "print".into(),
                args: 1,
            },
        );
        assert!(call.is_call());
        assert_eq!(call.uses().count(), 0);
        assert_eq!(call.def(), None);
    }

    #[test]
    fn test_binary_apply() {
        let int = ConstValue::Int;
        assert_eq!(BinaryOp::Add.apply(&int(2), &int(3)), Some(int(5)));
        assert_eq!(BinaryOp::Div.apply(&int(1), &int(0)), None);
        assert_eq!(BinaryOp::Add.apply(&int(i64::MAX), &int(1)), None);
        assert_eq!(
            BinaryOp::Lt.apply(&int(1), &int(2)),
            Some(ConstValue::Bool(true))
        );
        assert_eq!(
            BinaryOp::Eq.apply(&int(1), &ConstValue::Bool(true)),
            None
        );
        assert_eq!(
            BinaryOp::Add.apply(&ConstValue::from("a"), &ConstValue::from("b")),
            Some(ConstValue::from("ab"))
        );
    }

    #[test]
    fn test_unary_apply() {
        assert_eq!(
            UnaryOp::Neg.apply(&ConstValue::Int(4)),
            Some(ConstValue::Int(-4))
        );
        assert_eq!(
            UnaryOp::Not.apply(&ConstValue::Bool(false)),
            Some(ConstValue::Bool(true))
        );
        assert_eq!(UnaryOp::Not.apply(&ConstValue::Int(1)), None);
    }

    #[test]
    fn test_operator_tokens() {
        assert_eq!(BinaryOp::Le.to_string(), "<=");
        assert_eq!(UnaryOp::Not.to_string(), "!");
        let name: &'static str = BinaryOp::And.into();
        assert_eq!(name, "&&");
    }
}
