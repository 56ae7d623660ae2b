//! Variables, literal constants and operands.

use std::fmt;

/// Dense identifier of a program variable.
///
/// Variable names are interned by [`crate::CfgBuilder::var`]; the graph keeps the
/// name table so that reports can print `x` instead of `v0`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub(crate) usize);

impl VarId {
    /// Creates a variable identifier from a raw index.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        VarId(index)
    }

    /// Returns the raw index of this variable.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A compile-time literal.
///
/// Constant propagation compares these structurally: `Int(1)` and `Bool(true)` are
/// different constants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstValue {
    /// 64-bit signed integer.
    Int(i64),
    /// Boolean literal.
    Bool(bool),
    /// String literal.
    Str(String),
}

impl ConstValue {
    /// Returns the integer payload, if this is an integer.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the boolean payload, if this is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Interprets the constant as a branch condition.
    ///
    /// Booleans are taken as-is and integers are true when non-zero. Strings have no
    /// truth value.
    #[must_use]
    pub fn truthiness(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            Self::Int(v) => Some(*v != 0),
            Self::Str(_) => None,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i64> for ConstValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ConstValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for ConstValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for ConstValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ConstValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// Something an instruction reads: a variable or a literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    /// A program variable.
    Var(VarId),
    /// A literal constant.
    Const(ConstValue),
}

impl Operand {
    /// The variable this operand reads, if it is not a literal.
    #[must_use]
    pub fn as_var(&self) -> Option<VarId> {
        match self {
            Self::Var(var) => Some(*var),
            Self::Const(_) => None,
        }
    }

    /// The literal this operand holds, if it is not a variable.
    #[must_use]
    pub fn as_const(&self) -> Option<&ConstValue> {
        match self {
            Self::Var(_) => None,
            Self::Const(value) => Some(value),
        }
    }
}

impl From<VarId> for Operand {
    fn from(var: VarId) -> Self {
        Self::Var(var)
    }
}

impl From<ConstValue> for Operand {
    fn from(value: ConstValue) -> Self {
        Self::Const(value)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Self::Const(ConstValue::Int(value))
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Self::Const(ConstValue::from(value))
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Self::Const(ConstValue::Bool(value))
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Self::Const(ConstValue::from(value))
    }
}
