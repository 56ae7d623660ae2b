//! The intermediate representation consumed by the analyses.
//!
//! Lowering from source into this IR is the job of a front end and is not part of this
//! crate. What lives here is the minimal typed vocabulary that analyses need to classify
//! instructions:
//!
//! - [`VarId`] and [`InstrId`] - dense identities handed out by [`crate::CfgBuilder`]
//! - [`ConstValue`] and [`Operand`] - literal values and the things an instruction reads
//! - [`Expr`] - the right-hand side of an assignment
//! - [`Instruction`] / [`InstrKind`] - assignment, call, or a control-transfer "other"
//!
//! Analyses never pattern-match on the whole instruction set themselves. They ask
//! [`Instruction::def`] for the variable an instruction writes and [`Instruction::uses`]
//! for the variables it reads, and only constant propagation looks into [`Expr`].

mod instruction;
mod value;

pub use instruction::{BinaryOp, Expr, InstrId, InstrKind, Instruction, InstructionDisplay, UnaryOp};
pub use value::{ConstValue, Operand, VarId};
