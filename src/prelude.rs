//! # flowscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the flowscope library. Import it to build graphs and run analyses without
//! spelling out module paths.
//!
//! ```rust
//! use flowscope::prelude::*;
//!
//! let mut b = CfgBuilder::new();
//! let b0 = b.add_block();
//! let x = b.var("x");
//! b.assign(b0, x, 1);
//! let cfg = b.build()?;
//!
//! let results = DataFlowSolver::new(ReachingDefinitions::new(&cfg)).solve(&cfg)?;
//! assert_eq!(results.out_state(b0).count(), 1);
//! # Ok::<(), flowscope::Error>(())
//! ```

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all flowscope operations
pub use crate::Error;

/// The result type used throughout flowscope
pub use crate::Result;

// ================================================================================================
// Instruction Model
// ================================================================================================

/// Instructions and their identifiers
pub use crate::ir::{InstrId, InstrKind, Instruction};

/// Expressions, operands and constant values
pub use crate::ir::{BinaryOp, ConstValue, Expr, Operand, UnaryOp, VarId};

// ================================================================================================
// Control-Flow Graphs
// ================================================================================================

/// Graph construction and access
pub use crate::analysis::cfg::{BasicBlock, CfgBuilder, ControlFlowGraph};

/// Block identifiers
pub use crate::utils::graph::NodeId;

/// Dominance and natural loops
pub use crate::{
    analysis::cfg::{LoopAnalysis, NaturalLoop},
    utils::graph::algorithms::Dominators,
};

// ================================================================================================
// Dataflow Framework
// ================================================================================================

/// Analysis definition traits
pub use crate::analysis::dataflow::{DataFlowAnalysis, Direction, MeetSemiLattice};

/// Solving and results
pub use crate::analysis::dataflow::{
    AnalysisResults, DataFlowSolver, SolveStats, SolverConfig, Strategy,
};

/// Progress reporting
pub use crate::analysis::dataflow::{
    IterationEvent, NoopObserver, SolverObserver, TracingObserver,
};

// ================================================================================================
// Analyses
// ================================================================================================

/// Reaching definitions
pub use crate::analysis::dataflow::{
    DefId, Definition, ReachingDefinitions, ReachingDefsResult,
};

/// Live variables
pub use crate::analysis::dataflow::{LiveVariables, LivenessResult};

/// Conditional constant propagation
pub use crate::analysis::dataflow::{ConstantPropagation, ConstantState, LatticeValue};

/// Parallel execution of the standard analyses
pub use crate::analysis::{AnalysisSuite, SuiteResults};
