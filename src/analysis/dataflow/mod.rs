//! Data flow analysis framework over control-flow graphs.
//!
//! This module provides a generic framework for computing facts that propagate along
//! control flow edges, in either direction, with a choice of two fixpoint strategies.
//!
//! # Architecture
//!
//! - **Lattice** ([`MeetSemiLattice`]): the domain of facts and how paths merge
//! - **Analysis** ([`DataFlowAnalysis`]): direction, seed value and transfer function
//! - **Solver** ([`DataFlowSolver`], [`solve_naive`], [`solve_worklist`]): iterates an
//!   explicit [`AnalysisState`] to a fixpoint, reporting progress to a
//!   [`SolverObserver`]
//!
//! # Analyses Provided
//!
//! - [`ReachingDefinitions`]: which assignments may reach each program point
//! - [`LiveVariables`]: which variables may still be read
//! - [`ConstantPropagation`]: which variables hold a single known constant
//!
//! # Example
//!
//! ```rust
//! use flowscope::prelude::*;
//!
//! let mut b = CfgBuilder::new();
//! let b0 = b.add_block();
//! let x = b.var("x");
//! b.assign(b0, x, 3).ret(b0, Some(x.into()));
//! let cfg = b.build()?;
//!
//! let constants = DataFlowSolver::new(ConstantPropagation::new(&cfg)).solve(&cfg)?;
//! let liveness = DataFlowSolver::new(LiveVariables::new(&cfg)).solve(&cfg)?;
//!
//! assert!(constants.is_constant_out(x, b0));
//! assert!(!liveness.in_state(b0).is_live(x));
//! # Ok::<(), flowscope::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! Analyses and results are `Send` and `Sync`. Each solver run owns its state and only
//! reads the graph, so independent analyses may run concurrently on one graph.

mod constants;
mod framework;
mod lattice;
mod liveness;
mod observer;
mod reaching;
mod solver;

// Re-export primary types
pub use constants::{ConstantPropagation, ConstantState, LatticeValue};
pub use framework::{AnalysisResults, DataFlowAnalysis, Direction};
pub use lattice::MeetSemiLattice;
pub use liveness::{LiveVariables, LivenessResult};
pub use observer::{IterationEvent, NoopObserver, SolverObserver, TracingObserver};
pub use reaching::{DefId, Definition, ReachingDefinitions, ReachingDefsResult};
pub use solver::{
    solve_naive, solve_worklist, AnalysisState, DataFlowSolver, SolveStats, SolverConfig,
    Strategy, NAIVE_ITERATION_LIMIT, WORKLIST_ITERATION_LIMIT,
};
