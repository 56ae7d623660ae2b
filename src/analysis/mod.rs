//! Program analysis over control-flow graphs.
//!
//! This module builds on the generic graph infrastructure in [`crate::utils::graph`]
//! and the instruction model in [`crate::ir`] to provide the analyses.
//!
//! # Architecture
//!
//! - [`cfg`] - Control-flow graph construction, dominance queries and natural loops
//! - [`dataflow`] - The fixpoint engine and the analyses built on it
//! - [`AnalysisSuite`] - Runs the standard analyses over one graph in parallel
//!
//! # Usage
//!
//! ```rust
//! use flowscope::analysis::{cfg::CfgBuilder, dataflow::{DataFlowSolver, ReachingDefinitions}};
//!
//! let mut b = CfgBuilder::new();
//! let b0 = b.add_block();
//! let b1 = b.add_block();
//! let x = b.var("x");
//! b.assign(b0, x, 1);
//! b.ret(b1, Some(x.into()));
//! b.add_edge(b0, b1);
//! let cfg = b.build()?;
//!
//! assert!(cfg.dominates(b0, b1));
//!
//! let analysis = ReachingDefinitions::new(&cfg);
//! let results = DataFlowSolver::new(&analysis).solve(&cfg)?;
//! assert_eq!(analysis.resolve(results.in_state(b1)).len(), 1);
//! # Ok::<(), flowscope::Error>(())
//! ```

pub mod cfg;
pub mod dataflow;
mod suite;

// Re-export primary types at module level
pub use cfg::{BasicBlock, CfgBuilder, ControlFlowGraph, LoopAnalysis, NaturalLoop};
pub use suite::{AnalysisSuite, SuiteResults};
