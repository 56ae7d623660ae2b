//! Control-flow graph construction, dominance and loop detection.
//!
//! # Key Components
//!
//! - [`ControlFlowGraph`] - Dense, immutable graph of [`BasicBlock`]s
//! - [`CfgBuilder`] - Incremental construction with id assignment
//! - [`LoopAnalysis`] - Back edges and [`NaturalLoop`]s derived from dominance
//!
//! The dominance relation itself is graph-generic and lives in
//! [`crate::utils::graph::algorithms::Dominators`].
//!
//! # Lazy Computation
//!
//! [`ControlFlowGraph::dominators`] and [`ControlFlowGraph::loops`] compute on first use
//! and cache the result, so several consumers can share one computation.

mod builder;
mod graph;
mod loops;

pub use builder::CfgBuilder;
pub use graph::{BasicBlock, ControlFlowGraph};
pub use loops::{LoopAnalysis, NaturalLoop};
