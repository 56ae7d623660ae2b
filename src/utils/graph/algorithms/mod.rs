//! Graph algorithms used by control-flow analysis.
//!
//! # Available Algorithms
//!
//! ## Traversal
//!
//! - [`dfs`] - Depth-first pre-order traversal
//! - [`reachable`] - The set of nodes reachable from a start node
//!
//! ## Dominator Analysis
//!
//! - [`Dominators`] - Iterative dominator-set computation with immediate dominators
//!
//! All algorithms are generic over the traits in [`crate::utils::graph`], so they run
//! on a [`crate::ControlFlowGraph`] as well as on any other graph implementing them.

mod dominators;
mod traversal;

pub use dominators::Dominators;
pub use traversal::{dfs, reachable, DfsIterator};
