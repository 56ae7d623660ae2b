// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]

//! # flowscope
//!
//! A monotone dataflow framework for control-flow graphs, with the classic analyses built
//! on top of it.
//!
//! ## Features
//!
//! - **Generic fixpoint engine** - Any meet semilattice, forward or backward, solved by
//!   naive round-robin or worklist iteration with bounded iteration counts
//! - **Reaching definitions** - Which assignments may reach each program point
//! - **Live variables** - Which variables may still be read before being overwritten
//! - **Constant propagation** - Which variables hold one known constant, with optional
//!   expression folding
//! - **Dominance and natural loops** - Dominator sets, back edges, loop bodies, exits,
//!   preheaders and nesting
//! - **Observability** - Per-iteration progress events, logged through `tracing` by default
//!
//! ## Quick Start
//!
//! ```rust
//! use flowscope::prelude::*;
//!
//! // B0: x = 5; y = x + 1  ->  B1: ret y
//! let mut b = CfgBuilder::new();
//! let b0 = b.add_block();
//! let b1 = b.add_block();
//! let x = b.var("x");
//! let y = b.var("y");
//! b.assign(b0, x, 5)
//!     .assign(b0, y, Expr::binary(BinaryOp::Add, x, 1));
//! b.ret(b1, Some(y.into()));
//! b.add_edge(b0, b1);
//! let cfg = b.build()?;
//!
//! // Constant propagation with folding sees through the addition
//! let analysis = ConstantPropagation::new(&cfg).with_folding(true);
//! let constants = DataFlowSolver::new(analysis).solve(&cfg)?;
//! assert_eq!(constants.constant_value(y, b1), Some(&ConstValue::Int(6)));
//!
//! // Liveness: only y is read after B0
//! let live = DataFlowSolver::new(LiveVariables::new(&cfg)).solve(&cfg)?;
//! assert!(live.out_state(b0).is_live(y));
//! assert!(!live.out_state(b0).is_live(x));
//! # Ok::<(), flowscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`ir`] - The instruction model analyses consume
//! - [`analysis::cfg`] - Graph construction, dominance and loop detection
//! - [`analysis::dataflow`] - The engine and the analyses
//! - [`utils`] - Bit sets and generic graph traits and algorithms
//!
//! ## Concurrency
//!
//! Graphs are immutable once built and are `Send + Sync`. Every solver run owns its
//! state, so independent analyses can run on one graph at the same time;
//! [`AnalysisSuite`] does exactly that on the rayon thread pool.

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use flowscope::prelude::*;
///
/// let cfg = CfgBuilder::new().build()?;
/// assert!(cfg.is_empty());
/// # Ok::<(), flowscope::Error>(())
/// ```
pub mod prelude;

/// The instruction model: variables, operands, expressions and instructions.
pub mod ir;

/// Control-flow graphs, dominance, loops and dataflow analyses.
pub mod analysis;

/// Bit sets, graph traits and graph algorithms shared by the analyses.
pub mod utils;

/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
///
/// # Examples
///
/// ```rust
/// use flowscope::{CfgBuilder, ControlFlowGraph, Result};
///
/// fn single_block() -> Result<ControlFlowGraph> {
///     let mut builder = CfgBuilder::new();
///     builder.add_block();
///     builder.build()
/// }
/// # assert_eq!(single_block().unwrap().block_count(), 1);
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `flowscope` Error type
///
/// The main error type for all operations in this crate.
///
/// # Examples
///
/// ```rust
/// use flowscope::prelude::*;
///
/// let mut b = CfgBuilder::new();
/// let b0 = b.add_block();
/// let x = b.var("x");
/// b.assign(b0, x, 1);
/// b.add_edge(b0, b0);
/// let cfg = b.build()?;
///
/// // One sweep can never confirm a fixpoint once something changed
/// let config = SolverConfig::default().with_strategy(Strategy::Naive).with_limit(1);
/// match DataFlowSolver::new(ReachingDefinitions::new(&cfg)).with_config(config).solve(&cfg) {
///     Err(Error::NonConvergence { strategy, .. }) => assert_eq!(strategy, Strategy::Naive),
///     other => panic!("unexpected: {other:?}"),
/// }
/// # Ok::<(), flowscope::Error>(())
/// ```
pub use error::Error;

/// Graph construction and the graph itself.
///
/// See [`analysis::cfg`] for dominance and loop queries.
pub use analysis::cfg::{BasicBlock, CfgBuilder, ControlFlowGraph, LoopAnalysis, NaturalLoop};

/// Parallel execution of the standard analyses.
pub use analysis::{AnalysisSuite, SuiteResults};

/// Block identifier shared by the graph and every analysis result.
pub use utils::graph::NodeId;

/// Dominator sets of a rooted graph.
pub use utils::graph::algorithms::Dominators;
