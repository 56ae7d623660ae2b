//! Fixpoint solvers for data flow analyses.
//!
//! Two strategies compute the same fixpoint with different schedules:
//!
//! - **Naive** sweeps every block in declaration order (reverse order for backward
//!   analyses) until a full sweep changes nothing. It is the simple reference
//!   implementation and is capped at [`NAIVE_ITERATION_LIMIT`] sweeps.
//! - **Worklist** seeds a queue with every block and revisits only the neighbours of
//!   blocks whose facts changed. It is the production path and is capped at
//!   [`WORKLIST_ITERATION_LIMIT`] block visits.
//!
//! # Algorithm
//!
//! Processing one block, forward case (backward mirrors it with successors and a reversed
//! instruction order):
//!
//! 1. `in` = fold of `meet` over the predecessors' `out`, starting from the initial value
//! 2. thread the value through every instruction with `transfer`, recording the
//!    per-instruction `in` and `out` on the way
//! 3. the final value is the block's `out`
//!
//! A block is "changed" when its `in` or `out` differs from the previous visit.
//!
//! # State
//!
//! All mutable facts live in an explicit [`AnalysisState`] that the solver functions
//! borrow exclusively. Exceeding an iteration cap is an error
//! ([`Error::NonConvergence`]), never a silently truncated result.

use std::collections::VecDeque;

use strum::{Display, EnumIter, IntoStaticStr};
use tracing::{debug, warn};

use crate::{
    analysis::{
        cfg::{BasicBlock, ControlFlowGraph},
        dataflow::{
            framework::{AnalysisResults, DataFlowAnalysis, Direction},
            observer::{IterationEvent, SolverObserver, TracingObserver},
        },
    },
    utils::{graph::NodeId, BitSet},
    Error, Result,
};

/// Maximum number of full sweeps the naive solver performs.
pub const NAIVE_ITERATION_LIMIT: usize = 1000;

/// Maximum number of block visits the worklist solver performs.
pub const WORKLIST_ITERATION_LIMIT: usize = 10_000;

/// Scheduling strategy of the fixpoint iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Strategy {
    /// Sweep every block until nothing changes.
    Naive,
    /// Revisit only blocks whose inputs changed.
    #[default]
    Worklist,
}

/// Solver configuration.
///
/// # Examples
///
/// ```rust
/// use flowscope::analysis::dataflow::{SolverConfig, Strategy};
///
/// let config = SolverConfig::default().with_strategy(Strategy::Naive);
/// assert_eq!(config.limit(), 1000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverConfig {
    /// Which scheduling strategy to run.
    pub strategy: Strategy,
    /// Cap on naive sweeps.
    pub naive_iteration_limit: usize,
    /// Cap on worklist block visits.
    pub worklist_iteration_limit: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            strategy: Strategy::default(),
            naive_iteration_limit: NAIVE_ITERATION_LIMIT,
            worklist_iteration_limit: WORKLIST_ITERATION_LIMIT,
        }
    }
}

impl SolverConfig {
    /// Returns a copy using `strategy`.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Returns a copy whose cap for the selected strategy is `limit`.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        match self.strategy {
            Strategy::Naive => self.naive_iteration_limit = limit,
            Strategy::Worklist => self.worklist_iteration_limit = limit,
        }
        self
    }

    /// The cap that applies to the selected strategy.
    #[must_use]
    pub fn limit(&self) -> usize {
        match self.strategy {
            Strategy::Naive => self.naive_iteration_limit,
            Strategy::Worklist => self.worklist_iteration_limit,
        }
    }
}

/// Counters reported by a successful solver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveStats {
    /// The strategy that ran.
    pub strategy: Strategy,
    /// Sweeps (naive) or block visits (worklist).
    pub iterations: usize,
    /// Total number of per-block transfer folds.
    pub block_visits: usize,
}

/// The mutable facts of one analysis run.
///
/// Vectors are indexed by block id and instruction id. The state is created from a
/// graph and an initial value, mutated in place by [`solve_naive`] or
/// [`solve_worklist`], and finally frozen into [`AnalysisResults`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisState<L> {
    block_in: Vec<L>,
    block_out: Vec<L>,
    instr_in: Vec<L>,
    instr_out: Vec<L>,
}

impl<L: Clone> AnalysisState<L> {
    /// Seeds every block and instruction of `cfg` with `initial`.
    #[must_use]
    pub fn new(cfg: &ControlFlowGraph, initial: &L) -> Self {
        AnalysisState {
            block_in: vec![initial.clone(); cfg.block_count()],
            block_out: vec![initial.clone(); cfg.block_count()],
            instr_in: vec![initial.clone(); cfg.instruction_count()],
            instr_out: vec![initial.clone(); cfg.instruction_count()],
        }
    }

    /// Fact at the entry of `block`, if the state covers it.
    #[must_use]
    pub fn block_in(&self, block: NodeId) -> Option<&L> {
        self.block_in.get(block.index())
    }

    /// Fact at the exit of `block`, if the state covers it.
    #[must_use]
    pub fn block_out(&self, block: NodeId) -> Option<&L> {
        self.block_out.get(block.index())
    }

    /// Pads or truncates the state to the shape of `cfg`.
    fn fit(&mut self, cfg: &ControlFlowGraph, initial: &L) {
        self.block_in.resize(cfg.block_count(), initial.clone());
        self.block_out.resize(cfg.block_count(), initial.clone());
        self.instr_in.resize(cfg.instruction_count(), initial.clone());
        self.instr_out.resize(cfg.instruction_count(), initial.clone());
    }

    /// Freezes the state into queryable results.
    #[must_use]
    pub fn into_results(self, initial: L, direction: Direction, stats: SolveStats) -> AnalysisResults<L> {
        AnalysisResults {
            initial,
            block_in: self.block_in,
            block_out: self.block_out,
            instr_in: self.instr_in,
            instr_out: self.instr_out,
            direction,
            strategy: stats.strategy,
            iterations: stats.iterations,
        }
    }
}

/// Recomputes the facts of one block. Returns `true` if its `in` or `out` changed.
fn process_block<A>(
    analysis: &A,
    cfg: &ControlFlowGraph,
    state: &mut AnalysisState<A::Lattice>,
    block: &BasicBlock,
) -> bool
where
    A: DataFlowAnalysis,
{
    let index = block.id().index();

    match A::DIRECTION {
        Direction::Forward => {
            let mut input = analysis.initial_value();
            for pred in cfg.predecessors(block.id()) {
                if let Some(out) = state.block_out.get(pred.index()) {
                    input = analysis.meet(&input, out);
                }
            }

            let mut changed = input != state.block_in[index];
            let mut current = input.clone();
            state.block_in[index] = input;

            for instr in block.instructions() {
                let next = analysis.transfer(instr, &current);
                let slot = instr.id().index();
                state.instr_out[slot] = next.clone();
                state.instr_in[slot] = std::mem::replace(&mut current, next);
            }

            changed |= current != state.block_out[index];
            state.block_out[index] = current;
            changed
        }
        Direction::Backward => {
            let mut output = analysis.initial_value();
            for succ in cfg.successors(block.id()) {
                if let Some(input) = state.block_in.get(succ.index()) {
                    output = analysis.meet(&output, input);
                }
            }

            let mut changed = output != state.block_out[index];
            let mut current = output.clone();
            state.block_out[index] = output;

            for instr in block.instructions().iter().rev() {
                let next = analysis.transfer(instr, &current);
                let slot = instr.id().index();
                state.instr_in[slot] = next.clone();
                state.instr_out[slot] = std::mem::replace(&mut current, next);
            }

            changed |= current != state.block_in[index];
            state.block_in[index] = current;
            changed
        }
    }
}

fn non_convergence<A: DataFlowAnalysis>(analysis: &A, strategy: Strategy, limit: usize) -> Error {
    warn!(
        analysis = analysis.name(),
        %strategy,
        limit,
        "dataflow analysis did not converge"
    );
    Error::NonConvergence {
        analysis: analysis.name(),
        strategy,
        limit,
    }
}

/// Runs naive round-robin iteration to a fixpoint.
///
/// Blocks are swept in declaration order for forward analyses and in reverse order for
/// backward ones. Each sweep reports one [`IterationEvent`].
///
/// # Errors
///
/// Returns [`Error::NonConvergence`] if `limit` sweeps all changed something.
pub fn solve_naive<A>(
    analysis: &A,
    cfg: &ControlFlowGraph,
    state: &mut AnalysisState<A::Lattice>,
    limit: usize,
    observer: &mut dyn SolverObserver,
) -> Result<SolveStats>
where
    A: DataFlowAnalysis,
{
    let mut stats = SolveStats {
        strategy: Strategy::Naive,
        iterations: 0,
        block_visits: 0,
    };
    if cfg.is_empty() {
        return Ok(stats);
    }
    state.fit(cfg, &analysis.initial_value());

    let order: Vec<&BasicBlock> = match A::DIRECTION {
        Direction::Forward => cfg.blocks().collect(),
        Direction::Backward => cfg.blocks().rev().collect(),
    };

    for iteration in 1..=limit {
        let mut changed = false;
        for block in &order {
            changed |= process_block(analysis, cfg, state, block);
        }
        stats.iterations = iteration;
        stats.block_visits += order.len();

        observer.on_iteration(&IterationEvent {
            analysis: analysis.name(),
            strategy: Strategy::Naive,
            iteration,
            block: None,
            changed,
        });

        if !changed {
            return Ok(stats);
        }
    }

    Err(non_convergence(analysis, Strategy::Naive, limit))
}

/// Runs worklist iteration to a fixpoint.
///
/// The queue is seeded with every block, in declaration order for forward analyses and
/// in reverse order for backward ones. When a block changes, its successors (forward) or
/// predecessors (backward) are queued unless they are already waiting. Queue entries
/// that name no block are skipped. Each visit reports one [`IterationEvent`].
///
/// # Errors
///
/// Returns [`Error::NonConvergence`] if the queue is still non-empty after `limit`
/// visits.
pub fn solve_worklist<A>(
    analysis: &A,
    cfg: &ControlFlowGraph,
    state: &mut AnalysisState<A::Lattice>,
    limit: usize,
    observer: &mut dyn SolverObserver,
) -> Result<SolveStats>
where
    A: DataFlowAnalysis,
{
    let mut stats = SolveStats {
        strategy: Strategy::Worklist,
        iterations: 0,
        block_visits: 0,
    };
    if cfg.is_empty() {
        return Ok(stats);
    }
    state.fit(cfg, &analysis.initial_value());

    let mut worklist: VecDeque<NodeId> = match A::DIRECTION {
        Direction::Forward => cfg.blocks().map(BasicBlock::id).collect(),
        Direction::Backward => cfg.blocks().rev().map(BasicBlock::id).collect(),
    };
    let mut queued = BitSet::full(cfg.block_count());

    while let Some(node) = worklist.pop_front() {
        queued.remove(node.index());
        if stats.iterations == limit {
            return Err(non_convergence(analysis, Strategy::Worklist, limit));
        }
        stats.iterations += 1;

        let Some(block) = cfg.block(node) else {
            continue;
        };
        let changed = process_block(analysis, cfg, state, block);
        stats.block_visits += 1;

        observer.on_iteration(&IterationEvent {
            analysis: analysis.name(),
            strategy: Strategy::Worklist,
            iteration: stats.iterations,
            block: Some(node),
            changed,
        });

        if changed {
            let neighbours: Vec<NodeId> = match A::DIRECTION {
                Direction::Forward => cfg.successors(node).collect(),
                Direction::Backward => cfg.predecessors(node).collect(),
            };
            for next in neighbours {
                if queued.insert(next.index()) {
                    worklist.push_back(next);
                }
            }
        }
    }

    Ok(stats)
}

/// Drives an analysis to its fixpoint.
///
/// # Usage
///
/// ```rust
/// use flowscope::prelude::*;
///
/// let mut b = CfgBuilder::new();
/// let b0 = b.add_block();
/// let x = b.var("x");
/// b.assign(b0, x, 1);
/// let cfg = b.build()?;
///
/// let analysis = ReachingDefinitions::new(&cfg);
/// let results = DataFlowSolver::new(&analysis)
///     .with_config(SolverConfig::default().with_strategy(Strategy::Naive))
///     .solve(&cfg)?;
///
/// assert_eq!(results.out_state(b0).count(), 1);
/// # Ok::<(), flowscope::Error>(())
/// ```
pub struct DataFlowSolver<'o, A: DataFlowAnalysis> {
    analysis: A,
    config: SolverConfig,
    observer: Box<dyn SolverObserver + 'o>,
}

impl<'o, A: DataFlowAnalysis> DataFlowSolver<'o, A> {
    /// Creates a solver with the default configuration and a [`TracingObserver`].
    #[must_use]
    pub fn new(analysis: A) -> Self {
        DataFlowSolver {
            analysis,
            config: SolverConfig::default(),
            observer: Box::new(TracingObserver::new()),
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the observer.
    #[must_use]
    pub fn with_observer(mut self, observer: impl SolverObserver + 'o) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// The analysis being solved.
    #[must_use]
    pub fn analysis(&self) -> &A {
        &self.analysis
    }

    /// Computes the fixpoint of the analysis on `cfg`.
    ///
    /// An empty graph performs no work, and every query on the result returns the
    /// initial value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NonConvergence`] when the configured iteration cap is hit.
    pub fn solve(mut self, cfg: &ControlFlowGraph) -> Result<AnalysisResults<A::Lattice>> {
        let initial = self.analysis.initial_value();
        let mut state = AnalysisState::new(cfg, &initial);
        let limit = self.config.limit();

        debug!(
            analysis = self.analysis.name(),
            strategy = %self.config.strategy,
            direction = %A::DIRECTION,
            blocks = cfg.block_count(),
            instructions = cfg.instruction_count(),
            "solving dataflow analysis"
        );

        let stats = match self.config.strategy {
            Strategy::Naive => {
                solve_naive(&self.analysis, cfg, &mut state, limit, self.observer.as_mut())?
            }
            Strategy::Worklist => {
                solve_worklist(&self.analysis, cfg, &mut state, limit, self.observer.as_mut())?
            }
        };

        debug!(
            analysis = self.analysis.name(),
            iterations = stats.iterations,
            block_visits = stats.block_visits,
            "dataflow analysis converged"
        );

        Ok(state.into_results(initial, A::DIRECTION, stats))
    }
}
