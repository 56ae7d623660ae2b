//! Runs the standard analyses over one graph in parallel.

use tracing::debug;

use crate::{
    analysis::{
        cfg::{ControlFlowGraph, LoopAnalysis},
        dataflow::{
            AnalysisResults, ConstantPropagation, ConstantState, DataFlowSolver, LiveVariables,
            LivenessResult, ReachingDefinitions, ReachingDefsResult, SolverConfig,
        },
    },
    Result,
};

/// Solves reaching definitions, liveness and constant propagation, and detects loops,
/// on a shared [`ControlFlowGraph`].
///
/// The jobs run concurrently on the rayon thread pool. Each job owns its solver state
/// and only reads the graph. Loop analysis goes through [`ControlFlowGraph::loops`], so
/// its result is cached on the graph afterwards.
///
/// # Examples
///
/// ```rust
/// use flowscope::prelude::*;
///
/// let mut b = CfgBuilder::new();
/// let b0 = b.add_block();
/// let b1 = b.add_block();
/// let i = b.var("i");
/// b.assign(b0, i, 0);
/// b.assign(b1, i, Expr::binary(BinaryOp::Add, i, 1)).branch(b1, i);
/// b.add_edge(b0, b1).add_edge(b1, b1);
/// let cfg = b.build()?;
///
/// let results = AnalysisSuite::new(&cfg).with_folding(true).run()?;
/// assert_eq!(results.loops.len(), 1);
/// assert!(results.liveness.in_state(b1).is_live(i));
/// assert!(results.constants.is_not_constant(i, b1));
/// # Ok::<(), flowscope::Error>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AnalysisSuite<'g> {
    cfg: &'g ControlFlowGraph,
    config: SolverConfig,
    fold_constants: bool,
}

/// Everything computed by an [`AnalysisSuite`] run.
#[derive(Debug)]
pub struct SuiteResults<'g> {
    /// Definition table used to interpret [`Self::reaching`].
    pub definitions: ReachingDefinitions,
    /// Reaching definitions facts.
    pub reaching: AnalysisResults<ReachingDefsResult>,
    /// Live variable facts.
    pub liveness: AnalysisResults<LivenessResult>,
    /// Constant propagation facts.
    pub constants: AnalysisResults<ConstantState>,
    /// Natural loops of the graph.
    pub loops: &'g LoopAnalysis,
}

impl<'g> AnalysisSuite<'g> {
    /// Creates a suite with the default solver configuration and folding disabled.
    #[must_use]
    pub fn new(cfg: &'g ControlFlowGraph) -> Self {
        AnalysisSuite {
            cfg,
            config: SolverConfig::default(),
            fold_constants: false,
        }
    }

    /// Uses `config` for every dataflow job.
    #[must_use]
    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Enables expression folding in constant propagation.
    #[must_use]
    pub fn with_folding(mut self, fold: bool) -> Self {
        self.fold_constants = fold;
        self
    }

    /// Runs all jobs and waits for them.
    ///
    /// # Errors
    ///
    /// Returns the first [`crate::Error::NonConvergence`] raised by a dataflow job.
    pub fn run(self) -> Result<SuiteResults<'g>> {
        let cfg = self.cfg;
        let config = self.config;
        debug!(
            blocks = cfg.block_count(),
            strategy = %config.strategy,
            "running analysis suite"
        );

        let definitions = ReachingDefinitions::new(cfg);
        let liveness = LiveVariables::new(cfg);
        let constants = ConstantPropagation::new(cfg).with_folding(self.fold_constants);

        let ((reaching, live), (consts, loops)) = rayon::join(
            || {
                rayon::join(
                    || DataFlowSolver::new(&definitions).with_config(config).solve(cfg),
                    || DataFlowSolver::new(liveness).with_config(config).solve(cfg),
                )
            },
            || {
                rayon::join(
                    || DataFlowSolver::new(constants).with_config(config).solve(cfg),
                    || cfg.loops(),
                )
            },
        );

        let results = SuiteResults {
            reaching: reaching?,
            liveness: live?,
            constants: consts?,
            loops,
            definitions,
        };
        debug!(loops = results.loops.len(), "analysis suite finished");
        Ok(results)
    }
}
