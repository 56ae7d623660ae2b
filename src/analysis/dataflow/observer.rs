//! Iteration observers.
//!
//! The solvers report progress through a [`SolverObserver`] instead of printing. Hosts
//! can plug in a closure, the [`TracingObserver`] that forwards to `tracing`, or the
//! [`NoopObserver`].

use tracing::{debug, trace};

use crate::{analysis::dataflow::Strategy, utils::graph::NodeId};

/// Emitted once per naive sweep, or once per worklist pop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationEvent {
    /// Name of the running analysis.
    pub analysis: &'static str,
    /// Strategy driving the iteration.
    pub strategy: Strategy,
    /// 1-based iteration counter.
    pub iteration: usize,
    /// The block just processed. `None` for naive sweeps, which touch every block.
    pub block: Option<NodeId>,
    /// Whether this step changed any block fact.
    pub changed: bool,
}

/// Receives [`IterationEvent`]s while a solver runs.
pub trait SolverObserver {
    /// Called after every iteration step.
    fn on_iteration(&mut self, event: &IterationEvent);
}

impl<F> SolverObserver for F
where
    F: FnMut(&IterationEvent),
{
    fn on_iteration(&mut self, event: &IterationEvent) {
        self(event);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SolverObserver for NoopObserver {
    fn on_iteration(&mut self, _event: &IterationEvent) {}
}

/// Forwards events to `tracing`.
///
/// Every event is logged at `TRACE`. A progress line is logged at `DEBUG` every
/// [`progress_interval`](Self::with_progress_interval) iterations.
#[derive(Debug, Clone, Copy)]
pub struct TracingObserver {
    progress_interval: usize,
}

impl TracingObserver {
    /// Creates an observer reporting progress every 100 iterations.
    #[must_use]
    pub fn new() -> Self {
        TracingObserver {
            progress_interval: 100,
        }
    }

    /// Sets how often a `DEBUG` progress line is written. `0` disables progress lines.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverObserver for TracingObserver {
    fn on_iteration(&mut self, event: &IterationEvent) {
        trace!(
            analysis = event.analysis,
            strategy = %event.strategy,
            iteration = event.iteration,
            block = ?event.block,
            changed = event.changed,
            "dataflow step"
        );
        if self.progress_interval != 0 && event.iteration % self.progress_interval == 0 {
            debug!(
                analysis = event.analysis,
                strategy = %event.strategy,
                iteration = event.iteration,
                changed = event.changed,
                "dataflow iteration progress"
            );
        }
    }
}
