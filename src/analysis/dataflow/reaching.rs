//! Reaching definitions analysis.
//!
//! Reaching definitions computes, for each program point, which assignments may reach
//! that point without being overwritten by an intervening assignment to the same
//! variable.
//!
//! # Algorithm
//!
//! A pre-pass records one [`Definition`] per assignment and groups them by variable.
//! Per instruction:
//!
//! - `GEN` = the definition created by this instruction, if it is an assignment
//! - `KILL` = every other definition of the assigned variable
//! - `OUT` = `GEN ∪ (IN - KILL)`
//!
//! Meet is union: a definition reaches a join point if it reaches along any path.
//!
//! # Calls
//!
//! Calls are not analysed interprocedurally. A call conservatively kills every
//! definition made in the entry block, which stands in for definitions of globals.
//! Arguments passed by reference are not modelled, so results for programs with
//! aliasing are an over-approximation.

use std::{
    collections::BTreeMap,
    fmt,
    hash::{Hash, Hasher},
};

use crate::{
    analysis::{
        cfg::ControlFlowGraph,
        dataflow::{
            framework::{AnalysisResults, DataFlowAnalysis, Direction},
            lattice::MeetSemiLattice,
        },
    },
    ir::{InstrId, Instruction, VarId},
    utils::{graph::NodeId, BitSet},
};

/// Index of a [`Definition`] in its analysis's definition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DefId(usize);

impl DefId {
    /// Creates a definition id from a raw index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        DefId(index)
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// One static assignment site.
///
/// Identity is `(variable, block, index)`. The originating instruction is carried along
/// for convenience but takes no part in equality, ordering or hashing.
#[derive(Debug, Clone, Copy)]
pub struct Definition {
    /// The assigned variable.
    pub variable: VarId,
    /// The block holding the assignment.
    pub block: NodeId,
    /// Position of the assignment within its block.
    pub index: usize,
    /// The assignment instruction, when known.
    pub instruction: Option<InstrId>,
}

impl Definition {
    /// A definition without an instruction reference.
    #[must_use]
    pub fn new(variable: VarId, block: NodeId, index: usize) -> Self {
        Definition {
            variable,
            block,
            index,
            instruction: None,
        }
    }

    /// Renders as `name@B{block}:{index}` using the variable names of `cfg`.
    #[must_use]
    pub fn display(&self, cfg: &ControlFlowGraph) -> String {
        format!(
            "{}@B{}:{}",
            cfg.variable_name(self.variable),
            self.block.index(),
            self.index
        )
    }

    fn key(&self) -> (NodeId, usize, VarId) {
        (self.block, self.index, self.variable)
    }
}

impl PartialEq for Definition {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Definition {}

impl Hash for Definition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Definition {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Definition {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@B{}:{}", self.variable, self.block.index(), self.index)
    }
}

/// Reaching definitions analysis.
///
/// # Example
///
/// ```rust
/// use flowscope::prelude::*;
///
/// // B0: x = 1 ; B1: y = x + 1
/// let mut b = CfgBuilder::new();
/// let (b0, b1) = (b.add_block(), b.add_block());
/// let (x, y) = (b.var("x"), b.var("y"));
/// b.assign(b0, x, 1);
/// b.assign(b1, y, Expr::binary(BinaryOp::Add, x, 1));
/// b.add_edge(b0, b1);
/// let cfg = b.build()?;
///
/// let analysis = ReachingDefinitions::new(&cfg);
/// let results = DataFlowSolver::new(&analysis).solve(&cfg)?;
///
/// assert_eq!(analysis.resolve(results.in_state(b1)), vec![&Definition::new(x, b0, 0)]);
/// # Ok::<(), flowscope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ReachingDefinitions {
    definitions: Vec<Definition>,
    by_instruction: Vec<Option<DefId>>,
    by_variable: Vec<Vec<DefId>>,
    globals: BitSet,
}

impl ReachingDefinitions {
    /// Runs the pre-pass over `cfg`, recording one definition per assignment.
    #[must_use]
    pub fn new(cfg: &ControlFlowGraph) -> Self {
        let mut definitions = Vec::new();
        let mut by_instruction = vec![None; cfg.instruction_count()];
        let mut by_variable = vec![Vec::new(); cfg.variable_count()];

        for block in cfg.blocks() {
            for (index, instr) in block.instructions().iter().enumerate() {
                let Some(variable) = instr.def() else {
                    continue;
                };
                let id = DefId(definitions.len());
                definitions.push(Definition {
                    variable,
                    block: block.id(),
                    index,
                    instruction: Some(instr.id()),
                });
                if let Some(slot) = by_instruction.get_mut(instr.id().index()) {
                    *slot = Some(id);
                }
                if variable.index() >= by_variable.len() {
                    by_variable.resize(variable.index() + 1, Vec::new());
                }
                by_variable[variable.index()].push(id);
            }
        }

        let globals = BitSet::from_indices(
            definitions.len(),
            definitions
                .iter()
                .enumerate()
                .filter(|(_, def)| !cfg.is_empty() && def.block == cfg.entry())
                .map(|(index, _)| index),
        );

        ReachingDefinitions {
            definitions,
            by_instruction,
            by_variable,
            globals,
        }
    }

    /// All definitions, in block order then instruction order.
    #[must_use]
    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    /// Looks up a definition by id.
    #[must_use]
    pub fn definition(&self, id: DefId) -> Option<&Definition> {
        self.definitions.get(id.0)
    }

    /// The definition created by `instr`, if it is an assignment.
    #[must_use]
    pub fn definition_for(&self, instr: InstrId) -> Option<&Definition> {
        self.def_id_for(instr).and_then(|id| self.definition(id))
    }

    /// Every definition of `var`.
    pub fn definitions_of(&self, var: VarId) -> impl Iterator<Item = &Definition> + '_ {
        self.by_variable
            .get(var.index())
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|&id| self.definition(id))
    }

    fn def_id_for(&self, instr: InstrId) -> Option<DefId> {
        self.by_instruction.get(instr.index()).copied().flatten()
    }

    /// Definitions created by `instr`: a singleton for assignments, empty otherwise.
    #[must_use]
    pub fn gen(&self, instr: &Instruction) -> BitSet {
        let mut set = BitSet::new(self.definitions.len());
        if let Some(id) = self.def_id_for(instr.id()) {
            set.insert(id.0);
        }
        set
    }

    /// Definitions invalidated by `instr`.
    ///
    /// For an assignment to `v`: every definition of `v` except its own. For a call:
    /// every definition in the entry block.
    #[must_use]
    pub fn kill(&self, instr: &Instruction) -> BitSet {
        let mut set = BitSet::new(self.definitions.len());
        if let Some(var) = instr.def() {
            let own = self.def_id_for(instr.id());
            for &id in self.by_variable.get(var.index()).map(Vec::as_slice).unwrap_or_default() {
                if Some(id) != own {
                    set.insert(id.0);
                }
            }
        }
        if instr.is_call() {
            set.union_with(&self.globals);
        }
        set
    }

    /// Maps a fact back to its definitions, in block order then instruction order.
    #[must_use]
    pub fn resolve<'a>(&'a self, fact: &ReachingDefsResult) -> Vec<&'a Definition> {
        fact.definitions().filter_map(|id| self.definition(id)).collect()
    }

    /// Groups the definitions of a fact by the variable they assign.
    #[must_use]
    pub fn group_by_variable<'a>(
        &'a self,
        fact: &ReachingDefsResult,
    ) -> BTreeMap<VarId, Vec<&'a Definition>> {
        let mut groups: BTreeMap<VarId, Vec<&Definition>> = BTreeMap::new();
        for def in self.resolve(fact) {
            groups.entry(def.variable).or_default().push(def);
        }
        groups
    }

    /// Definitions reaching the entry of `block`.
    #[must_use]
    pub fn reaching_at_block<'a>(
        &'a self,
        results: &AnalysisResults<ReachingDefsResult>,
        block: NodeId,
    ) -> Vec<&'a Definition> {
        self.resolve(results.in_state(block))
    }

    /// Definitions of `var` that reach the point just before `instr` (a use-def chain).
    #[must_use]
    pub fn reaching_at<'a>(
        &'a self,
        results: &AnalysisResults<ReachingDefsResult>,
        instr: InstrId,
        var: VarId,
    ) -> Vec<&'a Definition> {
        self.resolve(results.instr_in(instr))
            .into_iter()
            .filter(|def| def.variable == var)
            .collect()
    }

    /// Renders per-block facts with variable names.
    #[must_use]
    pub fn report(
        &self,
        cfg: &ControlFlowGraph,
        results: &AnalysisResults<ReachingDefsResult>,
    ) -> String {
        results.report(cfg, "reaching definitions", |fact| {
            let defs: Vec<String> = self.resolve(fact).iter().map(|d| d.display(cfg)).collect();
            format!("{{{}}}", defs.join(", "))
        })
    }
}

impl DataFlowAnalysis for ReachingDefinitions {
    type Lattice = ReachingDefsResult;
    const DIRECTION: Direction = Direction::Forward;

    fn initial_value(&self) -> Self::Lattice {
        ReachingDefsResult::new(self.definitions.len())
    }

    fn transfer(&self, instr: &Instruction, input: &Self::Lattice) -> Self::Lattice {
        let mut defs = input.defs.clone();
        defs.difference_with(&self.kill(instr));
        defs.union_with(&self.gen(instr));
        ReachingDefsResult { defs }
    }
}

/// The set of definitions reaching one program point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReachingDefsResult {
    defs: BitSet,
}

impl ReachingDefsResult {
    /// Creates an empty set sized for `num_defs` definitions.
    #[must_use]
    pub fn new(num_defs: usize) -> Self {
        Self {
            defs: BitSet::new(num_defs),
        }
    }

    /// Returns `true` if the definition reaches this point.
    #[must_use]
    pub fn reaches(&self, def: DefId) -> bool {
        self.defs.contains(def.0)
    }

    /// Iterates over the reaching definitions, in id order.
    pub fn definitions(&self) -> impl Iterator<Item = DefId> + '_ {
        self.defs.iter().map(DefId)
    }

    /// Number of reaching definitions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.defs.count()
    }

    /// Returns `true` if nothing reaches this point.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Adds a definition.
    pub fn add(&mut self, def: DefId) {
        self.defs.insert(def.0);
    }

    /// Removes a definition.
    pub fn remove(&mut self, def: DefId) {
        self.defs.remove(def.0);
    }

    /// The underlying bit set, indexed by [`DefId`].
    #[must_use]
    pub fn as_bitset(&self) -> &BitSet {
        &self.defs
    }
}

impl MeetSemiLattice for ReachingDefsResult {
    /// Union: a definition reaches if it reaches from any predecessor.
    fn meet(&self, other: &Self) -> Self {
        Self {
            defs: self.defs.meet(&other.defs),
        }
    }
}
