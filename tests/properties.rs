//! Property-based tests for the lattices, the transfer functions and the solvers.
//!
//! Invariants that should hold for ALL inputs:
//! - Meet laws: commutative, associative, idempotent
//! - Monotonicity: a lower input never yields a higher output (for constants, among
//!   inputs that define the same variables)
//! - Constants never revert: an assigned constant never becomes `Undefined`
//! - Agreement: naive and worklist iteration reach the same fixpoint (for constants,
//!   the same defined variables at every block)
//! - Idempotence: solving twice gives identical results
//! - Dominance: the entry dominates every reachable block, every block dominates itself

use flowscope::{analysis::dataflow::Strategy as SolveStrategy, prelude::*, utils::BitSet};
use proptest::{prelude::*, strategy::Strategy};

const VARS: usize = 3;

// ============================================================================
// Strategies
// ============================================================================

fn lattice_value() -> impl Strategy<Value = LatticeValue> {
    prop_oneof![
        Just(LatticeValue::Undefined),
        (-2i64..3).prop_map(|n| LatticeValue::Constant(ConstValue::Int(n))),
        Just(LatticeValue::Constant(ConstValue::Bool(true))),
        Just(LatticeValue::NotConstant),
    ]
}

fn constant_state() -> impl Strategy<Value = ConstantState> {
    prop::collection::vec(lattice_value(), 0..=VARS).prop_map(|values| {
        let mut state = ConstantState::new(0);
        for (index, value) in values.into_iter().enumerate() {
            state.set(VarId::new(index), value);
        }
        state
    })
}

/// A state and a lowered copy of it that defines the same variables.
fn lowered_state_pair() -> impl Strategy<Value = (ConstantState, ConstantState)> {
    prop::collection::vec((lattice_value(), any::<bool>()), 0..=VARS).prop_map(|entries| {
        let mut high = ConstantState::new(0);
        let mut low = ConstantState::new(0);
        for (index, (value, lower)) in entries.into_iter().enumerate() {
            let lowered = if lower && value.is_constant() {
                LatticeValue::NotConstant
            } else {
                value.clone()
            };
            high.set(VarId::new(index), value);
            low.set(VarId::new(index), lowered);
        }
        (low, high)
    })
}

fn bitset() -> impl Strategy<Value = BitSet> {
    prop::collection::vec(0usize..16, 0..8).prop_map(|indices| BitSet::from_indices(16, indices))
}

#[derive(Debug, Clone)]
enum Rhs {
    Literal(i64),
    Copy(usize),
    Add(usize, usize),
    Div(usize, i64),
    Negate(usize),
}

fn rhs() -> impl Strategy<Value = Rhs> {
    prop_oneof![
        (-2i64..3).prop_map(Rhs::Literal),
        (0..VARS).prop_map(Rhs::Copy),
        (0..VARS, 0..VARS).prop_map(|(a, b)| Rhs::Add(a, b)),
        (0..VARS, 0i64..2).prop_map(|(a, b)| Rhs::Div(a, b)),
        (0..VARS).prop_map(Rhs::Negate),
    ]
}

#[derive(Debug, Clone)]
struct ProgramShape {
    blocks: Vec<Vec<(usize, Rhs)>>,
    edges: Vec<(usize, usize)>,
    calls: Vec<usize>,
}

fn program() -> impl Strategy<Value = ProgramShape> {
    (1usize..8).prop_flat_map(|n| {
        (
            prop::collection::vec(prop::collection::vec((0..VARS, rhs()), 0..4), n),
            prop::collection::vec((0..n, 0..n), 0..(2 * n)),
            prop::collection::vec(0..n, 0..2),
        )
            .prop_map(|(blocks, edges, calls)| ProgramShape {
                blocks,
                edges,
                calls,
            })
    })
}

fn build(shape: &ProgramShape) -> ControlFlowGraph {
    let mut b = CfgBuilder::new();
    let blocks: Vec<NodeId> = shape.blocks.iter().map(|_| b.add_block()).collect();
    let vars: Vec<VarId> = (0..VARS).map(|i| b.var(&format!("v{i}"))).collect();

    for (block, body) in blocks.iter().zip(&shape.blocks) {
        for (dest, rhs) in body {
            let value = match *rhs {
                Rhs::Literal(n) => Expr::from(n),
                Rhs::Copy(src) => Expr::from(vars[src]),
                Rhs::Add(l, r) => Expr::binary(BinaryOp::Add, vars[l], vars[r]),
                Rhs::Div(l, r) => Expr::binary(BinaryOp::Div, vars[l], r),
                Rhs::Negate(src) => Expr::unary(UnaryOp::Neg, vars[src]),
            };
            b.assign(*block, vars[*dest], value);
        }
    }
    for &block in &shape.calls {
        b.call(blocks[block], "effect", 1);
    }
    for &(from, to) in &shape.edges {
        b.add_edge(blocks[from], blocks[to]);
    }
    b.build().unwrap()
}

/// `low` is at or below `high` when meeting them changes nothing.
fn below<L: MeetSemiLattice>(low: &L, high: &L) -> bool {
    low.meet(high) == *low
}

fn agree<A>(analysis: A, cfg: &ControlFlowGraph) -> bool
where
    A: DataFlowAnalysis + Copy,
{
    let naive = SolverConfig::default().with_strategy(SolveStrategy::Naive);
    let worklist = SolverConfig::default().with_strategy(SolveStrategy::Worklist);
    let a = DataFlowSolver::new(analysis).with_config(naive).solve(cfg).unwrap();
    let b = DataFlowSolver::new(analysis).with_config(worklist).solve(cfg).unwrap();
    a.same_facts(&b)
}

/// Both results leave exactly the same variables `Undefined` at every block.
fn same_defined_variables(
    a: &AnalysisResults<ConstantState>,
    b: &AnalysisResults<ConstantState>,
    cfg: &ControlFlowGraph,
) -> bool {
    cfg.blocks().all(|block| {
        (0..VARS).map(VarId::new).all(|var| {
            a.value_at(var, block.id()).is_undefined() == b.value_at(var, block.id()).is_undefined()
                && a.value_at_exit(var, block.id()).is_undefined()
                    == b.value_at_exit(var, block.id()).is_undefined()
        })
    })
}

fn constants_agree(analysis: ConstantPropagation, cfg: &ControlFlowGraph) -> bool {
    let naive = SolverConfig::default().with_strategy(SolveStrategy::Naive);
    let worklist = SolverConfig::default().with_strategy(SolveStrategy::Worklist);
    let a = DataFlowSolver::new(analysis).with_config(naive).solve(cfg).unwrap();
    let b = DataFlowSolver::new(analysis).with_config(worklist).solve(cfg).unwrap();
    same_defined_variables(&a, &b, cfg)
}

// ============================================================================
// Meet laws
// ============================================================================

proptest! {
    #[test]
    fn prop_lattice_value_meet_laws(a in lattice_value(), b in lattice_value(), c in lattice_value()) {
        prop_assert_eq!(a.meet(&b), b.meet(&a));
        prop_assert_eq!(a.meet(&b.meet(&c)), a.meet(&b).meet(&c));
        prop_assert_eq!(a.meet(&a), a.clone());
        prop_assert_eq!(LatticeValue::Undefined.meet(&a), a.clone());
        prop_assert!(LatticeValue::NotConstant.meet(&a).is_not_constant());
    }

    #[test]
    fn prop_constant_state_meet_laws(a in constant_state(), b in constant_state(), c in constant_state()) {
        prop_assert_eq!(a.meet(&b), b.meet(&a));
        prop_assert_eq!(a.meet(&b.meet(&c)), a.meet(&b).meet(&c));
        prop_assert_eq!(a.meet(&a), a.clone());
        prop_assert_eq!(ConstantState::new(VARS).meet(&a), a.clone());
    }

    #[test]
    fn prop_bitset_meet_laws(a in bitset(), b in bitset(), c in bitset()) {
        prop_assert_eq!(a.meet(&b), b.meet(&a));
        prop_assert_eq!(a.meet(&b.meet(&c)), a.meet(&b).meet(&c));
        prop_assert_eq!(a.meet(&a), a.clone());
        prop_assert!(a.is_subset(&a.meet(&b)));
    }
}

// ============================================================================
// Monotonicity
// ============================================================================

proptest! {
    #[test]
    fn prop_constant_transfer_is_monotone(
        shape in program(),
        (low, high) in lowered_state_pair(),
        fold in any::<bool>(),
    ) {
        let cfg = build(&shape);
        let analysis = ConstantPropagation::new(&cfg).with_folding(fold);
        prop_assert!(below(&low, &high));

        for instr in cfg.instructions() {
            let out_low = analysis.transfer(instr, &low);
            let out_high = analysis.transfer(instr, &high);
            prop_assert!(below(&out_low, &out_high), "{} broke monotonicity", instr.display(&cfg));
        }
    }

    #[test]
    fn prop_assigned_constant_never_reverts_to_undefined(
        shape in program(),
        state in constant_state(),
        held in -2i64..3,
        fold in any::<bool>(),
    ) {
        let cfg = build(&shape);
        let analysis = ConstantPropagation::new(&cfg).with_folding(fold);

        for instr in cfg.instructions() {
            let Some(dest) = instr.def() else { continue };
            let mut input = state.clone();
            input.set(dest, LatticeValue::Constant(ConstValue::Int(held)));

            let output = analysis.transfer(instr, &input);
            prop_assert!(
                !output.get(dest).is_undefined(),
                "{} turned a constant back into undefined",
                instr.display(&cfg)
            );
        }
    }

    #[test]
    fn prop_reaching_transfer_is_monotone(shape in program(), extra in bitset()) {
        let cfg = build(&shape);
        let analysis = ReachingDefinitions::new(&cfg);

        let mut high = analysis.initial_value();
        for def in extra.iter().filter(|&d| d < analysis.definitions().len()) {
            high.add(DefId::new(def));
        }
        let mut low = high.clone();
        if !analysis.definitions().is_empty() {
            low.add(DefId::new(0));
        }
        prop_assert!(below(&low, &high));

        for instr in cfg.instructions() {
            prop_assert!(below(&analysis.transfer(instr, &low), &analysis.transfer(instr, &high)));
        }
    }

    #[test]
    fn prop_liveness_transfer_is_monotone(shape in program(), live in bitset()) {
        let cfg = build(&shape);
        let analysis = LiveVariables::new(&cfg);

        let mut high = analysis.initial_value();
        for var in live.iter().filter(|&v| v < VARS) {
            high.add(VarId::new(var));
        }
        let mut low = high.clone();
        low.add(VarId::new(0));

        for instr in cfg.instructions() {
            prop_assert!(below(&analysis.transfer(instr, &low), &analysis.transfer(instr, &high)));
        }
    }
}

// ============================================================================
// Solvers and graph structure
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_naive_and_worklist_agree(shape in program()) {
        let cfg = build(&shape);
        prop_assert!(agree(&ReachingDefinitions::new(&cfg), &cfg));
        prop_assert!(agree(LiveVariables::new(&cfg), &cfg));
        prop_assert!(constants_agree(ConstantPropagation::new(&cfg), &cfg));
        prop_assert!(constants_agree(ConstantPropagation::new(&cfg).with_folding(true), &cfg));
    }

    #[test]
    fn prop_reanalysis_is_idempotent(shape in program()) {
        let cfg = build(&shape);
        let analysis = ReachingDefinitions::new(&cfg);
        let first = DataFlowSolver::new(&analysis).solve(&cfg).unwrap();
        let second = DataFlowSolver::new(&analysis).solve(&cfg).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(analysis.report(&cfg, &first), analysis.report(&cfg, &second));
    }

    #[test]
    fn prop_dominance_basics(shape in program()) {
        let cfg = build(&shape);
        let dominators = cfg.dominators();

        for block in cfg.blocks() {
            let id = block.id();
            prop_assert!(cfg.dominates(id, id));
            prop_assert_eq!(cfg.dominates(cfg.entry(), id), dominators.is_reachable(id));
        }
    }

    #[test]
    fn prop_back_edges_target_dominating_headers(shape in program()) {
        let cfg = build(&shape);
        let loops = cfg.loops();

        for &(source, header) in loops.back_edges() {
            prop_assert!(cfg.dominates(header, source));
            let natural = loops.loop_for_header(header).unwrap();
            prop_assert!(natural.contains(source));
            prop_assert!(natural.contains(header));
            prop_assert!(natural.back_edge_sources().contains(&source));
        }
        for natural in loops.loops() {
            for &member in natural.body() {
                prop_assert!(cfg.dominates(natural.header(), member));
            }
        }
    }
}
