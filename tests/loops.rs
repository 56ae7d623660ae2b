//! Integration tests for dominance, natural loops and the parallel analysis suite.

use flowscope::{prelude::*, Result};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;

fn ids(raw: &[usize]) -> BTreeSet<NodeId> {
    raw.iter().copied().map(NodeId::new).collect()
}

/// B0 -> B1 -> B2 -> B1 (back edge), B1 -> B3
fn simple_loop() -> Result<ControlFlowGraph> {
    let mut b = CfgBuilder::new();
    let (b0, b1, b2, b3) = (b.add_block(), b.add_block(), b.add_block(), b.add_block());
    let i = b.var("i");
    b.assign(b0, i, 0);
    b.branch(b1, i);
    b.assign(b2, i, Expr::binary(BinaryOp::Add, i, 1)).jump(b2);
    b.ret(b3, Some(i.into()));
    b.add_edge(b0, b1)
        .add_edge(b1, b2)
        .add_edge(b2, b1)
        .add_edge(b1, b3);
    b.build()
}

/// Outer loop headed by B1 (back edge B4 -> B1) around an inner loop headed by B2
/// (back edge B3 -> B2), plus an exit B5.
fn nested_loops() -> Result<ControlFlowGraph> {
    let mut b = CfgBuilder::new();
    let blocks: Vec<NodeId> = (0..6).map(|_| b.add_block()).collect();
    let edges = [(0, 1), (1, 2), (2, 3), (3, 2), (3, 4), (4, 1), (1, 5)];
    for (from, to) in edges {
        b.add_edge(blocks[from], blocks[to]);
    }
    b.build()
}

#[test]
fn test_entry_dominates_every_reachable_block() -> Result<()> {
    let cfg = simple_loop()?;
    let entry = cfg.entry();

    for block in cfg.blocks() {
        assert!(cfg.dominates(entry, block.id()));
        assert!(cfg.dominates(block.id(), block.id()));
    }
    assert!(cfg.dominates(NodeId::new(1), NodeId::new(2)));
    assert!(!cfg.dominates(NodeId::new(2), NodeId::new(1)));

    let dominators = cfg.dominators();
    assert_eq!(dominators.immediate_dominator(NodeId::new(3)), Some(NodeId::new(1)));
    assert_eq!(dominators.immediate_dominator(entry), None);
    assert_eq!(
        dominators.dominators_of(NodeId::new(2)),
        vec![NodeId::new(0), NodeId::new(1), NodeId::new(2)]
    );
    Ok(())
}

#[test]
fn test_unreachable_block_is_not_dominated() -> Result<()> {
    let mut b = CfgBuilder::new();
    let b0 = b.add_block();
    let b1 = b.add_block();
    let orphan = b.add_block();
    b.add_edge(b0, b1).add_edge(orphan, b1);
    let cfg = b.build()?;

    assert!(!cfg.dominates(b0, orphan));
    assert!(!cfg.dominates(b1, orphan));
    assert!(cfg.dominates(orphan, orphan));
    assert!(cfg.dominates(b0, b1));
    assert!(!cfg.dominators().is_reachable(orphan));
    Ok(())
}

#[test]
fn test_simple_loop_membership() -> Result<()> {
    let cfg = simple_loop()?;
    let loops = cfg.loops();

    assert_eq!(loops.len(), 1);
    let natural = &loops.loops()[0];
    assert_eq!(natural.header(), NodeId::new(1));
    assert_eq!(natural.body(), &ids(&[1, 2]));
    assert_eq!(natural.back_edge_sources(), &ids(&[2]));
    assert_eq!(natural.exit_blocks(), vec![NodeId::new(3)]);
    assert_eq!(natural.preheader(), Some(NodeId::new(0)));
    assert_eq!(natural.depth(), 1);
    assert!(natural.is_innermost() && natural.is_outermost());
    assert_eq!(loops.back_edges(), &[(NodeId::new(2), NodeId::new(1))]);
    Ok(())
}

#[test]
fn test_nested_loops() -> Result<()> {
    let cfg = nested_loops()?;
    let loops = cfg.loops();

    assert_eq!(loops.len(), 2);
    let outer = loops.loop_for_header(NodeId::new(1)).unwrap();
    let inner = loops.loop_for_header(NodeId::new(2)).unwrap();

    assert_eq!(outer.body(), &ids(&[1, 2, 3, 4]));
    assert_eq!(inner.body(), &ids(&[2, 3]));
    assert_eq!(inner.parent(), Some(NodeId::new(1)));
    assert_eq!(outer.children(), &[NodeId::new(2)]);
    assert_eq!(inner.depth(), 2);

    assert_eq!(loops.loop_depth(NodeId::new(3)), 2);
    assert_eq!(loops.loop_depth(NodeId::new(4)), 1);
    assert_eq!(loops.loop_depth(NodeId::new(5)), 0);
    assert_eq!(
        loops.innermost_loop(NodeId::new(3)).map(NaturalLoop::header),
        Some(NodeId::new(2))
    );

    let outermost: Vec<NodeId> = loops.outermost_loops().iter().map(|l| l.header()).collect();
    assert_eq!(outermost, vec![NodeId::new(1)]);
    Ok(())
}

#[test]
fn test_loop_analysis_is_cached_and_repeatable() -> Result<()> {
    let cfg = nested_loops()?;

    let first = cfg.loops();
    let second = cfg.loops();
    assert!(std::ptr::eq(first, second));

    let fresh = LoopAnalysis::analyze(&cfg);
    assert_eq!(fresh.loops(), first.loops());
    assert_eq!(fresh.back_edges(), first.back_edges());
    Ok(())
}

#[test]
fn test_empty_graph_has_no_loops() -> Result<()> {
    let cfg = CfgBuilder::new().build()?;

    assert!(cfg.loops().is_empty());
    assert!(!cfg.has_loops());
    assert!(cfg.loops().outermost_loops().is_empty());
    Ok(())
}

#[test]
fn test_suite_runs_everything() -> Result<()> {
    let cfg = simple_loop()?;
    let i = cfg.variable("i").unwrap();

    let results = AnalysisSuite::new(&cfg)
        .with_config(SolverConfig::default().with_strategy(Strategy::Naive))
        .with_folding(true)
        .run()?;

    assert_eq!(results.reaching.strategy(), Strategy::Naive);
    assert_eq!(
        results.definitions.resolve(results.reaching.in_state(NodeId::new(1))).len(),
        2
    );
    assert!(results.liveness.in_state(NodeId::new(1)).is_live(i));
    assert!(results.constants.is_not_constant(i, NodeId::new(1)));
    assert!(results.loops.is_loop_header(NodeId::new(1)));
    Ok(())
}
