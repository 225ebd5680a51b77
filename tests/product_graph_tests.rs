use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use graphcursor::bench_utils::{DEFAULT_SEED, GraphTopology, build_graph};
use graphcursor::product_graph::{
    ProductGraphTraversalCursor, StateGraph, StateGraphBuilder, StateId,
};
use graphcursor::{
    Direction, GraphCursorError, NodeId, Relationship, RelationshipId,
    RelationshipTraversalCursor, SnapshotGraph, Token, UnboundedTracker, any_node, any_rel,
};

const R1: Token = 1;
const R2: Token = 2;

type Outcome = (Option<RelationshipId>, StateId);

fn expand_outcomes(
    graph: &SnapshotGraph,
    states: &StateGraph<'_>,
    node: NodeId,
    seeds: &[StateId],
) -> HashSet<Outcome> {
    let mut cursor = ProductGraphTraversalCursor::new(
        states,
        graph.relationship_cursor(),
        Arc::new(UnboundedTracker),
    );
    cursor.set_node_and_states(node, seeds).expect("seed");
    let mut outcomes = HashSet::new();
    while cursor.next().expect("advance") {
        let rel = cursor.relationship().unwrap().map(|rel| rel.id);
        let target = cursor.target_state().unwrap();
        assert!(
            outcomes.insert((rel, target)),
            "outcome ({rel:?}, {target:?}) emitted twice"
        );
    }
    outcomes
}

/// The batching-equivalence invariant: expanding a state set in one call must
/// equal the union of the single-state expansions.
fn assert_batching_equivalence(
    graph: &SnapshotGraph,
    states: &StateGraph<'_>,
    node: NodeId,
    seeds: &[StateId],
) {
    let batched = expand_outcomes(graph, states, node, seeds);
    let mut unioned = HashSet::new();
    for &seed in seeds {
        unioned.extend(expand_outcomes(graph, states, node, &[seed]));
    }
    assert_eq!(batched, unioned, "node {node}, seeds {seeds:?}");
}

#[test]
fn test_two_hop_traversal() {
    let mut graph = SnapshotGraph::new();
    let start = graph.add_node(&[]);
    let a1 = graph.add_node(&[]);
    let a2 = graph.add_node(&[]);
    let r1 = graph.add_relationship(start, R1, a1);
    let r2 = graph.add_relationship(a1, R2, a2);

    let mut builder = StateGraphBuilder::new();
    let s0 = builder.new_start_state();
    let s1 = builder.new_state();
    let s2 = builder.new_final_state();
    builder.add_relationship_expansion(s0, s1, any_rel(), Some(&[R1]), Direction::Both, any_node());
    builder.add_relationship_expansion(s1, s2, any_rel(), Some(&[R2]), Direction::Both, any_node());
    let states = builder.build();

    assert_eq!(
        expand_outcomes(&graph, &states, start, &[s0]),
        HashSet::from([(Some(r1), s1)])
    );
    // from (a1, s1) both edges are scanned but only r2 matches the expansion
    assert_eq!(
        expand_outcomes(&graph, &states, a1, &[s1]),
        HashSet::from([(Some(r2), s2)])
    );
    assert_eq!(expand_outcomes(&graph, &states, a2, &[s2]), HashSet::new());
}

#[test]
fn test_filters_on_type_direction_and_predicates() {
    let mut graph = SnapshotGraph::new();
    let start = graph.add_node(&[]);
    let a1 = graph.add_node(&[]);
    let a2 = graph.add_node(&[]);
    let r1 = graph.add_relationship(start, R1, a1);
    let _r2 = graph.add_relationship(a1, R2, a2);

    // wrong type from s1
    let mut builder = StateGraphBuilder::new();
    let s0 = builder.new_start_state();
    let s1 = builder.new_state();
    let s2 = builder.new_final_state();
    builder.add_relationship_expansion(
        s0,
        s1,
        any_rel(),
        None,
        Direction::Outgoing,
        any_node(),
    );
    builder.add_relationship_expansion(
        s1,
        s2,
        any_rel(),
        Some(&[R1]),
        Direction::Outgoing,
        any_node(),
    );
    let states = builder.build();
    assert_eq!(
        expand_outcomes(&graph, &states, start, &[s0]),
        HashSet::from([(Some(r1), s1)])
    );
    assert_eq!(expand_outcomes(&graph, &states, a1, &[s1]), HashSet::new());

    // wrong direction from s1: r2 leaves a1, the expansion wants incoming R2
    let mut builder = StateGraphBuilder::new();
    let s0 = builder.new_start_state();
    let s1 = builder.new_state();
    let s2 = builder.new_final_state();
    builder.add_relationship_expansion(
        s0,
        s1,
        any_rel(),
        None,
        Direction::Outgoing,
        any_node(),
    );
    builder.add_relationship_expansion(
        s1,
        s2,
        any_rel(),
        Some(&[R2]),
        Direction::Incoming,
        any_node(),
    );
    let states = builder.build();
    assert_eq!(expand_outcomes(&graph, &states, a1, &[s1]), HashSet::new());

    // relationship predicate rejects everything
    let mut builder = StateGraphBuilder::new();
    let s1 = builder.new_start_state();
    let s2 = builder.new_final_state();
    builder.add_relationship_expansion(
        s1,
        s2,
        Box::new(|_: &Relationship| false),
        None,
        Direction::Both,
        any_node(),
    );
    let states = builder.build();
    assert_eq!(expand_outcomes(&graph, &states, a1, &[s1]), HashSet::new());

    // target-node predicate rejects everything
    let mut builder = StateGraphBuilder::new();
    let s1 = builder.new_start_state();
    let s2 = builder.new_final_state();
    builder.add_relationship_expansion(
        s1,
        s2,
        any_rel(),
        None,
        Direction::Both,
        Box::new(|_| false),
    );
    let states = builder.build();
    assert_eq!(expand_outcomes(&graph, &states, a1, &[s1]), HashSet::new());
}

#[test]
fn test_juxtapositions_yield_sentinel_outcomes() {
    let mut graph = SnapshotGraph::new();
    let node = graph.add_node(&[]);

    let mut builder = StateGraphBuilder::new();
    let s0 = builder.new_start_state();
    let s1 = builder.new_state();
    let s2 = builder.new_final_state();
    builder.add_juxtaposition(s0, s1, any_node());
    builder.add_juxtaposition(s0, s2, Box::new(move |n| n != node));
    // both seeds target s1: the outcome is deduplicated
    builder.add_juxtaposition(s1, s1, any_node());
    let states = builder.build();

    assert_eq!(
        expand_outcomes(&graph, &states, node, &[s0]),
        HashSet::from([(None, s1)])
    );
    assert_eq!(
        expand_outcomes(&graph, &states, node, &[s0, s1]),
        HashSet::from([(None, s1)])
    );
}

#[test]
fn test_other_node_accessor() {
    let mut graph = SnapshotGraph::new();
    let a = graph.add_node(&[]);
    let b = graph.add_node(&[]);
    graph.add_relationship(a, R1, b);

    let mut builder = StateGraphBuilder::new();
    let s0 = builder.new_start_state();
    let s1 = builder.new_state();
    let s2 = builder.new_final_state();
    builder.add_juxtaposition(s0, s1, any_node());
    builder.add_relationship_expansion(s0, s2, any_rel(), None, Direction::Outgoing, any_node());
    let states = builder.build();

    let mut cursor = ProductGraphTraversalCursor::new(
        &states,
        graph.relationship_cursor(),
        Arc::new(UnboundedTracker),
    );
    cursor.set_node_and_states(a, &[s0]).unwrap();

    // juxtapositions come first and stay on the seeded node
    assert!(cursor.next().unwrap());
    assert_eq!(cursor.relationship().unwrap(), None);
    assert_eq!(cursor.target_state().unwrap(), s1);
    assert_eq!(cursor.other_node().unwrap(), a);

    assert!(cursor.next().unwrap());
    assert!(cursor.relationship().unwrap().is_some());
    assert_eq!(cursor.target_state().unwrap(), s2);
    assert_eq!(cursor.other_node().unwrap(), b);

    assert!(!cursor.next().unwrap());
}

/// Relationship cursor wrapper counting physical scans.
struct CountingRelCursor<R> {
    inner: R,
    scans: Rc<Cell<usize>>,
}

impl<R: RelationshipTraversalCursor> RelationshipTraversalCursor for CountingRelCursor<R> {
    fn init(
        &mut self,
        node: NodeId,
        direction: Direction,
        types: Option<&[Token]>,
    ) -> Result<(), GraphCursorError> {
        self.scans.set(self.scans.get() + 1);
        self.inner.init(node, direction, types)
    }

    fn next(&mut self) -> Result<bool, GraphCursorError> {
        self.inner.next()
    }

    fn relationship(&self) -> Relationship {
        self.inner.relationship()
    }

    fn origin_node(&self) -> NodeId {
        self.inner.origin_node()
    }
}

#[test]
fn test_equal_requirements_share_one_physical_scan() {
    let mut graph = SnapshotGraph::new();
    let a = graph.add_node(&[]);
    let b = graph.add_node(&[]);
    let r1 = graph.add_relationship(a, R1, b);

    let mut builder = StateGraphBuilder::new();
    let s0 = builder.new_start_state();
    let s1 = builder.new_start_state();
    let t0 = builder.new_state();
    let t1 = builder.new_state();
    let t2 = builder.new_final_state();
    // same (direction, type-set) requirement from both seed states, one of
    // them twice; type order must not matter
    builder.add_relationship_expansion(
        s0,
        t0,
        any_rel(),
        Some(&[R1, R2]),
        Direction::Outgoing,
        any_node(),
    );
    builder.add_relationship_expansion(
        s0,
        t1,
        any_rel(),
        Some(&[R2, R1]),
        Direction::Outgoing,
        any_node(),
    );
    builder.add_relationship_expansion(
        s1,
        t2,
        any_rel(),
        Some(&[R1, R2]),
        Direction::Outgoing,
        any_node(),
    );
    let states = builder.build();

    let scans = Rc::new(Cell::new(0));
    let mut cursor = ProductGraphTraversalCursor::new(
        &states,
        CountingRelCursor {
            inner: graph.relationship_cursor(),
            scans: scans.clone(),
        },
        Arc::new(UnboundedTracker),
    );
    cursor.set_node_and_states(a, &[s0, s1]).unwrap();
    let mut outcomes = HashSet::new();
    while cursor.next().unwrap() {
        outcomes.insert((
            cursor.relationship().unwrap().map(|rel| rel.id),
            cursor.target_state().unwrap(),
        ));
    }

    assert_eq!(scans.get(), 1, "one physical scan per distinct requirement");
    assert_eq!(
        outcomes,
        HashSet::from([(Some(r1), t0), (Some(r1), t1), (Some(r1), t2)])
    );
}

#[test]
fn test_cyclic_automaton_terminates() {
    let mut graph = SnapshotGraph::new();
    let a = graph.add_node(&[]);
    let b = graph.add_node(&[]);
    let r1 = graph.add_relationship(a, R1, b);
    let r2 = graph.add_relationship(b, R1, a);

    let mut builder = StateGraphBuilder::new();
    let s0 = builder.new_start_state();
    let s1 = builder.new_state();
    builder.add_relationship_expansion(s0, s1, any_rel(), None, Direction::Outgoing, any_node());
    builder.add_relationship_expansion(s1, s0, any_rel(), None, Direction::Outgoing, any_node());
    let states = builder.build();

    assert_eq!(
        expand_outcomes(&graph, &states, a, &[s0, s1]),
        HashSet::from([(Some(r1), s1), (Some(r1), s0)])
    );
    assert_eq!(
        expand_outcomes(&graph, &states, b, &[s0, s1]),
        HashSet::from([(Some(r2), s1), (Some(r2), s0)])
    );
}

#[test]
fn test_reseed_discards_progress() {
    let mut graph = SnapshotGraph::new();
    let a = graph.add_node(&[]);
    let b = graph.add_node(&[]);
    let c = graph.add_node(&[]);
    graph.add_relationship(a, R1, b);
    let r2 = graph.add_relationship(b, R2, c);

    let mut builder = StateGraphBuilder::new();
    let s0 = builder.new_start_state();
    let s1 = builder.new_final_state();
    builder.add_relationship_expansion(s0, s1, any_rel(), None, Direction::Outgoing, any_node());
    let states = builder.build();

    let mut cursor = ProductGraphTraversalCursor::new(
        &states,
        graph.relationship_cursor(),
        Arc::new(UnboundedTracker),
    );
    cursor.set_node_and_states(a, &[s0]).unwrap();
    // abandon the first expansion midway, reseed on another node
    cursor.set_node_and_states(b, &[s0]).unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(cursor.relationship().unwrap().map(|rel| rel.id), Some(r2));
    assert!(!cursor.next().unwrap());
}

#[test]
fn test_contract_violations() {
    let mut graph = SnapshotGraph::new();
    let a = graph.add_node(&[]);

    let mut builder = StateGraphBuilder::new();
    let s0 = builder.new_start_state();
    builder.add_juxtaposition(s0, s0, any_node());
    let states = builder.build();

    let mut cursor = ProductGraphTraversalCursor::new(
        &states,
        graph.relationship_cursor(),
        Arc::new(UnboundedTracker),
    );
    assert!(matches!(
        cursor.next(),
        Err(GraphCursorError::ContractViolation(_))
    ));

    cursor.set_node_and_states(a, &[s0]).unwrap();
    assert!(matches!(
        cursor.target_state(),
        Err(GraphCursorError::ContractViolation(_))
    ));
    while cursor.next().unwrap() {}
    assert!(matches!(
        cursor.relationship(),
        Err(GraphCursorError::ContractViolation(_))
    ));
}

#[test]
fn test_batching_equivalence_on_random_automata() {
    let generated = build_graph(
        GraphTopology::Random { edge_count: 200 },
        40,
        DEFAULT_SEED,
    );
    let mut rng = StdRng::seed_from_u64(DEFAULT_SEED ^ 0xA5A5);

    for round in 0..8 {
        let mut builder = StateGraphBuilder::new();
        let ids: Vec<StateId> = (0..5)
            .map(|i| {
                if i == 0 {
                    builder.new_start_state()
                } else if i == 4 {
                    builder.new_final_state()
                } else {
                    builder.new_state()
                }
            })
            .collect();
        for _ in 0..10 {
            let from = ids[rng.gen_range(0..ids.len())];
            let to = ids[rng.gen_range(0..ids.len())];
            if rng.gen_bool(0.3) {
                let parity = rng.gen_range(0..2);
                builder.add_juxtaposition(from, to, Box::new(move |n| n % 2 == parity));
            } else {
                let direction = match rng.gen_range(0..3) {
                    0 => Direction::Outgoing,
                    1 => Direction::Incoming,
                    _ => Direction::Both,
                };
                let rel_parity = rng.gen_range(0..2);
                let node_parity = rng.gen_range(0..3);
                builder.add_relationship_expansion(
                    from,
                    to,
                    Box::new(move |rel: &Relationship| rel.id % 2 == rel_parity),
                    None,
                    direction,
                    Box::new(move |n| n % 3 != node_parity),
                );
            }
        }
        let states = builder.build();

        for _ in 0..10 {
            let node = generated.nodes[rng.gen_range(0..generated.nodes.len())];
            let mut seeds: Vec<StateId> = ids
                .iter()
                .copied()
                .filter(|_| rng.gen_bool(0.6))
                .collect();
            if seeds.is_empty() {
                seeds.push(ids[round % ids.len()]);
            }
            assert_batching_equivalence(&generated.graph, &states, node, &seeds);
        }
    }
}
