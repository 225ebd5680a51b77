//! Lazy expansion of one (node, state-set) product-graph vertex.

use std::sync::Arc;

use crate::errors::GraphCursorError;
use crate::memory::{MemoryTracker, TrackedHashSet};
use crate::storage::{
    Direction, NodeId, Relationship, RelationshipId, RelationshipTraversalCursor, Token,
};

use super::state::{StateGraph, StateId};

/// One physical relationship scan shared by every seed-state expansion with
/// the same (direction, type-set) requirement.
struct ScanGroup {
    direction: Direction,
    types: Option<Vec<Token>>,
    members: Vec<(StateId, usize)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Unseeded,
    Juxtapositions,
    Expansions,
    Exhausted,
}

/// Cursor over the outgoing product-graph edges of one node paired with a set
/// of automaton states.
///
/// Seeded with [`Self::set_node_and_states`], it first yields every
/// juxtaposition whose node predicate accepts the node (outcome: no
/// relationship, target state), then every relationship expansion outcome.
/// Expansions from all seed states sharing a (direction, type-set)
/// requirement share one physical scan, and each distinct
/// (relationship-or-juxtaposition, target-state) outcome is yielded exactly
/// once per seed, so expanding with states {A, B} in one call equals the
/// union of expanding {A} and {B} separately.
///
/// The relationship cursor is reused across seeds; the automaton is borrowed
/// and never mutated.
pub struct ProductGraphTraversalCursor<'g, R> {
    state_graph: &'g StateGraph<'g>,
    rel_cursor: R,
    node: NodeId,
    seeds: Vec<StateId>,
    scan_groups: Vec<ScanGroup>,
    emitted: TrackedHashSet<(Option<RelationshipId>, StateId)>,
    phase: Phase,
    seed_pos: usize,
    jux_pos: usize,
    group_pos: usize,
    member_pos: usize,
    scanning: bool,
    current_rel: Option<Relationship>,
    position: Option<(Option<Relationship>, StateId)>,
}

impl<'g, R> ProductGraphTraversalCursor<'g, R>
where
    R: RelationshipTraversalCursor,
{
    pub fn new(
        state_graph: &'g StateGraph<'g>,
        rel_cursor: R,
        tracker: Arc<dyn MemoryTracker>,
    ) -> Self {
        Self {
            state_graph,
            rel_cursor,
            node: -1,
            seeds: Vec::new(),
            scan_groups: Vec::new(),
            emitted: TrackedHashSet::new(tracker),
            phase: Phase::Unseeded,
            seed_pos: 0,
            jux_pos: 0,
            group_pos: 0,
            member_pos: 0,
            scanning: false,
            current_rel: None,
            position: None,
        }
    }

    /// Seed (or reseed) the cursor, fully discarding prior iteration
    /// progress. Scan groups are recomputed so that expansions with the same
    /// (direction, type-set) requirement share one physical scan.
    pub fn set_node_and_states(
        &mut self,
        node: NodeId,
        states: &[StateId],
    ) -> Result<(), GraphCursorError> {
        self.node = node;
        self.seeds.clear();
        self.seeds.extend_from_slice(states);
        self.emitted.clear();
        self.scan_groups.clear();
        let graph = self.state_graph;
        for &seed in &self.seeds {
            for (idx, expansion) in graph.state(seed).expansions().iter().enumerate() {
                let existing = self.scan_groups.iter().position(|group| {
                    group.direction == expansion.direction()
                        && group.types.as_deref() == expansion.types()
                });
                match existing {
                    Some(group) => self.scan_groups[group].members.push((seed, idx)),
                    None => self.scan_groups.push(ScanGroup {
                        direction: expansion.direction(),
                        types: expansion.types().map(<[Token]>::to_vec),
                        members: vec![(seed, idx)],
                    }),
                }
            }
        }
        self.phase = Phase::Juxtapositions;
        self.seed_pos = 0;
        self.jux_pos = 0;
        self.group_pos = 0;
        self.member_pos = 0;
        self.scanning = false;
        self.current_rel = None;
        self.position = None;
        Ok(())
    }

    /// Advance to the next (transition, target-state) outcome. False once the
    /// expansion of the current seed is exhausted.
    pub fn next(&mut self) -> Result<bool, GraphCursorError> {
        match self.phase {
            Phase::Unseeded => {
                return Err(GraphCursorError::contract(
                    "next() before set_node_and_states()",
                ));
            }
            Phase::Exhausted => {
                self.position = None;
                return Ok(false);
            }
            Phase::Juxtapositions | Phase::Expansions => {}
        }
        self.position = None;
        let graph = self.state_graph;

        if self.phase == Phase::Juxtapositions {
            while self.seed_pos < self.seeds.len() {
                let seed = self.seeds[self.seed_pos];
                let juxtapositions = graph.state(seed).juxtapositions();
                while self.jux_pos < juxtapositions.len() {
                    let juxtaposition = &juxtapositions[self.jux_pos];
                    self.jux_pos += 1;
                    if juxtaposition.test_node(self.node)
                        && self.emitted.insert((None, juxtaposition.target()))?
                    {
                        self.position = Some((None, juxtaposition.target()));
                        return Ok(true);
                    }
                }
                self.seed_pos += 1;
                self.jux_pos = 0;
            }
            self.phase = Phase::Expansions;
            self.scanning = false;
        }

        loop {
            if self.scanning {
                loop {
                    if let Some(rel) = self.current_rel {
                        let members = &self.scan_groups[self.group_pos].members;
                        while self.member_pos < members.len() {
                            let (state, expansion_idx) = members[self.member_pos];
                            self.member_pos += 1;
                            let expansion = &graph.state(state).expansions()[expansion_idx];
                            if expansion.test_relationship(&rel)
                                && expansion.test_node(rel.other_node(self.node))
                                && self.emitted.insert((Some(rel.id), expansion.target()))?
                            {
                                self.position = Some((Some(rel), expansion.target()));
                                return Ok(true);
                            }
                        }
                    }
                    if self.rel_cursor.next()? {
                        self.current_rel = Some(self.rel_cursor.relationship());
                        self.member_pos = 0;
                    } else {
                        self.scanning = false;
                        self.current_rel = None;
                        self.group_pos += 1;
                        break;
                    }
                }
            }
            if self.group_pos >= self.scan_groups.len() {
                self.phase = Phase::Exhausted;
                return Ok(false);
            }
            let group = &self.scan_groups[self.group_pos];
            self.rel_cursor
                .init(self.node, group.direction, group.types.as_deref())?;
            self.scanning = true;
            self.current_rel = None;
            self.member_pos = 0;
        }
    }

    /// The relationship of the current outcome; `None` for a juxtaposition.
    /// Valid only between a true-returning `next()` and the following call.
    pub fn relationship(&self) -> Result<Option<Relationship>, GraphCursorError> {
        self.position
            .as_ref()
            .map(|(rel, _)| *rel)
            .ok_or_else(|| GraphCursorError::contract("relationship() outside a positioned outcome"))
    }

    /// The target state of the current outcome, under the same validity
    /// window as [`Self::relationship`].
    pub fn target_state(&self) -> Result<StateId, GraphCursorError> {
        self.position
            .as_ref()
            .map(|(_, state)| *state)
            .ok_or_else(|| GraphCursorError::contract("target_state() outside a positioned outcome"))
    }

    /// The data node of the current outcome: the far endpoint for an
    /// expansion, the seeded node itself for a juxtaposition.
    pub fn other_node(&self) -> Result<NodeId, GraphCursorError> {
        match &self.position {
            Some((Some(rel), _)) => Ok(rel.other_node(self.node)),
            Some((None, _)) => Ok(self.node),
            None => Err(GraphCursorError::contract(
                "other_node() outside a positioned outcome",
            )),
        }
    }
}
