//! Automaton states and their transition lists.
//!
//! States are arena-allocated: a [`StateGraph`] owns a flat `Vec<State>` and
//! transitions refer to their target by [`StateId`] index. Cyclic automata
//! need no owning pointers this way, and (node, state) composite keys hash as
//! two plain integers.

use crate::storage::{Direction, NodeFilter, NodeId, RelFilter, Relationship, Token};

/// Index of a state in its [`StateGraph`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub usize);

impl StateId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Same-node transition: moves to `target` without consuming a relationship,
/// gated by a node predicate.
pub struct NodeJuxtaposition<'f> {
    target: StateId,
    node_filter: NodeFilter<'f>,
}

impl NodeJuxtaposition<'_> {
    pub fn target(&self) -> StateId {
        self.target
    }

    pub fn test_node(&self, node: NodeId) -> bool {
        (self.node_filter)(node)
    }
}

/// Cross-edge transition: follows one relationship matching direction and
/// type set, gated by a relationship predicate and a target-node predicate.
pub struct RelationshipExpansion<'f> {
    target: StateId,
    rel_filter: RelFilter<'f>,
    types: Option<Vec<Token>>,
    direction: Direction,
    node_filter: NodeFilter<'f>,
}

impl RelationshipExpansion<'_> {
    pub fn target(&self) -> StateId {
        self.target
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The type set this expansion scans, sorted and deduplicated; `None`
    /// matches every type.
    pub fn types(&self) -> Option<&[Token]> {
        self.types.as_deref()
    }

    pub fn test_relationship(&self, rel: &Relationship) -> bool {
        (self.rel_filter)(rel)
    }

    pub fn test_node(&self, node: NodeId) -> bool {
        (self.node_filter)(node)
    }
}

/// One automaton state: start/final flags plus its outgoing transitions.
pub struct State<'f> {
    id: StateId,
    is_start: bool,
    is_final: bool,
    juxtapositions: Vec<NodeJuxtaposition<'f>>,
    expansions: Vec<RelationshipExpansion<'f>>,
}

impl<'f> State<'f> {
    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn is_start(&self) -> bool {
        self.is_start
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn juxtapositions(&self) -> &[NodeJuxtaposition<'f>] {
        &self.juxtapositions
    }

    pub fn expansions(&self) -> &[RelationshipExpansion<'f>] {
        &self.expansions
    }
}

/// Arena of automaton states. Immutable during traversal.
pub struct StateGraph<'f> {
    states: Vec<State<'f>>,
}

impl<'f> StateGraph<'f> {
    pub fn state(&self, id: StateId) -> &State<'f> {
        &self.states[id.index()]
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn states(&self) -> impl Iterator<Item = &State<'f>> {
        self.states.iter()
    }

    pub fn start_states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.states
            .iter()
            .filter(|state| state.is_start)
            .map(|state| state.id)
    }

    pub fn final_states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.states
            .iter()
            .filter(|state| state.is_final)
            .map(|state| state.id)
    }
}

/// Builder for a [`StateGraph`]. States are created first, transitions are
/// wired afterwards; cycles are expressed by simply referring back to an
/// earlier [`StateId`].
#[derive(Default)]
pub struct StateGraphBuilder<'f> {
    states: Vec<State<'f>>,
}

impl<'f> StateGraphBuilder<'f> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_state(&mut self) -> StateId {
        self.add_state(false, false)
    }

    pub fn new_start_state(&mut self) -> StateId {
        self.add_state(true, false)
    }

    pub fn new_final_state(&mut self) -> StateId {
        self.add_state(false, true)
    }

    fn add_state(&mut self, is_start: bool, is_final: bool) -> StateId {
        let id = StateId(self.states.len());
        self.states.push(State {
            id,
            is_start,
            is_final,
            juxtapositions: Vec::new(),
            expansions: Vec::new(),
        });
        id
    }

    pub fn add_juxtaposition(&mut self, from: StateId, to: StateId, node_filter: NodeFilter<'f>) {
        self.states[from.index()]
            .juxtapositions
            .push(NodeJuxtaposition {
                target: to,
                node_filter,
            });
    }

    pub fn add_relationship_expansion(
        &mut self,
        from: StateId,
        to: StateId,
        rel_filter: RelFilter<'f>,
        types: Option<&[Token]>,
        direction: Direction,
        node_filter: NodeFilter<'f>,
    ) {
        let types = types.map(|types| {
            let mut types = types.to_vec();
            types.sort_unstable();
            types.dedup();
            types
        });
        self.states[from.index()]
            .expansions
            .push(RelationshipExpansion {
                target: to,
                rel_filter,
                types,
                direction,
                node_filter,
            });
    }

    pub fn build(self) -> StateGraph<'f> {
        StateGraph {
            states: self.states,
        }
    }
}
