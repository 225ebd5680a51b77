//! Bidirectional shortest-path search.
//!
//! Two breadth-first searches, one centered on the source node and one on the
//! target node, expanded one level per round until their reached sets
//! intersect. Any node in the intersection sits on a shortest path, at
//! distance source-side depth + target-side depth. The target side expands
//! with the logically reversed direction so both sides agree on the same
//! directed edges.
//!
//! The search structure is built once per shortest-path pattern and reused
//! across input rows: [`BiDirectionalBfs::reset_for_new_row`] clears the
//! level sets and discovery maps in place without reallocating them.
//!
//! Each discovered node keeps the list of (relationship, previous node) steps
//! that reached it at its discovery depth. Paths are retraced from every
//! meeting node by walking the source-side steps backward and the target-side
//! steps forward, one combination at a time.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::GraphCursorError;
use crate::memory::{MemoryTracker, TrackedHashMap, TrackedHashSet, TrackedVec};
use crate::storage::{
    Direction, NodeCursor, NodeFilter, NodeId, RelFilter, RelationshipId,
    RelationshipTraversalCursor, Token, any_node, any_rel,
};

/// A path through the graph: alternating nodes and relationships.
///
/// `nodes.len() == relationships.len() + 1`; the path length is the number of
/// relationships.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path {
    pub nodes: Vec<NodeId>,
    pub relationships: Vec<RelationshipId>,
}

impl Path {
    /// Zero-length path consisting of a single node.
    pub fn single(node: NodeId) -> Self {
        Self {
            nodes: vec![node],
            relationships: Vec::new(),
        }
    }

    pub fn length(&self) -> usize {
        self.relationships.len()
    }
}

/// One step of the retrace data: the relationship that discovered a node and
/// the node it was discovered from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PathTraceStep {
    rel: RelationshipId,
    prev_node: NodeId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SearchState {
    NotInitialized,
    ReadyToSearch,
    Consumed,
}

/// One side of the bidirectional search.
struct BfsSide {
    start: NodeId,
    depth: u32,
    current_level: TrackedHashSet<NodeId>,
    next_level: TrackedHashSet<NodeId>,
    trace: TrackedHashMap<NodeId, TrackedVec<PathTraceStep>>,
    tracker: Arc<dyn MemoryTracker>,
}

impl BfsSide {
    fn new(tracker: Arc<dyn MemoryTracker>) -> Self {
        Self {
            start: -1,
            depth: 0,
            current_level: TrackedHashSet::new(tracker.clone()),
            next_level: TrackedHashSet::new(tracker.clone()),
            trace: TrackedHashMap::new(tracker.clone()),
            tracker,
        }
    }

    fn reset(&mut self, start: NodeId) -> Result<(), GraphCursorError> {
        self.start = start;
        self.depth = 0;
        self.current_level.clear();
        self.next_level.clear();
        self.trace.clear();
        self.current_level.insert(start)?;
        Ok(())
    }

    fn has_seen(&self, node: NodeId) -> bool {
        self.trace.contains_key(&node)
    }

    /// Record the discovery of `found` from `current` if it qualifies for the
    /// next level. In all-paths mode an arrival at a node already discovered
    /// in this same level records an additional step.
    fn add_if_qualifies(
        &mut self,
        current: NodeId,
        found: NodeId,
        rel: RelationshipId,
        node_filter: &NodeFilter<'_>,
        single_path: bool,
    ) -> Result<bool, GraphCursorError> {
        let step = PathTraceStep {
            rel,
            prev_node: current,
        };
        if !self.has_seen(found) && node_filter(found) {
            self.next_level.insert(found)?;
            let mut steps = TrackedVec::new(self.tracker.clone());
            steps.push(step)?;
            self.trace.insert(found, steps)?;
            return Ok(true);
        }
        if !single_path && self.next_level.contains(&found) {
            // found again at the same level from a different step: another
            // shortest path into `found`
            if let Some(steps) = self.trace.get_mut(&found) {
                steps.push(step)?;
            }
            return Ok(true);
        }
        Ok(false)
    }

    fn advance_level(&mut self) {
        std::mem::swap(&mut self.current_level, &mut self.next_level);
        self.next_level.clear();
        self.depth += 1;
    }
}

enum ExpandOutcome {
    /// The expanding side had an empty level: the nodes are disconnected.
    Disconnected,
    /// Single-path mode found the first meeting node mid-level.
    FoundFirst(NodeId),
    /// The level was fully expanded and advanced; the caller intersects.
    LevelComplete,
}

/// Expand one level of `side`, discovering nodes through `rel_cursor`.
///
/// In single-path mode the expansion stops at the first node also present in
/// the other side's current level; otherwise the level is always completed so
/// every meeting node at this distance is captured.
#[allow(clippy::too_many_arguments)]
fn expand_level<N, R>(
    side: &mut BfsSide,
    other_level: &TrackedHashSet<NodeId>,
    node_cursor: &mut N,
    rel_cursor: &mut R,
    direction: Direction,
    types: Option<&[Token]>,
    node_filter: &NodeFilter<'_>,
    rel_filter: &RelFilter<'_>,
    single_path: bool,
) -> Result<ExpandOutcome, GraphCursorError>
where
    N: NodeCursor,
    R: RelationshipTraversalCursor,
{
    if side.current_level.is_empty() {
        return Ok(ExpandOutcome::Disconnected);
    }
    let level: Vec<NodeId> = side.current_level.iter().copied().collect();
    for current in level {
        if !node_cursor.seek(current)? {
            return Err(GraphCursorError::storage(format!(
                "node {current} was unexpectedly missing from the snapshot"
            )));
        }
        rel_cursor.init(current, direction, types)?;
        while rel_cursor.next()? {
            let rel = rel_cursor.relationship();
            if !rel_filter(&rel) {
                continue;
            }
            let found = rel.other_node(current);
            if side.add_if_qualifies(current, found, rel.id, node_filter, single_path)?
                && single_path
                && other_level.contains(&found)
            {
                side.depth += 1;
                return Ok(ExpandOutcome::FoundFirst(found));
            }
        }
    }
    side.advance_level();
    Ok(ExpandOutcome::LevelComplete)
}

/// Reusable bidirectional shortest-path search.
///
/// Configured once with direction, optional type filter, maximum total path
/// length and single- vs. all-shortest-paths mode;
/// [`Self::reset_for_new_row`] binds it to a (source, target) pair and the
/// per-row predicates, and must be called before every query.
pub struct BiDirectionalBfs<'f, N, R> {
    node_cursor: N,
    rel_cursor: R,
    direction: Direction,
    types: Option<Vec<Token>>,
    max_depth: u32,
    single_path: bool,
    allow_zero_length: bool,
    node_filter: NodeFilter<'f>,
    rel_filter: RelFilter<'f>,
    source: BfsSide,
    target: BfsSide,
    state: SearchState,
    tracker: Arc<dyn MemoryTracker>,
}

impl<'f, N, R> BiDirectionalBfs<'f, N, R>
where
    N: NodeCursor,
    R: RelationshipTraversalCursor,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        direction: Direction,
        types: Option<&[Token]>,
        max_depth: u32,
        single_path: bool,
        allow_zero_length: bool,
        node_cursor: N,
        rel_cursor: R,
        tracker: Arc<dyn MemoryTracker>,
    ) -> Self {
        Self {
            node_cursor,
            rel_cursor,
            direction,
            types: types.map(<[Token]>::to_vec),
            max_depth,
            single_path,
            allow_zero_length,
            node_filter: any_node(),
            rel_filter: any_rel(),
            source: BfsSide::new(tracker.clone()),
            target: BfsSide::new(tracker.clone()),
            state: SearchState::NotInitialized,
            tracker,
        }
    }

    /// Bind the search to a new (source, target) pair and per-row predicates.
    /// Clears every internal buffer in place; must be called before each call
    /// to [`Self::shortest_paths`].
    pub fn reset_for_new_row(
        &mut self,
        source: NodeId,
        target: NodeId,
        node_filter: NodeFilter<'f>,
        rel_filter: RelFilter<'f>,
    ) -> Result<(), GraphCursorError> {
        self.node_filter = node_filter;
        self.rel_filter = rel_filter;
        self.source.reset(source)?;
        self.target.reset(target)?;
        self.state = SearchState::ReadyToSearch;
        Ok(())
    }

    /// Run the search and return an iterator over the shortest path(s).
    /// Empty when source and target are disconnected or the shortest path is
    /// longer than the configured maximum.
    pub fn shortest_paths(&mut self) -> Result<ShortestPathIter<'_>, GraphCursorError> {
        if self.state != SearchState::ReadyToSearch {
            return Err(GraphCursorError::contract(
                "shortest_paths() requires reset_for_new_row() before every search",
            ));
        }
        self.state = SearchState::Consumed;

        if self.source.start == self.target.start {
            return self.source_equals_target();
        }

        let mut meeting: Vec<NodeId> = Vec::new();
        let mut rounds = 0;
        loop {
            if rounds == self.max_depth {
                break;
            }
            rounds += 1;
            // greedily expand the side that has seen fewer nodes; any node on
            // a shortest path is seen no matter which side expands
            let expand_source = self.source.current_level.len() <= self.target.current_level.len();
            let outcome = if expand_source {
                expand_level(
                    &mut self.source,
                    &self.target.current_level,
                    &mut self.node_cursor,
                    &mut self.rel_cursor,
                    self.direction,
                    self.types.as_deref(),
                    &self.node_filter,
                    &self.rel_filter,
                    self.single_path,
                )?
            } else {
                expand_level(
                    &mut self.target,
                    &self.source.current_level,
                    &mut self.node_cursor,
                    &mut self.rel_cursor,
                    self.direction.reversed(),
                    self.types.as_deref(),
                    &self.node_filter,
                    &self.rel_filter,
                    self.single_path,
                )?
            };
            match outcome {
                ExpandOutcome::Disconnected => break,
                ExpandOutcome::FoundFirst(node) => {
                    meeting.push(node);
                    break;
                }
                ExpandOutcome::LevelComplete => {
                    let (expanded, other) = if expand_source {
                        (&self.source, &self.target)
                    } else {
                        (&self.target, &self.source)
                    };
                    meeting.extend(
                        expanded
                            .current_level
                            .iter()
                            .copied()
                            .filter(|node| other.current_level.contains(node)),
                    );
                    if !meeting.is_empty() {
                        break;
                    }
                }
            }
        }

        if self.single_path {
            meeting.truncate(1);
        }
        Ok(ShortestPathIter {
            source_trace: &self.source.trace,
            target_trace: &self.target.trace,
            source_depth: self.source.depth,
            target_depth: self.target.depth,
            meeting,
            meeting_pos: 0,
            pending: TrackedVec::new(self.tracker.clone()),
            single_path: self.single_path,
            yielded: false,
        })
    }

    /// Source and target are the same node: yield the zero-length path when
    /// allowed, otherwise every qualifying self-loop as a length-1 path.
    /// Neither case runs the general search.
    fn source_equals_target(&mut self) -> Result<ShortestPathIter<'_>, GraphCursorError> {
        let node = self.source.start;
        let mut pending = TrackedVec::new(self.tracker.clone());
        if self.allow_zero_length {
            pending.push(Path::single(node))?;
        } else if self.max_depth > 0 {
            self.rel_cursor
                .init(node, self.direction, self.types.as_deref())?;
            while self.rel_cursor.next()? {
                let rel = self.rel_cursor.relationship();
                if rel.is_loop() && (self.rel_filter)(&rel) {
                    pending.push(Path {
                        nodes: vec![node, node],
                        relationships: vec![rel.id],
                    })?;
                    if self.single_path {
                        break;
                    }
                }
            }
        }
        Ok(ShortestPathIter {
            source_trace: &self.source.trace,
            target_trace: &self.target.trace,
            source_depth: 0,
            target_depth: 0,
            meeting: Vec::new(),
            meeting_pos: 0,
            pending,
            single_path: self.single_path,
            yielded: false,
        })
    }
}

/// Lazy iterator over the shortest paths of one search.
///
/// Paths are retraced per meeting node on demand; the order of paths within
/// one search is unspecified.
pub struct ShortestPathIter<'a> {
    source_trace: &'a TrackedHashMap<NodeId, TrackedVec<PathTraceStep>>,
    target_trace: &'a TrackedHashMap<NodeId, TrackedVec<PathTraceStep>>,
    source_depth: u32,
    target_depth: u32,
    meeting: Vec<NodeId>,
    meeting_pos: usize,
    pending: TrackedVec<Path>,
    single_path: bool,
    yielded: bool,
}

impl ShortestPathIter<'_> {
    /// The next shortest path, or `None` once exhausted.
    pub fn next_path(&mut self) -> Result<Option<Path>, GraphCursorError> {
        loop {
            if self.single_path && self.yielded {
                return Ok(None);
            }
            if let Some(path) = self.pending.pop() {
                self.yielded = true;
                return Ok(Some(path));
            }
            if self.meeting_pos >= self.meeting.len() {
                return Ok(None);
            }
            let meeting = self.meeting[self.meeting_pos];
            self.meeting_pos += 1;
            self.retrace(meeting)?;
        }
    }

    /// Enumerate every path through `meeting` into the pending buffer.
    fn retrace(&mut self, meeting: NodeId) -> Result<(), GraphCursorError> {
        let source_chains = trace_chains(
            self.source_trace,
            meeting,
            self.source_depth,
            self.single_path,
        )?;
        let target_chains = trace_chains(
            self.target_trace,
            meeting,
            self.target_depth,
            self.single_path,
        )?;
        for (source_nodes, source_rels) in &source_chains {
            for (target_nodes, target_rels) in &target_chains {
                let mut nodes = source_nodes.clone();
                let mut relationships = source_rels.clone();
                // target chains run target -> meeting; append them reversed,
                // skipping the shared meeting node
                for node in target_nodes.iter().rev().skip(1) {
                    nodes.push(*node);
                }
                for rel in target_rels.iter().rev() {
                    relationships.push(*rel);
                }
                self.pending.push(Path {
                    nodes,
                    relationships,
                })?;
                if self.single_path {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

/// All chains from a side's start node to `node`, walking `depth` trace steps
/// backward. Chains are returned start-first.
fn trace_chains(
    trace: &TrackedHashMap<NodeId, TrackedVec<PathTraceStep>>,
    node: NodeId,
    depth: u32,
    single_path: bool,
) -> Result<Vec<(Vec<NodeId>, Vec<RelationshipId>)>, GraphCursorError> {
    if depth == 0 {
        return Ok(vec![(vec![node], Vec::new())]);
    }
    let steps = trace.get(&node).ok_or_else(|| {
        GraphCursorError::contract(format!("no trace steps recorded for node {node}"))
    })?;
    let mut chains = Vec::new();
    for step in steps.iter() {
        for (mut nodes, mut rels) in trace_chains(trace, step.prev_node, depth - 1, single_path)? {
            nodes.push(node);
            rels.push(step.rel);
            chains.push((nodes, rels));
            if single_path {
                return Ok(chains);
            }
        }
    }
    Ok(chains)
}
