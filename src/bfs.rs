//! Depth-pruned, deduplicating breadth-first expansion.
//!
//! A [`BfsPruningExpander`] produces, lazily and exactly once per node, every
//! node reachable from a start node within a maximum depth, in non-decreasing
//! depth order. It does not enumerate paths: a node is emitted at its minimum
//! filtered hop-count and never again, which is what variable-length pattern
//! expansion with distinct end-nodes needs.
//!
//! Usage:
//!
//! ```rust
//! use std::sync::Arc;
//! use graphcursor::{SnapshotGraph, UnboundedTracker, outgoing_expander, any_node, any_rel};
//!
//! let mut graph = SnapshotGraph::new();
//! let a = graph.add_node(&[]);
//! let b = graph.add_node(&[]);
//! graph.add_relationship(a, 0, b);
//!
//! let mut expander = outgoing_expander(
//!     a,
//!     None,
//!     true,
//!     3,
//!     graph.node_cursor(),
//!     graph.relationship_cursor(),
//!     any_node(),
//!     any_rel(),
//!     Arc::new(UnboundedTracker),
//! );
//! while expander.next().unwrap() {
//!     let _ = (expander.end_node().unwrap(), expander.depth().unwrap());
//! }
//! ```

use std::sync::Arc;

use crate::errors::GraphCursorError;
use crate::memory::{MemoryTracker, TrackedHashSet, TrackedVec};
use crate::storage::{
    Direction, NodeCursor, NodeFilter, NodeId, RelFilter, RelationshipTraversalCursor, Token,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Init,
    Expanding,
    Exhausted,
}

/// Single-source, depth-limited, deduplicated BFS frontier producer.
///
/// Non-restartable: once exhausted, a new expander must be constructed. The
/// node filter is not applied to the start node itself. When the start node is
/// not included it is also not pre-marked as seen, so a returning walk may
/// legitimately re-discover and emit it at a depth greater than zero.
pub struct BfsPruningExpander<'f, N, R> {
    node_cursor: N,
    rel_cursor: R,
    start: NodeId,
    direction: Direction,
    types: Option<Vec<Token>>,
    include_start: bool,
    max_depth: u32,
    node_filter: NodeFilter<'f>,
    rel_filter: RelFilter<'f>,
    seen: TrackedHashSet<NodeId>,
    current_frontier: TrackedVec<NodeId>,
    next_frontier: TrackedVec<NodeId>,
    frontier_depth: u32,
    scan_pos: usize,
    origin: NodeId,
    scanning: bool,
    stage: Stage,
    position: Option<(NodeId, u32)>,
}

/// Expander following relationships in their stored direction.
#[allow(clippy::too_many_arguments)]
pub fn outgoing_expander<'f, N, R>(
    start: NodeId,
    types: Option<&[Token]>,
    include_start: bool,
    max_depth: u32,
    node_cursor: N,
    rel_cursor: R,
    node_filter: NodeFilter<'f>,
    rel_filter: RelFilter<'f>,
    tracker: Arc<dyn MemoryTracker>,
) -> BfsPruningExpander<'f, N, R>
where
    N: NodeCursor,
    R: RelationshipTraversalCursor,
{
    BfsPruningExpander::new(
        start,
        Direction::Outgoing,
        types,
        include_start,
        max_depth,
        node_cursor,
        rel_cursor,
        node_filter,
        rel_filter,
        tracker,
    )
}

/// Expander following relationships against their stored direction.
#[allow(clippy::too_many_arguments)]
pub fn incoming_expander<'f, N, R>(
    start: NodeId,
    types: Option<&[Token]>,
    include_start: bool,
    max_depth: u32,
    node_cursor: N,
    rel_cursor: R,
    node_filter: NodeFilter<'f>,
    rel_filter: RelFilter<'f>,
    tracker: Arc<dyn MemoryTracker>,
) -> BfsPruningExpander<'f, N, R>
where
    N: NodeCursor,
    R: RelationshipTraversalCursor,
{
    BfsPruningExpander::new(
        start,
        Direction::Incoming,
        types,
        include_start,
        max_depth,
        node_cursor,
        rel_cursor,
        node_filter,
        rel_filter,
        tracker,
    )
}

/// Expander ignoring relationship direction.
#[allow(clippy::too_many_arguments)]
pub fn all_expander<'f, N, R>(
    start: NodeId,
    types: Option<&[Token]>,
    include_start: bool,
    max_depth: u32,
    node_cursor: N,
    rel_cursor: R,
    node_filter: NodeFilter<'f>,
    rel_filter: RelFilter<'f>,
    tracker: Arc<dyn MemoryTracker>,
) -> BfsPruningExpander<'f, N, R>
where
    N: NodeCursor,
    R: RelationshipTraversalCursor,
{
    BfsPruningExpander::new(
        start,
        Direction::Both,
        types,
        include_start,
        max_depth,
        node_cursor,
        rel_cursor,
        node_filter,
        rel_filter,
        tracker,
    )
}

impl<'f, N, R> BfsPruningExpander<'f, N, R>
where
    N: NodeCursor,
    R: RelationshipTraversalCursor,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        start: NodeId,
        direction: Direction,
        types: Option<&[Token]>,
        include_start: bool,
        max_depth: u32,
        node_cursor: N,
        rel_cursor: R,
        node_filter: NodeFilter<'f>,
        rel_filter: RelFilter<'f>,
        tracker: Arc<dyn MemoryTracker>,
    ) -> Self {
        Self {
            node_cursor,
            rel_cursor,
            start,
            direction,
            types: types.map(<[Token]>::to_vec),
            include_start,
            max_depth,
            node_filter,
            rel_filter,
            seen: TrackedHashSet::new(tracker.clone()),
            current_frontier: TrackedVec::new(tracker.clone()),
            next_frontier: TrackedVec::new(tracker),
            frontier_depth: 0,
            scan_pos: 0,
            origin: start,
            scanning: false,
            stage: Stage::Init,
            position: None,
        }
    }

    /// Advance to the next (node, depth) emission. False once exhausted.
    pub fn next(&mut self) -> Result<bool, GraphCursorError> {
        match self.stage {
            Stage::Init => {
                if !self.node_cursor.seek(self.start)? {
                    self.stage = Stage::Exhausted;
                    return Err(GraphCursorError::storage(format!(
                        "start node {} not found in snapshot",
                        self.start
                    )));
                }
                self.current_frontier.push(self.start)?;
                self.frontier_depth = 0;
                self.stage = Stage::Expanding;
                if self.include_start {
                    self.seen.insert(self.start)?;
                    self.position = Some((self.start, 0));
                    return Ok(true);
                }
            }
            Stage::Expanding => {}
            Stage::Exhausted => {
                self.position = None;
                return Ok(false);
            }
        }

        self.position = None;
        loop {
            if self.scanning {
                while self.rel_cursor.next()? {
                    let rel = self.rel_cursor.relationship();
                    if !(self.rel_filter)(&rel) {
                        continue;
                    }
                    let other = rel.other_node(self.origin);
                    // the seen check gates emission, not traversal: self-loops
                    // and parallel edges fall out here
                    if self.seen.contains(&other) {
                        continue;
                    }
                    if !(self.node_filter)(other) {
                        continue;
                    }
                    self.seen.insert(other)?;
                    let depth = self.frontier_depth + 1;
                    if depth < self.max_depth {
                        self.next_frontier.push(other)?;
                    }
                    self.position = Some((other, depth));
                    return Ok(true);
                }
                self.scanning = false;
            }

            if self.frontier_depth >= self.max_depth {
                self.stage = Stage::Exhausted;
                return Ok(false);
            }

            if self.scan_pos < self.current_frontier.len() {
                self.origin = self.current_frontier.as_slice()[self.scan_pos];
                self.scan_pos += 1;
                self.rel_cursor
                    .init(self.origin, self.direction, self.types.as_deref())?;
                self.scanning = true;
                continue;
            }

            if self.next_frontier.is_empty() {
                self.stage = Stage::Exhausted;
                return Ok(false);
            }
            std::mem::swap(&mut self.current_frontier, &mut self.next_frontier);
            self.next_frontier.clear();
            self.scan_pos = 0;
            self.frontier_depth += 1;
        }
    }

    /// The node of the current emission. Valid only between a true-returning
    /// `next()` and the following call.
    pub fn end_node(&self) -> Result<NodeId, GraphCursorError> {
        self.position
            .map(|(node, _)| node)
            .ok_or_else(|| GraphCursorError::contract("end_node() outside a positioned expansion"))
    }

    /// The depth of the current emission, under the same validity window as
    /// [`Self::end_node`].
    pub fn depth(&self) -> Result<u32, GraphCursorError> {
        self.position
            .map(|(_, depth)| depth)
            .ok_or_else(|| GraphCursorError::contract("depth() outside a positioned expansion"))
    }
}
