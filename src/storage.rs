//! Storage seams consumed by the traversal core.
//!
//! The storage/transaction engine is an external collaborator. Everything the
//! traversal cursors need from it is expressed through the three trait
//! families in this module: seek-by-id node cursors, per-node relationship
//! traversal cursors, and sorted index scan cursors. All of them are bound to
//! one consistent snapshot for their whole lifetime.

use serde::{Deserialize, Serialize};

use crate::errors::GraphCursorError;

/// Node identifier, unique within a snapshot.
pub type NodeId = i64;

/// Relationship identifier, unique within a snapshot.
pub type RelationshipId = i64;

/// Token identifying a label or relationship type.
pub type Token = i32;

/// Direction of relationship traversal relative to the origin node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

impl Direction {
    /// The logically reversed direction. `Both` is its own reverse.
    pub fn reversed(self) -> Self {
        match self {
            Direction::Outgoing => Direction::Incoming,
            Direction::Incoming => Direction::Outgoing,
            Direction::Both => Direction::Both,
        }
    }
}

/// Value snapshot of one relationship as yielded by a traversal scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    pub rel_type: Token,
    pub source: NodeId,
    pub target: NodeId,
}

impl Relationship {
    pub fn new(id: RelationshipId, rel_type: Token, source: NodeId, target: NodeId) -> Self {
        Self {
            id,
            rel_type,
            source,
            target,
        }
    }

    /// The endpoint opposite to `origin`. For a self-loop both endpoints
    /// coincide and the origin itself is returned.
    pub fn other_node(&self, origin: NodeId) -> NodeId {
        if self.source == origin {
            self.target
        } else {
            self.source
        }
    }

    pub fn is_loop(&self) -> bool {
        self.source == self.target
    }
}

/// Node predicate applied to candidate nodes along a traversal.
pub type NodeFilter<'a> = Box<dyn Fn(NodeId) -> bool + 'a>;

/// Relationship predicate applied to candidate relationships along a traversal.
pub type RelFilter<'a> = Box<dyn Fn(&Relationship) -> bool + 'a>;

/// Node filter that accepts every node.
pub fn any_node<'a>() -> NodeFilter<'a> {
    Box::new(|_| true)
}

/// Relationship filter that accepts every relationship.
pub fn any_rel<'a>() -> RelFilter<'a> {
    Box::new(|_| true)
}

/// Snapshot-bound seek-by-id node cursor.
pub trait NodeCursor {
    /// Position the cursor on `node`. Returns false when the snapshot has no
    /// such node.
    fn seek(&mut self, node: NodeId) -> Result<bool, GraphCursorError>;

    /// Id of the node the cursor is positioned on.
    fn reference(&self) -> NodeId;

    /// Whether the positioned node carries `label`.
    fn has_label(&self, label: Token) -> bool;
}

/// Snapshot-bound relationship traversal cursor: scans the relationships of
/// one node, filtered by direction and an optional type set.
///
/// A scan yields each matching relationship exactly once; in particular a
/// self-loop is yielded once even under [`Direction::Both`].
pub trait RelationshipTraversalCursor {
    /// Re-target the scan at `node`. Discards any scan in progress; the same
    /// cursor is reused across many scans.
    fn init(
        &mut self,
        node: NodeId,
        direction: Direction,
        types: Option<&[Token]>,
    ) -> Result<(), GraphCursorError>;

    /// Advance to the next matching relationship. False once the scan is
    /// exhausted.
    fn next(&mut self) -> Result<bool, GraphCursorError>;

    /// The relationship the cursor is positioned on. Valid only after a
    /// true-returning `next()`.
    fn relationship(&self) -> Relationship;

    /// The node this scan was initialized with.
    fn origin_node(&self) -> NodeId;
}

/// Sort order of an index scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Sorted, monotonic id-producing index scan cursor.
///
/// Yields ids in strictly ascending or strictly descending order, as
/// configured at creation. `reference()` is valid only immediately after a
/// true-returning `next()`.
pub trait IndexScanCursor {
    fn next(&mut self) -> Result<bool, GraphCursorError>;

    fn reference(&self) -> Result<NodeId, GraphCursorError>;

    /// Release the cursor. Idempotent; composite cursors close their sources
    /// here and on drop.
    fn close(&mut self);
}

/// Forwarding implementation so compositions over mixed cursor types can go
/// through `Box<dyn IndexScanCursor>`.
impl<C: IndexScanCursor + ?Sized> IndexScanCursor for Box<C> {
    fn next(&mut self) -> Result<bool, GraphCursorError> {
        (**self).next()
    }

    fn reference(&self) -> Result<NodeId, GraphCursorError> {
        (**self).reference()
    }

    fn close(&mut self) {
        (**self).close()
    }
}
