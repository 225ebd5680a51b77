//! Snapshot-bound graph traversal and index set-algebra cursors.
//!
//! graphcursor is the traversal core of a property-graph query-execution
//! layer. Against one consistent snapshot it answers four families of
//! questions, each through a single-threaded, pull-based cursor:
//!
//! - **Pruning BFS**: all distinct nodes within a maximum depth of a start
//!   node, each at its minimum filtered hop-count ([`bfs`])
//! - **Bidirectional shortest path**: the shortest path(s) between two nodes,
//!   searched from both ends at once ([`bidirectional`])
//! - **Product-graph traversal**: pattern-constrained expansion driven by a
//!   finite-state automaton over paths ([`product_graph`])
//! - **Set algebra**: union, intersection and subtraction over sorted index
//!   scans ([`set_algebra`])
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use graphcursor::{
//!     SnapshotGraph, UnboundedTracker, any_node, any_rel, outgoing_expander,
//! };
//!
//! let mut graph = SnapshotGraph::new();
//! let start = graph.add_node(&[]);
//! let other = graph.add_node(&[]);
//! graph.add_relationship(start, 0, other);
//!
//! let mut expander = outgoing_expander(
//!     start,
//!     None,
//!     true,
//!     5,
//!     graph.node_cursor(),
//!     graph.relationship_cursor(),
//!     any_node(),
//!     any_rel(),
//!     Arc::new(UnboundedTracker),
//! );
//! while expander.next()? {
//!     println!("{} at depth {}", expander.end_node()?, expander.depth()?);
//! }
//! # Ok::<(), graphcursor::GraphCursorError>(())
//! ```
//!
//! # Storage
//!
//! The storage engine is consumed only through the narrow traits of
//! [`storage`]: seek-by-id node cursors, per-node relationship traversal
//! cursors, and sorted index scan cursors, all bound to an already-fixed
//! snapshot. [`snapshot::SnapshotGraph`] is an in-memory implementation of
//! those seams used by the tests and benches.
//!
//! # Resource model
//!
//! Cursors keep their transient bookkeeping (seen sets, frontiers, discovery
//! maps) in memory-tracked collections reporting to an injected
//! [`memory::MemoryTracker`]; exceeding a configured ceiling surfaces as
//! [`GraphCursorError::ResourceLimit`], never as truncated results. All
//! cursors are read-only, perform no I/O of their own, and release their
//! resources deterministically on drop.

// Core public modules
pub mod bfs;
pub mod bidirectional;
pub mod errors;
pub mod memory;
pub mod product_graph;
pub mod set_algebra;
pub mod snapshot;
pub mod storage;

// Shared by benches and randomized tests
pub mod bench_utils;

// Re-export error type
pub use errors::GraphCursorError;

// Re-export storage seam types
pub use storage::{
    Direction, IndexScanCursor, NodeCursor, NodeFilter, NodeId, RelFilter, Relationship,
    RelationshipId, RelationshipTraversalCursor, SortOrder, Token, any_node, any_rel,
};

// Re-export memory accounting
pub use memory::{LimitMemoryTracker, MemoryTracker, UnboundedTracker};

// Re-export the reference snapshot
pub use snapshot::{NodeRecord, SnapshotGraph};

// Re-export cursor constructors
pub use bfs::{BfsPruningExpander, all_expander, incoming_expander, outgoing_expander};
pub use bidirectional::{BiDirectionalBfs, Path, ShortestPathIter};
pub use product_graph::{ProductGraphTraversalCursor, StateGraph, StateGraphBuilder, StateId};
pub use set_algebra::{IntersectionIndexCursor, SubtractionIndexCursor, UnionIndexCursor};
