//! In-memory reference snapshot.
//!
//! An immutable property graph held entirely in memory, implementing every
//! storage seam of [`crate::storage`]. The production storage engine plugs
//! into the same traits; this implementation exists so the traversal core can
//! be exercised (tests, benches) without a storage engine, and doubles as the
//! executable documentation of the cursor contracts.
//!
//! Construction is two-phase: populate with `add_node` / `add_relationship`,
//! then hand out cursors. Cursors borrow the snapshot immutably, so the
//! borrow checker enforces the "already-fixed snapshot" rule for free.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::GraphCursorError;
use crate::storage::{
    Direction, IndexScanCursor, NodeCursor, NodeId, Relationship, RelationshipId,
    RelationshipTraversalCursor, SortOrder, Token,
};

/// One node of the snapshot: label tokens plus a JSON property payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub labels: Vec<Token>,
    pub properties: Value,
}

/// Immutable in-memory property graph.
#[derive(Clone, Debug, Default)]
pub struct SnapshotGraph {
    nodes: AHashMap<NodeId, NodeRecord>,
    relationships: AHashMap<RelationshipId, Relationship>,
    outgoing: AHashMap<NodeId, Vec<RelationshipId>>,
    incoming: AHashMap<NodeId, Vec<RelationshipId>>,
    label_index: AHashMap<Token, Vec<NodeId>>,
    next_node: NodeId,
    next_relationship: RelationshipId,
}

impl SnapshotGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node with the given labels and no properties.
    pub fn add_node(&mut self, labels: &[Token]) -> NodeId {
        self.add_node_with_properties(labels, Value::Null)
    }

    pub fn add_node_with_properties(&mut self, labels: &[Token], properties: Value) -> NodeId {
        let id = self.next_node;
        self.next_node += 1;
        self.nodes.insert(
            id,
            NodeRecord {
                id,
                labels: labels.to_vec(),
                properties,
            },
        );
        self.outgoing.insert(id, Vec::new());
        self.incoming.insert(id, Vec::new());
        for &label in labels {
            let ids = self.label_index.entry(label).or_default();
            // node ids are handed out in ascending order, so pushing keeps
            // each per-label index sorted
            ids.push(id);
        }
        id
    }

    /// Insert a relationship between two existing nodes.
    pub fn add_relationship(
        &mut self,
        source: NodeId,
        rel_type: Token,
        target: NodeId,
    ) -> RelationshipId {
        assert!(self.nodes.contains_key(&source), "unknown source node");
        assert!(self.nodes.contains_key(&target), "unknown target node");
        let id = self.next_relationship;
        self.next_relationship += 1;
        self.relationships
            .insert(id, Relationship::new(id, rel_type, source, target));
        self.outgoing.get_mut(&source).unwrap().push(id);
        self.incoming.get_mut(&target).unwrap().push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(&id)
    }

    pub fn relationship(&self, id: RelationshipId) -> Option<&Relationship> {
        self.relationships.get(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    /// Seek-by-id node cursor over this snapshot.
    pub fn node_cursor(&self) -> SnapshotNodeCursor<'_> {
        SnapshotNodeCursor {
            graph: self,
            current: None,
        }
    }

    /// Relationship traversal cursor over this snapshot. Reusable across many
    /// `init` calls.
    pub fn relationship_cursor(&self) -> SnapshotRelCursor<'_> {
        SnapshotRelCursor {
            graph: self,
            origin: 0,
            direction: Direction::Both,
            types: None,
            outgoing: &[],
            incoming: &[],
            out_pos: 0,
            in_pos: 0,
            current: None,
        }
    }

    /// Sorted scan over the ids carrying `label`.
    pub fn label_scan(&self, label: Token, order: SortOrder) -> SnapshotLabelScan<'_> {
        let ids: &[NodeId] = self
            .label_index
            .get(&label)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        SnapshotLabelScan {
            ids,
            order,
            pos: 0,
            current: None,
            closed: false,
        }
    }
}

/// Seek-by-id cursor over a [`SnapshotGraph`].
pub struct SnapshotNodeCursor<'g> {
    graph: &'g SnapshotGraph,
    current: Option<&'g NodeRecord>,
}

impl NodeCursor for SnapshotNodeCursor<'_> {
    fn seek(&mut self, node: NodeId) -> Result<bool, GraphCursorError> {
        self.current = self.graph.nodes.get(&node);
        Ok(self.current.is_some())
    }

    fn reference(&self) -> NodeId {
        self.current.map(|record| record.id).unwrap_or(-1)
    }

    fn has_label(&self, label: Token) -> bool {
        self.current
            .map(|record| record.labels.contains(&label))
            .unwrap_or(false)
    }
}

/// Relationship traversal cursor over a [`SnapshotGraph`].
///
/// Under [`Direction::Both`] a self-loop appears in both adjacency lists of
/// its node; the incoming pass skips loops so each relationship is yielded
/// once per scan.
pub struct SnapshotRelCursor<'g> {
    graph: &'g SnapshotGraph,
    origin: NodeId,
    direction: Direction,
    types: Option<Vec<Token>>,
    outgoing: &'g [RelationshipId],
    incoming: &'g [RelationshipId],
    out_pos: usize,
    in_pos: usize,
    current: Option<Relationship>,
}

impl SnapshotRelCursor<'_> {
    fn type_matches(&self, rel: &Relationship) -> bool {
        match &self.types {
            Some(types) => types.contains(&rel.rel_type),
            None => true,
        }
    }
}

impl RelationshipTraversalCursor for SnapshotRelCursor<'_> {
    fn init(
        &mut self,
        node: NodeId,
        direction: Direction,
        types: Option<&[Token]>,
    ) -> Result<(), GraphCursorError> {
        if !self.graph.nodes.contains_key(&node) {
            return Err(GraphCursorError::storage(format!(
                "node {node} not found in snapshot"
            )));
        }
        self.origin = node;
        self.direction = direction;
        self.types = types.map(<[Token]>::to_vec);
        self.outgoing = match direction {
            Direction::Outgoing | Direction::Both => self
                .graph
                .outgoing
                .get(&node)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
            Direction::Incoming => &[],
        };
        self.incoming = match direction {
            Direction::Incoming | Direction::Both => self
                .graph
                .incoming
                .get(&node)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
            Direction::Outgoing => &[],
        };
        self.out_pos = 0;
        self.in_pos = 0;
        self.current = None;
        Ok(())
    }

    fn next(&mut self) -> Result<bool, GraphCursorError> {
        while self.out_pos < self.outgoing.len() {
            let id = self.outgoing[self.out_pos];
            self.out_pos += 1;
            let rel = self.graph.relationships.get(&id).copied().ok_or_else(|| {
                GraphCursorError::storage(format!("relationship {id} missing from snapshot"))
            })?;
            if self.type_matches(&rel) {
                self.current = Some(rel);
                return Ok(true);
            }
        }
        while self.in_pos < self.incoming.len() {
            let id = self.incoming[self.in_pos];
            self.in_pos += 1;
            let rel = self.graph.relationships.get(&id).copied().ok_or_else(|| {
                GraphCursorError::storage(format!("relationship {id} missing from snapshot"))
            })?;
            // loops were already yielded by the outgoing pass under Both
            if self.direction == Direction::Both && rel.is_loop() {
                continue;
            }
            if self.type_matches(&rel) {
                self.current = Some(rel);
                return Ok(true);
            }
        }
        self.current = None;
        Ok(false)
    }

    fn relationship(&self) -> Relationship {
        self.current
            .expect("relationship() called outside a positioned scan")
    }

    fn origin_node(&self) -> NodeId {
        self.origin
    }
}

/// Sorted per-label index scan over a [`SnapshotGraph`].
pub struct SnapshotLabelScan<'g> {
    ids: &'g [NodeId],
    order: SortOrder,
    pos: usize,
    current: Option<NodeId>,
    closed: bool,
}

impl IndexScanCursor for SnapshotLabelScan<'_> {
    fn next(&mut self) -> Result<bool, GraphCursorError> {
        if self.closed || self.pos >= self.ids.len() {
            self.current = None;
            return Ok(false);
        }
        let index = match self.order {
            SortOrder::Ascending => self.pos,
            SortOrder::Descending => self.ids.len() - 1 - self.pos,
        };
        self.pos += 1;
        self.current = Some(self.ids[index]);
        Ok(true)
    }

    fn reference(&self) -> Result<NodeId, GraphCursorError> {
        self.current
            .ok_or_else(|| GraphCursorError::contract("reference() outside a positioned scan"))
    }

    fn close(&mut self) {
        self.closed = true;
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWS: Token = 1;
    const LIKES: Token = 2;

    #[test]
    fn test_outgoing_scan_filters_types() {
        let mut graph = SnapshotGraph::new();
        let a = graph.add_node(&[]);
        let b = graph.add_node(&[]);
        let c = graph.add_node(&[]);
        let r1 = graph.add_relationship(a, KNOWS, b);
        let _r2 = graph.add_relationship(a, LIKES, c);

        let mut cursor = graph.relationship_cursor();
        cursor.init(a, Direction::Outgoing, Some(&[KNOWS])).unwrap();
        assert!(cursor.next().unwrap());
        assert_eq!(cursor.relationship().id, r1);
        assert_eq!(cursor.relationship().other_node(a), b);
        assert!(!cursor.next().unwrap());
    }

    #[test]
    fn test_both_scan_yields_loop_once() {
        let mut graph = SnapshotGraph::new();
        let a = graph.add_node(&[]);
        let looped = graph.add_relationship(a, KNOWS, a);

        let mut cursor = graph.relationship_cursor();
        cursor.init(a, Direction::Both, None).unwrap();
        assert!(cursor.next().unwrap());
        assert_eq!(cursor.relationship().id, looped);
        assert!(cursor.relationship().is_loop());
        assert!(!cursor.next().unwrap());
    }

    #[test]
    fn test_node_cursor_seek_and_labels() {
        let mut graph = SnapshotGraph::new();
        let a = graph.add_node(&[KNOWS]);
        let mut cursor = graph.node_cursor();
        assert!(cursor.seek(a).unwrap());
        assert_eq!(cursor.reference(), a);
        assert!(cursor.has_label(KNOWS));
        assert!(!cursor.has_label(LIKES));
        assert!(!cursor.seek(a + 1).unwrap());
    }

    #[test]
    fn test_init_on_missing_node_is_storage_error() {
        let graph = SnapshotGraph::new();
        let mut cursor = graph.relationship_cursor();
        assert!(matches!(
            cursor.init(99, Direction::Outgoing, None),
            Err(GraphCursorError::StorageRead(_))
        ));
    }

    #[test]
    fn test_label_scan_orders() {
        let mut graph = SnapshotGraph::new();
        let ids: Vec<NodeId> = (0..5).map(|_| graph.add_node(&[KNOWS])).collect();

        let mut ascending = Vec::new();
        let mut scan = graph.label_scan(KNOWS, SortOrder::Ascending);
        while scan.next().unwrap() {
            ascending.push(scan.reference().unwrap());
        }
        assert_eq!(ascending, ids);

        let mut descending = Vec::new();
        let mut scan = graph.label_scan(KNOWS, SortOrder::Descending);
        while scan.next().unwrap() {
            descending.push(scan.reference().unwrap());
        }
        let mut expected = ids.clone();
        expected.reverse();
        assert_eq!(descending, expected);
    }

    #[test]
    fn test_reference_before_next_is_contract_violation() {
        let mut graph = SnapshotGraph::new();
        graph.add_node(&[KNOWS]);
        let scan = graph.label_scan(KNOWS, SortOrder::Ascending);
        assert!(matches!(
            scan.reference(),
            Err(GraphCursorError::ContractViolation(_))
        ));
    }
}
