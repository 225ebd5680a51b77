//! Set algebra over sorted index scans.
//!
//! Union, intersection and subtraction compositions over any number of
//! sorted, strictly monotonic id-producing cursors. Every composite exposes
//! the same [`IndexScanCursor`] contract it consumes, so compositions nest.
//! A composite owns its source cursors for its lifetime and closes them on
//! every exit path: explicitly through `close()` (idempotent) and implicitly
//! on drop.

use crate::errors::GraphCursorError;
use crate::storage::{IndexScanCursor, NodeId, SortOrder};

fn advance<C: IndexScanCursor>(cursor: &mut C) -> Result<Option<NodeId>, GraphCursorError> {
    if cursor.next()? {
        Ok(Some(cursor.reference()?))
    } else {
        Ok(None)
    }
}

/// Whether `head` still lags behind `target` in the given sort order.
fn lags(head: NodeId, target: NodeId, order: SortOrder) -> bool {
    match order {
        SortOrder::Ascending => head < target,
        SortOrder::Descending => head > target,
    }
}

/// Sorted union over source cursors: emits every id held by at least one
/// source, once, in the configured order.
pub struct UnionIndexCursor<C: IndexScanCursor> {
    sources: Vec<C>,
    heads: Vec<Option<NodeId>>,
    order: SortOrder,
    initialized: bool,
    current: Option<NodeId>,
    closed: bool,
}

impl<C: IndexScanCursor> UnionIndexCursor<C> {
    pub fn new(sources: Vec<C>, order: SortOrder) -> Self {
        let heads = vec![None; sources.len()];
        Self {
            sources,
            heads,
            order,
            initialized: false,
            current: None,
            closed: false,
        }
    }

    fn initialize(&mut self) -> Result<(), GraphCursorError> {
        if !self.initialized {
            for (source, head) in self.sources.iter_mut().zip(self.heads.iter_mut()) {
                *head = advance(source)?;
            }
            self.initialized = true;
        }
        Ok(())
    }

    /// The extreme head among all sources: minimum ascending, maximum
    /// descending.
    fn extreme_head(&self) -> Option<NodeId> {
        let mut extreme: Option<NodeId> = None;
        for head in self.heads.iter().flatten() {
            extreme = Some(match extreme {
                None => *head,
                Some(current) if lags(*head, current, self.order) => *head,
                Some(current) => current,
            });
        }
        extreme
    }
}

impl<C: IndexScanCursor> IndexScanCursor for UnionIndexCursor<C> {
    fn next(&mut self) -> Result<bool, GraphCursorError> {
        if self.closed {
            self.current = None;
            return Ok(false);
        }
        self.initialize()?;
        let Some(extreme) = self.extreme_head() else {
            self.current = None;
            return Ok(false);
        };
        // advance every source sitting on the emitted id so cross-source
        // duplicates collapse to one emission
        for (source, head) in self.sources.iter_mut().zip(self.heads.iter_mut()) {
            if *head == Some(extreme) {
                *head = advance(source)?;
            }
        }
        self.current = Some(extreme);
        Ok(true)
    }

    fn reference(&self) -> Result<NodeId, GraphCursorError> {
        self.current
            .ok_or_else(|| GraphCursorError::contract("reference() outside a positioned scan"))
    }

    fn close(&mut self) {
        if !self.closed {
            for source in &mut self.sources {
                source.close();
            }
            self.current = None;
            self.closed = true;
        }
    }
}

impl<C: IndexScanCursor> Drop for UnionIndexCursor<C> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Sorted intersection over source cursors: emits every id held by all
/// sources, in the configured order. Terminates as soon as any source is
/// exhausted; zero sources yield nothing.
pub struct IntersectionIndexCursor<C: IndexScanCursor> {
    sources: Vec<C>,
    heads: Vec<Option<NodeId>>,
    order: SortOrder,
    initialized: bool,
    exhausted: bool,
    current: Option<NodeId>,
    closed: bool,
}

impl<C: IndexScanCursor> IntersectionIndexCursor<C> {
    pub fn new(sources: Vec<C>, order: SortOrder) -> Self {
        let heads = vec![None; sources.len()];
        Self {
            sources,
            heads,
            order,
            initialized: false,
            exhausted: false,
            current: None,
            closed: false,
        }
    }

    /// The head every source must reach before an id can be emitted: the
    /// furthest head in the sort order.
    fn furthest_head(&self) -> Option<NodeId> {
        let mut furthest: Option<NodeId> = None;
        for head in self.heads.iter().flatten() {
            furthest = Some(match furthest {
                None => *head,
                Some(current) if lags(current, *head, self.order) => *head,
                Some(current) => current,
            });
        }
        furthest
    }
}

impl<C: IndexScanCursor> IndexScanCursor for IntersectionIndexCursor<C> {
    fn next(&mut self) -> Result<bool, GraphCursorError> {
        if self.closed || self.exhausted || self.sources.is_empty() {
            self.current = None;
            return Ok(false);
        }
        if !self.initialized {
            for (source, head) in self.sources.iter_mut().zip(self.heads.iter_mut()) {
                *head = advance(source)?;
            }
            self.initialized = true;
        }
        loop {
            let Some(target) = self.furthest_head() else {
                self.exhausted = true;
                self.current = None;
                return Ok(false);
            };
            let mut aligned = true;
            for (source, head) in self.sources.iter_mut().zip(self.heads.iter_mut()) {
                loop {
                    match *head {
                        Some(id) if lags(id, target, self.order) => *head = advance(source)?,
                        _ => break,
                    }
                }
                match *head {
                    None => {
                        self.exhausted = true;
                        self.current = None;
                        return Ok(false);
                    }
                    Some(id) if id != target => aligned = false,
                    _ => {}
                }
            }
            if aligned {
                for (source, head) in self.sources.iter_mut().zip(self.heads.iter_mut()) {
                    *head = advance(source)?;
                }
                self.current = Some(target);
                return Ok(true);
            }
        }
    }

    fn reference(&self) -> Result<NodeId, GraphCursorError> {
        self.current
            .ok_or_else(|| GraphCursorError::contract("reference() outside a positioned scan"))
    }

    fn close(&mut self) {
        if !self.closed {
            for source in &mut self.sources {
                source.close();
            }
            self.current = None;
            self.closed = true;
        }
    }
}

impl<C: IndexScanCursor> Drop for IntersectionIndexCursor<C> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Sorted subtraction: every id held by at least one positive source and no
/// negative source, in the configured order. An empty negative list
/// degenerates to a plain union of the positives.
pub struct SubtractionIndexCursor<C: IndexScanCursor> {
    positives: UnionIndexCursor<C>,
    negatives: Vec<C>,
    negative_heads: Vec<Option<NodeId>>,
    order: SortOrder,
    negatives_initialized: bool,
    current: Option<NodeId>,
    closed: bool,
}

impl<C: IndexScanCursor> SubtractionIndexCursor<C> {
    pub fn new(positives: Vec<C>, negatives: Vec<C>, order: SortOrder) -> Self {
        let negative_heads = vec![None; negatives.len()];
        Self {
            positives: UnionIndexCursor::new(positives, order),
            negatives,
            negative_heads,
            order,
            negatives_initialized: false,
            current: None,
            closed: false,
        }
    }
}

impl<C: IndexScanCursor> IndexScanCursor for SubtractionIndexCursor<C> {
    fn next(&mut self) -> Result<bool, GraphCursorError> {
        if self.closed {
            self.current = None;
            return Ok(false);
        }
        if !self.negatives_initialized {
            for (source, head) in self.negatives.iter_mut().zip(self.negative_heads.iter_mut()) {
                *head = advance(source)?;
            }
            self.negatives_initialized = true;
        }
        while self.positives.next()? {
            let candidate = self.positives.reference()?;
            let mut suppressed = false;
            for (source, head) in self.negatives.iter_mut().zip(self.negative_heads.iter_mut()) {
                loop {
                    match *head {
                        Some(id) if lags(id, candidate, self.order) => *head = advance(source)?,
                        _ => break,
                    }
                }
                if *head == Some(candidate) {
                    suppressed = true;
                }
            }
            if !suppressed {
                self.current = Some(candidate);
                return Ok(true);
            }
        }
        self.current = None;
        Ok(false)
    }

    fn reference(&self) -> Result<NodeId, GraphCursorError> {
        self.current
            .ok_or_else(|| GraphCursorError::contract("reference() outside a positioned scan"))
    }

    fn close(&mut self) {
        if !self.closed {
            self.positives.close();
            for source in &mut self.negatives {
                source.close();
            }
            self.current = None;
            self.closed = true;
        }
    }
}

impl<C: IndexScanCursor> Drop for SubtractionIndexCursor<C> {
    fn drop(&mut self) {
        self.close();
    }
}
