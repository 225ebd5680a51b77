//! Memory accounting for cursor bookkeeping.
//!
//! Every growing structure a cursor owns (seen sets, frontiers, discovery
//! maps, path buffers) reports its allocations to an injected
//! [`MemoryTracker`] so the enclosing transaction can enforce a memory
//! ceiling. Exceeding the ceiling surfaces as
//! [`GraphCursorError::ResourceLimit`], never as silent truncation.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ahash::{AHashMap, AHashSet};

use crate::errors::GraphCursorError;

/// Memory-accounting collaborator injected into every cursor.
pub trait MemoryTracker {
    /// Record `bytes` of new bookkeeping memory. May fail when a configured
    /// ceiling would be exceeded; the allocation is then not recorded.
    fn allocate(&self, bytes: usize) -> Result<(), GraphCursorError>;

    /// Return `bytes` previously recorded with `allocate`.
    fn release(&self, bytes: usize);
}

/// Tracker that accepts every allocation and keeps no accounts.
#[derive(Debug, Default)]
pub struct UnboundedTracker;

impl MemoryTracker for UnboundedTracker {
    fn allocate(&self, _bytes: usize) -> Result<(), GraphCursorError> {
        Ok(())
    }

    fn release(&self, _bytes: usize) {}
}

/// Tracker enforcing a byte ceiling with atomic counters.
#[derive(Debug)]
pub struct LimitMemoryTracker {
    limit: usize,
    used: AtomicUsize,
    peak: AtomicUsize,
}

impl LimitMemoryTracker {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            used: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::Relaxed)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }
}

impl MemoryTracker for LimitMemoryTracker {
    fn allocate(&self, bytes: usize) -> Result<(), GraphCursorError> {
        let new_used = self.used.fetch_add(bytes, Ordering::Relaxed) + bytes;
        if new_used > self.limit {
            self.used.fetch_sub(bytes, Ordering::Relaxed);
            return Err(GraphCursorError::resource_limit(format!(
                "allocation of {} bytes exceeds limit of {} ({} in use)",
                bytes,
                self.limit,
                new_used - bytes
            )));
        }
        self.peak.fetch_max(new_used, Ordering::Relaxed);
        Ok(())
    }

    fn release(&self, bytes: usize) {
        self.used.fetch_sub(bytes, Ordering::Relaxed);
    }
}

fn set_bytes<T>(capacity: usize) -> usize {
    // open-addressed table: one slot plus one control byte per bucket
    capacity * (std::mem::size_of::<T>() + 1)
}

fn map_bytes<K, V>(capacity: usize) -> usize {
    capacity * (std::mem::size_of::<K>() + std::mem::size_of::<V>() + 1)
}

fn vec_bytes<T>(capacity: usize) -> usize {
    capacity * std::mem::size_of::<T>()
}

/// Hash set reporting capacity growth to a [`MemoryTracker`].
///
/// `clear` keeps capacity (and the reported bytes) so reusable cursors do not
/// thrash the tracker between rows; everything reported is released on drop.
pub struct TrackedHashSet<T> {
    inner: AHashSet<T>,
    tracker: Arc<dyn MemoryTracker>,
    reported: usize,
}

impl<T: Eq + std::hash::Hash> TrackedHashSet<T> {
    pub fn new(tracker: Arc<dyn MemoryTracker>) -> Self {
        Self {
            inner: AHashSet::new(),
            tracker,
            reported: 0,
        }
    }

    pub fn insert(&mut self, value: T) -> Result<bool, GraphCursorError> {
        let added = self.inner.insert(value);
        if added {
            self.report(set_bytes::<T>(self.inner.capacity()))?;
        }
        Ok(added)
    }

    pub fn contains(&self, value: &T) -> bool {
        self.inner.contains(value)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.inner.iter()
    }

    fn report(&mut self, bytes: usize) -> Result<(), GraphCursorError> {
        if bytes > self.reported {
            self.tracker.allocate(bytes - self.reported)?;
            self.reported = bytes;
        }
        Ok(())
    }
}

impl<T> Drop for TrackedHashSet<T> {
    fn drop(&mut self) {
        self.tracker.release(self.reported);
    }
}

/// Hash map reporting capacity growth to a [`MemoryTracker`].
pub struct TrackedHashMap<K, V> {
    inner: AHashMap<K, V>,
    tracker: Arc<dyn MemoryTracker>,
    reported: usize,
}

impl<K: Eq + std::hash::Hash, V> TrackedHashMap<K, V> {
    pub fn new(tracker: Arc<dyn MemoryTracker>) -> Self {
        Self {
            inner: AHashMap::new(),
            tracker,
            reported: 0,
        }
    }

    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, GraphCursorError> {
        let previous = self.inner.insert(key, value);
        self.report(map_bytes::<K, V>(self.inner.capacity()))?;
        Ok(previous)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.inner.get_mut(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.remove(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    fn report(&mut self, bytes: usize) -> Result<(), GraphCursorError> {
        if bytes > self.reported {
            self.tracker.allocate(bytes - self.reported)?;
            self.reported = bytes;
        }
        Ok(())
    }
}

impl<K, V> Drop for TrackedHashMap<K, V> {
    fn drop(&mut self) {
        self.tracker.release(self.reported);
    }
}

/// Growable buffer reporting capacity growth to a [`MemoryTracker`].
pub struct TrackedVec<T> {
    inner: Vec<T>,
    tracker: Arc<dyn MemoryTracker>,
    reported: usize,
}

impl<T> TrackedVec<T> {
    pub fn new(tracker: Arc<dyn MemoryTracker>) -> Self {
        Self {
            inner: Vec::new(),
            tracker,
            reported: 0,
        }
    }

    pub fn push(&mut self, value: T) -> Result<(), GraphCursorError> {
        self.inner.push(value);
        self.report(vec_bytes::<T>(self.inner.capacity()))?;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<T> {
        self.inner.pop()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn as_slice(&self) -> &[T] {
        &self.inner
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.inner.iter()
    }

    fn report(&mut self, bytes: usize) -> Result<(), GraphCursorError> {
        if bytes > self.reported {
            self.tracker.allocate(bytes - self.reported)?;
            self.reported = bytes;
        }
        Ok(())
    }
}

impl<T> Drop for TrackedVec<T> {
    fn drop(&mut self) {
        self.tracker.release(self.reported);
    }
}
