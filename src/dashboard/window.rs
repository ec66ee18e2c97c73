use crate::snapshot::LiquiditySnapshot;
use std::collections::VecDeque;

/// Bounded, oldest-to-newest run of the most recent snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotWindow {
    items: VecDeque<LiquiditySnapshot>,
    capacity: usize,
}

impl SnapshotWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { items: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replace the contents with a polled batch (already oldest first).
    /// A batch larger than the capacity keeps its newest tail.
    pub fn replace(&mut self, batch: Vec<LiquiditySnapshot>) {
        let skip = batch.len().saturating_sub(self.capacity);
        self.items.clear();
        self.items.extend(batch.into_iter().skip(skip));
    }

    /// Append a live-inserted row, dropping the oldest entry when full.
    ///
    /// Returns `false` when a row with the same id is already in the window;
    /// a delayed notification for a row that a poll already delivered is ignored,
    /// and the caller leaves `latest` alone too.
    pub fn push_live(&mut self, snapshot: LiquiditySnapshot) -> bool {
        if self.contains_id(snapshot.id) {
            return false;
        }
        while self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(snapshot);
        true
    }

    pub fn contains_id(&self, id: i64) -> bool {
        self.items.iter().any(|s| s.id == id)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LiquiditySnapshot> + ExactSizeIterator {
        self.items.iter()
    }

    pub fn newest(&self) -> Option<&LiquiditySnapshot> {
        self.items.back()
    }

    pub fn to_vec(&self) -> Vec<LiquiditySnapshot> {
        self.items.iter().cloned().collect()
    }
}
