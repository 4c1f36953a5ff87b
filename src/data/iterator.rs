// ============================================================
// Layer 4 — Batch Iterator
// ============================================================
// Walks a partition in fixed order, handing out contiguous
// runs of samples:
//
//   start = cursor
//   end   = min(start + n, len)
//   batch = samples[start..end]
//   cursor = (start + n) mod len
//
// A batch that would run past the end is truncated rather than
// wrapped, and the cursor wraps by the full requested size.
// With 6 samples and n = 4 the batches are 0..4, 4..6, 2..6,
// 0..4, ... so a few samples are visited more often than others
// across an epoch. Training order depends on this, so it is kept.
//
// Each iterator owns its cursor; the train and test iterators
// never affect each other.

use crate::domain::partition::{Partition, SampleSlice};

/// A wrapping cursor over one partition.
#[derive(Debug, Clone)]
pub struct BatchIterator<'a> {
    partition: &'a Partition,
    cursor:    usize,
}

impl<'a> BatchIterator<'a> {
    pub fn new(partition: &'a Partition) -> Self {
        Self { partition, cursor: 0 }
    }

    /// Return the next batch of up to `n` samples and advance.
    /// An empty partition always yields an empty batch.
    pub fn next_batch(&mut self, n: usize) -> SampleSlice<'a> {
        let len = self.partition.len();
        if len == 0 {
            return self.partition.slice(0..0);
        }

        let start = self.cursor;
        let end   = start.saturating_add(n).min(len);
        self.cursor = (start + n % len) % len;
        self.partition.slice(start..end)
    }
}

#[cfg(test)]
impl<'a> BatchIterator<'a> {
    /// Start from an arbitrary sample, wrapped into range.
    pub fn starting_at(partition: &'a Partition, cursor: usize) -> Self {
        let cursor = match partition.len() {
            0   => 0,
            len => cursor % len,
        };
        Self { partition, cursor }
    }

    /// Index of the first sample of the next batch.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
