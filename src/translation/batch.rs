/*!
 * Batch planning.
 *
 * A [`BatchPlan`] cuts the index range `[start, total)` of a subtitle
 * collection into consecutive batches of a fixed size. The plan is a plain
 * value: iterating it twice yields the same batches.
 */

use anyhow::{Result, anyhow};
use std::ops::Range;

/// A contiguous run of cue indices translated with a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 1-based batch number, counted from index 0 of the collection
    pub number: usize,
    /// Cue indices covered by this batch
    pub range: Range<usize>,
}

impl Batch {
    pub fn start(&self) -> usize {
        self.range.start
    }

    pub fn end(&self) -> usize {
        self.range.end
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Partition of `[start, total)` into batches of `batch_size`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    total: usize,
    start: usize,
    batch_size: usize,
}

impl BatchPlan {
    /// Create a plan. `start` beyond `total` is clamped, a zero batch size is rejected.
    pub fn new(total: usize, start: usize, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(anyhow!("Batch size must be at least 1"));
        }

        Ok(Self {
            total,
            start: start.min(total),
            batch_size,
        })
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches the plan yields
    pub fn batch_count(&self) -> usize {
        (self.total - self.start).div_ceil(self.batch_size)
    }

    /// Iterate the batches from the start of the plan
    pub fn iter(&self) -> BatchIter {
        BatchIter {
            plan: *self,
            next: self.start,
        }
    }
}

impl IntoIterator for BatchPlan {
    type Item = Batch;
    type IntoIter = BatchIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for &BatchPlan {
    type Item = Batch;
    type IntoIter = BatchIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy iterator over the batches of a [`BatchPlan`]
#[derive(Debug, Clone)]
pub struct BatchIter {
    plan: BatchPlan,
    next: usize,
}

impl Iterator for BatchIter {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.next >= self.plan.total {
            return None;
        }

        let start = self.next;
        let end = (start + self.plan.batch_size).min(self.plan.total);
        self.next = end;

        Some(Batch {
            number: start / self.plan.batch_size + 1,
            range: start..end,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.plan.total - self.next).div_ceil(self.plan.batch_size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for BatchIter {}
