//! Batch history.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;

use super::queue::CalculationSource;
use crate::calc::Totals;
use crate::component::ComponentRef;

/// One executed item as recorded in a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchEntry {
    pub component: ComponentRef,
    /// Graph level, absent for refs the graph does not define.
    pub level: Option<u32>,
    pub source: CalculationSource,
}

/// Snapshot of one completed drain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationBatch {
    /// Time since the orchestrator was created.
    pub timestamp: Duration,
    pub calculations: Vec<BatchEntry>,
    pub results: IndexMap<ComponentRef, Totals>,
    pub duration: Duration,
}

/// Bounded ring buffer of batches, oldest dropped first.
#[derive(Debug)]
pub struct BatchHistory {
    batches: VecDeque<Arc<CalculationBatch>>,
    capacity: usize,
}

impl BatchHistory {
    /// Create a history holding at most `capacity` batches (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            batches: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, batch: CalculationBatch) {
        while self.batches.len() >= self.capacity {
            self.batches.pop_front();
        }
        self.batches.push_back(Arc::new(batch));
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The newest `count` batches, oldest first.
    pub fn recent(&self, count: usize) -> Vec<Arc<CalculationBatch>> {
        let skip = self.batches.len().saturating_sub(count);
        self.batches.iter().skip(skip).cloned().collect()
    }

    /// Every retained batch, oldest first.
    pub fn all(&self) -> Vec<Arc<CalculationBatch>> {
        self.batches.iter().cloned().collect()
    }
}
