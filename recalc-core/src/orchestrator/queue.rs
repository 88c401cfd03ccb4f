//! Calculation Queue
//!
//! The queue holds scheduled calculations until the next drain. A pending
//! set mirrors its contents so that scheduling an already-queued component
//! is a no-op: a ref is pending if and only if exactly one entry for it is
//! queued.

use std::cmp::Reverse;
use std::collections::HashMap;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::component::{ComponentRef, ComponentType};

/// Who asked for a calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CalculationSource {
    /// An external edit.
    User,
    /// A cascade from a dependency that finished recomputing.
    Dependency,
}

/// One queued calculation request.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledCalculation {
    pub component: ComponentRef,
    pub priority: i32,
    pub source: CalculationSource,
    pub timestamp: Instant,
}

/// Queue plus pending set.
#[derive(Debug, Default)]
pub struct CalculationQueue {
    items: Vec<ScheduledCalculation>,
    pending: IndexSet<ComponentRef>,
}

impl CalculationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `item` unless its component is already pending.
    ///
    /// Returns whether the item was added.
    pub fn push(&mut self, item: ScheduledCalculation) -> bool {
        if !self.pending.insert(item.component.clone()) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_pending(&self, component: &ComponentRef) -> bool {
        self.pending.contains(component)
    }

    /// Pending refs in enqueue order.
    pub fn pending(&self) -> impl Iterator<Item = &ComponentRef> {
        self.pending.iter()
    }

    /// Remove every item and return them in execution order.
    ///
    /// Items whose component appears in `order` come first, by position.
    /// The rest follow by descending priority, then enqueue time. The
    /// sort is stable, so equal timestamps keep enqueue order.
    pub fn take_sorted(&mut self, order: &[ComponentType]) -> Vec<ScheduledCalculation> {
        let position: HashMap<ComponentType, usize> =
            order.iter().enumerate().map(|(i, kind)| (*kind, i)).collect();

        let mut items = std::mem::take(&mut self.items);
        self.pending.clear();

        items.sort_by_key(|item| {
            let slot = item
                .component
                .known()
                .and_then(|kind| position.get(&kind).copied());
            match slot {
                Some(index) => (0, index, Reverse(0), item.timestamp),
                None => (1, 0, Reverse(item.priority), item.timestamp),
            }
        });
        items
    }

    /// Drop everything without returning it.
    pub fn clear(&mut self) {
        self.items.clear();
        self.pending.clear();
    }
}
