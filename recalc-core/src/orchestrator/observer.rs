//! Batch observers.
//!
//! An observer is notified once per completed batch with the full results
//! map. There is no per-item notification.

use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use tokio::time::Instant;

use crate::calc::CalculationResult;
use crate::component::ComponentRef;

/// Unique identifier for a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Generate a new unique observer ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

/// The event delivered when a batch completes.
#[derive(Debug, Clone)]
pub struct BatchCompleted {
    pub results: IndexMap<ComponentRef, CalculationResult>,
    pub timestamp: Instant,
}

/// A registered callback.
pub struct Observer {
    id: ObserverId,
    notify: Box<dyn Fn(&BatchCompleted) + Send + Sync>,
}

impl Observer {
    pub fn new<F>(notify: F) -> Self
    where
        F: Fn(&BatchCompleted) + Send + Sync + 'static,
    {
        Self {
            id: ObserverId::new(),
            notify: Box::new(notify),
        }
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    pub fn notify(&self, event: &BatchCompleted) {
        (self.notify)(event);
    }
}
