//! Calculation Orchestration
//!
//! This module turns a stream of "this component changed" requests into
//! ordered, single-flight recalculation batches.
//!
//! # Lifecycle
//!
//! ```text
//!   Idle ──schedule──▶ Debouncing ──timer──▶ Processing ──done──▶ Idle
//!                          ▲                   │    ▲
//!                          └──── refill ───────┘    └── retry (drain requested mid-batch)
//! ```
//!
//! # Ordering
//!
//! Within one batch items run in dependency order, with priority and
//! enqueue time breaking ties for items outside the computed order. There
//! is no ordering guarantee across batches: a request may join the current
//! debounce window or land in the next batch depending on timing.

mod clock;
mod config;
mod history;
mod observer;
mod queue;
mod runtime;

pub use clock::{Clock, TokioClock};
pub use config::OrchestratorConfig;
pub use history::{BatchEntry, BatchHistory, CalculationBatch};
pub use observer::{BatchCompleted, Observer, ObserverId};
pub use queue::{CalculationQueue, CalculationSource, ScheduledCalculation};
pub use runtime::{CalculationOrchestrator, CalculationStats, OrchestratorBuilder};
