//! Calculation Orchestrator
//!
//! The orchestrator is the central coordinator between edits and cost
//! formulas. It collects schedule requests, waits for edits to settle,
//! and then drains the queue as one ordered batch.
//!
//! # How It Works
//!
//! 1. `schedule_calculation` adds the component to the queue (once) and
//!    restarts the shared debounce timer.
//!
//! 2. When the timer fires, the queue is drained:
//!    a. Snapshot enabled components and validate their relationships
//!    b. Order the queued items by the dependency graph
//!    c. Take the queue, so new requests start a fresh batch
//!    d. Execute items one at a time, cascading to dependents
//!    e. Record the batch and notify observers
//!
//! 3. Work that arrived during the batch is drained after a short delay.
//!
//! # Single Flight
//!
//! A processing flag guards the drain. A drain requested while another one
//! runs schedules a retry instead of running. The flag is cleared by a
//! drop guard, so a batch that fails or is cancelled cannot leave the
//! orchestrator locked.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::clock::{Clock, TokioClock};
use super::config::OrchestratorConfig;
use super::history::{BatchEntry, BatchHistory, CalculationBatch};
use super::observer::{BatchCompleted, Observer, ObserverId};
use super::queue::{CalculationQueue, CalculationSource, ScheduledCalculation};
use crate::calc::{CalculationContext, CalculationResult, CalculatorRegistry};
use crate::component::{ComponentRef, ComponentType};
use crate::error::{CalculationError, GraphError};
use crate::graph::DependencyGraph;
use crate::store::ComponentStore;

/// Point-in-time view of the orchestrator.
#[derive(Debug, Clone, Serialize)]
pub struct CalculationStats {
    pub queue_length: usize,
    pub pending: Vec<ComponentRef>,
    pub is_processing: bool,
    pub recent_batches: Vec<Arc<CalculationBatch>>,
    pub history_len: usize,
}

/// Assembles a [`CalculationOrchestrator`].
pub struct OrchestratorBuilder {
    store: Arc<dyn ComponentStore>,
    calculators: CalculatorRegistry,
    graph: Option<Arc<DependencyGraph>>,
    clock: Arc<dyn Clock>,
    config: OrchestratorConfig,
}

impl OrchestratorBuilder {
    /// Use `graph` instead of the standard catalog.
    pub fn graph(mut self, graph: Arc<DependencyGraph>) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Like [`build`](Self::build), but rejects an invalid config.
    pub fn try_build(self) -> crate::Result<CalculationOrchestrator> {
        self.config.validate()?;
        Ok(self.build())
    }

    pub fn build(self) -> CalculationOrchestrator {
        let graph = self
            .graph
            .unwrap_or_else(|| Arc::new(DependencyGraph::standard()));
        let history = BatchHistory::new(self.config.max_history);
        let epoch = self.clock.now();

        CalculationOrchestrator {
            inner: Arc::new(Inner {
                graph,
                calculators: self.calculators,
                store: self.store,
                clock: self.clock,
                config: self.config,
                epoch,
                state: Mutex::new(SchedulerState {
                    queue: CalculationQueue::new(),
                    processing: false,
                    generation: 0,
                    timers: Timers::default(),
                    history,
                }),
                observers: RwLock::new(Vec::new()),
            }),
        }
    }
}

/// Debounced, dependency-ordered batch scheduler.
///
/// Cloning is cheap; clones share one queue.
#[derive(Clone)]
pub struct CalculationOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    graph: Arc<DependencyGraph>,
    calculators: CalculatorRegistry,
    store: Arc<dyn ComponentStore>,
    clock: Arc<dyn Clock>,
    config: OrchestratorConfig,
    /// Reference point for batch timestamps.
    epoch: Instant,
    state: Mutex<SchedulerState>,
    observers: RwLock<Vec<Arc<Observer>>>,
}

struct SchedulerState {
    queue: CalculationQueue,
    processing: bool,
    /// Bumped by `clear_queue` so a guard from before the reset does not
    /// clear the flag of a later drain.
    generation: u64,
    timers: Timers,
    history: BatchHistory,
}

#[derive(Default)]
struct Timers {
    debounce: Option<JoinHandle<()>>,
    retry: Option<JoinHandle<()>>,
    refill: Option<JoinHandle<()>>,
}

impl Timers {
    fn abort_all(&mut self) {
        for handle in [self.debounce.take(), self.retry.take(), self.refill.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
        }
    }
}

/// How a drain attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchOutcome {
    /// Relationship errors stopped the batch; the queue is untouched.
    Aborted,
    Completed,
}

fn is_idle(timer: &Option<JoinHandle<()>>) -> bool {
    timer.as_ref().map_or(true, JoinHandle::is_finished)
}

/// Clears the processing flag when the drain ends, however it ends.
struct ProcessingGuard {
    inner: Arc<Inner>,
    generation: u64,
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        if state.generation == self.generation {
            state.processing = false;
        }
    }
}

impl CalculationOrchestrator {
    /// Start building an orchestrator over `store` and `calculators`.
    pub fn builder(
        store: Arc<dyn ComponentStore>,
        calculators: CalculatorRegistry,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder {
            store,
            calculators,
            graph: None,
            clock: Arc::new(TokioClock),
            config: OrchestratorConfig::default(),
        }
    }

    /// An orchestrator with the standard graph, tokio clock and `config`.
    pub fn new(
        store: Arc<dyn ComponentStore>,
        calculators: CalculatorRegistry,
        config: OrchestratorConfig,
    ) -> Self {
        Self::builder(store, calculators).config(config).build()
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.inner.graph
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    /// Schedule a user-initiated calculation at default priority.
    pub fn schedule(&self, target: impl Into<ComponentRef>) {
        self.schedule_calculation(target, 0, CalculationSource::User);
    }

    /// Queue `target` and restart the debounce timer.
    ///
    /// Does nothing if `target` is already pending. Fire-and-forget: the
    /// outcome is only visible through observers and stats.
    pub fn schedule_calculation(
        &self,
        target: impl Into<ComponentRef>,
        priority: i32,
        source: CalculationSource,
    ) {
        self.inner.schedule(target.into(), priority, source);
    }

    /// Schedule every enabled dependent of `kind` at priority 1.
    pub fn schedule_dependent_calculations(&self, kind: ComponentType) {
        self.inner.schedule_dependents(kind);
    }

    /// Drain the queue as one batch.
    ///
    /// Returns immediately if the queue is empty, or if a drain is already
    /// running (a retry is scheduled instead).
    pub async fn process_calculation_queue(&self) {
        self.inner.process().await;
    }

    /// Run the calculation for a single target, outside the queue.
    pub async fn execute_calculation(
        &self,
        target: impl Into<ComponentRef>,
    ) -> Result<CalculationResult, CalculationError> {
        self.inner.execute(&target.into()).await
    }

    /// The context `kind`'s calculator would receive right now.
    pub fn build_calculation_context(
        &self,
        kind: ComponentType,
    ) -> Result<CalculationContext, GraphError> {
        self.inner.build_context(kind)
    }

    pub fn calculation_stats(&self) -> CalculationStats {
        let state = self.inner.state.lock();
        CalculationStats {
            queue_length: state.queue.len(),
            pending: state.queue.pending().cloned().collect(),
            is_processing: state.processing,
            recent_batches: state.history.recent(self.inner.config.recent_batches),
            history_len: state.history.len(),
        }
    }

    /// Every retained batch, oldest first.
    pub fn history(&self) -> Vec<Arc<CalculationBatch>> {
        self.inner.state.lock().history.all()
    }

    /// Emergency reset: drop queued work, cancel timers and clear the
    /// processing flag. A batch already executing keeps running but its
    /// follow-up work may be lost.
    pub fn clear_queue(&self) {
        let mut state = self.inner.state.lock();
        let dropped = state.queue.len();
        state.queue.clear();
        state.timers.abort_all();
        state.processing = false;
        state.generation += 1;
        warn!(dropped, "calculation queue cleared");
    }

    /// Register a batch observer.
    ///
    /// Observers run on the draining task and must not block.
    pub fn subscribe<F>(&self, notify: F) -> ObserverId
    where
        F: Fn(&BatchCompleted) + Send + Sync + 'static,
    {
        let observer = Observer::new(notify);
        let id = observer.id();
        self.inner.observers.write().push(Arc::new(observer));
        id
    }

    /// Remove an observer. Returns whether it was registered.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.inner.observers.write();
        let before = observers.len();
        observers.retain(|o| o.id() != id);
        observers.len() != before
    }
}

impl Inner {
    fn schedule(self: &Arc<Self>, component: ComponentRef, priority: i32, source: CalculationSource) {
        let mut state = self.state.lock();
        let item = ScheduledCalculation {
            component: component.clone(),
            priority,
            source,
            timestamp: self.clock.now(),
        };
        if !state.queue.push(item) {
            debug!(component = %component, "calculation already pending");
            return;
        }
        debug!(component = %component, priority, ?source, "calculation scheduled");

        if let Some(previous) = state.timers.debounce.take() {
            previous.abort();
        }
        state.timers.debounce = self.drain_after(self.config.debounce());
    }

    fn schedule_dependents(self: &Arc<Self>, kind: ComponentType) {
        for &dependent in self.graph.dependents(kind) {
            let enabled = self
                .store
                .component(dependent)
                .is_some_and(|data| data.enabled);
            if enabled {
                self.schedule(dependent.into(), 1, CalculationSource::Dependency);
            }
        }
    }

    /// Spawn a timer that starts a drain after `delay`.
    ///
    /// The drain runs on its own task, so aborting the timer never cancels
    /// a batch that has already started.
    fn drain_after(self: &Arc<Self>, delay: std::time::Duration) -> Option<JoinHandle<()>> {
        let Ok(runtime) = Handle::try_current() else {
            error!("no tokio runtime available, queued calculations wait for an explicit drain");
            return None;
        };

        let inner = Arc::clone(self);
        let sleep = self.clock.sleep(delay);
        Some(runtime.spawn(async move {
            sleep.await;
            tokio::spawn(inner.drain());
        }))
    }

    fn drain(self: Arc<Self>) -> BoxFuture<'static, ()> {
        async move { self.process().await }.boxed()
    }

    async fn process(self: &Arc<Self>) {
        let guard = {
            let mut state = self.state.lock();
            if state.processing {
                debug!("drain already running, retrying later");
                if is_idle(&state.timers.retry) {
                    state.timers.retry = self.drain_after(self.config.retry_delay());
                }
                return;
            }
            if state.queue.is_empty() {
                return;
            }
            state.processing = true;
            ProcessingGuard {
                inner: Arc::clone(self),
                generation: state.generation,
            }
        };

        let outcome = self.run_batch().await;
        drop(guard);

        // An aborted batch leaves its items queued. They wait for the next
        // schedule or explicit drain instead of being retried here.
        if outcome == BatchOutcome::Aborted {
            return;
        }

        let mut state = self.state.lock();
        if !state.queue.is_empty() && is_idle(&state.timers.refill) {
            debug!(queued = state.queue.len(), "work arrived during batch");
            state.timers.refill = self.drain_after(self.config.refill_delay());
        }
    }

    async fn run_batch(self: &Arc<Self>) -> BatchOutcome {
        let started = self.clock.now();
        let components = self.store.enabled_components();

        let report = self.graph.validate_relationships(&components);
        for warning in &report.warnings {
            warn!(phase = "validate", "{warning}");
        }
        if !report.is_valid() {
            for issue in &report.errors {
                error!(phase = "validate", "{issue}");
            }
            error!(
                errors = report.errors.len(),
                "batch aborted by relationship errors"
            );
            return BatchOutcome::Aborted;
        }

        let order = self.graph.calculation_order(&components);
        let items = self.state.lock().queue.take_sorted(&order);
        info!(batch_size = items.len(), "processing calculation batch");

        let mut results: IndexMap<ComponentRef, CalculationResult> = IndexMap::new();
        let mut calculations = Vec::with_capacity(items.len());
        for item in items {
            let level = item.component.known().and_then(|k| self.graph.level(k).ok());
            calculations.push(BatchEntry {
                component: item.component.clone(),
                level,
                source: item.source,
            });

            match self.execute(&item.component).await {
                Ok(result) => {
                    if let Some(kind) = item.component.known() {
                        self.schedule_dependents(kind);
                    }
                    results.insert(item.component, result);
                }
                Err(err) => {
                    error!(component = %item.component, phase = "execute", error = %err, "calculation failed");
                    results.insert(item.component, CalculationResult::failed(err.to_string()));
                }
            }

            tokio::task::yield_now().await;
        }

        let finished = self.clock.now();
        let batch = CalculationBatch {
            timestamp: started.duration_since(self.epoch),
            calculations,
            results: results
                .iter()
                .map(|(component, result)| (component.clone(), result.totals))
                .collect(),
            duration: finished.duration_since(started),
        };
        debug!(results = results.len(), duration = ?batch.duration, "batch complete");
        self.state.lock().history.push(batch);

        let event = BatchCompleted {
            results,
            timestamp: finished,
        };
        let observers: Vec<Arc<Observer>> = self.observers.read().clone();
        for observer in &observers {
            observer.notify(&event);
        }
        BatchOutcome::Completed
    }

    async fn execute(&self, component: &ComponentRef) -> Result<CalculationResult, CalculationError> {
        let kind = component
            .known()
            .ok_or_else(|| CalculationError::UnknownComponent(component.clone()))?;

        let data = match self.store.component(kind) {
            Some(data) if data.enabled => data,
            _ => return Ok(CalculationResult::zero()),
        };

        let context = self.build_context(kind)?;
        let calculator = self
            .calculators
            .get(kind)
            .ok_or(CalculationError::CalculatorMissing(kind))?;

        let result = std::future::ready(calculator.calculate(&data.params, &context))
            .await
            .map_err(|message| CalculationError::Failed {
                component: kind,
                message,
            })?;

        if !result.totals.is_finite() {
            return Err(CalculationError::NonFiniteTotals(kind));
        }
        debug!(component = %kind, monthly = result.totals.monthly, "calculation finished");
        Ok(result)
    }

    fn build_context(&self, kind: ComponentType) -> Result<CalculationContext, GraphError> {
        CalculationContext::build(kind, &self.graph, self.store.as_ref(), self.clock.now())
    }
}
