//! Integration Tests for the Orchestrator
//!
//! These tests drive the orchestrator through tokio's paused clock, so
//! debounce, retry and refill timers fire in virtual time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::poll;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{json, Value};

use recalc_core::calc::{CalculationContext, CalculationResult, CalculatorRegistry, Totals};
use recalc_core::component::{ComponentData, ComponentRef, ComponentType as T};
use recalc_core::orchestrator::{
    BatchCompleted, CalculationOrchestrator, CalculationSource, OrchestratorConfig,
};
use recalc_core::store::{ComponentStore, InMemoryStore};

type Log = Arc<Mutex<Vec<T>>>;

/// Registry where every calculator records its type and charges
/// `params.monthly` per month.
fn recording_registry(log: &Log) -> CalculatorRegistry {
    T::ALL.into_iter().fold(CalculatorRegistry::new(), |registry, kind| {
        let log = log.clone();
        registry.with(
            kind,
            move |params: &Value, _: &CalculationContext| -> Result<CalculationResult, String> {
                log.lock().push(kind);
                let monthly = params.get("monthly").and_then(Value::as_f64).unwrap_or(0.0);
                Ok(CalculationResult::new(Totals::recurring(monthly)))
            },
        )
    })
}

fn enabled(store: &InMemoryStore, kinds: &[T]) {
    for &kind in kinds {
        store.set(kind, ComponentData::enabled(json!({ "monthly": 10.0 })));
    }
}

struct Harness {
    store: Arc<InMemoryStore>,
    orchestrator: CalculationOrchestrator,
    log: Log,
    events: Arc<Mutex<Vec<BatchCompleted>>>,
}

impl Harness {
    fn new(config: OrchestratorConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let log = Log::default();
        let orchestrator =
            CalculationOrchestrator::new(store.clone(), recording_registry(&log), config);
        Self::observe(store, orchestrator, log)
    }

    fn with_registry(registry: CalculatorRegistry) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let orchestrator =
            CalculationOrchestrator::new(store.clone(), registry, OrchestratorConfig::default());
        Self::observe(store, orchestrator, Log::default())
    }

    fn observe(store: Arc<InMemoryStore>, orchestrator: CalculationOrchestrator, log: Log) -> Self {
        let events: Arc<Mutex<Vec<BatchCompleted>>> = Arc::default();
        let sink = events.clone();
        orchestrator.subscribe(move |event| sink.lock().push(event.clone()));
        Self {
            store,
            orchestrator,
            log,
            events,
        }
    }

    fn executed(&self) -> Vec<T> {
        self.log.lock().clone()
    }

    fn batch_count(&self) -> usize {
        self.orchestrator.calculation_stats().history_len
    }

    fn store_snapshot(&self) -> IndexMap<T, ComponentData> {
        self.store.enabled_components()
    }
}

/// Store that counts how many times a drain snapshots it.
#[derive(Default)]
struct CountingStore {
    inner: InMemoryStore,
    snapshots: AtomicUsize,
}

impl ComponentStore for CountingStore {
    fn component(&self, kind: T) -> Option<ComponentData> {
        self.inner.component(kind)
    }

    fn enabled_components(&self) -> IndexMap<T, ComponentData> {
        self.snapshots.fetch_add(1, Ordering::SeqCst);
        self.inner.enabled_components()
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_secs(2)).await;
}

/// Test that rapid edits to the same component collapse into one entry.
#[tokio::test(start_paused = true)]
async fn repeated_schedule_is_deduplicated() {
    let h = Harness::new(OrchestratorConfig::default());
    enabled(&h.store, &[T::Capital, T::Support]);
    h.store.set_params(T::Capital, json!({ "equipment": [] }));

    h.orchestrator.schedule(T::Support);
    h.orchestrator.schedule(T::Support);

    let stats = h.orchestrator.calculation_stats();
    assert_eq!(stats.queue_length, 1);
    assert_eq!(stats.pending, vec![ComponentRef::from(T::Support)]);

    settle().await;

    let history = h.orchestrator.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].calculations.len(), 1);
    assert_eq!(h.executed(), vec![T::Support]);
}

/// Test that every new schedule restarts the debounce window.
#[tokio::test(start_paused = true)]
async fn debounce_restarts_on_each_schedule() {
    let h = Harness::new(OrchestratorConfig::default().with_debounce_ms(100));
    enabled(&h.store, &[T::Onboarding, T::Admin, T::Assessment]);

    h.orchestrator.schedule(T::Onboarding);
    tokio::time::sleep(Duration::from_millis(80)).await;
    h.orchestrator.schedule(T::Admin);
    tokio::time::sleep(Duration::from_millis(80)).await;
    h.orchestrator.schedule(T::Assessment);
    tokio::time::sleep(Duration::from_millis(80)).await;

    // 240ms since the first edit, but never 100ms of quiet.
    assert_eq!(h.batch_count(), 0);

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(h.batch_count(), 1);
    assert_eq!(h.executed().len(), 3);
}

/// Test that a dependency always runs before its dependent.
#[tokio::test(start_paused = true)]
async fn capital_runs_before_support() {
    let h = Harness::new(OrchestratorConfig::default());
    enabled(&h.store, &[T::Capital, T::Support]);
    h.store.set_params(T::Capital, json!({ "equipment": [{ "quantity": 1 }] }));

    // Scheduled in the "wrong" order on purpose.
    h.orchestrator.schedule(T::Support);
    h.orchestrator.schedule(T::Capital);
    settle().await;

    let history = h.orchestrator.history();
    let first: Vec<_> = history[0].calculations.iter().map(|c| c.component.clone()).collect();
    assert_eq!(first, vec![ComponentRef::from(T::Capital), T::Support.into()]);
    assert_eq!(history[0].calculations[0].level, Some(0));
    assert_eq!(history[0].calculations[1].level, Some(1));

    // Capital's cascade reschedules support as a fresh batch.
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].calculations.len(), 1);
    assert_eq!(history[1].calculations[0].source, CalculationSource::Dependency);
    assert_eq!(h.executed(), vec![T::Capital, T::Support, T::Support]);

    // One notification per batch.
    assert_eq!(h.events.lock().len(), 2);
}

/// Test that cascades follow the graph down a chain of dependents.
#[tokio::test(start_paused = true)]
async fn cascade_reaches_transitive_dependents() {
    let log = Log::default();
    let registry = recording_registry(&log).with(
        T::Support,
        {
            let log = log.clone();
            move |_: &Value, ctx: &CalculationContext| -> Result<CalculationResult, String> {
                log.lock().push(T::Support);
                let devices = ctx.device_count.ok_or("missing device count")?;
                Ok(CalculationResult::new(Totals::recurring(devices as f64 * 10.0)))
            }
        },
    );
    let store = Arc::new(InMemoryStore::new());
    let orchestrator =
        CalculationOrchestrator::new(store.clone(), registry, OrchestratorConfig::default());
    let h = Harness::observe(store, orchestrator, log);

    h.store.set(
        T::Capital,
        ComponentData::enabled(json!({ "equipment": [{ "quantity": 3 }, { "quantity": 2 }] })),
    );
    h.store.set(T::Support, ComponentData::enabled(json!({ "coverage": "24x7" })));
    h.store.set(T::Term3Year, ComponentData::enabled(json!({ "monthly": 1.0 })));

    h.orchestrator.schedule(T::Capital);
    settle().await;

    assert_eq!(h.executed(), vec![T::Capital, T::Support, T::Term3Year]);
    assert_eq!(h.batch_count(), 3);

    let events = h.events.lock();
    let support = &events[1].results[&ComponentRef::from(T::Support)];
    assert_eq!(support.totals.monthly, 50.0);
}

/// Test that an unknown type fails alone without aborting the batch.
#[tokio::test(start_paused = true)]
async fn unknown_type_is_a_per_item_error() {
    let h = Harness::new(OrchestratorConfig::default());
    enabled(&h.store, &[T::Prtg]);

    h.orchestrator.schedule("bogus");
    h.orchestrator.schedule(T::Prtg);
    settle().await;

    let events = h.events.lock();
    assert_eq!(events.len(), 1);

    let results = &events[0].results;
    let bogus = &results[&ComponentRef::from("bogus")];
    assert!(bogus.error.as_deref().unwrap().contains("bogus"));
    assert_eq!(bogus.totals, Totals::ZERO);

    let prtg = &results[&ComponentRef::from(T::Prtg)];
    assert!(prtg.error.is_none());
    assert_eq!(prtg.totals.monthly, 10.0);

    let history = h.orchestrator.history();
    let unknown = history[0]
        .calculations
        .iter()
        .find(|c| c.component.known().is_none())
        .unwrap();
    assert_eq!(unknown.level, None);
}

/// Test that a failing calculator does not stop its siblings.
#[tokio::test(start_paused = true)]
async fn calculator_error_is_recorded_per_item() {
    let registry = CalculatorRegistry::new()
        .with(T::Admin, |_: &Value, _: &CalculationContext| -> Result<CalculationResult, String> {
            Err("rate table missing".into())
        })
        .with(T::Onboarding, |_: &Value, _: &CalculationContext| -> Result<CalculationResult, String> {
            Ok(CalculationResult::new(Totals::one_time(500.0)))
        });
    let h = Harness::with_registry(registry);
    enabled(&h.store, &[T::Admin, T::Onboarding]);

    h.orchestrator.schedule(T::Admin);
    h.orchestrator.schedule(T::Onboarding);
    settle().await;

    let events = h.events.lock();
    let results = &events[0].results;
    let admin = &results[&ComponentRef::from(T::Admin)];
    assert!(admin.error.as_deref().unwrap().contains("rate table missing"));
    assert_eq!(results[&ComponentRef::from(T::Onboarding)].totals.one_time, 500.0);
}

/// Test that a missing hard dependency aborts the batch and keeps the queue.
#[tokio::test(start_paused = true)]
async fn validation_error_aborts_batch_and_keeps_queue() {
    let h = Harness::new(OrchestratorConfig::default());
    enabled(&h.store, &[T::Support]);

    h.orchestrator.schedule(T::Support);
    settle().await;

    assert_eq!(h.batch_count(), 0);
    assert!(h.executed().is_empty());
    assert!(h.events.lock().is_empty());
    assert_eq!(h.orchestrator.calculation_stats().queue_length, 1);

    // Fixing the state lets the next drain through.
    h.store.set(T::Capital, ComponentData::enabled(json!({ "equipment": [] })));
    h.orchestrator.schedule(T::Capital);
    settle().await;

    assert_eq!(&h.executed()[..2], &[T::Capital, T::Support]);
}

/// Test that an aborted batch waits for new work instead of re-draining.
#[tokio::test(start_paused = true)]
async fn aborted_batch_is_not_redrained() {
    let store = Arc::new(CountingStore::default());
    store
        .inner
        .set(T::Support, ComponentData::enabled(json!({ "monthly": 10.0 })));
    let log = Log::default();
    let orchestrator =
        CalculationOrchestrator::new(store.clone(), recording_registry(&log), OrchestratorConfig::default());

    orchestrator.schedule(T::Support);
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(store.snapshots.load(Ordering::SeqCst), 1);
    assert_eq!(orchestrator.calculation_stats().queue_length, 1);
    assert!(log.lock().is_empty());

    // An explicit drain still gets one more attempt.
    orchestrator.process_calculation_queue().await;
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(store.snapshots.load(Ordering::SeqCst), 2);
}

/// Test that a cascade reaches a wildcard component after its peers.
#[tokio::test(start_paused = true)]
async fn cascade_reaches_wildcard_component() {
    let h = Harness::new(OrchestratorConfig::default());
    enabled(&h.store, &[T::Capital, T::Support, T::NaasStandard]);
    h.store.set_params(T::Capital, json!({ "equipment": [{ "quantity": 2 }] }));

    h.orchestrator.schedule(T::Capital);
    settle().await;

    let history = h.orchestrator.history();
    let second: Vec<_> = history[1].calculations.iter().map(|c| c.component.clone()).collect();
    assert_eq!(second, vec![ComponentRef::from(T::Support), T::NaasStandard.into()]);
    assert!(history[1]
        .calculations
        .iter()
        .all(|c| c.source == CalculationSource::Dependency));
    assert_eq!(history[1].calculations[1].level, Some(3));

    // Support's own cascade queues the wildcard node once more.
    assert_eq!(history.len(), 3);
    assert_eq!(history[2].calculations[0].component, ComponentRef::from(T::NaasStandard));
    assert_eq!(
        h.executed(),
        vec![T::Capital, T::Support, T::NaasStandard, T::NaasStandard]
    );
}

/// Test that a lone wildcard component only warns.
#[tokio::test(start_paused = true)]
async fn lone_wildcard_component_still_runs() {
    let h = Harness::new(OrchestratorConfig::default());
    enabled(&h.store, &[T::NaasStandard]);

    let report = h
        .orchestrator
        .graph()
        .validate_relationships(&h.store_snapshot());
    assert!(report.is_valid());
    assert_eq!(report.warnings.len(), 1);

    h.orchestrator.schedule(T::NaasStandard);
    settle().await;

    assert_eq!(h.executed(), vec![T::NaasStandard]);
}

/// Test that a drain requested mid-batch does not run concurrently.
#[tokio::test(start_paused = true)]
async fn concurrent_drain_is_deferred() {
    let h = Harness::new(OrchestratorConfig::default());
    enabled(&h.store, &[T::Onboarding, T::Admin, T::Assessment]);

    h.orchestrator.schedule(T::Onboarding);
    h.orchestrator.schedule(T::Admin);

    let first = h.orchestrator.process_calculation_queue();
    tokio::pin!(first);

    // Runs the first item, then suspends between items.
    assert!(poll!(first.as_mut()).is_pending());
    assert!(h.orchestrator.calculation_stats().is_processing);
    assert_eq!(h.executed().len(), 1);

    // New work arrives and a second drain is requested.
    h.orchestrator.schedule(T::Assessment);
    h.orchestrator.process_calculation_queue().await;
    assert_eq!(h.batch_count(), 0);
    assert_eq!(h.executed().len(), 1);

    first.await;
    assert_eq!(h.batch_count(), 1);
    assert!(!h.orchestrator.calculation_stats().is_processing);
    assert_eq!(h.orchestrator.calculation_stats().queue_length, 1);

    settle().await;
    let history = h.orchestrator.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].calculations.len(), 2);
    assert_eq!(
        history[1].calculations[0].component,
        ComponentRef::from(T::Assessment)
    );
}

/// Test that an empty queue drains to nothing.
#[tokio::test(start_paused = true)]
async fn empty_queue_is_a_no_op() {
    let h = Harness::new(OrchestratorConfig::default());
    h.orchestrator.process_calculation_queue().await;

    assert_eq!(h.batch_count(), 0);
    assert!(h.events.lock().is_empty());
}

/// Test that history never grows past its cap.
#[tokio::test(start_paused = true)]
async fn history_is_capped() {
    let mut config = OrchestratorConfig::default().with_max_history(3);
    config.recent_batches = 2;
    let h = Harness::new(config);
    enabled(&h.store, &[T::Onboarding]);

    for _ in 0..5 {
        h.orchestrator.schedule(T::Onboarding);
        settle().await;
        assert!(h.orchestrator.history().len() <= 3);
    }

    let stats = h.orchestrator.calculation_stats();
    assert_eq!(stats.history_len, 3);
    assert_eq!(stats.recent_batches.len(), 2);
    assert_eq!(h.events.lock().len(), 5);

    // Oldest dropped first: the retained batches are the last three.
    let history = h.orchestrator.history();
    assert!(history[0].timestamp < history[1].timestamp);
    assert!(history[1].timestamp < history[2].timestamp);
}

/// Test that disabled dependents are not cascaded to.
#[tokio::test(start_paused = true)]
async fn disabled_dependents_are_skipped() {
    let h = Harness::new(OrchestratorConfig::default());
    enabled(&h.store, &[T::Prtg]);
    h.store.set(T::PackageEssentials, ComponentData::disabled(json!({})));

    h.orchestrator.schedule_dependent_calculations(T::Prtg);
    assert_eq!(h.orchestrator.calculation_stats().queue_length, 0);

    h.store.enable(T::PackageEssentials);
    h.orchestrator.schedule_dependent_calculations(T::Prtg);
    let stats = h.orchestrator.calculation_stats();
    assert_eq!(stats.pending, vec![ComponentRef::from(T::PackageEssentials)]);
}
