//! Recalc Core
//!
//! This crate recomputes a set of interdependent cost components whenever
//! their inputs change. It guarantees that:
//!
//! - A component is never computed before its dependencies
//! - Bursts of rapid edits collapse into a single recomputation pass
//! - Two recomputation passes never run at the same time
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `component`: The closed catalog of component types
//! - `graph`: Static dependency graph, ordering and validation
//! - `calc`: Results, calculation context and the calculator registry
//! - `store`: Read access to component state
//! - `orchestrator`: Debounced, single-flight batch scheduling
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use recalc_core::calc::CalculatorRegistry;
//! use recalc_core::component::ComponentType;
//! use recalc_core::orchestrator::{CalculationOrchestrator, OrchestratorConfig};
//! use recalc_core::store::InMemoryStore;
//!
//! let store = Arc::new(InMemoryStore::new());
//! let calculators = CalculatorRegistry::new().with(ComponentType::Support, support_formula);
//! let orchestrator = CalculationOrchestrator::new(store, calculators, OrchestratorConfig::default());
//!
//! orchestrator.subscribe(|batch| println!("{} results", batch.results.len()));
//!
//! // Many edits, one batch.
//! orchestrator.schedule(ComponentType::Capital);
//! orchestrator.schedule(ComponentType::Support);
//! ```

pub mod calc;
pub mod component;
pub mod error;
pub mod graph;
pub mod orchestrator;
pub mod store;

pub use error::{Error, Result};
