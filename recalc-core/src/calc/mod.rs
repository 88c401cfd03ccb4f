//! Calculations
//!
//! Types at the boundary between the orchestrator and the cost formulas:
//! results, the context a formula receives, and the registry that maps a
//! component type to its formula.

mod context;
mod registry;
mod result;

pub use context::{extract_device_count, CalculationContext, DEFAULT_DEVICE_COUNT};
pub use registry::{Calculator, CalculatorRegistry};
pub use result::{CalculationResult, Totals};
