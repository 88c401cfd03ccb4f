//! Error types shared across the crate.

use thiserror::Error;

use crate::component::{ComponentRef, ComponentType};

/// Errors raised by [`DependencyGraph`](crate::graph::DependencyGraph) lookups
/// and ordering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("component {0} is not part of the dependency graph")]
    UnknownComponent(ComponentType),

    #[error("circular dependency detected at {0}")]
    CycleDetected(ComponentType),
}

/// Errors raised while executing a single calculation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalculationError {
    #[error("unknown component type: {0}")]
    UnknownComponent(ComponentRef),

    #[error("no calculator registered for {0}")]
    CalculatorMissing(ComponentType),

    #[error("calculation for {component} failed: {message}")]
    Failed {
        component: ComponentType,
        message: String,
    },

    #[error("calculator for {0} returned non-finite totals")]
    NonFiniteTotals(ComponentType),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid orchestrator config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("max_history must be at least 1")]
    EmptyHistory,
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Calculation(#[from] CalculationError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
