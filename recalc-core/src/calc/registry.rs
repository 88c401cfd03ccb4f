//! Calculator Registry
//!
//! One calculator per component type, held in a table indexed by
//! [`ComponentType::index`]. The formulas themselves live outside this
//! crate; anything implementing [`Calculator`] can be registered,
//! including plain closures.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::context::CalculationContext;
use super::result::CalculationResult;
use crate::component::ComponentType;

/// A pure cost formula for one component type.
///
/// Implementations should not fail for well-formed parameters and must
/// report all four totals, using zeros for dimensions they do not touch.
pub trait Calculator: Send + Sync {
    fn calculate(
        &self,
        params: &Value,
        context: &CalculationContext,
    ) -> Result<CalculationResult, String>;
}

impl<F> Calculator for F
where
    F: Fn(&Value, &CalculationContext) -> Result<CalculationResult, String> + Send + Sync,
{
    fn calculate(
        &self,
        params: &Value,
        context: &CalculationContext,
    ) -> Result<CalculationResult, String> {
        self(params, context)
    }
}

/// Lookup table from component type to calculator.
#[derive(Clone, Default)]
pub struct CalculatorRegistry {
    handlers: [Option<Arc<dyn Calculator>>; ComponentType::COUNT],
}

impl CalculatorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `calculator` for `kind`, replacing any previous one.
    pub fn register<C>(&mut self, kind: ComponentType, calculator: C) -> &mut Self
    where
        C: Calculator + 'static,
    {
        self.handlers[kind.index()] = Some(Arc::new(calculator));
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<C>(mut self, kind: ComponentType, calculator: C) -> Self
    where
        C: Calculator + 'static,
    {
        self.register(kind, calculator);
        self
    }

    /// The calculator for `kind`, if registered.
    pub fn get(&self, kind: ComponentType) -> Option<&Arc<dyn Calculator>> {
        self.handlers[kind.index()].as_ref()
    }

    pub fn contains(&self, kind: ComponentType) -> bool {
        self.get(kind).is_some()
    }

    /// Types that have no calculator.
    pub fn missing(&self) -> Vec<ComponentType> {
        ComponentType::ALL
            .into_iter()
            .filter(|kind| !self.contains(*kind))
            .collect()
    }
}

impl fmt::Debug for CalculatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered: Vec<_> = ComponentType::ALL
            .into_iter()
            .filter(|kind| self.contains(*kind))
            .collect();
        f.debug_struct("CalculatorRegistry")
            .field("registered", &registered)
            .finish()
    }
}
