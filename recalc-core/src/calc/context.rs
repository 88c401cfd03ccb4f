//! Calculation Context
//!
//! The context is everything a calculator may read besides its own
//! parameters: a snapshot of enabled components, the current data of each
//! declared dependency, and a few derived values.
//!
//! # Dependency data
//!
//! Each declared dependency's data is available by type and under its
//! `<type>Data` key (`capitalData` for capital). A wildcard component
//! instead receives the whole enabled-component map.
//!
//! # Device count
//!
//! Support pricing is per device, so when support depends on capital the
//! context carries the number of devices listed in capital's equipment.

use indexmap::IndexMap;
use serde_json::Value;
use tokio::time::Instant;

use super::result::Totals;
use crate::component::{ComponentData, ComponentType};
use crate::error::GraphError;
use crate::graph::{Dependencies, DependencyGraph};
use crate::store::ComponentStore;

/// Device count used when capital data or its equipment list is absent.
pub const DEFAULT_DEVICE_COUNT: u64 = 1;

/// Inputs handed to a calculator alongside its parameters.
#[derive(Debug, Clone)]
pub struct CalculationContext {
    /// The component being calculated.
    pub component: ComponentType,

    pub timestamp: Instant,

    /// Every enabled component at the time the context was built.
    pub enabled_components: IndexMap<ComponentType, ComponentData>,

    /// Placeholder for batch-wide totals; always zero when a context is
    /// first built.
    pub global_totals: Totals,

    /// Current data of each declared dependency known to the store.
    pub dependency_data: IndexMap<ComponentType, ComponentData>,

    /// Set for wildcard components: the full enabled-component map.
    pub all_components_data: Option<IndexMap<ComponentType, ComponentData>>,

    /// Set for support when it depends on capital.
    pub device_count: Option<u64>,
}

impl CalculationContext {
    /// Assemble the context for `component` from the graph and a store.
    pub fn build(
        component: ComponentType,
        graph: &DependencyGraph,
        store: &dyn ComponentStore,
        timestamp: Instant,
    ) -> Result<Self, GraphError> {
        let dependencies = graph.dependencies(component)?;
        let enabled_components = store.enabled_components();

        let mut dependency_data = IndexMap::new();
        let mut all_components_data = None;
        match dependencies {
            Dependencies::All => {
                all_components_data = Some(enabled_components.clone());
            }
            Dependencies::Fixed(list) => {
                for &dep in list {
                    if let Some(data) = store.component(dep) {
                        dependency_data.insert(dep, data);
                    }
                }
            }
        }

        let device_count = (component == ComponentType::Support
            && dependencies.names(ComponentType::Capital))
        .then(|| extract_device_count(dependency_data.get(&ComponentType::Capital)));

        Ok(Self {
            component,
            timestamp,
            enabled_components,
            global_totals: Totals::ZERO,
            dependency_data,
            all_components_data,
            device_count,
        })
    }

    /// Data of a declared dependency.
    pub fn dependency(&self, kind: ComponentType) -> Option<&ComponentData> {
        self.dependency_data.get(&kind)
    }

    /// Data by `<type>Data` key, e.g. `capitalData`.
    pub fn data(&self, key: &str) -> Option<&ComponentData> {
        let name = key.strip_suffix("Data")?;
        let kind = name.parse::<ComponentType>().ok()?;
        self.dependency(kind)
    }

    /// Whether `kind` was enabled when the context was built.
    pub fn is_enabled(&self, kind: ComponentType) -> bool {
        self.enabled_components.contains_key(&kind)
    }
}

/// Number of devices listed in capital's `equipment` parameter.
///
/// Sums each entry's `quantity`, saturating at `u64::MAX`. Quantities must
/// be whole non-negative numbers (`4` or `4.0`); anything else, fractions
/// included, counts as zero. Returns [`DEFAULT_DEVICE_COUNT`] when there is
/// no capital data or no equipment list.
pub fn extract_device_count(capital: Option<&ComponentData>) -> u64 {
    let Some(equipment) = capital
        .and_then(|data| data.param("equipment"))
        .and_then(Value::as_array)
    else {
        return DEFAULT_DEVICE_COUNT;
    };

    equipment
        .iter()
        .filter_map(|item| item.get("quantity"))
        .map(whole_quantity)
        .fold(0, u64::saturating_add)
}

fn whole_quantity(quantity: &Value) -> u64 {
    if let Some(q) = quantity.as_u64() {
        return q;
    }
    match quantity.as_f64() {
        // `as` saturates for floats beyond u64::MAX.
        Some(q) if q >= 0.0 && q.fract() == 0.0 => q as u64,
        _ => 0,
    }
}
