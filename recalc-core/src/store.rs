//! Component Store
//!
//! The orchestrator reads component state through [`ComponentStore`] and
//! never writes it. Writes happen elsewhere and are observed only when a
//! batch takes its snapshot.
//!
//! [`InMemoryStore`] is a last-write-wins map for hosts that keep component
//! state in memory, and for tests.

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;

use crate::component::{ComponentData, ComponentType};

/// Read access to component state.
pub trait ComponentStore: Send + Sync {
    /// Current data for `kind`, if the store knows it.
    fn component(&self, kind: ComponentType) -> Option<ComponentData>;

    /// Every enabled component.
    fn enabled_components(&self) -> IndexMap<ComponentType, ComponentData>;
}

/// In-memory component state.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    components: RwLock<IndexMap<ComponentType, ComponentData>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the data for `kind`.
    pub fn set(&self, kind: ComponentType, data: ComponentData) {
        self.components.write().insert(kind, data);
    }

    /// Enable `kind`, creating it with null params if absent.
    pub fn enable(&self, kind: ComponentType) {
        self.components.write().entry(kind).or_default().enabled = true;
    }

    /// Disable `kind` if present.
    pub fn disable(&self, kind: ComponentType) {
        if let Some(data) = self.components.write().get_mut(&kind) {
            data.enabled = false;
        }
    }

    /// Replace the params for `kind`, keeping its enable flag.
    pub fn set_params(&self, kind: ComponentType, params: Value) {
        self.components.write().entry(kind).or_default().params = params;
    }

    /// Remove `kind` entirely.
    pub fn remove(&self, kind: ComponentType) -> Option<ComponentData> {
        self.components.write().shift_remove(&kind)
    }
}

impl FromIterator<(ComponentType, ComponentData)> for InMemoryStore {
    fn from_iter<I: IntoIterator<Item = (ComponentType, ComponentData)>>(iter: I) -> Self {
        Self {
            components: RwLock::new(iter.into_iter().collect()),
        }
    }
}

impl ComponentStore for InMemoryStore {
    fn component(&self, kind: ComponentType) -> Option<ComponentData> {
        self.components.read().get(&kind).cloned()
    }

    fn enabled_components(&self) -> IndexMap<ComponentType, ComponentData> {
        self.components
            .read()
            .iter()
            .filter(|(_, data)| data.enabled)
            .map(|(kind, data)| (*kind, data.clone()))
            .collect()
    }
}
