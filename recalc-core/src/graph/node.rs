//! Graph Nodes
//!
//! This module defines the node type that lives in the dependency graph.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::component::{ComponentCategory, ComponentType};

/// Fixed dependency list. Most components have at most a couple of inputs.
pub type DependencyList = SmallVec<[ComponentType; 4]>;

/// What a node depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dependencies {
    /// A declared list of component types. May be empty for root nodes.
    Fixed(DependencyList),

    /// Wildcard (`'*'`): every other currently enabled component.
    ///
    /// Used by contract pricing, which needs the grand total.
    All,
}

impl Dependencies {
    /// No dependencies at all.
    pub fn none() -> Self {
        Dependencies::Fixed(SmallVec::new())
    }

    /// A fixed dependency list.
    pub fn on(types: &[ComponentType]) -> Self {
        Dependencies::Fixed(types.iter().copied().collect())
    }

    /// Whether this is the wildcard declaration.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Dependencies::All)
    }

    /// The fixed list, or an empty slice for the wildcard.
    pub fn fixed(&self) -> &[ComponentType] {
        match self {
            Dependencies::Fixed(list) => list.as_slice(),
            Dependencies::All => &[],
        }
    }

    /// Whether `kind` is named explicitly in a fixed list.
    pub fn names(&self, kind: ComponentType) -> bool {
        self.fixed().contains(&kind)
    }
}

/// A node in the dependency graph.
///
/// Nodes are built once when the graph is constructed and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyNode {
    /// The component this node describes.
    kind: ComponentType,

    /// Components this node reads from.
    dependencies: Dependencies,

    /// Distance from the dependency-free roots. Roots are level 0.
    level: u32,

    category: ComponentCategory,
}

impl DependencyNode {
    /// Create a node.
    pub fn new(
        kind: ComponentType,
        dependencies: Dependencies,
        level: u32,
        category: ComponentCategory,
    ) -> Self {
        Self {
            kind,
            dependencies,
            level,
            category,
        }
    }

    /// Create a root node (no dependencies, level 0).
    pub fn root(kind: ComponentType, category: ComponentCategory) -> Self {
        Self::new(kind, Dependencies::none(), 0, category)
    }

    /// Get the node's component type.
    pub fn kind(&self) -> ComponentType {
        self.kind
    }

    /// Get the declared dependencies.
    pub fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    /// Get the precomputed level.
    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn category(&self) -> ComponentCategory {
        self.category
    }

    /// Check if the node has no dependencies.
    pub fn is_root(&self) -> bool {
        !self.dependencies.is_wildcard() && self.dependencies.fixed().is_empty()
    }
}
