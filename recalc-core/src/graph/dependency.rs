//! Dependency Graph
//!
//! The graph is static knowledge: which component reads from which. It is
//! built once and then asked to order arbitrary runtime subsets (whatever
//! the user currently has enabled) without being rebuilt.
//!
//! # Algorithm
//!
//! Ordering is a depth-first search with a recursion stack:
//!
//! 1. Collapse duplicates and sort the subset by (level, name) so that
//!    independent nodes come out in a deterministic order
//! 2. Visit each node; before emitting it, visit its dependencies that are
//!    members of the subset (the wildcard expands to every other member)
//! 3. Reaching a node that is still on the recursion stack is a cycle
//!
//! A node is emitted only after all of its dependencies, so the result
//! lists dependencies before dependents.

use std::collections::{HashMap, HashSet};

use dashmap::DashMap;
use indexmap::IndexMap;
use tracing::{debug, warn};

use super::catalog;
use super::node::{Dependencies, DependencyNode};
use crate::component::{ComponentData, ComponentType};
use crate::error::GraphError;

/// Static dependency graph over component types.
#[derive(Debug)]
pub struct DependencyGraph {
    /// All nodes, in declaration order.
    nodes: IndexMap<ComponentType, DependencyNode>,

    /// Reverse edges, indexed at construction.
    dependents: HashMap<ComponentType, Vec<ComponentType>>,

    /// Memoized acyclicity checks keyed by the sorted subset.
    acyclic_cache: DashMap<Vec<ComponentType>, bool>,
}

impl DependencyGraph {
    /// The standard component catalog.
    pub fn standard() -> Self {
        Self::from_nodes(catalog::standard_nodes())
    }

    /// Build a graph from arbitrary node definitions.
    ///
    /// A later definition for the same type replaces an earlier one. Cycles
    /// are allowed here; they surface from [`topological_sort`](Self::topological_sort).
    pub fn from_nodes(nodes: impl IntoIterator<Item = DependencyNode>) -> Self {
        let nodes: IndexMap<ComponentType, DependencyNode> =
            nodes.into_iter().map(|node| (node.kind(), node)).collect();

        let mut dependents: HashMap<ComponentType, Vec<ComponentType>> = HashMap::new();
        for node in nodes.values() {
            match node.dependencies() {
                Dependencies::Fixed(list) => {
                    for dep in list {
                        let entry = dependents.entry(*dep).or_default();
                        if !entry.contains(&node.kind()) {
                            entry.push(node.kind());
                        }
                    }
                }
                Dependencies::All => {
                    for other in nodes.keys().filter(|k| **k != node.kind()) {
                        let entry = dependents.entry(*other).or_default();
                        if !entry.contains(&node.kind()) {
                            entry.push(node.kind());
                        }
                    }
                }
            }
        }

        Self {
            nodes,
            dependents,
            acyclic_cache: DashMap::new(),
        }
    }

    /// Get a node definition.
    pub fn node(&self, kind: ComponentType) -> Result<&DependencyNode, GraphError> {
        self.nodes
            .get(&kind)
            .ok_or(GraphError::UnknownComponent(kind))
    }

    /// Iterate node definitions in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.nodes.values()
    }

    /// Check whether the graph defines `kind`.
    pub fn contains(&self, kind: ComponentType) -> bool {
        self.nodes.contains_key(&kind)
    }

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The declared (possibly wildcard) dependencies of `kind`.
    pub fn dependencies(&self, kind: ComponentType) -> Result<&Dependencies, GraphError> {
        self.node(kind).map(DependencyNode::dependencies)
    }

    /// The precomputed level of `kind`.
    pub fn level(&self, kind: ComponentType) -> Result<u32, GraphError> {
        self.node(kind).map(DependencyNode::level)
    }

    /// Every node that reads from `kind`: nodes naming it explicitly plus
    /// every wildcard node other than `kind` itself.
    pub fn dependents(&self, kind: ComponentType) -> &[ComponentType] {
        self.dependents
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Reorder `types` so that every dependency precedes its dependents.
    ///
    /// Duplicates are collapsed. Fails with [`GraphError::UnknownComponent`]
    /// if a type is not in the graph and [`GraphError::CycleDetected`] if
    /// the subset contains a cycle (including one formed by wildcard
    /// expansion).
    pub fn topological_sort(
        &self,
        types: &[ComponentType],
    ) -> Result<Vec<ComponentType>, GraphError> {
        let members = self.level_then_name_order(types)?;
        let member_set: HashSet<ComponentType> = members.iter().copied().collect();

        let mut walk = Walk {
            graph: self,
            members: &members,
            member_set: &member_set,
            visited: HashSet::with_capacity(members.len()),
            stack: HashSet::new(),
            order: Vec::with_capacity(members.len()),
        };

        for &kind in &members {
            walk.visit(kind)?;
        }

        Ok(walk.order)
    }

    /// Check `types` for cycles without raising.
    ///
    /// Types not in the graph have no edges and are ignored. Results are
    /// cached by the sorted subset.
    pub fn is_acyclic(&self, types: &[ComponentType]) -> bool {
        let mut key: Vec<ComponentType> =
            types.iter().copied().filter(|k| self.contains(*k)).collect();
        key.sort_unstable();
        key.dedup();

        if let Some(cached) = self.acyclic_cache.get(&key) {
            return *cached;
        }

        let acyclic = self.topological_sort(&key).is_ok();
        self.acyclic_cache.insert(key, acyclic);
        acyclic
    }

    /// Number of memoized acyclicity results.
    pub fn cached_checks(&self) -> usize {
        self.acyclic_cache.len()
    }

    /// Execution order over the enabled entries of `components`.
    ///
    /// Never fails: on a cycle the order falls back to (level, name).
    pub fn calculation_order(
        &self,
        components: &IndexMap<ComponentType, ComponentData>,
    ) -> Vec<ComponentType> {
        let enabled: Vec<ComponentType> = components
            .iter()
            .filter(|(kind, data)| data.enabled && self.contains(**kind))
            .map(|(kind, _)| *kind)
            .collect();

        match self.topological_sort(&enabled) {
            Ok(order) => order,
            Err(err) => {
                warn!(error = %err, "dependency ordering failed, using level order");
                // Every member was filtered to graph nodes above.
                self.level_then_name_order(&enabled).unwrap_or(enabled)
            }
        }
    }

    /// Deduplicate and sort by (level, name).
    fn level_then_name_order(
        &self,
        types: &[ComponentType],
    ) -> Result<Vec<ComponentType>, GraphError> {
        let mut keyed = Vec::with_capacity(types.len());
        let mut seen = HashSet::with_capacity(types.len());
        for &kind in types {
            if seen.insert(kind) {
                keyed.push((self.level(kind)?, kind));
            }
        }
        keyed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.as_str().cmp(b.1.as_str())));
        Ok(keyed.into_iter().map(|(_, kind)| kind).collect())
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::standard()
    }
}

/// DFS state for one topological sort.
struct Walk<'a> {
    graph: &'a DependencyGraph,
    members: &'a [ComponentType],
    member_set: &'a HashSet<ComponentType>,
    visited: HashSet<ComponentType>,
    stack: HashSet<ComponentType>,
    order: Vec<ComponentType>,
}

impl Walk<'_> {
    fn visit(&mut self, kind: ComponentType) -> Result<(), GraphError> {
        if self.stack.contains(&kind) {
            debug!(component = %kind, "cycle reached during ordering");
            return Err(GraphError::CycleDetected(kind));
        }
        if self.visited.contains(&kind) {
            return Ok(());
        }

        self.stack.insert(kind);
        match self.graph.dependencies(kind)? {
            Dependencies::All => {
                for &other in self.members {
                    if other != kind {
                        self.visit(other)?;
                    }
                }
            }
            Dependencies::Fixed(list) => {
                for &dep in list {
                    if self.member_set.contains(&dep) {
                        self.visit(dep)?;
                    }
                }
            }
        }
        self.stack.remove(&kind);

        self.visited.insert(kind);
        self.order.push(kind);
        Ok(())
    }
}
