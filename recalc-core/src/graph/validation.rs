//! Relationship validation.
//!
//! Checks a component snapshot against the graph before a batch runs:
//! missing hard dependencies are errors, everything else is a warning.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use super::catalog::consumed_fields;
use super::dependency::DependencyGraph;
use super::node::Dependencies;
use crate::component::{ComponentData, ComponentType};

/// A single finding from [`DependencyGraph::validate_relationships`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RelationshipIssue {
    /// An enabled component names a dependency that is not enabled.
    MissingDependency {
        component: ComponentType,
        dependency: ComponentType,
    },

    /// A wildcard component is enabled with nothing else to read from.
    NoPeers { component: ComponentType },

    /// A dependency's parameters lack a field the dependent reads.
    MissingField {
        component: ComponentType,
        dependency: ComponentType,
        field: &'static str,
    },
}

impl fmt::Display for RelationshipIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationshipIssue::MissingDependency { component, dependency } => {
                write!(f, "{component} requires {dependency} to be enabled")
            }
            RelationshipIssue::NoPeers { component } => {
                write!(f, "{component} depends on all components but no other component is enabled")
            }
            RelationshipIssue::MissingField {
                component,
                dependency,
                field,
            } => write!(f, "{component} reads {dependency}.{field} but it is not set"),
        }
    }
}

/// Outcome of a relationship check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<RelationshipIssue>,
    pub warnings: Vec<RelationshipIssue>,
}

impl ValidationReport {
    /// True when there are no errors. Warnings do not count.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl DependencyGraph {
    /// Check every enabled entry of `components` against its declared
    /// dependencies.
    ///
    /// A type missing from `components` counts as disabled. Types the
    /// graph does not define are skipped.
    pub fn validate_relationships(
        &self,
        components: &IndexMap<ComponentType, ComponentData>,
    ) -> ValidationReport {
        let mut report = ValidationReport::default();
        let is_enabled = |kind: &ComponentType| components.get(kind).is_some_and(|d| d.enabled);

        for (&component, _) in components.iter().filter(|(_, data)| data.enabled) {
            let Ok(node) = self.node(component) else {
                continue;
            };

            match node.dependencies() {
                Dependencies::All => {
                    let peers = components
                        .iter()
                        .filter(|(kind, data)| **kind != component && data.enabled)
                        .count();
                    if peers == 0 {
                        report.warnings.push(RelationshipIssue::NoPeers { component });
                    }
                }
                Dependencies::Fixed(list) => {
                    for &dependency in list {
                        if !is_enabled(&dependency) {
                            report.errors.push(RelationshipIssue::MissingDependency {
                                component,
                                dependency,
                            });
                            continue;
                        }

                        let data = &components[&dependency];
                        for &field in consumed_fields(component, dependency) {
                            if data.param(field).is_none() {
                                report.warnings.push(RelationshipIssue::MissingField {
                                    component,
                                    dependency,
                                    field,
                                });
                            }
                        }
                    }
                }
            }
        }

        report
    }
}
