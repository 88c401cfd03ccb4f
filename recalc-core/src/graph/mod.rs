//! Dependency Graph
//!
//! This module describes which cost components read from which, and derives
//! a valid execution order for any subset of them.
//!
//! # Overview
//!
//! The graph is a directed graph where:
//!
//! - Nodes are component types, each with a precomputed level and category
//! - Edges are dependencies: if support reads from capital, support lists
//!   capital as a dependency
//! - A node may declare the wildcard, meaning it reads from every other
//!   enabled component
//!
//! # Design Decisions
//!
//! 1. The graph holds static knowledge only. Which components are enabled
//!    is runtime state supplied per call, so the same graph orders any
//!    subset without being rebuilt.
//!
//! 2. Reverse edges are indexed at construction for cascade lookups.
//!
//! 3. Two wildcard nodes enabled together depend on each other. This is
//!    only visible when the wildcard is expanded during a sort, which then
//!    reports a cycle and callers fall back to level order.

mod catalog;
mod dependency;
mod node;
mod validation;

pub use catalog::consumed_fields;
pub use dependency::DependencyGraph;
pub use node::{Dependencies, DependencyList, DependencyNode};
pub use validation::{RelationshipIssue, ValidationReport};
