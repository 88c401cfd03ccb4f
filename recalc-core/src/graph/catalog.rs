//! The standard component graph.
//!
//! ```text
//!   level 0   prtg   capital   onboarding  assessment  admin  customDevelopment
//!              │        │
//!   level 1   package*  support
//!                         │
//!   level 2             term*
//!
//!   level 3   naasStandard, naasEnhanced  ('*': everything else enabled)
//! ```

use crate::component::{ComponentCategory as Category, ComponentType as T};

use super::node::{Dependencies, DependencyNode};

/// Node definitions for the standard catalog, one per [`T::ALL`] entry.
pub fn standard_nodes() -> Vec<DependencyNode> {
    vec![
        DependencyNode::root(T::Prtg, Category::Monitoring),
        DependencyNode::root(T::Capital, Category::Hardware),
        DependencyNode::root(T::Onboarding, Category::Services),
        DependencyNode::root(T::Assessment, Category::Services),
        DependencyNode::root(T::Admin, Category::Services),
        DependencyNode::root(T::CustomDevelopment, Category::Services),
        DependencyNode::new(T::Support, Dependencies::on(&[T::Capital]), 1, Category::Support),
        DependencyNode::new(T::PackageEssentials, Dependencies::on(&[T::Prtg]), 1, Category::Package),
        DependencyNode::new(T::PackageProfessional, Dependencies::on(&[T::Prtg]), 1, Category::Package),
        DependencyNode::new(T::PackageEnterprise, Dependencies::on(&[T::Prtg]), 1, Category::Package),
        DependencyNode::new(T::Term1Year, Dependencies::on(&[T::Support]), 2, Category::ContractTerm),
        DependencyNode::new(T::Term3Year, Dependencies::on(&[T::Support]), 2, Category::ContractTerm),
        DependencyNode::new(T::Term5Year, Dependencies::on(&[T::Support]), 2, Category::ContractTerm),
        DependencyNode::new(T::NaasStandard, Dependencies::All, 3, Category::ContractPricing),
        DependencyNode::new(T::NaasEnhanced, Dependencies::All, 3, Category::ContractPricing),
    ]
}

/// Parameter fields a dependent is known to read from one of its
/// dependencies. Used for the heuristic relationship warnings.
pub fn consumed_fields(dependent: T, dependency: T) -> &'static [&'static str] {
    match (dependent, dependency) {
        (T::Support, T::Capital) => &["equipment"],
        (T::PackageEssentials | T::PackageProfessional | T::PackageEnterprise, T::Prtg) => {
            &["sensors"]
        }
        (T::Term1Year | T::Term3Year | T::Term5Year, T::Support) => &["coverage"],
        _ => &[],
    }
}
