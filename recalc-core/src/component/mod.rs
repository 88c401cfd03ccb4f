//! Component Catalog
//!
//! This module defines the closed set of cost components the engine knows
//! about, plus the two shapes the rest of the crate passes around:
//!
//! - [`ComponentType`]: one identifier from the fixed catalog
//! - [`ComponentRef`]: a schedule target, which may name a type that is not
//!   in the catalog (so a bad request can be reported per item instead of
//!   being rejected at the call site)
//! - [`ComponentData`]: the enable flag and parameters read from a store

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One identifier from the fixed component catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentType {
    /// Network monitoring (sensor based).
    Prtg,
    /// Capital equipment purchases.
    Capital,
    Onboarding,
    Assessment,
    Admin,
    CustomDevelopment,
    /// Support coverage, priced per device.
    Support,
    PackageEssentials,
    PackageProfessional,
    PackageEnterprise,
    Term1Year,
    Term3Year,
    Term5Year,
    /// Contract pricing that needs the grand total of everything else.
    NaasStandard,
    NaasEnhanced,
}

impl ComponentType {
    /// Every component type, in catalog order.
    pub const ALL: [ComponentType; 15] = [
        ComponentType::Prtg,
        ComponentType::Capital,
        ComponentType::Onboarding,
        ComponentType::Assessment,
        ComponentType::Admin,
        ComponentType::CustomDevelopment,
        ComponentType::Support,
        ComponentType::PackageEssentials,
        ComponentType::PackageProfessional,
        ComponentType::PackageEnterprise,
        ComponentType::Term1Year,
        ComponentType::Term3Year,
        ComponentType::Term5Year,
        ComponentType::NaasStandard,
        ComponentType::NaasEnhanced,
    ];

    /// Number of catalog entries.
    pub const COUNT: usize = Self::ALL.len();

    /// Dense index into tables sized [`ComponentType::COUNT`].
    pub const fn index(self) -> usize {
        match self {
            ComponentType::Prtg => 0,
            ComponentType::Capital => 1,
            ComponentType::Onboarding => 2,
            ComponentType::Assessment => 3,
            ComponentType::Admin => 4,
            ComponentType::CustomDevelopment => 5,
            ComponentType::Support => 6,
            ComponentType::PackageEssentials => 7,
            ComponentType::PackageProfessional => 8,
            ComponentType::PackageEnterprise => 9,
            ComponentType::Term1Year => 10,
            ComponentType::Term3Year => 11,
            ComponentType::Term5Year => 12,
            ComponentType::NaasStandard => 13,
            ComponentType::NaasEnhanced => 14,
        }
    }

    /// The stable string identifier.
    pub const fn as_str(self) -> &'static str {
        match self {
            ComponentType::Prtg => "prtg",
            ComponentType::Capital => "capital",
            ComponentType::Onboarding => "onboarding",
            ComponentType::Assessment => "assessment",
            ComponentType::Admin => "admin",
            ComponentType::CustomDevelopment => "customDevelopment",
            ComponentType::Support => "support",
            ComponentType::PackageEssentials => "packageEssentials",
            ComponentType::PackageProfessional => "packageProfessional",
            ComponentType::PackageEnterprise => "packageEnterprise",
            ComponentType::Term1Year => "term1Year",
            ComponentType::Term3Year => "term3Year",
            ComponentType::Term5Year => "term5Year",
            ComponentType::NaasStandard => "naasStandard",
            ComponentType::NaasEnhanced => "naasEnhanced",
        }
    }

    /// Key under which this component's data is exposed to dependents,
    /// e.g. `capitalData`.
    pub fn data_key(self) -> String {
        format!("{}Data", self.as_str())
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown component type: {0}")]
pub struct ParseComponentError(pub String);

impl FromStr for ComponentType {
    type Err = ParseComponentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComponentType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseComponentError(s.to_string()))
    }
}

/// Broad grouping of a component, used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentCategory {
    Monitoring,
    Hardware,
    Services,
    Support,
    Package,
    ContractTerm,
    ContractPricing,
}

/// A schedule target.
///
/// Known targets carry a [`ComponentType`]; anything else is kept verbatim
/// so the orchestrator can record it as a failed item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentRef {
    Known(ComponentType),
    Unknown(String),
}

impl ComponentRef {
    /// The catalog type, if this ref names one.
    pub fn known(&self) -> Option<ComponentType> {
        match self {
            ComponentRef::Known(kind) => Some(*kind),
            ComponentRef::Unknown(_) => None,
        }
    }

    /// The string identifier.
    pub fn as_str(&self) -> &str {
        match self {
            ComponentRef::Known(kind) => kind.as_str(),
            ComponentRef::Unknown(name) => name,
        }
    }
}

impl From<ComponentType> for ComponentRef {
    fn from(kind: ComponentType) -> Self {
        ComponentRef::Known(kind)
    }
}

impl From<&str> for ComponentRef {
    fn from(name: &str) -> Self {
        match name.parse::<ComponentType>() {
            Ok(kind) => ComponentRef::Known(kind),
            Err(_) => ComponentRef::Unknown(name.to_string()),
        }
    }
}

impl From<String> for ComponentRef {
    fn from(name: String) -> Self {
        ComponentRef::from(name.as_str())
    }
}

impl PartialEq<ComponentType> for ComponentRef {
    fn eq(&self, other: &ComponentType) -> bool {
        self.known() == Some(*other)
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enable flag and parameters for one component, as held by a store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComponentData {
    pub enabled: bool,
    #[serde(default)]
    pub params: Value,
}

impl ComponentData {
    /// An enabled component with the given parameters.
    pub fn enabled(params: Value) -> Self {
        Self {
            enabled: true,
            params,
        }
    }

    /// A disabled component with the given parameters.
    pub fn disabled(params: Value) -> Self {
        Self {
            enabled: false,
            params,
        }
    }

    /// Look up a top-level parameter field.
    pub fn param(&self, field: &str) -> Option<&Value> {
        self.params.get(field)
    }
}
