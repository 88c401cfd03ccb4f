//! Calculation results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The four cost dimensions every calculation reports.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub monthly: f64,
    pub annual: f64,
    pub three_year: f64,
    pub one_time: f64,
}

impl Totals {
    /// All four dimensions zero.
    pub const ZERO: Totals = Totals {
        monthly: 0.0,
        annual: 0.0,
        three_year: 0.0,
        one_time: 0.0,
    };

    /// Totals for a recurring monthly cost.
    pub fn recurring(monthly: f64) -> Self {
        Self {
            monthly,
            annual: monthly * 12.0,
            three_year: monthly * 36.0,
            one_time: 0.0,
        }
    }

    /// Totals for a one-time cost with no recurring component.
    pub fn one_time(amount: f64) -> Self {
        Self {
            one_time: amount,
            ..Self::ZERO
        }
    }

    /// Whether every dimension is a finite number.
    pub fn is_finite(&self) -> bool {
        self.monthly.is_finite()
            && self.annual.is_finite()
            && self.three_year.is_finite()
            && self.one_time.is_finite()
    }
}

impl std::ops::Add for Totals {
    type Output = Totals;

    fn add(self, rhs: Totals) -> Totals {
        Totals {
            monthly: self.monthly + rhs.monthly,
            annual: self.annual + rhs.annual,
            three_year: self.three_year + rhs.three_year,
            one_time: self.one_time + rhs.one_time,
        }
    }
}

/// Output of one component calculation.
///
/// `totals` is always present, including on failed results.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CalculationResult {
    pub totals: Totals,

    /// Free-form line items.
    #[serde(default)]
    pub breakdown: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CalculationResult {
    /// A successful result with no breakdown.
    pub fn new(totals: Totals) -> Self {
        Self {
            totals,
            ..Self::default()
        }
    }

    /// The canonical result for a disabled component.
    pub fn zero() -> Self {
        Self::new(Totals::ZERO)
    }

    /// A failed result. Totals are zero.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::zero()
        }
    }

    pub fn with_breakdown(mut self, breakdown: Value) -> Self {
        self.breakdown = breakdown;
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
