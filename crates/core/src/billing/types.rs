//! Billing data types.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{de, Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::advising::AdvisingStamp;

/// Fee category of a billing-list entry. The only grouping key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeCategory {
    LabFees,
    OtherFees,
    Assessment,
}

impl FeeCategory {
    /// All categories in presentation order.
    pub const ALL: [FeeCategory; 3] = [
        FeeCategory::LabFees,
        FeeCategory::OtherFees,
        FeeCategory::Assessment,
    ];

    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeCategory::LabFees => "LAB_FEES",
            FeeCategory::OtherFees => "OTHER_FEES",
            FeeCategory::Assessment => "ASSESSMENT",
        }
    }

    /// Column heading used on the billing screen and the COR.
    pub fn label(&self) -> &'static str {
        match self {
            FeeCategory::LabFees => "Lab Fees",
            FeeCategory::OtherFees => "Other Fees",
            FeeCategory::Assessment => "Assessment",
        }
    }
}

/// An entry of the registrar's billing list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillingItem {
    pub name: String,
    pub category: FeeCategory,
    #[serde(default, deserialize_with = "deserialize_money")]
    pub price: Decimal,
}

/// A billing line attached to a student's term.
///
/// The line price is what gets charged; the list price is informational.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillingLineItem {
    #[serde(alias = "billing_list")]
    pub billing: BillingItem,
    #[serde(default, deserialize_with = "deserialize_money")]
    pub price: Decimal,
}

impl BillingLineItem {
    /// Create a line whose charged price equals the list price.
    pub fn new(name: impl Into<String>, category: FeeCategory, price: Decimal) -> Self {
        Self {
            billing: BillingItem {
                name: name.into(),
                category,
                price,
            },
            price,
        }
    }

    pub fn category(&self) -> FeeCategory {
        self.billing.category
    }
}

/// Payment terms entered on the billing screen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct PaymentTerms {
    /// Free-tuition voucher; suppresses every payment obligation.
    #[serde(default)]
    pub voucher: bool,
    /// Amount received from the student.
    #[serde(default)]
    pub received: Decimal,
}

impl PaymentTerms {
    pub fn voucher() -> Self {
        Self {
            voucher: true,
            received: Decimal::ZERO,
        }
    }

    pub fn cash(received: Decimal) -> Self {
        Self {
            voucher: false,
            received,
        }
    }

    /// Received amount with negative input clamped to zero.
    pub fn effective_received(&self) -> Decimal {
        self.received.max(Decimal::ZERO)
    }
}

/// How partial sums are rounded while aggregating.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// Round the running sum to cents after every addition, then round the
    /// grand total again. Matches the backend's billing figures.
    #[default]
    Incremental,
    /// Sum raw prices and round each total once.
    FinalOnly,
}

/// Priced invoice derived from billing lines. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invoice {
    pub lab_total: Decimal,
    pub other_total: Decimal,
    pub assessment_total: Decimal,
    pub grand_total: Decimal,
    pub amount_needed: Decimal,
    /// Money handed back: received beyond the amount needed.
    pub change: Decimal,
    /// Amount still owed after the received money is applied.
    #[serde(default)]
    pub balance: Decimal,
    /// Advised course set this invoice was priced for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basis: Option<AdvisingStamp>,
}

impl Invoice {
    /// Attach the advising stamp the invoice was computed against.
    pub fn with_basis(mut self, basis: AdvisingStamp) -> Self {
        self.basis = Some(basis);
        self
    }

    /// Total for one category.
    pub fn total_for(&self, category: FeeCategory) -> Decimal {
        match category {
            FeeCategory::LabFees => self.lab_total,
            FeeCategory::OtherFees => self.other_total,
            FeeCategory::Assessment => self.assessment_total,
        }
    }
}

/// Peso amount for display (`P 5500.00`). The prefix is presentation only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peso(pub Decimal);

impl fmt::Display for Peso {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P {:.2}", round_cents(self.0))
    }
}

/// Round to two decimals (cent precision), half a cent away from zero.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Parse a money amount as sent by the backend.
pub fn parse_money(text: &str) -> Result<Decimal, rust_decimal::Error> {
    Decimal::from_str_exact(text.trim())
}

/// Accepts JSON numbers, numeric strings and null (zero). Anything else is a
/// deserialization error so a corrupt fee never bills as free.
pub(crate) fn deserialize_money<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawMoney {
        Number(serde_json::Number),
        Text(String),
    }

    let text = match Option::<RawMoney>::deserialize(deserializer)? {
        None => return Ok(Decimal::ZERO),
        Some(RawMoney::Number(n)) => n.to_string(),
        Some(RawMoney::Text(s)) => s,
    };
    parse_money(&text).map_err(|e| {
        warn!("Rejecting unparseable money amount '{}': {}", text, e);
        de::Error::custom(format!("invalid money amount '{}': {}", text, e))
    })
}
