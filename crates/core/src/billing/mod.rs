//! Fee aggregation for a student's term.
//!
//! Billing lines come from the advising response (before confirmation) or
//! from the COR snapshot (after confirmation). The aggregator is a pure
//! function over those lines: it partitions them by [`FeeCategory`], sums
//! each bucket at cent precision in `rust_decimal::Decimal` and derives what the student has to pay.
//!
//! # Example
//!
//! ```ignore
//! use enrollment_core::billing::{aggregate, BillingLineItem, FeeCategory, PaymentTerms};
//! use rust_decimal::Decimal;
//!
//! let lines = vec![
//!     BillingLineItem::new("Computer Lab", FeeCategory::LabFees, Decimal::from(800)),
//!     BillingLineItem::new("Tuition", FeeCategory::Assessment, Decimal::from(3200)),
//! ];
//! let invoice = aggregate(&lines, PaymentTerms::cash(Decimal::from(4000)));
//! assert_eq!(invoice.grand_total, Decimal::from(4000));
//! ```

mod aggregator;
mod types;

pub use aggregator::{aggregate, aggregate_with, partition, FeeBuckets};
pub use types::{
    parse_money, round_cents, BillingItem, BillingLineItem, FeeCategory, Invoice, PaymentTerms, Peso,
    RoundingPolicy,
};
pub(crate) use types::deserialize_money;
