//! Fee aggregation: billing lines to a priced invoice.

use rust_decimal::Decimal;

use super::types::{
    round_cents, BillingLineItem, FeeCategory, Invoice, PaymentTerms, RoundingPolicy,
};

/// Billing lines partitioned by category, preserving input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeeBuckets<'a> {
    pub lab: Vec<&'a BillingLineItem>,
    pub other: Vec<&'a BillingLineItem>,
    pub assessment: Vec<&'a BillingLineItem>,
}

impl<'a> FeeBuckets<'a> {
    /// Lines of one category.
    pub fn get(&self, category: FeeCategory) -> &[&'a BillingLineItem] {
        match category {
            FeeCategory::LabFees => &self.lab,
            FeeCategory::OtherFees => &self.other,
            FeeCategory::Assessment => &self.assessment,
        }
    }
}

/// Split lines into the three fee buckets.
pub fn partition(items: &[BillingLineItem]) -> FeeBuckets<'_> {
    let mut buckets = FeeBuckets::default();
    for item in items {
        match item.category() {
            FeeCategory::LabFees => buckets.lab.push(item),
            FeeCategory::OtherFees => buckets.other.push(item),
            FeeCategory::Assessment => buckets.assessment.push(item),
        }
    }
    buckets
}

/// Aggregate billing lines with incremental rounding.
///
/// Pure: identical input always produces an identical invoice. The returned
/// invoice carries no advising basis; callers attach one with
/// [`Invoice::with_basis`].
pub fn aggregate(items: &[BillingLineItem], terms: PaymentTerms) -> Invoice {
    aggregate_with(items, terms, RoundingPolicy::Incremental)
}

/// Aggregate billing lines with an explicit rounding policy.
pub fn aggregate_with(
    items: &[BillingLineItem],
    terms: PaymentTerms,
    policy: RoundingPolicy,
) -> Invoice {
    let buckets = partition(items);

    let lab_total = bucket_total(&buckets.lab, policy);
    let other_total = bucket_total(&buckets.other, policy);
    let assessment_total = bucket_total(&buckets.assessment, policy);

    let grand_total = match policy {
        RoundingPolicy::Incremental => round_cents(lab_total + other_total + assessment_total),
        RoundingPolicy::FinalOnly => {
            round_cents(items.iter().map(|item| item.price).sum::<Decimal>())
        }
    };

    let amount_needed = if terms.voucher {
        Decimal::ZERO
    } else {
        grand_total
    };
    let (change, balance) = if terms.voucher {
        (Decimal::ZERO, Decimal::ZERO)
    } else {
        let received = terms.effective_received();
        (
            round_cents((received - amount_needed).max(Decimal::ZERO)),
            round_cents((amount_needed - received).max(Decimal::ZERO)),
        )
    };

    Invoice {
        lab_total,
        other_total,
        assessment_total,
        grand_total,
        amount_needed,
        change,
        balance,
        basis: None,
    }
}

fn bucket_total(lines: &[&BillingLineItem], policy: RoundingPolicy) -> Decimal {
    match policy {
        RoundingPolicy::Incremental => lines
            .iter()
            .fold(Decimal::ZERO, |sum, line| round_cents(sum + line.price)),
        RoundingPolicy::FinalOnly => {
            round_cents(lines.iter().map(|line| line.price).sum::<Decimal>())
        }
    }
}
