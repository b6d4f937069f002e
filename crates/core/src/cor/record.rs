use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::advising::CourseTotals;
use crate::billing::{deserialize_money, partition, BillingLineItem, FeeBuckets};
use crate::student::{Course, EnrollmentRow, Student};

/// Committed enrollment of one student for a term, as returned by `GET /cor`.
///
/// A snapshot: totals are printed as the backend committed them and never
/// recomputed from the lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrollmentRecord {
    pub student: Student,
    #[serde(default)]
    pub enrollments: Vec<EnrollmentRow>,
    #[serde(default)]
    pub acad_term_billings: Vec<BillingLineItem>,
    #[serde(default, deserialize_with = "deserialize_money")]
    pub total_acad_term_billing_price: Decimal,
}

impl EnrollmentRecord {
    pub fn courses(&self) -> impl Iterator<Item = &Course> {
        self.enrollments.iter().map(|row| &row.course)
    }

    pub fn totals(&self) -> CourseTotals {
        CourseTotals::of(self.courses())
    }

    /// Billing lines grouped for the three fee columns.
    pub fn fee_columns(&self) -> FeeBuckets<'_> {
        partition(&self.acad_term_billings)
    }

    /// Date the first row was committed.
    pub fn registration_date(&self) -> Option<NaiveDate> {
        self.enrollments
            .iter()
            .find_map(|row| row.date)
            .map(|d| d.date_naive())
    }

    /// True if every enrolled course code is in `advised`.
    pub fn is_within<'a>(&self, advised: impl IntoIterator<Item = &'a str>) -> bool {
        let advised: std::collections::HashSet<&str> = advised.into_iter().collect();
        self.courses().all(|c| advised.contains(c.code.as_str()))
    }
}
