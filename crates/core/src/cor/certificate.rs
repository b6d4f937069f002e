//! Certificate of registration layout.

use serde_json::Value;

use super::record::EnrollmentRecord;
use crate::billing::{round_cents, FeeCategory, Peso};
use crate::render::{Block, Column, Element, Layout};
use crate::schema::{render_record, EntitySchema};

/// Id of the print control; hidden while capturing.
pub const PRINT_BUTTON_ID: &str = "printPDFButton";

const NO_BILLINGS: &str = "No billings available.";
const PLACEHOLDER_ROWS: usize = 5;

/// Institution block printed above the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateHeader {
    pub institution: String,
    pub campus: Option<String>,
}

impl Default for CertificateHeader {
    fn default() -> Self {
        Self {
            institution: "University".to_string(),
            campus: None,
        }
    }
}

/// Build the fixed certificate layout for a committed record.
pub fn certificate_layout(record: &EnrollmentRecord, header: &CertificateHeader) -> Layout {
    let student = &record.student;
    let mut layout = Layout::new(format!("Certificate of Registration {}", student.id));

    layout.push(Element::new(Block::Heading {
        text: "Certificate of Registration".to_string(),
    }));
    layout.push(Element::new(Block::Heading {
        text: header.institution.clone(),
    }));
    if let Some(campus) = &header.campus {
        layout.push(Element::new(Block::Text {
            text: campus.clone(),
        }));
    }
    layout.push(Element::new(Block::Heading {
        text: "Registration Form".to_string(),
    }));

    layout.push(Element::new(Block::Fields {
        fields: student_fields(record),
    }));

    layout.push(Element::new(Block::Table {
        headers: ["COURSE CODE", "COURSE TITLE", "UNITS", "TIME", "DAY", "ROOM"]
            .iter()
            .map(|h| h.to_string())
            .collect(),
        rows: course_rows(record),
    }));

    let buckets = record.fee_columns();
    layout.push(Element::new(Block::Columns {
        columns: FeeCategory::ALL
            .iter()
            .map(|category| Column {
                heading: category.label().to_string(),
                lines: buckets
                    .get(*category)
                    .iter()
                    .map(|line| (line.billing.name.clone(), format!("{:.2}", round_cents(line.price))))
                    .collect(),
                placeholder: Some(NO_BILLINGS.to_string()),
            })
            .collect(),
    }));

    let totals = record.totals();
    layout.push(Element::new(Block::Fields {
        fields: vec![
            ("Total Units".to_string(), totals.units.to_string()),
            ("Total Hours".to_string(), totals.hours.to_string()),
            (
                "Total Amount".to_string(),
                Peso(record.total_acad_term_billing_price).to_string(),
            ),
        ],
    }));

    layout.push(Element::new(Block::Signature {
        label: "Student's Signature:".to_string(),
    }));

    layout.push(
        Element::new(Block::Control {
            label: "Print PDF".to_string(),
        })
        .with_id(PRINT_BUTTON_ID),
    );

    layout
}

fn student_fields(record: &EnrollmentRecord) -> Vec<(String, String)> {
    let student = &record.student;
    let value = serde_json::to_value(student).unwrap_or(Value::Null);

    let mut fields = vec![("Student Name".to_string(), student.full_name())];
    for field in render_record(&EntitySchema::student(), &value) {
        let rendered = match field.label {
            "Section" => student.program_block(),
            _ => field.value,
        };
        fields.push((field.label.to_string(), rendered));
    }

    let date = record
        .registration_date()
        .map(|d| d.format("%-m/%-d/%Y").to_string())
        .unwrap_or_default();
    fields.push(("Date".to_string(), date));
    fields
}

fn course_rows(record: &EnrollmentRecord) -> Vec<Vec<String>> {
    if record.enrollments.is_empty() {
        return vec![vec![String::new(); 6]; PLACEHOLDER_ROWS];
    }

    record
        .enrollments
        .iter()
        .map(|row| {
            let course = &row.course;
            let or_na = |s: &str| {
                if s.is_empty() {
                    "N/A".to_string()
                } else {
                    s.to_string()
                }
            };
            vec![
                or_na(&course.code),
                or_na(&course.title),
                course.total_units().to_string(),
                row.schedule.time_or_tba().to_string(),
                row.schedule.day_or_tba().to_string(),
                row.schedule.room_or_tba().to_string(),
            ]
        })
        .collect()
}
