//! Explicit per-entity field schemas.
//!
//! A schema lists, in display order, which fields of a record are shown, under
//! which label and how their values are formatted. [`render_record`] turns any
//! serialized record into label/value pairs using only the schema, so views
//! never infer the field list from whatever keys a payload happens to carry.

use serde::Serialize;
use serde_json::Value;

/// How a field value is formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    Date,
    /// One of a fixed set of wire values; displayed through `options`.
    Choice,
    /// Object rendered from the members named in `options`.
    Composite,
}

/// A single displayed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    /// Dotted path into the record (`address.city`).
    pub field: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    /// `(wire value, display label)` pairs for [`FieldKind::Choice`];
    /// `(member, separator)` pairs for [`FieldKind::Composite`].
    pub options: &'static [(&'static str, &'static str)],
}

impl FieldSpec {
    pub const fn new(field: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            field,
            label,
            kind,
            options: &[],
        }
    }

    pub const fn choice(
        field: &'static str,
        label: &'static str,
        options: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self {
            field,
            label,
            kind: FieldKind::Choice,
            options,
        }
    }

    pub const fn composite(
        field: &'static str,
        label: &'static str,
        members: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self {
            field,
            label,
            kind: FieldKind::Composite,
            options: members,
        }
    }
}

/// Ordered field list of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySchema {
    pub entity: &'static str,
    pub fields: Vec<FieldSpec>,
}

const STUDENT_STATUS_OPTIONS: &[(&str, &str)] = &[
    ("REGULAR", "Regular"),
    ("IRREGULAR", "Irregular"),
    ("TRANSFEREE", "Transferee"),
];

const ADDRESS_MEMBERS: &[(&str, &str)] = &[
    ("street", " "),
    ("barangay", " "),
    ("city", ", "),
    ("province", ""),
];

const ENROLLMENT_STATUS_OPTIONS: &[(&str, &str)] = &[
    ("NOT_ENROLLED", "Not Enrolled"),
    ("PENDING_REQUEST", "Pending Request"),
    ("WAITLISTED", "Waitlisted"),
    ("ENROLLED", "Enrolled"),
];

impl EntitySchema {
    /// Student block of the certificate of registration.
    pub fn student() -> Self {
        Self {
            entity: "student",
            fields: vec![
                FieldSpec::new("id", "Student Number", FieldKind::Text),
                FieldSpec::new("program", "Course", FieldKind::Text),
                FieldSpec::new("year_level", "Year", FieldKind::Number),
                FieldSpec::composite("address", "Address", ADDRESS_MEMBERS),
                FieldSpec::new("semester", "Semester", FieldKind::Text),
                FieldSpec::new("section", "Section", FieldKind::Text),
                FieldSpec::new("academic_year", "School Year", FieldKind::Text),
                FieldSpec::choice("status", "Registration Status", STUDENT_STATUS_OPTIONS),
                FieldSpec::choice(
                    "enrollment_status",
                    "Enrollment Status",
                    ENROLLMENT_STATUS_OPTIONS,
                ),
                FieldSpec::new("contact_number", "Contact Number", FieldKind::Text),
                FieldSpec::new("email", "Email Address", FieldKind::Text),
            ],
        }
    }

    /// Course rows of advising and evaluation views.
    pub fn course() -> Self {
        Self {
            entity: "course",
            fields: vec![
                FieldSpec::new("code", "Course Code", FieldKind::Text),
                FieldSpec::new("title", "Course Title", FieldKind::Text),
                FieldSpec::new("lecture_units", "Lec Units", FieldKind::Number),
                FieldSpec::new("lab_units", "Lab Units", FieldKind::Number),
                FieldSpec::new("lecture_hours", "Lec Hours", FieldKind::Number),
                FieldSpec::new("lab_hours", "Lab Hours", FieldKind::Number),
            ],
        }
    }

    /// Enrollment window listing.
    pub fn enrollment_window() -> Self {
        Self {
            entity: "enrollment_window",
            fields: vec![
                FieldSpec::new("program_name", "Program", FieldKind::Text),
                FieldSpec::new("from_date", "From", FieldKind::Date),
                FieldSpec::new("to_date", "To", FieldKind::Date),
                FieldSpec::new("message", "Message", FieldKind::Text),
            ],
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.field == name)
    }

    /// Column headings in display order.
    pub fn labels(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.label).collect()
    }
}

/// A formatted field ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedField {
    pub label: &'static str,
    pub value: String,
}

/// Format `record` through `schema`. Missing or null values render empty.
pub fn render_record(schema: &EntitySchema, record: &Value) -> Vec<RenderedField> {
    schema
        .fields
        .iter()
        .map(|spec| RenderedField {
            label: spec.label,
            value: lookup(record, spec.field)
                .map(|value| format_value(spec, value))
                .unwrap_or_default(),
        })
        .collect()
}

fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(record, |value, key| value.get(key))
}

fn format_value(spec: &FieldSpec, value: &Value) -> String {
    match (spec.kind, value) {
        (_, Value::Null) => String::new(),
        (FieldKind::Choice, Value::String(s)) => spec
            .options
            .iter()
            .find(|(wire, _)| *wire == s.as_str())
            .map(|(_, label)| label.to_string())
            .unwrap_or_else(|| s.clone()),
        (FieldKind::Date, Value::String(s)) => s.split('T').next().unwrap_or(s).to_string(),
        (FieldKind::Composite, Value::Object(map)) => {
            let mut out = String::new();
            for (member, separator) in spec.options {
                let part = map.get(*member).and_then(Value::as_str).map(str::trim);
                if let Some(part) = part.filter(|p| !p.is_empty()) {
                    out.push_str(part);
                    out.push_str(separator);
                }
            }
            out.trim_end_matches([' ', ',']).to_string()
        }
        (_, Value::String(s)) => s.clone(),
        (_, Value::Number(n)) => n.to_string(),
        (_, Value::Bool(b)) => (if *b { "Yes" } else { "No" }).to_string(),
        (_, other) => other.to_string(),
    }
}
