use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::billing::RoundingPolicy;
use crate::student::AcademicTerm;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub backend: BackendConfig,
    #[serde(default)]
    pub term: TermConfig,
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

/// Remote enrollment API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Base URL, e.g. `https://registrar.example.edu`.
    pub url: String,
    /// Path prefix prepended to every endpoint.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl BackendConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_prefix: default_api_prefix(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Academic term the evaluation step looks at
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TermConfig {
    #[serde(default)]
    pub school_year: Option<String>,
    #[serde(default)]
    pub semester: Option<String>,
}

impl TermConfig {
    pub fn academic_term(&self) -> Option<AcademicTerm> {
        let school_year = self.school_year.clone()?;
        Some(AcademicTerm {
            school_year,
            semester: self.semester.clone(),
        })
    }
}

/// Fee aggregation
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BillingConfig {
    #[serde(default)]
    pub rounding: RoundingPolicy,
}

/// Certificate of registration rendering
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderConfig {
    /// Capture oversampling factor.
    #[serde(default = "default_oversample")]
    pub oversample: u32,
    #[serde(default = "default_page_width_mm")]
    pub page_width_mm: f64,
    #[serde(default = "default_page_height_mm")]
    pub page_height_mm: f64,
    /// Paginate instead of fitting onto one page.
    #[serde(default)]
    pub slice_pages: bool,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Element ids hidden during capture.
    #[serde(default = "default_exclude_ids")]
    pub exclude_ids: Vec<String>,
    /// Element classes hidden during capture.
    #[serde(default)]
    pub exclude_classes: Vec<String>,
    /// Institution printed in the certificate header.
    #[serde(default = "default_institution")]
    pub institution: String,
    #[serde(default)]
    pub campus: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            oversample: default_oversample(),
            page_width_mm: default_page_width_mm(),
            page_height_mm: default_page_height_mm(),
            slice_pages: false,
            output_dir: default_output_dir(),
            exclude_ids: default_exclude_ids(),
            exclude_classes: Vec::new(),
            institution: default_institution(),
            campus: None,
        }
    }
}

fn default_oversample() -> u32 {
    3
}

fn default_page_width_mm() -> f64 {
    210.0
}

fn default_page_height_mm() -> f64 {
    297.0
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("documents")
}

fn default_institution() -> String {
    "University".to_string()
}

fn default_exclude_ids() -> Vec<String> {
    vec!["printPDFButton".to_string()]
}
