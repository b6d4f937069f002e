//! REST-over-JSON backend client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{BackendError, EnrollmentBackend};
use crate::advising::{AdvisingResult, AdvisingSubmission};
use crate::config::BackendConfig;
use crate::cor::EnrollmentRecord;
use crate::enrollment::{BatchEnrollment, EnrollmentStatus, StatusUpdate};
use crate::metrics::{BACKEND_DURATION, BACKEND_REQUESTS};
use crate::student::{EnrollmentRow, EnrollmentWindow, GradeRecord, Student, StudentId};

/// Error payloads the backend is known to send.
///
/// `{error: {message, errors: [{error}]}}`, `{error: "..."}` or
/// `{detail: "..."}`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<ErrorDetail>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Text(String),
    Structured {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        errors: Vec<ErrorItem>,
    },
}

#[derive(Debug, Deserialize)]
struct ErrorItem {
    error: String,
}

impl ErrorBody {
    fn into_parts(self) -> (Option<String>, Vec<String>) {
        match self.error {
            Some(ErrorDetail::Text(text)) => (Some(text), Vec::new()),
            Some(ErrorDetail::Structured { message, errors }) => (
                message.or(self.detail).or(self.message),
                errors.into_iter().map(|e| e.error).collect(),
            ),
            None => (self.detail.or(self.message), Vec::new()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WindowsResponse {
    #[serde(default)]
    enrollment_date: Vec<EnrollmentWindow>,
}

/// HTTP implementation of [`EnrollmentBackend`].
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a new client from configuration.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let url = config.url.trim().trim_end_matches('/');
        if url.is_empty() {
            return Err(BackendError::NotConfigured(
                "backend.url is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::NotConfigured(e.to_string()))?;

        let prefix = config.api_prefix.trim().trim_end_matches('/');
        let base_url = if prefix.is_empty() {
            url.to_string()
        } else if prefix.starts_with('/') {
            format!("{}{}", url, prefix)
        } else {
            format!("{}/{}", url, prefix)
        };

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn student_url(&self, id: &StudentId) -> String {
        self.url(&format!("/student/{}", urlencoding::encode(id.as_str())))
    }

    /// Send a request and decode a JSON body.
    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let body = self.execute(endpoint, request).await?;
        serde_json::from_str(&body)
            .map_err(|e| BackendError::ParseError(format!("{}: {}", endpoint, e)))
    }

    /// Send a mutating request; `{success: false}` counts as a rejection.
    async fn acknowledge(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> Result<(), BackendError> {
        let body = self.execute(endpoint, request).await?;
        if body.trim().is_empty() {
            return Ok(());
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| BackendError::ParseError(format!("{}: {}", endpoint, e)))?;
        if value.get("success").and_then(Value::as_bool) == Some(false) {
            let parsed: ErrorBody = serde_json::from_value(value).unwrap_or_default();
            let (message, errors) = parsed.into_parts();
            return Err(BackendError::Rejected {
                endpoint: endpoint.to_string(),
                message: message.unwrap_or_else(|| "request was not accepted".to_string()),
                errors,
            });
        }
        Ok(())
    }

    async fn execute(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> Result<String, BackendError> {
        let start = Instant::now();
        let result = self.execute_inner(endpoint, request).await;

        BACKEND_DURATION
            .with_label_values(&[endpoint])
            .observe(start.elapsed().as_secs_f64());
        let outcome = if result.is_ok() { "success" } else { "error" };
        BACKEND_REQUESTS
            .with_label_values(&[endpoint, outcome])
            .inc();

        result
    }

    async fn execute_inner(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> Result<String, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(endpoint, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::from_reqwest(endpoint, e))?;

        debug!(endpoint, status = status.as_u16(), "backend response");

        if status.is_success() {
            return Ok(body);
        }
        Err(error_for_status(endpoint, status, &body))
    }
}

fn error_for_status(endpoint: &str, status: StatusCode, body: &str) -> BackendError {
    if status == StatusCode::NOT_FOUND {
        return BackendError::NotFound(endpoint.to_string());
    }

    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    if status.is_client_error() {
        if let Some((Some(message), errors)) = parsed.map(ErrorBody::into_parts) {
            return BackendError::Rejected {
                endpoint: endpoint.to_string(),
                message,
                errors,
            };
        }
    }

    BackendError::ApiError {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        message: body.to_string(),
    }
}

#[async_trait]
impl EnrollmentBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn get_student(&self, id: &StudentId) -> Result<Student, BackendError> {
        debug!("Fetching student {}", id);
        self.fetch("student", self.client.get(self.student_url(id)))
            .await
    }

    async fn update_enrollment_status(
        &self,
        id: &StudentId,
        status: EnrollmentStatus,
    ) -> Result<(), BackendError> {
        debug!("Updating student {} to {}", id, status);
        let body = StatusUpdate {
            enrollment_status: status,
        };
        self.acknowledge(
            "student_status",
            self.client.patch(self.student_url(id)).json(&body),
        )
        .await
    }

    async fn get_enrollments(
        &self,
        id: &StudentId,
        school_year: &str,
    ) -> Result<Vec<EnrollmentRow>, BackendError> {
        let request = self
            .client
            .get(self.url("/enrollment"))
            .query(&[("student", id.as_str()), ("school_year", school_year)]);
        self.fetch("enrollment", request).await
    }

    async fn get_grades(
        &self,
        id: &StudentId,
        course_id: i64,
    ) -> Result<Vec<GradeRecord>, BackendError> {
        let request = self.client.get(self.url("/grade")).query(&[
            ("student", id.as_str().to_string()),
            ("course__id", course_id.to_string()),
        ]);
        self.fetch("grade", request).await
    }

    async fn get_enrollment_windows(&self) -> Result<Vec<EnrollmentWindow>, BackendError> {
        let response: WindowsResponse = self
            .fetch("enrollment_date", self.client.get(self.url("/enrollment_date")))
            .await?;
        Ok(response.enrollment_date)
    }

    async fn get_advising(&self, id: &StudentId) -> Result<AdvisingResult, BackendError> {
        let request = self
            .client
            .get(self.url("/advising"))
            .query(&[("id", id.as_str())]);
        self.fetch("advising", request).await
    }

    async fn submit_advising(&self, submission: &AdvisingSubmission) -> Result<(), BackendError> {
        debug!(
            "Submitting {} course(s) for student {}",
            submission.default_courses.len(),
            submission.id
        );
        let request = self
            .client
            .post(self.url("/advising"))
            .query(&[("id", submission.id.as_str())])
            .json(submission);
        self.acknowledge("advising_submit", request).await
    }

    async fn submit_batch(&self, batch: &BatchEnrollment) -> Result<(), BackendError> {
        debug!(
            "Submitting batch enrollment of {} course(s) for student {}",
            batch.course_ids.len(),
            batch.student_id
        );
        let request = self.client.post(self.url("/batch/")).json(batch);
        self.acknowledge("batch", request).await
    }

    async fn get_cor(&self, id: &StudentId) -> Result<EnrollmentRecord, BackendError> {
        let request = self
            .client
            .get(self.url("/cor"))
            .query(&[("id", id.as_str())]);
        self.fetch("cor", request).await
    }
}
