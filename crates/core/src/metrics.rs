//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Enrollment state machine (transitions, rollbacks, stale invoices)
//! - Billing (invoices priced)
//! - Document renderer (documents, pages)
//! - Backend calls (requests, latency)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Enrollment
// =============================================================================

/// Transition attempts by transition and result.
pub static TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "enrollment_transitions_total",
            "Enrollment state transitions attempted",
        ),
        &["transition", "result"], // result: "ok", "rejected", "failed"
    )
    .unwrap()
});

/// Compensating rollbacks by result.
pub static ROLLBACKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "enrollment_rollbacks_total",
            "Compensating resets after a failed advising",
        ),
        &["result"], // "completed", "failed"
    )
    .unwrap()
});

/// Billing confirmations refused because the invoice predates the latest advising.
pub static STALE_INVOICES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "enrollment_stale_invoices_total",
        "Billing confirmations rejected for a stale invoice",
    )
    .unwrap()
});

/// Actions refused because another action for the same student was in flight.
pub static BUSY_REJECTIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "enrollment_busy_rejections_total",
        "Actions rejected while another action for the student was saving",
    )
    .unwrap()
});

/// Invoices priced from an advised course set.
pub static INVOICES_PRICED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "enrollment_invoices_priced_total",
        "Invoices aggregated for billing",
    )
    .unwrap()
});

// =============================================================================
// Renderer
// =============================================================================

/// Documents produced by mode ("fit", "slice").
pub static DOCUMENTS_RENDERED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("enrollment_documents_rendered_total", "Documents rendered"),
        &["mode"],
    )
    .unwrap()
});

/// Pages per rendered document.
pub static DOCUMENT_PAGES: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("enrollment_document_pages", "Pages per rendered document")
            .buckets(vec![1.0, 2.0, 3.0, 5.0, 10.0]),
        &["mode"],
    )
    .unwrap()
});

// =============================================================================
// Backend
// =============================================================================

/// Backend requests by endpoint and outcome.
pub static BACKEND_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("enrollment_backend_requests_total", "Backend requests"),
        &["endpoint", "outcome"], // outcome: "success", "error"
    )
    .unwrap()
});

/// Backend request duration.
pub static BACKEND_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "enrollment_backend_duration_seconds",
            "Backend request duration",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["endpoint"],
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Enrollment
        Box::new(TRANSITIONS.clone()),
        Box::new(ROLLBACKS.clone()),
        Box::new(STALE_INVOICES.clone()),
        Box::new(BUSY_REJECTIONS.clone()),
        Box::new(INVOICES_PRICED.clone()),
        // Renderer
        Box::new(DOCUMENTS_RENDERED.clone()),
        Box::new(DOCUMENT_PAGES.clone()),
        // Backend
        Box::new(BACKEND_REQUESTS.clone()),
        Box::new(BACKEND_DURATION.clone()),
    ]
}
