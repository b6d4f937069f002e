//! Prometheus registry for the command-line client.

use once_cell::sync::Lazy;
use prometheus::{Encoder, Registry, TextEncoder};

/// Global metrics registry holding every core metric.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in enrollment_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
    registry
});

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use enrollment_core::metrics::{INVOICES_PRICED, TRANSITIONS};

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        TRANSITIONS
            .with_label_values(&["request_enrollment", "ok"])
            .inc();
        INVOICES_PRICED.inc();

        let output = encode_metrics().unwrap();
        assert!(output.contains("enrollment_transitions_total"));
        assert!(output.contains("enrollment_invoices_priced_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }
}
