use opentelemetry::{
    global,
    metrics::{Counter, Histogram, MeterProvider},
    KeyValue,
};
use prometheus::Registry;
use std::collections::HashSet;

pub struct Metrics {
    request_counter: Counter<u64>,
    upload_rejections: Counter<u64>,
    prediction_failures: Counter<u64>,
    prediction_duration: Histogram<u64>,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()?;

        let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
            .with_reader(exporter)
            .build();

        let meter = provider.meter("pet_classifier");
        global::set_meter_provider(provider);

        let request_counter = meter
            .u64_counter("requests_total")
            .with_description("Total number of page and action requests")
            .build();

        let upload_rejections = meter
            .u64_counter("upload_rejections_total")
            .with_description("Files rejected by upload validation")
            .build();

        let prediction_failures = meter
            .u64_counter("prediction_failures_total")
            .with_description("Prediction requests that failed")
            .build();

        // 50ms steps up to half a second, then coarser
        let boundaries = generate_boundaries(&[(50, 500, 50), (500, 2000, 250), (2000, 10000, 2000)]);

        let prediction_duration = meter
            .u64_histogram("prediction_duration_ms")
            .with_boundaries(boundaries)
            .with_description("Round trip of prediction requests in milliseconds")
            .build();

        Ok(Metrics {
            request_counter,
            upload_rejections,
            prediction_failures,
            prediction_duration,
            registry,
        })
    }

    pub fn record_request(&self, route: &str) {
        let attributes = vec![KeyValue::new("route", route.to_string())];
        self.request_counter.add(1, &attributes);
    }

    pub fn record_upload_rejection(&self, reason: &str) {
        let attributes = vec![KeyValue::new("reason", reason.to_string())];
        self.upload_rejections.add(1, &attributes);
    }

    pub fn record_prediction_failure(&self, route: &str) {
        let attributes = vec![KeyValue::new("route", route.to_string())];
        self.prediction_failures.add(1, &attributes);
    }

    pub fn record_prediction_duration(&self, duration_ms: u64, route: &str) {
        let attributes = vec![KeyValue::new("route", route.to_string())];
        self.prediction_duration.record(duration_ms, &attributes);
    }
}

/// Concatenates `(start, end, step)` ranges into sorted, deduplicated bucket
/// boundaries.
fn generate_boundaries(segments: &[(u64, u64, usize)]) -> Vec<f64> {
    let mut seen = HashSet::new();
    segments
        .iter()
        .flat_map(|&(start, end, step)| (start..=end).step_by(step.max(1)))
        .filter(|&x| seen.insert(x))
        .map(|x| x as f64)
        .collect()
}
