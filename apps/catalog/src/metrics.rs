use opentelemetry::{
    KeyValue,
    metrics::{Counter, Histogram, MeterProvider, UpDownCounter},
};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    metrics::{MeterProviderBuilder, PeriodicReader, SdkMeterProvider},
};
use std::time::Duration;

pub struct Metrics {
    pub request_counter: Counter<u64>,
    pub request_duration: Histogram<f64>,
    pub spec_count: UpDownCounter<i64>,
}

impl Metrics {
    pub fn new(provider: &SdkMeterProvider) -> Self {
        let meter = provider.meter("catalog");

        Self {
            request_counter: meter
                .u64_counter("catalog_requests_total")
                .with_description("Catalog requests by operation and status")
                .build(),
            request_duration: meter
                .f64_histogram("catalog_request_duration_milliseconds")
                .with_description("Catalog request duration")
                .build(),
            spec_count: meter
                .i64_up_down_counter("catalog_specifications")
                .with_description("Number of stored service specifications")
                .build(),
        }
    }

    /// Metrics backed by a provider without readers; nothing is exported.
    pub fn disabled() -> (SdkMeterProvider, Self) {
        let provider = SdkMeterProvider::builder().build();
        let metrics = Self::new(&provider);
        (provider, metrics)
    }

    pub fn record_request(&self, operation: &'static str, status: u16, duration: Duration) {
        self.request_counter.add(
            1,
            &[
                KeyValue::new("operation", operation),
                KeyValue::new("status", i64::from(status)),
            ],
        );
        self.request_duration.record(
            duration.as_secs_f64() * 1000.0,
            &[KeyValue::new("operation", operation)],
        );
    }
}

pub fn init_metrics(
    otlp_endpoint: Option<&str>,
    service_name: &str,
) -> Result<(SdkMeterProvider, Metrics), anyhow::Error> {
    let Some(endpoint) = otlp_endpoint else {
        return Ok(Metrics::disabled());
    };

    let resource = Resource::new(vec![KeyValue::new(
        "service.name",
        service_name.to_string(),
    )]);

    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let reader = PeriodicReader::builder(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_interval(Duration::from_secs(15))
        .build();

    let provider = MeterProviderBuilder::default()
        .with_resource(resource)
        .with_reader(reader)
        .build();

    let metrics = Metrics::new(&provider);

    Ok((provider, metrics))
}
