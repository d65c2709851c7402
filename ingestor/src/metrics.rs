use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use tracing::error;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref WRITES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_writes_total",
        "Total points written to the store"
    ))
    .unwrap();
    pub static ref WRITE_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_write_failures_total",
        "Total write requests that failed downstream"
    ))
    .unwrap();
    pub static ref INVALID_REQUESTS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_invalid_requests_total",
        "Total requests rejected as invalid input"
    ))
    .unwrap();
    pub static ref BUCKETS_CREATED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_buckets_created_total",
        "Total client buckets provisioned on first write"
    ))
    .unwrap();
    pub static ref QUERIES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_queries_total",
        "Total last-hour queries served"
    ))
    .unwrap();
    pub static ref QUERY_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_query_failures_total",
        "Total queries that failed downstream"
    ))
    .unwrap();
    pub static ref WRITE_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "ingestor_write_latency_seconds",
            "Time taken to provision the bucket and write one point"
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0
        ])
    )
    .unwrap();
}

pub fn init_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(WRITES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(WRITE_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(INVALID_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(BUCKETS_CREATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(QUERIES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(QUERY_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(WRITE_LATENCY_SECONDS.clone()))?;
    Ok(())
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
