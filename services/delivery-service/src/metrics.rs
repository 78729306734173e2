use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Business metrics
    pub static ref DELIVERIES_RECORDED: IntCounter = IntCounter::new(
        "deliveries_recorded_total",
        "Total deliveries recorded"
    ).expect("metric can be created");

    pub static ref DELIVERIES_REJECTED: IntCounterVec = IntCounterVec::new(
        Opts::new("deliveries_rejected_total", "Total delivery submissions rejected"),
        &["reason"]
    ).expect("metric can be created");

    pub static ref EMPTY_BUCKETS: IntGauge = IntGauge::new(
        "empty_buckets_balance",
        "Empty bucket balance after the last write seen by this process"
    ).expect("metric can be created");

    pub static ref LOGINS: IntCounterVec = IntCounterVec::new(
        Opts::new("logins_total", "Login attempts"),
        &["outcome"]
    ).expect("metric can be created");
}

/// Register all metrics with the service registry
pub fn register_metrics() -> Result<(), prometheus::Error> {
    REGISTRY.register(Box::new(DELIVERIES_RECORDED.clone()))?;
    REGISTRY.register(Box::new(DELIVERIES_REJECTED.clone()))?;
    REGISTRY.register(Box::new(EMPTY_BUCKETS.clone()))?;
    REGISTRY.register(Box::new(LOGINS.clone()))?;
    Ok(())
}

/// Generate metrics output in Prometheus text format
pub fn render() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
