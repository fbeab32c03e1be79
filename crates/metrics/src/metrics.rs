use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // ═══════════════════════════════════════════════════════════════════════════
    // SAMPLE METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Total number of position samples received
    pub static ref SAMPLES_RECEIVED: IntCounter = register_int_counter!(
        "jit_kitchen_samples_received_total",
        "Total number of position samples received"
    )
    .unwrap();

    /// Samples rejected at the ingress boundary
    pub static ref SAMPLES_REJECTED: IntCounter = register_int_counter!(
        "jit_kitchen_samples_rejected_total",
        "Total number of malformed position samples rejected"
    )
    .unwrap();

    /// Samples dropped by the cooldown throttle
    pub static ref SAMPLES_THROTTLED: IntCounter = register_int_counter!(
        "jit_kitchen_samples_throttled_total",
        "Total number of samples dropped by the provider cooldown"
    )
    .unwrap();

    /// Engine decisions by outcome label
    pub static ref DECISIONS: IntCounterVec = register_int_counter_vec!(
        "jit_kitchen_decisions_total",
        "Engine decisions by outcome",
        &["decision"]
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // PROVIDER METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Total number of ETA provider calls
    pub static ref PROVIDER_CALLS: IntCounter = register_int_counter!(
        "jit_kitchen_provider_calls_total",
        "Total number of ETA provider lookups"
    )
    .unwrap();

    /// Total number of failed ETA provider calls
    pub static ref PROVIDER_FAILURES: IntCounter = register_int_counter!(
        "jit_kitchen_provider_failures_total",
        "Total number of failed ETA provider lookups"
    )
    .unwrap();

    /// Provider lookup latency histogram (in milliseconds)
    pub static ref PROVIDER_LATENCY: Histogram = register_histogram!(
        "jit_kitchen_provider_latency_ms",
        "ETA provider lookup latency in milliseconds",
        vec![10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2000.0]
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // ORDER METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Total number of prep triggers fired
    pub static ref PREP_TRIGGERS: IntCounter = register_int_counter!(
        "jit_kitchen_prep_triggers_total",
        "Total number of prep_started transitions"
    )
    .unwrap();

    /// Total number of eta_update notifications published
    pub static ref ETA_UPDATES: IntCounter = register_int_counter!(
        "jit_kitchen_eta_updates_total",
        "Total number of eta_update notifications published"
    )
    .unwrap();

    /// Current number of orders being tracked
    pub static ref ACTIVE_ORDERS: IntGauge = register_int_gauge!(
        "jit_kitchen_orders_tracking",
        "Current number of orders in TRACKING state"
    )
    .unwrap();
}

/// Record one engine decision under its stable label
pub fn record_decision(label: &str) {
    DECISIONS.with_label_values(&[label]).inc();
    match label {
        "rejected" => SAMPLES_REJECTED.inc(),
        "throttled" => SAMPLES_THROTTLED.inc(),
        "prep_started" => PREP_TRIGGERS.inc(),
        "eta_update" => ETA_UPDATES.inc(),
        _ => {}
    }
}

/// Export all registered metrics in Prometheus text format
pub fn export_metrics() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
