use std::net::SocketAddr;

// ── Availability ────────────────────────────────────────────────

/// Counter: availability queries served. Labels: status.
pub const AVAILABILITY_QUERIES_TOTAL: &str = "slotbook_availability_queries_total";

/// Counter: slots returned by availability queries (after merging).
pub const SLOTS_GENERATED_TOTAL: &str = "slotbook_slots_generated_total";

/// Histogram: availability query latency in seconds.
pub const AVAILABILITY_DURATION_SECONDS: &str = "slotbook_availability_duration_seconds";

// ── Bookings ────────────────────────────────────────────────────

/// Counter: bookings persisted.
pub const BOOKINGS_CREATED_TOTAL: &str = "slotbook_bookings_created_total";

/// Counter: booking attempts rejected for overlap. Labels: stage (check, insert).
pub const BOOKING_CONFLICTS_TOTAL: &str = "slotbook_booking_conflicts_total";

/// Counter: requests rejected by validation. Labels: kind (booking, rule).
pub const VALIDATION_FAILURES_TOTAL: &str = "slotbook_validation_failures_total";

/// Counter: booking status transitions. Labels: to.
pub const STATUS_TRANSITIONS_TOTAL: &str = "slotbook_status_transitions_total";

/// Histogram: alternatives proposed per harmonic resolution.
pub const HARMONIC_ALTERNATIVES: &str = "slotbook_harmonic_alternatives";

/// Install a `fmt` tracing subscriber honouring `RUST_LOG`. Safe to call twice.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
