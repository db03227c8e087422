// Prometheus metrics definitions for the Versus backend.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use uuid::Uuid;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Counters ─────────────────────────────────────────────────────

    /// Total API requests, by method/endpoint/status.
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("versus_api_requests_total", "Total API requests"),
        &["method", "endpoint", "status"],
    )
    .unwrap();

    /// Total leagues created.
    pub static ref LEAGUES_CREATED_TOTAL: IntCounter =
        IntCounter::new("versus_leagues_created_total", "Leagues created").unwrap();

    /// Total match results recorded.
    pub static ref MATCHES_RECORDED_TOTAL: IntCounter =
        IntCounter::new("versus_matches_recorded_total", "Match results recorded").unwrap();

    /// Total players added to leagues.
    pub static ref PLAYERS_CREATED_TOTAL: IntCounter =
        IntCounter::new("versus_players_created_total", "Players added to leagues").unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// API request duration in seconds, by endpoint.
    pub static ref API_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "versus_api_request_duration_seconds",
            "API request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
        &["endpoint"],
    )
    .unwrap();
}

/// Register all metrics with the custom registry. Call once at startup.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(API_REQUESTS_TOTAL.clone()),
        Box::new(LEAGUES_CREATED_TOTAL.clone()),
        Box::new(MATCHES_RECORDED_TOTAL.clone()),
        Box::new(PLAYERS_CREATED_TOTAL.clone()),
        Box::new(API_REQUEST_DURATION_SECONDS.clone()),
    ];

    for c in collectors {
        REGISTRY.register(c).expect("failed to register metric");
    }
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Normalize a URL path for metric labels: replace UUID path segments with
/// `:id` and player-name segments with `:name` to prevent cardinality
/// explosion.
pub fn normalize_path(path: &str) -> String {
    let mut normalized: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        if Uuid::parse_str(segment).is_ok() {
            normalized.push(":id");
        } else if matches!(normalized.last(), Some(&"players") | Some(&"head-to-head"))
            || matches!(normalized.last(), Some(&":name"))
        {
            normalized.push(":name");
        } else {
            normalized.push(segment);
        }
    }
    normalized.join("/")
}
