use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("journal_requests_total", "Total number of journal requests").unwrap();
    pub static ref QUOTA_DENIED: Counter =
        register_counter!("journal_quota_denied_total", "Requests rejected by the quota guard").unwrap();
    pub static ref FALLBACK_ATTEMPTS: Counter =
        register_counter!("journal_fallback_attempts_total", "Times the fallback model was tried").unwrap();
    pub static ref UPSTREAM_FAILURES: Counter =
        register_counter!("journal_upstream_failures_total", "Requests where every model failed").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "journal_upstream_latency_seconds",
        "Time spent waiting for the generated reply in seconds"
    )
    .unwrap();
    pub static ref TRACKED_CLIENTS: Gauge =
        register_gauge!("journal_tracked_clients", "Current number of clients in the quota store").unwrap();
}
