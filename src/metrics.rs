use lazy_static::lazy_static;
use prometheus::{
    Counter, Gauge, Histogram, IntCounterVec, register_counter, register_gauge,
    register_histogram, register_int_counter_vec,
};

// Registration only fails on duplicate names, which is a programming error.
lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("estate_requests_total", "Total number of API requests").unwrap();
    pub static ref RATE_LIMITED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "estate_rate_limited_total",
        "Requests rejected by the rate limiter",
        &["profile"]
    )
    .unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "estate_request_latency_seconds",
        "Request latency in seconds"
    )
    .unwrap();
    pub static ref CACHE_HITS: Counter =
        register_counter!("estate_listing_cache_hits_total", "Listing search cache hits").unwrap();
    pub static ref CACHE_MISSES: Counter =
        register_counter!("estate_listing_cache_misses_total", "Listing search cache misses").unwrap();
    pub static ref CACHE_SIZE: Gauge =
        register_gauge!("estate_listing_cache_size", "Current number of cached listing searches").unwrap();
    pub static ref EMAILS_SENT: Counter =
        register_counter!("estate_emails_sent_total", "Notification e-mails delivered").unwrap();
    pub static ref EMAILS_FAILED: Counter =
        register_counter!("estate_emails_failed_total", "Notification e-mails that failed or were dropped").unwrap();
}
