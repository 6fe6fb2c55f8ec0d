use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;

use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL};

pub mod rate_limit;

pub use rate_limit::enforce;

// Count every request and observe its latency
pub async fn track_requests(request: Request, next: Next) -> Response {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();
    let response = next.run(request).await;
    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    response
}
