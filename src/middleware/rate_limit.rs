//! HTTP side of rate limiting: client identification, headers, and the
//! per-profile middleware layer.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::metrics::RATE_LIMITED_TOTAL;
use crate::rate_limit::{RateLimitProfile, RateLimitResult, RateLimiter};

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Identify the caller for rate limiting.
///
/// Proxy headers win over the socket address: first hop of
/// `X-Forwarded-For`, then `X-Real-IP`, then the peer, then `anonymous`.
pub fn client_identifier(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(ip) = value.split(',').next().map(str::trim)
        && !ip.is_empty()
    {
        return ip.to_string();
    }

    if let Some(real_ip) = headers.get("x-real-ip")
        && let Ok(value) = real_ip.to_str()
        && !value.trim().is_empty()
    {
        return value.trim().to_string();
    }

    peer.map(|a| a.ip().to_string())
        .unwrap_or_else(|| "anonymous".to_string())
}

pub fn apply_headers(result: &RateLimitResult, headers: &mut HeaderMap) {
    headers.insert(LIMIT_HEADER, HeaderValue::from(result.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(result.remaining));
    headers.insert(RESET_HEADER, HeaderValue::from(result.reset_unix()));
}

/// 429 with `Retry-After` and the usual rate-limit headers.
pub fn rate_limit_response(result: &RateLimitResult) -> Response {
    let retry_after = result.retry_after_secs();
    let body = serde_json::json!({
        "error": "Too many requests. Please try again later.",
        "retry_after": retry_after,
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    let headers = response.headers_mut();
    apply_headers(result, headers);
    headers.insert("retry-after", HeaderValue::from(retry_after));
    response
}

/// Middleware counting every matched request against `profile`.
pub async fn enforce(
    State((limiter, profile)): State<(Arc<RateLimiter>, RateLimitProfile)>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let identifier = client_identifier(request.headers(), peer);

    let result = limiter.check_profile(profile, &identifier);
    if !result.success {
        RATE_LIMITED_TOTAL.with_label_values(&[profile.as_str()]).inc();
        warn!(
            profile = profile.as_str(),
            client = %identifier,
            path = %request.uri().path(),
            "request rate limited"
        );
        return rate_limit_response(&result);
    }

    let mut response = next.run(request).await;
    apply_headers(&result, response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());
        assert_eq!(client_identifier(&headers, None), "203.0.113.7");
    }

    #[test]
    fn real_ip_then_peer_then_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", " 198.51.100.2 ".parse().unwrap());
        assert_eq!(client_identifier(&headers, None), "198.51.100.2");

        let peer: SocketAddr = "192.0.2.9:4431".parse().unwrap();
        assert_eq!(client_identifier(&HeaderMap::new(), Some(peer)), "192.0.2.9");
        assert_eq!(client_identifier(&HeaderMap::new(), None), "anonymous");
    }

    #[test]
    fn empty_forwarded_header_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "".parse().unwrap());
        assert_eq!(client_identifier(&headers, None), "anonymous");
    }

    #[test]
    fn rejection_response_carries_retry_after() {
        let result = RateLimitResult {
            success: false,
            limit: 5,
            remaining: 0,
            reset_after: Duration::from_secs(42),
        };
        let response = rate_limit_response(&result);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["retry-after"], "42");
        assert_eq!(response.headers()[LIMIT_HEADER], "5");
        assert_eq!(response.headers()[REMAINING_HEADER], "0");
    }
}
