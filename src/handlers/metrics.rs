use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use prometheus::{Encoder, TextEncoder};

use crate::error::{AppError, AppResult};

pub async fn metrics_handler() -> AppResult<impl IntoResponse> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(([(CONTENT_TYPE, encoder.format_type().to_string())], buffer))
}
