use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};
use tracing::info;

use crate::auth::AdminUser;
use crate::error::AppResult;
use crate::models::Subscriber;
use crate::state::SharedState;
use crate::validation::{NewsletterInput, accept};

pub async fn subscribe(
    State(state): State<SharedState>,
    Json(input): Json<NewsletterInput>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let input = accept(input)?;

    if !state.store.subscribe(input.email.clone()) {
        return Ok((StatusCode::OK, Json(json!({ "subscribed": true }))));
    }

    state
        .notifier
        .enqueue(state.templates.newsletter_welcome(&input.email));
    info!("newsletter subscription added");
    Ok((StatusCode::CREATED, Json(json!({ "subscribed": true }))))
}

// Same answer whether or not the address was subscribed
pub async fn unsubscribe(
    State(state): State<SharedState>,
    Json(input): Json<NewsletterInput>,
) -> AppResult<Json<Value>> {
    let input = accept(input)?;
    if state.store.unsubscribe(&input.email) {
        info!("newsletter subscription removed");
    }
    Ok(Json(json!({ "subscribed": false })))
}

pub async fn list(State(state): State<SharedState>, _admin: AdminUser) -> Json<Vec<Subscriber>> {
    Json(state.store.subscribers())
}
