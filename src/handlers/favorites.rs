use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::{AppError, AppResult};
use crate::models::{Property, PropertyStatus};
use crate::state::SharedState;

pub async fn list(State(state): State<SharedState>, current: CurrentUser) -> Json<Vec<Property>> {
    Json(state.store.favorites(current.user.id))
}

// Only approved listings can be favorited; repeating the call is harmless
pub async fn add(
    State(state): State<SharedState>,
    current: CurrentUser,
    Path(property_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Value>)> {
    state
        .store
        .property(property_id)
        .filter(|p| p.status == PropertyStatus::Approved)
        .ok_or(AppError::NotFound("property"))?;

    let created = state.store.add_favorite(current.user.id, property_id);
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(json!({ "property_id": property_id, "favorited": true }))))
}

pub async fn remove(
    State(state): State<SharedState>,
    current: CurrentUser,
    Path(property_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if state.store.remove_favorite(current.user.id, property_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("favorite"))
    }
}
