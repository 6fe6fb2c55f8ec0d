//! Property listing endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use tracing::info;
use uuid::Uuid;

use crate::auth::{CurrentUser, MaybeUser};
use crate::cache::make_cache_key;
use crate::error::{AppError, AppResult};
use crate::models::{Property, PropertyStatus, Role, User};
use crate::state::SharedState;
use crate::validation::{ListingQuery, PropertyInput, PropertyUpdate, accept};

pub const CACHE_HEADER: &str = "x-cache";

fn can_manage(user: &User, property: &Property) -> bool {
    user.role == Role::Admin || property.owner_id == user.id
}

// Non-approved listings are only visible to their owner and admins
fn visible_to(viewer: Option<&User>, property: &Property) -> bool {
    property.status == PropertyStatus::Approved || viewer.is_some_and(|u| can_manage(u, property))
}

/// Public search over approved listings, served from the listing cache when fresh.
pub async fn list(
    State(state): State<SharedState>,
    Query(query): Query<ListingQuery>,
) -> AppResult<Response> {
    let query = accept(query)?;
    let key = make_cache_key(&query);

    if let Some(body) = state.cache.get(&key) {
        return Ok(([(CONTENT_TYPE.as_str(), "application/json"), (CACHE_HEADER, "HIT")], body).into_response());
    }

    let generation = state.cache.generation();
    let page = state.store.search(&query);
    let body = serde_json::to_string(&page).map_err(|e| AppError::Internal(e.into()))?;
    state.cache.insert(key, body.clone(), generation);

    Ok(([(CONTENT_TYPE.as_str(), "application/json"), (CACHE_HEADER, "MISS")], body).into_response())
}

pub async fn get(
    State(state): State<SharedState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Property>> {
    let property = state
        .store
        .property(id)
        .filter(|p| visible_to(viewer.as_ref(), p))
        .ok_or(AppError::NotFound("property"))?;

    state.store.record_view(property.id);
    Ok(Json(Property {
        views: property.views + 1,
        ..property
    }))
}

pub async fn get_by_slug(
    State(state): State<SharedState>,
    MaybeUser(viewer): MaybeUser,
    Path(slug): Path<String>,
) -> AppResult<Json<Property>> {
    let property = state
        .store
        .property_by_slug(&slug)
        .filter(|p| visible_to(viewer.as_ref(), p))
        .ok_or(AppError::NotFound("property"))?;

    state.store.record_view(property.id);
    Ok(Json(Property {
        views: property.views + 1,
        ..property
    }))
}

pub async fn create(
    State(state): State<SharedState>,
    current: CurrentUser,
    Json(input): Json<PropertyInput>,
) -> AppResult<(StatusCode, Json<Property>)> {
    let user = current.user;
    if !user.role.can_list() {
        return Err(AppError::Forbidden(
            "Only agents, builders and admins can list properties",
        ));
    }

    let input = accept(input)?;
    let status = if user.role == Role::Admin {
        PropertyStatus::Approved
    } else {
        PropertyStatus::Pending
    };

    let property = state.store.insert_property(user.id, input, status);
    state.cache.invalidate_all();
    info!(property_id = %property.id, owner_id = %user.id, status = ?property.status, "property created");

    Ok((StatusCode::CREATED, Json(property)))
}

pub async fn update(
    State(state): State<SharedState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(update): Json<PropertyUpdate>,
) -> AppResult<Json<Property>> {
    let user = current.user;
    let existing = state
        .store
        .property(id)
        .ok_or(AppError::NotFound("property"))?;
    if !can_manage(&user, &existing) {
        return Err(AppError::Forbidden("You can only edit your own listings"));
    }

    let update = accept(update)?;
    let resubmit = user.role != Role::Admin;
    let property = state.store.update_property(id, update, resubmit)?;
    state.cache.invalidate_all();
    info!(property_id = %id, user_id = %user.id, "property updated");

    Ok(Json(property))
}

pub async fn delete(
    State(state): State<SharedState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let existing = state
        .store
        .property(id)
        .ok_or(AppError::NotFound("property"))?;
    if !can_manage(&current.user, &existing) {
        return Err(AppError::Forbidden("You can only delete your own listings"));
    }

    state.store.delete_property(id)?;
    state.cache.invalidate_all();
    info!(property_id = %id, user_id = %current.user.id, "property deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn mine(State(state): State<SharedState>, current: CurrentUser) -> Json<Vec<Property>> {
    Json(state.store.properties_by_owner(current.user.id))
}
