//! Back-office endpoints. Every handler requires the admin role.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::error::{AppError, AppResult};
use crate::models::{AdminStats, Property, PropertyStatus, Role, UserProfile};
use crate::state::SharedState;
use crate::validation::{RoleUpdate, StatusUpdate, accept};

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<PropertyStatus>,
}

pub async fn stats(State(state): State<SharedState>, _admin: AdminUser) -> Json<AdminStats> {
    Json(state.store.stats())
}

/// Moderation queue, optionally narrowed to one status.
pub async fn properties(
    State(state): State<SharedState>,
    _admin: AdminUser,
    Query(filter): Query<StatusFilter>,
) -> Json<Vec<Property>> {
    Json(state.store.properties_by_status(filter.status))
}

pub async fn set_property_status(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(update): Json<StatusUpdate>,
) -> AppResult<Json<Property>> {
    let update = accept(update)?;
    let property = state
        .store
        .set_property_status(id, update.status, update.featured)?;
    state.cache.invalidate_all();
    info!(
        property_id = %id,
        admin_id = %admin.id,
        status = ?property.status,
        featured = property.featured,
        "property moderated"
    );
    Ok(Json(property))
}

pub async fn users(State(state): State<SharedState>, _admin: AdminUser) -> Json<Vec<UserProfile>> {
    Json(state.store.users().iter().map(UserProfile::from).collect())
}

pub async fn set_user_role(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(update): Json<RoleUpdate>,
) -> AppResult<Json<UserProfile>> {
    let update = accept(update)?;
    if id == admin.id && update.role != Role::Admin {
        return Err(AppError::BadRequest(
            "Admins cannot remove their own admin role".to_string(),
        ));
    }

    let user = state.store.set_role(id, update.role)?;
    info!(user_id = %id, admin_id = %admin.id, role = %user.role, "user role changed");
    Ok(Json(UserProfile::from(&user)))
}
