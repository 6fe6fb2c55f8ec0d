use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::info;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::error::AppResult;
use crate::models::Faq;
use crate::state::SharedState;
use crate::validation::{FaqInput, accept};

pub async fn list(State(state): State<SharedState>) -> Json<Vec<Faq>> {
    Json(state.store.faqs())
}

pub async fn create(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
    Json(input): Json<FaqInput>,
) -> AppResult<(StatusCode, Json<Faq>)> {
    let faq = state.store.insert_faq(accept(input)?);
    info!(faq_id = %faq.id, admin_id = %admin.id, "faq created");
    Ok((StatusCode::CREATED, Json(faq)))
}

pub async fn update(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(input): Json<FaqInput>,
) -> AppResult<Json<Faq>> {
    let faq = state.store.update_faq(id, accept(input)?)?;
    info!(faq_id = %id, admin_id = %admin.id, "faq updated");
    Ok(Json(faq))
}

pub async fn delete(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.store.delete_faq(id)?;
    info!(faq_id = %id, admin_id = %admin.id, "faq deleted");
    Ok(StatusCode::NO_CONTENT)
}
