use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::auth::{CurrentUser, MaybeUser};
use crate::error::{AppError, AppResult};
use crate::models::{Inquiry, PropertyStatus};
use crate::state::SharedState;
use crate::validation::{InquiryInput, accept};

/// Contact form on a listing. Anonymous visitors may use it; signed-in
/// senders can later find it under their sent inquiries.
pub async fn create(
    State(state): State<SharedState>,
    MaybeUser(sender): MaybeUser,
    Json(input): Json<InquiryInput>,
) -> AppResult<(StatusCode, Json<Inquiry>)> {
    let input = accept(input)?;

    let property = state
        .store
        .property(input.property_id)
        .filter(|p| p.status == PropertyStatus::Approved)
        .ok_or(AppError::NotFound("property"))?;
    let owner = state
        .store
        .user(property.owner_id)
        .ok_or(AppError::NotFound("property"))?;

    let inquiry = state.store.insert_inquiry(Inquiry {
        id: Uuid::new_v4(),
        property_id: property.id,
        owner_id: owner.id,
        sender_id: sender.map(|u| u.id),
        name: input.name,
        email: input.email,
        phone: input.phone,
        message: input.message,
        created_at: Utc::now(),
    });

    state
        .notifier
        .enqueue(state.templates.inquiry_to_owner(&owner, &property, &inquiry));
    state
        .notifier
        .enqueue(state.templates.inquiry_confirmation(&property, &inquiry));
    info!(inquiry_id = %inquiry.id, property_id = %property.id, "inquiry received");

    Ok((StatusCode::CREATED, Json(inquiry)))
}

pub async fn received(State(state): State<SharedState>, current: CurrentUser) -> Json<Vec<Inquiry>> {
    Json(state.store.inquiries_received(current.user.id))
}

pub async fn sent(State(state): State<SharedState>, current: CurrentUser) -> Json<Vec<Inquiry>> {
    Json(state.store.inquiries_sent(current.user.id))
}
