//! Registration, login, and account management.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;
use tracing::info;

use crate::auth::{CurrentUser, hash_password, issue_session, verify_password};
use crate::error::{AppError, AppResult};
use crate::models::{Role, UserProfile};
use crate::rate_limit::RateLimitProfile;
use crate::state::SharedState;
use crate::store::NewUser;
use crate::validation::{
    DeleteAccountInput, LoginInput, PasswordChangeInput, RegisterInput, accept,
};

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

pub async fn register(
    State(state): State<SharedState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let input = accept(input)?;
    let password_hash = hash_password(&input.password)?;

    let user = state.store.insert_user(NewUser {
        name: input.name,
        email: input.email,
        phone: input.phone,
        role: input.role.unwrap_or(Role::User),
        password_hash,
    })?;

    let token = issue_session(&state.store, user.id, state.session_ttl);
    state.notifier.enqueue(state.templates.welcome(&user));
    info!(user_id = %user.id, role = %user.role, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: UserProfile::from(&user),
        }),
    ))
}

pub async fn login(
    State(state): State<SharedState>,
    Json(input): Json<LoginInput>,
) -> AppResult<Json<AuthResponse>> {
    let input = accept(input)?;

    // Per-account budget on top of the per-client one
    let attempt = state
        .rate_limiter
        .check_profile(RateLimitProfile::Auth, &format!("login:{}", input.email));
    if !attempt.success {
        return Err(AppError::RateLimited(attempt));
    }

    let user = state
        .store
        .user_by_email(&input.email)
        .filter(|user| verify_password(&input.password, &user.password_hash))
        .ok_or(AppError::InvalidCredentials)?;

    let token = issue_session(&state.store, user.id, state.session_ttl);
    info!(user_id = %user.id, "user logged in");

    Ok(Json(AuthResponse {
        token,
        user: UserProfile::from(&user),
    }))
}

pub async fn logout(State(state): State<SharedState>, current: CurrentUser) -> StatusCode {
    state.store.delete_session(&current.token_hash);
    StatusCode::NO_CONTENT
}

pub async fn me(current: CurrentUser) -> Json<UserProfile> {
    Json(UserProfile::from(&current.user))
}

/// Change the password, sign out every session, and hand back a fresh one.
pub async fn change_password(
    State(state): State<SharedState>,
    current: CurrentUser,
    Json(input): Json<PasswordChangeInput>,
) -> AppResult<Json<AuthResponse>> {
    let input = accept(input)?;
    let user = current.user;

    if !verify_password(&input.current_password, &user.password_hash) {
        return Err(AppError::BadRequest(
            "Current password is incorrect".to_string(),
        ));
    }

    state
        .store
        .set_password_hash(user.id, hash_password(&input.new_password)?)?;
    let revoked = state.store.delete_sessions_for(user.id);
    let token = issue_session(&state.store, user.id, state.session_ttl);

    state.notifier.enqueue(state.templates.password_changed(&user));
    info!(user_id = %user.id, revoked, "password changed");

    Ok(Json(AuthResponse {
        token,
        user: UserProfile::from(&user),
    }))
}

pub async fn delete_account(
    State(state): State<SharedState>,
    current: CurrentUser,
    Json(input): Json<DeleteAccountInput>,
) -> AppResult<StatusCode> {
    let input = accept(input)?;
    if !verify_password(&input.password, &current.user.password_hash) {
        return Err(AppError::BadRequest("Password is incorrect".to_string()));
    }

    state.store.delete_user(current.user.id)?;
    state.cache.invalidate_all();
    info!(user_id = %current.user.id, "account deleted");

    Ok(StatusCode::NO_CONTENT)
}
