//! Estate Gateway
//!
//! HTTP API for a real-estate listing marketplace: listings, accounts,
//! favorites, inquiries, back-office moderation, and per-route
//! fixed-window rate limiting.

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod rate_limit;
pub mod sanitize;
pub mod state;
pub mod store;
pub mod validation;
pub mod worker;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::hash_password;
use crate::error::AppError;
use crate::models::Role;
use crate::rate_limit::{RateLimitProfile, RateLimiter};
use crate::sanitize::normalize_email;
use crate::store::NewUser;

pub use crate::config::Args;
pub use crate::state::{AppState, SharedState};

fn rate_limited(
    router: Router<SharedState>,
    limiter: &Arc<RateLimiter>,
    profile: RateLimitProfile,
) -> Router<SharedState> {
    router.route_layer(axum::middleware::from_fn_with_state(
        (limiter.clone(), profile),
        middleware::enforce,
    ))
}

/// Build the full application router.
///
/// Each route family sits behind exactly one rate-limit profile;
/// `/health` and `/metrics` are not limited.
pub fn build_router(state: SharedState) -> Router {
    use handlers::{admin, auth, faqs, favorites, inquiries, newsletter, properties};

    let limiter = state.rate_limiter.clone();

    let auth_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login));

    let contact_routes = Router::new()
        .route("/api/inquiries", post(inquiries::create))
        .route("/api/newsletter", post(newsletter::subscribe));

    let sensitive_routes = Router::new()
        .route("/api/auth/password", put(auth::change_password))
        .route("/api/auth/account", delete(auth::delete_account));

    let api_routes = Router::new()
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/properties", get(properties::list).post(properties::create))
        .route(
            "/api/properties/{id}",
            get(properties::get)
                .put(properties::update)
                .delete(properties::delete),
        )
        .route("/api/properties/slug/{slug}", get(properties::get_by_slug))
        .route("/api/me/properties", get(properties::mine))
        .route("/api/favorites", get(favorites::list))
        .route(
            "/api/favorites/{property_id}",
            post(favorites::add).delete(favorites::remove),
        )
        .route("/api/inquiries/received", get(inquiries::received))
        .route("/api/inquiries/sent", get(inquiries::sent))
        .route("/api/newsletter/unsubscribe", post(newsletter::unsubscribe))
        .route("/api/faqs", get(faqs::list))
        .route("/api/admin/stats", get(admin::stats))
        .route("/api/admin/properties", get(admin::properties))
        .route(
            "/api/admin/properties/{id}/status",
            put(admin::set_property_status),
        )
        .route("/api/admin/users", get(admin::users))
        .route("/api/admin/users/{id}/role", put(admin::set_user_role))
        .route("/api/admin/faqs", post(faqs::create))
        .route("/api/admin/faqs/{id}", put(faqs::update).delete(faqs::delete))
        .route("/api/admin/newsletter", get(newsletter::list));

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .merge(rate_limited(auth_routes, &limiter, RateLimitProfile::Auth))
        .merge(rate_limited(contact_routes, &limiter, RateLimitProfile::Contact))
        .merge(rate_limited(sensitive_routes, &limiter, RateLimitProfile::Sensitive))
        .merge(rate_limited(api_routes, &limiter, RateLimitProfile::Api))
        .layer(axum::middleware::from_fn(middleware::track_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Create the configured admin account unless that e-mail is already taken.
pub fn bootstrap_admin(state: &AppState, email: &str, password: &str) -> anyhow::Result<()> {
    let email = normalize_email(email);
    if state.store.user_by_email(&email).is_some() {
        info!(email = %email, "admin account already present");
        return Ok(());
    }

    let created = state.store.insert_user(NewUser {
        name: "Administrator".to_string(),
        email,
        phone: None,
        role: Role::Admin,
        password_hash: hash_password(password)?,
    });

    match created {
        Ok(user) => {
            info!(user_id = %user.id, "admin account created");
            Ok(())
        }
        Err(AppError::Conflict(_)) => Ok(()),
        Err(e) => Err(anyhow::anyhow!("failed to create admin account: {e}")),
    }
}
