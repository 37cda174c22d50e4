use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use time;

pub mod account;
pub mod auth;
pub mod enrollment;
mod error;
pub mod maintenance;
mod observability;
mod pages;
mod submission;
mod types;

pub use error::ApiError;
pub use types::*;

pub use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config.server.cors_allowed_origins.clone();

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(state.config.server.secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            state.config.server.session_expiry_minutes,
        )));

    let api_router = Router::new()
        .route("/admin-login", post(auth::admin_login))
        .route("/create-first-admin", post(enrollment::create_first_admin))
        .route("/add-user", post(enrollment::add_user))
        .route("/login", post(auth::login))
        .route("/account-info", get(account::account_info))
        .route("/users", get(account::list_users))
        .route("/logout", post(auth::logout))
        .route("/cleanup-temp", post(maintenance::cleanup_temp))
        .route("/metrics", get(observability::get_metrics));

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .route("/", get(pages::home))
        .route("/admin", get(pages::admin))
        .route("/login", get(pages::login))
        .route("/dashboard", get(pages::dashboard))
        .nest("/api", api_router)
        .layer(session_layer)
        .with_state(state)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::track_requests))
}
