//! HTTP application wiring (axum router + service wiring).
//!
//! Layout:
//! - `services.rs`: store construction and backend selection
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    Extension, Router,
    routing::{get, post},
};

use meshmart_auth::Hs256JwtValidator;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Process-start configuration, read once from the environment by `main`.
pub struct ApiConfig {
    pub jwt_secret: String,
    pub callback_secret: Option<String>,
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: ApiConfig) -> Router {
    let jwt = Arc::new(Hs256JwtValidator::new(config.jwt_secret.into_bytes()));
    let auth_state = middleware::AuthState { jwt };
    let callback_state = middleware::CallbackState {
        secret: config.callback_secret.map(Arc::from),
    };

    let services = Arc::new(services::build_services().await);

    // User-facing routes: require a valid bearer token.
    let protected = routes::router()
        .layer(Extension(services.clone()))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    // Trusted-notifier route: shared-secret gated, no user session.
    let callback = Router::new()
        .route("/payments/callback", post(routes::payments::payment_callback))
        .layer(Extension(services.clone()))
        .layer(axum::middleware::from_fn_with_state(
            callback_state,
            middleware::callback_guard,
        ));

    // Token-authenticated redemption + liveness: no session either.
    let public = Router::new()
        .route("/health", get(routes::system::health))
        .route("/downloads/:token", get(routes::downloads::redeem))
        .layer(Extension(services));

    Router::new().merge(public).merge(protected).merge(callback)
}
