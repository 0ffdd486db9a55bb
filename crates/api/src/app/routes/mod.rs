use axum::{Router, routing::get};

pub mod admin;
pub mod downloads;
pub mod orders;
pub mod payments;
pub mod system;

/// Routes behind the bearer-JWT middleware.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/orders", orders::router())
        .nest("/admin", admin::router())
        .nest("/downloads", downloads::router())
}
