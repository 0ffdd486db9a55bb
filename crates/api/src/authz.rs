use axum::http::StatusCode;

use crate::app::errors;
use crate::context::PrincipalContext;

/// Gate an admin-only route. Returns the ready-made response on denial so
/// handlers can `?`-style early-return it.
pub fn require_admin(principal: &PrincipalContext) -> Result<(), axum::response::Response> {
    if principal.principal().is_admin() {
        Ok(())
    } else {
        Err(errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "admin role required",
        ))
    }
}
