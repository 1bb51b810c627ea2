use crate::{AppState, handlers::session};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Endpoints for any signed-in account. Every handler receives a validated `AuthUser`
/// from the auth layer applied in `create_router`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET/PUT /me
        // Own profile; PUT changes the display name or password.
        .route("/me", get(session::get_me).put(session::update_me))
}
