//! Route definitions for badge provisioning sessions.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::badge;
use crate::state::AppState;

/// Routes mounted at `/badge`. All require auth.
///
/// ```text
/// POST   /sessions                    -> open_session
/// GET    /sessions/{id}               -> get_session
/// DELETE /sessions/{id}               -> close_session
/// POST   /sessions/{id}/start         -> start
/// PUT    /sessions/{id}/destination   -> set_destination
/// POST   /sessions/{id}/confirm       -> confirm_destination
/// PUT    /sessions/{id}/device        -> select_device
/// POST   /sessions/{id}/back          -> back
/// POST   /sessions/{id}/send          -> send
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(badge::open_session))
        .route(
            "/sessions/{id}",
            get(badge::get_session).delete(badge::close_session),
        )
        .route("/sessions/{id}/start", post(badge::start))
        .route("/sessions/{id}/destination", put(badge::set_destination))
        .route("/sessions/{id}/confirm", post(badge::confirm_destination))
        .route("/sessions/{id}/device", put(badge::select_device))
        .route("/sessions/{id}/back", post(badge::back))
        .route("/sessions/{id}/send", post(badge::send))
}
