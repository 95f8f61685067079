//! Route definitions for the `/auth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /anonymous  -> sign_in_anonymously
/// GET  /me         -> me (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/anonymous", post(auth::sign_in_anonymously))
        .route("/me", get(auth::me))
}
