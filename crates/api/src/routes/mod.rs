pub mod auth;
pub mod badge;
pub mod health;
pub mod meta_pages;
pub mod schedule;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                                   live schedule WebSocket
///
/// /schedule                             aggregated schedule (public)
/// /events/{id}                          event detail (public)
/// /rooms                                list rooms (public)
/// /rooms/{id}                           room detail (public)
/// /rooms/{id}/schedule                  room schedule (public)
///
/// /auth/anonymous                       anonymous sign-in (POST)
/// /auth/me                              current identity
///
/// /meta-pages                           list own, create (auth required)
/// /meta-pages/{id}                      read (public), delete (owner)
/// /meta-pages/{id}/content              save content (owner, PUT)
///
/// /badge/sessions                       open wizard (auth required)
/// /badge/sessions/{id}                  state, close
/// /badge/sessions/{id}/start            Intro -> SelectDestination
/// /badge/sessions/{id}/destination      choose page or URL (PUT)
/// /badge/sessions/{id}/confirm          confirm destination
/// /badge/sessions/{id}/device           choose device (PUT)
/// /badge/sessions/{id}/back             SelectDevice -> SelectDestination
/// /badge/sessions/{id}/send             publish provisioning message
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .merge(schedule::router())
        .nest("/auth", auth::router())
        .nest("/meta-pages", meta_pages::router())
        .nest("/badge", badge::router())
}
