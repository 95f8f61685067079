//! Route definitions for the `/meta-pages` resource.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::meta_pages;
use crate::state::AppState;

/// Routes mounted at `/meta-pages`.
///
/// ```text
/// GET    /                -> list_my_pages
/// POST   /                -> create_page
/// GET    /{id}            -> get_page
/// DELETE /{id}            -> delete_page
/// PUT    /{id}/content    -> save_content
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(meta_pages::list_my_pages).post(meta_pages::create_page),
        )
        .route(
            "/{id}",
            get(meta_pages::get_page).delete(meta_pages::delete_page),
        )
        .route("/{id}/content", put(meta_pages::save_content))
}
