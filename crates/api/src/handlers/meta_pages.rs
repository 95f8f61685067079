//! Handlers for user-editable meta pages.
//!
//! Pages are world-readable; writes are gated on ownership both here and in
//! the conditional SQL of `MetaPageRepo`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use ensemble_core::error::CoreError;
use ensemble_core::meta_page::{ensure_owner, resolve_access, validate_content, validate_title};
use ensemble_core::types::EntityId;
use ensemble_db::models::meta_page::{
    CreateMetaPage, MetaPage, MetaPageView, UpdateMetaPageContent,
};
use ensemble_db::repositories::{MetaPageRepo, SaveOutcome};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/meta-pages
///
/// List the caller's own pages.
pub async fn list_my_pages(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<MetaPage>>>> {
    let pages = MetaPageRepo::list_for_owner(&state.pool, user.user_id).await?;
    Ok(Json(DataResponse { data: pages }))
}

/// POST /api/v1/meta-pages
pub async fn create_page(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateMetaPage>,
) -> AppResult<(StatusCode, Json<DataResponse<MetaPageView>>)> {
    let title = input.title.trim();
    validate_title(title)?;

    let page = MetaPageRepo::create(&state.pool, user.user_id, title).await?;
    tracing::info!(page_id = %page.id, owner_id = %user.user_id, "Meta page created");

    let access = resolve_access(page.owner_id, Some(user.user_id));
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: MetaPageView { page, access },
        }),
    ))
}

/// GET /api/v1/meta-pages/{id}
///
/// Anyone may read. `can_edit` tells the client whether to offer editing.
pub async fn get_page(
    State(state): State<AppState>,
    caller: MaybeAuthUser,
    Path(page_id): Path<EntityId>,
) -> AppResult<Json<DataResponse<MetaPageView>>> {
    let page = find_page(&state, page_id).await?;
    let access = resolve_access(page.owner_id, caller.user_id());

    Ok(Json(DataResponse {
        data: MetaPageView { page, access },
    }))
}

/// PUT /api/v1/meta-pages/{id}/content
///
/// Owner-only. With `expected_revision` the save fails with 409 if someone
/// saved in between; without it the last write wins.
pub async fn save_content(
    State(state): State<AppState>,
    user: AuthUser,
    Path(page_id): Path<EntityId>,
    Json(input): Json<UpdateMetaPageContent>,
) -> AppResult<Json<DataResponse<MetaPageView>>> {
    validate_content(&input.content)?;

    let outcome = MetaPageRepo::update_content(
        &state.pool,
        page_id,
        user.user_id,
        &input.content,
        input.expected_revision,
    )
    .await?;

    match outcome {
        SaveOutcome::Saved(page) => {
            tracing::info!(page_id = %page.id, revision = page.revision, "Meta page saved");
            let access = resolve_access(page.owner_id, Some(user.user_id));
            Ok(Json(DataResponse {
                data: MetaPageView { page, access },
            }))
        }
        SaveOutcome::Missing => Err(CoreError::not_found("MetaPage", page_id).into()),
        SaveOutcome::NotOwner => {
            tracing::warn!(
                page_id = %page_id,
                user_id = %user.user_id,
                "Rejected save by non-owner"
            );
            Err(forbidden())
        }
        SaveOutcome::Stale { current_revision } => Err(AppError::Core(CoreError::Conflict(
            format!("Page was modified concurrently (current revision {current_revision})"),
        ))),
    }
}

/// DELETE /api/v1/meta-pages/{id}
pub async fn delete_page(
    State(state): State<AppState>,
    user: AuthUser,
    Path(page_id): Path<EntityId>,
) -> AppResult<StatusCode> {
    let page = find_page(&state, page_id).await?;
    ensure_owner(page.owner_id, Some(user.user_id))?;

    // The owner check is repeated in SQL; a miss here means the page vanished.
    if !MetaPageRepo::delete(&state.pool, page_id, user.user_id).await? {
        return Err(CoreError::not_found("MetaPage", page_id).into());
    }

    tracing::info!(page_id = %page_id, "Meta page deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn find_page(state: &AppState, page_id: EntityId) -> AppResult<MetaPage> {
    MetaPageRepo::find_by_id(&state.pool, page_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("MetaPage", page_id)))
}

fn forbidden() -> AppError {
    AppError::Core(CoreError::Forbidden(
        "Only the page owner may modify this page".into(),
    ))
}
