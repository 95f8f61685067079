//! Handlers for badge provisioning sessions.
//!
//! A session walks one signed-in user through choosing a destination and a
//! device, then publishes `{device_id}-{url}` to the badge topic. Sessions
//! are private to the identity that opened them.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use ensemble_core::badge::ProvisioningMessage;
use ensemble_core::error::CoreError;
use ensemble_core::types::EntityId;
use ensemble_db::repositories::MetaPageRepo;
use serde::Deserialize;
use validator::Validate;

use crate::badge::BadgeSessionView;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `PUT /badge/sessions/{id}/destination`.
///
/// Exactly one of `page_id` and `url` must be set.
#[derive(Debug, Deserialize, Validate)]
pub struct SetDestinationRequest {
    pub page_id: Option<EntityId>,
    #[validate(length(min = 1, max = 2048))]
    pub url: Option<String>,
}

/// Request body for `PUT /badge/sessions/{id}/device`.
#[derive(Debug, Deserialize, Validate)]
pub struct SelectDeviceRequest {
    #[validate(length(min = 1, max = 64))]
    pub device_id: String,
}

type SessionResponse = AppResult<Json<DataResponse<BadgeSessionView>>>;

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/badge/sessions
///
/// Open a wizard and its broker link. The link may still be connecting when
/// this returns; poll `connected` before sending.
pub async fn open_session(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<(StatusCode, Json<DataResponse<BadgeSessionView>>)> {
    let view = state.badge_sessions.open(user.user_id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: view })))
}

/// GET /api/v1/badge/sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<EntityId>,
) -> SessionResponse {
    let view = state.badge_sessions.get(session_id, user.user_id).await?;
    Ok(Json(DataResponse { data: view }))
}

/// POST /api/v1/badge/sessions/{id}/start
pub async fn start(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<EntityId>,
) -> SessionResponse {
    let view = state.badge_sessions.start(session_id, user.user_id).await?;
    Ok(Json(DataResponse { data: view }))
}

/// PUT /api/v1/badge/sessions/{id}/destination
///
/// A page destination must refer to an existing page.
pub async fn set_destination(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<EntityId>,
    Json(input): Json<SetDestinationRequest>,
) -> SessionResponse {
    input.validate()?;

    let view = match (input.page_id, input.url.as_deref()) {
        (Some(page_id), None) => {
            if MetaPageRepo::find_by_id(&state.pool, page_id)
                .await?
                .is_none()
            {
                return Err(CoreError::not_found("MetaPage", page_id).into());
            }
            state
                .badge_sessions
                .select_page(session_id, user.user_id, page_id)
                .await?
        }
        (None, Some(url)) => {
            state
                .badge_sessions
                .enter_url(session_id, user.user_id, url)
                .await?
        }
        _ => {
            return Err(AppError::BadRequest(
                "Provide exactly one of page_id or url".into(),
            ))
        }
    };

    Ok(Json(DataResponse { data: view }))
}

/// POST /api/v1/badge/sessions/{id}/confirm
pub async fn confirm_destination(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<EntityId>,
) -> SessionResponse {
    let view = state
        .badge_sessions
        .confirm_destination(session_id, user.user_id)
        .await?;
    Ok(Json(DataResponse { data: view }))
}

/// PUT /api/v1/badge/sessions/{id}/device
pub async fn select_device(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<EntityId>,
    Json(input): Json<SelectDeviceRequest>,
) -> SessionResponse {
    input.validate()?;
    let view = state
        .badge_sessions
        .select_device(session_id, user.user_id, &input.device_id)
        .await?;
    Ok(Json(DataResponse { data: view }))
}

/// POST /api/v1/badge/sessions/{id}/back
pub async fn back(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<EntityId>,
) -> SessionResponse {
    let view = state.badge_sessions.back(session_id, user.user_id).await?;
    Ok(Json(DataResponse { data: view }))
}

/// POST /api/v1/badge/sessions/{id}/send
///
/// Returns 503 while the broker link is down and 400 if the wizard is not
/// ready. May be repeated.
pub async fn send(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<EntityId>,
) -> AppResult<Json<DataResponse<ProvisioningMessage>>> {
    let message = state.badge_sessions.send(session_id, user.user_id).await?;
    Ok(Json(DataResponse { data: message }))
}

/// DELETE /api/v1/badge/sessions/{id}
pub async fn close_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<EntityId>,
) -> AppResult<StatusCode> {
    state.badge_sessions.close(session_id, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
