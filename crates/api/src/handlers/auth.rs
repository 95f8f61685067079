//! Handlers for the `/auth` resource (anonymous sign-in, current identity).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use ensemble_core::error::CoreError;
use ensemble_core::types::{EntityId, Timestamp};
use ensemble_db::repositories::UserRepo;
use serde::Serialize;

use crate::auth::jwt::{generate_access_token, ROLE_ANON};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Successful sign-in response.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserInfo,
}

/// Public identity info.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: EntityId,
    pub is_anonymous: bool,
    pub role: String,
    pub created_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/anonymous
///
/// Create a fresh anonymous identity and return a token for it.
pub async fn sign_in_anonymously(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let user = UserRepo::create_anonymous(&state.pool).await?;

    let access_token = generate_access_token(user.id, ROLE_ANON, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Failed to issue token: {e}")))?;

    tracing::info!(user_id = %user.id, "Anonymous identity created");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            access_token,
            token_type: "Bearer",
            expires_in: state.config.jwt.access_token_expiry_mins * 60,
            user: UserInfo {
                id: user.id,
                is_anonymous: user.is_anonymous,
                role: ROLE_ANON.to_string(),
                created_at: user.created_at,
            },
        }),
    ))
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<UserInfo>>> {
    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Identity no longer exists".into()))
        })?;

    Ok(Json(DataResponse {
        data: UserInfo {
            id: user.id,
            is_anonymous: user.is_anonymous,
            role: auth_user.role,
            created_at: user.created_at,
        },
    }))
}
