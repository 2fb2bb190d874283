//! Session endpoints for the authentication front door.

use axum::Json;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use campus_ledger_state::SessionError;
use campus_ledger_types::{SessionInfo, UserId};
use tracing::warn;

use super::dto::{
    ApiResponse, IssueSessionRequest, LogoutAllRequest, RefreshTokenRequest, RevokedResponse,
    TokenResponse,
};
use super::extract::{ClientDevice, ValidJson};
use super::{AppState, blocking};
use crate::error::ApiError;

/// `POST /auth/sessions`
pub async fn issue_session(
    State(state): State<AppState>,
    ClientDevice(device): ClientDevice,
    ValidJson(req): ValidJson<IssueSessionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TokenResponse>>), ApiError> {
    let sessions = state.sessions;
    let user = UserId::new(req.user_id);
    let issued = blocking(move || sessions.issue(user, device)).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::data(issued.into()))))
}

/// `POST /auth/refresh`
///
/// A replayed token terminates every session of its owner, not only the
/// compromised family.
pub async fn refresh(
    State(state): State<AppState>,
    ClientDevice(device): ClientDevice,
    ValidJson(req): ValidJson<RefreshTokenRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    let sessions = state.sessions;
    let issued = blocking(move || match sessions.rotate(&req.refresh_token, device) {
        Err(SessionError::TokenReuseDetected { user, family }) => {
            let revoked = sessions.revoke_all_user_tokens(user)?;
            warn!(user = %user, family = %family, revoked, "Terminated all sessions after token reuse");
            Err(SessionError::TokenReuseDetected { user, family })
        },
        other => other,
    })
    .await?;
    Ok(Json(ApiResponse::data(issued.into())))
}

/// `POST /auth/logout`
pub async fn logout(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RefreshTokenRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let sessions = state.sessions;
    blocking(move || sessions.revoke(&req.refresh_token)).await?;
    Ok(Json(ApiResponse::message("Logged out")))
}

/// `POST /auth/logout-all`
pub async fn logout_all(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<LogoutAllRequest>,
) -> Result<Json<ApiResponse<RevokedResponse>>, ApiError> {
    let sessions = state.sessions;
    let user = UserId::new(req.user_id);
    let revoked = blocking(move || sessions.revoke_all_user_tokens(user)).await?;
    Ok(Json(ApiResponse::data(RevokedResponse { revoked })))
}

/// `GET /auth/sessions/{user_id}`
pub async fn list_sessions(
    State(state): State<AppState>,
    user: Result<Path<u64>, PathRejection>,
) -> Result<Json<ApiResponse<Vec<SessionInfo>>>, ApiError> {
    let Path(user) = user?;
    let user = UserId::new(user);
    let sessions = state.sessions;
    let active = blocking(move || sessions.list_active_sessions(user)).await?;
    Ok(Json(ApiResponse::data(active)))
}
