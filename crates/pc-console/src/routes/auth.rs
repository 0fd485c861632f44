use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use pc_common::api::{AdminLoginRequest, AdminLoginResponse, AuthMeResponse};
use pc_common::error::AppError;
use tracing::{info, warn};

use super::ApiResult;
use crate::auth::identity::{admin_session, authenticate, bearer_token};
use crate::auth::tokens::{self, TokenKind};
use crate::state::AppState;
use crate::stores::session::SessionStore;

pub async fn admin_login(
    State(state): State<AppState>,
    Json(payload): Json<AdminLoginRequest>,
) -> ApiResult<Json<AdminLoginResponse>> {
    let Some(expected) = state.admin_password.as_deref() else {
        warn!("admin login attempted but PC_ADMIN_PASSWORD is not set");
        return Err(AppError::Unauthorized.into());
    };
    if payload.password != expected {
        return Err(AppError::Unauthorized.into());
    }

    let issued = tokens::issue(TokenKind::AdminSession)?;
    let session = SessionStore::new(state.db_pool.clone())
        .create(&issued.hash, &issued.visible_prefix)
        .await?;
    info!(session_id = %session.session_id, "admin session issued");

    Ok(Json(AdminLoginResponse {
        token: issued.raw,
        expires_at: session.expires_at.to_rfc3339(),
    }))
}

pub async fn admin_logout(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> ApiResult<StatusCode> {
    let identity = authenticate(&headers, &state).await?;
    identity.require_admin()?;

    let token = bearer_token(&headers).ok_or(AppError::Unauthorized)?;
    let session = admin_session(&state, token).await?;
    SessionStore::new(state.db_pool.clone())
        .delete(session.session_id)
        .await?;
    info!(session_id = %session.session_id, "admin session ended");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn auth_me(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> ApiResult<Json<AuthMeResponse>> {
    let identity = authenticate(&headers, &state).await?;
    Ok(Json(AuthMeResponse {
        role: identity.role,
        account_id: identity.account_id,
    }))
}
