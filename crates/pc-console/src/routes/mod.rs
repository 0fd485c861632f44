pub mod accounts;
pub mod assignments;
pub mod auth;
pub mod commission;
pub mod earnings;
pub mod health;
pub mod rate_requests;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pc_common::api::ApiErrorResponse;
use pc_common::error::AppError;
use tracing::error;

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/admin/login", post(auth::admin_login))
        .route("/admin/logout", post(auth::admin_logout))
        .route("/auth/me", get(auth::auth_me))
        .route(
            "/api/v1/accounts",
            post(accounts::create_account).get(accounts::list_accounts),
        )
        .route("/api/v1/accounts/{account_id}", get(accounts::get_account))
        .route(
            "/api/v1/accounts/{account_id}/earnings",
            get(earnings::list_earnings).post(earnings::record_earnings),
        )
        .route(
            "/api/v1/accounts/{account_id}/progress",
            get(earnings::account_progress),
        )
        .route(
            "/api/v1/accounts/{account_id}/rate-assignments",
            get(assignments::list_assignments).post(assignments::assign_rate),
        )
        .route("/api/v1/tiers", get(commission::list_tiers))
        .route("/api/v1/categories", get(commission::list_categories))
        .route(
            "/api/v1/settings/rates",
            get(commission::get_rate_settings).put(commission::put_rate_settings),
        )
        .route(
            "/api/v1/rate-requests",
            post(rate_requests::submit_rate_request).get(rate_requests::list_rate_requests),
        )
        .with_state(state)
}

/// Handler error rendered as [`ApiErrorResponse`]. Storage and internal
/// failures are logged and reported without detail.
#[derive(Debug)]
pub struct ApiError(AppError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "request failed");
            "internal error".to_string()
        } else {
            self.0.to_string()
        };

        (
            status,
            Json(ApiErrorResponse {
                code: self.0.code().to_string(),
                message,
                request_id: None,
            }),
        )
            .into_response()
    }
}
