use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use pc_common::api::{SubmitRateChangeRequest, SubmitRateChangeResponse};
use pc_common::rate_request::{submit_request, RateChangeRequest};

use super::ApiResult;
use crate::auth::identity::authenticate;
use crate::state::AppState;
use crate::stores::rate_request::RateRequestStore;

const PENDING_REVIEW: &str = "pending_review";

pub async fn submit_rate_request(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(payload): Json<SubmitRateChangeRequest>,
) -> ApiResult<(StatusCode, Json<SubmitRateChangeResponse>)> {
    let account_id = authenticate(&headers, &state).await?.require_account()?;

    let request = submit_request(
        account_id,
        &payload.category,
        payload.proposed_rate,
        &payload.justification,
    )?;
    RateRequestStore::new(state.db_pool.clone())
        .insert(&request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitRateChangeResponse {
            request_id: request.id,
            status: PENDING_REVIEW.to_string(),
            submitted_at: request.submitted_at,
        }),
    ))
}

/// Admins see the whole review queue; accounts see their own submissions.
pub async fn list_rate_requests(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<RateChangeRequest>>> {
    let identity = authenticate(&headers, &state).await?;
    let store = RateRequestStore::new(state.db_pool.clone());

    let items = if identity.is_admin() {
        store.list_all().await?
    } else {
        store.list_for_account(identity.require_account()?).await?
    };
    Ok(Json(items))
}
