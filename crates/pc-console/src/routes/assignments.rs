use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use pc_common::api::{AssignRateRequest, AssignRateResponse};
use pc_common::assignment::{NewAssignment, RateAssignment};
use pc_common::catalog::{self, find_category};
use pc_common::error::AppError;
use pc_common::tiers::TierLadder;
use uuid::Uuid;

use super::accounts::require_account;
use super::ApiResult;
use crate::auth::identity::authenticate;
use crate::state::AppState;
use crate::stores::assignment::AssignmentStore;

pub async fn list_assignments(
    Path(account_id): Path<Uuid>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<RateAssignment>>> {
    authenticate(&headers, &state)
        .await?
        .require_account_access(account_id)?;
    require_account(&state, account_id).await?;

    let book = AssignmentStore::new(state.db_pool.clone())
        .book(account_id)
        .await?;
    Ok(Json(book.assignments().to_vec()))
}

/// Assigns a rate for one category. Category and tier names are normalized
/// to their catalog spelling.
pub async fn assign_rate(
    Path(account_id): Path<Uuid>,
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(payload): Json<AssignRateRequest>,
) -> ApiResult<Json<AssignRateResponse>> {
    authenticate(&headers, &state).await?.require_admin()?;
    require_account(&state, account_id).await?;

    let settings = state.settings.rate_settings().await?;
    let catalog = catalog::categories(&settings);
    let category = find_category(&catalog, &payload.category).ok_or_else(|| {
        AppError::InvalidInput(format!("unknown category: {}", payload.category))
    })?;
    let ladder = TierLadder::from_settings(&settings);
    let tier = ladder
        .find(&payload.tier)
        .ok_or_else(|| AppError::InvalidInput(format!("unknown tier: {}", payload.tier)))?;

    let today = Utc::now().date_naive();
    let new = NewAssignment {
        category: category.name.clone(),
        rate: payload.rate,
        tier: tier.name.clone(),
        effective_from: payload.effective_from.unwrap_or(today),
    };
    let changes = AssignmentStore::new(state.db_pool.clone())
        .assign(account_id, new, today)
        .await?;

    Ok(Json(AssignRateResponse {
        changed: changes.changed,
    }))
}
