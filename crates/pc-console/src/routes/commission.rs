//! Read-mostly commission reference data: the tier ladder, the category
//! catalog and the rate settings behind both.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use pc_common::catalog::{self, Category};
use pc_common::progress::{cumulative_revenue_cents, ProgressEngine};
use pc_common::settings::RateSettings;
use pc_common::tiers::TierLadder;

use super::ApiResult;
use crate::auth::identity::authenticate;
use crate::state::AppState;
use crate::stores::earnings::EarningsStore;

/// The tier ladder with the current tier marked from the caller's revenue.
/// Admin sessions have no revenue and see the entry tier marked.
pub async fn list_tiers(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> ApiResult<Json<TierLadder>> {
    let identity = authenticate(&headers, &state).await?;
    let engine = ProgressEngine::new(state.settings.rate_settings().await?);

    let revenue = match identity.account_id {
        Some(account_id) => {
            let records = EarningsStore::new(state.db_pool.clone())
                .records_for_account(account_id)
                .await?;
            cumulative_revenue_cents(&records)
        }
        None => 0,
    };
    Ok(Json(engine.ladder_for(revenue)))
}

pub async fn list_categories(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Category>>> {
    authenticate(&headers, &state).await?;
    let settings = state.settings.rate_settings().await?;
    Ok(Json(catalog::categories(&settings)))
}

pub async fn get_rate_settings(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> ApiResult<Json<RateSettings>> {
    authenticate(&headers, &state).await?;
    Ok(Json(state.settings.rate_settings().await?))
}

pub async fn put_rate_settings(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(payload): Json<RateSettings>,
) -> ApiResult<Json<RateSettings>> {
    authenticate(&headers, &state).await?.require_admin()?;
    state.settings.put_rate_settings(&payload).await?;
    Ok(Json(state.settings.rate_settings().await?))
}
