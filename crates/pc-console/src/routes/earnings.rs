use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use pc_common::api::RecordEarningsRequest;
use pc_common::catalog::{self, find_category};
use pc_common::earnings::{generate_series, monthly_totals, PeriodActivity};
use pc_common::error::AppError;
use pc_common::progress::{ProgressEngine, ProgressReport};
use uuid::Uuid;

use super::accounts::require_account;
use super::ApiResult;
use crate::auth::identity::authenticate;
use crate::state::AppState;
use crate::stores::assignment::AssignmentStore;
use crate::stores::earnings::{EarningsStore, LedgerEntry};

/// Records one month of delivery for a category, priced at the rate assigned
/// on the first day of that month or the category's base rate.
pub async fn record_earnings(
    Path(account_id): Path<Uuid>,
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(payload): Json<RecordEarningsRequest>,
) -> ApiResult<(StatusCode, Json<LedgerEntry>)> {
    authenticate(&headers, &state).await?.require_admin()?;
    require_account(&state, account_id).await?;

    let settings = state.settings.rate_settings().await?;
    let catalog = catalog::categories(&settings);
    let category = find_category(&catalog, &payload.category).ok_or_else(|| {
        AppError::InvalidInput(format!("unknown category: {}", payload.category))
    })?;

    let book = AssignmentStore::new(state.db_pool.clone())
        .book(account_id)
        .await?;
    let activity = [PeriodActivity {
        period: payload.period,
        impressions: payload.impressions,
        engagements: payload.engagements,
    }];
    let record = generate_series(
        &book,
        &category.name,
        &activity,
        &state.earnings_basis,
        category.base_rate,
    )?
    .pop()
    .ok_or(AppError::Internal)?;

    let entry = EarningsStore::new(state.db_pool.clone())
        .insert(account_id, &category.name, &record)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn list_earnings(
    Path(account_id): Path<Uuid>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<LedgerEntry>>> {
    authenticate(&headers, &state)
        .await?
        .require_account_access(account_id)?;
    require_account(&state, account_id).await?;

    let entries = EarningsStore::new(state.db_pool.clone())
        .list_for_account(account_id)
        .await?;
    Ok(Json(entries))
}

/// Tier standing and month-over-month change, computed over the account's
/// monthly totals across all categories.
pub async fn account_progress(
    Path(account_id): Path<Uuid>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> ApiResult<Json<ProgressReport>> {
    authenticate(&headers, &state)
        .await?
        .require_account_access(account_id)?;
    require_account(&state, account_id).await?;

    let records = EarningsStore::new(state.db_pool.clone())
        .records_for_account(account_id)
        .await?;
    let series = monthly_totals(&records);
    let engine = ProgressEngine::new(state.settings.rate_settings().await?);
    Ok(Json(engine.report(&series)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use crate::routes::test_support::{admin_token, create_account, send, test_app, ADMIN_PASSWORD};

    async fn record(
        app: &axum::Router,
        admin: &str,
        account_id: &str,
        category: &str,
        period: &str,
        impressions: u64,
    ) -> (StatusCode, Value) {
        send(
            app,
            "POST",
            &format!("/api/v1/accounts/{account_id}/earnings"),
            Some(admin),
            Some(json!({
                "category": category,
                "period": period,
                "impressions": impressions,
                "engagements": 0
            })),
        )
        .await
    }

    #[tokio::test]
    async fn records_at_category_base_rate() {
        let app = test_app(Some(ADMIN_PASSWORD)).await;
        let admin = admin_token(&app).await;
        let (account_id, _) = create_account(&app, &admin, "acme-media", "partner").await;

        // 400k impressions at $2.50 CPM = $1,000 gross; 70% standard rate.
        let (status, entry) = record(&app, &admin, &account_id, "standard display", "2026-01", 400_000).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(entry["category"], "Standard Display");
        assert_eq!(entry["period"], "2026-01");
        assert_eq!(entry["earnings_cents"], 70_000);
        assert_eq!(entry["rate"], 70.0);

        let (status, _) = record(&app, &admin, &account_id, "Standard Display", "2026-01", 1).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = record(&app, &admin, &account_id, "Audio", "2026-02", 1).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn progress_reports_tier_and_delta() {
        let app = test_app(Some(ADMIN_PASSWORD)).await;
        let admin = admin_token(&app).await;
        let (account_id, api_key) = create_account(&app, &admin, "acme-media", "partner").await;

        // $700 then $840 earned: $1,540 of the $5,000 Premium threshold.
        record(&app, &admin, &account_id, "Standard Display", "2026-01", 400_000).await;
        record(&app, &admin, &account_id, "Standard Display", "2026-02", 480_000).await;

        let uri = format!("/api/v1/accounts/{account_id}/progress");
        let (status, report) = send(&app, "GET", &uri, Some(&api_key), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["current_tier"]["name"], "Standard");
        assert_eq!(report["next_tier"]["name"], "Premium");
        assert_eq!(report["cumulative_revenue_cents"], 154_000);
        assert_eq!(report["remaining_to_next_cents"], 346_000);
        assert_eq!(report["progress_percent"], 30.8);
        assert_eq!(report["current_effective_rate"], 70.0);
        assert_eq!(report["delta"]["status"], "change");
        assert_eq!(report["delta"]["amount_cents"], 14_000);
        assert_eq!(report["delta"]["direction"], "up");
        assert_eq!(report["delta"]["percent_change"], 20.0);
    }

    #[tokio::test]
    async fn oversized_delivery_is_rejected_and_progress_still_reports() {
        let app = test_app(Some(ADMIN_PASSWORD)).await;
        let admin = admin_token(&app).await;
        let (account_id, _) = create_account(&app, &admin, "acme-media", "partner").await;
        let uri = format!("/api/v1/accounts/{account_id}/earnings");

        for period in ["2026-01", "2026-02"] {
            let (status, body) = send(
                &app,
                "POST",
                &uri,
                Some(&admin),
                Some(json!({
                    "category": "Standard Display",
                    "period": period,
                    "impressions": 0,
                    "engagements": 9_000_000_000_000_000_000_u64
                })),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["code"], "invalid_input");
        }

        let (_, listed) = send(&app, "GET", &uri, Some(&admin), None).await;
        assert_eq!(listed.as_array().map(Vec::len), Some(0));

        let progress = format!("/api/v1/accounts/{account_id}/progress");
        let (status, report) = send(&app, "GET", &progress, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["cumulative_revenue_cents"], 0);
    }

    #[tokio::test]
    async fn single_period_has_insufficient_history() {
        let app = test_app(Some(ADMIN_PASSWORD)).await;
        let admin = admin_token(&app).await;
        let (account_id, _) = create_account(&app, &admin, "acme-media", "partner").await;
        record(&app, &admin, &account_id, "Video Pre-Roll", "2026-03", 100_000).await;

        let uri = format!("/api/v1/accounts/{account_id}/progress");
        let (_, report) = send(&app, "GET", &uri, Some(&admin), None).await;
        assert_eq!(report["delta"]["status"], "insufficient_history");
    }

    #[tokio::test]
    async fn partners_cannot_read_other_ledgers() {
        let app = test_app(Some(ADMIN_PASSWORD)).await;
        let admin = admin_token(&app).await;
        let (_, own_key) = create_account(&app, &admin, "acme-media", "partner").await;
        let (other_id, _) = create_account(&app, &admin, "north-ads", "partner").await;

        let uri = format!("/api/v1/accounts/{other_id}/earnings");
        let (status, _) = send(&app, "GET", &uri, Some(&own_key), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
