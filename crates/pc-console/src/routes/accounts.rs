use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use pc_common::api::{CreateAccountRequest, CreateAccountResponse};
use pc_common::error::AppError;
use pc_common::types::Role;
use uuid::Uuid;

use super::ApiResult;
use crate::auth::identity::authenticate;
use crate::auth::tokens::{self, TokenKind};
use crate::state::AppState;
use crate::stores::account::{AccountRecord, AccountStore};

pub async fn create_account(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(payload): Json<CreateAccountRequest>,
) -> ApiResult<Json<CreateAccountResponse>> {
    authenticate(&headers, &state).await?.require_admin()?;
    if payload.role == Role::Admin {
        return Err(AppError::InvalidInput(
            "admin access is granted by password login, not accounts".to_string(),
        )
        .into());
    }

    let issued = tokens::issue(TokenKind::ApiKey)?;
    let account = AccountStore::new(state.db_pool.clone())
        .create(&payload.name, payload.role, &issued.hash, &issued.visible_prefix)
        .await?;

    Ok(Json(CreateAccountResponse {
        account_id: account.account_id,
        api_key: issued.raw,
    }))
}

pub async fn list_accounts(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<AccountRecord>>> {
    authenticate(&headers, &state).await?.require_admin()?;
    let items = AccountStore::new(state.db_pool.clone()).list().await?;
    Ok(Json(items))
}

pub async fn get_account(
    Path(account_id): Path<Uuid>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> ApiResult<Json<AccountRecord>> {
    authenticate(&headers, &state)
        .await?
        .require_account_access(account_id)?;
    Ok(Json(require_account(&state, account_id).await?))
}

/// Loads the account or fails with `NotFound`.
pub(crate) async fn require_account(state: &AppState, account_id: Uuid) -> ApiResult<AccountRecord> {
    Ok(AccountStore::new(state.db_pool.clone())
        .get(account_id)
        .await?
        .ok_or(AppError::NotFound)?)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use uuid::Uuid;

    use crate::routes::test_support::{admin_token, create_account, send, test_app, ADMIN_PASSWORD};

    #[tokio::test]
    async fn admin_creates_and_lists_accounts() {
        let app = test_app(Some(ADMIN_PASSWORD)).await;
        let admin = admin_token(&app).await;
        let (account_id, api_key) = create_account(&app, &admin, "acme-media", "partner").await;
        assert!(api_key.starts_with("pc_live_"));

        let (status, list) = send(&app, "GET", "/api/v1/accounts", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().expect("array").len(), 1);
        assert_eq!(list[0]["account_id"], account_id.as_str());

        let (status, _) = send(&app, "GET", "/api/v1/accounts", Some(&api_key), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn duplicate_name_conflicts() {
        let app = test_app(Some(ADMIN_PASSWORD)).await;
        let admin = admin_token(&app).await;
        create_account(&app, &admin, "acme-media", "partner").await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/accounts",
            Some(&admin),
            Some(json!({ "name": "acme-media", "role": "advertiser" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "conflict");
    }

    #[tokio::test]
    async fn owner_reads_own_account_only() {
        let app = test_app(Some(ADMIN_PASSWORD)).await;
        let admin = admin_token(&app).await;
        let (own_id, own_key) = create_account(&app, &admin, "acme-media", "partner").await;
        let (other_id, _) = create_account(&app, &admin, "north-ads", "advertiser").await;

        let uri = format!("/api/v1/accounts/{own_id}");
        let (status, body) = send(&app, "GET", &uri, Some(&own_key), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "acme-media");

        let uri = format!("/api/v1/accounts/{other_id}");
        let (status, _) = send(&app, "GET", &uri, Some(&own_key), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let uri = format!("/api/v1/accounts/{}", Uuid::new_v4());
        let (status, _) = send(&app, "GET", &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_role_accounts_are_rejected() {
        let app = test_app(Some(ADMIN_PASSWORD)).await;
        let admin = admin_token(&app).await;
        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/accounts",
            Some(&admin),
            Some(json!({ "name": "root", "role": "admin" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
