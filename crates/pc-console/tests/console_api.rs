//! End-to-end flows through the full router against an in-memory database.

use std::collections::HashMap;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use pc_common::assignment::{AssignmentStatus, NewAssignment};
use pc_common::config::ConsoleConfig;
use pc_console::background;
use pc_console::routes::build_router;
use pc_console::state::AppState;
use pc_console::stores::assignment::AssignmentStore;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

async fn test_state() -> AppState {
    let vars = HashMap::from([
        ("PC_DATABASE_URL".to_string(), "sqlite::memory:".to_string()),
        ("PC_ADMIN_PASSWORD".to_string(), "s3cret".to_string()),
    ]);
    let config = ConsoleConfig::from_map(&vars).expect("config");
    pc_console::state_from_config(&config).await.expect("state")
}

async fn call(app: &Router, method: &str, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"));
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn login(app: &Router) -> String {
    let request = Request::builder()
        .method("POST")
        .uri("/admin/login")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "password": "s3cret" }).to_string()))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let json: Value = serde_json::from_slice(&bytes).expect("json");
    json["token"].as_str().expect("token").to_string()
}

#[tokio::test]
async fn partner_commission_lifecycle() {
    let app = build_router(test_state().await);
    let admin = login(&app).await;

    let (status, created) = call(
        &app,
        "POST",
        "/api/v1/accounts",
        &admin,
        Some(json!({ "name": "acme-media", "role": "partner" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let account_id = created["account_id"].as_str().expect("id").to_string();
    let api_key = created["api_key"].as_str().expect("key").to_string();

    // Negotiated 75% from January replaces the 70% catalog rate.
    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/v1/accounts/{account_id}/rate-assignments"),
        &admin,
        Some(json!({
            "category": "Standard Display",
            "rate": 75.0,
            "tier": "Standard",
            "effective_from": "2026-01-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    for (period, impressions) in [("2026-02", 2_000_000), ("2026-03", 1_500_000)] {
        let (status, entry) = call(
            &app,
            "POST",
            &format!("/api/v1/accounts/{account_id}/earnings"),
            &admin,
            Some(json!({
                "category": "Standard Display",
                "period": period,
                "impressions": impressions,
                "engagements": 0
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(entry["rate"], 75.0);
    }

    // $3,750 + $2,812.50 = $6,562.50, past the $5,000 Premium threshold.
    let (status, report) = call(
        &app,
        "GET",
        &format!("/api/v1/accounts/{account_id}/progress"),
        &api_key,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["cumulative_revenue_cents"], 656_250);
    assert_eq!(report["current_tier"]["name"], "Premium");
    assert_eq!(report["next_tier"]["name"], "Enterprise");
    assert_eq!(report["current_effective_rate"], 82.5);
    assert_eq!(report["delta"]["direction"], "down");
    assert_eq!(report["delta"]["amount_cents"], 93_750);
    assert_eq!(report["delta"]["percent_change"], -25.0);

    let (status, tiers) = call(&app, "GET", "/api/v1/tiers", &api_key, None).await;
    assert_eq!(status, StatusCode::OK);
    let current: Vec<&Value> = tiers
        .as_array()
        .expect("array")
        .iter()
        .filter(|t| t["is_current"] == true)
        .collect();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0]["name"], "Premium");

    let (status, _) = call(
        &app,
        "POST",
        "/api/v1/rate-requests",
        &api_key,
        Some(json!({
            "category": "Standard Display",
            "proposed_rate": 80.0,
            "justification": "Crossed Premium threshold in Q1"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, queue) = call(&app, "GET", "/api/v1/rate-requests", &admin, None).await;
    assert_eq!(queue[0]["proposed_rate"], 80.0);
}

#[tokio::test]
async fn background_run_promotes_due_assignments() {
    let state = test_state().await;
    let app = build_router(state.clone());
    let admin = login(&app).await;

    let (_, created) = call(
        &app,
        "POST",
        "/api/v1/accounts",
        &admin,
        Some(json!({ "name": "north-ads", "role": "partner" })),
    )
    .await;
    let account_id: Uuid = created["account_id"]
        .as_str()
        .expect("id")
        .parse()
        .expect("uuid");

    // Scheduled yesterday for today, so it is due on the next run.
    let today = Utc::now().date_naive();
    let store = AssignmentStore::new(state.db_pool.clone());
    store
        .assign(
            account_id,
            NewAssignment {
                category: "Native Content".to_string(),
                rate: 77.0,
                tier: "Standard".to_string(),
                effective_from: today,
            },
            today - Duration::days(1),
        )
        .await
        .expect("schedule");
    let book = store.book(account_id).await.expect("book");
    assert_eq!(book.assignments()[0].status, AssignmentStatus::Pending);

    background::run_once(&state).await;

    let book = store.book(account_id).await.expect("book");
    assert_eq!(book.active_for("Native Content").map(|a| a.rate), Some(77.0));
}
